//! # atlas-runtime
//!
//! Async driver around `atlas-core` for one guide request.
//!
//! The core is synchronous and never touches the network. This crate wires
//! it to the two collaborators that do:
//! - a [`ContentGenerator`] that streams guide chunks (usually an LLM call)
//! - a [`LayoutAnalyzer`] that scores a rendered guide
//!
//! ## Flow
//!
//! 1. Detect source type and chapters once per source ([`AnalysisCache`])
//! 2. Stream chunks through the governor engine, substituting synthesis for
//!    cut content and stopping on the hard limit ([`GenerationSession`])
//! 3. Score the guide, decide, and regenerate under tighter constraints until
//!    accepted or out of attempts ([`RegenerationOrchestrator`])
//!
//! Session state is snapshotted after every chunk in a [`StateStore`] so an
//! interrupted stream can resume where it stopped.
//!
//! ## Example
//!
//! ```rust,ignore
//! use atlas_runtime::{GuideRequest, RegenerationOrchestrator, RuntimeConfig};
//!
//! let orchestrator = RegenerationOrchestrator::builder()
//!     .generator(generator)
//!     .analyzer(analyzer)
//!     .config(RuntimeConfig::from_file("atlas.json")?)
//!     .build()?;
//!
//! let report = orchestrator.run(GuideRequest::new("session-1", source_text)).await?;
//! println!("{}", report.guide);
//! ```

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod generator;
pub mod orchestrator;
pub mod session;
pub mod store;

use std::time::Duration;
use thiserror::Error;

use atlas_core::{ConfigError, GovernanceError, ScoreError};

pub use analyzer::{AnalyzerError, LayoutAnalyzer, MarkupLayoutAnalyzer};
pub use cache::AnalysisCache;
pub use config::{CacheConfig, RetryConfig, RuntimeConfig};
pub use generator::{ChunkStream, ContentGenerator, GeneratedChunk, GenerationRequest, GeneratorError};
pub use orchestrator::{
    GuideReport, GuideRequest, RegenerationOrchestrator, RegenerationOrchestratorBuilder,
};
pub use session::{GenerationSession, GuideSegment, SessionOutcome};
pub use store::{SessionSnapshot, StateStore};

/// Errors from the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Content generator failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Layout analyzer failed: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Output halted by strict governor: {}", .violations.join("; "))]
    Halted { violations: Vec<String> },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid runtime configuration: {0}")]
    InvalidConfig(String),

    #[error("Collaborator not configured: {0}")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode runtime configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halted_lists_violations() {
        let err = RuntimeError::Halted {
            violations: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Output halted by strict governor: a; b");
    }

    #[test]
    fn test_core_errors_convert() {
        let err: RuntimeError = ScoreError::MissingRubricVersion.into();
        assert!(matches!(err, RuntimeError::Score(_)));
    }
}
