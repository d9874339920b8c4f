//! Content generator trait and the records it streams.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use atlas_core::{GenerationConstraints, GenerationPlan, SummaryTypeGovernor};

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Generation backend failed: {0}")]
    Backend(String),

    #[error("Stream interrupted after {received} chunks: {reason}")]
    Interrupted { received: usize, reason: String },
}

/// Everything the backend needs to write one attempt of a guide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub session_id: String,
    pub governor: SummaryTypeGovernor,
    pub plan: GenerationPlan,

    /// Advisory layout constraints; tightened on every regeneration.
    pub constraints: GenerationConstraints,

    /// 1-based.
    pub attempt: u32,
}

/// One streamed piece of guide markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedChunk {
    pub text: String,

    /// Plan section index: 0 is the intro, the last is the conclusion.
    pub section_index: usize,

    #[serde(default)]
    pub visual_count: usize,
}

impl GeneratedChunk {
    pub fn new(text: impl Into<String>, section_index: usize) -> Self {
        Self {
            text: text.into(),
            section_index,
            visual_count: 0,
        }
    }

    pub fn with_visuals(mut self, visual_count: usize) -> Self {
        self.visual_count = visual_count;
        self
    }
}

pub type ChunkStream = BoxStream<'static, Result<GeneratedChunk, GeneratorError>>;

/// Backend that writes guide content.
///
/// Streams are consumed in order and may be dropped early: the session stops
/// reading the moment the governor reports a hard-limit stop. A resumed
/// session asks for the same stream again and skips chunks it already
/// applied, so the backend must replay deterministically for a given
/// request.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<ChunkStream, GeneratorError>;
}
