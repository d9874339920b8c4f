//! # atlas-core
//!
//! Deterministic content budgeting and layout-quality governance for
//! machine-generated reading guides.
//!
//! The crate answers, for one generation session:
//! - How many words, visuals and synthesis paragraphs may this guide use?
//! - Which content is cut first when the budget runs short, and what
//!   replaces it?
//! - Is the rendered layout good enough, or should it be regenerated under
//!   tighter constraints?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same source, governor and chunk stream give the same
//!    budgets, cuts and decisions
//! 2. **No I/O**: nothing here blocks or suspends, apart from loading a
//!    governor file the caller names
//! 3. **Explicit outcomes**: hard-limit stops, chapter fallbacks, halts and
//!    regeneration are enum variants, not errors
//! 4. **Versioned scores**: layout scores from different rubrics are never
//!    compared
//!
//! ## Example
//!
//! ```rust,ignore
//! use atlas_core::{analyze_source, ContentChunk, GovernorState, SummaryGovernorEngine, SummaryType};
//!
//! let engine = SummaryGovernorEngine::for_summary_type(SummaryType::Professional);
//! let analysis = analyze_source(&source_text, engine.governor().section_budget.fallback_strategy);
//! let plan = engine.plan(analysis.source_word_count, &analysis.chapters);
//!
//! let mut state = GovernorState::new();
//! for chunk in chunks {
//!     let (next, result) = engine.process_chunk(&state, &chunk, plan.total_budget);
//!     state = next;
//!     if result.is_hard_stop() {
//!         break;
//!     }
//! }
//!
//! let decision = engine.enforce(engine.validate(&state, &plan, Some(&analysis.chapters.event)));
//! ```

pub mod detection;
pub mod governor;
pub mod guide;
pub mod layout;
pub mod reader_presets;
pub mod synthesis;
pub mod types;

pub use detection::{
    analyze_source, AmbiguityNote, Chapter, ChapterDetectionResult, ChapterDetector,
    ExpansionClassification, ExpansionTypeDetector, SectionDetectionEvent, SourceAnalysis,
    SourceTypeDetectionResult, SourceTypeDetector,
};
pub use governor::{
    BudgetViolation, ChapterBudget, ChunkProcessingResult, ConfigError, ContentChunk, CutEvent,
    CutPolicy, EnforcementDecision, GenerationPlan, GovernorState, GovernorValidationResult,
    SectionBudget, SectionBudgets, SummaryGovernorEngine, SummaryTypeGovernor, VisualBudget,
};
pub use guide::{audit_structure, parse_guide, GuideParseError, ParsedGuide, StructureAudit};
pub use layout::{
    IssueSeverity, LayoutDocument, LayoutIssue, LayoutIssueType, LayoutRegenerationPolicy,
    LayoutScore, QualityEvaluation, RegenerationAttempt, RegenerationConstraint,
    RegenerationDecision, RegenerationTracker, ScoreError, ScoreFormat, VisualDensityAnalyzer, VisualDensityReport,
    RUBRIC_VERSION,
};
pub use reader_presets::{GenerationConstraints, QualityThresholds, ReaderLayoutPreset};
pub use synthesis::{SynthesisGenerator, SynthesisManager, SynthesisOutcome, SynthesisParagraph};
pub use types::{
    ExpansionType, ReaderProfile, ReplacementStrategy, SectionStrategy, SourceType, SummaryType,
    VisualKind, WidthCategory,
};

use thiserror::Error;

/// Errors that can occur anywhere in the governance pipeline.
#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Layout score error: {0}")]
    Score(#[from] ScoreError),

    #[error("Guide markup error: {0}")]
    Guide(#[from] GuideParseError),
}

/// Validate every shipped governor and reader preset.
///
/// Call once at startup. A failure here is a programming error in the
/// preset tables.
pub fn validate_presets() -> Result<(), GovernanceError> {
    governor::presets::validate_all()?;
    reader_presets::validate_all()?;
    tracing::debug!("Governor and reader presets validated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_presets_validate() {
        assert!(validate_presets().is_ok());
    }

    #[test]
    fn test_errors_convert_into_umbrella() {
        let err: GovernanceError = ScoreError::MissingRubricVersion.into();
        assert!(err.to_string().contains("rubric version"));

        let err: GovernanceError = GuideParseError::Empty.into();
        assert!(matches!(err, GovernanceError::Guide(_)));
    }
}
