//! Summary type governors: budget configuration, presets, the streaming
//! budget engine and post-generation enforcement.

mod config;
mod engine;
pub mod presets;
mod state;
mod validation;

pub use config::{
    load_governors_file, ConfigError, CutPolicy, SectionBudget, SummaryTypeGovernor, VisualBudget,
    SYNTHESIS_REPLACEMENT_WORDS,
};
pub use engine::{
    ChapterBudget, GenerationPlan, SectionBudgets, SummaryGovernorEngine, ADJUSTED_MAX_HEADROOM,
    AUDIO_TOLERANCE, MINIMUM_ADJUSTED_CHAPTER_WORDS, SHORT_SOURCE_CAP_RATIO, WORDS_PER_MINUTE,
};
pub use state::{ChunkProcessingResult, ContentChunk, CutEvent, GovernorState};
pub use validation::{
    BudgetViolation, EnforcementDecision, GovernorValidationResult, NEAR_LIMIT_THRESHOLD,
};
