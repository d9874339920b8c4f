//! Layout quality: versioned scores, visual density analysis and the
//! regeneration decision loop.

mod document;
mod policy;
mod score;
mod tracker;
mod visual_density;

pub use document::{LayoutBlock, LayoutDocument, LayoutSection};
pub use policy::{
    LayoutRegenerationPolicy, QualityEvaluation, RegenerationConstraint, RegenerationDecision,
};
pub use score::{
    validate_score_schema, IssueSeverity, LayoutIssue, LayoutIssueType, LayoutScore, ScoreError,
    ScoreFormat, RUBRIC_VERSION,
};
pub use tracker::{RegenerationAttempt, RegenerationTracker};
pub use visual_density::{VisualDensityAnalyzer, VisualDensityConfig, VisualDensityReport};
