//! Ambiguity notes for detections resolved by a conservative default.

use serde::{Deserialize, Serialize};

/// A detection that did not resolve cleanly and fell back to a default.
///
/// Never an error. Callers log it so the fallback is visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguityNote {
    /// What was ambiguous.
    pub description: String,

    /// The scores or counts that made it ambiguous.
    pub context: String,

    /// The conservative action taken.
    pub action: String,
}

impl AmbiguityNote {
    pub fn new(
        description: impl Into<String>,
        context: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            context: context.into(),
            action: action.into(),
        }
    }

    /// Emit the note through tracing.
    pub fn log(&self) {
        tracing::info!(
            context = %self.context,
            action = %self.action,
            "Detection ambiguity: {}",
            self.description
        );
    }
}
