//! Expansion type detection for generated content blocks.
//!
//! First match wins, in this fixed order:
//!
//! 1. exercise
//! 2. adjacent-domain comparison
//! 3. extended commentary (needs two distinct markers, not one)
//! 4. secondary example
//! 5. stylistic elaboration
//! 6. core argument, when nothing else matched

use serde::{Deserialize, Serialize};

use crate::types::ExpansionType;

use super::patterns::{
    matched_phrases, COMMENTARY_PHRASES, COMPARISON_PHRASES, ELABORATION_PHRASES,
    EXERCISE_PHRASES, MIN_COMMENTARY_MARKERS, SECONDARY_EXAMPLE_PHRASES,
};

/// Classification plus the phrases that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionClassification {
    pub expansion_type: ExpansionType,
    pub matched_markers: Vec<String>,
}

/// Stateless expansion type detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpansionTypeDetector;

impl ExpansionTypeDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, text: &str) -> ExpansionType {
        self.classify(text).expansion_type
    }

    /// Classify a block and report which markers matched.
    pub fn classify(&self, text: &str) -> ExpansionClassification {
        let lower = text.to_lowercase();

        let rules: [(ExpansionType, &[&'static str], usize); 5] = [
            (ExpansionType::Exercise, EXERCISE_PHRASES, 1),
            (ExpansionType::AdjacentDomainComparison, COMPARISON_PHRASES, 1),
            (ExpansionType::ExtendedCommentary, COMMENTARY_PHRASES, MIN_COMMENTARY_MARKERS),
            (ExpansionType::SecondaryExample, SECONDARY_EXAMPLE_PHRASES, 1),
            (ExpansionType::StylisticElaboration, ELABORATION_PHRASES, 1),
        ];

        for (expansion_type, phrases, required) in rules {
            let matched = matched_phrases(&lower, phrases);
            if matched.len() >= required {
                return ExpansionClassification {
                    expansion_type,
                    matched_markers: matched.into_iter().map(String::from).collect(),
                };
            }
        }

        ExpansionClassification {
            expansion_type: ExpansionType::CoreArgument,
            matched_markers: Vec::new(),
        }
    }
}
