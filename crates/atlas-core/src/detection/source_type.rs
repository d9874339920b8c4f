//! Source type detection: argumentative, narrative or technical.
//!
//! Each category is scored independently from weighted pattern hits on the
//! lower-cased text. A category "meets" at [`DETECTION_THRESHOLD`]. Among the
//! categories that meet it, priority order decides, not the raw score:
//! argumentative, then technical, then narrative. When nothing meets the
//! threshold the source is treated as argumentative.
//!
//! | Category | +2 | +1 | +1 |
//! |----------|----|----|----|
//! | Argumentative | argument phrase | evidence phrase | ≥5 conclusion connectives |
//! | Narrative | dialogue attribution | ≥10 temporal markers | scene-setting phrase |
//! | Technical | ≥2 distinct numbered steps | definition phrase | code/table/spec marker |

use serde::{Deserialize, Serialize};

use crate::types::SourceType;

use super::ambiguity::AmbiguityNote;
use super::patterns::{
    contains_any, count_matches, distinct_step_numbers, ARGUMENT_PHRASES, CONNECTIVE_PATTERN,
    DEFINITION_PHRASES, DIALOGUE_PATTERN, EVIDENCE_PHRASES, SCENE_PHRASES, TECHNICAL_MARKERS,
    TEMPORAL_PATTERN,
};

/// Score a category needs before it can be selected.
pub const DETECTION_THRESHOLD: u32 = 3;

const MIN_CONNECTIVES: usize = 5;
const MIN_TEMPORAL_MARKERS: usize = 10;
const MIN_DISTINCT_STEPS: usize = 2;

/// Raw per-category scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTypeScores {
    pub argumentative: u32,
    pub narrative: u32,
    pub technical: u32,
}

impl SourceTypeScores {
    /// Categories meeting the threshold, in priority order.
    pub fn meeting_threshold(&self) -> Vec<SourceType> {
        [
            (SourceType::Argumentative, self.argumentative),
            (SourceType::Technical, self.technical),
            (SourceType::Narrative, self.narrative),
        ]
        .into_iter()
        .filter(|(_, score)| *score >= DETECTION_THRESHOLD)
        .map(|(kind, _)| kind)
        .collect()
    }

    /// Resolve the scores to a single source type.
    pub fn resolve(&self) -> SourceType {
        self.meeting_threshold()
            .first()
            .copied()
            .unwrap_or(SourceType::Argumentative)
    }
}

/// Outcome of source type detection, computed once per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTypeDetectionResult {
    pub detected_type: SourceType,
    pub argumentative_score: u32,
    pub narrative_score: u32,
    pub technical_score: u32,

    /// Set when no category met the threshold or several did.
    pub ambiguity: Option<AmbiguityNote>,
}

impl SourceTypeDetectionResult {
    pub fn scores(&self) -> SourceTypeScores {
        SourceTypeScores {
            argumentative: self.argumentative_score,
            narrative: self.narrative_score,
            technical: self.technical_score,
        }
    }
}

/// Stateless source type detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceTypeDetector;

impl SourceTypeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify a source document.
    pub fn detect(&self, text: &str) -> SourceTypeDetectionResult {
        let lower = text.to_lowercase();
        let scores = SourceTypeScores {
            argumentative: self.score_argumentative(&lower),
            narrative: self.score_narrative(&lower),
            technical: self.score_technical(&lower),
        };

        let detected_type = scores.resolve();
        let meeting = scores.meeting_threshold();
        let context = format!(
            "argumentative={} narrative={} technical={}",
            scores.argumentative, scores.narrative, scores.technical
        );

        let ambiguity = match meeting.len() {
            0 => Some(AmbiguityNote::new(
                "No source type met the detection threshold",
                context,
                "Defaulted to argumentative",
            )),
            1 => None,
            _ => Some(AmbiguityNote::new(
                "Several source types met the detection threshold",
                context,
                format!("Priority order selected {}", detected_type),
            )),
        };

        if let Some(note) = &ambiguity {
            note.log();
        }

        tracing::info!(
            detected = %detected_type,
            argumentative = scores.argumentative,
            narrative = scores.narrative,
            technical = scores.technical,
            "Source type detected"
        );

        SourceTypeDetectionResult {
            detected_type,
            argumentative_score: scores.argumentative,
            narrative_score: scores.narrative,
            technical_score: scores.technical,
            ambiguity,
        }
    }

    fn score_argumentative(&self, lower: &str) -> u32 {
        let mut score = 0;
        if contains_any(lower, ARGUMENT_PHRASES) {
            score += 2;
        }
        if contains_any(lower, EVIDENCE_PHRASES) {
            score += 1;
        }
        if count_matches(&CONNECTIVE_PATTERN, lower) >= MIN_CONNECTIVES {
            score += 1;
        }
        score
    }

    fn score_narrative(&self, lower: &str) -> u32 {
        let mut score = 0;
        if DIALOGUE_PATTERN.is_match(lower) {
            score += 2;
        }
        if count_matches(&TEMPORAL_PATTERN, lower) >= MIN_TEMPORAL_MARKERS {
            score += 1;
        }
        if contains_any(lower, SCENE_PHRASES) {
            score += 1;
        }
        score
    }

    fn score_technical(&self, lower: &str) -> u32 {
        let mut score = 0;
        if distinct_step_numbers(lower).len() >= MIN_DISTINCT_STEPS {
            score += 2;
        }
        if contains_any(lower, DEFINITION_PHRASES) {
            score += 1;
        }
        if contains_any(lower, TECHNICAL_MARKERS) {
            score += 1;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARGUMENTATIVE: &str = "The author argues that cities shape behaviour. \
        Research shows density matters. Thus density helps; therefore we build. \
        Hence the plan, consequently the policy, and thus the outcome.";

    const NARRATIVE: &str = "\"Wait,\" she said. The room was quiet. Then the door opened. \
        Later they ate. Then it rained. Meanwhile the dog slept. Suddenly a knock. \
        Eventually morning came. Then silence. Later again. Afterwards nothing. Then sleep.";

    const TECHNICAL: &str = "Configuration\n1. Install the package\n2. Edit the file\n\
        A handler is defined as a callback.\nparameter: timeout";

    #[test]
    fn test_detects_argumentative() {
        let result = SourceTypeDetector::new().detect(ARGUMENTATIVE);
        assert_eq!(result.detected_type, SourceType::Argumentative);
        assert_eq!(result.argumentative_score, 4);
        assert!(result.ambiguity.is_none());
    }

    #[test]
    fn test_detects_narrative() {
        let result = SourceTypeDetector::new().detect(NARRATIVE);
        assert_eq!(result.narrative_score, 4);
        assert_eq!(result.detected_type, SourceType::Narrative);
    }

    #[test]
    fn test_detects_technical() {
        let result = SourceTypeDetector::new().detect(TECHNICAL);
        assert_eq!(result.technical_score, 4);
        assert_eq!(result.detected_type, SourceType::Technical);
    }

    #[test]
    fn test_defaults_to_argumentative_with_note() {
        let result = SourceTypeDetector::new().detect("A plain paragraph with nothing special.");
        assert_eq!(result.detected_type, SourceType::Argumentative);
        assert!(result.ambiguity.is_some());
    }

    #[test]
    fn test_priority_beats_raw_score() {
        let scores = SourceTypeScores {
            argumentative: 3,
            narrative: 5,
            technical: 3,
        };
        assert_eq!(scores.resolve(), SourceType::Argumentative);
    }

    #[test]
    fn test_technical_beats_narrative_when_both_meet() {
        let scores = SourceTypeScores {
            argumentative: 1,
            narrative: 4,
            technical: 3,
        };
        assert_eq!(scores.resolve(), SourceType::Technical);
    }

    #[test]
    fn test_single_signal_below_threshold() {
        let scores = SourceTypeScores {
            argumentative: 2,
            narrative: 2,
            technical: 2,
        };
        assert_eq!(scores.resolve(), SourceType::Argumentative);
        assert!(scores.meeting_threshold().is_empty());
    }
}
