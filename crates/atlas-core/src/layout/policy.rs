//! Quality bands and the regenerate / accept decision.
//!
//! | Score | Evaluation |
//! |-------|------------|
//! | ≥ ideal | excellent |
//! | ≥ target | good |
//! | ≥ minimum acceptable | acceptable with warnings |
//! | below | requires regeneration |
//!
//! Regeneration is bounded: attempt `max_regeneration_attempts` always ends
//! in `AcceptBest`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::governor::ConfigError;

use super::score::{IssueSeverity, LayoutIssue, LayoutIssueType, LayoutScore, ScoreFormat};

/// A generation-side adjustment derived from a layout issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenerationConstraint {
    ReduceVisualDensity,
    AddVisualSupport,
    AddTextBetweenVisuals,
    LimitVisualsPerSection,
    ReduceVisualWidth,
    ShortenParagraphs,
    FlattenHierarchy,
    RepairBlockMarkup,
    ExpandThinSections,
}

impl RegenerationConstraint {
    /// Constraint that addresses an issue type, if any.
    pub fn for_issue(issue_type: LayoutIssueType) -> Option<Self> {
        use LayoutIssueType as T;
        use RegenerationConstraint as C;

        match issue_type {
            T::VisualDensity => Some(C::ReduceVisualDensity),
            T::SparseVisuals => Some(C::AddVisualSupport),
            T::ConsecutiveVisuals | T::InsufficientTextBeforeVisual => Some(C::AddTextBetweenVisuals),
            T::TooManyVisualsInSection => Some(C::LimitVisualsPerSection),
            T::OversizedVisual => Some(C::ReduceVisualWidth),
            T::LongParagraph => Some(C::ShortenParagraphs),
            T::SectionTooDeep => Some(C::FlattenHierarchy),
            T::UnclosedBlock | T::StrayClosingTag | T::MissingRequiredBlock => {
                Some(C::RepairBlockMarkup)
            }
            T::EmptySection => Some(C::ExpandThinSections),
            T::Unrecognized => None,
        }
    }

    /// Deduplicated constraints for a set of issues.
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a LayoutIssue>) -> BTreeSet<Self> {
        issues
            .into_iter()
            .filter_map(|issue| Self::for_issue(issue.issue_type))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "band", rename_all = "snake_case")]
pub enum QualityEvaluation {
    Excellent { score: f64 },
    Good { score: f64 },
    AcceptableWithWarnings { score: f64, warnings: Vec<String> },
    RequiresRegeneration { score: f64, issues: Vec<LayoutIssue> },
}

impl QualityEvaluation {
    pub fn score(&self) -> f64 {
        match self {
            QualityEvaluation::Excellent { score }
            | QualityEvaluation::Good { score }
            | QualityEvaluation::AcceptableWithWarnings { score, .. }
            | QualityEvaluation::RequiresRegeneration { score, .. } => *score,
        }
    }

    pub fn is_acceptable(&self) -> bool {
        !matches!(self, QualityEvaluation::RequiresRegeneration { .. })
    }
}

/// What the caller does after a score is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RegenerationDecision {
    /// The score clears the minimum. Keep this render.
    Accept { score: LayoutScore },

    /// Attempts are exhausted. Keep the best render seen.
    AcceptBest { score: LayoutScore },

    /// Generate again with these constraints applied.
    Regenerate {
        next_attempt: u32,
        constraints: BTreeSet<RegenerationConstraint>,
    },
}

impl RegenerationDecision {
    pub fn is_regenerate(&self) -> bool {
        matches!(self, RegenerationDecision::Regenerate { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            RegenerationDecision::Accept { .. } => "accept",
            RegenerationDecision::AcceptBest { .. } => "accept_best",
            RegenerationDecision::Regenerate { .. } => "regenerate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRegenerationPolicy {
    #[serde(default)]
    pub format: ScoreFormat,
    pub ideal_score: f64,
    pub target_score: f64,
    pub minimum_acceptable_score: f64,
    pub max_regeneration_attempts: u32,
}

impl Default for LayoutRegenerationPolicy {
    fn default() -> Self {
        Self {
            format: ScoreFormat::Overall,
            ideal_score: 0.90,
            target_score: 0.80,
            minimum_acceptable_score: 0.70,
            max_regeneration_attempts: 3,
        }
    }
}

impl LayoutRegenerationPolicy {
    pub fn with_format(mut self, format: ScoreFormat) -> Self {
        self.format = format;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = 0.0 <= self.minimum_acceptable_score
            && self.minimum_acceptable_score <= self.target_score
            && self.target_score <= self.ideal_score
            && self.ideal_score <= 1.0;
        if !ordered {
            return Err(ConfigError::InvalidQualityThresholds {
                minimum: self.minimum_acceptable_score,
                target: self.target_score,
                ideal: self.ideal_score,
            });
        }
        if self.max_regeneration_attempts == 0 {
            return Err(ConfigError::NonPositive {
                field: "max_regeneration_attempts",
            });
        }
        Ok(())
    }

    /// Place a score in its quality band.
    pub fn evaluate(&self, score: &LayoutScore) -> QualityEvaluation {
        let value = score.score_for(self.format);

        if value >= self.ideal_score {
            QualityEvaluation::Excellent { score: value }
        } else if value >= self.target_score {
            QualityEvaluation::Good { score: value }
        } else if value >= self.minimum_acceptable_score {
            let warnings = score
                .issues
                .iter()
                .filter(|i| matches!(i.severity, IssueSeverity::Warning | IssueSeverity::Info))
                .map(issue_warning)
                .collect();
            QualityEvaluation::AcceptableWithWarnings {
                score: value,
                warnings,
            }
        } else {
            QualityEvaluation::RequiresRegeneration {
                score: value,
                issues: score.issues.clone(),
            }
        }
    }

    /// Decide what to do with the render from `attempt_number` (1-based).
    ///
    /// `best_so_far` is ignored when it comes from a different rubric.
    pub fn should_regenerate(
        &self,
        score: &LayoutScore,
        attempt_number: u32,
        best_so_far: Option<&LayoutScore>,
    ) -> RegenerationDecision {
        let value = score.score_for(self.format);

        if value >= self.minimum_acceptable_score {
            tracing::info!(score = value, attempt = attempt_number, "Layout accepted");
            return RegenerationDecision::Accept {
                score: score.clone(),
            };
        }

        if attempt_number >= self.max_regeneration_attempts {
            let best = match best_so_far {
                Some(best) if best.comparable_with(score).is_ok() && best.score_for(self.format) > value => {
                    best.clone()
                }
                _ => score.clone(),
            };
            tracing::warn!(
                best = best.score_for(self.format),
                attempts = attempt_number,
                "Regeneration attempts exhausted; accepting best layout"
            );
            return RegenerationDecision::AcceptBest { score: best };
        }

        let constraints = RegenerationConstraint::from_issues(&score.issues);
        tracing::info!(
            score = value,
            attempt = attempt_number,
            constraints = constraints.len(),
            "Layout below minimum; regenerating"
        );
        RegenerationDecision::Regenerate {
            next_attempt: attempt_number + 1,
            constraints,
        }
    }
}

fn issue_warning(issue: &LayoutIssue) -> String {
    let location = match issue.section {
        Some(section) => format!(" in section {}", section),
        None => String::new(),
    };
    if issue.suggestion.is_empty() {
        format!("{:?}{}", issue.issue_type, location)
    } else {
        format!("{:?}{}: {}", issue.issue_type, location, issue.suggestion)
    }
}
