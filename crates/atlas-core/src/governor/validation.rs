//! Post-generation validation and enforcement.
//!
//! Violations are data, not errors. Whether they halt the session depends
//! only on the governor's `strict_enforcement` flag.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detection::SectionDetectionEvent;
use crate::types::SummaryType;

use super::engine::{GenerationPlan, SummaryGovernorEngine};
use super::state::{CutEvent, GovernorState};

/// Utilization at which an informational near-limit warning is attached.
pub const NEAR_LIMIT_THRESHOLD: f64 = 0.95;

/// Closed set of budget violations, each carrying current and limit values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetViolation {
    TotalWordsExceeded {
        current: usize,
        limit: usize,
    },
    SectionWordsExceeded {
        section_index: usize,
        current: usize,
        limit: usize,
    },
    VisualCountExceeded {
        current: usize,
        limit: usize,
    },
    AudioMinutesExceeded {
        current: f64,
        limit: f64,
    },
    SynthesisLimitExceeded {
        section_index: usize,
        current: usize,
        limit: usize,
    },
}

impl fmt::Display for BudgetViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetViolation::TotalWordsExceeded { current, limit } => {
                write!(f, "Total effective words {} exceed budget {}", current, limit)
            }
            BudgetViolation::SectionWordsExceeded {
                section_index,
                current,
                limit,
            } => write!(
                f,
                "Section {} has {} words, limit {}",
                section_index, current, limit
            ),
            BudgetViolation::VisualCountExceeded { current, limit } => {
                write!(f, "{} visuals exceed limit {}", current, limit)
            }
            BudgetViolation::AudioMinutesExceeded { current, limit } => write!(
                f,
                "Audio length {:.1} min exceeds {:.1} min",
                current, limit
            ),
            BudgetViolation::SynthesisLimitExceeded {
                section_index,
                current,
                limit,
            } => write!(
                f,
                "Section {} has {} synthesis paragraphs, limit {}",
                section_index, current, limit
            ),
        }
    }
}

/// Validation record attached to a finished session as metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernorValidationResult {
    pub summary_type: SummaryType,
    pub governor_version: String,
    pub is_valid: bool,
    pub violations: Vec<BudgetViolation>,
    pub warnings: Vec<String>,
    pub budget_utilization: f64,

    /// Total word budget the session was held to.
    pub effective_budget: usize,

    pub cut_events: Vec<CutEvent>,
    pub section_detection_event: Option<SectionDetectionEvent>,
}

/// What to do with a validated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum EnforcementDecision {
    /// Clean output.
    Accept { result: GovernorValidationResult },

    /// Output is kept; violations or warnings ride along as metadata.
    AcceptWithWarnings { result: GovernorValidationResult },

    /// Strict governor with violations: discard the output.
    Halt { result: GovernorValidationResult },
}

impl EnforcementDecision {
    pub fn result(&self) -> &GovernorValidationResult {
        match self {
            EnforcementDecision::Accept { result }
            | EnforcementDecision::AcceptWithWarnings { result }
            | EnforcementDecision::Halt { result } => result,
        }
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, EnforcementDecision::Halt { .. })
    }
}

impl SummaryGovernorEngine {
    /// Check a session's state against every governor constraint.
    pub fn validate(
        &self,
        state: &GovernorState,
        plan: &GenerationPlan,
        section_event: Option<&SectionDetectionEvent>,
    ) -> GovernorValidationResult {
        let governor = self.governor();
        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        let utilization = self.utilization(state, plan.total_budget);
        let effective_words =
            state.effective_word_count(governor.visual_budget.words_per_visual_equivalent);

        if utilization > governor.cut_policy.hard_limit_threshold {
            violations.push(BudgetViolation::TotalWordsExceeded {
                current: effective_words,
                limit: plan.total_budget,
            });
        } else if utilization >= NEAR_LIMIT_THRESHOLD {
            warnings.push(format!(
                "Near budget limit: {:.1}% of {} words used",
                utilization * 100.0,
                plan.total_budget
            ));
        }

        for (section_index, words) in state.section_word_counts.iter().enumerate() {
            if let Some(limit) = plan.section_limits.get(section_index) {
                if words > limit {
                    violations.push(BudgetViolation::SectionWordsExceeded {
                        section_index,
                        current: *words,
                        limit: *limit,
                    });
                }
            }
        }

        if state.visual_count > governor.visual_budget.max_visuals {
            violations.push(BudgetViolation::VisualCountExceeded {
                current: state.visual_count,
                limit: governor.visual_budget.max_visuals,
            });
        }

        if !self.is_audio_within_limit(state.current_word_count) {
            violations.push(BudgetViolation::AudioMinutesExceeded {
                current: Self::audio_minutes(state.current_word_count),
                limit: self.audio_limit_with_tolerance(),
            });
        }

        for (section_index, count) in &state.synthesis_count_per_section {
            if *count > governor.max_synthesis_per_section {
                violations.push(BudgetViolation::SynthesisLimitExceeded {
                    section_index: *section_index,
                    current: *count,
                    limit: governor.max_synthesis_per_section,
                });
            }
        }

        let pending: usize = state.pending_consolidation.values().map(Vec::len).sum();
        if pending > 0 {
            warnings.push(format!(
                "{} cut events still awaiting consolidation",
                pending
            ));
        }

        GovernorValidationResult {
            summary_type: governor.summary_type,
            governor_version: governor.version.clone(),
            is_valid: violations.is_empty(),
            violations,
            warnings,
            budget_utilization: utilization,
            effective_budget: plan.total_budget,
            cut_events: state.cut_events.clone(),
            section_detection_event: section_event.cloned(),
        }
    }

    /// Apply the governor's enforcement mode to a validation result.
    pub fn enforce(&self, result: GovernorValidationResult) -> EnforcementDecision {
        if result.violations.is_empty() {
            if result.warnings.is_empty() {
                return EnforcementDecision::Accept { result };
            }
            return EnforcementDecision::AcceptWithWarnings { result };
        }

        if self.governor().strict_enforcement {
            tracing::warn!(
                summary_type = %result.summary_type,
                violations = result.violations.len(),
                "Strict governor halted output"
            );
            return EnforcementDecision::Halt { result };
        }

        tracing::info!(
            summary_type = %result.summary_type,
            violations = result.violations.len(),
            "Accepting output with budget violations attached"
        );
        EnforcementDecision::AcceptWithWarnings { result }
    }
}
