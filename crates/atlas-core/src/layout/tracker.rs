//! Append-only log of regeneration attempts for one session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::policy::{RegenerationConstraint, RegenerationDecision};
use super::score::{LayoutScore, ScoreFormat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerationAttempt {
    pub attempt_number: u32,
    pub score: LayoutScore,
    pub decision: RegenerationDecision,

    /// Constraints the generator ran under for this attempt, accumulated
    /// across earlier regenerations. Empty for the first attempt.
    pub constraints_applied: BTreeSet<RegenerationConstraint>,

    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerationTracker {
    max_regeneration_attempts: u32,
    format: ScoreFormat,
    attempts: Vec<RegenerationAttempt>,
}

impl RegenerationTracker {
    pub fn new(max_regeneration_attempts: u32, format: ScoreFormat) -> Self {
        Self {
            max_regeneration_attempts,
            format,
            attempts: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        score: LayoutScore,
        decision: RegenerationDecision,
        constraints_applied: BTreeSet<RegenerationConstraint>,
    ) -> &RegenerationAttempt {
        let attempt_number = self.attempts.len() as u32 + 1;
        tracing::debug!(
            attempt = attempt_number,
            decision = decision.label(),
            "Regeneration attempt recorded"
        );
        self.attempts.push(RegenerationAttempt {
            attempt_number,
            score,
            decision,
            constraints_applied,
            timestamp: Utc::now(),
        });
        &self.attempts[self.attempts.len() - 1]
    }

    pub fn attempts(&self) -> &[RegenerationAttempt] {
        &self.attempts
    }

    /// Number of the next attempt, 1-based.
    pub fn next_attempt_number(&self) -> u32 {
        self.attempts.len() as u32 + 1
    }

    /// Highest-scoring attempt so far in the tracker's format.
    ///
    /// Only attempts on the latest attempt's rubric are considered.
    pub fn best_score(&self) -> Option<&LayoutScore> {
        let latest = &self.attempts.last()?.score;
        self.attempts
            .iter()
            .map(|a| &a.score)
            .filter(|s| s.comparable_with(latest).is_ok())
            .fold(None, |best: Option<&LayoutScore>, s| match best {
                Some(b) if b.score_for(self.format) >= s.score_for(self.format) => Some(b),
                _ => Some(s),
            })
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts.len() as u32 >= self.max_regeneration_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regenerate() -> RegenerationDecision {
        RegenerationDecision::Regenerate {
            next_attempt: 2,
            constraints: BTreeSet::new(),
        }
    }

    #[test]
    fn test_empty_tracker() {
        let tracker = RegenerationTracker::new(3, ScoreFormat::Overall);
        assert!(tracker.best_score().is_none());
        assert!(!tracker.is_exhausted());
        assert_eq!(tracker.next_attempt_number(), 1);
    }

    #[test]
    fn test_best_score_and_exhaustion() {
        let mut tracker = RegenerationTracker::new(3, ScoreFormat::Overall);
        for value in [0.4, 0.65, 0.5] {
            tracker.record(LayoutScore::uniform(value, vec![]), regenerate(), BTreeSet::new());
        }

        assert_eq!(tracker.best_score().map(|s| s.overall), Some(0.65));
        assert!(tracker.is_exhausted());
        assert_eq!(tracker.attempts()[2].attempt_number, 3);
    }

    #[test]
    fn test_best_score_skips_other_rubrics() {
        let mut tracker = RegenerationTracker::new(5, ScoreFormat::Overall);
        let mut old = LayoutScore::uniform(0.9, vec![]);
        old.rubric_version = "0.9.0".to_string();
        tracker.record(old, regenerate(), BTreeSet::new());
        tracker.record(LayoutScore::uniform(0.5, vec![]), regenerate(), BTreeSet::new());

        assert_eq!(tracker.best_score().map(|s| s.overall), Some(0.5));
    }
}
