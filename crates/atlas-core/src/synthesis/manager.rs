//! Per-section synthesis caps and overflow consolidation.
//!
//! Each section may emit up to the governor's `max_synthesis_per_section`
//! paragraphs. Further cuts in that section are queued in the session state
//! and later merged into one consolidated paragraph. Call
//! [`SynthesisManager::finalize_all`] when generation ends, otherwise queued
//! cuts never surface.

use serde::{Deserialize, Serialize};

use crate::governor::{CutEvent, GovernorState, SummaryTypeGovernor};
use crate::types::SourceType;

use super::generator::{
    first_sentence, normalize_synthesis_length, SynthesisGenerator, SynthesisParagraph,
    MAX_SYNTHESIS_WORDS, MIN_CONSOLIDATED_WORDS,
};

/// Key points lifted from pending paragraphs into a consolidated one.
pub const MAX_CONSOLIDATED_KEY_POINTS: usize = 3;

/// What happened to one cut event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    /// Insert this paragraph where the cut content was.
    Emitted { paragraph: SynthesisParagraph },

    /// The section is at its cap; the cut waits for consolidation.
    Deferred { section_index: usize, pending: usize },

    /// The governor omits cut content without replacement.
    Omitted,
}

#[derive(Debug, Clone)]
pub struct SynthesisManager {
    generator: SynthesisGenerator,
    max_per_section: usize,
}

impl SynthesisManager {
    pub fn new(generator: SynthesisGenerator, max_per_section: usize) -> Self {
        Self {
            generator,
            max_per_section,
        }
    }

    pub fn for_governor(governor: &SummaryTypeGovernor, source_type: SourceType) -> Self {
        Self::new(
            SynthesisGenerator::new(source_type),
            governor.max_synthesis_per_section,
        )
    }

    /// Emit or defer the replacement for one cut.
    pub fn handle_cut(
        &self,
        state: &mut GovernorState,
        event: &CutEvent,
        context_summary: &str,
    ) -> SynthesisOutcome {
        if event.replacement_word_count == 0 {
            return SynthesisOutcome::Omitted;
        }

        let section_index = event.section_index;
        if state.synthesis_count(section_index) < self.max_per_section {
            let paragraph = self.generator.generate(event, context_summary);
            *state
                .synthesis_count_per_section
                .entry(section_index)
                .or_insert(0) += 1;
            return SynthesisOutcome::Emitted { paragraph };
        }

        let queue = state.pending_consolidation.entry(section_index).or_default();
        queue.push(event.clone());
        let pending = queue.len();

        tracing::debug!(
            section = section_index,
            pending,
            cap = self.max_per_section,
            "Synthesis deferred for consolidation"
        );

        SynthesisOutcome::Deferred {
            section_index,
            pending,
        }
    }

    /// Merge a section's queued cuts into one paragraph and clear the queue.
    ///
    /// Returns `None` when nothing is pending for the section.
    pub fn consolidate_section(
        &self,
        state: &mut GovernorState,
        section_index: usize,
        context_summary: &str,
    ) -> Option<SynthesisParagraph> {
        let pending = state.pending_consolidation.remove(&section_index)?;
        let first = pending.first()?;
        let replaced_type = first.expansion_type;

        let mut key_points: Vec<String> = Vec::new();
        for event in &pending {
            let sentence = first_sentence(&self.generator.generate(event, context_summary).content);
            if !key_points.contains(&sentence) {
                key_points.push(sentence);
            }
            if key_points.len() == MAX_CONSOLIDATED_KEY_POINTS {
                break;
            }
        }

        let content = normalize_synthesis_length(
            &key_points.join(" "),
            MIN_CONSOLIDATED_WORDS,
            MAX_SYNTHESIS_WORDS,
        );

        for cut in state.cut_events.iter_mut() {
            if pending.iter().any(|p| p.chunk_index == cut.chunk_index) {
                cut.consolidated = true;
            }
        }

        tracing::info!(
            section = section_index,
            merged = pending.len(),
            "Consolidated deferred synthesis"
        );

        Some(SynthesisParagraph::new(content, replaced_type, section_index, true))
    }

    /// Consolidate every section that still has queued cuts.
    pub fn finalize_all(&self, state: &mut GovernorState, context_summary: &str) -> Vec<SynthesisParagraph> {
        let sections: Vec<usize> = state.pending_consolidation.keys().copied().collect();
        sections
            .into_iter()
            .filter_map(|section| self.consolidate_section(state, section, context_summary))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::presets;
    use crate::types::{ExpansionType, SummaryType};
    use chrono::Utc;

    fn cut(section_index: usize, chunk_index: usize, expansion_type: ExpansionType) -> CutEvent {
        CutEvent {
            expansion_type,
            original_word_count: 250,
            replacement_word_count: 75,
            reason: "test".to_string(),
            section_index,
            chunk_index,
            budget_utilization: 0.9,
            timestamp: Utc::now(),
            consolidated: false,
        }
    }

    fn manager(max: usize) -> SynthesisManager {
        SynthesisManager::new(SynthesisGenerator::new(SourceType::Argumentative), max)
    }

    #[test]
    fn test_emits_until_cap_then_defers() {
        let manager = manager(2);
        let mut state = GovernorState::new();

        for i in 0..2 {
            let outcome = manager.handle_cut(&mut state, &cut(1, i, ExpansionType::Exercise), "habits");
            assert!(matches!(outcome, SynthesisOutcome::Emitted { .. }));
        }
        let outcome = manager.handle_cut(&mut state, &cut(1, 2, ExpansionType::Exercise), "habits");
        assert_eq!(
            outcome,
            SynthesisOutcome::Deferred {
                section_index: 1,
                pending: 1
            }
        );
        assert_eq!(state.synthesis_count(1), 2);
        assert_eq!(state.pending_count(1), 1);
    }

    #[test]
    fn test_caps_are_per_section() {
        let manager = manager(1);
        let mut state = GovernorState::new();
        manager.handle_cut(&mut state, &cut(0, 0, ExpansionType::Exercise), "a");
        let outcome = manager.handle_cut(&mut state, &cut(1, 1, ExpansionType::Exercise), "a");
        assert!(matches!(outcome, SynthesisOutcome::Emitted { .. }));
    }

    #[test]
    fn test_omit_strategy_emits_nothing() {
        let manager = manager(3);
        let mut state = GovernorState::new();
        let mut event = cut(0, 0, ExpansionType::Exercise);
        event.replacement_word_count = 0;

        assert_eq!(manager.handle_cut(&mut state, &event, "x"), SynthesisOutcome::Omitted);
        assert_eq!(state.synthesis_count(0), 0);
    }

    #[test]
    fn test_consolidate_merges_pending() {
        let manager = manager(0);
        let mut state = GovernorState::new();
        let events = [
            cut(3, 0, ExpansionType::Exercise),
            cut(3, 1, ExpansionType::SecondaryExample),
            cut(3, 2, ExpansionType::StylisticElaboration),
            cut(3, 3, ExpansionType::ExtendedCommentary),
        ];
        for event in &events {
            state.cut_events.push(event.clone());
            manager.handle_cut(&mut state, event, "compounding");
        }
        assert_eq!(state.pending_count(3), 4);

        let paragraph = manager
            .consolidate_section(&mut state, 3, "compounding")
            .expect("pending cuts consolidate");

        assert!(paragraph.consolidated);
        assert!(paragraph.is_valid(), "{} words", paragraph.word_count);
        assert!(paragraph.content.ends_with('.'));
        assert_eq!(paragraph.replaced_type, ExpansionType::Exercise);
        assert_eq!(state.pending_count(3), 0);
        assert!(state.cut_events.iter().all(|c| c.consolidated));
        assert_eq!(state.synthesis_count(3), 0);
    }

    #[test]
    fn test_consolidate_empty_section_is_none() {
        let mut state = GovernorState::new();
        assert!(manager(1).consolidate_section(&mut state, 0, "x").is_none());
    }

    #[test]
    fn test_finalize_all_flushes_every_section() {
        let governor = presets::governor(SummaryType::QuickReference);
        let manager = SynthesisManager::for_governor(governor, SourceType::Technical);
        let mut state = GovernorState::new();

        for (i, section) in [0, 0, 2, 2, 2].into_iter().enumerate() {
            manager.handle_cut(&mut state, &cut(section, i, ExpansionType::Exercise), "setup");
        }

        let consolidated = manager.finalize_all(&mut state, "setup");
        let sections: Vec<_> = consolidated.iter().map(|p| p.section_index).collect();
        assert_eq!(sections, vec![0, 2]);
        assert!(state.pending_consolidation.is_empty());
    }
}
