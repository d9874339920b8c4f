//! Streaming state and the records that flow through it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::ExpansionType;

/// One unit of streamed content from the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChunk {
    pub word_count: usize,
    pub section_index: usize,
    pub chunk_index: usize,
    #[serde(default)]
    pub expansion_type: Option<ExpansionType>,
    #[serde(default)]
    pub visual_count: usize,
}

impl ContentChunk {
    pub fn new(word_count: usize, section_index: usize, chunk_index: usize) -> Self {
        Self {
            word_count,
            section_index,
            chunk_index,
            expansion_type: None,
            visual_count: 0,
        }
    }

    pub fn with_expansion(mut self, expansion: ExpansionType) -> Self {
        self.expansion_type = Some(expansion);
        self
    }

    pub fn with_visuals(mut self, visuals: usize) -> Self {
        self.visual_count = visuals;
        self
    }
}

/// Record of content the cut policy marks for replacement.
///
/// The engine only records the cut. Substituting the replacement text is the
/// caller's job, and the chunk's words stay in the governor's totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutEvent {
    pub expansion_type: ExpansionType,
    pub original_word_count: usize,
    pub replacement_word_count: usize,
    pub reason: String,
    pub section_index: usize,
    pub chunk_index: usize,

    /// Utilization when the cut fired.
    pub budget_utilization: f64,

    /// Logging only. Never read by any decision.
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub consolidated: bool,
}

impl CutEvent {
    /// Words the caller saves by substituting the replacement.
    pub fn words_saved(&self) -> usize {
        self.original_word_count.saturating_sub(self.replacement_word_count)
    }
}

/// Mutable bookkeeping for one generation session.
///
/// The engine never mutates a state in place: every transition returns a new
/// value, so callers can persist a snapshot after each chunk and resume an
/// interrupted stream from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernorState {
    pub current_word_count: usize,
    pub current_section_index: usize,
    pub section_word_counts: Vec<usize>,
    pub expansion_usage_counts: BTreeMap<ExpansionType, usize>,
    pub visual_count: usize,

    /// One-way latch; never resets within a session.
    pub cut_policy_activated: bool,

    pub synthesis_count_per_section: BTreeMap<usize, usize>,
    pub pending_consolidation: BTreeMap<usize, Vec<CutEvent>>,

    /// Every cut applied this session, in order.
    #[serde(default)]
    pub cut_events: Vec<CutEvent>,

    /// Highest chunk index processed; used to drop replays after a resume.
    #[serde(default)]
    pub last_chunk_index: Option<usize>,
}

impl GovernorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Words plus the word-equivalent cost of visuals.
    pub fn effective_word_count(&self, words_per_visual: usize) -> usize {
        self.current_word_count + self.visual_count * words_per_visual
    }

    pub fn section_words(&self, section_index: usize) -> usize {
        self.section_word_counts.get(section_index).copied().unwrap_or(0)
    }

    pub fn synthesis_count(&self, section_index: usize) -> usize {
        self.synthesis_count_per_section
            .get(&section_index)
            .copied()
            .unwrap_or(0)
    }

    pub fn pending_count(&self, section_index: usize) -> usize {
        self.pending_consolidation
            .get(&section_index)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Whether a chunk with this index was already applied.
    pub fn has_processed(&self, chunk_index: usize) -> bool {
        self.last_chunk_index.is_some_and(|last| chunk_index <= last)
    }

    pub(crate) fn add_section_words(&mut self, section_index: usize, words: usize) {
        if self.section_word_counts.len() <= section_index {
            self.section_word_counts.resize(section_index + 1, 0);
        }
        self.section_word_counts[section_index] += words;
    }
}

/// Outcome of feeding one chunk to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ChunkProcessingResult {
    /// Keep streaming. Apply any cuts produced by this chunk.
    Continue {
        cut_events: Vec<CutEvent>,
        utilization: f64,
    },

    /// Utilization passed the hard limit. The caller must stop streaming now.
    HardLimitExceeded {
        cut_events: Vec<CutEvent>,
        utilization: f64,
    },

    /// The chunk index was already processed; state is unchanged.
    Replayed { chunk_index: usize },
}

impl ChunkProcessingResult {
    pub fn is_continue(&self) -> bool {
        matches!(self, ChunkProcessingResult::Continue { .. })
    }

    pub fn is_hard_stop(&self) -> bool {
        matches!(self, ChunkProcessingResult::HardLimitExceeded { .. })
    }

    pub fn cut_events(&self) -> &[CutEvent] {
        match self {
            ChunkProcessingResult::Continue { cut_events, .. }
            | ChunkProcessingResult::HardLimitExceeded { cut_events, .. } => cut_events,
            ChunkProcessingResult::Replayed { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_words_grow_sequence() {
        let mut state = GovernorState::new();
        state.add_section_words(3, 120);
        assert_eq!(state.section_word_counts, vec![0, 0, 0, 120]);
        state.add_section_words(1, 30);
        assert_eq!(state.section_words(1), 30);
        assert_eq!(state.section_words(3), 120);
        assert_eq!(state.section_words(9), 0);
    }

    #[test]
    fn test_effective_word_count_includes_visuals() {
        let state = GovernorState {
            current_word_count: 500,
            visual_count: 2,
            ..Default::default()
        };
        assert_eq!(state.effective_word_count(75), 650);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = GovernorState::new();
        state.add_section_words(1, 40);
        state.expansion_usage_counts.insert(ExpansionType::Exercise, 2);
        state.synthesis_count_per_section.insert(1, 1);
        state.cut_policy_activated = true;
        state.last_chunk_index = Some(7);

        let json = serde_json::to_string(&state).unwrap();
        let restored: GovernorState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_has_processed() {
        let mut state = GovernorState::new();
        assert!(!state.has_processed(0));
        state.last_chunk_index = Some(4);
        assert!(state.has_processed(4));
        assert!(!state.has_processed(5));
    }
}
