//! Budget arithmetic and the streaming state machine.
//!
//! Every operation here is a pure function of the governor and its inputs.
//! The only "state" is the `GovernorState` value the caller threads through
//! `process_chunk`, which returns a new value instead of mutating its input.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::detection::ChapterDetectionResult;
use crate::types::SummaryType;

use super::config::SummaryTypeGovernor;
use super::presets;
use super::state::{ChunkProcessingResult, ContentChunk, CutEvent, GovernorState};

/// A summary may never exceed this share of a short source.
pub const SHORT_SOURCE_CAP_RATIO: f64 = 0.80;

/// Below this per-chapter allotment, per-chapter generation is abandoned.
pub const MINIMUM_ADJUSTED_CHAPTER_WORDS: usize = 100;

/// Headroom added over the adjusted minimum for the adjusted maximum.
pub const ADJUSTED_MAX_HEADROOM: usize = 50;

/// Narration speed used for audio-length estimates.
pub const WORDS_PER_MINUTE: f64 = 150.0;

/// Allowed overshoot of the audio limit.
pub const AUDIO_TOLERANCE: f64 = 0.10;

/// Intro / chapter pool / conclusion split of a total budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionBudgets {
    pub intro_words: usize,
    pub chapter_pool_words: usize,
    pub conclusion_words: usize,
}

impl SectionBudgets {
    pub fn total(&self) -> usize {
        self.intro_words + self.chapter_pool_words + self.conclusion_words
    }
}

/// Per-chapter allotment. Callers branch on the variant: `Fallback` means
/// the chapter pool is generated as one body instead of chapter by chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChapterBudget {
    /// The governor's own min/max fit the pool.
    Normal { min_words: usize, max_words: usize },

    /// The governor minimum did not fit; limits were scaled to the pool.
    Adjusted {
        min_words: usize,
        max_words: usize,
        reason: String,
    },

    /// Per-chapter generation is not viable.
    Fallback { reason: String },
}

impl ChapterBudget {
    pub fn max_words(&self) -> Option<usize> {
        match self {
            ChapterBudget::Normal { max_words, .. } | ChapterBudget::Adjusted { max_words, .. } => {
                Some(*max_words)
            }
            ChapterBudget::Fallback { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ChapterBudget::Fallback { .. })
    }
}

/// Everything the generation backend needs to know about its word budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPlan {
    pub summary_type: SummaryType,
    pub source_word_count: usize,
    pub total_budget: usize,
    pub sections: SectionBudgets,
    pub chapter_count: usize,
    pub chapter_budget: ChapterBudget,

    /// Word ceiling per generated section: intro, each chapter, conclusion.
    pub section_limits: Vec<usize>,
}

/// Deterministic budget engine for one governor.
#[derive(Debug, Clone)]
pub struct SummaryGovernorEngine {
    governor: SummaryTypeGovernor,
}

impl SummaryGovernorEngine {
    pub fn new(governor: SummaryTypeGovernor) -> Self {
        Self { governor }
    }

    /// Engine backed by a shipped preset.
    pub fn for_summary_type(summary_type: SummaryType) -> Self {
        Self::new(presets::governor(summary_type).clone())
    }

    pub fn governor(&self) -> &SummaryTypeGovernor {
        &self.governor
    }

    /// Total word budget for a source of the given length.
    ///
    /// `min(base + scaled, ceiling, max(source × 0.80, base))`
    pub fn calculate_total_budget(&self, source_word_count: usize) -> usize {
        let g = &self.governor;
        let source = source_word_count as f64;

        let scaled_addition = if source_word_count < g.min_source_length_for_scaling {
            0.0
        } else {
            (source * g.source_scaling_factor).min(g.max_scaled_addition as f64)
        };

        let short_source_cap = (source * SHORT_SOURCE_CAP_RATIO).max(g.base_word_count as f64);

        (g.base_word_count as f64 + scaled_addition)
            .min(g.max_word_ceiling as f64)
            .min(short_source_cap)
            .floor() as usize
    }

    /// Split a total budget by the governor's fixed percentages.
    ///
    /// The chapter pool takes the rounding remainder so the parts always add
    /// back up to the total.
    pub fn calculate_section_budgets(&self, total_budget: usize) -> SectionBudgets {
        let split = &self.governor.section_budget;
        let total = total_budget as f64;

        let intro_words = (total * split.intro_percent).floor() as usize;
        let conclusion_words = (total * split.conclusion_percent).floor() as usize;
        let chapter_pool_words = total_budget.saturating_sub(intro_words + conclusion_words);

        SectionBudgets {
            intro_words,
            chapter_pool_words,
            conclusion_words,
        }
    }

    /// Per-chapter allotment for a chapter pool.
    pub fn calculate_chapter_budget(&self, chapter_count: usize, chapter_pool_words: usize) -> ChapterBudget {
        let split = &self.governor.section_budget;

        if chapter_count == 0 {
            return ChapterBudget::Fallback {
                reason: "No chapters detected".to_string(),
            };
        }

        if split.min_words_per_chapter * chapter_count > chapter_pool_words {
            let adjusted_min = chapter_pool_words / chapter_count;

            if adjusted_min < MINIMUM_ADJUSTED_CHAPTER_WORDS {
                return ChapterBudget::Fallback {
                    reason: format!(
                        "Adjusted per-chapter minimum {} is below {} words",
                        adjusted_min, MINIMUM_ADJUSTED_CHAPTER_WORDS
                    ),
                };
            }

            let adjusted_max = (adjusted_min + ADJUSTED_MAX_HEADROOM).min(split.max_words_per_chapter);
            return ChapterBudget::Adjusted {
                min_words: adjusted_min,
                max_words: adjusted_max,
                reason: format!(
                    "{} chapters × {} minimum exceeds pool of {} words",
                    chapter_count, split.min_words_per_chapter, chapter_pool_words
                ),
            };
        }

        ChapterBudget::Normal {
            min_words: split.min_words_per_chapter,
            max_words: split.max_words_per_chapter,
        }
    }

    /// Build the full plan for a source and its chapter detection.
    pub fn plan(&self, source_word_count: usize, chapters: &ChapterDetectionResult) -> GenerationPlan {
        let total_budget = self.calculate_total_budget(source_word_count);
        let sections = self.calculate_section_budgets(total_budget);
        let chapter_count = chapters.chapters.len();
        let chapter_budget = self.calculate_chapter_budget(chapter_count, sections.chapter_pool_words);

        let mut section_limits = vec![sections.intro_words];
        match chapter_budget.max_words() {
            Some(max_words) => section_limits.extend(std::iter::repeat(max_words).take(chapter_count)),
            None => section_limits.push(sections.chapter_pool_words),
        }
        section_limits.push(sections.conclusion_words);

        tracing::debug!(
            summary_type = %self.governor.summary_type,
            total_budget,
            chapter_count,
            fallback = chapter_budget.is_fallback(),
            "Generation plan computed"
        );

        GenerationPlan {
            summary_type: self.governor.summary_type,
            source_word_count,
            total_budget,
            sections,
            chapter_count,
            chapter_budget,
            section_limits,
        }
    }

    /// Estimated narration length in minutes.
    pub fn audio_minutes(word_count: usize) -> f64 {
        word_count as f64 / WORDS_PER_MINUTE
    }

    /// Whether narration fits the governor's audio limit, with tolerance.
    pub fn is_audio_within_limit(&self, word_count: usize) -> bool {
        Self::audio_minutes(word_count) <= self.audio_limit_with_tolerance()
    }

    pub(crate) fn audio_limit_with_tolerance(&self) -> f64 {
        self.governor.max_audio_minutes * (1.0 + AUDIO_TOLERANCE)
    }

    /// Effective consumed budget over total budget.
    pub fn utilization(&self, state: &GovernorState, total_budget: usize) -> f64 {
        let effective = state.effective_word_count(self.governor.visual_budget.words_per_visual_equivalent);
        if total_budget == 0 {
            return if effective == 0 { 0.0 } else { f64::INFINITY };
        }
        effective as f64 / total_budget as f64
    }

    /// Apply one streamed chunk.
    ///
    /// Returns the next state and what the caller must do. The input state is
    /// left untouched; persist the returned state to resume later.
    pub fn process_chunk(
        &self,
        state: &GovernorState,
        chunk: &ContentChunk,
        total_budget: usize,
    ) -> (GovernorState, ChunkProcessingResult) {
        if state.has_processed(chunk.chunk_index) {
            tracing::debug!(chunk = chunk.chunk_index, "Ignoring replayed chunk");
            return (
                state.clone(),
                ChunkProcessingResult::Replayed {
                    chunk_index: chunk.chunk_index,
                },
            );
        }

        let policy = &self.governor.cut_policy;
        let mut next = state.clone();

        next.current_word_count += chunk.word_count;
        next.add_section_words(chunk.section_index, chunk.word_count);
        next.current_section_index = chunk.section_index;
        if let Some(expansion) = chunk.expansion_type {
            *next.expansion_usage_counts.entry(expansion).or_insert(0) += 1;
        }
        next.visual_count += chunk.visual_count;
        next.last_chunk_index = Some(chunk.chunk_index);

        if !next.cut_policy_activated {
            let utilization = self.utilization(&next, total_budget);
            if utilization >= policy.trigger_threshold {
                next.cut_policy_activated = true;
                tracing::info!(
                    summary_type = %self.governor.summary_type,
                    utilization,
                    chunk = chunk.chunk_index,
                    "Cut policy activated"
                );
            }
        }

        // Cut events are records for the caller. The chunk's words stay counted
        // so the hard limit is checked against what was actually generated.
        let mut cut_events = Vec::new();
        if next.cut_policy_activated {
            if let Some(expansion) = chunk.expansion_type.filter(|e| policy.can_cut(*e)) {
                let replacement = policy.replacement_word_count();
                let utilization = self.utilization(&next, total_budget);
                let position = policy
                    .cut_order
                    .iter()
                    .position(|e| *e == expansion)
                    .unwrap_or_default();

                let event = CutEvent {
                    expansion_type: expansion,
                    original_word_count: chunk.word_count,
                    replacement_word_count: replacement,
                    reason: format!(
                        "Cut policy active at {:.1}% utilization; {} is cut priority {}",
                        utilization * 100.0,
                        expansion,
                        position + 1
                    ),
                    section_index: chunk.section_index,
                    chunk_index: chunk.chunk_index,
                    budget_utilization: utilization,
                    timestamp: Utc::now(),
                    consolidated: false,
                };

                tracing::debug!(
                    expansion = %expansion,
                    section = chunk.section_index,
                    words = chunk.word_count,
                    replacement,
                    saved = event.words_saved(),
                    "Cut recorded"
                );

                next.cut_events.push(event.clone());
                cut_events.push(event);
            }
        }

        let utilization = self.utilization(&next, total_budget);
        if utilization > policy.hard_limit_threshold {
            tracing::warn!(
                summary_type = %self.governor.summary_type,
                utilization,
                chunk = chunk.chunk_index,
                "Hard limit exceeded; streaming must stop"
            );
            return (
                next,
                ChunkProcessingResult::HardLimitExceeded {
                    cut_events,
                    utilization,
                },
            );
        }

        (
            next,
            ChunkProcessingResult::Continue {
                cut_events,
                utilization,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExpansionType;

    fn professional() -> SummaryGovernorEngine {
        SummaryGovernorEngine::for_summary_type(SummaryType::Professional)
    }

    fn quick() -> SummaryGovernorEngine {
        SummaryGovernorEngine::for_summary_type(SummaryType::QuickReference)
    }

    #[test]
    fn test_total_budget_below_scaling_threshold() {
        assert_eq!(quick().calculate_total_budget(5_000), 900);
    }

    #[test]
    fn test_total_budget_scaled_and_capped() {
        assert_eq!(professional().calculate_total_budget(100_000), 4_500);
        // 30k × 0.02 = 600 added
        assert_eq!(professional().calculate_total_budget(30_000), 3_600);
    }

    #[test]
    fn test_total_budget_short_source_cap() {
        // 80% of 2000 is 1600, below the base floor of 3000, so the floor wins.
        assert_eq!(professional().calculate_total_budget(2_000), 3_000);
        // quick reference: 80% of 1000 = 800 < base 900 → capped at 900
        assert_eq!(quick().calculate_total_budget(1_000), 900);
    }

    #[test]
    fn test_section_budgets_sum_to_total() {
        let budgets = professional().calculate_section_budgets(4_501);
        assert_eq!(budgets.intro_words, 450);
        assert_eq!(budgets.conclusion_words, 450);
        assert_eq!(budgets.total(), 4_501);
    }

    #[test]
    fn test_chapter_budget_variants() {
        let engine = professional();

        assert!(matches!(
            engine.calculate_chapter_budget(0, 3_600),
            ChapterBudget::Fallback { .. }
        ));

        assert_eq!(
            engine.calculate_chapter_budget(10, 3_600),
            ChapterBudget::Normal {
                min_words: 200,
                max_words: 800
            }
        );

        // 24 × 200 = 4800 > 3600 → adjusted 150, max 200
        match engine.calculate_chapter_budget(24, 3_600) {
            ChapterBudget::Adjusted {
                min_words, max_words, ..
            } => {
                assert_eq!(min_words, 150);
                assert_eq!(max_words, 200);
            }
            other => panic!("expected adjusted, got {:?}", other),
        }

        // 40 chapters → 90 per chapter, below the 100 floor
        match engine.calculate_chapter_budget(40, 3_600) {
            ChapterBudget::Fallback { reason } => assert!(reason.contains("90")),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_audio_limit_with_tolerance() {
        let engine = quick();
        // 8 minutes × 1.1 = 8.8 minutes = 1320 words
        assert!(engine.is_audio_within_limit(1_300));
        assert!(!engine.is_audio_within_limit(1_330));
    }

    #[test]
    fn test_process_chunk_does_not_mutate_input() {
        let engine = professional();
        let state = GovernorState::new();
        let (next, result) = engine.process_chunk(&state, &ContentChunk::new(100, 0, 0), 1_000);

        assert_eq!(state, GovernorState::new());
        assert_eq!(next.current_word_count, 100);
        assert!(result.is_continue());
    }

    #[test]
    fn test_visuals_count_toward_utilization() {
        let engine = professional();
        let state = GovernorState::new();
        let chunk = ContentChunk::new(100, 0, 0).with_visuals(2);
        let (next, result) = engine.process_chunk(&state, &chunk, 1_000);

        assert_eq!(next.visual_count, 2);
        match result {
            ChunkProcessingResult::Continue { utilization, .. } => {
                assert!((utilization - 0.25).abs() < 1e-9)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cut_fires_only_after_trigger() {
        let engine = professional();
        let mut state = GovernorState::new();

        let (next, result) = engine.process_chunk(
            &state,
            &ContentChunk::new(200, 1, 0).with_expansion(ExpansionType::Exercise),
            1_000,
        );
        assert!(result.cut_events().is_empty());
        state = next;

        let (next, _) = engine.process_chunk(&state, &ContentChunk::new(660, 1, 1), 1_000);
        assert!(next.cut_policy_activated);
        state = next;

        let (next, result) = engine.process_chunk(
            &state,
            &ContentChunk::new(100, 2, 2).with_expansion(ExpansionType::SecondaryExample),
            1_000,
        );
        let events = result.cut_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].original_word_count, 100);
        assert_eq!(events[0].replacement_word_count, 75);
        assert_eq!(events[0].words_saved(), 25);
        // The cut is a record; the words fed in stay counted.
        assert_eq!(next.current_word_count, 960);
        assert_eq!(next.section_words(2), 100);
        assert_eq!(next.cut_events.len(), 1);
        assert!(result.is_continue());
    }

    #[test]
    fn test_cut_chunk_crossing_budget_still_hard_stops() {
        let engine = quick();
        let total = engine.calculate_total_budget(5_000);
        let mut state = GovernorState::new();

        for i in 0..3 {
            let (next, result) = engine.process_chunk(&state, &ContentChunk::new(300, 0, i), total);
            assert!(result.is_continue());
            state = next;
        }

        let (next, result) = engine.process_chunk(
            &state,
            &ContentChunk::new(100, 0, 3).with_expansion(ExpansionType::Exercise),
            total,
        );
        match result {
            ChunkProcessingResult::HardLimitExceeded {
                cut_events,
                utilization,
            } => {
                assert_eq!(cut_events.len(), 1);
                assert!((utilization - 1_000.0 / 900.0).abs() < 1e-9);
            }
            other => panic!("expected hard stop, got {:?}", other),
        }
        assert_eq!(next.current_word_count, 1_000);
    }

    #[test]
    fn test_core_argument_never_cut() {
        let engine = professional();
        let state = GovernorState {
            cut_policy_activated: true,
            current_word_count: 900,
            ..Default::default()
        };
        let (_, result) = engine.process_chunk(
            &state,
            &ContentChunk::new(90, 0, 0).with_expansion(ExpansionType::CoreArgument),
            1_000,
        );
        assert!(result.cut_events().is_empty());
        assert!(result.is_continue());
    }

    #[test]
    fn test_short_chunk_is_still_cut() {
        let engine = professional();
        let state = GovernorState {
            cut_policy_activated: true,
            ..Default::default()
        };
        let (next, result) = engine.process_chunk(
            &state,
            &ContentChunk::new(40, 0, 0).with_expansion(ExpansionType::Exercise),
            1_000,
        );
        let events = result.cut_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].original_word_count, 40);
        assert_eq!(events[0].words_saved(), 0);
        assert_eq!(next.current_word_count, 40);
    }

    #[test]
    fn test_omit_strategy_records_zero_replacement() {
        let engine = quick();
        let state = GovernorState {
            cut_policy_activated: true,
            ..Default::default()
        };
        let (next, result) = engine.process_chunk(
            &state,
            &ContentChunk::new(40, 0, 0).with_expansion(ExpansionType::Exercise),
            900,
        );
        assert_eq!(result.cut_events()[0].replacement_word_count, 0);
        assert_eq!(result.cut_events()[0].words_saved(), 40);
        assert_eq!(next.current_word_count, 40);
    }

    #[test]
    fn test_hard_limit_on_crossing_chunk() {
        let engine = quick();
        let total = engine.calculate_total_budget(5_000);
        let mut state = GovernorState::new();

        for (i, words) in [300, 300, 300].iter().enumerate() {
            let (next, result) = engine.process_chunk(&state, &ContentChunk::new(*words, 0, i), total);
            assert!(result.is_continue(), "chunk {} should continue", i);
            state = next;
        }

        let (_, result) = engine.process_chunk(&state, &ContentChunk::new(50, 0, 3), total);
        match result {
            ChunkProcessingResult::HardLimitExceeded { utilization, .. } => {
                assert!((utilization - 950.0 / 900.0).abs() < 1e-9)
            }
            other => panic!("expected hard stop, got {:?}", other),
        }
    }

    #[test]
    fn test_replayed_chunk_leaves_state_alone() {
        let engine = professional();
        let (state, _) = engine.process_chunk(&GovernorState::new(), &ContentChunk::new(100, 0, 0), 1_000);
        let (again, result) = engine.process_chunk(&state, &ContentChunk::new(100, 0, 0), 1_000);

        assert_eq!(again, state);
        assert_eq!(result, ChunkProcessingResult::Replayed { chunk_index: 0 });
    }

    #[test]
    fn test_plan_section_limits() {
        let engine = professional();
        let chapters = ChapterDetectionResult::for_chapter_count(4);
        let plan = engine.plan(100_000, &chapters);

        assert_eq!(plan.total_budget, 4_500);
        assert_eq!(plan.section_limits, vec![450, 800, 800, 800, 800, 450]);
    }

    #[test]
    fn test_plan_monolith_limits() {
        let engine = professional();
        let plan = engine.plan(100_000, &ChapterDetectionResult::monolith("test"));

        assert!(plan.chapter_budget.is_fallback());
        assert_eq!(plan.section_limits, vec![450, 3_600, 450]);
    }
}
