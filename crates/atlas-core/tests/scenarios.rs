//! End-to-end governance scenarios.

use std::collections::BTreeSet;

use atlas_core::detection::SourceTypeScores;
use atlas_core::reader_presets;
use atlas_core::{
    analyze_source, audit_structure, parse_guide, ChapterBudget, ContentChunk, EnforcementDecision,
    ExpansionType, GovernorState, LayoutIssueType, RegenerationConstraint, RegenerationDecision,
    RegenerationTracker, ReaderProfile, ScoreFormat, SectionStrategy, SourceType,
    SummaryGovernorEngine, SummaryType, SynthesisManager, SynthesisOutcome, VisualDensityAnalyzer,
};

fn stream(
    engine: &SummaryGovernorEngine,
    chunks: &[ContentChunk],
    total_budget: usize,
) -> (GovernorState, bool) {
    let mut state = GovernorState::new();
    for chunk in chunks {
        let (next, result) = engine.process_chunk(&state, chunk, total_budget);
        state = next;
        if result.is_hard_stop() {
            return (state, true);
        }
    }
    (state, false)
}

// ============================================================================
// Budgets
// ============================================================================

#[test]
fn quick_reference_short_source_stops_past_budget() {
    let engine = SummaryGovernorEngine::for_summary_type(SummaryType::QuickReference);
    let total_budget = engine.calculate_total_budget(5_000);
    assert_eq!(total_budget, 900);

    let mut chunks: Vec<ContentChunk> = (0..9).map(|i| ContentChunk::new(100, 0, i)).collect();
    let (state, stopped) = stream(&engine, &chunks, total_budget);
    assert!(!stopped, "exactly at budget keeps streaming");
    assert_eq!(state.current_word_count, 900);
    assert!(state.cut_policy_activated);

    chunks.push(ContentChunk::new(50, 0, 9));
    let (state, stopped) = stream(&engine, &chunks, total_budget);
    assert!(stopped);
    assert_eq!(state.current_word_count, 950);
}

#[test]
fn professional_long_source_hits_scaling_cap() {
    let engine = SummaryGovernorEngine::for_summary_type(SummaryType::Professional);
    assert_eq!(engine.calculate_total_budget(100_000), 4_500);
}

#[test]
fn cut_content_is_replaced_by_synthesis() {
    let engine = SummaryGovernorEngine::for_summary_type(SummaryType::Professional);
    let total_budget = engine.calculate_total_budget(30_000);
    let manager = SynthesisManager::for_governor(engine.governor(), SourceType::Argumentative);

    let mut chunks: Vec<ContentChunk> = (0..31).map(|i| ContentChunk::new(100, 1, i)).collect();
    chunks.push(ContentChunk::new(300, 1, 31).with_expansion(ExpansionType::Exercise));
    chunks.push(ContentChunk::new(100, 1, 32).with_expansion(ExpansionType::CoreArgument));

    let mut state = GovernorState::new();
    let mut outcomes = Vec::new();
    for chunk in &chunks {
        let (next, result) = engine.process_chunk(&state, chunk, total_budget);
        state = next;
        for event in result.cut_events() {
            outcomes.push(manager.handle_cut(&mut state, event, "compounding habits"));
        }
    }

    assert_eq!(state.cut_events.len(), 1);
    assert_eq!(state.cut_events[0].expansion_type, ExpansionType::Exercise);
    assert!(matches!(outcomes[0], SynthesisOutcome::Emitted { ref paragraph } if paragraph.is_valid()));
    assert_eq!(state.synthesis_count(1), 1);
    // The cut chunk still counts toward the budget.
    assert_eq!(state.current_word_count, 3_500);
}

// ============================================================================
// Detection
// ============================================================================

#[test]
fn tie_break_prefers_argumentative() {
    let scores = SourceTypeScores {
        argumentative: 3,
        narrative: 5,
        technical: 3,
    };
    assert_eq!(scores.resolve(), SourceType::Argumentative);
}

#[test]
fn source_without_headings_plans_as_monolith() {
    let engine = SummaryGovernorEngine::for_summary_type(SummaryType::Professional);
    let text = "An essay with no headings at all.\n".repeat(200);
    let analysis = analyze_source(&text, SectionStrategy::MergeAdjacent);

    assert!(analysis.chapters.is_monolith());
    assert!(analysis.chapters.event.fallback_triggered);

    let plan = engine.plan(analysis.source_word_count, &analysis.chapters);
    assert!(matches!(plan.chapter_budget, ChapterBudget::Fallback { .. }));
    assert_eq!(plan.section_limits.len(), 3);
    assert_eq!(plan.section_limits.iter().sum::<usize>(), plan.total_budget);
}

// ============================================================================
// Enforcement
// ============================================================================

#[test]
fn strict_governor_halts_overrun_session() {
    let engine = SummaryGovernorEngine::for_summary_type(SummaryType::QuickReference);
    let analysis = analyze_source("Chapter 1\nbody\nChapter 2\nbody", SectionStrategy::MergeAdjacent);
    let plan = engine.plan(5_000, &analysis.chapters);

    let chunks: Vec<ContentChunk> = (0..10).map(|i| ContentChunk::new(100, 1, i)).collect();
    let (state, stopped) = stream(&engine, &chunks, plan.total_budget);
    assert!(stopped);

    let decision = engine.enforce(engine.validate(&state, &plan, Some(&analysis.chapters.event)));
    if engine.governor().strict_enforcement {
        assert!(decision.is_halt());
    } else {
        assert!(matches!(decision, EnforcementDecision::AcceptWithWarnings { .. }));
    }
    assert!(!decision.result().is_valid);
}

// ============================================================================
// Layout quality loop
// ============================================================================

const CROWDED_GUIDE: &str = "\
## Habits

Short intro line here today.

[VISUAL_TABLE]
cue | craving
[/VISUAL_TABLE]
[VISUAL_CHART]
streaks
[/VISUAL_CHART]
[VISUAL_TIMELINE]
week one
[/VISUAL_TIMELINE]

Closing words.
";

#[test]
fn crowded_guide_is_regenerated_with_tighter_constraints() {
    let preset = reader_presets::preset(ReaderProfile::General);
    let guide = parse_guide(CROWDED_GUIDE).unwrap();

    let audit = audit_structure(&guide, &preset.constraints());
    assert!(!audit.passes());
    assert_eq!(audit.missing_blocks.len(), 2);

    let report = VisualDensityAnalyzer::for_profile(ReaderProfile::General).analyze(&guide.document);
    assert_eq!(report.total_visuals, 3);
    let score = report.into_layout_score();
    assert!(score.issues_of(LayoutIssueType::VisualDensity).count() == 1);

    let policy = preset.regeneration_policy(ScoreFormat::Overall);
    let mut tracker = RegenerationTracker::new(policy.max_regeneration_attempts, ScoreFormat::Overall);
    let decision = policy.should_regenerate(&score, tracker.next_attempt_number(), tracker.best_score());

    let RegenerationDecision::Regenerate { next_attempt, constraints } = decision.clone() else {
        panic!("expected regeneration, got {:?}", decision);
    };
    assert_eq!(next_attempt, 2);
    assert!(constraints.contains(&RegenerationConstraint::ReduceVisualDensity));
    assert!(constraints.contains(&RegenerationConstraint::AddTextBetweenVisuals));

    // The first attempt ran under the preset's base constraints.
    let recorded = tracker.record(score, decision, BTreeSet::new());
    assert!(recorded.constraints_applied.is_empty());
    assert_eq!(tracker.next_attempt_number(), 2);

    let base = preset.constraints();
    let tightened = base.tightened(&constraints);
    assert!(tightened.max_visuals_per_section < base.max_visuals_per_section);
    assert!(tightened.min_text_between_visuals > base.min_text_between_visuals);
}
