//! Subcommand implementations. Each one prints either a short human summary
//! or, with `--json`, the underlying serde representation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use atlas_core::governor::{load_governors_file, presets as governor_presets};
use atlas_core::{
    analyze_source, audit_structure, parse_guide, reader_presets, ChapterDetectionResult,
    ChunkProcessingResult, ContentChunk, EnforcementDecision, ExpansionTypeDetector,
    GovernorState, LayoutScore, QualityEvaluation, ReaderProfile, RegenerationDecision,
    ScoreFormat, SectionStrategy, StructureAudit, SummaryGovernorEngine, SummaryType,
    VisualDensityAnalyzer, VisualDensityReport,
};

use crate::PresetFormat;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn presets(format: PresetFormat) -> Result<()> {
    let governors: Vec<_> = governor_presets::all().collect();
    match format {
        PresetFormat::Json => print_json(&governors),
        PresetFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&governors)?);
            Ok(())
        }
    }
}

pub fn budget(
    summary_type: SummaryType,
    source: Option<&Path>,
    source_words: Option<usize>,
    json: bool,
) -> Result<()> {
    let engine = SummaryGovernorEngine::for_summary_type(summary_type);

    let plan = match source {
        Some(path) => {
            let text = read_text(path)?;
            let analysis = analyze_source(&text, engine.governor().section_budget.fallback_strategy);
            for note in analysis.ambiguities() {
                note.log();
            }
            engine.plan(analysis.source_word_count, &analysis.chapters)
        }
        None => {
            let words = source_words.context("either --source or --source-words is required")?;
            engine.plan(
                words,
                &ChapterDetectionResult::monolith("source text not provided"),
            )
        }
    };

    if json {
        return print_json(&plan);
    }

    println!("Summary type:   {}", plan.summary_type);
    println!("Source words:   {}", plan.source_word_count);
    println!("Total budget:   {}", plan.total_budget);
    println!(
        "Sections:       intro {} / chapters {} / conclusion {}",
        plan.sections.intro_words, plan.sections.chapter_pool_words, plan.sections.conclusion_words
    );
    match plan.chapter_budget.max_words() {
        Some(max) => println!("Chapters:       {} (max {} words each)", plan.chapter_count, max),
        None => println!("Chapters:       generated as one body"),
    }
    println!("Section limits: {:?}", plan.section_limits);
    Ok(())
}

pub fn detect(file: &Path, json: bool) -> Result<()> {
    let text = read_text(file)?;
    let analysis = analyze_source(&text, SectionStrategy::MergeAdjacent);
    let notes = analysis.ambiguities();
    for note in &notes {
        note.log();
    }

    if json {
        return print_json(&analysis);
    }

    let detected = &analysis.source_type;
    println!("Source words: {}", analysis.source_word_count);
    println!(
        "Source type:  {} (argumentative {}, narrative {}, technical {})",
        detected.detected_type,
        detected.argumentative_score,
        detected.narrative_score,
        detected.technical_score
    );

    let event = &analysis.chapters.event;
    println!(
        "Chapters:     {} detected, {} kept ({}{})",
        event.detected_count,
        event.final_count,
        event.strategy,
        if event.fallback_triggered { ", fallback" } else { "" }
    );
    for chapter in &analysis.chapters.chapters {
        println!("  - {} (line {})", chapter.title, chapter.line_index + 1);
    }
    for note in notes {
        println!("Ambiguity:    {} [{}] -> {}", note.description, note.context, note.action);
    }
    Ok(())
}

pub fn classify(text: &str, json: bool) -> Result<()> {
    let classification = ExpansionTypeDetector::new().classify(text);
    if json {
        return print_json(&classification);
    }

    println!("{}", classification.expansion_type);
    if !classification.matched_markers.is_empty() {
        println!("markers: {}", classification.matched_markers.join(", "));
    }
    Ok(())
}

#[derive(Serialize)]
struct SimulationReport {
    total_budget: usize,
    results: Vec<ChunkProcessingResult>,
    stopped_at: Option<usize>,
    decision: EnforcementDecision,
}

pub fn simulate(
    summary_type: SummaryType,
    source_words: usize,
    chunks_path: &Path,
    json: bool,
) -> Result<()> {
    let raw = read_text(chunks_path)?;
    let chunks: Vec<ContentChunk> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse chunks from {}", chunks_path.display()))?;

    let engine = SummaryGovernorEngine::for_summary_type(summary_type);
    let chapters = ChapterDetectionResult::monolith("simulated source");
    let plan = engine.plan(source_words, &chapters);

    let mut state = GovernorState::new();
    let mut results = Vec::with_capacity(chunks.len());
    let mut stopped_at = None;

    for chunk in &chunks {
        let (next, result) = engine.process_chunk(&state, chunk, plan.total_budget);
        state = next;
        let hard_stop = result.is_hard_stop();
        results.push(result);
        if hard_stop {
            stopped_at = Some(chunk.chunk_index);
            break;
        }
    }

    let decision = engine.enforce(engine.validate(&state, &plan, Some(&chapters.event)));
    let report = SimulationReport {
        total_budget: plan.total_budget,
        results,
        stopped_at,
        decision,
    };

    if json {
        return print_json(&report);
    }

    println!("Total budget: {}", report.total_budget);
    for (chunk, result) in chunks.iter().zip(&report.results) {
        let label = match result {
            ChunkProcessingResult::Continue { utilization, .. } => {
                format!("continue ({:.1}%)", utilization * 100.0)
            }
            ChunkProcessingResult::HardLimitExceeded { utilization, .. } => {
                format!("HARD STOP ({:.1}%)", utilization * 100.0)
            }
            ChunkProcessingResult::Replayed { .. } => "replayed".to_string(),
        };
        let cuts = result.cut_events().len();
        if cuts > 0 {
            println!("  chunk {:>3}: {} [{} cut]", chunk.chunk_index, label, cuts);
        } else {
            println!("  chunk {:>3}: {}", chunk.chunk_index, label);
        }
    }

    print_decision(&report.decision);
    Ok(())
}

fn print_decision(decision: &EnforcementDecision) {
    let label = match decision {
        EnforcementDecision::Accept { .. } => "accept",
        EnforcementDecision::AcceptWithWarnings { .. } => "accept with warnings",
        EnforcementDecision::Halt { .. } => "HALT",
    };
    let result = decision.result();
    println!(
        "Decision: {} (utilization {:.1}%, {} cuts)",
        label,
        result.budget_utilization * 100.0,
        result.cut_events.len()
    );
    for violation in &result.violations {
        println!("  violation: {}", violation);
    }
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }
}

#[derive(Serialize)]
struct ScoreReport {
    evaluation: QualityEvaluation,
    decision: RegenerationDecision,
}

pub fn score(
    path: &Path,
    profile: ReaderProfile,
    format: ScoreFormat,
    attempt: u32,
    json: bool,
) -> Result<()> {
    let raw = read_text(path)?;
    let score = LayoutScore::from_json(&raw)
        .with_context(|| format!("invalid layout score in {}", path.display()))?;

    let policy = reader_presets::preset(profile).regeneration_policy(format);
    let report = ScoreReport {
        evaluation: policy.evaluate(&score),
        decision: policy.should_regenerate(&score, attempt, None),
    };

    if json {
        return print_json(&report);
    }

    println!(
        "Score: {:.2} ({}) against {} thresholds",
        report.evaluation.score(),
        format,
        profile
    );
    match &report.decision {
        RegenerationDecision::Accept { .. } => println!("Decision: accept"),
        RegenerationDecision::AcceptBest { score } => {
            println!("Decision: accept best ({:.2})", score.score_for(format))
        }
        RegenerationDecision::Regenerate {
            next_attempt,
            constraints,
        } => {
            println!("Decision: regenerate as attempt {}", next_attempt);
            for constraint in constraints {
                println!("  constraint: {:?}", constraint);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct DensityOutput {
    density: VisualDensityReport,
    audit: StructureAudit,
}

pub fn density(path: &Path, profile: ReaderProfile, json: bool) -> Result<()> {
    let raw = read_text(path)?;
    let parsed =
        parse_guide(&raw).with_context(|| format!("failed to parse guide {}", path.display()))?;

    let constraints = reader_presets::preset(profile).constraints();
    let output = DensityOutput {
        density: VisualDensityAnalyzer::for_profile(profile).analyze(&parsed.document),
        audit: audit_structure(&parsed, &constraints),
    };

    if json {
        return print_json(&output);
    }

    let density = &output.density;
    println!(
        "Density score: {:.2} ({} visuals, {} words, {:.1} per 1000 words)",
        density.score, density.total_visuals, density.total_words, density.visuals_per_1000_words
    );
    println!(
        "Structure:     {}/{} checks passed ({})",
        output.audit.checks_passed,
        output.audit.checks_run,
        if output.audit.passes() { "pass" } else { "fail" }
    );
    for block in &output.audit.missing_blocks {
        println!("  missing block: {}", block);
    }
    for issue in density.issues.iter().chain(&output.audit.issues) {
        println!("  {:?} {:?}: {}", issue.severity, issue.issue_type, issue.suggestion);
    }
    Ok(())
}

#[derive(Serialize)]
struct GovernorSummary {
    summary_type: SummaryType,
    version: String,
    base_word_count: usize,
    max_word_ceiling: usize,
    strict_enforcement: bool,
}

pub fn check_config(path: &Path, json: bool) -> Result<()> {
    let governors = load_governors_file(path)
        .with_context(|| format!("invalid governor file {}", path.display()))?;

    let summaries: Vec<GovernorSummary> = governors
        .into_iter()
        .map(|g| GovernorSummary {
            summary_type: g.summary_type,
            version: g.version,
            base_word_count: g.base_word_count,
            max_word_ceiling: g.max_word_ceiling,
            strict_enforcement: g.strict_enforcement,
        })
        .collect();

    if json {
        return print_json(&summaries);
    }

    println!("{}: {} governor(s) valid", path.display(), summaries.len());
    for s in &summaries {
        println!(
            "  {} v{}: base {} words, ceiling {}{}",
            s.summary_type,
            s.version,
            s.base_word_count,
            s.max_word_ceiling,
            if s.strict_enforcement { ", strict" } else { "" }
        );
    }
    Ok(())
}
