//! Visual density scoring.
//!
//! Pure function over a [`LayoutDocument`]. Walks blocks in order, tracking
//! words since the last visual, the consecutive-visual streak and oversized
//! visuals.
//!
//! | Adjustment | Amount |
//! |------------|--------|
//! | per issue | −0.05 each, at most −0.3 |
//! | oversized share | −0.2 × oversized / visuals |
//! | well-placed share | +0.1 × well placed / visuals |
//! | density above max | −0.05 per visual per 1000 words over, at most −0.2 |
//!
//! The result is clamped to `0.0..=1.0`.

use serde::{Deserialize, Serialize};

use crate::types::{ReaderProfile, WidthCategory};

use super::document::{LayoutBlock, LayoutDocument};
use super::score::{IssueSeverity, LayoutIssue, LayoutIssueType, LayoutScore};

const ISSUE_PENALTY: f64 = 0.05;
const MAX_ISSUE_PENALTY: f64 = 0.3;
const OVERSIZED_PENALTY: f64 = 0.2;
const WELL_PLACED_BONUS: f64 = 0.1;
const EXCESS_DENSITY_STEP: f64 = 0.05;
const MAX_EXCESS_DENSITY_PENALTY: f64 = 0.2;

/// Threshold constants. Presets differ only in these numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualDensityConfig {
    pub max_visuals_per_section: usize,
    pub max_consecutive_visuals: usize,
    pub min_text_before_visual: usize,
    pub ideal_text_before_visual: usize,
    pub min_visuals_per_1000_words: f64,
    pub max_visuals_per_1000_words: f64,
}

impl Default for VisualDensityConfig {
    fn default() -> Self {
        Self {
            max_visuals_per_section: 3,
            max_consecutive_visuals: 2,
            min_text_before_visual: 50,
            ideal_text_before_visual: 150,
            min_visuals_per_1000_words: 0.5,
            max_visuals_per_1000_words: 4.0,
        }
    }
}

impl VisualDensityConfig {
    pub fn executive() -> Self {
        Self {
            max_visuals_per_section: 4,
            max_consecutive_visuals: 2,
            min_text_before_visual: 30,
            ideal_text_before_visual: 100,
            min_visuals_per_1000_words: 1.0,
            max_visuals_per_1000_words: 6.0,
        }
    }

    pub fn academic() -> Self {
        Self {
            max_visuals_per_section: 2,
            max_consecutive_visuals: 2,
            min_text_before_visual: 80,
            ideal_text_before_visual: 200,
            min_visuals_per_1000_words: 0.3,
            max_visuals_per_1000_words: 3.0,
        }
    }

    pub fn practitioner() -> Self {
        Self {
            max_visuals_per_section: 4,
            max_consecutive_visuals: 3,
            min_text_before_visual: 40,
            ideal_text_before_visual: 120,
            min_visuals_per_1000_words: 1.0,
            max_visuals_per_1000_words: 5.0,
        }
    }

    pub fn for_profile(profile: ReaderProfile) -> Self {
        match profile {
            ReaderProfile::General => Self::default(),
            ReaderProfile::Executive => Self::executive(),
            ReaderProfile::Academic => Self::academic(),
            ReaderProfile::Practitioner => Self::practitioner(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualDensityReport {
    pub score: f64,
    pub issues: Vec<LayoutIssue>,
    pub total_visuals: usize,
    pub total_words: usize,
    pub visuals_per_1000_words: f64,
    pub oversized_visuals: usize,
    pub well_placed_visuals: usize,
}

impl VisualDensityReport {
    /// Wrap the report as a current-rubric layout score, same in every format.
    pub fn into_layout_score(self) -> LayoutScore {
        LayoutScore::uniform(self.score, self.issues)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisualDensityAnalyzer {
    config: VisualDensityConfig,
}

impl VisualDensityAnalyzer {
    pub fn new(config: VisualDensityConfig) -> Self {
        Self { config }
    }

    pub fn for_profile(profile: ReaderProfile) -> Self {
        Self::new(VisualDensityConfig::for_profile(profile))
    }

    pub fn config(&self) -> &VisualDensityConfig {
        &self.config
    }

    pub fn analyze(&self, document: &LayoutDocument) -> VisualDensityReport {
        let cfg = &self.config;
        let mut issues = Vec::new();

        let mut words_since_visual = 0;
        let mut total_visuals = 0;
        let mut oversized_visuals = 0;
        let mut well_placed_visuals = 0;

        for (section_index, section) in document.sections.iter().enumerate() {
            let mut streak = 0;
            let mut section_visuals = 0;

            for block in &section.blocks {
                match block {
                    LayoutBlock::Text { words, .. } => {
                        words_since_visual += words;
                        streak = 0;
                    }
                    LayoutBlock::Visual { width, .. } => {
                        total_visuals += 1;
                        section_visuals += 1;
                        streak += 1;

                        if streak == cfg.max_consecutive_visuals {
                            issues.push(LayoutIssue::new(
                                LayoutIssueType::ConsecutiveVisuals,
                                Some(section_index),
                                IssueSeverity::Warning,
                                format!("{} visuals in a row; separate them with text", streak),
                            ));
                        }

                        if words_since_visual < cfg.min_text_before_visual {
                            issues.push(LayoutIssue::new(
                                LayoutIssueType::InsufficientTextBeforeVisual,
                                Some(section_index),
                                IssueSeverity::Warning,
                                format!(
                                    "Only {} words before visual; at least {} expected",
                                    words_since_visual, cfg.min_text_before_visual
                                ),
                            ));
                        }

                        if words_since_visual >= cfg.ideal_text_before_visual {
                            well_placed_visuals += 1;
                        }

                        if *width == WidthCategory::Oversized {
                            oversized_visuals += 1;
                            issues.push(LayoutIssue::new(
                                LayoutIssueType::OversizedVisual,
                                Some(section_index),
                                IssueSeverity::Warning,
                                "Render this visual at standard or wide width",
                            ));
                        }

                        words_since_visual = 0;
                    }
                }
            }

            if section_visuals > cfg.max_visuals_per_section {
                issues.push(LayoutIssue::new(
                    LayoutIssueType::TooManyVisualsInSection,
                    Some(section_index),
                    IssueSeverity::Warning,
                    format!(
                        "{} visuals in section; limit is {}",
                        section_visuals, cfg.max_visuals_per_section
                    ),
                ));
            }
        }

        let total_words = document.total_words();
        let visuals_per_1000_words = if total_words == 0 {
            if total_visuals == 0 {
                0.0
            } else {
                f64::INFINITY
            }
        } else {
            total_visuals as f64 * 1000.0 / total_words as f64
        };

        if visuals_per_1000_words > cfg.max_visuals_per_1000_words {
            issues.push(LayoutIssue::new(
                LayoutIssueType::VisualDensity,
                None,
                IssueSeverity::Critical,
                format!(
                    "{:.1} visuals per 1000 words; maximum is {:.1}",
                    visuals_per_1000_words, cfg.max_visuals_per_1000_words
                ),
            ));
        } else if visuals_per_1000_words < cfg.min_visuals_per_1000_words {
            issues.push(LayoutIssue::new(
                LayoutIssueType::SparseVisuals,
                None,
                IssueSeverity::Info,
                format!(
                    "{:.1} visuals per 1000 words; minimum is {:.1}",
                    visuals_per_1000_words, cfg.min_visuals_per_1000_words
                ),
            ));
        }

        let mut score = 1.0;
        score -= (ISSUE_PENALTY * issues.len() as f64).min(MAX_ISSUE_PENALTY);
        if total_visuals > 0 {
            score -= OVERSIZED_PENALTY * oversized_visuals as f64 / total_visuals as f64;
            score += WELL_PLACED_BONUS * well_placed_visuals as f64 / total_visuals as f64;
        }
        if visuals_per_1000_words > cfg.max_visuals_per_1000_words {
            let excess = visuals_per_1000_words - cfg.max_visuals_per_1000_words;
            score -= (EXCESS_DENSITY_STEP * excess).min(MAX_EXCESS_DENSITY_PENALTY);
        }
        let score = score.clamp(0.0, 1.0);

        tracing::debug!(
            score,
            visuals = total_visuals,
            words = total_words,
            issues = issues.len(),
            "Visual density analyzed"
        );

        VisualDensityReport {
            score,
            issues,
            total_visuals,
            total_words,
            visuals_per_1000_words,
            oversized_visuals,
            well_placed_visuals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::document::LayoutSection;
    use crate::types::VisualKind;

    fn visual() -> LayoutBlock {
        LayoutBlock::visual(VisualKind::Table, WidthCategory::Standard)
    }

    fn count(report: &VisualDensityReport, issue_type: LayoutIssueType) -> usize {
        report.issues.iter().filter(|i| i.issue_type == issue_type).count()
    }

    #[test]
    fn test_well_placed_document_scores_high() {
        let doc = LayoutDocument::new(vec![LayoutSection::new("One", 1).with_blocks(vec![
            LayoutBlock::text(200),
            visual(),
            LayoutBlock::text(300),
        ])]);
        let report = VisualDensityAnalyzer::default().analyze(&doc);

        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert_eq!(report.well_placed_visuals, 1);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn test_visual_run_flags_each_visual_without_lead_in() {
        let doc = LayoutDocument::new(vec![LayoutSection::new("One", 1).with_blocks(vec![
            LayoutBlock::text(400),
            visual(),
            visual(),
            visual(),
            LayoutBlock::text(400),
        ])]);
        let report = VisualDensityAnalyzer::default().analyze(&doc);

        assert_eq!(count(&report, LayoutIssueType::ConsecutiveVisuals), 1);
        // The second and third visuals have no text since the previous one.
        assert_eq!(count(&report, LayoutIssueType::InsufficientTextBeforeVisual), 2);
        assert_eq!(report.well_placed_visuals, 1);
        assert!((report.score - (1.0 - 0.15 + 0.1 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_short_lead_in_flagged() {
        let doc = LayoutDocument::new(vec![LayoutSection::new("One", 1).with_blocks(vec![
            LayoutBlock::text(300),
            visual(),
            LayoutBlock::text(10),
            visual(),
            LayoutBlock::text(300),
        ])]);
        let report = VisualDensityAnalyzer::default().analyze(&doc);
        assert_eq!(count(&report, LayoutIssueType::InsufficientTextBeforeVisual), 1);
    }

    #[test]
    fn test_oversized_penalty() {
        let doc = LayoutDocument::new(vec![LayoutSection::new("One", 1).with_blocks(vec![
            LayoutBlock::text(100),
            LayoutBlock::visual(VisualKind::Flowchart, WidthCategory::Oversized),
            LayoutBlock::text(500),
        ])]);
        let report = VisualDensityAnalyzer::default().analyze(&doc);

        assert_eq!(report.oversized_visuals, 1);
        // One issue (−0.05) and full oversized share (−0.2), no well-placed bonus.
        assert!((report.score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_dense_document_penalized() {
        let mut blocks = Vec::new();
        for _ in 0..5 {
            blocks.push(LayoutBlock::text(60));
            blocks.push(visual());
        }
        let doc = LayoutDocument::new(vec![LayoutSection::new("One", 1).with_blocks(blocks)]);
        let report = VisualDensityAnalyzer::default().analyze(&doc);

        assert_eq!(count(&report, LayoutIssueType::VisualDensity), 1);
        assert_eq!(count(&report, LayoutIssueType::TooManyVisualsInSection), 1);
        assert!(report.score < 0.8);
    }

    #[test]
    fn test_text_only_document_is_sparse() {
        let doc = LayoutDocument::new(vec![
            LayoutSection::new("One", 1).with_blocks(vec![LayoutBlock::text(1500)])
        ]);
        let report = VisualDensityAnalyzer::default().analyze(&doc);
        assert_eq!(count(&report, LayoutIssueType::SparseVisuals), 1);
        assert!((report.score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_presets_differ() {
        assert_ne!(VisualDensityConfig::academic(), VisualDensityConfig::executive());
        assert_eq!(
            VisualDensityConfig::for_profile(ReaderProfile::General),
            VisualDensityConfig::default()
        );
    }
}
