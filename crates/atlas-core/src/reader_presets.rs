//! Reader layout presets and the generation constraints derived from them.
//!
//! Constraints are advisory input to the generation backend. Nothing here
//! enforces them structurally; the layout score after rendering does.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::governor::ConfigError;
use crate::layout::{LayoutRegenerationPolicy, RegenerationConstraint, ScoreFormat, VisualDensityConfig};
use crate::types::{ReaderProfile, VisualKind, WidthCategory};

const MAX_VISUALS_PER_SECTION_CEILING: usize = 6;
const TEXT_BETWEEN_VISUALS_GROWTH: f64 = 1.5;
const PARAGRAPH_SHRINK: f64 = 0.8;
const THIN_SECTION_STEP: usize = 50;

/// Score bands and attempt budget handed to the regeneration policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    pub ideal_score: f64,
    pub target_score: f64,
    pub minimum_acceptable_score: f64,
    pub max_regeneration_attempts: u32,
}

impl QualityThresholds {
    pub fn policy(&self, format: ScoreFormat) -> LayoutRegenerationPolicy {
        LayoutRegenerationPolicy {
            format,
            ideal_score: self.ideal_score,
            target_score: self.target_score,
            minimum_acceptable_score: self.minimum_acceptable_score,
            max_regeneration_attempts: self.max_regeneration_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderLayoutPreset {
    pub profile: ReaderProfile,
    pub paragraph_min_words: usize,
    pub paragraph_max_words: usize,
    pub max_visuals_per_section: usize,
    pub min_text_between_visuals: usize,
    pub preferred_visual_types: Vec<VisualKind>,
    pub max_section_depth: u8,
    pub min_words_per_section: usize,
    pub target_min_words: usize,
    pub target_max_words: usize,
    pub include_executive_summary: bool,
    pub include_appendices: bool,
    pub quality_thresholds: QualityThresholds,
}

impl ReaderLayoutPreset {
    pub fn constraints(&self) -> GenerationConstraints {
        GenerationConstraints {
            paragraph_min_words: self.paragraph_min_words,
            paragraph_max_words: self.paragraph_max_words,
            max_visuals_per_section: self.max_visuals_per_section,
            min_text_between_visuals: self.min_text_between_visuals,
            preferred_visual_types: self.preferred_visual_types.clone(),
            max_section_depth: self.max_section_depth,
            min_words_per_section: self.min_words_per_section,
            target_min_words: self.target_min_words,
            target_max_words: self.target_max_words,
            include_executive_summary: self.include_executive_summary,
            include_appendices: self.include_appendices,
            max_visual_width: WidthCategory::Wide,
            strict_markup: false,
            quality_thresholds: self.quality_thresholds.clone(),
        }
    }

    pub fn visual_density(&self) -> VisualDensityConfig {
        VisualDensityConfig::for_profile(self.profile)
    }

    pub fn regeneration_policy(&self, format: ScoreFormat) -> LayoutRegenerationPolicy {
        self.quality_thresholds.policy(format)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paragraph_min_words == 0 || self.paragraph_min_words > self.paragraph_max_words {
            return Err(ConfigError::NonPositive {
                field: "paragraph_min_words",
            });
        }
        if self.max_visuals_per_section == 0 {
            return Err(ConfigError::NonPositive {
                field: "max_visuals_per_section",
            });
        }
        if self.max_section_depth == 0 {
            return Err(ConfigError::NonPositive {
                field: "max_section_depth",
            });
        }
        self.regeneration_policy(ScoreFormat::Overall).validate()
    }
}

/// What the generation backend is asked to respect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConstraints {
    pub paragraph_min_words: usize,
    pub paragraph_max_words: usize,
    pub max_visuals_per_section: usize,
    pub min_text_between_visuals: usize,
    pub preferred_visual_types: Vec<VisualKind>,
    pub max_section_depth: u8,
    pub min_words_per_section: usize,
    pub target_min_words: usize,
    pub target_max_words: usize,
    pub include_executive_summary: bool,
    pub include_appendices: bool,
    pub max_visual_width: WidthCategory,

    /// Ask the generator to close every block tag it opens.
    pub strict_markup: bool,

    pub quality_thresholds: QualityThresholds,
}

impl GenerationConstraints {
    /// Cap the target range at a governor's total word budget.
    pub fn with_word_budget(mut self, total_budget: usize) -> Self {
        self.target_max_words = self.target_max_words.min(total_budget);
        self.target_min_words = self.target_min_words.min(self.target_max_words);
        self
    }

    /// A copy with one adjustment per constraint.
    pub fn tightened(&self, constraints: &BTreeSet<RegenerationConstraint>) -> Self {
        let mut next = self.clone();

        for constraint in constraints {
            match constraint {
                RegenerationConstraint::ReduceVisualDensity
                | RegenerationConstraint::LimitVisualsPerSection => {
                    next.max_visuals_per_section = next.max_visuals_per_section.saturating_sub(1).max(1);
                }
                RegenerationConstraint::AddVisualSupport => {
                    next.max_visuals_per_section =
                        (next.max_visuals_per_section + 1).min(MAX_VISUALS_PER_SECTION_CEILING);
                }
                RegenerationConstraint::AddTextBetweenVisuals => {
                    next.min_text_between_visuals =
                        (next.min_text_between_visuals as f64 * TEXT_BETWEEN_VISUALS_GROWTH).ceil() as usize;
                }
                RegenerationConstraint::ReduceVisualWidth => {
                    next.max_visual_width = next.max_visual_width.narrower();
                }
                RegenerationConstraint::ShortenParagraphs => {
                    next.paragraph_max_words = ((next.paragraph_max_words as f64 * PARAGRAPH_SHRINK) as usize)
                        .max(next.paragraph_min_words);
                }
                RegenerationConstraint::FlattenHierarchy => {
                    next.max_section_depth = next.max_section_depth.saturating_sub(1).max(1);
                }
                RegenerationConstraint::RepairBlockMarkup => {
                    next.strict_markup = true;
                }
                RegenerationConstraint::ExpandThinSections => {
                    next.min_words_per_section += THIN_SECTION_STEP;
                }
            }
        }

        next
    }
}

lazy_static! {
    static ref REGISTRY: BTreeMap<ReaderProfile, ReaderLayoutPreset> = ReaderProfile::ALL
        .into_iter()
        .map(|profile| (profile, build(profile)))
        .collect();
}

/// The shipped preset for a reader profile.
pub fn preset(profile: ReaderProfile) -> &'static ReaderLayoutPreset {
    &REGISTRY[&profile]
}

pub fn all() -> impl Iterator<Item = &'static ReaderLayoutPreset> {
    REGISTRY.values()
}

pub fn validate_all() -> Result<(), ConfigError> {
    for preset in REGISTRY.values() {
        preset.validate()?;
    }
    Ok(())
}

fn build(profile: ReaderProfile) -> ReaderLayoutPreset {
    match profile {
        ReaderProfile::General => ReaderLayoutPreset {
            profile,
            paragraph_min_words: 40,
            paragraph_max_words: 120,
            max_visuals_per_section: 3,
            min_text_between_visuals: 50,
            preferred_visual_types: vec![VisualKind::Flowchart, VisualKind::Table, VisualKind::StructureMap],
            max_section_depth: 3,
            min_words_per_section: 80,
            target_min_words: 2_000,
            target_max_words: 6_000,
            include_executive_summary: false,
            include_appendices: false,
            quality_thresholds: QualityThresholds {
                ideal_score: 0.90,
                target_score: 0.80,
                minimum_acceptable_score: 0.70,
                max_regeneration_attempts: 3,
            },
        },
        ReaderProfile::Executive => ReaderLayoutPreset {
            profile,
            paragraph_min_words: 30,
            paragraph_max_words: 80,
            max_visuals_per_section: 4,
            min_text_between_visuals: 30,
            preferred_visual_types: vec![VisualKind::Table, VisualKind::Chart, VisualKind::Flowchart],
            max_section_depth: 2,
            min_words_per_section: 50,
            target_min_words: 900,
            target_max_words: 3_000,
            include_executive_summary: true,
            include_appendices: false,
            quality_thresholds: QualityThresholds {
                ideal_score: 0.92,
                target_score: 0.85,
                minimum_acceptable_score: 0.75,
                max_regeneration_attempts: 3,
            },
        },
        ReaderProfile::Academic => ReaderLayoutPreset {
            profile,
            paragraph_min_words: 60,
            paragraph_max_words: 180,
            max_visuals_per_section: 2,
            min_text_between_visuals: 80,
            preferred_visual_types: vec![VisualKind::StructureMap, VisualKind::Table, VisualKind::Diagram],
            max_section_depth: 4,
            min_words_per_section: 150,
            target_min_words: 4_000,
            target_max_words: 12_000,
            include_executive_summary: false,
            include_appendices: true,
            quality_thresholds: QualityThresholds {
                ideal_score: 0.90,
                target_score: 0.82,
                minimum_acceptable_score: 0.72,
                max_regeneration_attempts: 4,
            },
        },
        ReaderProfile::Practitioner => ReaderLayoutPreset {
            profile,
            paragraph_min_words: 40,
            paragraph_max_words: 100,
            max_visuals_per_section: 4,
            min_text_between_visuals: 40,
            preferred_visual_types: vec![VisualKind::Flowchart, VisualKind::Table, VisualKind::Timeline],
            max_section_depth: 3,
            min_words_per_section: 80,
            target_min_words: 2_000,
            target_max_words: 6_000,
            include_executive_summary: true,
            include_appendices: false,
            quality_thresholds: QualityThresholds {
                ideal_score: 0.88,
                target_score: 0.78,
                minimum_acceptable_score: 0.68,
                max_regeneration_attempts: 3,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_valid() {
        assert!(validate_all().is_ok());
        assert_eq!(all().count(), 4);
    }

    #[test]
    fn test_lookup_by_profile() {
        assert!(preset(ReaderProfile::Executive).include_executive_summary);
        assert!(preset(ReaderProfile::Academic).include_appendices);
    }

    #[test]
    fn test_preset_spacing_matches_density_thresholds() {
        for preset in all() {
            assert_eq!(
                preset.min_text_between_visuals,
                preset.visual_density().min_text_before_visual
            );
        }
    }

    #[test]
    fn test_word_budget_caps_target() {
        let constraints = preset(ReaderProfile::General).constraints().with_word_budget(900);
        assert_eq!(constraints.target_max_words, 900);
        assert_eq!(constraints.target_min_words, 900);
    }

    #[test]
    fn test_tightened_applies_each_constraint() {
        let base = preset(ReaderProfile::General).constraints();
        let set: BTreeSet<_> = [
            RegenerationConstraint::AddTextBetweenVisuals,
            RegenerationConstraint::ReduceVisualWidth,
            RegenerationConstraint::FlattenHierarchy,
            RegenerationConstraint::ShortenParagraphs,
            RegenerationConstraint::RepairBlockMarkup,
        ]
        .into_iter()
        .collect();

        let tightened = base.tightened(&set);
        assert_eq!(tightened.min_text_between_visuals, 75);
        assert_eq!(tightened.max_visual_width, WidthCategory::Standard);
        assert_eq!(tightened.max_section_depth, 2);
        assert_eq!(tightened.paragraph_max_words, 96);
        assert!(tightened.strict_markup);
        assert_eq!(tightened.max_visuals_per_section, base.max_visuals_per_section);
    }

    #[test]
    fn test_tightening_never_drops_below_one_visual() {
        let mut constraints = preset(ReaderProfile::Academic).constraints();
        let set: BTreeSet<_> = [RegenerationConstraint::ReduceVisualDensity].into_iter().collect();
        for _ in 0..5 {
            constraints = constraints.tightened(&set);
        }
        assert_eq!(constraints.max_visuals_per_section, 1);
    }

    #[test]
    fn test_empty_set_is_identity() {
        let base = preset(ReaderProfile::Practitioner).constraints();
        assert_eq!(base.tightened(&BTreeSet::new()), base);
    }
}
