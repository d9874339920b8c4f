//! Shipped governor presets.
//!
//! The registry is built once and never mutated. Lookups are pure
//! functions of the `SummaryType` key.

use lazy_static::lazy_static;
use std::collections::BTreeMap;

use crate::types::{ExpansionType, ReplacementStrategy, SectionStrategy, SummaryType};

use super::config::{ConfigError, CutPolicy, SectionBudget, SummaryTypeGovernor, VisualBudget};

/// Version stamped on every shipped preset.
pub const PRESET_VERSION: &str = "1.0";

/// Full cut order, most expendable first.
const STANDARD_CUT_ORDER: [ExpansionType; 5] = [
    ExpansionType::Exercise,
    ExpansionType::AdjacentDomainComparison,
    ExpansionType::ExtendedCommentary,
    ExpansionType::SecondaryExample,
    ExpansionType::StylisticElaboration,
];

lazy_static! {
    static ref REGISTRY: BTreeMap<SummaryType, SummaryTypeGovernor> = {
        let mut registry = BTreeMap::new();
        for governor in [quick_reference(), professional(), accessible(), deep_research()] {
            registry.insert(governor.summary_type, governor);
        }
        registry
    };
}

/// Look up the preset for a summary type.
pub fn governor(summary_type: SummaryType) -> &'static SummaryTypeGovernor {
    // Every SummaryType variant is inserted above.
    &REGISTRY[&summary_type]
}

/// All presets in summary-type order.
pub fn all() -> impl Iterator<Item = &'static SummaryTypeGovernor> {
    REGISTRY.values()
}

/// Validate every shipped preset. Call once at startup.
pub fn validate_all() -> Result<(), ConfigError> {
    for governor in all() {
        governor.validate()?;
    }
    Ok(())
}

fn quick_reference() -> SummaryTypeGovernor {
    SummaryTypeGovernor {
        summary_type: SummaryType::QuickReference,
        version: PRESET_VERSION.to_string(),
        base_word_count: 900,
        source_scaling_factor: 0.01,
        min_source_length_for_scaling: 20_000,
        max_scaled_addition: 600,
        max_word_ceiling: 1_800,
        max_audio_minutes: 8.0,
        max_synthesis_per_section: 1,
        section_budget: SectionBudget {
            intro_percent: 0.10,
            chapter_pool_percent: 0.80,
            conclusion_percent: 0.10,
            min_words_per_chapter: 60,
            max_words_per_chapter: 250,
            fallback_strategy: SectionStrategy::TreatAsMonolith,
        },
        cut_policy: CutPolicy {
            trigger_threshold: 0.80,
            hard_limit_threshold: 1.0,
            cut_order: STANDARD_CUT_ORDER.to_vec(),
            replacement_strategy: ReplacementStrategy::Omit,
        },
        visual_budget: VisualBudget {
            max_visuals: 2,
            words_per_visual_equivalent: 50,
        },
        strict_enforcement: true,
    }
}

fn professional() -> SummaryTypeGovernor {
    SummaryTypeGovernor {
        summary_type: SummaryType::Professional,
        version: PRESET_VERSION.to_string(),
        base_word_count: 3_000,
        source_scaling_factor: 0.02,
        min_source_length_for_scaling: 20_000,
        max_scaled_addition: 1_500,
        max_word_ceiling: 6_000,
        max_audio_minutes: 30.0,
        max_synthesis_per_section: 2,
        section_budget: SectionBudget {
            intro_percent: 0.10,
            chapter_pool_percent: 0.80,
            conclusion_percent: 0.10,
            min_words_per_chapter: 200,
            max_words_per_chapter: 800,
            fallback_strategy: SectionStrategy::MergeAdjacent,
        },
        cut_policy: CutPolicy {
            trigger_threshold: 0.85,
            hard_limit_threshold: 1.0,
            cut_order: STANDARD_CUT_ORDER.to_vec(),
            replacement_strategy: ReplacementStrategy::Synthesize,
        },
        visual_budget: VisualBudget {
            max_visuals: 8,
            words_per_visual_equivalent: 75,
        },
        strict_enforcement: true,
    }
}

fn accessible() -> SummaryTypeGovernor {
    SummaryTypeGovernor {
        summary_type: SummaryType::Accessible,
        version: PRESET_VERSION.to_string(),
        base_word_count: 2_000,
        source_scaling_factor: 0.015,
        min_source_length_for_scaling: 20_000,
        max_scaled_addition: 1_000,
        max_word_ceiling: 4_000,
        max_audio_minutes: 20.0,
        max_synthesis_per_section: 2,
        section_budget: SectionBudget {
            intro_percent: 0.12,
            chapter_pool_percent: 0.76,
            conclusion_percent: 0.12,
            min_words_per_chapter: 150,
            max_words_per_chapter: 500,
            fallback_strategy: SectionStrategy::MergeAdjacent,
        },
        cut_policy: CutPolicy {
            trigger_threshold: 0.80,
            hard_limit_threshold: 1.0,
            // Exercises go last for this audience.
            cut_order: vec![
                ExpansionType::AdjacentDomainComparison,
                ExpansionType::ExtendedCommentary,
                ExpansionType::StylisticElaboration,
                ExpansionType::SecondaryExample,
                ExpansionType::Exercise,
            ],
            replacement_strategy: ReplacementStrategy::Synthesize,
        },
        visual_budget: VisualBudget {
            max_visuals: 6,
            words_per_visual_equivalent: 60,
        },
        strict_enforcement: false,
    }
}

fn deep_research() -> SummaryTypeGovernor {
    SummaryTypeGovernor {
        summary_type: SummaryType::DeepResearch,
        version: PRESET_VERSION.to_string(),
        base_word_count: 6_000,
        source_scaling_factor: 0.04,
        min_source_length_for_scaling: 20_000,
        max_scaled_addition: 4_000,
        max_word_ceiling: 12_000,
        max_audio_minutes: 75.0,
        max_synthesis_per_section: 3,
        section_budget: SectionBudget {
            intro_percent: 0.08,
            chapter_pool_percent: 0.84,
            conclusion_percent: 0.08,
            min_words_per_chapter: 400,
            max_words_per_chapter: 1_500,
            fallback_strategy: SectionStrategy::MergeAdjacent,
        },
        cut_policy: CutPolicy {
            trigger_threshold: 0.90,
            hard_limit_threshold: 1.0,
            cut_order: vec![
                ExpansionType::StylisticElaboration,
                ExpansionType::Exercise,
                ExpansionType::SecondaryExample,
            ],
            replacement_strategy: ReplacementStrategy::Synthesize,
        },
        visual_budget: VisualBudget {
            max_visuals: 15,
            words_per_visual_equivalent: 100,
        },
        strict_enforcement: false,
    }
}
