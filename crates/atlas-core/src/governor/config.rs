//! Governor configuration: the immutable budget rules for one summary type.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::{ExpansionType, ReplacementStrategy, SectionStrategy, SummaryType};

/// Tolerance used when checking that section percentages sum to 1.0.
const PERCENT_SUM_TOLERANCE: f64 = 0.001;

/// Errors raised by malformed governor configuration.
///
/// These are programmer errors: they are checked once when a governor is
/// registered or loaded, never per request.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read governor file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{field} must be positive")]
    NonPositive { field: &'static str },

    #[error("Section percentages sum to {sum:.3}, expected 1.0")]
    PercentagesDoNotSum { sum: f64 },

    #[error("core_argument must never appear in cut_order")]
    CoreArgumentInCutOrder,

    #[error("cut_order lists {0} more than once")]
    DuplicateCutOrderEntry(ExpansionType),

    #[error("Invalid cut thresholds: trigger {trigger} must be in (0, hard_limit {hard_limit}]")]
    InvalidThresholds { trigger: f64, hard_limit: f64 },

    #[error("Chapter range invalid: min {min} exceeds max {max}")]
    InvalidChapterRange { min: usize, max: usize },

    #[error("Fallback strategy cannot be {0}")]
    InvalidFallback(SectionStrategy),

    #[error("Quality thresholds must satisfy 0 <= minimum {minimum} <= target {target} <= ideal {ideal} <= 1")]
    InvalidQualityThresholds { minimum: f64, target: f64, ideal: f64 },

    #[error("Governor {name}: {source}")]
    Governor {
        name: String,
        #[source]
        source: Box<ConfigError>,
    },
}

/// Fixed split of the total budget between intro, chapters and conclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionBudget {
    pub intro_percent: f64,
    pub chapter_pool_percent: f64,
    pub conclusion_percent: f64,

    /// Smallest useful per-chapter allotment.
    pub min_words_per_chapter: usize,

    /// Largest per-chapter allotment.
    pub max_words_per_chapter: usize,

    /// Applied when the source has too many chapters to budget individually.
    pub fallback_strategy: SectionStrategy,
}

impl SectionBudget {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("section_budget.intro_percent", self.intro_percent),
            ("section_budget.chapter_pool_percent", self.chapter_pool_percent),
            ("section_budget.conclusion_percent", self.conclusion_percent),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field });
            }
        }

        let sum = self.intro_percent + self.chapter_pool_percent + self.conclusion_percent;
        if (sum - 1.0).abs() > PERCENT_SUM_TOLERANCE {
            return Err(ConfigError::PercentagesDoNotSum { sum });
        }

        if self.min_words_per_chapter == 0 {
            return Err(ConfigError::NonPositive {
                field: "section_budget.min_words_per_chapter",
            });
        }
        if self.min_words_per_chapter > self.max_words_per_chapter {
            return Err(ConfigError::InvalidChapterRange {
                min: self.min_words_per_chapter,
                max: self.max_words_per_chapter,
            });
        }

        if self.fallback_strategy == SectionStrategy::InferSections {
            return Err(ConfigError::InvalidFallback(self.fallback_strategy));
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Ordered rules for removing content under budget pressure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPolicy {
    /// Utilization at which the cut policy latches on.
    pub trigger_threshold: f64,

    /// Utilization above which streaming must stop.
    #[serde(default = "default_hard_limit")]
    pub hard_limit_threshold: f64,

    /// Expansion types in the order they are sacrificed.
    pub cut_order: Vec<ExpansionType>,

    pub replacement_strategy: ReplacementStrategy,
}

fn default_hard_limit() -> f64 {
    1.0
}

impl CutPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cut_order.contains(&ExpansionType::CoreArgument) {
            return Err(ConfigError::CoreArgumentInCutOrder);
        }

        let mut seen = std::collections::HashSet::new();
        for expansion in &self.cut_order {
            if !seen.insert(expansion) {
                return Err(ConfigError::DuplicateCutOrderEntry(*expansion));
            }
        }

        if self.trigger_threshold <= 0.0 || self.trigger_threshold > self.hard_limit_threshold {
            return Err(ConfigError::InvalidThresholds {
                trigger: self.trigger_threshold,
                hard_limit: self.hard_limit_threshold,
            });
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Whether a block of this type may be cut.
    ///
    /// `CoreArgument` is refused even if a hand-built policy lists it.
    pub fn can_cut(&self, expansion: ExpansionType) -> bool {
        !expansion.is_protected() && self.cut_order.contains(&expansion)
    }

    /// Words that replace a cut block.
    pub fn replacement_word_count(&self) -> usize {
        match self.replacement_strategy {
            ReplacementStrategy::Synthesize => SYNTHESIS_REPLACEMENT_WORDS,
            ReplacementStrategy::Omit => 0,
        }
    }
}

/// Word count charged for a synthesis paragraph standing in for cut content.
pub const SYNTHESIS_REPLACEMENT_WORDS: usize = 75;

/// Visual allowance and its cost in words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualBudget {
    pub max_visuals: usize,
    pub words_per_visual_equivalent: usize,
}

impl VisualBudget {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.words_per_visual_equivalent == 0 {
            return Err(ConfigError::NonPositive {
                field: "visual_budget.words_per_visual_equivalent",
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Immutable budget configuration for one summary type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTypeGovernor {
    pub summary_type: SummaryType,

    /// Configuration version, bumped on any change to the numbers below.
    pub version: String,

    pub base_word_count: usize,
    pub source_scaling_factor: f64,
    pub min_source_length_for_scaling: usize,
    pub max_scaled_addition: usize,
    pub max_word_ceiling: usize,
    pub max_audio_minutes: f64,
    pub max_synthesis_per_section: usize,
    pub section_budget: SectionBudget,
    pub cut_policy: CutPolicy,
    pub visual_budget: VisualBudget,

    /// Halt on any violation instead of attaching it as metadata.
    #[serde(default)]
    pub strict_enforcement: bool,
}

impl SummaryTypeGovernor {
    /// Parse a single governor from YAML and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let governor: SummaryTypeGovernor = serde_yaml::from_str(yaml)?;
        governor.validate()?;
        Ok(governor)
    }

    /// Parse a single governor from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let governor: SummaryTypeGovernor = serde_json::from_str(json)?;
        governor.validate()?;
        Ok(governor)
    }

    /// Validate every sub-budget and the scalar limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_inner().map_err(|source| ConfigError::Governor {
            name: self.summary_type.to_string(),
            source: Box::new(source),
        })
    }

    fn validate_inner(&self) -> Result<(), ConfigError> {
        if self.base_word_count == 0 {
            return Err(ConfigError::NonPositive { field: "base_word_count" });
        }
        if self.max_word_ceiling == 0 {
            return Err(ConfigError::NonPositive { field: "max_word_ceiling" });
        }
        if self.max_audio_minutes <= 0.0 {
            return Err(ConfigError::NonPositive { field: "max_audio_minutes" });
        }
        if self.source_scaling_factor < 0.0 {
            return Err(ConfigError::NonPositive { field: "source_scaling_factor" });
        }

        self.section_budget.validate()?;
        self.cut_policy.validate()?;
        self.visual_budget.validate()?;
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Load a list of governors from a YAML file, validating each one.
pub fn load_governors_file(path: impl AsRef<Path>) -> Result<Vec<SummaryTypeGovernor>, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let governors: Vec<SummaryTypeGovernor> =
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };

    for governor in &governors {
        governor.validate()?;
    }

    tracing::info!(count = governors.len(), path = %path.display(), "Loaded governor overrides");
    Ok(governors)
}
