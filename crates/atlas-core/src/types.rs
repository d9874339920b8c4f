//! Shared vocabulary types used across governors, detectors and scorers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four shipped summary types, each backed by one governor preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryType {
    QuickReference,
    Professional,
    Accessible,
    DeepResearch,
}

impl SummaryType {
    pub const ALL: [SummaryType; 4] = [
        SummaryType::QuickReference,
        SummaryType::Professional,
        SummaryType::Accessible,
        SummaryType::DeepResearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryType::QuickReference => "quick_reference",
            SummaryType::Professional => "professional",
            SummaryType::Accessible => "accessible",
            SummaryType::DeepResearch => "deep_research",
        }
    }
}

impl fmt::Display for SummaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "quick_reference" | "quickreference" => Ok(SummaryType::QuickReference),
            "professional" => Ok(SummaryType::Professional),
            "accessible" => Ok(SummaryType::Accessible),
            "deep_research" | "deepresearch" => Ok(SummaryType::DeepResearch),
            other => Err(format!("unknown summary type: {}", other)),
        }
    }
}

/// Discourse mode of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Argumentative,
    Narrative,
    Technical,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceType::Argumentative => "argumentative",
            SourceType::Narrative => "narrative",
            SourceType::Technical => "technical",
        };
        f.write_str(s)
    }
}

/// Editorial function of a generated content block.
///
/// `CoreArgument` is the protected fallback: it is never cut, whatever a
/// cut order says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionType {
    Exercise,
    AdjacentDomainComparison,
    ExtendedCommentary,
    SecondaryExample,
    StylisticElaboration,
    CoreArgument,
}

impl ExpansionType {
    /// Whether the cut policy may ever remove this type.
    pub fn is_protected(&self) -> bool {
        matches!(self, ExpansionType::CoreArgument)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpansionType::Exercise => "exercise",
            ExpansionType::AdjacentDomainComparison => "adjacent-domain comparison",
            ExpansionType::ExtendedCommentary => "extended commentary",
            ExpansionType::SecondaryExample => "secondary example",
            ExpansionType::StylisticElaboration => "stylistic elaboration",
            ExpansionType::CoreArgument => "core argument",
        }
    }
}

impl fmt::Display for ExpansionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How sections are derived from a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStrategy {
    /// Use the detected chapter boundaries as-is.
    InferSections,
    /// Treat the whole source as a single body.
    TreatAsMonolith,
    /// Merge small adjacent chapters until the count is manageable.
    MergeAdjacent,
}

impl fmt::Display for SectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SectionStrategy::InferSections => "infer_sections",
            SectionStrategy::TreatAsMonolith => "treat_as_monolith",
            SectionStrategy::MergeAdjacent => "merge_adjacent",
        };
        f.write_str(s)
    }
}

/// What replaces content removed by the cut policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementStrategy {
    Synthesize,
    Omit,
}

/// Reader profile a layout preset is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderProfile {
    General,
    Executive,
    Academic,
    Practitioner,
}

impl ReaderProfile {
    pub const ALL: [ReaderProfile; 4] = [
        ReaderProfile::General,
        ReaderProfile::Executive,
        ReaderProfile::Academic,
        ReaderProfile::Practitioner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderProfile::General => "general",
            ReaderProfile::Executive => "executive",
            ReaderProfile::Academic => "academic",
            ReaderProfile::Practitioner => "practitioner",
        }
    }
}

impl fmt::Display for ReaderProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReaderProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" | "default" => Ok(ReaderProfile::General),
            "executive" => Ok(ReaderProfile::Executive),
            "academic" => Ok(ReaderProfile::Academic),
            "practitioner" => Ok(ReaderProfile::Practitioner),
            other => Err(format!("unknown reader profile: {}", other)),
        }
    }
}

/// Kind of visual block in a rendered guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    Flowchart,
    Table,
    StructureMap,
    Diagram,
    Timeline,
    Chart,
}

impl VisualKind {
    /// Map a guide markup tag suffix (`VISUAL_<SUFFIX>`) to a kind.
    pub fn from_tag(suffix: &str) -> Self {
        match suffix.to_uppercase().as_str() {
            "FLOWCHART" => VisualKind::Flowchart,
            "TABLE" => VisualKind::Table,
            "STRUCTURE_MAP" => VisualKind::StructureMap,
            "TIMELINE" => VisualKind::Timeline,
            "CHART" | "BAR_CHART" | "PIE_CHART" => VisualKind::Chart,
            _ => VisualKind::Diagram,
        }
    }
}

/// Rendered width class of a visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthCategory {
    Narrow,
    #[default]
    Standard,
    Wide,
    Oversized,
}

impl WidthCategory {
    /// One step narrower, stopping at `Narrow`.
    pub fn narrower(&self) -> Self {
        match self {
            WidthCategory::Oversized => WidthCategory::Wide,
            WidthCategory::Wide => WidthCategory::Standard,
            WidthCategory::Standard | WidthCategory::Narrow => WidthCategory::Narrow,
        }
    }
}

impl FromStr for WidthCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "narrow" => Ok(WidthCategory::Narrow),
            "standard" => Ok(WidthCategory::Standard),
            "wide" => Ok(WidthCategory::Wide),
            "oversized" => Ok(WidthCategory::Oversized),
            other => Err(format!("unknown width category: {}", other)),
        }
    }
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
