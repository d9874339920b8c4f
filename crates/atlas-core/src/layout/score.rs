//! Versioned layout quality scores.
//!
//! A score is only meaningful against the rubric that produced it. Every
//! score carries its rubric version and scores from different versions are
//! never compared: [`LayoutScore::comparable_with`] rejects the pair.
//!
//! Scores arriving as JSON are checked against
//! `schema/layout_score.schema.json` before they are decoded.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Current rubric version. Bump it whenever weights, thresholds or the issue
/// taxonomy change.
pub const RUBRIC_VERSION: &str = "1.0.0";

const LAYOUT_SCORE_SCHEMA_JSON: &str = include_str!("../../schema/layout_score.schema.json");

static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Layout score has no rubric version")]
    MissingRubricVersion,

    #[error("Cannot compare scores from rubric {left} and rubric {right}")]
    RubricMismatch { left: String, right: String },

    #[error("Failed to load layout score schema: {0}")]
    SchemaLoad(String),

    #[error("Layout score failed schema validation: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Failed to decode layout score: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which rendered format a policy reads its score from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFormat {
    #[default]
    Overall,
    Pdf,
    Docx,
    Html,
}

impl fmt::Display for ScoreFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScoreFormat::Overall => "overall",
            ScoreFormat::Pdf => "pdf",
            ScoreFormat::Docx => "docx",
            ScoreFormat::Html => "html",
        };
        f.write_str(s)
    }
}

impl FromStr for ScoreFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overall" => Ok(ScoreFormat::Overall),
            "pdf" => Ok(ScoreFormat::Pdf),
            "docx" => Ok(ScoreFormat::Docx),
            "html" => Ok(ScoreFormat::Html),
            other => Err(format!("unknown score format: {}", other)),
        }
    }
}

/// Closed taxonomy of layout problems.
///
/// Issue types written by a newer analyzer decode as `Unrecognized` and map
/// to no regeneration constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutIssueType {
    VisualDensity,
    SparseVisuals,
    ConsecutiveVisuals,
    InsufficientTextBeforeVisual,
    TooManyVisualsInSection,
    OversizedVisual,
    LongParagraph,
    SectionTooDeep,
    UnclosedBlock,
    StrayClosingTag,
    MissingRequiredBlock,
    EmptySection,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutIssue {
    #[serde(rename = "type")]
    pub issue_type: LayoutIssueType,

    /// Section index, when the issue is local to one section.
    #[serde(default)]
    pub section: Option<usize>,

    pub severity: IssueSeverity,

    #[serde(default)]
    pub suggestion: String,
}

impl LayoutIssue {
    pub fn new(
        issue_type: LayoutIssueType,
        section: Option<usize>,
        severity: IssueSeverity,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            issue_type,
            section,
            severity,
            suggestion: suggestion.into(),
        }
    }
}

/// Structural quality of one rendered guide. Scores are in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutScore {
    pub rubric_version: String,
    pub overall: f64,
    pub pdf: f64,
    pub docx: f64,
    pub html: f64,
    #[serde(default)]
    pub issues: Vec<LayoutIssue>,
}

impl LayoutScore {
    /// A score stamped with the current rubric version.
    pub fn new(overall: f64, pdf: f64, docx: f64, html: f64, issues: Vec<LayoutIssue>) -> Self {
        Self {
            rubric_version: RUBRIC_VERSION.to_string(),
            overall: overall.clamp(0.0, 1.0),
            pdf: pdf.clamp(0.0, 1.0),
            docx: docx.clamp(0.0, 1.0),
            html: html.clamp(0.0, 1.0),
            issues,
        }
    }

    /// Same score in every format.
    pub fn uniform(score: f64, issues: Vec<LayoutIssue>) -> Self {
        Self::new(score, score, score, score, issues)
    }

    /// Decode and schema-check a score from JSON.
    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        let value: serde_json::Value = serde_json::from_str(json)?;

        let has_version = value
            .get("rubric_version")
            .is_some_and(|v| !v.is_null());
        if !has_version {
            tracing::warn!("Rejected layout score without rubric version");
            return Err(ScoreError::MissingRubricVersion);
        }

        validate_score_schema(&value).map_err(ScoreError::SchemaViolation)?;

        let score: LayoutScore = serde_json::from_value(value)?;
        if !score.is_current_rubric() {
            tracing::warn!(
                rubric = %score.rubric_version,
                current = RUBRIC_VERSION,
                "Decoded layout score from a different rubric"
            );
        }
        Ok(score)
    }

    pub fn to_json(&self) -> Result<String, ScoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_current_rubric(&self) -> bool {
        self.rubric_version == RUBRIC_VERSION
    }

    pub fn score_for(&self, format: ScoreFormat) -> f64 {
        match format {
            ScoreFormat::Overall => self.overall,
            ScoreFormat::Pdf => self.pdf,
            ScoreFormat::Docx => self.docx,
            ScoreFormat::Html => self.html,
        }
    }

    /// Ok only when both scores come from the same rubric.
    pub fn comparable_with(&self, other: &LayoutScore) -> Result<(), ScoreError> {
        if self.rubric_version == other.rubric_version {
            return Ok(());
        }
        tracing::warn!(
            left = %self.rubric_version,
            right = %other.rubric_version,
            "Cross-rubric score comparison rejected"
        );
        Err(ScoreError::RubricMismatch {
            left: self.rubric_version.clone(),
            right: other.rubric_version.clone(),
        })
    }

    /// Order two scores in one format.
    pub fn compare(&self, other: &LayoutScore, format: ScoreFormat) -> Result<Ordering, ScoreError> {
        self.comparable_with(other)?;
        Ok(self
            .score_for(format)
            .partial_cmp(&other.score_for(format))
            .unwrap_or(Ordering::Equal))
    }

    pub fn issues_of(&self, issue_type: LayoutIssueType) -> impl Iterator<Item = &LayoutIssue> {
        self.issues.iter().filter(move |i| i.issue_type == issue_type)
    }
}

fn get_validator() -> Result<&'static jsonschema::Validator, ScoreError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(LAYOUT_SCORE_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(ScoreError::SchemaLoad(e.clone())),
    }
}

/// Validate a layout score JSON value against the embedded schema.
pub fn validate_score_schema(value: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
