//! Layout analyzer trait and the built-in markup analyzer.

use async_trait::async_trait;
use thiserror::Error;

use atlas_core::{
    audit_structure, parse_guide, GenerationConstraints, GuideParseError, LayoutScore,
    ReaderProfile, ScoreError, VisualDensityAnalyzer,
};

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Worth retrying: the renderer or scoring service was briefly unavailable.
    #[error("Analyzer temporarily unavailable: {0}")]
    Transient(String),

    #[error("Analyzer rejected the guide: {0}")]
    Rejected(String),

    #[error("Guide markup could not be parsed: {0}")]
    Guide(#[from] GuideParseError),

    #[error(transparent)]
    Score(#[from] ScoreError),
}

impl AnalyzerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AnalyzerError::Transient(_))
    }
}

/// Scores a finished guide.
#[async_trait]
pub trait LayoutAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(
        &self,
        guide: &str,
        constraints: &GenerationConstraints,
    ) -> Result<LayoutScore, AnalyzerError>;
}

/// Scores guide markup without rendering it.
///
/// The density score is scaled by the structure audit pass rate and every
/// format gets the same value. Issues from both passes are reported.
#[derive(Debug, Clone, Default)]
pub struct MarkupLayoutAnalyzer {
    density: VisualDensityAnalyzer,
}

impl MarkupLayoutAnalyzer {
    pub fn new(density: VisualDensityAnalyzer) -> Self {
        Self { density }
    }

    pub fn for_profile(profile: ReaderProfile) -> Self {
        Self::new(VisualDensityAnalyzer::for_profile(profile))
    }

    pub fn score(
        &self,
        guide: &str,
        constraints: &GenerationConstraints,
    ) -> Result<LayoutScore, AnalyzerError> {
        let parsed = parse_guide(guide)?;
        let audit = audit_structure(&parsed, constraints);
        let report = self.density.analyze(&parsed.document);

        let value = report.score * audit.pass_rate;
        let mut issues = report.issues;
        issues.extend(audit.issues);

        tracing::debug!(
            density = report.score,
            pass_rate = audit.pass_rate,
            issues = issues.len(),
            "Guide markup scored"
        );
        Ok(LayoutScore::uniform(value, issues))
    }
}

#[async_trait]
impl LayoutAnalyzer for MarkupLayoutAnalyzer {
    fn name(&self) -> &str {
        "markup"
    }

    async fn analyze(
        &self,
        guide: &str,
        constraints: &GenerationConstraints,
    ) -> Result<LayoutScore, AnalyzerError> {
        self.score(guide, constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{reader_presets, LayoutIssueType};

    const GUIDE: &str = "\
[QUICK_GLANCE]
Habits compound.
[/QUICK_GLANCE]

## Systems

Goals set direction but systems make progress every single day of the year.

[TAKEAWAYS]
Build systems.
[/TAKEAWAYS]
";

    fn constraints() -> GenerationConstraints {
        reader_presets::preset(ReaderProfile::General).constraints()
    }

    #[tokio::test]
    async fn test_clean_guide_scores_uniformly() {
        let analyzer = MarkupLayoutAnalyzer::for_profile(ReaderProfile::General);
        let score = analyzer.analyze(GUIDE, &constraints()).await.unwrap();

        assert_eq!(score.pdf, score.overall);
        assert!(score.is_current_rubric());
        // Text-only guides are flagged as sparse but nothing else.
        assert!(score
            .issues
            .iter()
            .all(|i| i.issue_type == LayoutIssueType::SparseVisuals));
    }

    #[tokio::test]
    async fn test_missing_blocks_lower_score() {
        let analyzer = MarkupLayoutAnalyzer::default();
        let full = analyzer.analyze(GUIDE, &constraints()).await.unwrap();
        let bare = analyzer
            .analyze("## Systems\nJust some text here.", &constraints())
            .await
            .unwrap();

        assert!(bare.overall < full.overall);
        assert_eq!(bare.issues_of(LayoutIssueType::MissingRequiredBlock).count(), 2);
    }

    #[tokio::test]
    async fn test_empty_guide_is_an_error() {
        let analyzer = MarkupLayoutAnalyzer::default();
        assert!(matches!(
            analyzer.analyze("  ", &constraints()).await,
            Err(AnalyzerError::Guide(GuideParseError::Empty))
        ));
    }
}
