//! Source and content detection.
//!
//! Source-level detectors (source type, chapters) run once per source and
//! their results are treated as immutable for the session. The expansion type
//! detector runs per content block.

mod ambiguity;
mod chapter;
mod expansion_type;
mod patterns;
mod source_type;

use serde::{Deserialize, Serialize};

use crate::types::{word_count, SectionStrategy};

pub use ambiguity::AmbiguityNote;
pub use chapter::{
    Chapter, ChapterDetectionResult, ChapterDetector, SectionDetectionEvent,
    MAX_CHAPTERS_BEFORE_MERGE,
};
pub use expansion_type::{ExpansionClassification, ExpansionTypeDetector};
pub use source_type::{
    SourceTypeDetectionResult, SourceTypeDetector, SourceTypeScores, DETECTION_THRESHOLD,
};

/// Everything detected about a source, computed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAnalysis {
    pub source_word_count: usize,
    pub source_type: SourceTypeDetectionResult,
    pub chapters: ChapterDetectionResult,
}

impl SourceAnalysis {
    /// Ambiguity notes raised by either detector.
    pub fn ambiguities(&self) -> Vec<AmbiguityNote> {
        self.source_type
            .ambiguity
            .iter()
            .cloned()
            .chain(self.chapters.ambiguity())
            .collect()
    }
}

/// Run source type and chapter detection over a source document.
///
/// `fallback` is the governor's section fallback strategy, applied when the
/// source has too many chapter headings.
pub fn analyze_source(text: &str, fallback: SectionStrategy) -> SourceAnalysis {
    SourceAnalysis {
        source_word_count: word_count(text),
        source_type: SourceTypeDetector::new().detect(text),
        chapters: ChapterDetector::new().detect(text, fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceType;

    #[test]
    fn test_analyze_source_bundles_detections() {
        let text = "Chapter 1\nThe author argues that habits compound.\nChapter 2\nMore text here.";
        let analysis = analyze_source(text, SectionStrategy::MergeAdjacent);

        assert_eq!(analysis.source_word_count, 13);
        assert_eq!(analysis.chapters.chapters.len(), 2);
        assert_eq!(analysis.source_type.detected_type, SourceType::Argumentative);
        // Argumentative only scores 2 here, so the default is noted.
        assert_eq!(analysis.ambiguities().len(), 1);
    }
}
