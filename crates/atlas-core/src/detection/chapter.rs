//! Chapter and section boundary detection.
//!
//! Emits exactly one [`SectionDetectionEvent`] per source:
//!
//! | Boundaries found | Strategy | Fallback |
//! |------------------|----------|----------|
//! | 0 | treat as monolith | yes |
//! | 1..50 | infer sections | no |
//! | ≥ 50 | governor fallback (merge adjacent, or monolith) | yes |

use serde::{Deserialize, Serialize};

use crate::types::SectionStrategy;

use super::ambiguity::AmbiguityNote;
use super::patterns::{CHAPTER_HEADING_PATTERN, NUMBERED_HEADING_PATTERN};

/// Chapter count at which merging kicks in.
pub const MAX_CHAPTERS_BEFORE_MERGE: usize = 50;

/// Headings longer than this are treated as prose.
const MAX_HEADING_CHARS: usize = 100;

/// One detected chapter. Offsets and lengths are in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub line_index: usize,
    pub char_offset: usize,

    /// Characters from this heading to the next one (or end of text).
    pub length: usize,

    /// Number of detected chapters folded into this one.
    pub merged_count: usize,
}

impl Chapter {
    fn absorb(&mut self, next: Chapter) {
        self.length += next.length;
        self.merged_count += next.merged_count;
    }
}

/// The single detection record for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDetectionEvent {
    pub strategy: SectionStrategy,
    pub fallback_triggered: bool,
    pub detected_count: usize,
    pub final_count: usize,
    pub reason: String,
}

/// Chapters in document order plus the detection event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDetectionResult {
    pub chapters: Vec<Chapter>,
    pub event: SectionDetectionEvent,
}

impl ChapterDetectionResult {
    /// Whether the source is handled as one undivided body.
    pub fn is_monolith(&self) -> bool {
        self.chapters.is_empty()
    }

    /// A monolith result with the given reason.
    pub fn monolith(reason: impl Into<String>) -> Self {
        Self {
            chapters: Vec::new(),
            event: SectionDetectionEvent {
                strategy: SectionStrategy::TreatAsMonolith,
                fallback_triggered: true,
                detected_count: 0,
                final_count: 0,
                reason: reason.into(),
            },
        }
    }

    /// Synthetic result with `count` untitled chapters, for planning a
    /// budget when only the chapter count is known.
    pub fn for_chapter_count(count: usize) -> Self {
        if count == 0 {
            return Self::monolith("No chapters given");
        }

        let chapters = (0..count)
            .map(|i| Chapter {
                title: format!("Chapter {}", i + 1),
                line_index: i,
                char_offset: 0,
                length: 0,
                merged_count: 1,
            })
            .collect();

        Self {
            chapters,
            event: SectionDetectionEvent {
                strategy: SectionStrategy::InferSections,
                fallback_triggered: false,
                detected_count: count,
                final_count: count,
                reason: format!("{} chapters given", count),
            },
        }
    }

    /// Ambiguity note for fallback outcomes.
    pub fn ambiguity(&self) -> Option<AmbiguityNote> {
        if !self.event.fallback_triggered {
            return None;
        }
        Some(AmbiguityNote::new(
            "Chapter structure did not resolve cleanly",
            format!(
                "{} headings detected, {} kept",
                self.event.detected_count, self.event.final_count
            ),
            self.event.reason.clone(),
        ))
    }
}

/// Line-oriented chapter detector.
#[derive(Debug, Clone, Copy)]
pub struct ChapterDetector {
    max_chapters_before_merge: usize,
}

impl Default for ChapterDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChapterDetector {
    pub fn new() -> Self {
        Self {
            max_chapters_before_merge: MAX_CHAPTERS_BEFORE_MERGE,
        }
    }

    pub fn with_merge_limit(max_chapters_before_merge: usize) -> Self {
        Self {
            max_chapters_before_merge: max_chapters_before_merge.max(2),
        }
    }

    /// Detect chapters, applying `fallback` when there are too many.
    pub fn detect(&self, text: &str, fallback: SectionStrategy) -> ChapterDetectionResult {
        let chapters = self.find_boundaries(text);
        let detected_count = chapters.len();

        let result = if detected_count == 0 {
            ChapterDetectionResult::monolith("No chapter headings found")
        } else if detected_count >= self.max_chapters_before_merge {
            match fallback {
                SectionStrategy::TreatAsMonolith => ChapterDetectionResult {
                    chapters: Vec::new(),
                    event: SectionDetectionEvent {
                        strategy: SectionStrategy::TreatAsMonolith,
                        fallback_triggered: true,
                        detected_count,
                        final_count: 0,
                        reason: format!(
                            "{} chapter headings reach the limit of {}; treating as monolith",
                            detected_count, self.max_chapters_before_merge
                        ),
                    },
                },
                SectionStrategy::MergeAdjacent | SectionStrategy::InferSections => {
                    let merged = self.merge_chapters(chapters);
                    let final_count = merged.len();
                    ChapterDetectionResult {
                        chapters: merged,
                        event: SectionDetectionEvent {
                            strategy: SectionStrategy::MergeAdjacent,
                            fallback_triggered: true,
                            detected_count,
                            final_count,
                            reason: format!(
                                "Merged {} detected chapters into {}",
                                detected_count, final_count
                            ),
                        },
                    }
                }
            }
        } else {
            ChapterDetectionResult {
                event: SectionDetectionEvent {
                    strategy: SectionStrategy::InferSections,
                    fallback_triggered: false,
                    detected_count,
                    final_count: detected_count,
                    reason: format!("{} chapter headings detected", detected_count),
                },
                chapters,
            }
        };

        if let Some(note) = result.ambiguity() {
            note.log();
        }
        tracing::info!(
            strategy = %result.event.strategy,
            detected = result.event.detected_count,
            kept = result.event.final_count,
            "Chapter detection complete"
        );

        result
    }

    /// Scan lines for headings, in document order.
    fn find_boundaries(&self, text: &str) -> Vec<Chapter> {
        let mut chapters: Vec<Chapter> = Vec::new();
        let mut offset = 0;

        for (line_index, line) in text.lines().enumerate() {
            let line_chars = line.chars().count();
            let trimmed = line.trim();

            if !trimmed.is_empty()
                && line_chars <= MAX_HEADING_CHARS
                && (CHAPTER_HEADING_PATTERN.is_match(trimmed) || NUMBERED_HEADING_PATTERN.is_match(trimmed))
            {
                chapters.push(Chapter {
                    title: trimmed.trim_start_matches('#').trim().to_string(),
                    line_index,
                    char_offset: offset,
                    length: 0,
                    merged_count: 1,
                });
            }

            offset += line_chars + 1;
        }

        let total_chars = text.chars().count();
        let ends: Vec<usize> = chapters
            .iter()
            .skip(1)
            .map(|c| c.char_offset)
            .chain(std::iter::once(total_chars))
            .collect();
        for (chapter, end) in chapters.iter_mut().zip(ends) {
            chapter.length = end.saturating_sub(chapter.char_offset);
        }

        chapters
    }

    /// Fold small chapters into their neighbours until fewer than the limit
    /// remain.
    ///
    /// A pass merges any adjacent pair where either side is under half the
    /// average length. A pass that finds no such pair merges the smallest
    /// adjacent pair instead, so every pass shrinks the list and the loop is
    /// bounded by the starting count.
    fn merge_chapters(&self, mut chapters: Vec<Chapter>) -> Vec<Chapter> {
        let max_passes = chapters.len();
        let mut passes = 0;

        while chapters.len() >= self.max_chapters_before_merge && chapters.len() > 1 && passes < max_passes {
            passes += 1;

            let total: usize = chapters.iter().map(|c| c.length).sum();
            let threshold = total / chapters.len() / 2;
            let mut merged_any = false;

            let mut i = 0;
            while i + 1 < chapters.len() && chapters.len() >= self.max_chapters_before_merge {
                if chapters[i].length < threshold || chapters[i + 1].length < threshold {
                    let next = chapters.remove(i + 1);
                    chapters[i].absorb(next);
                    merged_any = true;
                } else {
                    i += 1;
                }
            }

            if !merged_any && chapters.len() >= self.max_chapters_before_merge {
                let smallest = (0..chapters.len() - 1)
                    .min_by_key(|&i| chapters[i].length + chapters[i + 1].length)
                    .unwrap_or(0);
                let next = chapters.remove(smallest + 1);
                chapters[smallest].absorb(next);
            }
        }

        if chapters.len() >= self.max_chapters_before_merge {
            tracing::warn!(
                remaining = chapters.len(),
                passes,
                "Chapter merge stopped at pass limit"
            );
        }

        chapters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> ChapterDetectionResult {
        ChapterDetector::new().detect(text, SectionStrategy::MergeAdjacent)
    }

    #[test]
    fn test_no_headings_is_monolith() {
        let result = detect("Just a long essay.\nWith several lines.\nAnd no headings.");
        assert!(result.is_monolith());
        assert!(result.event.fallback_triggered);
        assert_eq!(result.event.strategy, SectionStrategy::TreatAsMonolith);
    }

    #[test]
    fn test_detects_chapters_in_order() {
        let text = "Preface text\nChapter 1: Start\nbody one\nChapter 2: Middle\nbody two\nIII. The End\nlast";
        let result = detect(text);

        assert!(!result.event.fallback_triggered);
        assert_eq!(result.event.strategy, SectionStrategy::InferSections);
        let titles: Vec<_> = result.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter 1: Start", "Chapter 2: Middle", "III. The End"]);
        assert_eq!(result.chapters[0].line_index, 1);
        assert_eq!(result.chapters[0].char_offset, 13);
        assert_eq!(result.chapters[0].length, 26);
    }

    #[test]
    fn test_markdown_chapter_heading_title_is_stripped() {
        let result = detect("## Chapter 4\ntext");
        assert_eq!(result.chapters[0].title, "Chapter 4");
    }

    #[test]
    fn test_eighty_single_line_chapters_merge_below_limit() {
        let text: String = (1..=80).map(|i| format!("Chapter {}\n", i)).collect();
        let result = detect(&text);

        assert!(result.chapters.len() < MAX_CHAPTERS_BEFORE_MERGE);
        assert!(result.chapters.len() < 80);
        assert!(result.event.fallback_triggered);
        assert_eq!(result.event.detected_count, 80);
        assert_eq!(result.event.final_count, result.chapters.len());

        let merged: usize = result.chapters.iter().map(|c| c.merged_count).sum();
        assert_eq!(merged, 80);
    }

    #[test]
    fn test_merge_preserves_document_order() {
        let text: String = (1..=60)
            .map(|i| {
                let body = if i % 3 == 0 { "word ".repeat(40) } else { String::from("x") };
                format!("Chapter {}\n{}\n", i, body)
            })
            .collect();
        let result = detect(&text);

        assert!(result.chapters.len() < MAX_CHAPTERS_BEFORE_MERGE);
        let offsets: Vec<_> = result.chapters.iter().map(|c| c.char_offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted);
    }

    #[test]
    fn test_too_many_chapters_with_monolith_fallback() {
        let text: String = (1..=55).map(|i| format!("Part {}\n", i)).collect();
        let result = ChapterDetector::new().detect(&text, SectionStrategy::TreatAsMonolith);

        assert!(result.is_monolith());
        assert_eq!(result.event.detected_count, 55);
        assert!(result.event.fallback_triggered);
    }

    #[test]
    fn test_single_event_reason_mentions_counts() {
        let text: String = (1..=50).map(|i| format!("Chapter {}\n", i)).collect();
        let result = detect(&text);
        assert!(result.event.reason.contains("50"));
        assert!(result.ambiguity().is_some());
    }

    #[test]
    fn test_custom_merge_limit() {
        let text: String = (1..=4).map(|i| format!("Chapter {}\nbody\n", i)).collect();
        let result = ChapterDetector::with_merge_limit(3).detect(&text, SectionStrategy::MergeAdjacent);

        assert!(result.event.fallback_triggered);
        assert_eq!(result.event.detected_count, 4);
        assert_eq!(result.chapters.len(), 2);
        let merged: usize = result.chapters.iter().map(|c| c.merged_count).sum();
        assert_eq!(merged, 4);

        // Limits below two are raised to two.
        let single = ChapterDetector::with_merge_limit(0).detect("Chapter 1\nbody", SectionStrategy::MergeAdjacent);
        assert!(!single.event.fallback_triggered);
        assert_eq!(single.chapters.len(), 1);
    }
}
