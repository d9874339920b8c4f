//! Guide markup parsing and the structure audit.
//!
//! Generated guides are markdown with bracketed block tags on their own
//! lines:
//!
//! ```text
//! ## Chapter 1: Systems
//! [INSIGHT_NOTE]
//! Habits are the compound interest of self-improvement.
//! [/INSIGHT_NOTE]
//! [VISUAL_FLOWCHART width=wide]
//! cue -> craving -> response -> reward
//! [/VISUAL_FLOWCHART]
//! ```
//!
//! `VISUAL_*` and `STRUCTURE_MAP` blocks become visuals. Every other block
//! and every plain paragraph becomes a text block.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::layout::{
    IssueSeverity, LayoutBlock, LayoutDocument, LayoutIssue, LayoutIssueType, LayoutSection,
};
use crate::reader_presets::GenerationConstraints;
use crate::types::{word_count, VisualKind, WidthCategory};

/// Share of structure checks a guide must pass.
pub const STRUCTURE_PASS_THRESHOLD: f64 = 0.95;

/// Blocks every guide must contain.
pub const REQUIRED_BLOCKS: &[&str] = &["QUICK_GLANCE", "TAKEAWAYS"];

lazy_static! {
    static ref HEADING_PATTERN: Regex = Regex::new(r"^(#{1,6})\s+(.+?)\s*$").unwrap();
    static ref OPEN_TAG_PATTERN: Regex = Regex::new(r"^\[([A-Z][A-Z0-9_]*)([^\]/]*)\]$").unwrap();
    static ref CLOSE_TAG_PATTERN: Regex = Regex::new(r"^\[/([A-Z][A-Z0-9_]*)\]$").unwrap();
    static ref WIDTH_ATTR_PATTERN: Regex = Regex::new(r"(?i)\bwidth\s*=\s*([a-z]+)").unwrap();
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GuideParseError {
    #[error("Line {line}: visual block [{inner}] opened inside visual block [{outer}]")]
    NestedVisual {
        line: usize,
        outer: String,
        inner: String,
    },

    #[error("Guide is empty")]
    Empty,
}

/// A parsed guide plus the markup problems found on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedGuide {
    pub document: LayoutDocument,

    /// Every block tag opened, in first-seen order, deduplicated.
    pub tags: Vec<String>,

    pub blocks_opened: usize,

    /// Unclosed and stray tags.
    pub markup_issues: Vec<LayoutIssue>,
}

impl ParsedGuide {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

struct OpenBlock {
    tag: String,
    line: usize,
    visual: Option<(VisualKind, WidthCategory)>,
    words: usize,
}

fn is_visual_tag(tag: &str) -> bool {
    tag.starts_with("VISUAL_") || tag == "STRUCTURE_MAP"
}

struct GuideBuilder {
    sections: Vec<LayoutSection>,
    stack: Vec<OpenBlock>,
    paragraph_words: usize,
    tags: Vec<String>,
    blocks_opened: usize,
    issues: Vec<LayoutIssue>,
}

impl GuideBuilder {
    fn new() -> Self {
        Self {
            sections: vec![LayoutSection::new("", 0)],
            stack: Vec::new(),
            paragraph_words: 0,
            tags: Vec::new(),
            blocks_opened: 0,
            issues: Vec::new(),
        }
    }

    fn in_visual(&self) -> bool {
        self.stack.last().is_some_and(|b| b.visual.is_some())
    }

    fn section_index(&self) -> usize {
        self.sections.len() - 1
    }

    fn push_block(&mut self, block: LayoutBlock) {
        if let Some(section) = self.sections.last_mut() {
            section.blocks.push(block);
        }
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph_words > 0 {
            let words = self.paragraph_words;
            self.paragraph_words = 0;
            self.push_block(LayoutBlock::text(words));
        }
    }

    fn open(&mut self, tag: &str, attrs: &str, line: usize) -> Result<(), GuideParseError> {
        self.flush_paragraph();

        let visual = if is_visual_tag(tag) {
            if let Some(outer) = self.stack.iter().find(|b| b.visual.is_some()) {
                return Err(GuideParseError::NestedVisual {
                    line,
                    outer: outer.tag.clone(),
                    inner: tag.to_string(),
                });
            }
            let kind = VisualKind::from_tag(tag.strip_prefix("VISUAL_").unwrap_or(tag));
            let width = WIDTH_ATTR_PATTERN
                .captures(attrs)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or_default();
            Some((kind, width))
        } else {
            None
        };

        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
        self.blocks_opened += 1;
        self.stack.push(OpenBlock {
            tag: tag.to_string(),
            line,
            visual,
            words: 0,
        });
        Ok(())
    }

    fn finish_block(&mut self, block: OpenBlock) {
        match block.visual {
            Some((kind, width)) => self.push_block(LayoutBlock::visual(kind, width)),
            None if block.words > 0 => self.push_block(LayoutBlock::Text {
                words: block.words,
                tag: Some(block.tag),
            }),
            None => {}
        }
    }

    fn unclosed(&mut self, block: OpenBlock) {
        self.issues.push(LayoutIssue::new(
            LayoutIssueType::UnclosedBlock,
            Some(self.section_index()),
            IssueSeverity::Critical,
            format!("[{}] opened on line {} is never closed", block.tag, block.line),
        ));
        self.finish_block(block);
    }

    fn close(&mut self, tag: &str, line: usize) {
        self.flush_paragraph();

        let Some(position) = self.stack.iter().rposition(|b| b.tag == tag) else {
            self.issues.push(LayoutIssue::new(
                LayoutIssueType::StrayClosingTag,
                Some(self.section_index()),
                IssueSeverity::Warning,
                format!("[/{}] on line {} closes nothing", tag, line),
            ));
            return;
        };

        while self.stack.len() > position + 1 {
            if let Some(inner) = self.stack.pop() {
                self.unclosed(inner);
            }
        }
        if let Some(block) = self.stack.pop() {
            self.finish_block(block);
        }
    }

    fn heading(&mut self, depth: u8, title: &str) {
        self.flush_paragraph();
        while let Some(block) = self.stack.pop() {
            self.unclosed(block);
        }
        self.sections.push(LayoutSection::new(title, depth));
    }

    fn text(&mut self, line: &str) {
        let words = word_count(line);
        match self.stack.last_mut() {
            Some(block) if block.visual.is_some() => {}
            Some(block) => block.words += words,
            None => self.paragraph_words += words,
        }
    }

    fn finish(mut self) -> ParsedGuide {
        self.flush_paragraph();
        while let Some(block) = self.stack.pop() {
            self.unclosed(block);
        }

        let mut sections = self.sections;
        let mut issues = self.issues;
        let lead_unused = sections.len() > 1
            && sections[0].blocks.is_empty()
            && issues.iter().all(|i| i.section != Some(0));
        if lead_unused {
            sections.remove(0);
            for issue in issues.iter_mut() {
                issue.section = issue.section.map(|s| s - 1);
            }
        }

        ParsedGuide {
            document: LayoutDocument::new(sections),
            tags: self.tags,
            blocks_opened: self.blocks_opened,
            markup_issues: issues,
        }
    }
}

/// Parse guide markup into a layout document.
pub fn parse_guide(text: &str) -> Result<ParsedGuide, GuideParseError> {
    if text.trim().is_empty() {
        return Err(GuideParseError::Empty);
    }

    let mut builder = GuideBuilder::new();

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();

        if line.is_empty() {
            if builder.stack.is_empty() {
                builder.flush_paragraph();
            }
            continue;
        }

        if let Some(caps) = CLOSE_TAG_PATTERN.captures(line) {
            builder.close(&caps[1], line_number);
        } else if let Some(caps) = OPEN_TAG_PATTERN.captures(line) {
            builder.open(&caps[1], &caps[2], line_number)?;
        } else if builder.in_visual() {
            continue;
        } else if let Some(caps) = HEADING_PATTERN.captures(line) {
            builder.heading(caps[1].len() as u8, &caps[2]);
        } else {
            builder.text(line);
        }
    }

    let parsed = builder.finish();
    tracing::debug!(
        sections = parsed.document.sections.len(),
        blocks = parsed.blocks_opened,
        markup_issues = parsed.markup_issues.len(),
        "Guide parsed"
    );
    Ok(parsed)
}

/// Outcome of the structure audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAudit {
    pub checks_run: usize,
    pub checks_passed: usize,
    pub pass_rate: f64,
    pub issues: Vec<LayoutIssue>,
    pub missing_blocks: Vec<String>,
}

impl StructureAudit {
    pub fn passes(&self) -> bool {
        self.pass_rate >= STRUCTURE_PASS_THRESHOLD
    }
}

struct Checks {
    run: usize,
    passed: usize,
    issues: Vec<LayoutIssue>,
}

impl Checks {
    fn check(&mut self, ok: bool, failure: impl FnOnce() -> LayoutIssue) {
        self.run += 1;
        if ok {
            self.passed += 1;
        } else {
            self.issues.push(failure());
        }
    }
}

/// Audit block closure, required blocks, heading depth and paragraph length.
///
/// Each opened block, required block, section and text block is one check.
pub fn audit_structure(guide: &ParsedGuide, constraints: &GenerationConstraints) -> StructureAudit {
    let mut checks = Checks {
        run: 0,
        passed: 0,
        issues: Vec::new(),
    };

    // One check per opened block, plus one per stray closing tag.
    let stray = guide
        .markup_issues
        .iter()
        .filter(|i| i.issue_type == LayoutIssueType::StrayClosingTag)
        .count();
    let unclosed = guide
        .markup_issues
        .iter()
        .filter(|i| i.issue_type == LayoutIssueType::UnclosedBlock)
        .count();
    checks.run += guide.blocks_opened + stray;
    checks.passed += guide.blocks_opened.saturating_sub(unclosed);
    checks.issues.extend(guide.markup_issues.iter().cloned());

    let present: BTreeSet<&str> = guide.tags.iter().map(String::as_str).collect();
    let mut missing_blocks = Vec::new();
    for required in REQUIRED_BLOCKS {
        let found = present.contains(required);
        if !found {
            missing_blocks.push(required.to_string());
        }
        checks.check(found, || {
            LayoutIssue::new(
                LayoutIssueType::MissingRequiredBlock,
                None,
                IssueSeverity::Warning,
                format!("Add a [{}] block", required),
            )
        });
    }

    for (index, section) in guide.document.sections.iter().enumerate() {
        checks.check(section.depth <= constraints.max_section_depth, || {
            LayoutIssue::new(
                LayoutIssueType::SectionTooDeep,
                Some(index),
                IssueSeverity::Warning,
                format!(
                    "Heading level {} exceeds maximum depth {}",
                    section.depth, constraints.max_section_depth
                ),
            )
        });

        checks.check(!section.blocks.is_empty(), || {
            LayoutIssue::new(
                LayoutIssueType::EmptySection,
                Some(index),
                IssueSeverity::Warning,
                format!("Section \"{}\" has no content", section.title),
            )
        });

        for block in &section.blocks {
            if let LayoutBlock::Text { words, .. } = block {
                checks.check(*words <= constraints.paragraph_max_words, || {
                    LayoutIssue::new(
                        LayoutIssueType::LongParagraph,
                        Some(index),
                        IssueSeverity::Info,
                        format!(
                            "{} word paragraph; keep paragraphs under {}",
                            words, constraints.paragraph_max_words
                        ),
                    )
                });
            }
        }
    }

    let pass_rate = if checks.run == 0 {
        1.0
    } else {
        checks.passed as f64 / checks.run as f64
    };

    StructureAudit {
        checks_run: checks.run,
        checks_passed: checks.passed,
        pass_rate,
        issues: checks.issues,
        missing_blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader_presets;
    use crate::types::ReaderProfile;

    const GUIDE: &str = "\
# Atomic Habits

[QUICK_GLANCE]
Small habits compound into remarkable results.
[/QUICK_GLANCE]

## Chapter 1: Systems

Goals set direction but systems make progress.
They run every day.

[VISUAL_FLOWCHART width=wide]
cue -> craving -> response -> reward
[/VISUAL_FLOWCHART]

[TAKEAWAYS]
Focus on systems.
[/TAKEAWAYS]
";

    fn constraints() -> GenerationConstraints {
        reader_presets::preset(ReaderProfile::General).constraints()
    }

    #[test]
    fn test_parse_sections_and_blocks() {
        let guide = parse_guide(GUIDE).unwrap();
        let sections = &guide.document.sections;

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Atomic Habits");
        assert_eq!(sections[0].depth, 1);
        assert_eq!(sections[1].depth, 2);
        assert_eq!(
            sections[1].blocks,
            vec![
                LayoutBlock::text(11),
                LayoutBlock::visual(VisualKind::Flowchart, WidthCategory::Wide),
                LayoutBlock::Text {
                    words: 3,
                    tag: Some("TAKEAWAYS".to_string())
                },
            ]
        );
        assert!(guide.markup_issues.is_empty());
        assert_eq!(guide.blocks_opened, 3);
        assert!(guide.has_tag("QUICK_GLANCE"));
    }

    #[test]
    fn test_clean_guide_passes_audit() {
        let guide = parse_guide(GUIDE).unwrap();
        let audit = audit_structure(&guide, &constraints());

        assert_eq!(audit.pass_rate, 1.0);
        assert!(audit.passes());
        assert!(audit.missing_blocks.is_empty());
    }

    #[test]
    fn test_unclosed_block_is_flagged() {
        let guide = parse_guide("## One\n[INSIGHT_NOTE]\nsome words here\n## Two\ntext").unwrap();
        assert_eq!(guide.markup_issues.len(), 1);
        assert_eq!(guide.markup_issues[0].issue_type, LayoutIssueType::UnclosedBlock);
        assert_eq!(guide.markup_issues[0].section, Some(0));
        // The unclosed block's text still counts.
        assert_eq!(guide.document.sections[0].words(), 3);
    }

    #[test]
    fn test_stray_close_is_flagged() {
        let guide = parse_guide("## One\ntext\n[/TAKEAWAYS]").unwrap();
        assert_eq!(guide.markup_issues[0].issue_type, LayoutIssueType::StrayClosingTag);
    }

    #[test]
    fn test_nested_visual_is_an_error() {
        let result = parse_guide("[VISUAL_TABLE]\n[VISUAL_CHART]\n[/VISUAL_CHART]\n[/VISUAL_TABLE]");
        assert_eq!(
            result,
            Err(GuideParseError::NestedVisual {
                line: 2,
                outer: "VISUAL_TABLE".to_string(),
                inner: "VISUAL_CHART".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_guide_is_an_error() {
        assert_eq!(parse_guide("  \n "), Err(GuideParseError::Empty));
    }

    #[test]
    fn test_audit_flags_depth_and_missing_blocks() {
        let guide = parse_guide("#### Too deep\nplain text").unwrap();
        let audit = audit_structure(&guide, &constraints());

        assert!(!audit.passes());
        assert_eq!(audit.missing_blocks, vec!["QUICK_GLANCE", "TAKEAWAYS"]);
        assert!(audit
            .issues
            .iter()
            .any(|i| i.issue_type == LayoutIssueType::SectionTooDeep));
    }

    #[test]
    fn test_visual_body_is_opaque() {
        let guide = parse_guide("## Code\n[VISUAL_TABLE]\n# not a heading\n| a | b |\n[/VISUAL_TABLE]").unwrap();
        assert_eq!(guide.document.sections.len(), 1);
        assert_eq!(guide.document.total_words(), 0);
    }

    #[test]
    fn test_structure_map_is_visual() {
        let guide = parse_guide("## Map\n[STRUCTURE_MAP]\nA -> B\n[/STRUCTURE_MAP]").unwrap();
        assert_eq!(guide.document.visual_count(), 1);
    }
}
