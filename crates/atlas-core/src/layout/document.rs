//! Block-level model of a rendered guide.

use serde::{Deserialize, Serialize};

use crate::types::{VisualKind, WidthCategory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "block", rename_all = "snake_case")]
pub enum LayoutBlock {
    /// A prose paragraph or a text callout.
    Text {
        words: usize,
        #[serde(default)]
        tag: Option<String>,
    },
    Visual {
        kind: VisualKind,
        #[serde(default)]
        width: WidthCategory,
    },
}

impl LayoutBlock {
    pub fn text(words: usize) -> Self {
        LayoutBlock::Text { words, tag: None }
    }

    pub fn visual(kind: VisualKind, width: WidthCategory) -> Self {
        LayoutBlock::Visual { kind, width }
    }

    pub fn is_visual(&self) -> bool {
        matches!(self, LayoutBlock::Visual { .. })
    }

    pub fn words(&self) -> usize {
        match self {
            LayoutBlock::Text { words, .. } => *words,
            LayoutBlock::Visual { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSection {
    pub title: String,

    /// Heading level: 1 for `#`, 2 for `##`. 0 for untitled lead-in content.
    pub depth: u8,

    pub blocks: Vec<LayoutBlock>,
}

impl LayoutSection {
    pub fn new(title: impl Into<String>, depth: u8) -> Self {
        Self {
            title: title.into(),
            depth,
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<LayoutBlock>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn words(&self) -> usize {
        self.blocks.iter().map(LayoutBlock::words).sum()
    }

    pub fn visual_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_visual()).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub sections: Vec<LayoutSection>,
}

impl LayoutDocument {
    pub fn new(sections: Vec<LayoutSection>) -> Self {
        Self { sections }
    }

    pub fn total_words(&self) -> usize {
        self.sections.iter().map(LayoutSection::words).sum()
    }

    pub fn visual_count(&self) -> usize {
        self.sections.iter().map(LayoutSection::visual_count).sum()
    }

    pub fn max_depth(&self) -> u8 {
        self.sections.iter().map(|s| s.depth).max().unwrap_or(0)
    }
}
