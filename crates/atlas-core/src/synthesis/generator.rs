//! Synthesis paragraph generation and length normalization.

use serde::{Deserialize, Serialize};

use crate::governor::CutEvent;
use crate::types::{word_count, ExpansionType, SourceType};

use super::templates::{self, FILLER_SENTENCES};

/// Context strings are cut to this many characters before interpolation.
pub const MAX_CONTEXT_CHARS: usize = 200;

pub const MIN_SYNTHESIS_WORDS: usize = 50;
pub const MAX_SYNTHESIS_WORDS: usize = 100;
pub const MIN_CONSOLIDATED_WORDS: usize = 75;

const EMPTY_CONTEXT: &str = "the material in this section";

/// Replacement prose for content removed by the cut policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisParagraph {
    pub content: String,
    pub word_count: usize,
    pub replaced_type: ExpansionType,
    pub section_index: usize,
    pub consolidated: bool,
}

impl SynthesisParagraph {
    pub(crate) fn new(
        content: String,
        replaced_type: ExpansionType,
        section_index: usize,
        consolidated: bool,
    ) -> Self {
        Self {
            word_count: word_count(&content),
            content,
            replaced_type,
            section_index,
            consolidated,
        }
    }

    /// Whether the word count sits inside the contract for its kind.
    pub fn is_valid(&self) -> bool {
        let min = if self.consolidated {
            MIN_CONSOLIDATED_WORDS
        } else {
            MIN_SYNTHESIS_WORDS
        };
        (min..=MAX_SYNTHESIS_WORDS).contains(&self.word_count)
    }
}

/// Renders synthesis paragraphs for one source type.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisGenerator {
    source_type: SourceType,
}

impl SynthesisGenerator {
    pub fn new(source_type: SourceType) -> Self {
        Self { source_type }
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Build the replacement paragraph for a cut.
    pub fn generate(&self, event: &CutEvent, context_summary: &str) -> SynthesisParagraph {
        let context = truncate_context(context_summary);
        let raw = templates::render(self.source_type, event.expansion_type, &context);
        let content = normalize_synthesis_length(&raw, MIN_SYNTHESIS_WORDS, MAX_SYNTHESIS_WORDS);

        SynthesisParagraph::new(content, event.expansion_type, event.section_index, false)
    }
}

/// Cut a context string to [`MAX_CONTEXT_CHARS`] on a word boundary and strip
/// trailing punctuation so it reads inside a sentence.
pub fn truncate_context(context: &str) -> String {
    let trimmed = context.trim();
    let truncated: String = if trimmed.chars().count() > MAX_CONTEXT_CHARS {
        let head: String = trimmed.chars().take(MAX_CONTEXT_CHARS).collect();
        match head.rfind(char::is_whitespace) {
            Some(idx) if idx > 0 => head[..idx].to_string(),
            _ => head,
        }
    } else {
        trimmed.to_string()
    };

    let cleaned = truncated
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string();

    if cleaned.is_empty() {
        EMPTY_CONTEXT.to_string()
    } else {
        cleaned
    }
}

/// Pad with filler sentences until `min_words`, then truncate to `max_words`.
///
/// A truncated result always ends with a period.
pub fn normalize_synthesis_length(text: &str, min_words: usize, max_words: usize) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();

    let mut filler = FILLER_SENTENCES.iter().cycle();
    while words.len() < min_words {
        match filler.next() {
            Some(sentence) => words.extend(sentence.split_whitespace()),
            None => break,
        }
    }

    if words.len() <= max_words {
        return words.join(" ");
    }

    words.truncate(max_words);
    let mut content = words.join(" ");
    let trimmed_len = content
        .trim_end_matches(|c: char| matches!(c, ',' | ';' | ':' | '-'))
        .len();
    content.truncate(trimmed_len);
    if !content.ends_with('.') {
        content.push('.');
    }
    content
}

/// First sentence of a paragraph, with its terminating period.
pub(crate) fn first_sentence(text: &str) -> String {
    let sentence = match text.find(". ") {
        Some(idx) => &text[..idx],
        None => text.trim_end_matches('.'),
    };
    format!("{}.", sentence.trim())
}
