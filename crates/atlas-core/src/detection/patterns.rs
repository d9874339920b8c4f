//! Shared detection patterns.
//!
//! Phrase lists are matched against lower-cased text with plain substring
//! search. Regexes cover the cases that need word boundaries, counting or
//! line anchoring.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

// =========================================================================
// SOURCE TYPE: ARGUMENTATIVE
// =========================================================================

pub const ARGUMENT_PHRASES: &[&str] = &[
    "argues that",
    "claims that",
    "contends that",
    "maintains that",
    "posits that",
    "the author argues",
    "this book argues",
    "i argue",
    "we argue",
    "the central thesis",
];

pub const EVIDENCE_PHRASES: &[&str] = &[
    "evidence suggests",
    "research shows",
    "studies show",
    "data indicate",
    "data show",
    "according to",
    "demonstrates that",
    "the findings",
    "empirical",
];

// =========================================================================
// SOURCE TYPE: NARRATIVE
// =========================================================================

pub const SCENE_PHRASES: &[&str] = &[
    "the room was",
    "the air was",
    "the sky was",
    "it was a cold",
    "it was a warm",
    "it was a dark",
    "stood in the",
    "walked into",
    "sat at the",
    "the rain fell",
];

// =========================================================================
// SOURCE TYPE: TECHNICAL
// =========================================================================

pub const DEFINITION_PHRASES: &[&str] = &[
    "is defined as",
    "refers to",
    "definition:",
    "denotes",
    "is a term for",
    "we define",
];

pub const TECHNICAL_MARKERS: &[&str] = &[
    "```",
    "|---",
    "| ---",
    "|:--",
    "specification",
    "parameter:",
    "parameters:",
    "returns:",
    "input:",
    "output:",
];

// =========================================================================
// EXPANSION TYPES
// =========================================================================

pub const EXERCISE_PHRASES: &[&str] = &[
    "exercise:",
    "try this",
    "practice:",
    "reflect on",
    "write down",
    "worksheet",
    "action step",
    "your turn",
    "take a moment to",
];

pub const COMPARISON_PHRASES: &[&str] = &[
    "compare this to",
    "compared with",
    "just as in",
    "similarly, in",
    "in the field of",
    "analogous to",
    "parallels in",
    "borrowed from",
];

pub const COMMENTARY_PHRASES: &[&str] = &[
    "moreover",
    "furthermore",
    "it is worth noting",
    "in addition",
    "notably",
    "interestingly",
    "one might argue",
    "beyond this",
];

pub const SECONDARY_EXAMPLE_PHRASES: &[&str] = &[
    "another example",
    "for instance",
    "consider the case",
    "a further example",
    "to take another case",
    "a second example",
];

pub const ELABORATION_PHRASES: &[&str] = &[
    "in other words",
    "to put it another way",
    "that is to say",
    "put simply",
    "to elaborate",
    "said differently",
];

/// Distinct commentary markers needed before a block counts as commentary.
pub const MIN_COMMENTARY_MARKERS: usize = 2;

lazy_static! {
    /// Conclusion connectives counted for argumentative prose.
    pub static ref CONNECTIVE_PATTERN: Regex = Regex::new(
        r"\b(therefore|thus|hence|consequently)\b"
    ).unwrap();

    /// Dialogue attribution after a closing quote or as a pronoun clause.
    pub static ref DIALOGUE_PATTERN: Regex = Regex::new(
        r#"(["”']\s*,?\s*(he|she|they|i|we)?\s*(said|asked|replied|whispered|shouted|answered)\b)|\b(he|she|they) (said|asked|replied|whispered|shouted)\b"#
    ).unwrap();

    /// Temporal sequencing markers counted for narrative prose.
    pub static ref TEMPORAL_PATTERN: Regex = Regex::new(
        r"\b(then|later|afterward|afterwards|meanwhile|suddenly|eventually|the next day|years later|that night|that morning)\b"
    ).unwrap();

    /// Numbered procedure steps: `1. `, `2) `, `step 3 `.
    pub static ref NUMBERED_STEP_PATTERN: Regex = Regex::new(
        r"(?m)^\s*(?:step\s+(\d+)\b|(\d+)[.)]\s)"
    ).unwrap();

    /// `Chapter 3`, `Part IV`, `## Section two`.
    pub static ref CHAPTER_HEADING_PATTERN: Regex = Regex::new(
        r"(?i)^\s*(?:#{1,3}\s*)?(chapter|part|section|book)\s+([0-9]{1,3}|[ivxlcdm]{1,7}|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)\b"
    ).unwrap();

    /// `3. The Long Road` or `IV. Aftermath` on a line of its own.
    pub static ref NUMBERED_HEADING_PATTERN: Regex = Regex::new(
        r"^\s*([0-9]{1,2}|[IVXLC]{1,6})\.\s+[A-Z][^.!?]{0,80}$"
    ).unwrap();
}

/// Whether lower-cased text contains any phrase from the list.
pub fn contains_any(lower: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| lower.contains(p))
}

/// Phrases from the list present in lower-cased text, in list order.
pub fn matched_phrases(lower: &str, phrases: &[&'static str]) -> Vec<&'static str> {
    phrases.iter().copied().filter(|p| lower.contains(p)).collect()
}

/// Number of regex matches in the text.
pub fn count_matches(pattern: &Regex, text: &str) -> usize {
    pattern.find_iter(text).count()
}

/// Distinct step numbers found by the numbered-step pattern.
pub fn distinct_step_numbers(text: &str) -> BTreeSet<u32> {
    NUMBERED_STEP_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connective_count() {
        let text = "thus we see. therefore it holds. hence. consequently! thus again";
        assert_eq!(count_matches(&CONNECTIVE_PATTERN, text), 5);
        assert_eq!(count_matches(&CONNECTIVE_PATTERN, "thusly"), 0);
    }

    #[test]
    fn test_dialogue_detection() {
        assert!(DIALOGUE_PATTERN.is_match(r#""come here," she said"#));
        assert!(DIALOGUE_PATTERN.is_match("and then he asked about the map"));
        assert!(!DIALOGUE_PATTERN.is_match("the report said nothing new"));
    }

    #[test]
    fn test_distinct_steps() {
        let text = "1. open the file\n2. edit it\n2. save\nstep 3 close";
        let steps = distinct_step_numbers(text);
        assert_eq!(steps.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_chapter_heading_forms() {
        assert!(CHAPTER_HEADING_PATTERN.is_match("Chapter 12: The Turn"));
        assert!(CHAPTER_HEADING_PATTERN.is_match("PART IV"));
        assert!(CHAPTER_HEADING_PATTERN.is_match("## Section two"));
        assert!(!CHAPTER_HEADING_PATTERN.is_match("In this chapter we look back"));
    }

    #[test]
    fn test_numbered_heading_forms() {
        assert!(NUMBERED_HEADING_PATTERN.is_match("3. The Long Road"));
        assert!(NUMBERED_HEADING_PATTERN.is_match("IV. Aftermath"));
        assert!(!NUMBERED_HEADING_PATTERN.is_match("1. Install the tool."));
        assert!(!NUMBERED_HEADING_PATTERN.is_match("2. lowercase start"));
    }

    #[test]
    fn test_matched_phrases_order() {
        let lower = "furthermore, and moreover, notably";
        assert_eq!(
            matched_phrases(lower, COMMENTARY_PHRASES),
            vec!["moreover", "furthermore", "notably"]
        );
    }
}
