//! Synthesis templates keyed by source type and expansion type.
//!
//! Every template is declarative prose: no questions, no hedging. The match
//! is exhaustive over both enums, so a new source or expansion type does not
//! compile until it has a template here.

use crate::types::{ExpansionType, SourceType};

/// Render the template for a (source, expansion) pair around `context`.
///
/// The first sentence of every template stands on its own and never embeds
/// the context, so consolidation can lift it as a key point.
pub fn render(source_type: SourceType, expansion_type: ExpansionType, context: &str) -> String {
    match source_type {
        SourceType::Argumentative => match expansion_type {
            ExpansionType::Exercise => format!(
                "The applied exercise in this section reinforces the central claim through practice. \
                 Its purpose is to turn the argument about {} into a concrete habit the reader carries forward.",
                context
            ),
            ExpansionType::AdjacentDomainComparison => format!(
                "A comparison with a neighbouring field supports the same line of reasoning. \
                 The parallel shows that the case made for {} holds outside its original domain.",
                context
            ),
            ExpansionType::ExtendedCommentary => format!(
                "The author adds commentary that sharpens the main thesis. \
                 The commentary clarifies why {} matters to the overall argument.",
                context
            ),
            ExpansionType::SecondaryExample => format!(
                "A further example confirms the pattern already established. \
                 It applies the reasoning about {} to a second case with the same result.",
                context
            ),
            ExpansionType::StylisticElaboration => format!(
                "The author restates the claim in different terms for emphasis. \
                 The restatement keeps the focus on {} without adding new evidence.",
                context
            ),
            ExpansionType::CoreArgument => format!(
                "The core argument of this section stands as written. \
                 It centres on {}.",
                context
            ),
        },
        SourceType::Narrative => match expansion_type {
            ExpansionType::Exercise => format!(
                "The story invites the reader to reflect on their own experience. \
                 The reflection ties the events surrounding {} to the reader's daily choices.",
                context
            ),
            ExpansionType::AdjacentDomainComparison => format!(
                "The narrative draws a parallel with events from another setting. \
                 That parallel frames {} as part of a wider human pattern.",
                context
            ),
            ExpansionType::ExtendedCommentary => format!(
                "The narrator pauses the story to comment on its meaning. \
                 The commentary connects {} to the themes that run through the book.",
                context
            ),
            ExpansionType::SecondaryExample => format!(
                "A second episode echoes the main story. \
                 It repeats the lesson of {} through different characters and circumstances.",
                context
            ),
            ExpansionType::StylisticElaboration => format!(
                "The prose lingers on detail to deepen the scene. \
                 The added description keeps attention on {} and its emotional weight.",
                context
            ),
            ExpansionType::CoreArgument => format!(
                "The central thread of the story continues here. \
                 It follows {}.",
                context
            ),
        },
        SourceType::Technical => match expansion_type {
            ExpansionType::Exercise => format!(
                "The hands-on exercise here practises the procedure just described. \
                 Working through it builds fluency with {} before moving on.",
                context
            ),
            ExpansionType::AdjacentDomainComparison => format!(
                "The method is compared with an approach from a related discipline. \
                 The comparison positions {} relative to established practice.",
                context
            ),
            ExpansionType::ExtendedCommentary => format!(
                "The author adds implementation notes to the core method. \
                 These notes explain how {} behaves in real projects.",
                context
            ),
            ExpansionType::SecondaryExample => format!(
                "An additional worked example applies the same technique. \
                 It demonstrates {} on a second input with identical steps.",
                context
            ),
            ExpansionType::StylisticElaboration => format!(
                "The explanation is repeated with alternate wording. \
                 The repetition restates {} without changing the procedure.",
                context
            ),
            ExpansionType::CoreArgument => format!(
                "The core procedure of this section applies unchanged. \
                 It defines {}.",
                context
            ),
        },
    }
}

/// Fixed filler sentences used, in turn, to pad short synthesis text.
pub const FILLER_SENTENCES: [&str; 2] = [
    "This point connects directly to the central argument of the work.",
    "The underlying principle remains consistent with the surrounding material.",
];

#[cfg(test)]
mod tests {
    use super::*;

    const HEDGES: &[&str] = &[
        " might ", " perhaps ", " may ", " could ", " possibly ", " seems ", " arguably ",
        " likely ",
    ];

    const SOURCES: [SourceType; 3] = [
        SourceType::Argumentative,
        SourceType::Narrative,
        SourceType::Technical,
    ];

    const EXPANSIONS: [ExpansionType; 6] = [
        ExpansionType::Exercise,
        ExpansionType::AdjacentDomainComparison,
        ExpansionType::ExtendedCommentary,
        ExpansionType::SecondaryExample,
        ExpansionType::StylisticElaboration,
        ExpansionType::CoreArgument,
    ];

    #[test]
    fn test_templates_are_declarative_and_unhedged() {
        for source in SOURCES {
            for expansion in EXPANSIONS {
                let text = format!(" {} ", render(source, expansion, "habit loops").to_lowercase());
                assert!(!text.contains('?'), "{:?}/{:?} asks a question", source, expansion);
                for hedge in HEDGES {
                    assert!(!text.contains(hedge), "{:?}/{:?} hedges", source, expansion);
                }
                assert!(text.contains("habit loops"));
            }
        }
    }

    #[test]
    fn test_first_sentence_excludes_context() {
        for source in SOURCES {
            for expansion in EXPANSIONS {
                let text = render(source, expansion, "CONTEXT");
                let first = text.split(". ").next().unwrap_or_default();
                assert!(!first.contains("CONTEXT"));
            }
        }
    }

    #[test]
    fn test_templates_differ_by_source_type() {
        let a = render(SourceType::Argumentative, ExpansionType::Exercise, "x");
        let n = render(SourceType::Narrative, ExpansionType::Exercise, "x");
        assert_ne!(a, n);
    }
}
