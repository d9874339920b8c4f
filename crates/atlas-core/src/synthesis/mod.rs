//! Replacement prose for cut content.

mod generator;
mod manager;
pub mod templates;

pub use generator::{
    normalize_synthesis_length, truncate_context, SynthesisGenerator, SynthesisParagraph,
    MAX_CONTEXT_CHARS, MAX_SYNTHESIS_WORDS, MIN_CONSOLIDATED_WORDS, MIN_SYNTHESIS_WORDS,
};
pub use manager::{SynthesisManager, SynthesisOutcome, MAX_CONSOLIDATED_KEY_POINTS};
