//! `atlas`: inspect governors, budgets, detection and layout scores offline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use atlas_core::{ReaderProfile, ScoreFormat, SummaryType};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "atlas",
    version,
    about = "Content budgeting and layout-quality governance for generated guides"
)]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,

    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Raise log verbosity (-v info, -vv debug)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the governor registry.
    Presets {
        #[arg(long, value_enum, default_value_t = PresetFormat::Yaml)]
        format: PresetFormat,
    },

    /// Print the generation plan for a source.
    Budget {
        #[arg(long)]
        summary_type: SummaryType,

        #[arg(long, conflicts_with = "source_words", required_unless_present = "source_words")]
        source: Option<PathBuf>,

        #[arg(long)]
        source_words: Option<usize>,
    },

    /// Detect source type and chapters in a source file.
    Detect { file: PathBuf },

    /// Classify the expansion type of a block of text.
    Classify { text: String },

    /// Replay a JSON list of chunks through the budget engine.
    Simulate {
        #[arg(long)]
        summary_type: SummaryType,

        #[arg(long)]
        source_words: usize,

        #[arg(long)]
        chunks: PathBuf,
    },

    /// Evaluate a layout score and decide whether to regenerate.
    Score {
        score: PathBuf,

        #[arg(long, default_value = "general")]
        profile: ReaderProfile,

        #[arg(long, default_value = "overall")]
        format: ScoreFormat,

        #[arg(long, default_value_t = 1)]
        attempt: u32,
    },

    /// Parse guide markup and report visual density and structure.
    Density {
        guide: PathBuf,

        #[arg(long, default_value = "general")]
        preset: ReaderProfile,
    },

    /// Load and validate a governor override file.
    CheckConfig { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PresetFormat {
    Json,
    Yaml,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    atlas_core::validate_presets().context("shipped presets failed validation")?;

    let json = cli.json;
    match cli.command {
        Commands::Presets { format } => {
            let format = if json { PresetFormat::Json } else { format };
            commands::presets(format)
        }
        Commands::Budget {
            summary_type,
            source,
            source_words,
        } => commands::budget(summary_type, source.as_deref(), source_words, json),
        Commands::Detect { file } => commands::detect(&file, json),
        Commands::Classify { text } => commands::classify(&text, json),
        Commands::Simulate {
            summary_type,
            source_words,
            chunks,
        } => commands::simulate(summary_type, source_words, &chunks, json),
        Commands::Score {
            score,
            profile,
            format,
            attempt,
        } => commands::score(&score, profile, format, attempt, json),
        Commands::Density { guide, preset } => commands::density(&guide, preset, json),
        Commands::CheckConfig { path } => commands::check_config(&path, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_budget_requires_a_source() {
        let parsed = Cli::try_parse_from(["atlas", "budget", "--summary-type", "professional"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from([
            "atlas",
            "budget",
            "--summary-type",
            "quick-reference",
            "--source-words",
            "900",
        ])
        .unwrap();
        match parsed.command {
            Commands::Budget {
                summary_type,
                source_words,
                ..
            } => {
                assert_eq!(summary_type, SummaryType::QuickReference);
                assert_eq!(source_words, Some(900));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let parsed = Cli::try_parse_from(["atlas", "classify", "Try this exercise", "--json", "-vv"])
            .unwrap();
        assert!(parsed.json);
        assert_eq!(parsed.verbose, 2);
    }

    #[test]
    fn test_unknown_summary_type_is_rejected() {
        let parsed = Cli::try_parse_from([
            "atlas",
            "simulate",
            "--summary-type",
            "haiku",
            "--source-words",
            "100",
            "--chunks",
            "chunks.json",
        ]);
        assert!(parsed.is_err());
    }
}
