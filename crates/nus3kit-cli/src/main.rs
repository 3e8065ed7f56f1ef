//! nus3kit CLI - Command-line interface for nus3bank/nus3audio generation
//!
//! This binary provides commands for generating patched .nus3bank files,
//! building .nus3audio containers, reading cue points, and converting
//! audio between codec formats.

use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::ExitCode;

// Use modules from the library crate
use nus3kit_cli::commands;
use nus3kit_cli::config::Config;

/// nus3kit - Smash Ultimate music container toolkit
#[derive(Parser)]
#[command(name = "nus3kit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the JSON config file (default: ./nus3kit.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a .nus3bank from the template with a freshly issued bank id
    Bank {
        /// Tone id the bank is generated for
        #[arg(short, long)]
        tone_id: String,

        /// Track volume written into the tone parameters
        #[arg(long, allow_hyphen_values = true)]
        volume: f32,

        /// Output .nus3bank path
        #[arg(short, long)]
        output: String,

        /// Template file (default: <resources_path>/template.nus3bank)
        #[arg(long)]
        template: Option<String>,

        /// Reference id table (default: <resources_path>/nus3bank_ids.csv)
        #[arg(long)]
        ids: Option<String>,
    },

    /// Generate a .nus3audio container from an input audio file
    Audio {
        /// Tone id the stream is embedded under
        #[arg(short, long)]
        tone_id: String,

        /// Input audio file (container, encoded stream, or decoder format)
        #[arg(short, long)]
        input: String,

        /// Output .nus3audio path
        #[arg(short, long)]
        output: String,

        /// Container tool executable (default: discovered)
        #[arg(long)]
        tool: Option<String>,

        /// Converter executable (default: discovered)
        #[arg(long)]
        converter: Option<String>,
    },

    /// Read loop and length cue points from an audio file
    CuePoints {
        /// Audio file to probe
        #[arg(short, long)]
        input: String,

        /// Output machine-readable JSON instead of the human report
        #[arg(long)]
        json: bool,

        /// Metadata probe executable (default: discovered)
        #[arg(long)]
        probe: Option<String>,
    },

    /// Convert an audio file; the target format follows the output extension
    Convert {
        /// Input audio file
        #[arg(short, long)]
        input: String,

        /// Output path; its extension picks the target format
        #[arg(short, long)]
        output: String,

        /// Converter executable (default: discovered)
        #[arg(long)]
        converter: Option<String>,
    },
}

/// Default log filter for a `-v` count; `RUST_LOG` still overrides it.
fn log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbosity: u8) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level(verbosity)),
    )
    .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::load(cli.config.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", colored::Colorize::red("error"), e);
            return ExitCode::from(1);
        }
    };

    let result = match cli.command {
        Commands::Bank {
            tone_id,
            volume,
            output,
            template,
            ids,
        } => commands::bank::run(
            &config,
            &tone_id,
            volume,
            &output,
            template.as_deref(),
            ids.as_deref(),
        ),
        Commands::Audio {
            tone_id,
            input,
            output,
            tool,
            converter,
        } => commands::audio::run(
            &config,
            &tone_id,
            &input,
            &output,
            tool.as_deref(),
            converter.as_deref(),
        ),
        Commands::CuePoints { input, json, probe } => {
            commands::cue_points::run(&config, &input, json, probe.as_deref())
        }
        Commands::Convert {
            input,
            output,
            converter,
        } => commands::convert::run(&config, &input, &output, converter.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
