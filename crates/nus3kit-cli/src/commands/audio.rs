//! Audio command implementation
//!
//! Generates a .nus3audio container from an input audio file, converting
//! decoder-only formats first.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use log::debug;

use nus3kit_audio::{
    find_converter, find_nus3audio, AudioConverter, Nus3AudioBuilder, Nus3AudioTool, SystemRunner,
};

use crate::config::Config;

/// Run the audio command
///
/// # Arguments
/// * `config` - Loaded tool configuration
/// * `tone_id` - Tone name the stream is embedded under
/// * `input` - Input audio file (container, encoded stream, or decoder format)
/// * `output` - Output .nus3audio path
/// * `tool` - Container tool override
/// * `converter` - Converter override
///
/// # Returns
/// Exit code: 0 success, 2 generation failure
pub fn run(
    config: &Config,
    tone_id: &str,
    input: &str,
    output: &str,
    tool: Option<&str>,
    converter: Option<&str>,
) -> Result<ExitCode> {
    let tool_exe = find_nus3audio(tool.map(Path::new), Some(&config.tools_path))
        .context("Failed to locate the nus3audio container tool")?;

    // Inputs that are containers or already encoded never touch the
    // converter, so a missing converter only fails once a conversion is
    // actually attempted.
    let converter_exe = match find_converter(converter.map(Path::new), Some(&config.tools_path)) {
        Ok(exe) => exe,
        Err(e) => {
            debug!("converter not located ({e}); deferring to first use");
            config.tools_path.join("VGAudioCli")
        }
    };

    println!("{} {}", "Generating audio for:".cyan().bold(), tone_id);
    println!("{} {}", "Input:".dimmed(), input);
    println!("{} {}", "Container tool:".dimmed(), tool_exe.display());

    let runner = SystemRunner::new().timeout_secs(config.tool_timeout_secs);
    let tool = Nus3AudioTool::with_runner(tool_exe, runner.clone());
    let converter = AudioConverter::with_runner(
        converter_exe,
        config.conversion.format.as_str(),
        config.conversion.fallback_format.as_str(),
        runner,
    );
    let builder = Nus3AudioBuilder::new(tool, converter, config.temp_dir())
        .conversion_extensions(config.conversion.extensions.clone());

    match builder.generate(tone_id, Path::new(input), Path::new(output)) {
        Ok(()) => {
            println!("\n{} Wrote {}", "SUCCESS".green().bold(), output);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("\n{} {}", "GENERATION FAILED".red().bold(), e);
            Ok(ExitCode::from(2))
        }
    }
}
