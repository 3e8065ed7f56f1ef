//! Convert command implementation
//!
//! Single-target codec conversion; the format is implied by the output
//! file's extension.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;

use nus3kit_audio::{find_converter, AudioConverter, SystemRunner};

use crate::config::Config;

/// Run the convert command
///
/// # Arguments
/// * `config` - Loaded tool configuration
/// * `input` - Input audio file
/// * `output` - Output path; its extension picks the target format
/// * `converter` - Converter override
///
/// # Returns
/// Exit code: 0 success, 2 conversion failure
pub fn run(config: &Config, input: &str, output: &str, converter: Option<&str>) -> Result<ExitCode> {
    let converter_exe = find_converter(converter.map(Path::new), Some(&config.tools_path))
        .context("Failed to locate the audio converter")?;

    let target = Path::new(output)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    println!("{} {}", "Converting:".cyan().bold(), input);
    println!("{} {}", "Target format:".dimmed(), target);
    println!("{} {}", "Converter:".dimmed(), converter_exe.display());

    let runner = SystemRunner::new().timeout_secs(config.tool_timeout_secs);
    let converter = AudioConverter::with_runner(
        converter_exe,
        config.conversion.format.as_str(),
        config.conversion.fallback_format.as_str(),
        runner,
    );

    match converter.convert_to(Path::new(input), Path::new(output)) {
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
