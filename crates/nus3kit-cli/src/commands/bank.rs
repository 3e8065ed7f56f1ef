//! Bank command implementation
//!
//! Generates a .nus3bank from the template with a freshly issued bank id.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;

use nus3kit_bank::{BankIdRegistry, Nus3BankBuilder};

use crate::config::Config;

/// Run the bank command
///
/// # Arguments
/// * `config` - Loaded tool configuration
/// * `tone_id` - Tone the bank is generated for
/// * `volume` - Track volume patched next to the volume signature
/// * `output` - Output .nus3bank path
/// * `template` - Template file override
/// * `ids` - Reference id table override
///
/// # Returns
/// Exit code: 0 success, 2 generation failure
pub fn run(
    config: &Config,
    tone_id: &str,
    volume: f32,
    output: &str,
    template: Option<&str>,
    ids: Option<&str>,
) -> Result<ExitCode> {
    let template_path = template.map(PathBuf::from).unwrap_or_else(|| config.template_path());
    let ids_path = ids.map(PathBuf::from).unwrap_or_else(|| config.ids_path());

    let registry = BankIdRegistry::load(&ids_path)
        .with_context(|| format!("Failed to load id table: {}", ids_path.display()))?;

    println!("{} {}", "Generating bank for:".cyan().bold(), tone_id);
    println!("{} {}", "Template:".dimmed(), template_path.display());
    if registry.is_empty() {
        println!("{} {}", "Reference table:".dimmed(), "empty".dimmed());
    } else {
        println!(
            "{} {} entries, highest id {:#06x}",
            "Reference table:".dimmed(),
            registry.len(),
            registry.last_issued()
        );
    }

    let mut builder = Nus3BankBuilder::new(&template_path, registry);
    match builder.generate(tone_id, volume, Path::new(output)) {
        Ok(generated) => {
            println!("  {} bank id {:#06x}", "->".green(), generated.bank_id);
            println!("  {} volume {}", "->".green(), volume);
            if !generated.volume_applied {
                println!(
                    "  {} volume signature not found in template; volume left unpatched",
                    "!!".yellow()
                );
            }
            println!(
                "\n{} Wrote {}",
                "SUCCESS".green().bold(),
                generated.output_path.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("\n{} {}", "GENERATION FAILED".red().bold(), e);
            Ok(ExitCode::from(2))
        }
    }
}
