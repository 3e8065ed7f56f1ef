//! Cue-points command implementation
//!
//! Prints the loop and length report for an audio file, human-readable or
//! as machine-readable JSON.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use nus3kit_audio::{
    find_probe, read_cue_points, AudioCuePoints, CueAnomaly, SystemRunner, VgmstreamProbe,
};

use crate::config::Config;

/// Machine-readable shape of one cue-point report.
#[derive(Debug, Serialize)]
struct CuePointRecord<'a> {
    input: &'a str,
    cue_points: AudioCuePoints,
    anomalies: Vec<&'static str>,
}

/// Stable anomaly names for JSON output.
fn anomaly_label(anomaly: &CueAnomaly) -> &'static str {
    match anomaly {
        CueAnomaly::ZeroLength => "zero_length",
        CueAnomaly::NegativeValue => "negative_value",
    }
}

/// Run the cue-points command
///
/// # Arguments
/// * `config` - Loaded tool configuration
/// * `input` - Audio file to probe
/// * `json` - Output machine-readable JSON instead of the human report
/// * `probe` - Metadata probe override
///
/// # Returns
/// Exit code: 0; probe failures are absorbed into an empty report
pub fn run(config: &Config, input: &str, json: bool, probe: Option<&str>) -> Result<ExitCode> {
    let probe_exe = find_probe(probe.map(Path::new), Some(&config.tools_path))
        .context("Failed to locate the vgmstream metadata probe")?;

    let runner = SystemRunner::new().timeout_secs(config.tool_timeout_secs);
    let probe = VgmstreamProbe::with_runner(probe_exe, runner);
    let report = read_cue_points(&probe, Path::new(input));

    if json {
        let record = CuePointRecord {
            input,
            cue_points: report.cue_points,
            anomalies: report.anomalies.iter().map(anomaly_label).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "Cue points for:".cyan().bold(), input);
    let cues = &report.cue_points;
    println!("  {} {}", "Total samples:".dimmed(), cues.total_samples);
    println!("  {} {}", "Loop start sample:".dimmed(), cues.loop_start_sample);
    println!("  {} {}", "Loop end sample:".dimmed(), cues.loop_end_sample);
    println!("  {} {} ms", "Total time:".dimmed(), cues.total_time_ms);
    println!("  {} {} ms", "Loop start:".dimmed(), cues.loop_start_ms);
    println!("  {} {} ms", "Loop end:".dimmed(), cues.loop_end_ms);

    for anomaly in &report.anomalies {
        match anomaly {
            CueAnomaly::ZeroLength => println!(
                "  {} zero total length or loop end; the track may need a manual loop override",
                "!!".yellow()
            ),
            CueAnomaly::NegativeValue => println!(
                "  {} decoder reported negative values, clamped to zero",
                "!!".yellow()
            ),
        }
    }
    if report.is_clean() {
        println!("\n{} Cue points look consistent", "SUCCESS".green().bold());
    }

    Ok(ExitCode::SUCCESS)
}
