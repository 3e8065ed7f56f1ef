//! Cue-point extraction through an external metadata probe.
//!
//! Loop points drive in-game playback, so they are read from the decoded
//! stream up front and registered alongside the generated containers. The
//! probe is best-effort: a track that cannot be read still registers, it
//! just carries empty cue points and a warning.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::error::{AudioError, AudioResult};
use crate::process::{SystemRunner, ToolRunner, ToolSearch};

/// Probe name used in errors and logs.
const PROBE_NAME: &str = "vgmstream-cli";

/// Environment variable consulted when no explicit probe path is given.
pub const VGMSTREAM_PATH_ENV: &str = "VGMSTREAM_PATH";

/// Locates the metadata probe executable.
pub fn find_probe(explicit: Option<&Path>, tools_dir: Option<&Path>) -> AudioResult<PathBuf> {
    ToolSearch {
        name: PROBE_NAME,
        explicit,
        tools_dir,
        dir_candidates: &["vgmstream/vgmstream-cli", "vgmstream-cli"],
        env_var: VGMSTREAM_PATH_ENV,
        path_names: &["vgmstream-cli"],
    }
    .run()
}

/// Loop and length metadata for one audio stream, clamped to the unsigned
/// fields the game expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCuePoints {
    pub total_samples: u32,
    pub loop_start_sample: u32,
    pub loop_end_sample: u32,
    pub total_time_ms: u32,
    pub loop_start_ms: u32,
    pub loop_end_ms: u32,
}

/// Values as reported by the decoder, before clamping.
///
/// Kept signed so negative reports can be flagged instead of disappearing
/// in an unsigned cast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCuePoints {
    pub total_samples: i64,
    pub loop_start_sample: i64,
    pub loop_end_sample: i64,
    pub total_time_ms: i64,
    pub loop_start_ms: i64,
    pub loop_end_ms: i64,
}

/// Anomaly classes raised by cue-point validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueAnomaly {
    /// Total length or loop end is zero; the track likely needs a manual
    /// loop override to loop in game.
    ZeroLength,
    /// The decoder reported a negative value, which decoders never should.
    NegativeValue,
}

/// Cue points plus the anomalies flagged while reading them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CuePointReport {
    pub cue_points: AudioCuePoints,
    pub anomalies: Vec<CueAnomaly>,
}

impl CuePointReport {
    /// True when no anomaly was flagged.
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Capability to read raw cue points out of an audio file.
pub trait MetadataSource {
    fn probe(&self, input: &Path) -> AudioResult<RawCuePoints>;
}

/// Classifies `raw` against the validation rules.
pub fn classify(raw: &RawCuePoints) -> Vec<CueAnomaly> {
    let mut anomalies = Vec::new();
    if raw.total_samples == 0 || raw.loop_end_sample == 0 {
        anomalies.push(CueAnomaly::ZeroLength);
    }
    let values = [
        raw.total_samples,
        raw.loop_start_sample,
        raw.loop_end_sample,
        raw.total_time_ms,
        raw.loop_start_ms,
        raw.loop_end_ms,
    ];
    if values.iter().any(|&v| v < 0) {
        anomalies.push(CueAnomaly::NegativeValue);
    }
    anomalies
}

/// Reads cue points from `input` via `source`, absorbing probe failures.
///
/// A failed probe yields the empty snapshot rather than an error; anomalies
/// are logged per class and returned on the report. Negative raw values
/// clamp to zero in the snapshot after being flagged.
pub fn read_cue_points<S: MetadataSource>(source: &S, input: &Path) -> CuePointReport {
    let raw = match source.probe(input) {
        Ok(raw) => raw,
        Err(err) => {
            error!("cue point probe of {} failed: {}", input.display(), err);
            RawCuePoints::default()
        }
    };

    let anomalies = classify(&raw);
    for anomaly in &anomalies {
        match anomaly {
            CueAnomaly::ZeroLength => warn!(
                "{}: total samples or loop end is zero; the track likely needs a manual loop override",
                input.display()
            ),
            CueAnomaly::NegativeValue => warn!(
                "{}: decoder reported negative cue values: {:?}",
                input.display(),
                raw
            ),
        }
    }

    CuePointReport {
        cue_points: clamp(&raw),
        anomalies,
    }
}

fn clamp(raw: &RawCuePoints) -> AudioCuePoints {
    let squeeze = |v: i64| v.clamp(0, i64::from(u32::MAX)) as u32;
    AudioCuePoints {
        total_samples: squeeze(raw.total_samples),
        loop_start_sample: squeeze(raw.loop_start_sample),
        loop_end_sample: squeeze(raw.loop_end_sample),
        total_time_ms: squeeze(raw.total_time_ms),
        loop_start_ms: squeeze(raw.loop_start_ms),
        loop_end_ms: squeeze(raw.loop_end_ms),
    }
}

/// Reads cue points with the vgmstream CLI's JSON metadata dump.
#[derive(Debug)]
pub struct VgmstreamProbe<R = SystemRunner> {
    exe: PathBuf,
    runner: R,
}

impl VgmstreamProbe<SystemRunner> {
    /// Creates a probe wrapper for `exe` with the default runner.
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            runner: SystemRunner::new(),
        }
    }
}

impl<R: ToolRunner> VgmstreamProbe<R> {
    /// Creates a probe wrapper with a custom runner.
    pub fn with_runner(exe: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            exe: exe.into(),
            runner,
        }
    }

    /// Path of the wrapped executable.
    pub fn exe(&self) -> &Path {
        &self.exe
    }
}

impl<R: ToolRunner> MetadataSource for VgmstreamProbe<R> {
    fn probe(&self, input: &Path) -> AudioResult<RawCuePoints> {
        if !input.exists() {
            return Err(AudioError::InputMissing {
                path: input.to_path_buf(),
            });
        }

        let args = vec![
            OsString::from("-m"),
            OsString::from("-I"),
            input.as_os_str().to_owned(),
        ];
        let run = self.runner.run(&self.exe, &args)?;
        if !run.success() {
            return Err(AudioError::tool_failed(
                PROBE_NAME,
                run.exit_code.unwrap_or(-1),
                run.stderr,
            ));
        }

        let document: ProbeDocument =
            serde_json::from_str(&run.stdout).map_err(AudioError::MetadataParse)?;
        Ok(document.into_raw())
    }
}

/// vgmstream `-I` metadata document, reduced to the fields used here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProbeDocument {
    sample_rate: i64,
    number_of_samples: i64,
    #[serde(default)]
    looping_info: Option<LoopingInfo>,
}

#[derive(Debug, Deserialize)]
struct LoopingInfo {
    start: i64,
    end: i64,
}

impl ProbeDocument {
    /// Derives the millisecond fields from sample counts and sample rate.
    /// A non-looping stream reports zero loop points.
    fn into_raw(self) -> RawCuePoints {
        let (loop_start, loop_end) = match &self.looping_info {
            Some(info) => (info.start, info.end),
            None => (0, 0),
        };
        RawCuePoints {
            total_samples: self.number_of_samples,
            loop_start_sample: loop_start,
            loop_end_sample: loop_end,
            total_time_ms: samples_to_ms(self.number_of_samples, self.sample_rate),
            loop_start_ms: samples_to_ms(loop_start, self.sample_rate),
            loop_end_ms: samples_to_ms(loop_end, self.sample_rate),
        }
    }
}

fn samples_to_ms(samples: i64, sample_rate: i64) -> i64 {
    if sample_rate <= 0 {
        return 0;
    }
    samples.saturating_mul(1000) / sample_rate
}
