//! Codec conversion through the external converter CLI.
//!
//! Targets are chosen by file extension. A failed primary conversion is
//! retried at most once with the configured fallback format; the attempt
//! plan is built up front so the retry bound holds by construction.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{AudioError, AudioResult};
use crate::process::{SystemRunner, ToolRunner, ToolSearch};

/// Converter name used in errors and logs.
const CONVERTER_NAME: &str = "VGAudioCli";

/// Environment variable consulted when no explicit converter path is given.
pub const VGAUDIO_PATH_ENV: &str = "VGAUDIO_PATH";

/// Extension that triggers the opus-specific invocation.
const LOPUS_EXTENSION: &str = "lopus";

/// Switch opus streams need the vendor header and constant bit rate.
const OPUS_HEADER_ARGS: [&str; 3] = ["--opusheader", "Namco", "--cbr"];

/// Locates the converter executable.
pub fn find_converter(explicit: Option<&Path>, tools_dir: Option<&Path>) -> AudioResult<PathBuf> {
    ToolSearch {
        name: CONVERTER_NAME,
        explicit,
        tools_dir,
        dir_candidates: &["VGAudio/VGAudioCli", "VGAudioCli"],
        env_var: VGAUDIO_PATH_ENV,
        path_names: &["VGAudioCli", "vgaudio"],
    }
    .run()
}

/// One entry of the conversion attempt plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConversionAttempt<'a> {
    format: &'a str,
    is_fallback: bool,
}

/// Converts input audio into formats the container tool can embed.
#[derive(Debug)]
pub struct AudioConverter<R = SystemRunner> {
    exe: PathBuf,
    format: String,
    fallback_format: String,
    runner: R,
}

impl AudioConverter<SystemRunner> {
    /// Creates a converter with the default runner.
    ///
    /// `format` is the primary target; `fallback_format` is tried once
    /// after a failed primary attempt, or never when empty.
    pub fn new(
        exe: impl Into<PathBuf>,
        format: impl Into<String>,
        fallback_format: impl Into<String>,
    ) -> Self {
        Self::with_runner(exe, format, fallback_format, SystemRunner::new())
    }
}

impl<R: ToolRunner> AudioConverter<R> {
    /// Creates a converter with a custom runner.
    pub fn with_runner(
        exe: impl Into<PathBuf>,
        format: impl Into<String>,
        fallback_format: impl Into<String>,
        runner: R,
    ) -> Self {
        Self {
            exe: exe.into(),
            format: format.into(),
            fallback_format: fallback_format.into(),
            runner,
        }
    }

    /// Path of the wrapped executable.
    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// Primary target format.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Test access to the runner.
    #[cfg(test)]
    pub(crate) fn runner(&self) -> &R {
        &self.runner
    }

    /// Converts `input` to `output`; the target format is implied by the
    /// output extension.
    ///
    /// An existing non-empty output short-circuits to success, so finished
    /// conversions are never redone. Failure is a converter process error
    /// or an output that is missing or empty afterwards.
    pub fn convert_to(&self, input: &Path, output: &Path) -> AudioResult<()> {
        if !input.exists() {
            return Err(AudioError::InputMissing {
                path: input.to_path_buf(),
            });
        }
        if file_has_content(output) {
            debug!(
                "conversion target {} already exists, skipping",
                output.display()
            );
            return Ok(());
        }

        let mut args = vec![
            OsString::from("-i"),
            input.as_os_str().to_owned(),
            OsString::from("-o"),
            output.as_os_str().to_owned(),
        ];
        if has_extension(output, LOPUS_EXTENSION) {
            args.extend(OPUS_HEADER_ARGS.iter().map(OsString::from));
        }

        let run = self.runner.run(&self.exe, &args)?;
        if !run.success() {
            return Err(AudioError::tool_failed(
                CONVERTER_NAME,
                run.exit_code.unwrap_or(-1),
                run.stderr,
            ));
        }
        if !file_has_content(output) {
            return Err(AudioError::conversion_failed(
                input,
                extension_of(output),
            ));
        }
        Ok(())
    }

    /// Converts `input` into `staging_dir`, trying the primary format and
    /// then the fallback. Returns the path of the produced file.
    pub fn convert(&self, input: &Path, staging_dir: &Path) -> AudioResult<PathBuf> {
        if !input.exists() {
            return Err(AudioError::InputMissing {
                path: input.to_path_buf(),
            });
        }

        let mut last_error = None;
        for attempt in self.attempts() {
            if attempt.is_fallback {
                warn!(
                    "retrying conversion of {} with fallback format '{}'",
                    input.display(),
                    attempt.format
                );
            }
            let staged = staging_dir.join(format!("staged.{}", attempt.format));
            match self.convert_to(input, &staged) {
                Ok(()) => return Ok(staged),
                Err(err) => {
                    warn!(
                        "conversion of {} to '{}' failed: {}",
                        input.display(),
                        attempt.format,
                        err
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AudioError::conversion_failed(input, self.format.clone())))
    }

    /// Attempt plan: the primary format, plus the fallback when it is
    /// non-empty and names a different format (case-insensitive).
    fn attempts(&self) -> Vec<ConversionAttempt<'_>> {
        let mut attempts = vec![ConversionAttempt {
            format: &self.format,
            is_fallback: false,
        }];
        if !self.fallback_format.is_empty()
            && !self.fallback_format.eq_ignore_ascii_case(&self.format)
        {
            attempts.push(ConversionAttempt {
                format: &self.fallback_format,
                is_fallback: true,
            });
        }
        attempts
    }
}

/// True when `path` exists and holds at least one byte.
pub(crate) fn file_has_content(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// True when `path`'s extension equals `ext`, case-insensitively.
pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::FakeRunner;
    use crate::process::ToolOutput;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    /// Handler that emulates a converter: writes the `-o` target and exits 0.
    fn writing_handler() -> impl Fn(&crate::process::fake::Invocation) -> AudioResult<ToolOutput> {
        |invocation: &crate::process::fake::Invocation| {
            fs::write(invocation.arg_path(3), b"converted").unwrap();
            Ok(ToolOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        }
    }

    fn touch(path: &Path, contents: &[u8]) {
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_convert_to_passes_opus_args_for_lopus() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.wav");
        touch(&input, b"RIFF");
        let output = dir.path().join("song.lopus");

        let converter =
            AudioConverter::with_runner("VGAudioCli", "lopus", "idsp", FakeRunner::with_handler(writing_handler()));
        converter.convert_to(&input, &output).unwrap();

        let calls = converter.runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec![
                "-i",
                input.to_str().unwrap(),
                "-o",
                output.to_str().unwrap(),
                "--opusheader",
                "Namco",
                "--cbr",
            ]
        );
    }

    #[test]
    fn test_convert_to_omits_opus_args_for_other_targets() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.wav");
        touch(&input, b"RIFF");
        let output = dir.path().join("song.idsp");

        let converter =
            AudioConverter::with_runner("VGAudioCli", "lopus", "idsp", FakeRunner::with_handler(writing_handler()));
        converter.convert_to(&input, &output).unwrap();

        let calls = converter.runner.calls();
        assert_eq!(
            calls[0].args,
            vec!["-i", input.to_str().unwrap(), "-o", output.to_str().unwrap()]
        );
    }

    #[test]
    fn test_convert_to_skips_existing_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.wav");
        touch(&input, b"RIFF");
        let output = dir.path().join("song.lopus");
        touch(&output, b"already converted");

        let converter =
            AudioConverter::with_runner("VGAudioCli", "lopus", "idsp", FakeRunner::succeeding());
        converter.convert_to(&input, &output).unwrap();

        assert_eq!(converter.runner.call_count(), 0);
    }

    #[test]
    fn test_convert_to_missing_input() {
        let dir = tempdir().unwrap();
        let converter =
            AudioConverter::with_runner("VGAudioCli", "lopus", "idsp", FakeRunner::succeeding());
        let err = converter
            .convert_to(&dir.path().join("absent.wav"), &dir.path().join("out.lopus"))
            .unwrap_err();
        assert!(matches!(err, AudioError::InputMissing { .. }));
    }

    #[test]
    fn test_convert_to_empty_output_is_failure() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.wav");
        touch(&input, b"RIFF");

        // Exit 0 but never writes the output file.
        let converter =
            AudioConverter::with_runner("VGAudioCli", "lopus", "idsp", FakeRunner::succeeding());
        let err = converter
            .convert_to(&input, &dir.path().join("song.lopus"))
            .unwrap_err();
        assert!(matches!(err, AudioError::ConversionFailed { .. }));
    }

    #[test]
    fn test_convert_falls_back_exactly_once() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.wav");
        touch(&input, b"RIFF");

        // Primary target fails, fallback target is written.
        let handler = |invocation: &crate::process::fake::Invocation| {
            let target = invocation.arg_path(3);
            if has_extension(&target, "lopus") {
                Ok(ToolOutput {
                    exit_code: Some(1),
                    stderr: "unsupported".to_string(),
                    ..Default::default()
                })
            } else {
                fs::write(&target, b"converted").unwrap();
                Ok(ToolOutput {
                    exit_code: Some(0),
                    ..Default::default()
                })
            }
        };
        let converter =
            AudioConverter::with_runner("VGAudioCli", "lopus", "idsp", FakeRunner::with_handler(handler));

        let staged = converter.convert(&input, dir.path()).unwrap();
        assert_eq!(staged, dir.path().join("staged.idsp"));

        let calls = converter.runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].args[3].ends_with("staged.lopus"));
        assert!(calls[1].args[3].ends_with("staged.idsp"));
    }

    #[test]
    fn test_convert_no_fallback_when_empty() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.wav");
        touch(&input, b"RIFF");

        let converter =
            AudioConverter::with_runner("VGAudioCli", "lopus", "", FakeRunner::failing());
        let err = converter.convert(&input, dir.path()).unwrap_err();

        assert!(matches!(err, AudioError::ToolFailed { .. }));
        assert_eq!(converter.runner.call_count(), 1);
    }

    #[test]
    fn test_convert_no_fallback_when_identical_ignoring_case() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.wav");
        touch(&input, b"RIFF");

        let converter =
            AudioConverter::with_runner("VGAudioCli", "lopus", "LOPUS", FakeRunner::failing());
        let err = converter.convert(&input, dir.path()).unwrap_err();

        assert!(matches!(err, AudioError::ToolFailed { .. }));
        assert_eq!(converter.runner.call_count(), 1);
    }

    #[test]
    fn test_convert_primary_success_skips_fallback() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.wav");
        touch(&input, b"RIFF");

        let converter = AudioConverter::with_runner(
            "VGAudioCli",
            "lopus",
            "idsp",
            FakeRunner::with_handler(writing_handler()),
        );
        let staged = converter.convert(&input, dir.path()).unwrap();

        assert_eq!(staged, dir.path().join("staged.lopus"));
        assert_eq!(converter.runner.call_count(), 1);
    }
}
