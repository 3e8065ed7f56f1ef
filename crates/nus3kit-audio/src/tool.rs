//! Wrapper around the external nus3audio container tool.
//!
//! The tool is a black box: it is invoked once to initialize an empty
//! container and once to embed a stream under a tone name. Outcomes are
//! judged by exit status and the file it leaves behind, no output is
//! parsed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{AudioError, AudioResult};
use crate::process::{SystemRunner, ToolRunner, ToolSearch};

/// Tool name used in errors and logs.
const TOOL_NAME: &str = "nus3audio";

/// Environment variable consulted when no explicit tool path is given.
pub const NUS3AUDIO_PATH_ENV: &str = "NUS3AUDIO_PATH";

/// Locates the nus3audio executable.
///
/// Search order: `explicit`, the tools directory (nested `nus3audio/` layout
/// or flat), the `NUS3AUDIO_PATH` environment variable, then PATH.
pub fn find_nus3audio(explicit: Option<&Path>, tools_dir: Option<&Path>) -> AudioResult<PathBuf> {
    ToolSearch {
        name: TOOL_NAME,
        explicit,
        tools_dir,
        dir_candidates: &["nus3audio/nus3audio", "nus3audio"],
        env_var: NUS3AUDIO_PATH_ENV,
        path_names: &["nus3audio"],
    }
    .run()
}

/// Invokes the nus3audio container tool.
#[derive(Debug)]
pub struct Nus3AudioTool<R = SystemRunner> {
    exe: PathBuf,
    runner: R,
}

impl Nus3AudioTool<SystemRunner> {
    /// Creates a tool wrapper for `exe` with the default runner.
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            runner: SystemRunner::new(),
        }
    }
}

impl<R: ToolRunner> Nus3AudioTool<R> {
    /// Creates a tool wrapper with a custom runner.
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

    /// Test access to the runner.
    #[cfg(test)]
    pub(crate) fn runner(&self) -> &R {
        &self.runner
    }

    /// Errors unless the wrapped executable exists.
    pub fn ensure_available(&self) -> AudioResult<()> {
        if self.exe.exists() {
            Ok(())
        } else {
            Err(AudioError::ToolNotFound {
                tool: TOOL_NAME,
                env_hint: NUS3AUDIO_PATH_ENV,
            })
        }
    }

    /// Initializes an empty container at `output`.
    pub fn new_container(&self, output: &Path) -> AudioResult<()> {
        let args = vec![
            OsString::from("-n"),
            OsString::from("-w"),
            output.as_os_str().to_owned(),
        ];
        self.invoke(&args)
    }

    /// Embeds `input` under `tone_id` in the container at `output`.
    pub fn append(&self, tone_id: &str, input: &Path, output: &Path) -> AudioResult<()> {
        let args = vec![
            OsString::from("-A"),
            OsString::from(tone_id),
            input.as_os_str().to_owned(),
            OsString::from("-w"),
            output.as_os_str().to_owned(),
        ];
        self.invoke(&args)
    }

    fn invoke(&self, args: &[OsString]) -> AudioResult<()> {
        let output = self.runner.run(&self.exe, args)?;
        if !output.success() {
            return Err(AudioError::tool_failed(
                TOOL_NAME,
                output.exit_code.unwrap_or(-1),
                output.stderr,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::FakeRunner;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_container_args() {
        let runner = FakeRunner::succeeding();
        let tool = Nus3AudioTool::with_runner("tools/nus3audio", runner);
        tool.new_container(Path::new("out/bgm.nus3audio")).unwrap();

        let calls = tool.runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, PathBuf::from("tools/nus3audio"));
        assert_eq!(calls[0].args, vec!["-n", "-w", "out/bgm.nus3audio"]);
    }

    #[test]
    fn test_append_args() {
        let runner = FakeRunner::succeeding();
        let tool = Nus3AudioTool::with_runner("tools/nus3audio", runner);
        tool.append(
            "bgm_new_song",
            Path::new("staged.lopus"),
            Path::new("out/bgm.nus3audio"),
        )
        .unwrap();

        let calls = tool.runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec!["-A", "bgm_new_song", "staged.lopus", "-w", "out/bgm.nus3audio"]
        );
    }

    #[test]
    fn test_nonzero_exit_becomes_tool_failed() {
        let runner = FakeRunner::failing();
        let tool = Nus3AudioTool::with_runner("tools/nus3audio", runner);
        let err = tool.new_container(Path::new("out.nus3audio")).unwrap_err();
        assert!(matches!(
            err,
            AudioError::ToolFailed { exit_code: 1, .. }
        ));
    }

    #[test]
    fn test_ensure_available() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("nus3audio");
        std::fs::write(&exe, b"").unwrap();

        assert!(Nus3AudioTool::new(&exe).ensure_available().is_ok());
        let missing = Nus3AudioTool::new(dir.path().join("absent"));
        assert!(matches!(
            missing.ensure_available().unwrap_err(),
            AudioError::ToolNotFound { .. }
        ));
    }
}
