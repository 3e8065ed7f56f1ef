//! External tool invocation.
//!
//! Everything in this crate that shells out does so through the narrow
//! [`ToolRunner`] capability, so the container and conversion logic can be
//! exercised in tests with a recording fake instead of real executables.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{AudioError, AudioResult};

/// Default timeout for external tool execution (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Captured outcome of one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Process exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl ToolOutput {
    /// True when the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Minimal capability to run an external tool to completion.
pub trait ToolRunner {
    /// Runs `program` with `args` and returns its captured output.
    ///
    /// Spawn failures and timeouts are `Err`; a non-zero exit is a normal
    /// `Ok` outcome for the caller to judge.
    fn run(&self, program: &Path, args: &[OsString]) -> AudioResult<ToolOutput>;
}

/// Runs tools as real subprocesses with piped output and a kill-on-timeout
/// guard, so a hung tool cannot hang the caller.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SystemRunner {
    /// Creates a runner with the default timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> AudioResult<ToolOutput> {
        debug!("running {} {:?}", program.display(), args);

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|source| AudioError::spawn_failed(program.display().to_string(), source))?;

        wait_with_timeout(child, program, self.timeout)
    }
}

fn wait_with_timeout(
    mut child: Child,
    program: &Path,
    timeout: Duration,
) -> AudioResult<ToolOutput> {
    let start = Instant::now();

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AudioError::Timeout {
                        program: program.display().to_string(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(e) => return Err(AudioError::spawn_failed(program.display().to_string(), e)),
        }
    };

    let mut stdout = String::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_string(&mut stdout);
    }
    let mut stderr = String::new();
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_string(&mut stderr);
    }

    Ok(ToolOutput {
        exit_code: status.code(),
        stdout,
        stderr,
    })
}

/// Ordered search for a tool executable.
///
/// Resolution order: explicit path, candidates under the tools directory,
/// environment variable, PATH lookup. The first hit that exists wins.
pub(crate) struct ToolSearch<'a> {
    /// Tool name for error messages.
    pub name: &'static str,
    /// Explicit path from a flag or config entry.
    pub explicit: Option<&'a Path>,
    /// Tools directory probed with `dir_candidates`.
    pub tools_dir: Option<&'a Path>,
    /// Relative candidates inside the tools directory.
    pub dir_candidates: &'a [&'a str],
    /// Environment variable override.
    pub env_var: &'static str,
    /// Executable names resolved through PATH.
    pub path_names: &'a [&'a str],
}

impl ToolSearch<'_> {
    pub(crate) fn run(&self) -> AudioResult<PathBuf> {
        if let Some(path) = self.explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
        }

        if let Some(dir) = self.tools_dir {
            for candidate in self.dir_candidates {
                let path = dir.join(candidate);
                if path.exists() {
                    return Ok(path);
                }
                if cfg!(windows) {
                    let with_exe = dir.join(format!("{candidate}.exe"));
                    if with_exe.exists() {
                        return Ok(with_exe);
                    }
                }
            }
        }

        if let Ok(path) = std::env::var(self.env_var) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(path);
            }
        }

        for name in self.path_names {
            if let Ok(path) = which::which(name) {
                return Ok(path);
            }
        }

        Err(AudioError::ToolNotFound {
            tool: self.name,
            env_hint: self.env_var,
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Recording [`ToolRunner`] for tests.

    use super::*;
    use std::cell::RefCell;

    /// One recorded invocation, with args flattened to strings.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Invocation {
        pub program: PathBuf,
        pub args: Vec<String>,
    }

    impl Invocation {
        /// Positional argument as a path.
        pub(crate) fn arg_path(&self, index: usize) -> PathBuf {
            PathBuf::from(&self.args[index])
        }
    }

    type Handler = Box<dyn Fn(&Invocation) -> AudioResult<ToolOutput>>;

    /// Records every invocation and answers with a scripted handler.
    pub(crate) struct FakeRunner {
        calls: RefCell<Vec<Invocation>>,
        handler: Handler,
    }

    impl FakeRunner {
        pub(crate) fn with_handler(
            handler: impl Fn(&Invocation) -> AudioResult<ToolOutput> + 'static,
        ) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                handler: Box::new(handler),
            }
        }

        /// Answers every invocation with exit code 0.
        pub(crate) fn succeeding() -> Self {
            Self::with_handler(|_| {
                Ok(ToolOutput {
                    exit_code: Some(0),
                    ..Default::default()
                })
            })
        }

        /// Answers every invocation with exit code 1.
        pub(crate) fn failing() -> Self {
            Self::with_handler(|_| {
                Ok(ToolOutput {
                    exit_code: Some(1),
                    stderr: "scripted failure".to_string(),
                    ..Default::default()
                })
            })
        }

        pub(crate) fn calls(&self) -> Vec<Invocation> {
            self.calls.borrow().clone()
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl ToolRunner for FakeRunner {
        fn run(&self, program: &Path, args: &[OsString]) -> AudioResult<ToolOutput> {
            let invocation = Invocation {
                program: program.to_path_buf(),
                args: args
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect(),
            };
            self.calls.borrow_mut().push(invocation.clone());
            (self.handler)(&invocation)
        }
    }
}
