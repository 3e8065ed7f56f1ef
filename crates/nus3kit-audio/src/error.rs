//! Error types for the audio backend.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for audio backend operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors that can occur during audio container operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// A required external tool could not be located.
    #[error("{tool} executable not found. Ensure it is installed and in PATH, placed in the tools directory, or pointed to by {env_hint}")]
    ToolNotFound {
        tool: &'static str,
        env_hint: &'static str,
    },

    /// Failed to spawn an external tool process.
    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External tool ran past the configured timeout and was killed.
    #[error("{program} timed out after {timeout_secs} seconds")]
    Timeout { program: String, timeout_secs: u64 },

    /// External tool exited with a non-zero status.
    #[error("{program} exited with status {exit_code}: {stderr}")]
    ToolFailed {
        program: String,
        exit_code: i32,
        stderr: String,
    },

    /// Input audio file does not exist.
    #[error("Input audio file not found: {path}")]
    InputMissing { path: PathBuf },

    /// Converter ran but left no usable output behind.
    #[error("Conversion of {input} to '{format}' produced no usable output")]
    ConversionFailed { input: PathBuf, format: String },

    /// Metadata probe output could not be parsed.
    #[error("Failed to parse metadata probe output: {0}")]
    MetadataParse(#[source] serde_json::Error),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    /// Creates a new spawn failed error.
    pub fn spawn_failed(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            source,
        }
    }

    /// Creates a new tool failed error.
    pub fn tool_failed(program: impl Into<String>, exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::ToolFailed {
            program: program.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Creates a new conversion failed error.
    pub fn conversion_failed(input: impl Into<PathBuf>, format: impl Into<String>) -> Self {
        Self::ConversionFailed {
            input: input.into(),
            format: format.into(),
        }
    }
}
