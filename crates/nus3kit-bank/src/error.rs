//! Error types for the bank backend.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for bank backend operations.
pub type BankResult<T> = Result<T, BankError>;

/// Errors that can occur during bank generation.
#[derive(Debug, Error)]
pub enum BankError {
    /// Bank template file not found.
    #[error("Bank template not found: {path}. Place the base .nus3bank template in the resources directory")]
    TemplateMissing { path: PathBuf },

    /// Template contents do not match the expected layout.
    #[error("Malformed bank template: {reason}")]
    MalformedTemplate { reason: String },

    /// A patch write falls outside the buffer.
    #[error("Patch write of {width} bytes at offset {offset:#x} exceeds buffer length {len:#x}")]
    PatchOutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// A read falls outside the buffer.
    #[error("Read of {width} bytes at offset {offset:#x} exceeds buffer length {len:#x}")]
    ReadOutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// An id value in the reference table is not valid base-16 u16.
    #[error("Invalid bank id '{value}' for entry '{name}': expected a base-16 unsigned 16-bit value")]
    InvalidBankId { name: String, value: String },

    /// The reference table names the same bank twice.
    #[error("Duplicate bank name '{name}' in reference table")]
    DuplicateBankName { name: String },

    /// The reference table is missing a required column.
    #[error("Reference table is missing column '{column}'")]
    MissingColumn { column: &'static str },

    /// Failed to read or parse the reference table.
    #[error("Failed to read reference table {path}: {source}")]
    TableRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The id counter has reached the top of the 16-bit space.
    #[error("Bank id space exhausted: cannot issue an id above {max:#06x}", max = u16::MAX)]
    IdSpaceExhausted,

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BankError {
    /// Creates a new malformed template error.
    pub fn malformed_template(reason: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            reason: reason.into(),
        }
    }

    /// Creates a new invalid bank id error.
    pub fn invalid_bank_id(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidBankId {
            name: name.into(),
            value: value.into(),
        }
    }
}
