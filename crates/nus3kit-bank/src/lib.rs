//! nus3kit Bank Backend
//!
//! This crate generates .nus3bank files for music mods by patching a
//! pristine template shipped with the toolkit. A bank is the game's
//! per-track parameter container; to register a new track the tool only
//! needs to stamp a fresh bank id into the template's name table and write
//! the track volume next to a known byte signature.
//!
//! # Overview
//!
//! - [`registry`] - unique bank-id allocation, seeded from the reference
//!   table of ids the game already uses
//! - [`patch`] - signature scans and bounds-checked little-endian field
//!   writes over an in-memory copy of the template
//! - [`builder`] - composes the two into template-in, bank-file-out
//!   generation
//! - [`error`] - error types
//!
//! The template file itself is never written to. Every generation works on
//! a private copy, so a failed attempt leaves the template byte-identical.
//!
//! # Example
//!
//! ```
//! use nus3kit_bank::patch::{self, Patch};
//!
//! // Stamp an id into the last two bytes of an 8-byte block.
//! let template = vec![0u8; 8];
//! let patched = patch::apply(&template, &[Patch::u16(6, 0x0051)])?;
//! assert_eq!(&patched[6..], &[0x51, 0x00]);
//! assert_eq!(template, vec![0u8; 8]);
//! # Ok::<(), nus3kit_bank::BankError>(())
//! ```

pub mod builder;
pub mod error;
pub mod patch;
pub mod registry;

// Re-export main types at crate root
pub use builder::{GeneratedBank, Nus3BankBuilder, NAME_TABLE_SIZE_OFFSET, VOLUME_SIGNATURE};
pub use error::{BankError, BankResult};
pub use patch::{Patch, PatchValue};
pub use registry::BankIdRegistry;
