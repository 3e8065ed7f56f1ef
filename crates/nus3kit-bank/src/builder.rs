//! nus3bank generation by patching a pristine template.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{BankError, BankResult};
use crate::patch::{self, Patch};
use crate::registry::BankIdRegistry;

/// Offset of the little-endian u16 block-size field in the bank header.
pub const NAME_TABLE_SIZE_OFFSET: usize = 0x98;

/// Signature preceding the float volume field in the tone parameters.
pub const VOLUME_SIGNATURE: [u8; 4] = [0xE8, 0x22, 0x00, 0x00];

/// Outcome of a successful bank generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedBank {
    /// Id written into the bank's name-table slot.
    pub bank_id: u16,
    /// False when the volume signature was absent and the write skipped.
    pub volume_applied: bool,
    /// Where the bank was written.
    pub output_path: PathBuf,
}

/// Builds new .nus3bank files from a template, one per issued bank id.
///
/// The template is read fresh for every generation and is never written to;
/// all patching happens on a private in-memory copy.
#[derive(Debug)]
pub struct Nus3BankBuilder {
    template_path: PathBuf,
    registry: BankIdRegistry,
}

impl Nus3BankBuilder {
    /// Creates a builder over `template_path`, issuing ids from `registry`.
    pub fn new(template_path: impl Into<PathBuf>, registry: BankIdRegistry) -> Self {
        Self {
            template_path: template_path.into(),
            registry,
        }
    }

    /// Read access to the id registry.
    pub fn registry(&self) -> &BankIdRegistry {
        &self.registry
    }

    /// Generates a bank for `tone_id` at `output_path`.
    ///
    /// Writes the next registry id into the name-table slot resolved via
    /// [`name_slot_offset`] and the volume after the located
    /// [`VOLUME_SIGNATURE`]. A template without the signature still
    /// produces a bank; the skipped volume write is reported on the result
    /// and logged. A missing template aborts before an id is consumed.
    pub fn generate(
        &mut self,
        tone_id: &str,
        volume: f32,
        output_path: &Path,
    ) -> BankResult<GeneratedBank> {
        if !self.template_path.exists() {
            return Err(BankError::TemplateMissing {
                path: self.template_path.clone(),
            });
        }

        debug!(
            "generating nus3bank for tone '{}' at {}",
            tone_id,
            output_path.display()
        );

        let template = fs::read(&self.template_path)?;
        let id_slot = name_slot_offset(&template)?;
        let bank_id = self.registry.next_id()?;

        let mut patches = vec![Patch::u16(id_slot, bank_id)];
        let volume_applied = match patch::locate(&template, &VOLUME_SIGNATURE) {
            Some(at) => {
                patches.push(Patch::f32(at + VOLUME_SIGNATURE.len(), volume));
                true
            }
            None => {
                warn!(
                    "volume signature not found in {}; bank for tone '{}' written without volume",
                    self.template_path.display(),
                    tone_id
                );
                false
            }
        };

        let patched = patch::apply(&template, &patches)?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output_path, &patched)?;

        debug!(
            "wrote bank {:#06x} ({} bytes) to {}",
            bank_id,
            patched.len(),
            output_path.display()
        );

        Ok(GeneratedBank {
            bank_id,
            volume_applied,
            output_path: output_path.to_path_buf(),
        })
    }
}

/// Resolves the name-table id slot from the self-describing block size.
///
/// The u16 at [`NAME_TABLE_SIZE_OFFSET`] declares the byte length of the
/// block that immediately follows it; the bank id occupies the block's
/// final two bytes. Changing the template layout invalidates this
/// arithmetic.
pub fn name_slot_offset(template: &[u8]) -> BankResult<usize> {
    let size = patch::read_u16_le(template, NAME_TABLE_SIZE_OFFSET)? as usize;
    if size < 2 {
        return Err(BankError::malformed_template(format!(
            "block size {size} at {NAME_TABLE_SIZE_OFFSET:#x} cannot hold an id"
        )));
    }
    Ok(NAME_TABLE_SIZE_OFFSET + 2 + size - 2)
}
