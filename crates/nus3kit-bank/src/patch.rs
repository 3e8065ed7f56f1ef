//! Byte-buffer operations for patching binary templates.
//!
//! Everything here is immutable-in, owned-copy-out: [`apply`] never touches
//! the buffer it is given, it returns a patched copy. A generation attempt
//! that fails halfway can therefore never corrupt the template it started
//! from.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{BankError, BankResult};

/// A fixed-width value to encode at a resolved offset.
///
/// All values are written little-endian, matching the container layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatchValue {
    /// Unsigned 16-bit integer.
    U16(u16),
    /// IEEE 754 single-precision float.
    F32(f32),
}

impl PatchValue {
    /// Width of the encoded value in bytes.
    pub fn width(&self) -> usize {
        match self {
            PatchValue::U16(_) => 2,
            PatchValue::F32(_) => 4,
        }
    }
}

/// A single write against a template buffer.
///
/// Offsets are data-dependent (signature scans, header-declared sizes), so
/// patches are resolved per invocation and never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patch {
    /// Absolute byte offset of the field.
    pub offset: usize,
    /// Value to encode at the offset.
    pub value: PatchValue,
}

impl Patch {
    /// A little-endian u16 write at `offset`.
    pub fn u16(offset: usize, value: u16) -> Self {
        Self {
            offset,
            value: PatchValue::U16(value),
        }
    }

    /// A little-endian f32 write at `offset`.
    pub fn f32(offset: usize, value: f32) -> Self {
        Self {
            offset,
            value: PatchValue::F32(value),
        }
    }
}

/// Returns the offset of the first occurrence of `signature` in `buffer`.
///
/// Absence is an expected case for callers, so it is reported as `None`
/// rather than an error. An empty signature never matches.
pub fn locate(buffer: &[u8], signature: &[u8]) -> Option<usize> {
    if signature.is_empty() || signature.len() > buffer.len() {
        return None;
    }
    buffer
        .windows(signature.len())
        .position(|window| window == signature)
}

/// Reads the little-endian u16 at `offset`.
pub fn read_u16_le(buffer: &[u8], offset: usize) -> BankResult<u16> {
    let end = checked_end(offset, 2, buffer.len()).ok_or(BankError::ReadOutOfBounds {
        offset,
        width: 2,
        len: buffer.len(),
    })?;
    Ok(LittleEndian::read_u16(&buffer[offset..end]))
}

/// Applies `patches` to a copy of `buffer` and returns the patched copy.
///
/// Patches are applied in order; each write is bounds-checked before it
/// lands. On error the input buffer is still untouched.
pub fn apply(buffer: &[u8], patches: &[Patch]) -> BankResult<Vec<u8>> {
    let mut patched = buffer.to_vec();
    for patch in patches {
        let width = patch.value.width();
        let end =
            checked_end(patch.offset, width, patched.len()).ok_or(BankError::PatchOutOfBounds {
                offset: patch.offset,
                width,
                len: patched.len(),
            })?;
        match patch.value {
            PatchValue::U16(value) => LittleEndian::write_u16(&mut patched[patch.offset..end], value),
            PatchValue::F32(value) => LittleEndian::write_f32(&mut patched[patch.offset..end], value),
        }
    }
    Ok(patched)
}

/// Exclusive end of a `width`-byte access at `offset`, if it fits in `len`.
fn checked_end(offset: usize, width: usize, len: usize) -> Option<usize> {
    offset.checked_add(width).filter(|&end| end <= len)
}
