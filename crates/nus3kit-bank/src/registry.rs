//! Bank identifier allocation seeded from a reference table.

use std::collections::HashMap;
use std::path::Path;

use log::debug;

use crate::error::{BankError, BankResult};

/// Reference table column holding the bank name.
const NAME_COLUMN: &str = "NUS3BankName";
/// Reference table column holding the base-16 id.
const ID_COLUMN: &str = "ID";

/// Issues unique, strictly increasing bank ids.
///
/// The registry is seeded once from a (name, hex id) table of banks the game
/// already ships, so every newly issued id is above anything known. The
/// counter only moves forward for the lifetime of the registry and is never
/// re-read from disk.
#[derive(Debug, Clone, Default)]
pub struct BankIdRegistry {
    ids: HashMap<String, u16>,
    last_issued: u16,
}

impl BankIdRegistry {
    /// Creates an empty registry with the counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the reference table at `path`.
    ///
    /// A missing file yields an empty registry; malformed id values and
    /// duplicate names are hard errors. Header names are matched with all
    /// whitespace ignored, so `"NUS3Bank Name"` and `"NUS3BankName"` both
    /// resolve.
    pub fn load(path: &Path) -> BankResult<Self> {
        if !path.exists() {
            debug!(
                "reference table {} not found, starting with an empty registry",
                path.display()
            );
            return Ok(Self::new());
        }

        let table_error = |source| BankError::TableRead {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::Reader::from_path(path).map_err(table_error)?;
        let headers = reader.headers().map_err(table_error)?.clone();
        let name_col = column_index(&headers, NAME_COLUMN)?;
        let id_col = column_index(&headers, ID_COLUMN)?;

        let mut ids = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(table_error)?;
            let name = record.get(name_col).unwrap_or("").trim().to_string();
            let raw_id = record.get(id_col).unwrap_or("").trim();
            let id = parse_hex_id(&name, raw_id)?;
            if ids.insert(name.clone(), id).is_some() {
                return Err(BankError::DuplicateBankName { name });
            }
        }

        let last_issued = ids.values().copied().max().unwrap_or(0);
        debug!(
            "loaded {} bank ids from {}, counter seeded at {:#06x}",
            ids.len(),
            path.display(),
            last_issued
        );
        Ok(Self { ids, last_issued })
    }

    /// Issues the next bank id.
    ///
    /// Every returned id is strictly greater than all loaded and previously
    /// issued ids. The counter errors out at the top of the u16 space
    /// instead of wrapping back into ids already handed out.
    pub fn next_id(&mut self) -> BankResult<u16> {
        let next = self
            .last_issued
            .checked_add(1)
            .ok_or(BankError::IdSpaceExhausted)?;
        self.last_issued = next;
        Ok(next)
    }

    /// Returns the id the reference table holds for `name`, if any.
    pub fn id_of(&self, name: &str) -> Option<u16> {
        self.ids.get(name).copied()
    }

    /// Highest id loaded or issued so far.
    pub fn last_issued(&self) -> u16 {
        self.last_issued
    }

    /// Number of entries loaded from the reference table.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when the reference table contributed no entries.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Finds `column` among `headers`, ignoring whitespace inside header names.
fn column_index(headers: &csv::StringRecord, column: &'static str) -> BankResult<usize> {
    headers
        .iter()
        .position(|header| {
            header
                .chars()
                .filter(|c| !c.is_whitespace())
                .eq(column.chars())
        })
        .ok_or(BankError::MissingColumn { column })
}

/// Parses a base-16 id, with or without a leading `0x`.
fn parse_hex_id(name: &str, raw: &str) -> BankResult<u16> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u16::from_str_radix(digits, 16).map_err(|_| BankError::invalid_bank_id(name, raw))
}
