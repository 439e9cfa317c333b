use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::codec::{Address, Quantity, BYTES_PER_WORD};

/// Largest register count a single holding register read may request.
pub const MAX_READ_QUANTITY: Quantity = 125;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read register catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed register catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("entry #{index} ({name}): address {value:?} is not an unsigned 16-bit integer")]
    InvalidAddress {
        index: usize,
        name: String,
        value: String,
    },
    #[error("entry #{index}: register name is empty")]
    EmptyName { index: usize },
    #[error("entry #{index} ({name}): length {length} is outside 1..=125")]
    InvalidLength {
        index: usize,
        name: String,
        length: u64,
    },
}

/// A register address as written in the catalog file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawAddress {
    Number(u64),
    Text(String),
}

/// Catalog entry as stored on disk, before validation.
#[derive(Debug, Clone, Deserialize)]
struct RawDescriptor {
    address: RawAddress,
    name: String,
    #[serde(rename = "type")]
    data_type: String,
    length: u64,
    #[serde(default)]
    sf_gain: i32,
    #[serde(default)]
    units: String,
    #[serde(default)]
    note: String,
    #[serde(default)]
    range: String,
    #[serde(default)]
    property: String,
}

/// One monitored register.
///
/// The data type is kept verbatim: unknown types are only reported when the
/// register is decoded, so the rest of the catalog stays usable.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterDescriptor {
    pub address: Address,
    pub name: String,
    pub data_type: String,
    /// Number of 16-bit registers to read.
    pub length: Quantity,
    pub scale_factor: i32,
    pub units: String,
    pub note: String,
    pub valid_range: String,
    pub property: String,
}

impl RegisterDescriptor {
    /// Number of bytes a read of this register returns.
    pub fn byte_len(&self) -> usize {
        self.length as usize * BYTES_PER_WORD
    }
}

/// Ordered, read-only list of register descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterCatalog {
    registers: Vec<RegisterDescriptor>,
}

impl RegisterCatalog {
    /// Load and validate a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse a JSON array of register entries, keeping their order.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let entries: Vec<RawDescriptor> = serde_json::from_str(raw)?;
        let registers = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| validate(index, entry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { registers })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegisterDescriptor> {
        self.registers.iter()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

impl<'a> IntoIterator for &'a RegisterCatalog {
    type Item = &'a RegisterDescriptor;
    type IntoIter = std::slice::Iter<'a, RegisterDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate(index: usize, entry: RawDescriptor) -> Result<RegisterDescriptor, ConfigError> {
    if entry.name.trim().is_empty() {
        return Err(ConfigError::EmptyName { index });
    }

    let address = match &entry.address {
        RawAddress::Number(n) => Address::try_from(*n).ok(),
        RawAddress::Text(text) => parse_address(text),
    }
    .ok_or_else(|| ConfigError::InvalidAddress {
        index,
        name: entry.name.clone(),
        value: match &entry.address {
            RawAddress::Number(n) => n.to_string(),
            RawAddress::Text(text) => text.clone(),
        },
    })?;

    let length = Quantity::try_from(entry.length)
        .ok()
        .filter(|length| (1..=MAX_READ_QUANTITY).contains(length))
        .ok_or_else(|| ConfigError::InvalidLength {
            index,
            name: entry.name.clone(),
            length: entry.length,
        })?;

    Ok(RegisterDescriptor {
        address,
        name: entry.name,
        data_type: entry.data_type,
        length,
        scale_factor: entry.sf_gain,
        units: entry.units,
        note: entry.note,
        valid_range: entry.range,
        property: entry.property,
    })
}

/// Parse a register address with an optional base prefix (`0x`, `0o`, `0b`, or a leading `0` for octal).
pub fn parse_address(text: &str) -> Option<Address> {
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(oct) = text
        .strip_prefix("0o")
        .or_else(|| text.strip_prefix("0O"))
    {
        (oct, 8)
    } else if let Some(bin) = text
        .strip_prefix("0b")
        .or_else(|| text.strip_prefix("0B"))
    {
        (bin, 2)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };

    // `from_str_radix` tolerates a leading sign
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    Address::from_str_radix(digits, radix).ok()
}
