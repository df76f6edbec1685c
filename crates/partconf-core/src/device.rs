//! Normalized device records.

use std::fmt;

use serde::Serialize;

use crate::literal::{parse_int, yes_no};

/// Upper bound on flash size supported by the programmer (64 KiB).
pub const FLASH_SIZE_LIMIT: u64 = 0x10000;

/// Check whether `value` is a positive power of two.
pub fn is_power_of_two(value: u32) -> bool {
    value.is_power_of_two()
}

/// A 3-byte chip signature, rendered as `0xAABBCC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct DeviceSignature(pub [u8; 3]);

impl DeviceSignature {
    /// Parse a whitespace-separated list of exactly three byte literals.
    ///
    /// On failure returns a short description of what was wrong.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut bytes = Vec::with_capacity(3);
        for token in text.split_whitespace() {
            let value = parse_int(token).ok_or_else(|| format!("unparsable byte '{token}'"))?;
            let byte =
                u8::try_from(value).map_err(|_| format!("byte '{token}' is out of range 0..255"))?;
            bytes.push(byte);
        }
        let bytes: [u8; 3] = bytes
            .try_into()
            .map_err(|found: Vec<u8>| format!("expected 3 bytes, found {}", found.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for DeviceSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "0x{a:02X}{b:02X}{c:02X}")
    }
}

impl From<DeviceSignature> for String {
    fn from(signature: DeviceSignature) -> Self {
        signature.to_string()
    }
}

/// Page geometry of a paged flash memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlashGeometry {
    /// Page size in 16-bit words.
    pub page_size: u32,
    /// Number of pages.
    pub page_count: u32,
}

impl FlashGeometry {
    /// Total flash size in bytes.
    pub fn flash_size(&self) -> u64 {
        self.page_bytes() * u64::from(self.page_count)
    }

    /// Page size in bytes.
    pub fn page_bytes(&self) -> u64 {
        u64::from(self.page_size) * 2
    }

    pub fn exceeds_limit(&self) -> bool {
        self.flash_size() > FLASH_SIZE_LIMIT
    }
}

/// One validated device, ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceConfig {
    /// Description as authored (`desc`).
    pub name: String,
    /// Lowercased description, unique across the output.
    pub key: String,
    pub device_code: DeviceSignature,
    /// `None` for unpaged flash.
    pub geometry: Option<FlashGeometry>,
    /// Line of the `part` header this record came from.
    pub source_line: usize,
}

impl DeviceConfig {
    pub fn is_paged(&self) -> bool {
        self.geometry.is_some()
    }

    /// Output fields in emission order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("device_code", self.device_code.to_string()),
            ("paged", yes_no(self.is_paged()).to_string()),
        ];
        if let Some(geometry) = &self.geometry {
            fields.push(("page_size", geometry.page_size.to_string()));
            fields.push(("page_count", geometry.page_count.to_string()));
        }
        fields
    }
}
