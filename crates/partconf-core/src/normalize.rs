//! Validation and normalization of raw parts into device records.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::device::{
    is_power_of_two, DeviceConfig, DeviceSignature, FlashGeometry, FLASH_SIZE_LIMIT,
};
use crate::diagnostic::Diagnostics;
use crate::error::{ConvertError, Result};
use crate::literal::{parse_int, parse_yes_no};
use crate::parse::{Params, RawPart};

/// Memory block that carries the program geometry.
pub const FLASH_BLOCK: &str = "flash";

/// Default name of the flash field holding the number of pages.
pub const DEFAULT_PAGE_COUNT_FIELD: &str = "num_pages";

/// What to do with a part that lacks `desc` or `signature`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldPolicy {
    /// Abort the run.
    Strict,
    /// Skip the part with a warning.
    #[default]
    Lenient,
}

/// How to treat a flash block that has no `paged` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PagedDefault {
    /// Treat as unpaged and omit geometry.
    #[default]
    Unpaged,
    /// Treat as paged and read geometry unconditionally.
    Paged,
    /// Reject the part.
    Required,
}

impl FromStr for PagedDefault {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unpaged" => Ok(PagedDefault::Unpaged),
            "paged" => Ok(PagedDefault::Paged),
            "required" => Ok(PagedDefault::Required),
            other => Err(format!(
                "unknown paged default '{other}' (expected unpaged, paged, or required)"
            )),
        }
    }
}

impl fmt::Display for PagedDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagedDefault::Unpaged => write!(f, "unpaged"),
            PagedDefault::Paged => write!(f, "paged"),
            PagedDefault::Required => write!(f, "required"),
        }
    }
}

/// Normalization settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub field_policy: FieldPolicy,
    pub paged_default: PagedDefault,
    /// Flash field read as the page count.
    pub page_count_field: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            field_policy: FieldPolicy::default(),
            paged_default: PagedDefault::default(),
            page_count_field: DEFAULT_PAGE_COUNT_FIELD.to_string(),
        }
    }
}

/// Validate every part in order, producing device records.
///
/// Parts missing `desc`/`signature` are skipped under [`FieldPolicy::Lenient`];
/// every other validation failure aborts the whole run.
pub fn normalize(
    parts: Vec<RawPart>,
    options: &NormalizeOptions,
    diags: &mut Diagnostics,
) -> Result<Vec<DeviceConfig>> {
    let mut devices = Vec::with_capacity(parts.len());
    let mut seen: HashMap<String, usize> = HashMap::new();

    for part in parts {
        let Some(device) = normalize_part(&part, options, diags)? else {
            continue;
        };
        if let Some(&first_line) = seen.get(&device.key) {
            return Err(ConvertError::DuplicatePartName {
                line: part.start_line,
                name: device.key,
                first_line,
            });
        }
        seen.insert(device.key.clone(), part.start_line);
        devices.push(device);
    }
    Ok(devices)
}

/// Validate a single part. `Ok(None)` means skipped under the lenient policy.
fn normalize_part(
    part: &RawPart,
    options: &NormalizeOptions,
    diags: &mut Diagnostics,
) -> Result<Option<DeviceConfig>> {
    let line = part.start_line;

    let (desc, signature) = match (part.param("desc"), part.param("signature")) {
        (Some(desc), Some(signature)) => (desc, signature),
        (desc, _) => {
            let field = if desc.is_none() { "desc" } else { "signature" };
            match options.field_policy {
                FieldPolicy::Strict => {
                    return Err(ConvertError::MissingRequiredField {
                        line,
                        field: field.into(),
                    })
                }
                FieldPolicy::Lenient => {
                    diags.warn(
                        line,
                        format!("part skipped: missing required field '{field}'"),
                    );
                    return Ok(None);
                }
            }
        }
    };

    let device_code = DeviceSignature::parse(signature).map_err(|detail| {
        ConvertError::InvalidDeviceSignature {
            line,
            value: signature.to_string(),
            detail,
        }
    })?;

    let flash = part
        .memory_block(FLASH_BLOCK)
        .ok_or_else(|| ConvertError::MissingRequiredField {
            line,
            field: format!("memory \"{FLASH_BLOCK}\""),
        })?;

    let paged = match flash.get("paged") {
        Some(value) => parse_yes_no(value).ok_or_else(|| ConvertError::InvalidBooleanLiteral {
            line,
            field: "paged".into(),
            value: value.clone(),
        })?,
        None => match options.paged_default {
            PagedDefault::Unpaged => false,
            PagedDefault::Paged => true,
            PagedDefault::Required => {
                return Err(ConvertError::MissingRequiredField {
                    line,
                    field: "flash.paged".into(),
                })
            }
        },
    };

    let geometry = if paged {
        let geometry = flash_geometry(flash, &options.page_count_field, line)?;
        if geometry.exceeds_limit() {
            let size = geometry.flash_size();
            diags.warn(
                line,
                format!(
                    "flash size of '{desc}' is {size} bytes ({}K), exceeds the {}K bound",
                    size.div_ceil(1024),
                    FLASH_SIZE_LIMIT / 1024
                ),
            );
        }
        Some(geometry)
    } else {
        None
    };

    tracing::debug!(line, name = desc, code = %device_code, paged, "part normalized");
    Ok(Some(DeviceConfig {
        name: desc.to_string(),
        key: desc.to_lowercase(),
        device_code,
        geometry,
        source_line: line,
    }))
}

/// Read and validate page size and page count from a paged flash block.
fn flash_geometry(flash: &Params, page_count_field: &str, line: usize) -> Result<FlashGeometry> {
    let page_bytes = flash_u32(flash, "page_size", line)?;
    let page_count = flash_u32(flash, page_count_field, line)?;

    if page_bytes % 2 != 0 {
        return Err(ConvertError::PageSizeNotEven {
            line,
            page_size: page_bytes,
        });
    }
    let page_size = page_bytes / 2;
    if !is_power_of_two(page_size) {
        return Err(ConvertError::PageSizeNotPowerOfTwo { line, page_size });
    }

    Ok(FlashGeometry {
        page_size,
        page_count,
    })
}

fn flash_u32(flash: &Params, field: &str, line: usize) -> Result<u32> {
    let value = flash
        .get(field)
        .ok_or_else(|| ConvertError::MissingRequiredField {
            line,
            field: format!("flash.{field}"),
        })?;
    parse_int(value)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ConvertError::InvalidNumericLiteral {
            line,
            field: format!("flash.{field}"),
            value: value.clone(),
        })
}
