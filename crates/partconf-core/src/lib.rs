//! Device-description parsing and normalization for `partconf`.
//!
//! Converts the hierarchical `avrdude.conf` part grammar into flat per-device
//! configuration blocks. The pipeline runs in four stages, each a pure
//! function from one owned value to the next:
//!
//! - **Classification:** physical line → [`ClassifiedLine`]
//! - **Structure:** classified lines → [`RawPart`] records
//! - **Normalization:** raw parts → validated [`DeviceConfig`] records
//! - **Serialization:** device records → output text
//!
//! [`convert()`] wires the stages together behind a single `Result`.

pub mod classify;
pub mod convert;
pub mod device;
pub mod diagnostic;
pub mod error;
pub mod literal;
pub mod normalize;
pub mod parse;
pub mod serialize;

pub use classify::{classify_line, classify_source, expand_tabs, ClassifiedLine, LineKind};
pub use convert::{convert, convert_file, Conversion, ConvertOptions};
pub use device::{is_power_of_two, DeviceConfig, DeviceSignature, FlashGeometry};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::{ConvertError, Result};
pub use normalize::{normalize, FieldPolicy, NormalizeOptions, PagedDefault};
pub use parse::{parse_parts, RawPart, StructuralParser};
pub use serialize::{render, render_device};
