//! Error types for the conversion pipeline.

use std::path::PathBuf;

/// Fatal errors that abort a conversion run.
///
/// Every variant that originates from the input text carries the 1-based line
/// number it refers to. Validation errors point at the line that opened the
/// offending `part` section.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Unexpected nesting, a stray terminator, or an unterminated section.
    #[error("line {line}: grammar error: {detail}")]
    Grammar {
        /// Line where the problem was detected.
        line: usize,
        /// Description of the grammar violation.
        detail: String,
    },

    /// A field the device record cannot be built without is absent.
    #[error("line {line}: missing required field '{field}'")]
    MissingRequiredField { line: usize, field: String },

    /// A field expected to hold a decimal or `0x` hexadecimal integer does not.
    #[error("line {line}: invalid numeric literal for '{field}': '{value}'")]
    InvalidNumericLiteral {
        line: usize,
        field: String,
        value: String,
    },

    /// The signature is not exactly three in-range bytes.
    #[error("line {line}: invalid device signature '{value}': {detail}")]
    InvalidDeviceSignature {
        line: usize,
        value: String,
        detail: String,
    },

    /// A boolean field is neither `yes` nor `no`.
    #[error("line {line}: invalid boolean literal for '{field}': '{value}' (expected yes or no)")]
    InvalidBooleanLiteral {
        line: usize,
        field: String,
        value: String,
    },

    /// The source page size is odd and cannot be converted to words.
    #[error("line {line}: flash page size {page_size} is odd")]
    PageSizeNotEven { line: usize, page_size: u32 },

    /// The page size in words is not a power of two.
    #[error("line {line}: flash page size {page_size} words is not a power of 2")]
    PageSizeNotPowerOfTwo { line: usize, page_size: u32 },

    /// Two parts normalize to the same lowercased name.
    #[error("line {line}: duplicate part '{name}' (first defined at line {first_line})")]
    DuplicatePartName {
        line: usize,
        name: String,
        first_line: usize,
    },

    /// Input file not found.
    #[error("input file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// I/O error reading the input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// The source line this error refers to, if it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            ConvertError::Grammar { line, .. }
            | ConvertError::MissingRequiredField { line, .. }
            | ConvertError::InvalidNumericLiteral { line, .. }
            | ConvertError::InvalidDeviceSignature { line, .. }
            | ConvertError::InvalidBooleanLiteral { line, .. }
            | ConvertError::PageSizeNotEven { line, .. }
            | ConvertError::PageSizeNotPowerOfTwo { line, .. }
            | ConvertError::DuplicatePartName { line, .. } => Some(*line),
            ConvertError::NotFound { .. } | ConvertError::Io(_) => None,
        }
    }
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
