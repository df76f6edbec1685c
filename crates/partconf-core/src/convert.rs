//! End-to-end conversion from description text to output text.

use std::path::Path;

use crate::classify::classify_source;
use crate::device::DeviceConfig;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::{ConvertError, Result};
use crate::normalize::{normalize, NormalizeOptions};
use crate::parse::parse_parts;
use crate::serialize::render;

/// Default tab stop width of the description dialect.
pub const DEFAULT_TAB_WIDTH: usize = 8;

/// Settings for one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub tab_width: usize,
    pub normalize: NormalizeOptions,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            normalize: NormalizeOptions::default(),
        }
    }
}

/// The result of a successful run.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Accepted devices, in source order.
    pub devices: Vec<DeviceConfig>,
    /// Number of `part` sections found, including skipped ones.
    pub parts_found: usize,
    /// Warnings and informational findings, in the order they were raised.
    pub diagnostics: Vec<Diagnostic>,
    /// Rendered output text.
    pub output: String,
}

impl Conversion {
    pub fn skipped(&self) -> usize {
        self.parts_found - self.devices.len()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == crate::diagnostic::Severity::Warning)
    }
}

/// Run the whole pipeline over `source`.
///
/// Either every stage succeeds and the rendered output is returned, or the
/// first fatal error is; there is no partial result.
pub fn convert(source: &str, options: &ConvertOptions) -> Result<Conversion> {
    let mut diags = Diagnostics::new();
    let lines = classify_source(source, options.tab_width);
    let parts = parse_parts(lines, &mut diags)?;
    let parts_found = parts.len();
    let devices = normalize(parts, &options.normalize, &mut diags)?;
    let output = render(&devices);
    tracing::info!(
        parts = parts_found,
        devices = devices.len(),
        warnings = diags.warning_count(),
        "conversion finished"
    );
    Ok(Conversion {
        devices,
        parts_found,
        diagnostics: diags.into_vec(),
        output,
    })
}

/// Read `path` and convert its contents.
pub fn convert_file(path: &Path, options: &ConvertOptions) -> Result<Conversion> {
    if !path.exists() {
        return Err(ConvertError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let source = std::fs::read_to_string(path)?;
    convert(&source, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::FieldPolicy;

    const MINIMAL: &str = r#"part
    desc = "Test Chip";
    signature = "30 151 2";
    memory "flash"
        paged = "yes";
        page_size = "128";
        num_pages = "10";
    ;
;
"#;

    #[test]
    fn minimal_end_to_end() {
        let conversion = convert(MINIMAL, &ConvertOptions::default()).unwrap();
        assert_eq!(
            conversion.output,
            "\n[test chip]\n\nname = Test Chip\ndevice_code = 0x1E9702\npaged = yes\npage_size = 64\npage_count = 10\n"
        );
        assert_eq!(conversion.devices.len(), 1);
        assert_eq!(conversion.skipped(), 0);
        assert!(conversion.diagnostics.is_empty());
    }

    const AVRDUDE_EXCERPT: &str = "
#------------------------------------------------------------
# ATmega8
#------------------------------------------------------------

programmer
\tid    = \"avrisp\";
\tdesc  = \"Atmel AVR ISP\";
;

part
    id\t\t= \"m8\";
    desc\t\t= \"ATmega8\";
    signature\t= 0x1e 0x93 0x07;
    pagel\t= 0xd7;

    memory \"eeprom\"
        size\t= 512;
        page_size = 4;
        read\t= \"  1   0   1   0      0   0   0   0\",
              \"  x   x   x   x      x   x   x   x\";
    ;

    memory \"flash\"
        paged\t= yes;
        size\t= 8192;
        page_size\t= 64;
        num_pages\t= 128;
        blocksize\t= 64;
    ;
;

part
    id\t\t= \".common\";
;

part
    id = \"m128\";
    desc = \"ATmega128\";
    signature = 0x1e 0x97 0x02;
    memory \"flash\"
        paged = yes;
        page_size = 256;
        num_pages = 512;
    ;
;
";

    #[test]
    fn realistic_excerpt() {
        let conversion = convert(AVRDUDE_EXCERPT, &ConvertOptions::default()).unwrap();
        assert_eq!(conversion.parts_found, 3);
        assert_eq!(conversion.skipped(), 1);
        let keys: Vec<_> = conversion.devices.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, ["atmega8", "atmega128"]);

        let m8 = conversion.devices[0].geometry.unwrap();
        assert_eq!((m8.page_size, m8.page_count), (32, 128));
        assert!(conversion
            .output
            .contains("[atmega8]\n\nname = ATmega8\ndevice_code = 0x1E9307\n"));

        let warnings: Vec<_> = conversion.warnings().collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].message.contains("skipped"));
        assert!(warnings[1].message.contains("ATmega128"));
        assert!(conversion.output.contains("[atmega128]"));
    }

    #[test]
    fn strict_policy_rejects_template_parts() {
        let options = ConvertOptions {
            normalize: NormalizeOptions {
                field_policy: FieldPolicy::Strict,
                ..NormalizeOptions::default()
            },
            ..ConvertOptions::default()
        };
        let err = convert(AVRDUDE_EXCERPT, &options).unwrap_err();
        assert!(matches!(err, ConvertError::MissingRequiredField { .. }));
    }

    #[test]
    fn grammar_error_discards_everything() {
        let source = format!("{MINIMAL}part\n    desc = \"Unclosed\";\n");
        let err = convert(&source, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Grammar { line: 10, .. }));
    }

    #[test]
    fn conversion_is_repeatable() {
        let a = convert(AVRDUDE_EXCERPT, &ConvertOptions::default()).unwrap();
        let b = convert(AVRDUDE_EXCERPT, &ConvertOptions::default()).unwrap();
        assert_eq!(a.output, b.output);
        assert_eq!(render(&a.devices), a.output);
    }

    #[test]
    fn convert_file_not_found() {
        let options = ConvertOptions::default();
        let result = convert_file(Path::new("/nonexistent/avrdude.conf"), &options);
        assert!(matches!(result.unwrap_err(), ConvertError::NotFound { .. }));
    }

    #[test]
    fn convert_file_reads_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avrdude.conf");
        std::fs::write(&path, MINIMAL).unwrap();
        let conversion = convert_file(&path, &ConvertOptions::default()).unwrap();
        assert_eq!(conversion.devices[0].key, "test chip");
    }
}
