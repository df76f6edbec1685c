//! `partconf check` — validate without writing output.

use anyhow::{bail, Context, Result};
use partconf_core::{convert_file, Conversion, ConvertError, Severity};

use crate::config::RunSettings;

/// Run the pipeline and print a summary report.
///
/// A JSON report is printed for fatal errors too, so tools can locate the
/// offending line. The run still fails.
pub fn run(settings: &RunSettings, format: Option<&str>) -> Result<()> {
    let format = format.unwrap_or("human");
    if !matches!(format, "human" | "json") {
        bail!("unknown report format: '{format}' (expected human or json)");
    }

    let conversion = match convert_file(&settings.input, &settings.options) {
        Ok(conversion) => conversion,
        Err(err) => {
            if format == "json" {
                let report = error_report(settings, &err);
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            return Err(err).with_context(|| format!("checking {}", settings.input.display()));
        }
    };

    if format == "json" {
        let report = json_report(settings, &conversion);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_human(settings, &conversion);
    }
    Ok(())
}

fn print_human(settings: &RunSettings, conversion: &Conversion) {
    let ignored = conversion
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Info)
        .count();
    println!("Checked {}", settings.input.display());
    println!("  parts:    {}", conversion.parts_found);
    println!("  devices:  {}", conversion.devices.len());
    println!("  skipped:  {}", conversion.skipped());
    println!("  ignored lines: {ignored}");
    for warning in conversion.warnings() {
        println!("  {warning}");
    }
}

fn json_report(settings: &RunSettings, conversion: &Conversion) -> serde_json::Value {
    serde_json::json!({
        "input": settings.input.display().to_string(),
        "parts": conversion.parts_found,
        "devices": conversion.devices.len(),
        "skipped": conversion.skipped(),
        "diagnostics": conversion.diagnostics,
    })
}

fn error_report(settings: &RunSettings, err: &ConvertError) -> serde_json::Value {
    serde_json::json!({
        "input": settings.input.display().to_string(),
        "error": err.to_string(),
        "line": err.line(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;

    fn settings_with(source: &str) -> (tempfile::TempDir, RunSettings) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("avrdude.conf"), source).unwrap();
        let settings = RunSettings::resolve(dir.path(), None, Overrides::default()).unwrap();
        (dir, settings)
    }

    #[test]
    fn json_report_counts() {
        let (_dir, settings) = settings_with(
            "part\n    desc = \"NoSig\";\n;\npart\n    desc = \"X\";\n    signature = 1 2 3;\n    memory \"flash\"\n    ;\n;\n",
        );
        let conversion = convert_file(&settings.input, &settings.options).unwrap();
        let report = json_report(&settings, &conversion);
        assert_eq!(report["parts"], 2);
        assert_eq!(report["devices"], 1);
        assert_eq!(report["skipped"], 1);
        assert_eq!(report["diagnostics"][0]["severity"], "warning");
        assert_eq!(report["diagnostics"][0]["line"], 1);
    }

    #[test]
    fn error_report_locates_fatal_line() {
        let (_dir, settings) = settings_with("part\n    desc = \"X\";\n");
        let err = convert_file(&settings.input, &settings.options).unwrap_err();
        let report = error_report(&settings, &err);
        assert_eq!(report["line"], 1);
        assert!(report["error"].as_str().unwrap().contains("not terminated"));
        assert!(run(&settings, Some("json")).is_err());
    }

    #[test]
    fn error_report_without_line_is_null() {
        let (dir, settings) = settings_with("");
        std::fs::remove_file(dir.path().join("avrdude.conf")).unwrap();
        let err = convert_file(&settings.input, &settings.options).unwrap_err();
        assert!(error_report(&settings, &err)["line"].is_null());
    }

    #[test]
    fn check_does_not_write_output() {
        let (dir, settings) = settings_with(
            "part\n    desc = \"X\";\n    signature = 1 2 3;\n    memory \"flash\"\n    ;\n;\n",
        );
        run(&settings, None).unwrap();
        assert!(!dir.path().join("avrdude.ini").exists());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let (_dir, settings) = settings_with("");
        assert!(run(&settings, Some("yaml")).is_err());
    }

    #[test]
    fn fatal_errors_propagate() {
        let (_dir, settings) = settings_with("part\n");
        let err = run(&settings, None).unwrap_err();
        assert!(format!("{err:#}").contains("not terminated"));
    }
}
