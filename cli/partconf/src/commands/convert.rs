//! `partconf convert` — run the pipeline and write the device file.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use partconf_core::convert_file;

use crate::config::RunSettings;

/// Convert the configured input and replace the output file.
///
/// Nothing is written unless the whole conversion succeeds.
pub fn run(settings: &RunSettings) -> Result<()> {
    settings.ensure_distinct_output()?;
    let conversion = convert_file(&settings.input, &settings.options)
        .with_context(|| format!("converting {}", settings.input.display()))?;

    write_atomic(&settings.output, &conversion.output)?;

    println!(
        "Wrote {} devices to {}",
        conversion.devices.len(),
        settings.output.display()
    );
    if conversion.skipped() > 0 {
        println!("  {} parts skipped", conversion.skipped());
    }
    let warnings = conversion.warnings().count();
    if warnings > 0 {
        println!("  {warnings} warnings");
    }
    Ok(())
}

/// Write `contents` to a temporary file beside `path`, then move it over `path`.
///
/// An existing output keeps its permissions. A new one is created readable by
/// everyone, subject to the process umask.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let existing = fs::metadata(path).ok().map(|meta| meta.permissions());
    let mut file = temp_builder()
        .tempfile_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("writing {}", path.display()))?;
    if let Some(permissions) = existing {
        file.as_file()
            .set_permissions(permissions)
            .with_context(|| format!("copying permissions of {}", path.display()))?;
    }
    file.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "output written");
    Ok(())
}

#[cfg(unix)]
fn temp_builder() -> tempfile::Builder<'static, 'static> {
    use std::os::unix::fs::PermissionsExt;

    let mut builder = tempfile::Builder::new();
    builder.permissions(fs::Permissions::from_mode(0o644));
    builder
}

#[cfg(not(unix))]
fn temp_builder() -> tempfile::Builder<'static, 'static> {
    tempfile::Builder::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.ini");
        std::fs::write(&path, "old").unwrap();
        write_atomic(&path, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        // Only the output itself remains; the temporary file was renamed.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.ini");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_atomic(&path, "new").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_new_file_follows_umask() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, "x").unwrap();
        let plain_mode = std::fs::metadata(&plain).unwrap().permissions().mode();

        let path = dir.path().join("devices.ini");
        write_atomic(&path, "new").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, plain_mode & 0o644);
    }

    #[test]
    fn same_input_and_output_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("parts.ini");
        std::fs::write(&input, "part\n;\n").unwrap();
        let settings = RunSettings {
            input: input.clone(),
            output: input.clone(),
            options: Default::default(),
        };
        let err = run(&settings).unwrap_err();
        assert!(err.to_string().contains("same file"));
        assert_eq!(std::fs::read_to_string(&input).unwrap(), "part\n;\n");
    }

    #[test]
    fn write_atomic_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("devices.ini");
        assert!(write_atomic(&path, "x").is_err());
    }
}
