//! `partconf.toml` run configuration and settings resolution.
//!
//! Values are layered: command-line flags override the configuration file,
//! which overrides built-in defaults. Relative paths in the file are taken
//! relative to the directory the file lives in.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use partconf_core::convert::DEFAULT_TAB_WIDTH;
use partconf_core::{ConvertOptions, FieldPolicy, NormalizeOptions, PagedDefault};
use serde::{Deserialize, Serialize};

/// Name of the configuration file searched for from the working directory up.
pub const CONFIG_FILE: &str = "partconf.toml";

/// Default input file name.
pub const DEFAULT_INPUT: &str = "avrdude.conf";

/// The top-level configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartconfConfig {
    /// Conversion settings.
    #[serde(default)]
    pub convert: ConvertSection,
}

/// The `[convert]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConvertSection {
    /// Description file to read.
    #[serde(default)]
    pub input: Option<PathBuf>,
    /// Device file to write.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Abort instead of skipping parts without `desc`/`signature`.
    #[serde(default)]
    pub strict: Option<bool>,
    /// Treatment of flash blocks without a `paged` field.
    #[serde(default)]
    pub paged_default: Option<PagedDefault>,
    /// Flash field holding the page count.
    #[serde(default)]
    pub page_count_field: Option<String>,
    /// Tab stop width of the input.
    #[serde(default)]
    pub tab_width: Option<usize>,
}

impl PartconfConfig {
    /// Search upward from `start_dir` for a `partconf.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Load a configuration file from an explicit path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse a configuration from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing partconf.toml")
    }
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub strict: Option<bool>,
    pub paged_default: Option<PagedDefault>,
    pub page_count_field: Option<String>,
    pub tab_width: Option<usize>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: ConvertOptions,
}

impl RunSettings {
    /// Merge overrides, an optional configuration file, and defaults.
    ///
    /// `config` is the loaded file and the directory it came from.
    pub fn resolve(
        cwd: &Path,
        config: Option<(&PartconfConfig, &Path)>,
        overrides: Overrides,
    ) -> Result<Self> {
        let (section, base) = match config {
            Some((config, dir)) => (config.convert.clone(), dir.to_path_buf()),
            None => (ConvertSection::default(), cwd.to_path_buf()),
        };

        let input = match (overrides.input, section.input) {
            (Some(input), _) => cwd.join(input),
            (None, Some(input)) => base.join(input),
            (None, None) => cwd.join(DEFAULT_INPUT),
        };
        let output = match (overrides.output, section.output) {
            (Some(output), _) => cwd.join(output),
            (None, Some(output)) => base.join(output),
            (None, None) => input.with_extension("ini"),
        };
        let tab_width = overrides
            .tab_width
            .or(section.tab_width)
            .unwrap_or(DEFAULT_TAB_WIDTH);
        if tab_width == 0 {
            bail!("tab-width must be at least 1");
        }

        let strict = overrides.strict.or(section.strict).unwrap_or(false);
        let defaults = NormalizeOptions::default();
        let options = ConvertOptions {
            tab_width,
            normalize: NormalizeOptions {
                field_policy: if strict {
                    FieldPolicy::Strict
                } else {
                    FieldPolicy::Lenient
                },
                paged_default: overrides
                    .paged_default
                    .or(section.paged_default)
                    .unwrap_or(defaults.paged_default),
                page_count_field: overrides
                    .page_count_field
                    .or(section.page_count_field)
                    .unwrap_or(defaults.page_count_field),
            },
        };

        Ok(Self {
            input,
            output,
            options,
        })
    }

    /// Refuse to write the output over the input it was read from.
    pub fn ensure_distinct_output(&self) -> Result<()> {
        if self.input == self.output {
            bail!(
                "input and output are the same file: {}",
                self.input.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = PartconfConfig::from_str(
            r#"
[convert]
input = "conf/avrdude.conf"
output = "out/devices.ini"
strict = true
paged-default = "paged"
page-count-field = "blocksize"
tab-width = 4
"#,
        )
        .unwrap();
        let section = &config.convert;
        assert_eq!(section.input.as_deref(), Some(Path::new("conf/avrdude.conf")));
        assert_eq!(section.strict, Some(true));
        assert_eq!(section.paged_default, Some(PagedDefault::Paged));
        assert_eq!(section.page_count_field.as_deref(), Some("blocksize"));
        assert_eq!(section.tab_width, Some(4));
    }

    #[test]
    fn parse_empty_config() {
        let config = PartconfConfig::from_str("").unwrap();
        assert!(config.convert.input.is_none());
    }

    #[test]
    fn reject_unknown_keys() {
        assert!(PartconfConfig::from_str("[convert]\nstrikt = true\n").is_err());
        assert!(PartconfConfig::from_str("[other]\n").is_err());
    }

    #[test]
    fn reject_bad_paged_default() {
        assert!(PartconfConfig::from_str("[convert]\npaged-default = \"maybe\"\n").is_err());
    }

    #[test]
    fn defaults_without_config() {
        let cwd = Path::new("/work");
        let settings = RunSettings::resolve(cwd, None, Overrides::default()).unwrap();
        assert_eq!(settings.input, Path::new("/work/avrdude.conf"));
        assert_eq!(settings.output, Path::new("/work/avrdude.ini"));
        assert_eq!(settings.options, ConvertOptions::default());
    }

    #[test]
    fn config_paths_are_relative_to_config_dir() {
        let config = PartconfConfig::from_str(
            "[convert]\ninput = \"src/parts.conf\"\nstrict = true\n",
        )
        .unwrap();
        let settings = RunSettings::resolve(
            Path::new("/proj/sub"),
            Some((&config, Path::new("/proj"))),
            Overrides::default(),
        )
        .unwrap();
        assert_eq!(settings.input, Path::new("/proj/src/parts.conf"));
        assert_eq!(settings.output, Path::new("/proj/src/parts.ini"));
        assert_eq!(settings.options.normalize.field_policy, FieldPolicy::Strict);
    }

    #[test]
    fn flags_override_config() {
        let config = PartconfConfig::from_str(
            "[convert]\nstrict = true\npage-count-field = \"blocksize\"\ntab-width = 4\n",
        )
        .unwrap();
        let overrides = Overrides {
            input: Some("a.conf".into()),
            output: Some("b.ini".into()),
            strict: Some(false),
            paged_default: Some(PagedDefault::Required),
            tab_width: Some(2),
            ..Overrides::default()
        };
        let settings =
            RunSettings::resolve(Path::new("/cwd"), Some((&config, Path::new("/cfg"))), overrides)
                .unwrap();
        assert_eq!(settings.input, Path::new("/cwd/a.conf"));
        assert_eq!(settings.output, Path::new("/cwd/b.ini"));
        assert_eq!(settings.options.tab_width, 2);
        let normalize = &settings.options.normalize;
        assert_eq!(normalize.field_policy, FieldPolicy::Lenient);
        assert_eq!(normalize.paged_default, PagedDefault::Required);
        assert_eq!(normalize.page_count_field, "blocksize");
    }

    #[test]
    fn same_input_and_output_is_rejected_for_writing() {
        let overrides = Overrides {
            input: Some("x.conf".into()),
            output: Some("x.conf".into()),
            ..Overrides::default()
        };
        let settings = RunSettings::resolve(Path::new("/w"), None, overrides).unwrap();
        assert!(settings.ensure_distinct_output().is_err());
    }

    #[test]
    fn ini_input_resolves_for_read_only_commands() {
        let overrides = Overrides {
            input: Some("devices.ini".into()),
            ..Overrides::default()
        };
        let settings = RunSettings::resolve(Path::new("/w"), None, overrides).unwrap();
        assert_eq!(settings.input, settings.output);
    }

    #[test]
    fn zero_tab_width_is_rejected() {
        let overrides = Overrides {
            tab_width: Some(0),
            ..Overrides::default()
        };
        assert!(RunSettings::resolve(Path::new("/w"), None, overrides).is_err());
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[convert]\ninput = \"parts.conf\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, found_dir) = PartconfConfig::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(found_dir, dir.path());
        assert_eq!(config.convert.input.as_deref(), Some(Path::new("parts.conf")));
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "this is not valid toml [[[").unwrap();
        let err = PartconfConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }
}
