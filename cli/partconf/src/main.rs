//! partconf CLI — converts avrdude part descriptions into device configuration files.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};
use partconf_core::PagedDefault;
use tracing_subscriber::EnvFilter;

use config::{Overrides, PartconfConfig, RunSettings};

#[derive(Parser)]
#[command(
    name = "partconf",
    version,
    about = "Convert avrdude part descriptions into device configuration"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Run configuration file (default: nearest partconf.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a description file and write the device file
    Convert {
        #[command(flatten)]
        policy: PolicyArgs,
        /// Output device file (default: input with .ini extension)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a description file without writing anything
    Check {
        #[command(flatten)]
        policy: PolicyArgs,
        /// Report format (human, json)
        #[arg(long)]
        format: Option<String>,
    },
    /// List the devices a description file yields
    Parts {
        #[command(flatten)]
        policy: PolicyArgs,
        /// Output format (human, json)
        #[arg(long)]
        format: Option<String>,
    },
    /// Show how each line of a description file is classified
    Classify {
        /// Input description file (default: avrdude.conf)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Tab stop width
        #[arg(long)]
        tab_width: Option<usize>,
        /// Also show blank and comment lines
        #[arg(long)]
        all: bool,
    },
}

/// Input and validation policy flags shared by the pipeline commands.
#[derive(Args)]
struct PolicyArgs {
    /// Input description file (default: avrdude.conf)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Abort on parts missing desc or signature
    #[arg(long, conflicts_with = "lenient")]
    strict: bool,
    /// Skip parts missing desc or signature with a warning
    #[arg(long)]
    lenient: bool,
    /// Treatment of flash blocks without a paged field (unpaged, paged, required)
    #[arg(long)]
    paged_default: Option<PagedDefault>,
    /// Flash field holding the number of pages (e.g. num_pages, blocksize)
    #[arg(long)]
    page_count_field: Option<String>,
    /// Tab stop width
    #[arg(long)]
    tab_width: Option<usize>,
}

impl PolicyArgs {
    fn into_overrides(self, output: Option<PathBuf>) -> Overrides {
        let strict = match (self.strict, self.lenient) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Overrides {
            input: self.input,
            output,
            strict,
            paged_default: self.paged_default,
            page_count_field: self.page_count_field,
            tab_width: self.tab_width,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Install the stderr log subscriber. `RUST_LOG` applies unless a
/// verbosity flag was given.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = if verbose == 0 && !quiet {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd, cli.config.as_deref())?;

    match cli.command {
        Commands::Convert { policy, output } => {
            let settings = resolve(&cwd, &config, policy.into_overrides(output))?;
            commands::convert::run(&settings)
        }

        Commands::Check { policy, format } => {
            let settings = resolve(&cwd, &config, policy.into_overrides(None))?;
            commands::check::run(&settings, format.as_deref())
        }

        Commands::Parts { policy, format } => {
            let settings = resolve(&cwd, &config, policy.into_overrides(None))?;
            commands::parts::run(&settings, format.as_deref())
        }

        Commands::Classify {
            input,
            tab_width,
            all,
        } => {
            let overrides = Overrides {
                input,
                tab_width,
                ..Overrides::default()
            };
            let settings = resolve(&cwd, &config, overrides)?;
            commands::classify::run(&settings.input, settings.options.tab_width, all)
        }
    }
}

/// Load the explicit configuration file, or the nearest `partconf.toml`.
fn load_config(
    cwd: &Path,
    explicit: Option<&Path>,
) -> anyhow::Result<Option<(PartconfConfig, PathBuf)>> {
    match explicit {
        Some(path) => {
            let path = cwd.join(path);
            let config = PartconfConfig::load(&path)?;
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.to_path_buf());
            Ok(Some((config, dir)))
        }
        None => PartconfConfig::find_and_load(cwd),
    }
}

fn resolve(
    cwd: &Path,
    config: &Option<(PartconfConfig, PathBuf)>,
    overrides: Overrides,
) -> anyhow::Result<RunSettings> {
    let config = config.as_ref().map(|(c, dir)| (c, dir.as_path()));
    RunSettings::resolve(cwd, config, overrides)
}
