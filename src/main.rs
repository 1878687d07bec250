use anyhow::Context;
use benchlog::BenchError;
use benchlog::config::{BenchlogConfig, validate_threshold};
use benchlog::styling::ERROR_EMOJI;
use clap::{Parser, Subcommand};
use color_print::cformat;
use std::io::Write;
use std::process;

mod commands;

use commands::{LogArgs, color_choice, handle_cache_clear, handle_cache_dir, handle_log};

#[derive(Parser)]
#[command(name = "benchlog")]
#[command(about = "Git log annotated with benchmark changes", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Log every git and harness invocation to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Colour deltas and errors (default from config: true)
    #[arg(long, global = true, value_name = "BOOL")]
    colored: Option<bool>,

    /// Reuse results cached under .git/benchlog (default from config: true)
    #[arg(long, global = true, value_name = "BOOL")]
    caching: Option<bool>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the commit log with benchmark results and their changes
    Log {
        /// Benchmark name regex, as for `go test -bench`
        #[arg(long, value_name = "REGEX")]
        bench: Option<String>,

        /// Minimum absolute ns/op change to display, in percent (0-100)
        #[arg(long, value_name = "PERCENT", value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Revision range passed to git log (default: all of HEAD)
        revision_range: Option<String>,

        /// Packages to benchmark, after `--` (patterns like ./... allowed)
        #[arg(last = true, required = true, value_name = "PACKAGES")]
        packages: Vec<String>,
    },

    /// Inspect or clear cached benchmark results
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print the cache directory of the current repository
    Dir,

    /// Remove cached results
    Clear {
        /// Only remove results for this tree id
        tree: Option<String>,
    },
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|e| format!("'{value}' is not a number: {e}"))?;
    validate_threshold(threshold)?;
    Ok(threshold)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "# {}", record.args()))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = BenchlogConfig::load()
        .context("Failed to load config")
        .map(|mut config| {
            if let Some(colored) = cli.colored {
                config.colored = colored;
            }
            if let Some(caching) = cli.caching {
                config.caching = caching;
            }
            config
        });
    let colored = match &config {
        Ok(config) => config.colored,
        Err(_) => cli.colored.unwrap_or(true),
    };

    let result = config.and_then(|config| match cli.command {
        Commands::Log {
            bench,
            threshold,
            revision_range,
            packages,
        } => handle_log(
            &config,
            LogArgs {
                bench,
                threshold,
                revision_range,
                packages,
            },
        ),
        Commands::Cache { action } => match action {
            CacheAction::Dir => handle_cache_dir(),
            CacheAction::Clear { tree } => handle_cache_clear(tree.as_deref(), config.colored),
        },
    });

    if let Err(e) = result {
        let message = match e.downcast_ref::<BenchError>() {
            // Already formatted with emoji and colours
            Some(err) => err.to_string(),
            None => cformat!("{ERROR_EMOJI} <red>{e:#}</>"),
        };
        let mut stderr = anstream::AutoStream::new(std::io::stderr(), color_choice(colored));
        let _ = writeln!(stderr, "{message}");
        process::exit(1);
    }
}
