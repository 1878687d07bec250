use anyhow::Context;
use benchlog::config::BenchlogConfig;
use benchlog::harness::Harness;
use benchlog::history::{LogOptions, walk_history};
use benchlog::package::PackageSet;

use super::color_choice;

/// `benchlog log` arguments; unset values fall back to the config.
pub struct LogArgs {
    pub bench: Option<String>,
    pub threshold: Option<f64>,
    pub revision_range: Option<String>,
    pub packages: Vec<String>,
}

/// Handle `benchlog log`
pub fn handle_log(config: &BenchlogConfig, args: LogArgs) -> anyhow::Result<()> {
    let options = LogOptions::new(
        args.revision_range,
        args.bench.as_deref().unwrap_or(&config.bench),
        args.threshold.unwrap_or(config.threshold),
        config.caching,
        config.colored,
    )?;

    let harness = Harness::new(&config.harness, config.colored);
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let set = PackageSet::open(&harness, &cwd, &args.packages)?;

    let stdout = std::io::stdout().lock();
    let mut out = anstream::AutoStream::new(stdout, color_choice(config.colored));
    walk_history(&set, &harness, &options, &mut out)
}
