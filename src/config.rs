use config::{Config, ConfigError, Environment, File};
use etcetera::BaseStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration for `benchlog`.
///
/// # Examples
///
/// ```toml
/// # Minimum absolute ns/op change to display, in percent (0-100)
/// threshold = 5.0
///
/// # Benchmark name pattern passed to the harness
/// bench = "Encode|Decode"
///
/// # Reuse results stored under .git/benchlog/tree-cache
/// caching = true
///
/// # Colour deltas (red = slower, green = faster) and error messages
/// colored = true
///
/// [harness]
/// command = "go"  # Executable that lists packages and runs benchmarks
/// ```
///
/// Config file location:
/// - Linux/macOS: `~/.config/benchlog/config.toml`
/// - Windows: `%APPDATA%\benchlog\config.toml`
///
/// Override the location with `BENCHLOG_CONFIG_PATH`. Environment variables
/// `BENCHLOG_*` override file values; nested keys use `__`
/// (`BENCHLOG_HARNESS__COMMAND=go1.22`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchlogConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_bench")]
    pub bench: String,

    #[serde(default = "default_true")]
    pub caching: bool,

    #[serde(default = "default_true")]
    pub colored: bool,

    #[serde(default)]
    pub harness: HarnessConfig,
}

/// How to invoke the benchmark harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Executable name or path (default: `go`)
    #[serde(default = "default_harness_command")]
    pub command: String,
}

fn default_threshold() -> f64 {
    2.0
}

fn default_bench() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

fn default_harness_command() -> String {
    "go".to_string()
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            command: default_harness_command(),
        }
    }
}

impl Default for BenchlogConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            bench: default_bench(),
            caching: true,
            colored: true,
            harness: HarnessConfig::default(),
        }
    }
}

impl BenchlogConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. Config file
    /// 3. Environment variables (`BENCHLOG_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(config_path().as_deref())
    }

    /// Like [`BenchlogConfig::load`], reading the given file instead of the
    /// default location. A missing file is not an error.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("threshold", defaults.threshold)?
            .set_default("bench", defaults.bench)?
            .set_default("caching", defaults.caching)?
            .set_default("colored", defaults.colored)?
            .set_default("harness.command", defaults.harness.command)?;

        if let Some(path) = path
            && path.exists()
        {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }

        builder = builder.add_source(
            Environment::with_prefix("BENCHLOG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        validate_threshold(config.threshold).map_err(ConfigError::Message)?;
        Ok(config)
    }
}

/// Location of the user config file, honouring `BENCHLOG_CONFIG_PATH`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("BENCHLOG_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("benchlog").join("config.toml"))
}

/// Thresholds are percentages of ns/op change and must lie in `[0, 100]`.
pub fn validate_threshold(threshold: f64) -> Result<(), String> {
    if (0.0..=100.0).contains(&threshold) {
        Ok(())
    } else {
        Err(format!(
            "threshold must be in [0, 100] interval, got {threshold}"
        ))
    }
}
