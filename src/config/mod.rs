mod schema;
mod validation;

pub use schema::{Config, StrictnessConfig};
pub use validation::validate_config;

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "grader.yaml";

/// Get the default config file path (./grader.yaml)
pub fn get_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses ./grader.yaml and
///   falls back to built-in defaults when that file does not exist.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content)
        .with_context(|| {
            format!("Failed to parse config: invalid YAML in {}", config_path.display())
        })?;

    Ok(config)
}

/// Configuration with every string field parsed into its runtime type.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: reqwest::Url,
    pub modules_root: PathBuf,
    pub output: PathBuf,
    pub config_artifact: String,
    pub secret_file: String,
    pub probe_timeout: Duration,
    pub module_timeout: Duration,
    pub concurrency: usize,
    pub strictness_files: Vec<String>,
    pub escape_hatch: Regex,
    pub max_escape_hatches: usize,
}

impl Settings {
    /// Parse a config. Call `validate_config` first for a full error list;
    /// this stops at the first bad field.
    pub fn resolve(config: &Config) -> Result<Self> {
        let base_url = reqwest::Url::parse(&config.base_url)
            .with_context(|| format!("Invalid base_url '{}'", config.base_url))?;
        let probe_timeout = humantime::parse_duration(&config.probe_timeout)
            .with_context(|| format!("Invalid probe_timeout '{}'", config.probe_timeout))?;
        let module_timeout = humantime::parse_duration(&config.module_timeout)
            .with_context(|| format!("Invalid module_timeout '{}'", config.module_timeout))?;
        let escape_hatch = Regex::new(&config.strictness.pattern)
            .with_context(|| {
                format!("Invalid strictness.pattern '{}'", config.strictness.pattern)
            })?;

        Ok(Self {
            base_url,
            modules_root: PathBuf::from(&config.modules_root),
            output: PathBuf::from(&config.output),
            config_artifact: config.config_artifact.clone(),
            secret_file: config.secret_file.clone(),
            probe_timeout,
            module_timeout,
            concurrency: config.concurrency.max(1),
            strictness_files: config.strictness.files.clone(),
            escape_hatch,
            max_escape_hatches: config.strictness.max_matches,
        })
    }
}
