use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_MODULES_ROOT: &str = "src/modules";
pub const DEFAULT_OUTPUT: &str = "testing/results/results.csv";
pub const DEFAULT_CONFIG_ARTIFACT: &str = "config.ts";
pub const DEFAULT_SECRET_FILE: &str = "secret.txt";
pub const DEFAULT_PROBE_TIMEOUT: &str = "10s";
pub const DEFAULT_MODULE_TIMEOUT: &str = "120s";
pub const DEFAULT_ESCAPE_HATCH_PATTERN: &str = r":\s*any\b";
pub const DEFAULT_MAX_ESCAPE_HATCHES: usize = 3;

/// Grader configuration.
///
/// Every key is optional; a missing key falls back to the built-in default.
///
/// Example YAML:
/// ```yaml
/// base_url: "http://localhost:3000"
/// modules_root: "src/modules"
/// output: "testing/results/results.csv"
/// probe_timeout: "10s"
/// concurrency: 4
/// strictness:
///   files: ["model.ts", "api.ts"]
///   max_matches: 3
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root URL of the running service under test
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory holding `<category>/<module>/` source trees
    #[serde(default = "default_modules_root")]
    pub modules_root: String,

    /// Results CSV path, overwritten on every run
    #[serde(default = "default_output")]
    pub output: String,

    /// A directory counts as a module only if it contains this file
    #[serde(default = "default_config_artifact")]
    pub config_artifact: String,

    /// Per-module marker file used to de-anonymize results after grading
    #[serde(default = "default_secret_file")]
    pub secret_file: String,

    /// Upper bound for a single HTTP probe, humantime format (e.g. "10s")
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: String,

    /// Upper bound for grading one module end to end
    #[serde(default = "default_module_timeout")]
    pub module_timeout: String,

    /// How many modules are graded at once (1 = strictly sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub strictness: StrictnessConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            modules_root: default_modules_root(),
            output: default_output(),
            config_artifact: default_config_artifact(),
            secret_file: default_secret_file(),
            probe_timeout: default_probe_timeout(),
            module_timeout: default_module_timeout(),
            concurrency: default_concurrency(),
            strictness: StrictnessConfig::default(),
        }
    }
}

/// Static type-strictness scan settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StrictnessConfig {
    /// File names or glob patterns, relative to the module directory
    #[serde(default = "default_strictness_files")]
    pub files: Vec<String>,

    /// Regex counted as one escape-hatch annotation per match
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// The check passes when the total match count is at most this
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
}

impl Default for StrictnessConfig {
    fn default() -> Self {
        Self {
            files: default_strictness_files(),
            pattern: default_pattern(),
            max_matches: default_max_matches(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_modules_root() -> String {
    DEFAULT_MODULES_ROOT.to_string()
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_config_artifact() -> String {
    DEFAULT_CONFIG_ARTIFACT.to_string()
}

fn default_secret_file() -> String {
    DEFAULT_SECRET_FILE.to_string()
}

fn default_probe_timeout() -> String {
    DEFAULT_PROBE_TIMEOUT.to_string()
}

fn default_module_timeout() -> String {
    DEFAULT_MODULE_TIMEOUT.to_string()
}

fn default_concurrency() -> usize {
    1
}

fn default_strictness_files() -> Vec<String> {
    ["model.ts", "api.ts", "hooks.ts", "components.tsx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_pattern() -> String {
    DEFAULT_ESCAPE_HATCH_PATTERN.to_string()
}

fn default_max_matches() -> usize {
    DEFAULT_MAX_ESCAPE_HATCHES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.output, "testing/results/results.csv");
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.strictness.files.len(), 4);
        assert_eq!(config.strictness.max_matches, 3);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_saphyr::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config_parse() {
        let yaml = r#"
base_url: "http://127.0.0.1:4000"
concurrency: 4
strictness:
  max_matches: 0
"#;
        let config: Config = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:4000");
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.strictness.max_matches, 0);
        assert_eq!(config.strictness.files, default_strictness_files());
        assert_eq!(config.secret_file, "secret.txt");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let yaml = "base_url: \"http://localhost:3000\"\nretries: 3\n";
        assert!(serde_saphyr::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config::default();
        let yaml = serde_saphyr::to_string(&config).unwrap();
        let parsed: Config = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }
}
