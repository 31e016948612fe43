use super::schema::Config;

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    match reqwest::Url::parse(&config.base_url) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                errors.push(format!(
                    "base_url: scheme must be http or https, got '{}'",
                    url.scheme()
                ));
            }
            if url.cannot_be_a_base() {
                errors.push(format!(
                    "base_url: '{}' cannot be used as a base URL",
                    config.base_url
                ));
            }
        }
        Err(e) => errors.push(format!("base_url: invalid '{}' - {}", config.base_url, e)),
    }

    for (key, value) in [
        ("probe_timeout", &config.probe_timeout),
        ("module_timeout", &config.module_timeout),
    ] {
        match humantime::parse_duration(value) {
            Ok(d) if d.is_zero() => errors.push(format!("{}: must be greater than zero", key)),
            Ok(_) => {}
            Err(e) => errors.push(format!("{}: invalid duration '{}' - {}", key, value, e)),
        }
    }

    if config.concurrency == 0 {
        errors.push("concurrency: must be at least 1".to_string());
    }

    if config.output.trim().is_empty() {
        errors.push("output: must not be empty".to_string());
    }

    if config.config_artifact.trim().is_empty() {
        errors.push("config_artifact: must not be empty".to_string());
    }

    if let Err(e) = regex::Regex::new(&config.strictness.pattern) {
        errors.push(format!(
            "strictness.pattern: invalid regex '{}' - {}",
            config.strictness.pattern, e
        ));
    }

    for (i, file) in config.strictness.files.iter().enumerate() {
        if let Err(e) = glob::Pattern::new(file) {
            errors.push(format!("strictness.files[{}]: invalid pattern '{}' - {}", i, file, e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
