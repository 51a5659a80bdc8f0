//! TOML-based configuration for the comparison engine.
//!
//! Configuration is a plain value handed to
//! [`ComparisonManager::from_config`](crate::comparison::ComparisonManager::from_config);
//! nothing here is process-wide state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::comparison::ComparisonPolicy;
use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComparisonConfig {
    /// Comparison behaviour.
    #[serde(default)]
    pub comparison: ComparisonSection,

    /// Matcher safety ceilings.
    #[serde(default)]
    pub limits: DiffLimits,

    /// Post-processing of line fragments.
    #[serde(default)]
    pub post_process: PostProcessConfig,

    /// Logging settings for front-ends.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Template written by `diffmerge init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# diffmerge configuration

[comparison]
# default | trim_whitespace | ignore_whitespace
policy = "default"
# refine changed line blocks by word
inner = true
# treat a trailing line separator as starting an extra empty line
keep_trailing_empty_line = false

[limits]
# ceiling on (units1 x units2) after common prefix/suffix removal
max_unit_product = 2500000000
# ceiling on diagonals expanded by the matcher
max_work = 50000000
# diagonals expanded between cancellation checks
check_interval = 1024

[post_process]
squash = false
trim = false

[logging]
level = "warn"
"#;

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Comparison behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComparisonSection {
    /// Policy used when the caller does not pick one.
    #[serde(default)]
    pub policy: ComparisonPolicy,

    /// Refine changed line blocks by word.
    #[serde(default = "default_true")]
    pub inner: bool,

    /// Treat a trailing `\n` as starting an extra empty line.
    #[serde(default)]
    pub keep_trailing_empty_line: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ComparisonSection {
    fn default() -> Self {
        Self {
            policy: ComparisonPolicy::default(),
            inner: true,
            keep_trailing_empty_line: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Safety ceilings for the sequence matcher.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffLimits {
    /// Maximum `n * m` of the unit counts left after trimming the common
    /// prefix and suffix.
    #[serde(default = "default_max_unit_product")]
    pub max_unit_product: u64,

    /// Maximum number of diagonals the matcher may expand.
    #[serde(default = "default_max_work")]
    pub max_work: u64,

    /// Diagonals expanded between two cancellation checks.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

fn default_max_unit_product() -> u64 {
    2_500_000_000
}
fn default_max_work() -> u64 {
    50_000_000
}
fn default_check_interval() -> u64 {
    1024
}

impl Default for DiffLimits {
    fn default() -> Self {
        Self {
            max_unit_product: default_max_unit_product(),
            max_work: default_max_work(),
            check_interval: default_check_interval(),
        }
    }
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

/// Defaults for [`process_blocks`](crate::comparison::post_process::process_blocks).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostProcessConfig {
    /// Squash touching line fragments.
    #[serde(default)]
    pub squash: bool,

    /// Trim leading/trailing equal lines from fragments.
    #[serde(default)]
    pub trim: bool,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration for front-ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl ComparisonConfig {
    /// Load a [`ComparisonConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate that all values are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        if limits.max_unit_product == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_unit_product".into(),
                detail: "unit product ceiling must be > 0".into(),
            });
        }
        if limits.max_work == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_work".into(),
                detail: "work ceiling must be > 0".into(),
            });
        }
        if limits.check_interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.check_interval".into(),
                detail: "check interval must be > 0".into(),
            });
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".into(),
                detail: format!(
                    "unknown level '{}', expected one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[comparison]
policy = "ignore_whitespace"
inner = false
keep_trailing_empty_line = true

[limits]
max_unit_product = 1000
max_work = 500
check_interval = 16

[post_process]
squash = true
trim = true

[logging]
level = "debug"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config = ComparisonConfig::from_toml_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.comparison.policy, ComparisonPolicy::IgnoreWhitespace);
        assert!(!config.comparison.inner);
        assert!(config.comparison.keep_trailing_empty_line);
        assert_eq!(config.limits.max_unit_product, 1000);
        assert_eq!(config.limits.check_interval, 16);
        assert!(config.post_process.squash);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let config = ComparisonConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config, ComparisonConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = ComparisonConfig::from_toml_str("").unwrap();
        assert_eq!(config.comparison.policy, ComparisonPolicy::Default);
        assert!(config.comparison.inner);
        assert_eq!(config.limits, DiffLimits::default());
        assert!(!config.post_process.squash);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diffmerge.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = ComparisonConfig::load_and_validate(&path).expect("load failed");
        assert_eq!(config.limits.max_work, 500);
    }

    #[test]
    fn test_file_not_found() {
        let result = ComparisonConfig::load_from_file("/nonexistent/diffmerge.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = ComparisonConfig::from_toml_str("[comparison]\npolicy = \"loose\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = ComparisonConfig::default();
        config.limits.max_work = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "limits.max_work"
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let mut config = ComparisonConfig::default();
        config.logging.level = "loud".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "logging.level"
        ));
    }
}
