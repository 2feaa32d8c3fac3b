//! CLI configuration file

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use xsl_pipeline::CampaignConfig;

/// Settings read from `--config`; command-line flags take precedence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Filter used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Documents analyzed at the same time; the number of CPUs when absent
    pub max_concurrency: Option<usize>,
    pub fail_fast: bool,
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            max_concurrency: None,
            fail_fast: false,
            pretty: false,
        }
    }
}

impl CliConfig {
    /// Read a YAML configuration file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Read `path` if given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Campaign settings, with `max_concurrency`/`fail_fast` overrides from flags
    pub fn campaign(&self, max_concurrency: Option<usize>, fail_fast: bool) -> CampaignConfig {
        let defaults = CampaignConfig::default();
        CampaignConfig {
            max_concurrency: max_concurrency
                .or(self.max_concurrency)
                .unwrap_or(defaults.max_concurrency),
            fail_fast: fail_fast || self.fail_fast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: CliConfig = serde_yaml::from_str("fail_fast: true\n").unwrap();
        assert!(config.fail_fast);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.max_concurrency, None);
    }

    #[test]
    fn test_flags_override_file() {
        let config = CliConfig {
            max_concurrency: Some(8),
            ..CliConfig::default()
        };

        assert_eq!(config.campaign(Some(2), false).max_concurrency, 2);
        assert_eq!(config.campaign(None, false).max_concurrency, 8);
        assert!(config.campaign(None, true).fail_fast);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(&dir.path().join("absent.yaml")).is_err());
        assert_eq!(CliConfig::load_or_default(None).unwrap(), CliConfig::default());
    }
}
