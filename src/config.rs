//! Process-wide configuration
//!
//! Loaded once at startup and shared read-only afterwards.

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Default per-source lookup timeout
pub const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 5_000;

/// Default regulatory flight-height limit in meters
pub const DEFAULT_HEIGHT_LIMIT_M: f64 = 120.0;

/// One configured elevation provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// SRTM-based Open-Elevation lookup API
    OpenElevation { base_url: String },
    /// Open-Meteo elevation API (Copernicus DEM)
    OpenMeteo { base_url: String },
    /// OpenTopoData with a named dataset
    OpenTopoData { base_url: String, dataset: String },
}

impl ProviderConfig {
    pub fn base_url(&self) -> &str {
        match self {
            ProviderConfig::OpenElevation { base_url }
            | ProviderConfig::OpenMeteo { base_url }
            | ProviderConfig::OpenTopoData { base_url, .. } => base_url,
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Elevation providers queried for every analysis, in order
    pub providers: Vec<ProviderConfig>,
    /// Per-source timeout in milliseconds
    pub source_timeout_ms: u64,
    /// User-Agent header sent to providers
    pub user_agent: String,
    /// Computed heights above this limit are flagged
    pub height_limit_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: vec![
                ProviderConfig::OpenElevation {
                    base_url: "https://api.open-elevation.com".to_string(),
                },
                ProviderConfig::OpenMeteo {
                    base_url: "https://api.open-meteo.com".to_string(),
                },
                ProviderConfig::OpenTopoData {
                    base_url: "https://api.opentopodata.org".to_string(),
                    dataset: "aster30m".to_string(),
                },
            ],
            source_timeout_ms: DEFAULT_SOURCE_TIMEOUT_MS,
            user_agent: format!("flightheight/{}", env!("CARGO_PKG_VERSION")),
            height_limit_m: DEFAULT_HEIGHT_LIMIT_M,
        }
    }
}

impl Config {
    /// Reads and validates a JSON configuration file. Missing fields take
    /// their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!(path = %path.as_ref().display(), providers = config.providers.len(), "configuration loaded");
        Ok(config)
    }

    /// Loads `path` if given, otherwise returns the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(Error::Config("at least one elevation provider is required".to_string()));
        }
        if self.source_timeout_ms == 0 {
            return Err(Error::Config("source_timeout_ms must be positive".to_string()));
        }
        if !self.height_limit_m.is_finite() || self.height_limit_m <= 0.0 {
            return Err(Error::Config(format!(
                "height_limit_m must be positive, got {}",
                self.height_limit_m
            )));
        }
        for provider in &self.providers {
            let url = provider.base_url();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!("invalid provider URL: {}", url)));
            }
        }
        Ok(())
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.height_limit_m, 120.0);
        assert_eq!(config.source_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"height_limit_m": 150.0}}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.height_limit_m, 150.0);
        assert_eq!(config.providers, Config::default().providers);
    }

    #[test]
    fn test_load_provider_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"providers": [{{"kind": "open_topo_data", "base_url": "http://localhost:5000", "dataset": "srtm90m"}}]}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.providers,
            vec![ProviderConfig::OpenTopoData {
                base_url: "http://localhost:5000".to_string(),
                dataset: "srtm90m".to_string(),
            }]
        );
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.providers.clear();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.source_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.height_limit_m = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.providers = vec![ProviderConfig::OpenMeteo { base_url: "ftp://x".to_string() }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(Config::load("/nonexistent/flightheight.json"), Err(Error::Io(_))));
        assert!(Config::load_or_default(None).is_ok());
    }
}
