use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::SpotifyConfig;
use crate::matching::MatchingConfig;
use crate::orchestrator::{LibraryConfig, SyncConfig};
use crate::resolver::ResolverConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    /// Remote catalog client (absent = no client configured).
    #[serde(default)]
    pub catalog: Option<SpotifyConfig>,
    /// Persistence sink for resolved playlists (absent = not persisted).
    #[serde(default)]
    pub sink: Option<SinkConfig>,
}

/// SQLite sink configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinkConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tunebridge.db")
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub matching: MatchingConfig,
    pub resolver: ResolverConfig,
    pub sync: SyncConfig,
    pub library: LibraryConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<SanitizedCatalogConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<SinkConfig>,
}

/// Sanitized catalog config (access token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCatalogConfig {
    pub access_token_configured: bool,
    pub min_interval_ms: u64,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            matching: config.matching.clone(),
            resolver: config.resolver.clone(),
            sync: config.sync.clone(),
            library: config.library.clone(),
            catalog: config.catalog.as_ref().map(|c| SanitizedCatalogConfig {
                access_token_configured: !c.access_token.is_empty(),
                min_interval_ms: c.min_interval_ms,
                timeout_secs: c.timeout_secs,
                market: c.market.clone(),
                base_url: c.base_url.clone(),
            }),
            sink: config.sink.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.resolver.standard_limit, 15);
        assert_eq!(config.sync.add_batch_size, 25);
        assert_eq!(config.matching.thresholds.min_score, 0.6);
        assert!(config.catalog.is_none());
        assert!(config.sink.is_none());
    }

    #[test]
    fn test_deserialize_with_default_sink_path() {
        let toml = r#"
[sink]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.sink.unwrap().path.to_str().unwrap(), "tunebridge.db");
    }

    #[test]
    fn test_deserialize_catalog_requires_token() {
        let toml = r#"
[catalog]
market = "US"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_hides_token() {
        let config = Config {
            catalog: Some(SpotifyConfig::with_token("secret-token")),
            ..Default::default()
        };

        let sanitized = SanitizedConfig::from(&config);
        let catalog = sanitized.catalog.as_ref().unwrap();
        assert!(catalog.access_token_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-token"));
    }
}
