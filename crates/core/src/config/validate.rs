use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Matching weights and thresholds are in range
/// - Search limits and batch sizes are non-zero
/// - A configured catalog carries an access token
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let sections: [(&str, Result<(), String>); 4] = [
        ("matching", config.matching.validate()),
        ("resolver", config.resolver.validate()),
        ("sync", config.sync.validate()),
        ("library", config.library.validate()),
    ];
    for (section, result) in sections {
        result.map_err(|e| ConfigError::ValidationError(format!("{}: {}", section, e)))?;
    }

    if let Some(catalog) = &config.catalog {
        if catalog.access_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "catalog.access_token cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
