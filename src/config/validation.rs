use super::models::Config;
use thiserror::Error;

const MAX_CONTENT_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Backend base URL '{url}' is not a valid http(s) URL")]
    InvalidBaseUrl { url: String },

    #[error("{component} interval must be positive")]
    ZeroInterval { component: &'static str },

    #[error("Cache timeout must be positive")]
    ZeroCacheTimeout,

    #[error("content_limit ({limit}) must be between 1 and {max}")]
    InvalidContentLimit { limit: usize, max: usize },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_backend(config)?;
    validate_intervals(config)?;
    validate_warmer(config)?;
    Ok(())
}

fn validate_backend(config: &Config) -> Result<(), ValidationError> {
    let url = &config.backend.base_url;
    let parsed = reqwest::Url::parse(url).map_err(|_| ValidationError::InvalidBaseUrl {
        url: url.clone(),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ValidationError::InvalidBaseUrl { url: url.clone() });
    }

    Ok(())
}

fn validate_intervals(config: &Config) -> Result<(), ValidationError> {
    if config.pinger.interval_ms == 0 {
        return Err(ValidationError::ZeroInterval { component: "pinger" });
    }
    if config.warmer.interval_ms == 0 {
        return Err(ValidationError::ZeroInterval { component: "warmer" });
    }
    Ok(())
}

fn validate_warmer(config: &Config) -> Result<(), ValidationError> {
    if config.warmer.cache_timeout_ms == 0 {
        return Err(ValidationError::ZeroCacheTimeout);
    }

    let limit = config.warmer.content_limit;
    if limit == 0 || limit > MAX_CONTENT_LIMIT {
        return Err(ValidationError::InvalidContentLimit {
            limit,
            max: MAX_CONTENT_LIMIT,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = Config::default();
        config.backend.base_url = "not a url".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidBaseUrl { .. })
        ));

        config.backend.base_url = "ftp://example.com".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = Config::default();
        config.pinger.interval_ms = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroInterval { component: "pinger" })
        ));
    }

    #[test]
    fn test_rejects_content_limit_out_of_range() {
        let mut config = Config::default();
        config.warmer.content_limit = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidContentLimit { .. })
        ));

        config.warmer.content_limit = 500;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidContentLimit { .. })
        ));
    }
}
