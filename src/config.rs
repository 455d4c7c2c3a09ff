use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_STATE_DIR: &str = ".storefront";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API URL must start with http:// or https://, got {0:?}")]
    InvalidApiUrl(String),
    #[error("STOREFRONT_TIMEOUT_SECS must be a positive number of seconds, got {0:?}")]
    InvalidTimeout(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend root, without a trailing slash.
    pub api_url: String,
    /// Directory holding the persisted token and cart.
    pub state_dir: PathBuf,
    pub timeout: Duration,
}

impl Config {
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Config {
            api_url: normalize_api_url(api_url)?,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Reads `STOREFRONT_API_URL`, `STOREFRONT_STATE_DIR` and
    /// `STOREFRONT_TIMEOUT_SECS`, falling back to defaults for unset ones.
    /// A `.env` file, if present, is loaded first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let api_url = env::var("STOREFRONT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut config = Config::new(&api_url)?;

        if let Ok(dir) = env::var("STOREFRONT_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = env::var("STOREFRONT_TIMEOUT_SECS") {
            config.timeout = parse_timeout(&raw)?;
        }
        Ok(config)
    }

    pub fn with_api_url(mut self, api_url: &str) -> Result<Self, ConfigError> {
        self.api_url = normalize_api_url(api_url)?;
        Ok(self)
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Absolute URL for a backend path given as segments, e.g.
    /// `["products", "detail", "7"]`. Each segment is percent-encoded, so
    /// ids can never step into another path.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ConfigError> {
        let invalid = || ConfigError::InvalidApiUrl(self.api_url.clone());
        let mut url = Url::parse(&self.api_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let has_scheme = trimmed.starts_with("http://") || trimmed.starts_with("https://");
    if !has_scheme || Url::parse(trimmed).is_err() {
        return Err(ConfigError::InvalidApiUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_loses_trailing_slash() {
        let config = Config::new("https://shop.test/api/").unwrap();
        assert_eq!(config.api_url, "https://shop.test/api");
        assert_eq!(
            config.endpoint(&["products", "list"]).unwrap().as_str(),
            "https://shop.test/api/products/list"
        );
    }

    #[test]
    fn path_segments_are_escaped() {
        let config = Config::new("http://localhost:3000").unwrap();
        let url = config.endpoint(&["orders", "detail", "a/b?c#d"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/orders/detail/a%2Fb%3Fc%23d");
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[test]
    fn api_url_needs_a_scheme() {
        assert_eq!(
            Config::new("shop.test"),
            Err(ConfigError::InvalidApiUrl("shop.test".into()))
        );
        assert!(Config::new("http://").is_err());
    }

    #[test]
    fn timeout_must_be_positive() {
        assert_eq!(parse_timeout(" 5 "), Ok(Duration::from_secs(5)));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }
}
