//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TOKEN_FILE: &str = ".nftmarket/session.json";
pub const DEFAULT_COOKIE_FILE: &str = ".nftmarket/cookies.json";
pub const DEFAULT_NFT_PAGE_SIZE: u32 = 24;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Timeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root without a trailing slash; endpoint paths are appended verbatim.
    pub base_url: String,
    pub timeouts: Timeouts,
    pub token_file: PathBuf,
    /// Where the refresh cookie is kept between CLI runs.
    pub cookie_file: PathBuf,
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeouts: Timeouts::default(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            cookie_file: PathBuf::from(DEFAULT_COOKIE_FILE),
            page_size: DEFAULT_NFT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// All optional:
    /// - `MARKET_API_BASE_URL`: default `http://127.0.0.1:8000/api`
    /// - `MARKET_REQUEST_TIMEOUT_SECS`: default 30
    /// - `MARKET_CONNECT_TIMEOUT_SECS`: default 10
    /// - `MARKET_TOKEN_FILE`: default `.nftmarket/session.json`
    /// - `MARKET_COOKIE_FILE`: default `.nftmarket/cookies.json`
    /// - `MARKET_NFT_PAGE_SIZE`: default 24
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a numeric variable is set
    /// but does not parse, or is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("MARKET_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned());
        let timeouts = Timeouts {
            request_secs: env_parse_nonzero("MARKET_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_nonzero("MARKET_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        let token_file = std::env::var("MARKET_TOKEN_FILE").map_or_else(|_| PathBuf::from(DEFAULT_TOKEN_FILE), PathBuf::from);
        let cookie_file = std::env::var("MARKET_COOKIE_FILE").map_or_else(|_| PathBuf::from(DEFAULT_COOKIE_FILE), PathBuf::from);
        let page_size = env_parse_nonzero("MARKET_NFT_PAGE_SIZE", DEFAULT_NFT_PAGE_SIZE)?;

        Ok(Self { base_url: normalize_base_url(&base_url), timeouts, token_file, cookie_file, page_size })
    }

    /// Replace the base URL, applying the same normalization as `from_env`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

fn env_parse<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(default),
    }
}

/// Like [`env_parse`], but zero is rejected. A zero timeout fails every
/// request and a zero page size never advances a listing.
fn env_parse_nonzero<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    let parsed = env_parse(var, default)?;
    if parsed == T::default() {
        let value = std::env::var(var).unwrap_or_default();
        return Err(ConfigError::InvalidValue { var, value });
    }
    Ok(parsed)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
