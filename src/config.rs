//! Configuration Module
//!
//! Loads [`AccessConfig`] from environment variables once, up front. Nothing in the
//! access layer reads the environment after that.

use crate::cache::CacheConfig;
use crate::resilience::rate_limiter::RateLimiterConfig;
use crate::resilience::retry::RetryPolicy;
use crate::{Error, ErrorContext, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_NOTES_BASE_URL: &str = "https://api.slite.com";
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_LLM_MODEL: &str = "gemini-1.5-flash";

/// Everything the access layer needs, as plain values.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Note service credential (`SLITE_API_KEY`)
    pub notes_api_key: Option<String>,
    /// Language model credential (`GEMINI_API_KEY`)
    pub llm_api_key: Option<String>,
    pub notes_base_url: String,
    pub llm_base_url: String,
    pub llm_model: String,
    /// Raw `LOG_LEVEL` value; see [`crate::logging::init`]
    pub log_level: String,
    pub notes_cache: CacheConfig,
    pub folders_cache: CacheConfig,
    pub rate_limit: RateLimiterConfig,
    pub retry: RetryPolicy,
    /// Per-request HTTP timeout; also bounds each retry attempt.
    pub http_timeout: Duration,
}

impl Default for AccessConfig {
    fn default() -> Self {
        let http_timeout = Duration::from_secs(30);
        Self {
            notes_api_key: None,
            llm_api_key: None,
            notes_base_url: DEFAULT_NOTES_BASE_URL.to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            log_level: "INFO".to_string(),
            notes_cache: CacheConfig::notes(),
            folders_cache: CacheConfig::folders(),
            rate_limit: RateLimiterConfig::default(),
            retry: RetryPolicy::default().with_attempt_timeout(http_timeout),
            http_timeout,
        }
    }
}

impl AccessConfig {
    /// Load from the process environment.
    ///
    /// # Environment Variables
    /// - `SLITE_API_KEY`, `GEMINI_API_KEY` - credentials (optional)
    /// - `NOTES_BASE_URL`, `LLM_BASE_URL`, `LLM_MODEL` - service endpoints
    /// - `LOG_LEVEL` - default `INFO`
    /// - `CACHE_TTL` (300), `FOLDER_CACHE_TTL` (600) - seconds
    /// - `NOTE_CACHE_CAPACITY` (100), `FOLDER_CACHE_CAPACITY` (50)
    /// - `RATE_LIMIT_MAX_REQUESTS` (60), `RATE_LIMIT_WINDOW_SECS` (60)
    /// - `RETRY_MAX_ATTEMPTS` (5), `RETRY_BASE_DELAY_MS` (1000), `RETRY_MAX_DELAY_MS` (60000)
    /// - `HTTP_TIMEOUT_SECS` (30)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary lookup function. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let notes_base_url = match get("NOTES_BASE_URL") {
            Some(v) => validate_url("NOTES_BASE_URL", v)?,
            None => defaults.notes_base_url,
        };
        let llm_base_url = match get("LLM_BASE_URL") {
            Some(v) => validate_url("LLM_BASE_URL", v)?,
            None => defaults.llm_base_url,
        };

        let http_timeout = Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 30u64)?.max(1));

        let notes_cache = CacheConfig::notes()
            .with_ttl(Duration::from_secs(parse_or(&get, "CACHE_TTL", 300u64)?))
            .with_capacity(parse_or(&get, "NOTE_CACHE_CAPACITY", 100usize)?);
        let folders_cache = CacheConfig::folders()
            .with_ttl(Duration::from_secs(parse_or(&get, "FOLDER_CACHE_TTL", 600u64)?))
            .with_capacity(parse_or(&get, "FOLDER_CACHE_CAPACITY", 50usize)?);

        let rate_limit = RateLimiterConfig::new(
            parse_or(&get, "RATE_LIMIT_MAX_REQUESTS", 60usize)?,
            Duration::from_secs(parse_or(&get, "RATE_LIMIT_WINDOW_SECS", 60u64)?.max(1)),
        );

        let retry = RetryPolicy::default()
            .with_max_attempts(parse_or(&get, "RETRY_MAX_ATTEMPTS", 5u32)?.max(1))
            .with_base_delay(Duration::from_millis(parse_or(&get, "RETRY_BASE_DELAY_MS", 1000u64)?))
            .with_max_delay(Duration::from_millis(parse_or(&get, "RETRY_MAX_DELAY_MS", 60_000u64)?))
            .with_attempt_timeout(http_timeout);

        Ok(Self {
            notes_api_key: get("SLITE_API_KEY"),
            llm_api_key: get("GEMINI_API_KEY"),
            notes_base_url,
            llm_base_url,
            llm_model: get("LLM_MODEL").unwrap_or(defaults.llm_model),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            notes_cache,
            folders_cache,
            rate_limit,
            retry,
            http_timeout,
        })
    }
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| {
            Error::configuration(
                format!("{} has invalid value '{}': {}", name, raw, e),
                ErrorContext::new().with_key(name).with_source("config"),
            )
        }),
    }
}

fn validate_url(name: &str, raw: String) -> Result<String> {
    let parsed = url::Url::parse(&raw).map_err(|e| {
        Error::configuration(
            format!("{} is not a valid URL: {}", name, e),
            ErrorContext::new().with_key(name).with_source("config"),
        )
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::configuration(
            format!("{} must use http or https, got '{}'", name, parsed.scheme()),
            ErrorContext::new().with_key(name).with_source("config"),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
