use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

const EMBEDDED_DEFAULT: &str = include_str!("../../../config/default.toml");

/// Upstream rate limit between two registration calls.
pub const MIN_INTER_BATCH_DELAY_MS: u64 = 3100;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub portal: PortalConfig,
    pub registration: RegistrationConfig,
    pub profile: ProfileConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    /// Landing page; the portal redirects from here to a generated login URL.
    pub root_url: Url,
    pub token_url: Url,
    pub identity_select_url: Url,
    /// Text present on the page that asks the user to pick a student identity.
    pub identity_marker: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_token_max_age")]
    pub token_max_age_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrationConfig {
    pub endpoint_url: Url,
    pub origin: String,
    pub referer: String,
    #[serde(default = "default_inter_batch_delay")]
    pub inter_batch_delay_ms: u64,
    #[serde(default = "default_max_transient_retries")]
    pub max_transient_retries: u32,
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// Protected student-info endpoints read with the session token.
#[derive(Debug, Deserialize, Clone)]
pub struct ProfileConfig {
    pub personal_info_url: Url,
    pub photo_url: Url,
    pub academic_status_url: Url,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Folder root for course shards. Must end with a slash so joins stay inside it.
    pub base_url: Url,
    pub most_recent_url: Url,
    pub course_codes_url: Url,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_user_agent() -> String { "BeeHub".to_string() }
fn default_request_timeout() -> u64 { 30 }
fn default_token_max_age() -> i64 { 240 }
fn default_inter_batch_delay() -> u64 { MIN_INTER_BATCH_DELAY_MS }
fn default_max_transient_retries() -> u32 { 3 }
fn default_stream_capacity() -> usize { 32 }
fn default_cache_ttl() -> u64 { 300 }

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The configuration shipped in `config/default.toml`.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(EMBEDDED_DEFAULT)
    }

    pub fn embedded_source() -> &'static str {
        EMBEDDED_DEFAULT
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.portal.token_max_age_minutes <= 0 {
            return Err(ConfigError::Invalid {
                field: "portal.token_max_age_minutes",
                reason: "must be positive".into(),
            });
        }
        if self.registration.inter_batch_delay_ms < MIN_INTER_BATCH_DELAY_MS {
            return Err(ConfigError::Invalid {
                field: "registration.inter_batch_delay_ms",
                reason: format!("must be at least {MIN_INTER_BATCH_DELAY_MS}"),
            });
        }
        if self.registration.stream_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "registration.stream_capacity",
                reason: "must be at least 1".into(),
            });
        }
        if !self.catalog.base_url.path().ends_with('/') {
            return Err(ConfigError::Invalid {
                field: "catalog.base_url",
                reason: "must end with '/'".into(),
            });
        }
        Ok(())
    }
}

impl PortalConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn token_max_age(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_max_age_minutes)
    }
}

impl RegistrationConfig {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl ProfileConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl CatalogConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
