//! Client configuration
//!
//! Settings are resolved from built-in defaults overlaid with environment
//! variables carrying the `CLINIC_ADMIN_` prefix.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CLINIC_ADMIN_BASE_URL` | http://localhost:8000/api | Remote API root |
//! | `CLINIC_ADMIN_TIMEOUT_SECS` | 30 | Per-request timeout (seconds) |
//! | `CLINIC_ADMIN_FACILITY_ID` | unset | Facility scope for searches |
//! | `CLINIC_ADMIN_DEFAULT_PAGE_SIZE` | 20 | Default search page size |
//! | `CLINIC_ADMIN_CACHE_STALE_SECS` | 0 | Seconds a cached page is served without refetching |
//! | `CLINIC_ADMIN_TOKEN_PATH` | .clinic-admin/session.json | Persisted session file |

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use reqwest::Url;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CLINIC_ADMIN";

/// Configuration for talking to the clinic API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API root, e.g. "http://localhost:8000/api"
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Facility every search is scoped to, when set
    pub facility_id: Option<i64>,
    /// Page size used when a search does not specify one
    pub default_page_size: u32,
    /// How long a cached result page may be reused
    pub cache_stale_secs: u64,
    /// Where the session token is persisted between runs
    pub token_path: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            facility_id: None,
            default_page_size: 20,
            cache_stale_secs: 0,
            token_path: PathBuf::from(".clinic-admin/session.json"),
        }
    }
}

impl ApiConfig {
    /// Create a new ApiConfig from the process environment
    pub fn from_env() -> ApiResult<Self> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    /// Create a new ApiConfig from an explicit environment source
    pub fn from_environment(environment: Environment) -> ApiResult<Self> {
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("base_url", defaults.base_url)
            .and_then(|b| b.set_default("timeout_secs", defaults.timeout_secs as i64))
            .and_then(|b| b.set_default("default_page_size", defaults.default_page_size as i64))
            .and_then(|b| b.set_default("cache_stale_secs", defaults.cache_stale_secs as i64))
            .and_then(|b| {
                b.set_default(
                    "token_path",
                    defaults.token_path.to_string_lossy().into_owned(),
                )
            })
            .map_err(|e| ApiError::Configuration(e.to_string()))?
            .add_source(environment)
            .build()
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        let config: ApiConfig = settings
            .try_deserialize()
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check that the loaded values are usable
    pub fn validate(&self) -> ApiResult<()> {
        Url::parse(&self.base_url).map_err(|e| {
            ApiError::Configuration(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;

        if self.timeout_secs == 0 {
            return Err(ApiError::Configuration(
                "Timeout must be at least one second".to_string(),
            ));
        }

        if self.default_page_size == 0 {
            return Err(ApiError::Configuration(
                "Default page size must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Cache staleness window as a Duration
    pub fn cache_stale_after(&self) -> Duration {
        Duration::from_secs(self.cache_stale_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let mut map = config::Map::new();
        for (key, value) in vars {
            map.insert(format!("{}_{}", ENV_PREFIX, key), value.to_string());
        }
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_defaults_apply_without_variables() {
        let config = ApiConfig::from_environment(environment(&[])).expect("config");
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.facility_id, None);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.cache_stale_secs, 0);
        assert_eq!(config.token_path, PathBuf::from(".clinic-admin/session.json"));
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = ApiConfig::from_environment(environment(&[
            ("BASE_URL", "https://clinic.example.org/api"),
            ("TIMEOUT_SECS", "5"),
            ("FACILITY_ID", "12"),
            ("DEFAULT_PAGE_SIZE", "50"),
        ]))
        .expect("config");

        assert_eq!(config.base_url, "https://clinic.example.org/api");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.facility_id, Some(12));
        assert_eq!(config.default_page_size, 50);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = ApiConfig::from_environment(environment(&[("BASE_URL", "not a url")]))
            .expect_err("bad url");
        assert!(matches!(err, ApiError::Configuration(_)));

        let err = ApiConfig::from_environment(environment(&[("DEFAULT_PAGE_SIZE", "0")]))
            .expect_err("zero page size");
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        // SAFETY: serialized with every other test touching the environment
        unsafe { std::env::set_var("CLINIC_ADMIN_CACHE_STALE_SECS", "15") };
        let config = ApiConfig::from_env().expect("config");
        unsafe { std::env::remove_var("CLINIC_ADMIN_CACHE_STALE_SECS") };

        assert_eq!(config.cache_stale_after(), Duration::from_secs(15));
    }
}
