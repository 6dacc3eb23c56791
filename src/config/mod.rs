//! Configuration for connecting to a WattBox device

pub mod credentials;

use crate::error::{Result, WattBoxError};
use serde::{Deserialize, Serialize};
use std::{env, time::Duration};
use url::Url;

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// WattBox device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WattBoxConfig {
    /// Device base URL (e.g., "http://192.168.1.100")
    pub url: Url,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Enable TLS certificate verification
    pub verify_ssl: bool,
}

impl Default for WattBoxConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1".parse().unwrap(),
            timeout: DEFAULT_TIMEOUT,
            verify_ssl: true,
        }
    }
}

impl WattBoxConfig {
    /// Build a configuration for a host string, defaulting the scheme to http
    pub fn for_host(host: &str) -> Result<Self> {
        let url = normalize_host(host)
            .parse()
            .map_err(|e| WattBoxError::config(format!("Invalid host {host}: {e}")))?;
        Ok(Self {
            url,
            ..Self::default()
        })
    }

    /// Load configuration from environment variables
    ///
    /// Honors `WATTBOX_URL` (or `WATTBOX_HOST`, scheme optional),
    /// `WATTBOX_TIMEOUT` (seconds) and `WATTBOX_VERIFY_SSL`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("WATTBOX_URL") {
            config.url = url
                .parse()
                .map_err(|e| WattBoxError::config(format!("Invalid WATTBOX_URL: {e}")))?;
        } else if let Ok(host) = env::var("WATTBOX_HOST") {
            config.url = normalize_host(&host)
                .parse()
                .map_err(|e| WattBoxError::config(format!("Invalid WATTBOX_HOST: {e}")))?;
        }

        if let Ok(timeout) = env::var("WATTBOX_TIMEOUT") {
            config.timeout = Duration::from_secs(
                timeout
                    .parse()
                    .map_err(|e| WattBoxError::config(format!("Invalid WATTBOX_TIMEOUT: {e}")))?,
            );
        }

        if let Ok(verify) = env::var("WATTBOX_VERIFY_SSL") {
            config.verify_ssl = verify
                .parse()
                .map_err(|e| WattBoxError::config(format!("Invalid WATTBOX_VERIFY_SSL: {e}")))?;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.scheme() != "http" && self.url.scheme() != "https" {
            return Err(WattBoxError::config("URL must use http or https scheme"));
        }

        if self.timeout.is_zero() {
            return Err(WattBoxError::config("Timeout must be greater than zero"));
        }

        Ok(())
    }
}

/// Normalize a host string into a URL string, defaulting to http
///
/// Devices in the field are usually reached by bare IP; a full URL is
/// accepted as-is so https deployments keep working.
pub fn normalize_host(host: &str) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
