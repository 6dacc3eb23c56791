//! Credential handling for WattBox authentication
//!
//! Credentials are supplied by the host configuration; they are applied
//! by whichever authentication scheme the device negotiates and are
//! never written to logs.

use crate::error::{Result, WattBoxError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// WattBox credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct WattBoxCredentials {
    /// Username for device authentication
    pub username: String,

    /// Password for device authentication
    pub password: String,
}

impl WattBoxCredentials {
    /// Create credentials from username and password
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Load credentials from `WATTBOX_USERNAME` / `WATTBOX_PASSWORD`
    pub fn from_env() -> Result<Self> {
        let username = env::var("WATTBOX_USERNAME")
            .map_err(|_| WattBoxError::config("WATTBOX_USERNAME not set"))?;
        let password = env::var("WATTBOX_PASSWORD")
            .map_err(|_| WattBoxError::config("WATTBOX_PASSWORD not set"))?;
        Ok(Self { username, password })
    }

    /// Validate credentials
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(WattBoxError::config("Username cannot be empty"));
        }
        Ok(())
    }
}

// Manual Debug keeps the password out of logs and error chains.
impl fmt::Debug for WattBoxCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WattBoxCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let creds = WattBoxCredentials::new("admin", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn validate_rejects_empty_username() {
        let creds = WattBoxCredentials::new("", "secret");
        assert!(creds.validate().is_err());
    }
}
