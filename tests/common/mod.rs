//! Common test utilities

#![allow(dead_code)]

pub mod wattbox_mock;

use wattbox_client::{WattBoxConfig, WattBoxCredentials, WattBoxHttpClient};

/// Username the mock fixtures expect
pub const TEST_USERNAME: &str = "testuser";
/// Password the mock fixtures expect
pub const TEST_PASSWORD: &str = "testpass";

/// Build a client pointed at a mock server
pub fn test_client(url: &str) -> WattBoxHttpClient {
    let config = WattBoxConfig {
        url: url.parse().expect("mock server URL"),
        ..WattBoxConfig::default()
    };
    WattBoxHttpClient::new(config, WattBoxCredentials::new(TEST_USERNAME, TEST_PASSWORD))
        .expect("test client")
}
