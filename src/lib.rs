//! WattBox PDU client in Rust
//!
//! This crate talks to WattBox WB-800 power distribution units over
//! their embedded HTTP management interface. The firmware exposes no
//! documented API, so device state is scraped from the generated
//! status page, and the authentication handshake differs between
//! firmware revisions - HTTP Basic, HTTP Digest, or a cookie-backed
//! login form. The client probes once, commits to the accepted scheme
//! and reuses it for every call.
//!
//! Cumulative energy is not reported by the device; the
//! [`energy`] module integrates periodic watt samples into kWh with
//! bounded extrapolation across outages.
//!
//! Polling, scheduling, retries and persistence belong to the host:
//! every operation here is a single request/response, and the only
//! state hand-off is the [`energy::EnergySnapshot`] triple.
//!
//! # Example
//!
//! ```rust,no_run
//! use wattbox_client::{WattBoxConfig, WattBoxCredentials, WattBoxHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WattBoxConfig::for_host("192.168.1.100")?;
//!     let credentials = WattBoxCredentials::new("wattbox", "wattbox");
//!     let client = WattBoxHttpClient::new(config, credentials)?;
//!
//!     for outlet in client.fetch_outlets().await? {
//!         println!("#{} {} on={}", outlet.number, outlet.name, outlet.is_on);
//!     }
//!     client.reset(3).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod energy;
pub mod error;

// Re-export main types
pub use crate::{
    client::{
        auth::AuthScheme, http_client::WattBoxHttpClient, DeviceMetrics, OutletInfo,
        StatusSnapshot,
    },
    config::{credentials::WattBoxCredentials, WattBoxConfig},
    energy::{EnergyIntegrator, EnergyLedger, EnergySnapshot, MeteringPoint},
    error::{Result, WattBoxError},
};
