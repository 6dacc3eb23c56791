//! WattBox client implementation for HTTP communication
//!
//! WattBox firmware exposes no documented API: state is scraped from the
//! generated `/main` status page, and outlet commands are plain GETs.
//! The submodules split that into authentication-scheme negotiation
//! ([`auth`]), the HTTP client itself ([`http_client`]) and the pure
//! status-page extractor ([`status_page`]).

pub mod auth;
pub mod http_client;
pub mod status_page;

use serde::{Deserialize, Serialize};

/// Status page path (GET)
pub(crate) const STATUS_PATH: &str = "/main";
/// Login page path (GET to seed cookies, POST with form credentials)
pub(crate) const LOGIN_PATH: &str = "/login";
/// Outlet command paths (GET with `o=<outlet>` query)
pub(crate) const OUTLET_ON_PATH: &str = "/outlet/on";
pub(crate) const OUTLET_OFF_PATH: &str = "/outlet/off";
pub(crate) const OUTLET_RESET_PATH: &str = "/outlet/reset";

/// State of a single outlet as shown on the status page
///
/// Records are constructed fresh on every parse and never mutated in
/// place; callers diff successive fetches by `number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletInfo {
    /// Device-assigned outlet index, 1-based, unique within a device
    pub number: u32,
    /// Display label, may be empty
    pub name: String,
    /// Whether the outlet is currently powered
    pub is_on: bool,
    /// Whether firmware disables direct on/off toggling (reset still works)
    pub is_reset_only: bool,
    /// Measured power draw in watts, if the page reports one
    pub watts: Option<f64>,
    /// Measured current in amps, if the page reports one
    pub amps: Option<f64>,
}

/// Aggregate device metrics from the status page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetrics {
    /// Input voltage in volts
    pub voltage: Option<f64>,
    /// Total power draw in watts
    pub total_watts: Option<f64>,
    /// Total current in amps
    pub total_amps: Option<f64>,
}

/// One status-page fetch: outlets and metrics derived from the same HTML
///
/// Deriving both views from a single page load avoids a race between
/// two page loads observing different device states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// All outlets, sorted ascending by number
    pub outlets: Vec<OutletInfo>,
    /// Aggregate metrics, with totals derived from outlets when the
    /// page omits them
    pub metrics: DeviceMetrics,
}

impl StatusSnapshot {
    /// Fill missing aggregate totals from the per-outlet readings.
    ///
    /// Outlets without a reading are excluded from the sum rather than
    /// counted as zero. Derived sums are rounded to 2 decimals to match
    /// the precision the page itself reports.
    pub(crate) fn fill_derived_totals(&mut self) {
        if self.metrics.total_watts.is_none() {
            let sum: f64 = self.outlets.iter().filter_map(|o| o.watts).sum();
            self.metrics.total_watts = Some(round2(sum));
        }
        if self.metrics.total_amps.is_none() {
            let sum: f64 = self.outlets.iter().filter_map(|o| o.amps).sum();
            self.metrics.total_amps = Some(round2(sum));
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
