//! Test a direct connection to a WattBox using environment configuration
//!
//! Reads `WATTBOX_HOST` (or `WATTBOX_URL`), `WATTBOX_USERNAME` and
//! `WATTBOX_PASSWORD`, then walks the full stack once: negotiation,
//! status fetch, and derived metrics.

use wattbox_client::{Result, WattBoxConfig, WattBoxCredentials, WattBoxHttpClient};
use tracing::{error, info};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("\n🧪 Testing WattBox Connection");
    println!("========================================\n");

    tokio::runtime::Runtime::new()?.block_on(async {
        let config = WattBoxConfig::from_env()?;
        let credentials = match WattBoxCredentials::from_env() {
            Ok(credentials) => credentials,
            Err(e) => {
                error!("❌ No credentials configured: {e}");
                error!("   Set: WATTBOX_HOST, WATTBOX_USERNAME, WATTBOX_PASSWORD");
                return Err(e);
            }
        };

        println!("🔗 Testing connection to:");
        println!("   Host: {}", config.url);
        println!("   User: {}", credentials.username);
        println!("   Pass: ***");
        println!();

        let client = WattBoxHttpClient::new(config, credentials)?;

        info!("🚀 Fetching device status...");
        match client.fetch_status().await {
            Ok(snapshot) => {
                let scheme = client
                    .auth_scheme()
                    .await
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                info!("✅ Connected (auth scheme: {scheme})");
                info!("   Outlets: {}", snapshot.outlets.len());
                for outlet in &snapshot.outlets {
                    info!(
                        "   #{} {:<20} on={} reset_only={} watts={:?} amps={:?}",
                        outlet.number,
                        outlet.name,
                        outlet.is_on,
                        outlet.is_reset_only,
                        outlet.watts,
                        outlet.amps
                    );
                }
                info!(
                    "   Voltage: {:?}  Total watts: {:?}  Total amps: {:?}",
                    snapshot.metrics.voltage,
                    snapshot.metrics.total_watts,
                    snapshot.metrics.total_amps
                );
            }
            Err(e) => {
                error!("❌ Status fetch failed: {e}");
                error!("💡 Check that:");
                error!("   - The WattBox is reachable at the configured host");
                error!("   - Your credentials are correct");
                error!("   - The web UI is enabled on the device");
                return Err(e);
            }
        }

        Ok(())
    })
}
