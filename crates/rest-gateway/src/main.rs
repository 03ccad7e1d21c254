//! REST gateway binary.
//!
//! Startup: logging → configuration (file + env) → registry → servers.
//! Stops on Ctrl-C.

use anyhow::{Context, Result};
use gateway_telemetry::{init_logging, TelemetryConfig};
use rest_gateway::{providers, GatewayConfig, RestGatewayService, TargetRegistry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _guard = init_logging(&telemetry).context("failed to initialize logging")?;

    let config = GatewayConfig::load().context("failed to load gateway configuration")?;
    info!(
        http = %config.http_addr(),
        admin = %config.admin_addr(),
        "Configuration loaded"
    );

    let registry = providers::register_builtin(TargetRegistry::builder())
        .build()
        .context("failed to build target registry")?;
    info!(types = registry.len(), "Target registry ready");

    let mut service = RestGatewayService::new(config, registry)?;

    tokio::select! {
        result = service.start() => {
            if let Err(e) = result {
                error!(error = %e, "Gateway stopped with an error");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    Ok(())
}
