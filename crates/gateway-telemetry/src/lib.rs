//! # Gateway Telemetry
//!
//! Structured logging for the REST gateway.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_logging(&config).expect("Failed to init logging");
//!
//!     // Spans and events are now written to stdout
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `rest-gateway` | Service name attached to every event |
//! | `GATEWAY_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `GATEWAY_JSON_LOGS` | `false` | Emit one JSON object per line |
//! | `GATEWAY_LOG_TARGETS` | `true` | Include the event target in the output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, TelemetryGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter directive: {0}")]
    Filter(String),

    #[error("Failed to install global subscriber: {0}")]
    SubscriberInit(String),
}

/// Creates a span carrying the gateway component name.
///
/// ```rust,ignore
/// let _span = gateway_span!("dispatch", component = "dispatcher", type_name = %name).entered();
/// ```
#[macro_export]
macro_rules! gateway_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
