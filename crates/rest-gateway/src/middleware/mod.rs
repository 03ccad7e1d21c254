//! Middleware stack for the gateway.
//!
//! Layer order: Request → Tracing → Auth → Handler

pub mod auth;
pub mod metrics;
pub mod tracing;

pub use auth::{constant_time_compare, AuthGate, AuthLayer, Credentials};
pub use metrics::{GatewayMetrics, RequestTimer};
pub use tracing::TracingLayer;
