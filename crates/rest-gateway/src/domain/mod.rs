//! Domain types for the REST gateway.
//!
//! Configuration, errors, the request descriptor, request fields and the
//! dynamic value model shared by every component.

pub mod config;
pub mod correlation;
pub mod descriptor;
pub mod error;
pub mod params;
pub mod value;

// Re-exports for convenience
pub use config::{ConfigError, GatewayConfig};
pub use correlation::CorrelationId;
pub use descriptor::ApiRequestDescriptor;
pub use error::{ApiError, ApiErrorKind, ApiResult, GatewayError, InputFault, TargetError};
pub use params::RequestFields;
pub use value::{ApiObject, ObjectRef, Preparable, Value, ValueMap};
