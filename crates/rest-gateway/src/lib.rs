#![allow(missing_docs)]

//! REST gateway - exposes registered backend objects over `api/...` paths.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        REST GATEWAY                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐                         ┌─────────────┐     │
//! │  │    HTTP     │                         │    Admin    │     │
//! │  │  Port 8080  │                         │  Port 9090  │     │
//! │  └──────┬──────┘                         └─────────────┘     │
//! │         │                                                    │
//! │  ┌──────┴──────────────────────────┐                         │
//! │  │  Middleware: Tracing → Auth     │                         │
//! │  └──────┬──────────────────────────┘                         │
//! │         │                                                    │
//! │  Login side-channel → RouteResolver → Dispatcher             │
//! │                                          │                   │
//! │                              TargetRegistry (shapes, ops)    │
//! │                                          │                   │
//! │                    Serializer (RedactionTable, hooks)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rest_gateway::{providers, GatewayConfig, RestGatewayService, TargetRegistry};
//!
//! let config = GatewayConfig::load()?;
//! let registry = providers::register_builtin(TargetRegistry::builder()).build()?;
//! let mut service = RestGatewayService::new(config, registry)?;
//! service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod dispatch;
pub mod domain;
pub mod middleware;
pub mod providers;
pub mod registry;
pub mod route;
pub mod serializer;
pub mod service;
pub mod session;

// Re-exports for public API
pub use dispatch::{Arguments, Dispatcher, ResultBag};
pub use domain::config::GatewayConfig;
pub use domain::error::{ApiError, ApiErrorKind, ApiResult, GatewayError, TargetError};
pub use domain::{ApiObject, ApiRequestDescriptor, ObjectRef, Preparable, RequestFields, Value, ValueMap};
pub use middleware::GatewayMetrics;
pub use registry::{OperationDef, TargetRegistry, TargetShape, TargetType, TypeInfo};
pub use route::RouteResolver;
pub use serializer::{Document, RedactionPolicy, Serializer};
pub use service::{Gateway, RequestError, RestGatewayService};
pub use session::{SessionProvider, SessionUser};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
