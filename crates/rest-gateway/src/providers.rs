//! Built-in custom data providers.
//!
//! Providers are side-effect free functions returning a map. They are
//! registered as static operations and reached through the normal dispatch
//! path, e.g. `GET /api/rest/system/GatewayInfo/0/getVersion`.

use crate::domain::ValueMap;
use crate::registry::{OperationDef, RegistryBuilder};

pub const GATEWAY_INFO_TYPE: &str = "rest\\system\\GatewayInfo";

/// Register the gateway's own providers
pub fn register_builtin(builder: RegistryBuilder) -> RegistryBuilder {
    builder.provider(
        GATEWAY_INFO_TYPE,
        OperationDef::provider("getVersion", Vec::new(), |_args| {
            let mut info = ValueMap::new();
            info.insert("name", env!("CARGO_PKG_NAME"));
            info.insert("version", crate::VERSION);
            Ok(info)
        }),
    )
}
