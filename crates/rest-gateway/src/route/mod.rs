//! One-way route resolver: request path → [`ApiRequestDescriptor`].
//!
//! Accepted shapes (leading/trailing `/` ignored):
//!
//! ```text
//! api
//! api/<type>
//! api/<type>/<id>
//! api/<type>/<id>/<operation>
//! api/<type>/<id>/<operation>/<parameters...>
//! api/<type>/<id>//<parameters...>
//! ```
//!
//! `<type>` is everything up to the first digit; its `/` separators become the
//! namespace separator `\`, so `api/wcf/data/user/User/1` targets
//! `wcf\data\user\User`. The resolver never builds paths.

use crate::domain::ApiRequestDescriptor;
use tracing::debug;

/// Literal marker every gateway path must contain
pub const API_SEGMENT: &str = "api";

/// Canonical namespace separator for type names
pub const NAMESPACE_SEPARATOR: char = '\\';

/// Route resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteResolver;

impl RouteResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a request path. `None` means the path is not a gateway route.
    pub fn resolve(&self, path: &str) -> Option<ApiRequestDescriptor> {
        if !path.contains(API_SEGMENT) {
            return None;
        }

        let normalized = path.trim_matches('/');
        if normalized == API_SEGMENT {
            debug!(path, "Resolved collection root");
            return Some(ApiRequestDescriptor::new(API_SEGMENT));
        }

        let prefix = "api/";
        let mut offset = 0;
        while let Some(pos) = normalized[offset..].find(prefix) {
            let start = offset + pos;
            if let Some(descriptor) = match_at(normalized, start, start + prefix.len()) {
                debug!(
                    path,
                    type_name = descriptor.type_name(),
                    id = descriptor.id(),
                    operation = descriptor.operation(),
                    "Resolved api route"
                );
                return Some(descriptor);
            }
            offset = start + 1;
        }

        debug!(path, "No api route matched");
        None
    }
}

/// Match `api/<type>(/?<id>(/<op>)?(/<rest>)?/?)?` with `api/` at `start`
/// and the type starting at `body`.
fn match_at(path: &str, start: usize, body: usize) -> Option<ApiRequestDescriptor> {
    let rest = &path[body..];

    let type_len = rest
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(rest.len());
    if type_len == 0 {
        return None;
    }

    let type_name = canonical_type_name(&rest[..type_len]);
    if type_name.is_empty() {
        return None;
    }

    let mut descriptor = ApiRequestDescriptor::new(&path[start..]).with_type_name(type_name);

    let after_type = &rest[type_len..];
    let id_len = after_type
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_type.len());
    if id_len == 0 {
        return Some(descriptor);
    }
    descriptor = descriptor.with_id(&after_type[..id_len]);

    let mut tail = &after_type[id_len..];

    // operation: a single non-empty segment
    if let Some(after_slash) = tail.strip_prefix('/') {
        let op_len = after_slash.find('/').unwrap_or(after_slash.len());
        if op_len > 0 {
            descriptor = descriptor.with_operation(&after_slash[..op_len]);
            tail = &after_slash[op_len..];
        }
    }

    // parameters: the remainder, opaque
    if let Some(remainder) = tail.strip_prefix('/') {
        let remainder = remainder.strip_suffix('/').unwrap_or(remainder);
        if !remainder.is_empty() {
            descriptor = descriptor.with_raw_parameters(remainder);
        }
    }

    Some(descriptor)
}

/// `wcf/data//user/User/` → `wcf\data\user\User`
fn canonical_type_name(raw: &str) -> String {
    raw.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(&NAMESPACE_SEPARATOR.to_string())
}
