//! Gateway error types.
//!
//! Every failure surfaced to a caller is an [`ApiError`] carrying exactly one
//! [`ApiErrorKind`]. Failures raised by backend targets arrive as
//! [`TargetError`] and are translated at the point of detection.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-facing error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiErrorKind {
    MissingParameters,
    BadParameters,
    InsufficientPermissions,
    IllegalLink,
    InternalError,
    Unauthenticated,
}

impl ApiErrorKind {
    /// Every kind, in wire-documentation order
    pub const ALL: [ApiErrorKind; 6] = [
        ApiErrorKind::MissingParameters,
        ApiErrorKind::BadParameters,
        ApiErrorKind::InsufficientPermissions,
        ApiErrorKind::IllegalLink,
        ApiErrorKind::InternalError,
        ApiErrorKind::Unauthenticated,
    ];

    /// HTTP status used when this kind is written to the wire
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorKind::MissingParameters | ApiErrorKind::BadParameters => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorKind::InsufficientPermissions => StatusCode::FORBIDDEN,
            ApiErrorKind::IllegalLink => StatusCode::NOT_FOUND,
            ApiErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorKind::MissingParameters => "MissingParameters",
            ApiErrorKind::BadParameters => "BadParameters",
            ApiErrorKind::InsufficientPermissions => "InsufficientPermissions",
            ApiErrorKind::IllegalLink => "IllegalLink",
            ApiErrorKind::InternalError => "InternalError",
            ApiErrorKind::Unauthenticated => "Unauthenticated",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API error with a kind and a human readable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Error kind
    pub kind: ApiErrorKind,
    /// Error message
    pub message: String,
    /// Overrides the status derived from `kind` (used for auth failures)
    status: Option<StatusCode>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// A required value is absent
    pub fn missing_parameters(details: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::MissingParameters, details)
    }

    /// A value is present but unusable
    pub fn bad_parameters(details: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BadParameters, details)
    }

    /// The target refused the caller
    pub fn insufficient_permissions(details: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InsufficientPermissions, details)
    }

    /// Navigation or link resolution failed inside the target
    pub fn illegal_link(details: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::IllegalLink, details)
    }

    /// Unexpected failure
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InternalError, details)
    }

    /// Credentials could not be read at all
    pub fn unauthenticated(details: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unauthenticated, details)
    }

    /// Translate a backend failure raised while running `operation`.
    ///
    /// permission → InsufficientPermissions, empty input → MissingParameters,
    /// other input → BadParameters, link → IllegalLink, system → BadParameters,
    /// anything else → InternalError.
    pub fn from_target(operation: &str, error: &TargetError) -> Self {
        let message = format!("could not execute {}", operation);
        match error {
            TargetError::PermissionDenied(_) => Self::insufficient_permissions(message),
            TargetError::UserInput {
                fault: InputFault::Empty,
                ..
            } => Self::missing_parameters(message),
            TargetError::UserInput { .. } => Self::bad_parameters(message),
            TargetError::IllegalLink(_) => Self::illegal_link(message),
            TargetError::System(_) => Self::bad_parameters(message),
            TargetError::Other(_) => Self::internal(message),
        }
    }

    /// Force the HTTP status regardless of kind
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or_else(|| self.kind.status())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ApiError", 3)?;
        state.serialize_field("status", "failed")?;
        state.serialize_field("code", &self.kind)?;
        state.serialize_field("message", &self.message)?;
        state.end()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::to_vec_pretty(&self).unwrap_or_default();

        let mut response = Response::new(axum::body::Body::from(body));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"api\""),
            );
        }
        response
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Why a piece of user input was rejected by a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFault {
    /// The value was absent
    Empty,
    /// The value was present but rejected
    Invalid(String),
}

impl fmt::Display for InputFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFault::Empty => f.write_str("empty"),
            InputFault::Invalid(reason) => write!(f, "invalid ({})", reason),
        }
    }
}

/// Failures raised by backend targets during construction or invocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// The caller may not perform the operation
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Structural or input validation failed
    #[error("input '{field}' is {fault}")]
    UserInput { field: String, fault: InputFault },

    /// A referenced object could not be navigated to
    #[error("illegal link: {0}")]
    IllegalLink(String),

    /// Generic system failure inside the target
    #[error("system failure: {0}")]
    System(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl TargetError {
    pub fn empty(field: impl Into<String>) -> Self {
        TargetError::UserInput {
            field: field.into(),
            fault: InputFault::Empty,
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        TargetError::UserInput {
            field: field.into(),
            fault: InputFault::Invalid(reason.into()),
        }
    }
}

/// Gateway-level errors (startup and serving, not caller-facing)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Registry was built inconsistently
    #[error("registry error: {0}")]
    Registry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_status_mapping() {
        assert_eq!(
            ApiErrorKind::MissingParameters.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiErrorKind::BadParameters.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiErrorKind::InsufficientPermissions.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiErrorKind::IllegalLink.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiErrorKind::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiErrorKind::Unauthenticated.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::bad_parameters("invalid parameter className \"Foo\"");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["code"], "BadParameters");
        assert_eq!(json["message"], "invalid parameter className \"Foo\"");
    }

    #[test]
    fn test_target_error_mapping() {
        let cases = [
            (
                TargetError::PermissionDenied("nope".into()),
                ApiErrorKind::InsufficientPermissions,
            ),
            (TargetError::empty("title"), ApiErrorKind::MissingParameters),
            (
                TargetError::invalid("title", "too long"),
                ApiErrorKind::BadParameters,
            ),
            (
                TargetError::IllegalLink("thread 9".into()),
                ApiErrorKind::IllegalLink,
            ),
            (
                TargetError::System("db down".into()),
                ApiErrorKind::BadParameters,
            ),
            (TargetError::Other("boom".into()), ApiErrorKind::InternalError),
        ];

        for (target, expected) in cases {
            let err = ApiError::from_target("update", &target);
            assert_eq!(err.kind, expected, "{:?}", target);
            assert_eq!(err.message, "could not execute update");
        }
    }

    #[test]
    fn test_status_override() {
        let err = ApiError::bad_parameters("password invalid").with_status(StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind, ApiErrorKind::BadParameters);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_into_response_sets_auth_header() {
        let response = ApiError::unauthenticated("no credentials").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
