//! Shared-secret authentication.
//!
//! Every request must carry HTTP Basic credentials matching the configured
//! pair. Reverse proxies that strip `Authorization` may forward it as
//! `Redirect-Http-Authorization`; that header is read first.

use super::metrics::GatewayMetrics;
use crate::domain::config::AuthConfig;
use crate::domain::ApiError;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Header used by proxies that rewrite `Authorization`
pub const REDIRECT_AUTHORIZATION: &str = "redirect-http-authorization";

const BASIC_MARKER: &str = "Basic ";

/// Credentials read from a request. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reasons credentials cannot be read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header is not valid UTF-8")]
    InvalidHeader,
    #[error("basic credentials are not valid base64")]
    InvalidEncoding,
    #[error("basic credentials are missing the ':' separator")]
    MissingSeparator,
}

/// Verifies request credentials against the configured secret pair
#[derive(Clone)]
pub struct AuthGate {
    secret: Arc<AuthConfig>,
}

impl AuthGate {
    pub fn new(secret: AuthConfig) -> Self {
        Self {
            secret: Arc::new(secret),
        }
    }

    /// Authenticate a request.
    ///
    /// Empty username/password → `MissingParameters`; mismatch →
    /// `BadParameters`; unreadable header → `Unauthenticated`. All errors
    /// are answered with 401.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Credentials, ApiError> {
        let credentials = read_credentials(headers)
            .map_err(|e| ApiError::unauthenticated(e.to_string()))
            .map_err(challenge)?;

        let (username, password) = credentials
            .map(|c| (c.username, c.password))
            .unwrap_or_default();

        if username.is_empty() {
            return Err(challenge(ApiError::missing_parameters(
                "username for API-authentication is missing",
            )));
        }
        if password.is_empty() {
            return Err(challenge(ApiError::missing_parameters(
                "password for API-authentication is missing",
            )));
        }

        // Both comparisons always run
        let username_ok = constant_time_compare(&username, self.secret.username.trim());
        let password_ok = constant_time_compare(&password, self.secret.password.trim());

        if !username_ok {
            return Err(challenge(ApiError::bad_parameters(
                "username for API-authentication is invalid",
            )));
        }
        if !password_ok {
            return Err(challenge(ApiError::bad_parameters(
                "password for API-authentication is invalid",
            )));
        }

        Ok(Credentials { username, password })
    }
}

fn challenge(error: ApiError) -> ApiError {
    error.with_status(StatusCode::UNAUTHORIZED)
}

/// Encoded part of a `Basic` header value, `None` for other schemes
fn basic_payload<'h>(headers: &'h HeaderMap, name: &str) -> Result<Option<&'h str>, AuthError> {
    match headers.get(name) {
        Some(value) => {
            let raw = value.to_str().map_err(|_| AuthError::InvalidHeader)?;
            Ok(raw.split_once(BASIC_MARKER).map(|(_, encoded)| encoded.trim()))
        }
        None => Ok(None),
    }
}

/// Read Basic credentials. A redirect header only wins when it carries a
/// `Basic` value; otherwise `Authorization` is used. `Ok(None)` when no
/// Basic credentials are present.
pub fn read_credentials(headers: &HeaderMap) -> Result<Option<Credentials>, AuthError> {
    let encoded = match basic_payload(headers, REDIRECT_AUTHORIZATION)? {
        Some(encoded) => encoded,
        None => match basic_payload(headers, header::AUTHORIZATION.as_str())? {
            Some(encoded) => encoded,
            None => return Ok(None),
        },
    };

    let decoded = STANDARD
        .decode(encoded)
        .map_err(|_| AuthError::InvalidEncoding)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidEncoding)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthError::MissingSeparator)?;

    Ok(Some(Credentials {
        username: username.trim().to_string(),
        password: password.trim().to_string(),
    }))
}

/// Constant-time string comparison to prevent timing attacks
///
/// Takes the same amount of time regardless of how many characters match.
/// Inputs are padded to a common length with distinct fill bytes so a length
/// difference cannot compare equal.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = std::cmp::max(a.len(), b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];

    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}

/// Authentication layer
#[derive(Clone)]
pub struct AuthLayer {
    gate: AuthGate,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl AuthLayer {
    pub fn new(gate: AuthGate) -> Self {
        Self {
            gate,
            metrics: None,
        }
    }

    /// Count rejected requests in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            gate: self.gate.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

/// Authentication service. Successful credentials are stored in the
/// request extensions.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    gate: AuthGate,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let metrics = self.metrics.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match gate.authenticate(req.headers()) {
                Ok(credentials) => {
                    debug!(username = %credentials.username, "API credentials accepted");
                    req.extensions_mut().insert(credentials);
                    inner.call(req).await
                }
                Err(error) => {
                    warn!(
                        path = %req.uri().path(),
                        kind = %error.kind,
                        reason = %error.message,
                        "API authentication rejected"
                    );
                    if let Some(metrics) = metrics {
                        metrics.record_rejection(error.kind);
                    }
                    Ok(error.into_response())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApiErrorKind;
    use axum::http::HeaderValue;

    fn gate() -> AuthGate {
        AuthGate::new(AuthConfig {
            username: "api-user".into(),
            password: "s3cret:with:colons".into(),
        })
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
    }

    fn headers(name: &str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret", "secret"));
        assert!(!constant_time_compare("secret", "Secret"));
        assert!(!constant_time_compare("secret", "secre"));
        assert!(!constant_time_compare("secret", "secrets"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_valid_credentials() {
        let creds = gate()
            .authenticate(&headers("authorization", &basic("api-user", "s3cret:with:colons")))
            .unwrap();
        assert_eq!(creds.username, "api-user");
    }

    #[test]
    fn test_redirect_header_is_accepted() {
        let creds = gate()
            .authenticate(&headers(
                REDIRECT_AUTHORIZATION,
                &basic("api-user", "s3cret:with:colons"),
            ))
            .unwrap();
        assert_eq!(creds.password, "s3cret:with:colons");
    }

    #[test]
    fn test_values_are_trimmed() {
        assert!(gate()
            .authenticate(&headers("authorization", &basic(" api-user ", "s3cret:with:colons ")))
            .is_ok());
    }

    #[test]
    fn test_missing_credentials() {
        let err = gate().authenticate(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::MissingParameters);
        assert_eq!(err.message, "username for API-authentication is missing");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = gate()
            .authenticate(&headers("authorization", &basic("api-user", "")))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::MissingParameters);
        assert_eq!(err.message, "password for API-authentication is missing");
    }

    #[test]
    fn test_wrong_credentials() {
        let err = gate()
            .authenticate(&headers("authorization", &basic("someone", "s3cret:with:colons")))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::BadParameters);
        assert_eq!(err.message, "username for API-authentication is invalid");

        let err = gate()
            .authenticate(&headers("authorization", &basic("api-user", "s3cret")))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::BadParameters);
        assert_eq!(err.message, "password for API-authentication is invalid");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_undecodable_header() {
        let err = gate()
            .authenticate(&headers("authorization", "Basic !!!not-base64!!!"))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Unauthenticated);

        let no_colon = format!("Basic {}", STANDARD.encode("nocolon"));
        assert_eq!(
            read_credentials(&headers("authorization", &no_colon)),
            Err(AuthError::MissingSeparator)
        );
    }

    #[test]
    fn test_non_basic_scheme_counts_as_missing() {
        let err = gate()
            .authenticate(&headers("authorization", "Bearer token"))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::MissingParameters);
    }

    #[test]
    fn test_non_basic_redirect_falls_back_to_authorization() {
        let mut both = headers("authorization", &basic("api-user", "s3cret:with:colons"));
        both.insert(REDIRECT_AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));

        let creds = gate().authenticate(&both).unwrap();
        assert_eq!(creds.username, "api-user");
    }

    #[test]
    fn test_basic_redirect_wins_over_authorization() {
        let mut both = headers("authorization", &basic("api-user", "s3cret:with:colons"));
        both.insert(
            REDIRECT_AUTHORIZATION,
            HeaderValue::from_str(&basic("someone", "else")).unwrap(),
        );

        let err = gate().authenticate(&both).unwrap_err();
        assert_eq!(err.message, "username for API-authentication is invalid");
    }
}
