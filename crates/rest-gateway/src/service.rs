//! Gateway service: per-request pipeline plus the HTTP and admin servers.
//!
//! Per request: auth (layer) → login side-channel → resolve route → merge
//! request fields → dispatch → serialize → 200 with a JSON document.

use crate::dispatch::{Dispatcher, ResultBag};
use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::domain::{ApiError, ApiErrorKind, RequestFields};
use crate::middleware::{AuthGate, AuthLayer, GatewayMetrics, RequestTimer, TracingLayer};
use crate::registry::TargetRegistry;
use crate::route::RouteResolver;
use crate::serializer::{AvatarUrlHook, Document, DocumentHook, RedactionPolicy, Serializer};
use crate::session::{self, NoSessions, SessionProvider};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tracing::{debug, error, info, warn};

/// Message of the fixed response for paths that are not gateway routes
pub const NO_ROUTE_MESSAGE: &str = "no api data provided";

/// Why a request produced no document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The path is not a gateway route
    NoRoute,
    Api(ApiError),
}

impl From<ApiError> for RequestError {
    fn from(error: ApiError) -> Self {
        RequestError::Api(error)
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        match self {
            RequestError::NoRoute => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "status": "failed",
                    "message": NO_ROUTE_MESSAGE,
                })),
            )
                .into_response(),
            RequestError::Api(error) => error.into_response(),
        }
    }
}

/// The per-request pipeline, independent of HTTP
pub struct Gateway {
    resolver: RouteResolver,
    dispatcher: Dispatcher,
    serializer: Serializer,
    sessions: Arc<dyn SessionProvider>,
}

impl Gateway {
    /// Build from configuration and a target registry. Redaction rules are
    /// compiled here, once.
    pub fn new(config: &GatewayConfig, registry: TargetRegistry) -> Self {
        let redaction = Arc::new(
            RedactionPolicy::builtin()
                .with_config(&config.redaction)
                .compile(&registry),
        );
        let registry = Arc::new(registry);

        Self {
            resolver: RouteResolver::new(),
            dispatcher: Dispatcher::new(registry, Arc::clone(&redaction)),
            serializer: Serializer::new(redaction, config.serializer.max_depth)
                .with_hook(Arc::new(AvatarUrlHook)),
            sessions: Arc::new(NoSessions),
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn DocumentHook>) -> Self {
        self.serializer = self.serializer.with_hook(hook);
        self
    }

    /// Run one authenticated request
    pub fn handle(&self, path: &str, fields: &RequestFields) -> Result<Document, RequestError> {
        let session = session::establish(self.sessions.as_ref(), fields);

        let descriptor = self
            .resolver
            .resolve(path)
            .ok_or(RequestError::NoRoute)?
            .with_request_fields(fields);

        let results = self.dispatcher.dispatch(&descriptor, fields)?;

        let mut bag = ResultBag::new();
        if let Some(user) = &session {
            user.write_into(&mut bag);
        }
        bag.extend(results);

        Ok(self.serializer.serialize(&bag)?)
    }
}

/// Gateway service: HTTP server for `api/...` plus the admin server
pub struct RestGatewayService {
    config: GatewayConfig,
    gateway: Arc<Gateway>,
    auth: AuthGate,
    metrics: Arc<GatewayMetrics>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RestGatewayService {
    /// Create a new service
    pub fn new(config: GatewayConfig, registry: TargetRegistry) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let gateway = Gateway::new(&config, registry);
        Ok(Self::with_gateway(config, gateway))
    }

    /// Create a service around a prepared gateway (custom sessions or hooks)
    pub fn with_gateway(config: GatewayConfig, gateway: Gateway) -> Self {
        let auth = AuthGate::new(config.auth.clone());
        Self {
            config,
            gateway: Arc::new(gateway),
            auth,
            metrics: Arc::new(GatewayMetrics::new()),
            shutdown_tx: None,
        }
    }

    /// Start the servers and wait for shutdown or a server error
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        info!("Starting REST gateway...");

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let http_addr = self.config.http_addr();
        let http_handle = if self.config.http.enabled {
            let listener = tokio::net::TcpListener::bind(http_addr)
                .await
                .map_err(|e| GatewayError::Bind(format!("{}: {}", http_addr, e)))?;
            info!(addr = %http_addr, "Starting HTTP server");
            let router = self.http_router();
            Some(tokio::spawn(async move { axum::serve(listener, router).await }))
        } else {
            None
        };

        let admin_addr = self.config.admin_addr();
        let _admin_handle = if self.config.admin.enabled {
            let listener = tokio::net::TcpListener::bind(admin_addr)
                .await
                .map_err(|e| GatewayError::Bind(format!("{}: {}", admin_addr, e)))?;
            info!(addr = %admin_addr, "Starting Admin server");
            let router = self.admin_router();
            Some(tokio::spawn(async move { axum::serve(listener, router).await }))
        } else {
            None
        };

        info!("REST gateway started successfully");

        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("Received shutdown signal");
            }
            result = async {
                match http_handle {
                    Some(h) => h.await,
                    None => std::future::pending().await,
                }
            } => {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(error = %e, "HTTP server error"),
                    Err(e) => error!(error = %e, "HTTP server task failed"),
                }
            }
        }

        info!("REST gateway stopped");
        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Router serving `/` and `/*path` for every HTTP method
    pub fn http_router(&self) -> Router {
        let state = AppState {
            gateway: Arc::clone(&self.gateway),
            metrics: Arc::clone(&self.metrics),
            pretty: self.config.serializer.pretty,
        };

        let middleware = ServiceBuilder::new()
            .layer(TracingLayer::new())
            .layer(AuthLayer::new(self.auth.clone()).with_metrics(Arc::clone(&self.metrics)));

        Router::new()
            .route("/", any(handle_api))
            .route("/*path", any(handle_api))
            .layer(middleware)
            .with_state(state)
    }

    /// Admin router (health and metrics)
    pub fn admin_router(&self) -> Router {
        let metrics = Arc::clone(&self.metrics);

        Router::new()
            .route("/health", get(health_check))
            .route(
                "/metrics",
                get(move || {
                    let metrics = Arc::clone(&metrics);
                    async move { Json(metrics.to_json()) }
                }),
            )
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    gateway: Arc<Gateway>,
    metrics: Arc<GatewayMetrics>,
    pretty: bool,
}

/// Handle an `api/...` request; the HTTP method does not matter
async fn handle_api(
    State(state): State<AppState>,
    path: Option<Path<String>>,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    let timer = RequestTimer::new(Arc::clone(&state.metrics));
    let path = path.map(|Path(p)| p).unwrap_or_default();

    let mut fields = match RequestFields::from_query_pairs(query) {
        Ok(fields) => fields,
        Err(error) => {
            debug!(reason = %error.message, "Query string rejected");
            timer.finish(Some(error.kind));
            return error.into_response();
        }
    };
    if !body.is_empty() {
        match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(json) => fields.merge_json_body(json),
            Err(e) => {
                debug!(error = %e, "Request body is not JSON");
                let error = ApiError::bad_parameters("request body is not valid JSON");
                timer.finish(Some(error.kind));
                return error.into_response();
            }
        }
    }

    let gateway = Arc::clone(&state.gateway);
    let outcome = tokio::task::spawn_blocking(move || gateway.handle(&path, &fields))
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "Dispatch task failed");
            Err(RequestError::Api(ApiError::internal("request could not be completed")))
        });

    match outcome {
        Ok(document) => {
            timer.finish(None);
            document_response(&document, state.pretty)
        }
        Err(RequestError::NoRoute) => {
            state.metrics.record_route_miss();
            RequestError::NoRoute.into_response()
        }
        Err(RequestError::Api(error)) => {
            warn!(kind = %error.kind, message = %error.message, "Request failed");
            timer.finish(Some(error.kind));
            error.into_response()
        }
    }
}

fn document_response(document: &Document, pretty: bool) -> Response {
    let encoded = if pretty {
        serde_json::to_vec_pretty(document)
    } else {
        serde_json::to_vec(document)
    };

    match encoded {
        Ok(body) => {
            let mut response = Response::new(axum::body::Body::from(body));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(e) => {
            error!(error = %e, "Response encoding failed");
            ApiError::new(ApiErrorKind::InternalError, "response could not be encoded").into_response()
        }
    }
}

/// Health check handler
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": crate::VERSION,
    }))
}
