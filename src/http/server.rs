//! HTTP router setup.
//!
//! # Responsibilities
//! - Create the axum Router with the GraphQL endpoint and 404 fallback
//! - Wire up middleware (gate, request ID, tracing, timeout, metrics)
//! - Log request errors outside production

use axum::{
    error_handling::HandleErrorLayer,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::{header, HeaderMap, HeaderValue},
    middleware::{from_fn, from_fn_with_state},
    response::{Html, IntoResponse, Response},
    routing::get,
    BoxError, Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::trace::TraceLayer;

use crate::config::{Environment, GatewayConfig};
use crate::http::graphql::{GraphQlBody, GraphQlParams, GraphQlRequest, QueryExecutor, GRAPHIQL_PAGE};
use crate::http::middleware::drain_gate;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::ApiError;
use crate::lifecycle::LifecycleState;
use crate::net::connection::{track_in_flight, ConnectionTracker};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn QueryExecutor>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(executor: Arc<dyn QueryExecutor>, environment: Environment) -> Self {
        Self {
            executor,
            environment,
        }
    }

    fn respond(&self, headers: &HeaderMap, result: Result<Response, ApiError>) -> Response {
        match result {
            Ok(response) => response,
            Err(err) => {
                if !self.environment.is_production() {
                    tracing::error!(
                        request_id = %request_id(headers),
                        status = err.status.as_u16(),
                        error = %err,
                        "Request failed"
                    );
                }
                err.into_response()
            }
        }
    }
}

/// Build the gateway router.
///
/// The gate reading `lifecycle` is the outermost layer; `tracker` counts
/// requests that got past it. Every error the stack produces itself (404,
/// 405, 408, 503) is rendered as an [`ApiError`] body.
pub fn build_router(
    config: &GatewayConfig,
    state: AppState,
    lifecycle: LifecycleState,
    tracker: ConnectionTracker,
) -> Router {
    Router::new()
        .route(
            "/graphql",
            get(graphql_get)
                .post(graphql_post)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.limits.max_body_size))
        .layer(from_fn_with_state(tracker, track_in_flight))
        .layer(from_fn(metrics::track_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(timed_out))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.timeouts.request_secs,
                ))),
        )
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
        .layer(from_fn_with_state(lifecycle, drain_gate))
}

async fn graphql_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<GraphQlBody>, JsonRejection>,
) -> Response {
    let result = handle_post(&state, body).await;
    state.respond(&headers, result)
}

async fn handle_post(
    state: &AppState,
    body: Result<Json<GraphQlBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    execute(state, GraphQlRequest::try_from(body)?).await
}

async fn graphql_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<GraphQlParams>, QueryRejection>,
) -> Response {
    let result = handle_get(&state, &headers, params).await;
    state.respond(&headers, result)
}

async fn handle_get(
    state: &AppState,
    headers: &HeaderMap,
    params: Result<Query<GraphQlParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    if params.query.is_none() && state.environment.is_development() && accepts_html(headers) {
        return Ok(Html(GRAPHIQL_PAGE).into_response());
    }
    execute(state, GraphQlRequest::try_from(params)?).await
}

async fn execute(state: &AppState, request: GraphQlRequest) -> Result<Response, ApiError> {
    tracing::debug!(operation = ?request.operation_name, "Executing GraphQL operation");
    let result = state.executor.execute(request).await?;
    Ok(Json(result).into_response())
}

async fn not_found(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.respond(&headers, Err(ApiError::not_found()))
}

async fn method_not_allowed(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut response = state.respond(&headers, Err(ApiError::method_not_allowed()));
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET,POST"));
    response
}

async fn timed_out(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request timed out");
        ApiError::request_timeout()
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::with_declared_status(None, "Internal Server Error")
    }
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}
