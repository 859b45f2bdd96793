//! Request gating while the service is not running.
//!
//! Installed as the outermost layer so no other middleware or handler sees a
//! request once draining has begun.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::response::ApiError;
use crate::lifecycle::LifecycleState;

pub const RESTARTING_MESSAGE: &str = "Server is in the process of restarting";

/// Pass requests through while Running; answer 503 with `Connection: close`
/// in every other state.
pub async fn drain_gate(
    State(lifecycle): State<LifecycleState>,
    req: Request,
    next: Next,
) -> Response {
    if lifecycle.is_running() {
        return next.run(req).await;
    }

    tracing::debug!(
        state = %lifecycle.current(),
        method = %req.method(),
        path = %req.uri().path(),
        "Rejecting request, service not running"
    );

    let mut response = ApiError::service_unavailable(RESTARTING_MESSAGE).into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}
