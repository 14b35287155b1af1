//! Request middleware: bearer authentication and audit logging

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

use crate::auth::{self, Claims};
use crate::error::ApiError;
use crate::AppState;

/// The bearer token of a request, if its Authorization header carries one
fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Rejects requests without a valid token; stores the claims for handlers
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(&request) else {
        warn!(uri = %request.uri(), "request without bearer token");
        return Err(ApiError::Unauthorized);
    };

    let claims = auth::decode_token(token, &state.config.jwt_secret).map_err(|err| {
        warn!(%err, uri = %request.uri(), "token rejected");
        ApiError::Unauthorized
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Logs one line per request with the acting therapist and timing
pub async fn audit_log(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let therapist = request
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.sub.clone());

    let started = Instant::now();
    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        therapist = therapist.as_deref().unwrap_or("anonymous"),
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    response
}
