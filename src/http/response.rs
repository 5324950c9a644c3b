//! Turning gatekeeper decisions into HTTP responses.
//!
//! # Responsibilities
//! - Render redirects (307, `Location` with encoded query)
//! - Render the 429 JSON rejection with its retry headers
//! - Decorate pass-through responses with `X-RateLimit-*`
//! - Reject paths that have no canonical form

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;

use crate::routing::{PathError, RoutingDecision};
use crate::security::RateLimitOutcome;

/// Response for a terminal decision; `None` means continue to the handler.
pub fn render_decision(decision: &RoutingDecision) -> Option<Response> {
    match decision {
        RoutingDecision::Continue => None,
        RoutingDecision::Redirect { .. } => {
            let location = decision.location()?;
            Some(Redirect::temporary(&location).into_response())
        }
        RoutingDecision::Reject { status, body, headers } => {
            let mut response = (*status, Json(body.clone())).into_response();
            insert_headers(&mut response, headers);
            Some(response)
        }
    }
}

/// 400 for a request path that cannot be matched safely.
pub fn malformed_path(error: &PathError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Bad Request",
            "message": error.to_string(),
        })),
    )
        .into_response()
}

/// Add the limit/remaining/reset headers of an allowed request.
pub fn apply_rate_limit_headers(response: &mut Response, outcome: &RateLimitOutcome) {
    insert_headers(response, &outcome.headers());
}

fn insert_headers(response: &mut Response, headers: &[(&'static str, String)]) {
    let map = response.headers_mut();
    for (name, value) in headers {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                map.insert(HeaderName::from_static(*name), value);
            }
            Err(_) => tracing::warn!(header = *name, "Dropping unencodable header value"),
        }
    }
}
