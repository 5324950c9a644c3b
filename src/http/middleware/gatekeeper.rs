//! Gatekeeper middleware.
//! Thin adapter between axum and [`Gatekeeper::evaluate`].

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{uri::PathAndQuery, Request, Uri},
    middleware::{self, Next},
    response::Response,
    Router,
};

use crate::gatekeeper::Gatekeeper;
use crate::http::response::{apply_rate_limit_headers, malformed_path, render_decision};
use crate::observability::metrics;
use crate::routing::{CanonicalPath, PathError, Reason};

pub async fn gatekeeper_middleware(
    State(gatekeeper): State<Arc<Gatekeeper>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let canonical = CanonicalPath::parse(parts.uri.path())
        .and_then(|path| with_path(&parts.uri, &path).map(|uri| (uri, path)));
    let path = match canonical {
        Ok((uri, path)) => {
            parts.uri = uri;
            path
        }
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Rejecting malformed path");
            metrics::record_decision(Reason::MalformedPath.as_str());
            return malformed_path(&e);
        }
    };

    if gatekeeper.is_excluded(&path) {
        return next.run(Request::from_parts(parts, body)).await;
    }

    let evaluation = gatekeeper.evaluate(&path, &parts.headers).await;

    let mut response = match render_decision(&evaluation.decision.routing) {
        Some(response) => response,
        None => next.run(Request::from_parts(parts, body)).await,
    };

    // Rejections already carry their headers.
    if let Some(outcome) = evaluation.rate_limit.filter(|o| o.is_allowed()) {
        apply_rate_limit_headers(&mut response, &outcome);
    }
    response
}

/// The request URI with its path replaced by the canonical one, query kept.
fn with_path(uri: &Uri, path: &CanonicalPath) -> Result<Uri, PathError> {
    let encoded = path.to_uri_path();
    if encoded == uri.path() {
        return Ok(uri.clone());
    }
    let path_and_query = match uri.query() {
        Some(query) => format!("{encoded}?{query}"),
        None => encoded,
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query =
        Some(PathAndQuery::try_from(path_and_query).map_err(|_| PathError::DisallowedCharacter)?);
    Uri::from_parts(parts).map_err(|_| PathError::DisallowedCharacter)
}

/// Wrap an application router so every request passes the gatekeeper first.
pub fn protect<S>(router: Router<S>, gatekeeper: Arc<Gatekeeper>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(gatekeeper, gatekeeper_middleware))
}
