//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: gatekeeper in front of an upstream forwarder
//! - Wire up middleware (request ID, tracing, timeout)
//! - Start the periodic rate-limit sweep
//! - Serve until the shutdown signal fires

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatekeeperConfig;
use crate::gatekeeper::Gatekeeper;
use crate::http::middleware::protect;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid upstream address '{0}'")]
    InvalidUpstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// State for the upstream forwarder.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

/// The edge gatekeeper service.
pub struct HttpServer {
    router: Router,
    config: GatekeeperConfig,
    gatekeeper: Arc<Gatekeeper>,
}

impl HttpServer {
    /// Create a server with the HTTP identity client and an in-memory store.
    pub fn new(config: GatekeeperConfig) -> Result<Self, ServerError> {
        let gatekeeper = Arc::new(Gatekeeper::from_config(&config));
        Self::with_gatekeeper(config, gatekeeper)
    }

    /// Create a server around an existing gatekeeper.
    pub fn with_gatekeeper(config: GatekeeperConfig, gatekeeper: Arc<Gatekeeper>) -> Result<Self, ServerError> {
        let upstream = Authority::from_str(&config.upstream.address)
            .map_err(|_| ServerError::InvalidUpstream(config.upstream.address.clone()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState { client, upstream };

        let router = Self::build_router(&config, state, gatekeeper.clone());
        Ok(Self {
            router,
            config,
            gatekeeper,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatekeeperConfig, state: AppState, gatekeeper: Arc<Gatekeeper>) -> Router {
        let app = Router::new().fallback(forward_handler).with_state(state);

        protect(app, gatekeeper)
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            identity_configured = self.gatekeeper.config_state().is_configured(),
            "Gatekeeper listening"
        );

        let sweeper = match self.config.rate_limit.sweep_interval_secs {
            0 => None,
            secs => Some(self.gatekeeper.limiter().spawn_sweeper(Duration::from_secs(secs))),
        };

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }

        tracing::info!("HTTP server stopped");
        result.map_err(ServerError::from)
    }

    pub fn gatekeeper(&self) -> Arc<Gatekeeper> {
        self.gatekeeper.clone()
    }
}

/// Forward an admitted request to the upstream application unchanged.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(error = %e, "Could not build upstream URI");
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16());
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(upstream = %state.upstream, error = %e, "Upstream error");
            metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16());
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
