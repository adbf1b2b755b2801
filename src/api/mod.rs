//! HTTP API for router telemetry and the snapshot store
//!
//! Axum only provides the socket and middleware here. Every request falls
//! through to a single handler that hands it to the [`Dispatcher`], which
//! matches it against the glob-pattern [`RouteTable`] in registration order.
//!
//! ## Architecture
//!
//! - **Axum** fallback handler with Tower middleware (trace, CORS)
//! - **RouteTable** with at most [`router::MAX_ROUTES`] entries
//! - **StorageHandle** for every database operation
//! - **BlockingPool** for `/proc` reads and shell commands
//!
//! ## Endpoints
//!
//! - `ANY /api`, `/api/help` - Route listing
//! - `/api/status`, `/api/health`, `/api/version` - Server status
//! - `/api/system/*`, `/api/network/*`, `/api/wireless/*` - Host state
//! - `/api/monitoring/*` - Live process and memory data
//! - `/api/database/*` - Snapshots, events, config, retention

#[cfg(feature = "api")]
pub mod blocking;
#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod request;
#[cfg(feature = "api")]
pub mod router;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;

#[cfg(feature = "api")]
pub use blocking::BlockingPool;
#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use request::ApiRequest;
#[cfg(feature = "api")]
pub use router::{Dispatcher, HttpMethod, MAX_ROUTES, RouteError, RouteInfo, RouteTable};
#[cfg(feature = "api")]
pub use state::ApiState;

#[cfg(feature = "api")]
use std::collections::HashMap;
use std::net::SocketAddr;

#[cfg(feature = "api")]
use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
};
#[cfg(feature = "api")]
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:9000")
    pub bind_addr: SocketAddr,

    /// Add the permissive CORS headers
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], crate::util::get_default_port())),
            enable_cors: true,
        }
    }
}

/// Build the axum app around a dispatcher
#[cfg(feature = "api")]
pub fn build_app(dispatcher: Dispatcher<ApiState>, enable_cors: bool) -> Router {
    use axum::http::{HeaderValue, header};
    use tower::ServiceBuilder;
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::set_header::SetResponseHeaderLayer;
    use tower_http::trace::TraceLayer;

    let mut app = Router::new()
        .fallback(dispatch_request)
        .with_state(dispatcher)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type, Authorization"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        app = app.layer(cors);
    }

    app
}

#[cfg(feature = "api")]
async fn dispatch_request(
    State(dispatcher): State<Dispatcher<ApiState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let query = match Query::<HashMap<String, String>>::try_from_uri(&uri) {
        Ok(Query(query)) => query,
        Err(e) => {
            return ApiError::InvalidRequest(format!("invalid query string: {e}")).into_response();
        }
    };

    dispatcher
        .dispatch(&method, uri.path().to_string(), query, body)
        .await
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(
    config: ApiConfig,
    dispatcher: Dispatcher<ApiState>,
) -> anyhow::Result<SocketAddr> {
    info!(
        "starting API server on {} with {} routes",
        config.bind_addr,
        dispatcher.routes().len()
    );

    let app = build_app(dispatcher, config.enable_cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
