// HTTP server assembly and lifecycle
//
// The router is built once from the compiled route table; every route is
// served by the same dispatch handler with its `Route` captured. The serve
// loop drives hyper directly so the connection keep-alive window is
// configurable.

pub mod handlers;
pub mod responses;

use axum::body::Bytes;
use axum::extract::RawPathParams;
use axum::http::{HeaderMap, Uri};
use axum::routing::{on, MethodFilter};
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::Service;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::capabilities::Dialect;
use crate::config::Config;
use crate::core::errors::BridgeError;
use crate::dispatch::client::ProxyClient;
use crate::driver::Driver;
use crate::routing::RouteTable;
use crate::server::responses::error_response;
use crate::session::SessionRegistry;

/// Shared application state, one instance behind an `Arc` for the whole
/// server.
pub struct AppState {
    pub driver: Arc<dyn Driver>,
    pub sessions: SessionRegistry,
    pub proxy_client: Arc<dyn ProxyClient>,
}

/// Build the axum router from a compiled route table.
pub fn build_router(
    state: Arc<AppState>,
    table: &RouteTable,
    config: &Config,
) -> Result<Router, BridgeError> {
    let mut router = Router::new();

    for route in table.iter() {
        let filter = MethodFilter::try_from(route.http_method().clone()).map_err(|e| {
            BridgeError::InvalidRouteSpec {
                command: route.command.clone(),
                reason: e.to_string(),
            }
        })?;

        let state = Arc::clone(&state);
        let route = Arc::clone(route);
        let full_pattern = route.full_pattern.clone();

        let handler = move |params: RawPathParams, uri: Uri, headers: HeaderMap, body: Bytes| {
            let state = Arc::clone(&state);
            let route = Arc::clone(&route);
            async move {
                let path_params: HashMap<String, String> = params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                handlers::dispatch(state, route, path_params, uri, headers, body).await
            }
        };

        router = router.route(&full_pattern, on(filter, handler));
    }

    // Anything outside the route table is an unknown command, not a bare
    // framework 404.
    router = router.fallback(|uri: Uri| async move {
        error_response(
            Dialect::W3c,
            None,
            &BridgeError::UnknownCommand(uri.path().to_string()),
        )
    });

    router = router
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.body_size_limit_bytes));

    if config.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    Ok(router)
}

/// Bind the listener and serve connections until a shutdown signal.
///
/// A bind failure is fatal and never retried. `keep_alive_secs` bounds how
/// long an idle connection may sit between requests.
pub async fn start_server(router: Router, config: &Config) -> Result<(), BridgeError> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| BridgeError::ServerBind {
            addr: addr.clone(),
            source,
        })?;

    info!(addr = %addr, base_path = %config.base_path, "server listening");

    let keep_alive = Duration::from_secs(config.keep_alive_secs);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping accept loop");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };
                debug!(peer = %peer, "accepted connection");

                let tower_service = router.clone();
                tokio::spawn(async move {
                    let socket = TokioIo::new(stream);
                    let hyper_service =
                        hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
                            tower_service.clone().call(request)
                        });

                    let mut builder = ConnectionBuilder::new(TokioExecutor::new());
                    builder
                        .http1()
                        .timer(TokioTimer::new())
                        .header_read_timeout(keep_alive)
                        .keep_alive(true);

                    if let Err(e) = builder
                        .serve_connection_with_upgrades(socket, hyper_service)
                        .await
                    {
                        debug!(peer = %peer, error = %e, "connection closed with error");
                    }
                });
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
