use crate::error::{AppError, AppResult};
use crate::proxy::common::headers::GatewayIdentity;
use crate::proxy::config::ProxyConfig;
use crate::proxy::handlers::{
    health::health_check_handler,
    proxy::handle_proxy,
};
use crate::proxy::targets::TargetAllowlist;
use crate::proxy::upstream::UpstreamClient;
use axum::{
    routing::{any, get, MethodRouter},
    Router,
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Axum application state. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub allowlist: Arc<TargetAllowlist>,
    pub identity: Arc<GatewayIdentity>,
    pub upstream: Arc<UpstreamClient>,
    pub max_body_bytes: usize,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: &ProxyConfig, allowlist: TargetAllowlist) -> AppResult<Self> {
        let identity = GatewayIdentity::new(&config.public_origin)
            .map_err(|e| AppError::Config(format!("public_origin: {}", e)))?;

        Ok(Self {
            allowlist: Arc::new(allowlist),
            identity: Arc::new(identity),
            upstream: Arc::new(UpstreamClient::new(config)?),
            max_body_bytes: config.max_body_bytes,
            started_at: Utc::now(),
        })
    }
}

// A single `any` handler: a MethodRouter fallback would stamp `Allow` on every response
fn proxy_route() -> MethodRouter<AppState> {
    any(handle_proxy)
}

/// Gateway routes, nested under `mount_prefix` when it is non-empty
pub fn build_router(state: AppState, mount_prefix: &str) -> Router {
    let routes = Router::new()
        .route("/proxy/:target", proxy_route())
        .route("/proxy/:target/", proxy_route())
        .route("/proxy/:target/*rest", proxy_route())
        .route("/healthz", get(health_check_handler));

    let app = if mount_prefix.is_empty() {
        routes
    } else {
        Router::new().nest(mount_prefix, routes)
    };

    app.layer(axum::middleware::from_fn(
        crate::proxy::middleware::request_span_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl AxumServer {
    /// Start Axum server
    pub async fn start(
        config: &ProxyConfig,
        allowlist: TargetAllowlist,
    ) -> AppResult<(Self, tokio::task::JoinHandle<()>)> {
        let state = AppState::new(config, allowlist)?;
        let app = build_router(state, &config.mount_prefix);

        // Bind address
        let addr = format!("{}:{}", config.get_bind_address(), config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Server(format!("Failed to bind address {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            "Proxy gateway started at http://{}{}/proxy",
            local_addr,
            config.mount_prefix
        );

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        // Start server in new task
        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling finished or errored: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Proxy gateway stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((
            Self {
                shutdown_tx: Some(shutdown_tx),
                local_addr,
            },
            handle,
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
