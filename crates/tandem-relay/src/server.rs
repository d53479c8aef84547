//! HTTP server: health endpoint plus the WebSocket upgrade route.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use tandem_translate::Translator;

use crate::config::RelayConfig;
use crate::health::health_check;
use crate::shutdown::ShutdownCoordinator;
use crate::state::RelayState;
use crate::websocket::session::run_ws_session;

/// Shared handler state for the axum router.
pub struct AppState {
    /// Relay runtime state shared by all connections.
    pub relay: Arc<RelayState>,
    /// Shutdown signal observed by WebSocket sessions.
    pub shutdown: CancellationToken,
    /// Server start time, for the health endpoint.
    pub start_time: Instant,
}

/// The relay HTTP + WebSocket server.
pub struct RelayServer {
    config: RelayConfig,
    state: Arc<AppState>,
    coordinator: ShutdownCoordinator,
}

impl RelayServer {
    /// Build a server from configuration and a translator backend.
    pub fn new(config: RelayConfig, translator: Arc<dyn Translator>) -> Self {
        let coordinator = ShutdownCoordinator::new();
        let relay = RelayState::new(&config, translator, coordinator.token());
        let state = Arc::new(AppState {
            relay,
            shutdown: coordinator.token(),
            start_time: Instant::now(),
        });
        Self {
            config,
            state,
            coordinator,
        }
    }

    /// The axum router, exposed separately for in-process tests.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.state))
    }

    /// Bind and serve. Returns the bound address and the serve task.
    ///
    /// With `port` 0 in the config the OS picks a free port; the returned
    /// address carries the real one.
    pub async fn listen(&self) -> io::Result<(SocketAddr, JoinHandle<io::Result<()>>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "relay listening");

        let router = self.router();
        let token = self.coordinator.token();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
        });
        Ok((addr, handle))
    }

    /// Begin graceful shutdown.
    pub fn shutdown(&self) {
        self.coordinator.shutdown();
    }

    /// Relay runtime state, for inspection in tests.
    pub fn relay_state(&self) -> Arc<RelayState> {
        Arc::clone(&self.state.relay)
    }
}

async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    let conn_id = format!("conn_{}", Uuid::now_v7());
    let relay = Arc::clone(&state.relay);
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| run_ws_session(socket, conn_id, relay, shutdown))
}
