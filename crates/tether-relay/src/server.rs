//! HTTP + WebSocket surface: session create/join, health, and `/ws`.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tether_common::SessionId;
use tether_config::{ConnectionConfig, RelayConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::connection::handle_connection;
use crate::reaper::spawn_reaper;
use crate::store::RelayStore;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: RelayStore,
    pub started: Instant,
    pub connections: ConnectionConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub success: bool,
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinSessionRequest {
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<serde_json::Value>,
}

/// What a join body asks for.
#[derive(Debug, PartialEq)]
enum JoinTarget {
    /// Absent, `null`, `false`, `0` or `""`.
    Missing,
    /// Present but can never name a session (a number, an object, ...).
    Unmatchable,
    Code(SessionId),
}

impl JoinSessionRequest {
    fn target(body: &[u8]) -> JoinTarget {
        // A missing or unparseable body is treated the same as a missing id.
        let value = serde_json::from_slice::<JoinSessionRequest>(body)
            .ok()
            .and_then(|req| req.session_id);

        match value {
            None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => {
                JoinTarget::Missing
            }
            Some(serde_json::Value::String(raw)) if raw.is_empty() => JoinTarget::Missing,
            Some(serde_json::Value::String(raw)) => JoinTarget::Code(SessionId::parse(&raw)),
            Some(serde_json::Value::Number(n)) if n.as_f64() == Some(0.0) => JoinTarget::Missing,
            Some(_) => JoinTarget::Unmatchable,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinSessionResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime: f64,
    pub sessions: usize,
    pub connections: usize,
}

/// Build the axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/session/create", post(create_session))
        .route("/api/session/join", post(join_session))
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// POST /api/session/create
async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session_id = state.store.create_session().await;
    Json(CreateSessionResponse {
        success: true,
        session_id,
        message: "Session created successfully".into(),
    })
}

/// POST /api/session/join: existence check only, binds nothing.
async fn join_session(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<JoinSessionResponse>) {
    let session_id = match JoinSessionRequest::target(&body) {
        JoinTarget::Missing => {
            return (
                StatusCode::BAD_REQUEST,
                Json(JoinSessionResponse {
                    success: false,
                    message: "Session ID required".into(),
                    session_id: None,
                }),
            );
        }
        JoinTarget::Code(id) if !id.is_empty() => Some(id),
        JoinTarget::Code(_) | JoinTarget::Unmatchable => None,
    };

    let Some(session_id) = session_id else {
        return not_found();
    };
    if !state.store.exists(&session_id).await {
        return not_found();
    }

    (
        StatusCode::OK,
        Json(JoinSessionResponse {
            success: true,
            message: "Session found, connect to WebSocket".into(),
            session_id: Some(session_id),
        }),
    )
}

fn not_found() -> (StatusCode, Json<JoinSessionResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(JoinSessionResponse {
            success: false,
            message: "Session not found".into(),
            session_id: None,
        }),
    )
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.store.stats().await;
    Json(HealthResponse {
        status: "healthy".into(),
        uptime: state.started.elapsed().as_secs_f64(),
        sessions: stats.sessions,
        connections: stats.connections,
    })
}

/// GET /ws: WebSocket upgrade.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, addr, state.store, state.connections))
}

/// The relay process: shared store plus its configuration.
pub struct RelayServer {
    config: RelayConfig,
    store: RelayStore,
    started: Instant,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        let store = RelayStore::new(config.sessions.code_length, config.connections.send_queue);
        Self {
            config,
            store,
            started: Instant::now(),
        }
    }

    pub fn store(&self) -> &RelayStore {
        &self.store
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        build_router(AppState {
            store: self.store.clone(),
            started: self.started,
            connections: self.config.connections.clone(),
        })
    }

    /// Bind the listener, then spawn the HTTP server and the reaper.
    pub async fn listen(&self) -> std::io::Result<ServerHandle> {
        let listener = TcpListener::bind(self.config.server.bind_addr()).await?;
        let addr = listener.local_addr()?;

        let reaper = spawn_reaper(
            self.store.clone(),
            self.config.sessions.reap_interval(),
            self.config.sessions.idle_ttl(),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = self.router();
        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        });

        tracing::info!(addr = %addr, "tether-relay listening");

        Ok(ServerHandle {
            addr,
            server,
            reaper,
            shutdown_tx,
        })
    }
}

/// Running server. Dropping it leaves the tasks running; call `shutdown`.
pub struct ServerHandle {
    pub addr: SocketAddr,
    server: JoinHandle<std::io::Result<()>>,
    reaper: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

impl ServerHandle {
    /// Stop accepting, stop the reaper, and wait for the HTTP server to exit.
    pub async fn shutdown(self) -> std::io::Result<()> {
        let _ = self.shutdown_tx.send(());
        self.reaper.abort();
        match self.server.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e)),
        }
    }
}
