/*!
Contrôleur HTTP minimal pour tests d'intégration

Serveur Axum sur un port local éphémère :
- `POST /v1/collectors/{name}/heartbeat` enregistre le payload reçu
- header `Authorization` obligatoire (token configuré au démarrage)
- réponse configurable : echo des changements, réponse fixe, ou code HTTP d'erreur
*/

use anyhow::{Context, Result};
use axum::extract::{Path, Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use refocus_collector::{HeartbeatPayload, HeartbeatResponse};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Heartbeat reçu par le stub
#[derive(Debug, Clone)]
pub struct ReceivedHeartbeat {
    pub collector: String,
    pub payload: HeartbeatPayload,
}

#[derive(Debug, Clone)]
enum StubReply {
    Echo,
    Respond(HeartbeatResponse),
    Status(StatusCode),
}

#[derive(Clone)]
struct StubState {
    token: String,
    received: Arc<Mutex<Vec<ReceivedHeartbeat>>>,
    reply: Arc<Mutex<StubReply>>,
}

/// Contrôleur lancé en tâche de fond, arrêté au drop
pub struct ControllerStub {
    addr: SocketAddr,
    state: StubState,
    handle: JoinHandle<()>,
}

impl ControllerStub {
    /// Démarre le stub sur 127.0.0.1 avec un port libre
    pub async fn start(token: &str) -> Result<Self> {
        let state = StubState {
            token: token.to_string(),
            received: Arc::new(Mutex::new(Vec::new())),
            reply: Arc::new(Mutex::new(StubReply::Echo)),
        };

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind controller stub")?;
        let addr = listener.local_addr()?;

        let app = build_router(state.clone());
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("[stub] server error: {}", e);
            }
        });

        log::info!("[stub] controller listening on http://{}", addr);
        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// URL de base à mettre dans `refocus.url`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn received(&self) -> Vec<ReceivedHeartbeat> {
        self.state.received.lock().clone()
    }

    pub fn echo(&self) {
        *self.state.reply.lock() = StubReply::Echo;
    }

    pub fn respond_with(&self, response: HeartbeatResponse) {
        *self.state.reply.lock() = StubReply::Respond(response);
    }

    pub fn fail_with(&self, status: StatusCode) {
        *self.state.reply.lock() = StubReply::Status(status);
    }
}

impl Drop for ControllerStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn build_router(state: StubState) -> Router {
    Router::new()
        .route("/v1/collectors/{name}/heartbeat", post(heartbeat))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

async fn require_token(
    State(state): State<StubState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let ok = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == state.token)
        .unwrap_or(false);

    if !ok {
        log::warn!("[stub] rejected request without valid token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

async fn heartbeat(
    State(state): State<StubState>,
    Path(collector): Path<String>,
    Json(payload): Json<HeartbeatPayload>,
) -> Result<Json<HeartbeatResponse>, StatusCode> {
    let reply = state.reply.lock().clone();

    state.received.lock().push(ReceivedHeartbeat {
        collector,
        payload: payload.clone(),
    });

    match reply {
        StubReply::Echo => Ok(Json(HeartbeatResponse::echo(&payload))),
        StubReply::Respond(response) => Ok(Json(response)),
        StubReply::Status(status) => Err(status),
    }
}
