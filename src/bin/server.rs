use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chase_arcade_server::clock::FrameClock;
use chase_arcade_server::engine::GameEngine;
use chase_arcade_server::input::InputLatch;
use chase_arcade_server::rng::Rng;
use chase_arcade_server::server_protocol::{parse_client_message, ParsedClientMessage};
use chase_arcade_server::types::{GameConfig, RuntimeEvent, Trigger};
use chase_arcade_server::world::LevelTemplate;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// How often the tick task wakes to ask the frame clock for a tick.
const POLL_INTERVAL: Duration = Duration::from_millis(4);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    engine: GameEngine,
    input: InputLatch,
}

impl ServerState {
    fn new(engine: GameEngine) -> Self {
        Self {
            clients: HashMap::new(),
            engine,
            input: InputLatch::default(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let attract = std::env::var("ATTRACT_MODE")
        .map(|value| parse_flag(&value))
        .unwrap_or(false);

    let config = GameConfig {
        auto_start: attract,
        ..GameConfig::default()
    };
    let fps = config.fps;
    let template = Arc::new(LevelTemplate::standard().context("standard level is invalid")?);
    let engine = GameEngine::new(config, template, Rng::from_entropy())
        .context("failed to build game engine")?;

    let state = Arc::new(Mutex::new(ServerState::new(engine)));
    start_tick_loop(state.clone(), fps);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .route("/party/main", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.to_string_lossy(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(port, attract, "listening");
    axum::serve(listener, app)
        .await
        .context("server runtime failed")?;
    Ok(())
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn resolve_static_dir() -> Option<PathBuf> {
    let raw = std::env::var("STATIC_DIR").ok()?;
    let path = PathBuf::from(raw);
    if path.join("index.html").is_file() {
        return Some(path);
    }
    warn!(path = %path.to_string_lossy(), "STATIC_DIR has no index.html; not serving files");
    None
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<String>(256);

    {
        let mut guard = state.lock().await;
        guard
            .clients
            .insert(client_id.clone(), ClientContext { tx: tx.clone() });
        let map = map_message(&guard.engine);
        send_to_client(&mut guard, &client_id, &map, QueuePolicy::DisconnectOnFull);
        info!(client = %client_id, clients = guard.clients.len(), "client connected");
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&state, &client_id, raw.as_str()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = std::str::from_utf8(&raw) {
                    handle_client_message(&state, &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    handle_disconnect(state, &client_id).await;
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: &SharedState, client_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_error_to_client(state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    debug!(client = %client_id, ?message, "client message");
    match message {
        ParsedClientMessage::Press { direction } => guard.input.press(direction),
        ParsedClientMessage::Release { direction } => guard.input.release(direction),
        ParsedClientMessage::Start => guard.engine.handle_trigger(Trigger::Start),
        ParsedClientMessage::Pause => guard.engine.handle_trigger(Trigger::TogglePause),
    }
}

async fn handle_disconnect(state: SharedState, client_id: &str) {
    let mut guard = state.lock().await;
    guard.clients.remove(client_id);
    if guard.clients.is_empty() {
        guard.input.clear();
    }
    info!(client = %client_id, clients = guard.clients.len(), "client disconnected");
}

fn start_tick_loop(state: SharedState, fps: u64) {
    tokio::spawn(async move {
        let mut clock = FrameClock::new(fps);
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if !clock.poll(Instant::now()) {
                continue;
            }
            let mut guard = state.lock().await;
            tick_game(&mut guard);
        }
    });
}

fn tick_game(state: &mut ServerState) {
    if let Some(direction) = state.input.take() {
        state.engine.set_player_due(direction);
    }
    state.engine.step();
    let snapshot = state.engine.build_snapshot(true);

    let mut map_reset = false;
    for event in &snapshot.events {
        match event {
            RuntimeEvent::MapReset => map_reset = true,
            RuntimeEvent::GameOver { score, level } => {
                info!(tick = snapshot.tick, score, level, "game over broadcast");
            }
            _ => {}
        }
    }

    broadcast(
        state,
        &json!({
            "type": "gameState",
            "data": snapshot,
        }),
        QueuePolicy::DropOnFull,
    );
    if map_reset {
        let map = map_message(&state.engine);
        broadcast(state, &map, QueuePolicy::DisconnectOnFull);
    }
}

fn map_message(engine: &GameEngine) -> Value {
    json!({
        "type": "map",
        "data": engine.map_view(),
    })
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = state
        .clients
        .get(client_id)
        .is_some_and(|client| client.tx.try_send(message.to_string()).is_err());
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        warn!(client = %client_id, "outbound queue full; dropping client");
        state.clients.remove(client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if client.tx.try_send(payload.clone()).is_err() && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        warn!(client = %client_id, "outbound queue full; dropping client");
        state.clients.remove(&client_id);
    }
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}
