use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use lane_racer_rust_server::config::ServerConfig;
use lane_racer_rust_server::error::SessionError;
use lane_racer_rust_server::server_protocol::{parse_client_message, ParsedClientMessage};
use lane_racer_rust_server::server_utils::make_id;
use lane_racer_rust_server::session::{OutboundMessage, Session, OUTBOUND_QUEUE_CAPACITY};
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type SharedSession = Arc<Mutex<Session>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();
    let rules = config.rules();
    let tick_ms = rules.tick_ms();
    info!(
        variant = ?rules.variant,
        end_condition = ?rules.end_condition,
        tick_rate = rules.tick_rate,
        seed = ?config.seed,
        "session configured"
    );

    let session = Arc::new(Mutex::new(Session::new(rules, config.seed)));
    start_tick_loop(session.clone(), tick_ms);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(session);

    let app = if let Some(static_dir) = resolve_static_dir(config.static_dir.clone()) {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.to_string_lossy(), "serving static client");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        app
    };

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(addr = %bind_addr, "listening");
    axum::serve(listener, app)
        .await
        .context("server runtime failed")?;
    Ok(())
}

fn resolve_static_dir(configured: Option<PathBuf>) -> Option<PathBuf> {
    let path = configured?;
    if path.join("index.html").is_file() {
        return Some(path);
    }
    warn!(root = %path.to_string_lossy(), "static dir has no index.html, not serving it");
    None
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(session): State<SharedSession>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(session, socket))
}

async fn handle_socket(session: SharedSession, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_QUEUE_CAPACITY);
    session.lock().await.connect(&client_id, tx);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    // The session owns the only sender, so this task ends once the
    // connection is released or a socket write fails.
    let mut writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            received = ws_receiver.next() => {
                let Some(Ok(message)) = received else {
                    break;
                };
                match message {
                    Message::Text(raw) => {
                        handle_client_message(&session, &client_id, raw.as_str()).await;
                    }
                    Message::Binary(raw) => match std::str::from_utf8(&raw) {
                        Ok(text) => handle_client_message(&session, &client_id, text).await,
                        Err(_) => session.lock().await.notify_invalid_message(&client_id),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = &mut writer => break,
        }
    }

    handle_disconnect(&session, &client_id).await;
    writer.abort();
}

async fn handle_client_message(session: &SharedSession, client_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        debug!(client_id, "undecodable message");
        session.lock().await.notify_invalid_message(client_id);
        return;
    };

    let mut guard = session.lock().await;
    let result = match message {
        ParsedClientMessage::Join { display_name } => {
            guard.join(client_id, &display_name).map(|_| ())
        }
        ParsedClientMessage::Move { x } => guard.move_player(client_id, x).map(|_| ()),
    };
    drop(guard);

    match result {
        Ok(()) => {}
        Err(SessionError::InvalidCommand(reason)) => {
            debug!(client_id, reason, "command ignored");
        }
        Err(err) => info!(client_id, %err, "command rejected"),
    }
}

async fn handle_disconnect(session: &SharedSession, client_id: &str) {
    let outcome = session.lock().await.release(client_id);
    match outcome {
        Ok(outcome) => debug!(client_id, ?outcome, "connection closed"),
        Err(err) => warn!(client_id, %err, "match reset, waiting for players"),
    }
}

fn start_tick_loop(session: SharedSession, tick_ms: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            session.lock().await.tick();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_static_dir_is_not_served() {
        assert_eq!(resolve_static_dir(None), None);
        let missing = std::env::temp_dir().join(make_id("lane-racer-missing"));
        assert_eq!(resolve_static_dir(Some(missing)), None);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_through_shared_lock() {
        let session: SharedSession = Arc::new(Mutex::new(Session::new(
            lane_racer_rust_server::constants::GameRules::default(),
            Some(1),
        )));
        let (tx, _rx) = mpsc::channel(8);
        session.lock().await.connect("c1", tx);
        handle_client_message(&session, "c1", r#"{"type":"join","displayName":"A"}"#).await;
        assert_eq!(session.lock().await.slot_of("c1"), Some(1));

        handle_disconnect(&session, "c1").await;
        handle_disconnect(&session, "c1").await;
        assert_eq!(session.lock().await.bound_count(), 0);
    }
}
