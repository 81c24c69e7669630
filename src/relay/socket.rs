//! Live viewer endpoint
//!
//! Each accepted WebSocket becomes a [`Connection`] in the registry. A
//! writer task drains the connection's queue into the socket while the
//! handler watches the read half for close and transport errors.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::api::ErrorResponse;
use super::registry::{ChannelSink, Connection, ConnectionRegistry};
use super::server::AppState;
use crate::metrics;
use crate::models::{Envelope, Frame};

/// Greeting sent to every viewer right after the handshake
pub const WELCOME_MESSAGE: &str = "Connected to the live research stream. Insights arrive as they are found.";

/// Whether a handshake from `origin` may open a live connection
///
/// No configured origin, or `*`, accepts everything. Requests without an
/// `Origin` header come from non-browser clients and are accepted.
pub fn origin_allowed(allowed: Option<&str>, origin: Option<&str>) -> bool {
    match (allowed, origin) {
        (None, _) | (Some("*"), _) | (_, None) => true,
        (Some(allowed), Some(origin)) => {
            allowed.trim_end_matches('/').eq_ignore_ascii_case(origin.trim_end_matches('/'))
        }
    }
}

/// WebSocket upgrade handler for `GET /ws`
pub async fn live_socket(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());

    if !origin_allowed(state.config.server.allowed_origin.as_deref(), origin) {
        tracing::warn!(origin = ?origin, "Rejected live connection from disallowed origin");
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Origin not allowed")),
        )
            .into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Create a viewer connection and register it
///
/// The welcome frame is queued before the connection becomes visible to the
/// broadcast bus, so it is always the first frame the viewer receives.
pub async fn open_connection(
    registry: &ConnectionRegistry,
    capacity: usize,
) -> (Connection, mpsc::Receiver<Frame>) {
    let (sink, rx) = ChannelSink::new(capacity);
    let connection = Connection::new(Arc::new(sink));

    match Envelope::system(WELCOME_MESSAGE).to_frame() {
        Ok(frame) => {
            if let Err(e) = connection.deliver(frame) {
                tracing::warn!(connection_id = %connection.id(), error = %e, "Failed to queue welcome message");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialize welcome message"),
    }

    registry.add(connection.clone()).await;
    (connection, rx)
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (connection, mut rx) =
        open_connection(&state.registry, state.config.server.send_queue_capacity).await;
    let id = connection.id();

    let viewers = state.registry.size().await;
    metrics::set_open_connections(viewers);
    tracing::info!(connection_id = %id, viewers, "Viewer connected");

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.to_string().into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(connection_id = %id, "Viewer closed the connection");
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(connection_id = %id, error = %e, "Live connection transport error");
                    break;
                }
                // Viewers are receive-only; pings are answered by axum
                Some(Ok(_)) => {}
            },
            _ = &mut writer => {
                tracing::debug!(connection_id = %id, "Writer stopped, socket no longer writable");
                break;
            }
        }
    }

    writer.abort();
    state.registry.remove(id).await;

    let viewers = state.registry.size().await;
    metrics::set_open_connections(viewers);
    tracing::info!(connection_id = %id, viewers, "Viewer disconnected");
}
