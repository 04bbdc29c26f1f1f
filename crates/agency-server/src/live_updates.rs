//! WebSocket push of content changes.
//!
//! A client connects to `/ws/content?path=/about` and receives one
//! `{"type":"changed"}` message per change to that page.

use std::sync::Arc;

use agency_content::{ChangeOrigin, ContentChange, Subscription};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::handlers::to_page_path;
use crate::state::AppState;

/// Query of GET /ws/content.
#[derive(Debug, Deserialize)]
pub(crate) struct ContentQuery {
    path: String,
}

/// Message pushed to clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum LiveMessage<'a> {
    Changed {
        path: &'a str,
        origin: ChangeOrigin,
    },
}

impl<'a> From<&'a ContentChange> for LiveMessage<'a> {
    fn from(change: &'a ContentChange) -> Self {
        Self::Changed {
            path: &change.path,
            origin: change.origin,
        }
    }
}

/// Handle WebSocket upgrade for content updates.
///
/// Subscribes before upgrading so a failed store watch is reported as an
/// HTTP error instead of a silent socket.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContentQuery>,
) -> Result<Response, ServerError> {
    let path = to_page_path(&query.path);
    let subscription = state.notifier().subscribe(&path)?;
    tracing::debug!(path, "Live update client connected");
    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, subscription))
        .into_response())
}

/// Forward changes until either side goes away.
async fn handle_socket(mut socket: WebSocket, mut subscription: Subscription) {
    loop {
        tokio::select! {
            change = subscription.changed() => {
                let Some(change) = change else {
                    break;
                };
                let text = match serde_json::to_string(&LiveMessage::from(&change)) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to encode change message");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            // Client messages only keep the connection alive
            result = socket.recv() => {
                match result {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
    tracing::debug!(path = subscription.path(), "Live update client disconnected");
}
