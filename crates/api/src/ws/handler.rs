use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use captioner_core::job_events::EVENT_SUBMIT;
use captioner_core::types::ClientId;
use futures::{SinkExt, StreamExt};
use serde_json::Value;

use crate::state::AppState;
use crate::transport::submission::{parse_submission, Envelope, Rejection, SubmissionError};

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single client connection after upgrade.
///
/// The connection gets a fresh [`ClientId`] and is registered with the
/// `WsManager`; a sender task forwards outbound events while this task
/// reads inbound frames. On close the client is deregistered and the pool
/// prunes its queued jobs.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let client = ClientId::new();
    tracing::info!(client = %client, "WebSocket connected");

    let mut rx = state.ws_manager.add(client).await;
    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(client = %client, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => handle_text(&state, client, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(client = %client, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(client = %client, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.ws_manager.remove(client).await;
    state.pool.client_disconnected(client);
    send_task.abort();
    tracing::info!(client = %client, "WebSocket disconnected");
}

/// Dispatch one inbound text frame. Malformed frames are logged and ignored.
async fn handle_text(state: &AppState, client: ClientId, text: &str) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(client = %client, error = %e, "Failed to parse client message");
            return;
        }
    };

    match envelope.event.as_deref() {
        Some(EVENT_SUBMIT) => handle_submission(state, client, envelope.data).await,
        Some(other) => {
            tracing::warn!(client = %client, event = other, "Unknown client event");
        }
        None => {
            tracing::warn!(client = %client, "Client message has no event type");
        }
    }
}

async fn handle_submission(state: &AppState, client: ClientId, data: Value) {
    let rejection = match parse_submission(data, client) {
        Ok(job) => {
            let id = job.id();
            tracing::info!(client = %client, job_id = id, prompt = %job.prompt(), "Submitting job");
            match state.pool.submit(job) {
                Ok(()) => return,
                Err(e) => {
                    tracing::error!(client = %client, job_id = id, error = %e, "Pool rejected job");
                    Rejection {
                        id: Some(id),
                        error: SubmissionError::ShuttingDown,
                    }
                }
            }
        }
        Err(rejection) => rejection,
    };

    tracing::warn!(
        client = %client,
        job_id = ?rejection.id,
        cause = %rejection.error,
        "Submission rejected",
    );
    state
        .ws_manager
        .send_to(client, rejection.to_event().to_message())
        .await;
}
