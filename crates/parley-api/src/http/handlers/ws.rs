//! WebSocket session endpoint.
//!
//! `/ws` upgrades a connection for the caller. Once connected, the handler:
//!
//! - **Forwards events:** registers an outbound queue with the session
//!   manager and writes every [`ServerEvent`] as a JSON text frame.
//! - **Receives commands:** parses incoming text frames as
//!   [`ClientCommand`]. Room and typing commands apply immediately;
//!   submissions are queued to a per-connection worker so the socket keeps
//!   reading (and answering pings) while a reply is generated.
//!
//! Closing the socket removes the connection from every room. Submissions
//! already queued still run and broadcast to the remaining members.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use parley_core::session::{ConnectionId, SubmitRequest};
use parley_types::event::{ClientCommand, ServerEvent};

use crate::http::extractors::caller::Caller;
use crate::state::AppState;

/// Upgrade an HTTP request to a chat session socket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, caller))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState, caller: Uuid) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let connection = state.sessions.connect(event_tx);
    tracing::info!(%connection, %caller, "websocket connected");

    let submissions = spawn_submission_worker(&state, connection);

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Failed to serialize ServerEvent: {err}");
                    }
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        process_command(&text, &state, connection, caller, &submissions);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    // Binary and protocol ping/pong frames are handled by axum.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.sessions.disconnect(connection);
    tracing::info!(%connection, "websocket disconnected");
}

/// Run this connection's submissions one after another.
fn spawn_submission_worker(
    state: &AppState,
    connection: ConnectionId,
) -> mpsc::UnboundedSender<SubmitRequest> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SubmitRequest>();
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            // Failures were already reported to this connection.
            let _ = sessions.submit_message(connection, request).await;
        }
    });
    tx
}

/// Parse and apply a single command from the client.
fn process_command(
    text: &str,
    state: &AppState,
    connection: ConnectionId,
    caller: Uuid,
    submissions: &mpsc::UnboundedSender<SubmitRequest>,
) {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(err) => {
            tracing::warn!(
                raw = %text,
                error = %err,
                "Ignoring malformed WebSocket command"
            );
            return;
        }
    };

    match command {
        ClientCommand::JoinRoom { conversation_id } => {
            state.sessions.join(connection, conversation_id);
        }
        ClientCommand::LeaveRoom { conversation_id } => {
            state.sessions.leave(connection, conversation_id);
        }
        ClientCommand::SubmitMessage {
            conversation_id,
            content,
            is_edit,
            target_message_id,
        } => {
            let request = SubmitRequest {
                conversation_id,
                content,
                caller_id: caller,
                is_edit,
                target_message_id,
            };
            if submissions.send(request).is_err() {
                tracing::warn!(%connection, "submission worker stopped, dropping message");
            }
        }
        ClientCommand::TypingStarted {
            conversation_id,
            role,
        } => {
            state.sessions.start_typing(connection, conversation_id, role);
        }
        ClientCommand::TypingStopped { conversation_id } => {
            state.sessions.stop_typing(connection, conversation_id);
        }
        ClientCommand::Ping => {
            state.sessions.rooms().send_to(connection, ServerEvent::Pong);
        }
    }
}
