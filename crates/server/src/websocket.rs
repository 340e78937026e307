//! WebSocket session endpoint
//!
//! One socket per call. Inbound messages are JSON commands (audio, text,
//! room membership, reset); outbound traffic is [`Envelope`]-shaped and
//! always flows through the connection registry so delivery failures tear
//! the session down in one place.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use callflow_core::Envelope;
use callflow_pipeline::PipelineResult;

use crate::connection::SessionSink;
use crate::state::AppState;

/// Inbound client commands
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    /// Caller audio, base64-encoded
    Audio { data: String },
    /// Caller text, bypassing transcription
    Text { content: String },
    JoinRoom { room: String },
    LeaveRoom { room: String },
    /// Forget this call's conversation history
    Reset,
}

/// WebSocket send half behind the registry's sink trait
struct WsSink {
    sender: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl SessionSink for WsSink {
    async fn send(&self, payload: &str) -> bool {
        self.sender
            .lock()
            .await
            .send(Message::Text(payload.to_string()))
            .await
            .is_ok()
    }
}

/// Upgrade handler for `/ws/:call_id`
///
/// `/ws/new` assigns a fresh call id; the id is echoed back in the
/// `connected` envelope.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Response, StatusCode> {
    if state.connections.count() >= state.settings.server.max_connections {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let call_id = if call_id == "new" {
        uuid::Uuid::new_v4().to_string()
    } else {
        call_id
    };
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, call_id, state)))
}

async fn handle_socket(socket: WebSocket, call_id: String, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let sink = Arc::new(WsSink {
        sender: Mutex::new(sender),
    });

    if let Err(e) = state.connections.connect(&call_id, sink) {
        tracing::warn!(call_id, error = %e, "Rejected session");
        return;
    }

    state
        .connections
        .send_to_session(&call_id, &Envelope::new("connected", &call_id))
        .await;

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                state.connections.record_inbound(&call_id);
                handle_client_message(&state, &call_id, &text).await;
            }
            Ok(Message::Binary(audio)) => {
                state.connections.record_inbound(&call_id);
                let result = state.pipeline.process_audio(&call_id, &audio).await;
                deliver_pipeline_result(&state, &call_id, result).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
        if !state.connections.is_connected(&call_id) {
            break;
        }
    }

    state.connections.disconnect(&call_id);
    // History is scoped to the connection lifecycle.
    state.pipeline.reset_conversation(&call_id);
}

async fn handle_client_message(state: &AppState, call_id: &str, text: &str) {
    let parsed: Result<ClientMessage, _> = serde_json::from_str(text);
    match parsed {
        Ok(ClientMessage::Audio { data }) => match BASE64.decode(data.as_bytes()) {
            Ok(audio) => {
                let result = state.pipeline.process_audio(call_id, &audio).await;
                deliver_pipeline_result(state, call_id, result).await;
            }
            Err(e) => {
                send_error(state, call_id, format!("Invalid base64 audio: {}", e)).await;
            }
        },
        Ok(ClientMessage::Text { content }) => {
            let result = state.pipeline.process_text(call_id, &content).await;
            deliver_pipeline_result(state, call_id, result).await;
        }
        Ok(ClientMessage::JoinRoom { room }) => {
            state.connections.join_room(call_id, &room);
            let ack = Envelope::new("room_joined", call_id).with_data(json!({ "room": room }));
            state.connections.send_to_session(call_id, &ack).await;
        }
        Ok(ClientMessage::LeaveRoom { room }) => {
            state.connections.leave_room(call_id, &room);
            let ack = Envelope::new("room_left", call_id).with_data(json!({ "room": room }));
            state.connections.send_to_session(call_id, &ack).await;
        }
        Ok(ClientMessage::Reset) => {
            state.pipeline.reset_conversation(call_id);
            let ack = Envelope::new("conversation_reset", call_id);
            state.connections.send_to_session(call_id, &ack).await;
        }
        Err(e) => {
            send_error(state, call_id, format!("Unrecognized message: {}", e)).await;
        }
    }
}

async fn deliver_pipeline_result(state: &AppState, call_id: &str, result: PipelineResult) {
    let audio_b64 = result.audio.as_deref().map(|a| BASE64.encode(a));
    let mut data = match serde_json::to_value(&result) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(call_id, error = %e, "Pipeline result serialization failed");
            return;
        }
    };
    if let (Some(obj), Some(audio)) = (data.as_object_mut(), audio_b64) {
        obj.insert("audio".to_string(), json!(audio));
    }

    let kind = if result.success { "pipeline_result" } else { "pipeline_error" };
    let envelope = Envelope::new(kind, call_id).with_data(data);
    state.connections.send_to_session(call_id, &envelope).await;
}

async fn send_error(state: &AppState, call_id: &str, message: String) {
    tracing::debug!(call_id, %message, "Client message rejected");
    let envelope = Envelope::new("error", call_id).with_data(json!({ "message": message }));
    state.connections.send_to_session(call_id, &envelope).await;
}
