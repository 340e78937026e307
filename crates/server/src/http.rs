//! HTTP surface
//!
//! REST endpoints for node execution and validation, session listing, and
//! health probes, plus the WebSocket upgrade route and the broadcast TTS
//! router.

use axum::{
    extract::{Json, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use callflow_engine::{node_config, validate_node_data, ExecutionContext, NodeType};

use crate::broadcast::broadcast_router;
use crate::state::AppState;
use crate::websocket::ws_handler;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.settings.server.cors_origins,
        state.settings.server.cors_enabled,
    );

    Router::new()
        // Node engine endpoints
        .route("/api/nodes/execute", post(execute_node))
        .route("/api/nodes/validate", post(validate_node))
        .route("/api/nodes/types", get(list_node_types))
        // Session endpoints
        .route("/api/sessions", get(list_sessions))
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Broadcast synthesis
        .merge(broadcast_router())
        // WebSocket
        .route("/ws/:call_id", get(ws_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// Disabled CORS means permissive (development only). With CORS enabled and
/// no origins configured, only localhost is allowed.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled, allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            let value = origin.parse::<HeaderValue>().ok();
            if value.is_none() {
                tracing::warn!(origin, "Ignoring invalid CORS origin");
            }
            value
        })
        .collect();

    if parsed.is_empty() {
        tracing::info!("No valid CORS origins configured, allowing localhost only");
        return CorsLayer::new()
            .allow_origin(
                "http://localhost:3000"
                    .parse::<HeaderValue>()
                    .expect("static origin parses"),
            )
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!(count = parsed.len(), "CORS origins configured");
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(true)
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    node_type: String,
    #[serde(default)]
    node_data: serde_json::Value,
    #[serde(default)]
    context: ExecutionContext,
}

/// Execute a single workflow node
async fn execute_node(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Json<serde_json::Value> {
    let result = state
        .engine
        .execute(&request.node_type, &request.node_data, &request.context)
        .await;
    Json(serde_json::to_value(&result).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Execution result serialization failed");
        json!({ "success": false, "action": "error", "error": "internal serialization error" })
    }))
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    node_type: String,
    #[serde(default)]
    node_data: serde_json::Value,
}

/// Validate node data without executing the node
async fn validate_node(
    Json(request): Json<ValidateRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let node_type =
        NodeType::parse(&request.node_type).ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let validation = validate_node_data(node_type, &request.node_data);
    Ok(Json(json!({
        "node_type": node_type,
        "valid": validation.valid,
        "data": validation.data,
        "errors": validation.errors,
    })))
}

/// List the node registry with display metadata
async fn list_node_types() -> Json<serde_json::Value> {
    let types: Vec<serde_json::Value> = NodeType::all()
        .iter()
        .map(|nt| {
            let config = node_config(*nt);
            json!({
                "type": nt.as_str(),
                "name": config.name,
                "category": config.category,
                "description": config.description,
                "outputs": config.outputs,
                "execution": config.execution,
            })
        })
        .collect();
    Json(json!({ "types": types, "count": types.len() }))
}

/// List live sessions
async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.connections.sessions();
    Json(json!({ "sessions": sessions, "count": sessions.len() }))
}

/// Health check with collaborator availability
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "collaborators": {
            "transcriber": state.transcriber.is_available().await,
            "reasoner": state.reasoner.is_available().await,
            "synthesizer": state.synthesizer.is_available().await,
        },
    }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ready",
        "sessions": state.connections.count(),
        "conversations": state.pipeline.active_conversations(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use callflow_config::Settings;
    use callflow_core::{
        ChatMessage, Reasoner, ReasonerReply, Synthesis, Synthesizer, Transcriber, Transcription,
    };
    use std::sync::Arc;

    struct NullTranscriber;

    #[async_trait]
    impl Transcriber for NullTranscriber {
        async fn transcribe(&self, _audio: &[u8], _language: &str) -> Transcription {
            Transcription::failure("not configured", 0.0)
        }
    }

    struct NullReasoner;

    #[async_trait]
    impl Reasoner for NullReasoner {
        async fn respond(
            &self,
            _text: &str,
            _call_id: &str,
            _history: &[ChatMessage],
        ) -> ReasonerReply {
            ReasonerReply {
                success: false,
                response: String::new(),
                tokens_used: 0,
                duration: 0.0,
                error: Some("not configured".into()),
            }
        }
    }

    struct NullSynthesizer;

    #[async_trait]
    impl Synthesizer for NullSynthesizer {
        async fn synthesize(&self, _text: &str) -> Synthesis {
            Synthesis::failure("not configured", 0.0)
        }
    }

    #[test]
    fn router_creation() {
        let state = AppState::new(
            Settings::default(),
            Arc::new(NullTranscriber),
            Arc::new(NullReasoner),
            Arc::new(NullSynthesizer),
        );
        let _ = create_router(state);
    }
}
