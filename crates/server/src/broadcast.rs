//! Broadcast synthesis endpoint
//!
//! Renders announcement text to audio outside any call, for paging systems
//! and dashboard previews. Responses are raw audio bytes; clients may cache
//! a rendering of identical text and voice.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use callflow_core::voice::{is_allowed_voice, voice_catalog, voice_validation_error, voices_for_language};

use crate::state::AppState;

const MAX_BROADCAST_TEXT: usize = 1000;

pub fn broadcast_router() -> Router<AppState> {
    Router::new()
        .route("/tts/broadcast", post(broadcast_tts))
        .route("/tts/voices", get(list_voices))
}

#[derive(Debug, Deserialize)]
struct BroadcastRequest {
    text: String,
    voice: Option<String>,
    rate: Option<String>,
    volume: Option<String>,
}

async fn broadcast_tts(
    State(state): State<AppState>,
    Json(request): Json<BroadcastRequest>,
) -> Response {
    let text = request.text.trim();
    if text.is_empty() || text.len() > MAX_BROADCAST_TEXT {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": format!("Text length must be in [1, {}]", MAX_BROADCAST_TEXT)
            })),
        )
            .into_response();
    }

    let defaults = &state.settings.collaborators.synthesizer;
    let voice = request.voice.as_deref().unwrap_or(&defaults.voice);
    if !is_allowed_voice(voice) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": voice_validation_error() })),
        )
            .into_response();
    }
    let rate = request.rate.as_deref().unwrap_or(&defaults.rate);
    let volume = request.volume.as_deref().unwrap_or(&defaults.volume);

    let synthesis = state
        .synthesizer
        .synthesize_with_voice(text, voice, rate, volume)
        .await;
    if !synthesis.success {
        let error = synthesis.error.unwrap_or_else(|| "unknown error".to_string());
        tracing::error!(%error, voice, "Broadcast synthesis failed");
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": format!("Synthesis failed: {}", error) })),
        )
            .into_response();
    }

    tracing::info!(voice, bytes = synthesis.audio.len(), "Broadcast audio rendered");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=\"broadcast.mp3\"".to_string(),
            ),
        ],
        synthesis.audio,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct VoicesQuery {
    language: Option<String>,
}

async fn list_voices(Query(query): Query<VoicesQuery>) -> Json<serde_json::Value> {
    match query.language {
        Some(language) => {
            let voices = voices_for_language(&language);
            Json(json!({ "voices": voices, "count": voices.len() }))
        }
        None => {
            let voices = voice_catalog();
            Json(json!({ "voices": voices, "count": voices.len() }))
        }
    }
}
