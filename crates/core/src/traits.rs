//! Collaborator traits
//!
//! The runtime consumes transcription, reasoning, and synthesis as
//! request/response capabilities with no internal state assumed. Failures are
//! carried in the result types so callers can tag the failing stage instead
//! of unwinding.

use async_trait::async_trait;

use crate::ChatMessage;

/// Result of a transcription request
#[derive(Debug, Clone)]
pub struct Transcription {
    pub success: bool,
    /// Transcribed text, empty on failure
    pub text: String,
    /// Detected or requested language code
    pub language: String,
    /// Confidence estimate in [0,1]
    pub confidence: f32,
    /// Wall-clock duration of the request in seconds
    pub duration: f64,
    pub error: Option<String>,
}

impl Transcription {
    pub fn failure(error: impl Into<String>, duration: f64) -> Self {
        Self {
            success: false,
            text: String::new(),
            language: String::new(),
            confidence: 0.0,
            duration,
            error: Some(error.into()),
        }
    }
}

/// Result of a reasoning request
#[derive(Debug, Clone)]
pub struct ReasonerReply {
    pub success: bool,
    /// Generated response. On failure this holds a speakable fallback.
    pub response: String,
    pub tokens_used: u32,
    pub duration: f64,
    pub error: Option<String>,
}

/// Result of a synthesis request
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub success: bool,
    /// Rendered audio, empty on failure
    pub audio: Vec<u8>,
    /// Audio container format (e.g. "mp3", "wav")
    pub format: String,
    pub duration: f64,
    pub error: Option<String>,
}

impl Synthesis {
    pub fn failure(error: impl Into<String>, duration: f64) -> Self {
        Self {
            success: false,
            audio: Vec::new(),
            format: String::new(),
            duration,
            error: Some(error.into()),
        }
    }
}

/// Speech-to-text collaborator
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio bytes to text
    async fn transcribe(&self, audio: &[u8], language: &str) -> Transcription;

    /// Probe collaborator health
    async fn is_available(&self) -> bool {
        true
    }
}

/// Language-model collaborator
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Generate a response to the user's message. `history` carries the
    /// bounded conversation window owned by the orchestrator.
    async fn respond(&self, text: &str, call_id: &str, history: &[ChatMessage]) -> ReasonerReply;

    async fn is_available(&self) -> bool {
        true
    }
}

/// Text-to-speech collaborator
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Render text with the default voice
    async fn synthesize(&self, text: &str) -> Synthesis;

    /// Render text with an explicit voice and prosody settings
    async fn synthesize_with_voice(
        &self,
        text: &str,
        voice: &str,
        rate: &str,
        volume: &str,
    ) -> Synthesis {
        let _ = (voice, rate, volume);
        self.synthesize(text).await
    }

    async fn is_available(&self) -> bool {
        true
    }
}
