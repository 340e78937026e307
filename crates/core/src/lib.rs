//! Core traits and types for the call-flow runtime
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits (transcription, reasoning, synthesis)
//! - Chat message types for conversation memory
//! - The WebSocket message envelope
//! - Voice catalog

pub mod chat;
pub mod envelope;
pub mod traits;
pub mod voice;

pub use chat::{ChatMessage, ChatRole};
pub use envelope::Envelope;
pub use traits::{
    Reasoner, ReasonerReply, Synthesis, Synthesizer, Transcriber, Transcription,
};
pub use voice::{voice_catalog, VoiceInfo, DEFAULT_LANGUAGE, DEFAULT_VOICE};
