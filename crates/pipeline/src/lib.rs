//! Voice pipeline orchestration
//!
//! Chains transcription, reasoning, and synthesis into a single turn. Each
//! stage is a collaborator behind a trait; the orchestrator owns the bounded
//! per-call conversation history and tags the failing stage instead of
//! unwinding.

pub mod clients;
pub mod orchestrator;

pub use clients::{HttpReasoner, HttpSynthesizer, HttpTranscriber, PipelineError};
pub use orchestrator::{PipelineOrchestrator, PipelineResult, StageDurations};
