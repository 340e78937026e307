//! HTTP collaborator clients
//!
//! Concrete [`Transcriber`](callflow_core::Transcriber),
//! [`Reasoner`](callflow_core::Reasoner) and
//! [`Synthesizer`](callflow_core::Synthesizer) implementations over remote
//! services. Each client converts transport and protocol errors into failed
//! result values so the orchestrator only ever sees stage outcomes.

mod reasoner;
mod synthesizer;
mod transcriber;

pub use reasoner::HttpReasoner;
pub use synthesizer::HttpSynthesizer;
pub use transcriber::HttpTranscriber;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}
