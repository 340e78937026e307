//! Application state shared across handlers

use std::sync::Arc;
use std::time::Duration;

use callflow_config::Settings;
use callflow_core::{Reasoner, Synthesizer, Transcriber};
use callflow_engine::WorkflowEngine;
use callflow_pipeline::PipelineOrchestrator;

use crate::connection::ConnectionManager;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub connections: Arc<ConnectionManager>,
    pub pipeline: Arc<PipelineOrchestrator>,
    pub engine: Arc<WorkflowEngine>,
    pub transcriber: Arc<dyn Transcriber>,
    pub reasoner: Arc<dyn Reasoner>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        transcriber: Arc<dyn Transcriber>,
        reasoner: Arc<dyn Reasoner>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        let connections = Arc::new(ConnectionManager::new(
            settings.server.max_connections,
            Duration::from_secs(settings.server.heartbeat_interval_secs),
        ));
        let pipeline = Arc::new(PipelineOrchestrator::new(
            transcriber.clone(),
            reasoner.clone(),
            synthesizer.clone(),
            settings.collaborators.transcriber.language.clone(),
        ));
        let engine = Arc::new(WorkflowEngine::new(synthesizer.clone()));

        Self {
            settings: Arc::new(settings),
            connections,
            pipeline,
            engine,
            transcriber,
            reasoner,
            synthesizer,
        }
    }
}
