//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation
    #[default]
    Development,
    /// Staging mode
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Collaborator endpoints (transcriber, reasoner, synthesizer)
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum concurrent call sessions
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Heartbeat interval in seconds for live sessions
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty = localhost fallback)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Collaborator endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CollaboratorConfig {
    #[serde(default)]
    pub transcriber: TranscriberConfig,

    #[serde(default)]
    pub reasoner: ReasonerConfig,

    #[serde(default)]
    pub synthesizer: SynthesizerConfig,
}

/// Transcription collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Whisper-compatible transcription endpoint
    #[serde(default = "default_stt_endpoint")]
    pub endpoint: String,

    /// Model identifier passed to the endpoint
    #[serde(default = "default_stt_model")]
    pub model: String,

    /// Default transcription language
    #[serde(default = "default_stt_language")]
    pub language: String,

    /// Request timeout in seconds
    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,

    /// API key, usually injected via CALLFLOW__COLLABORATORS__TRANSCRIBER__API_KEY
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            endpoint: default_stt_endpoint(),
            model: default_stt_model(),
            language: default_stt_language(),
            timeout_secs: default_collaborator_timeout(),
            api_key: None,
        }
    }
}

/// Reasoning collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonerConfig {
    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_ai_model")]
    pub model: String,

    /// Maximum tokens per response
    #[serde(default = "default_ai_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_ai_temperature")]
    pub temperature: f32,

    /// System prompt prepended to every conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ai_endpoint(),
            model: default_ai_model(),
            max_tokens: default_ai_max_tokens(),
            temperature: default_ai_temperature(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_collaborator_timeout(),
            api_key: None,
        }
    }
}

/// Synthesis collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    /// TTS endpoint returning raw audio bytes
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    /// Default voice id (must be in the voice catalog)
    #[serde(default = "default_tts_voice")]
    pub voice: String,

    /// Prosody rate adjustment, e.g. "+0%"
    #[serde(default = "default_prosody")]
    pub rate: String,

    /// Prosody volume adjustment, e.g. "+0%"
    #[serde(default = "default_prosody")]
    pub volume: String,

    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tts_endpoint(),
            voice: default_tts_voice(),
            rate: default_prosody(),
            volume: default_prosody(),
            timeout_secs: default_collaborator_timeout(),
            api_key: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_max_connections() -> usize {
    100
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_stt_endpoint() -> String {
    "http://localhost:9000/v1/audio/transcriptions".to_string()
}

fn default_stt_model() -> String {
    "distil-whisper-large-v3-en".to_string()
}

fn default_stt_language() -> String {
    "en".to_string()
}

fn default_ai_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_ai_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_ai_max_tokens() -> u32 {
    150
}

fn default_ai_temperature() -> f32 {
    0.7
}

fn default_system_prompt() -> String {
    "You are a helpful voice assistant. Keep responses concise, natural, and \
     conversational. Speak in short, clear sentences perfect for voice. Avoid \
     long paragraphs or technical jargon unless asked."
        .to_string()
}

fn default_tts_endpoint() -> String {
    "http://localhost:5500/api/tts".to_string()
}

fn default_tts_voice() -> String {
    "en-GB-SoniaNeural".to_string()
}

fn default_prosody() -> String {
    "+0%".to_string()
}

fn default_collaborator_timeout() -> u64 {
    30
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port must be non-zero".to_string(),
            });
        }

        if self.server.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.heartbeat_interval_secs".to_string(),
                message: "Heartbeat interval must be at least 1 second".to_string(),
            });
        }

        if self.server.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_connections".to_string(),
                message: "Must allow at least one connection".to_string(),
            });
        }

        let temp = self.collaborators.reasoner.temperature;
        if !(0.0..=2.0).contains(&temp) {
            return Err(ConfigError::InvalidValue {
                field: "collaborators.reasoner.temperature".to_string(),
                message: format!("Temperature {} outside [0.0, 2.0]", temp),
            });
        }

        if self.environment.is_production() && self.collaborators.reasoner.api_key.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "collaborators.reasoner.api_key".to_string(),
                message: "Reasoner API key is required in production".to_string(),
            });
        }

        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority: env vars > config/{env}.yaml > config/default.yaml > defaults.
/// The default file is optional; an explicitly requested environment file
/// must exist.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        let path = format!("config/{}.yaml", env_name);
        if !std::path::Path::new(&path).exists() {
            return Err(ConfigError::FileNotFound(path));
        }
        tracing::debug!(file = %path, "Layering environment config");
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)));
    }

    builder = builder.add_source(
        Environment::with_prefix("CALLFLOW")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;
    tracing::info!(environment = ?settings.environment, "Configuration loaded");

    Ok(settings)
}
