//! Whisper-compatible speech-to-text client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use callflow_config::TranscriberConfig;
use callflow_core::{Transcriber, Transcription};

use super::PipelineError;

pub struct HttpTranscriber {
    client: Client,
    config: TranscriberConfig,
}

impl HttpTranscriber {
    pub fn new(config: TranscriberConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PipelineError::ClientBuild)?;
        Ok(Self { client, config })
    }

    async fn request(&self, audio: &[u8], language: &str) -> Result<WhisperResponse, String> {
        let form = Form::new()
            .part(
                "file",
                Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| e.to_string())?,
            )
            .text("model", self.config.model.clone())
            .text("language", language.to_string())
            .text("response_format", "json");

        let mut request = self.client.post(&self.config.endpoint).multipart(form);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("transcription endpoint returned {}: {}", status, body));
        }

        response.json().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &[u8], language: &str) -> Transcription {
        let start = Instant::now();
        let language = if language.is_empty() {
            &self.config.language
        } else {
            language
        };

        match self.request(audio, language).await {
            Ok(body) => Transcription {
                success: true,
                text: body.text,
                language: body.language.unwrap_or_else(|| language.to_string()),
                confidence: 1.0,
                duration: start.elapsed().as_secs_f64(),
                error: None,
            },
            Err(e) => {
                tracing::error!(error = %e, "Transcription request failed");
                Transcription::failure(e, start.elapsed().as_secs_f64())
            }
        }
    }

    async fn is_available(&self) -> bool {
        self.client
            .head(&self.config.endpoint)
            .send()
            .await
            .is_ok()
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
}
