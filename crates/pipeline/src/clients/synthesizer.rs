//! Text-to-speech client returning raw audio bytes

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use callflow_config::SynthesizerConfig;
use callflow_core::{Synthesis, Synthesizer};

use super::PipelineError;

pub struct HttpSynthesizer {
    client: Client,
    config: SynthesizerConfig,
}

impl HttpSynthesizer {
    pub fn new(config: SynthesizerConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PipelineError::ClientBuild)?;
        Ok(Self { client, config })
    }

    async fn request(&self, body: &TtsRequest<'_>) -> Result<Vec<u8>, String> {
        let mut request = self.client.post(&self.config.endpoint).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("synthesis endpoint returned {}: {}", status, body));
        }

        let audio = response.bytes().await.map_err(|e| e.to_string())?;
        if audio.is_empty() {
            return Err("synthesis endpoint returned no audio".to_string());
        }
        Ok(audio.to_vec())
    }

    async fn render(&self, text: &str, voice: &str, rate: &str, volume: &str) -> Synthesis {
        let start = Instant::now();
        let body = TtsRequest {
            text,
            voice,
            rate,
            volume,
        };

        match self.request(&body).await {
            Ok(audio) => Synthesis {
                success: true,
                audio,
                format: "mp3".to_string(),
                duration: start.elapsed().as_secs_f64(),
                error: None,
            },
            Err(e) => {
                tracing::error!(error = %e, voice, "Synthesis request failed");
                Synthesis::failure(e, start.elapsed().as_secs_f64())
            }
        }
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Synthesis {
        self.render(
            text,
            &self.config.voice,
            &self.config.rate,
            &self.config.volume,
        )
        .await
    }

    async fn synthesize_with_voice(
        &self,
        text: &str,
        voice: &str,
        rate: &str,
        volume: &str,
    ) -> Synthesis {
        self.render(text, voice, rate, volume).await
    }

    async fn is_available(&self) -> bool {
        self.client
            .head(&self.config.endpoint)
            .send()
            .await
            .is_ok()
    }
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    voice: &'a str,
    rate: &'a str,
    volume: &'a str,
}
