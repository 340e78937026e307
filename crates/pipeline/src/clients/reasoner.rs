//! OpenAI-compatible chat completion client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use callflow_config::ReasonerConfig;
use callflow_core::{ChatMessage, Reasoner, ReasonerReply};

use super::PipelineError;

/// Spoken to the caller when the model cannot produce a reply
const FALLBACK_REPLY: &str = "I'm having trouble processing that. Could you try again?";

pub struct HttpReasoner {
    client: Client,
    config: ReasonerConfig,
}

impl HttpReasoner {
    pub fn new(config: ReasonerConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PipelineError::ClientBuild)?;
        Ok(Self { client, config })
    }

    fn build_messages(&self, text: &str, history: &[ChatMessage]) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(WireMessage {
            role: "system".to_string(),
            content: self.config.system_prompt.clone(),
        });
        messages.extend(history.iter().map(|m| WireMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }));
        messages.push(WireMessage {
            role: "user".to_string(),
            content: text.to_string(),
        });
        messages
    }

    async fn request(&self, messages: Vec<WireMessage>) -> Result<ChatCompletion, String> {
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("chat endpoint returned {}: {}", status, body));
        }

        response.json().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Reasoner for HttpReasoner {
    async fn respond(&self, text: &str, call_id: &str, history: &[ChatMessage]) -> ReasonerReply {
        let start = Instant::now();
        let messages = self.build_messages(text, history);

        match self.request(messages).await {
            Ok(completion) => {
                let content = completion
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content);
                match content {
                    Some(response) if !response.is_empty() => ReasonerReply {
                        success: true,
                        response,
                        tokens_used: completion.usage.map_or(0, |u| u.total_tokens),
                        duration: start.elapsed().as_secs_f64(),
                        error: None,
                    },
                    _ => {
                        tracing::error!(call_id, "Chat completion carried no content");
                        failed_reply("empty completion", start)
                    }
                }
            }
            Err(e) => {
                tracing::error!(call_id, error = %e, "Chat completion request failed");
                failed_reply(e, start)
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

fn failed_reply(error: impl Into<String>, start: Instant) -> ReasonerReply {
    ReasonerReply {
        success: false,
        response: FALLBACK_REPLY.to_string(),
        tokens_used: 0,
        duration: start.elapsed().as_secs_f64(),
        error: Some(error.into()),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}
