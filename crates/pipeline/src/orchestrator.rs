//! Pipeline orchestrator
//!
//! Runs the transcribe, reason, synthesize sequence for one conversational
//! turn. A stage failure short-circuits the remaining stages and the result
//! names the failing stage. Conversation history is owned here, keyed by
//! call, and bounded so long calls cannot grow memory without limit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

use callflow_core::{ChatMessage, Reasoner, Synthesizer, Transcriber};

/// Most recent messages retained per call (10 user/assistant exchanges)
pub const MAX_HISTORY_MESSAGES: usize = 20;

/// Most recent messages forwarded to the reasoner per turn
pub const REASONER_WINDOW: usize = 10;

/// Per-stage wall clock, in seconds
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageDurations {
    pub transcription: f64,
    pub reasoning: f64,
    pub synthesis: f64,
    pub total: f64,
}

/// Outcome of one pipeline turn
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub success: bool,
    /// Which stage failed ("STT failed" / "AI failed" / "TTS failed")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// What the caller said, present once transcription succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// What the agent replies, present once reasoning produced text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    /// Rendered reply audio, present on full success
    #[serde(skip_serializing)]
    pub audio: Option<Vec<u8>>,
    /// Stage-tagged error on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub durations: StageDurations,
}

impl PipelineResult {
    fn failure(stage: &str, error: String, durations: StageDurations) -> Self {
        Self {
            success: false,
            stage: Some(stage.to_string()),
            transcript: None,
            response_text: None,
            audio: None,
            error: Some(format!("{}: {}", stage, error)),
            durations,
        }
    }
}

/// Orchestrates one voice turn across the three collaborators
pub struct PipelineOrchestrator {
    transcriber: Arc<dyn Transcriber>,
    reasoner: Arc<dyn Reasoner>,
    synthesizer: Arc<dyn Synthesizer>,
    language: String,
    history: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl PipelineOrchestrator {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        reasoner: Arc<dyn Reasoner>,
        synthesizer: Arc<dyn Synthesizer>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            transcriber,
            reasoner,
            synthesizer,
            language: language.into(),
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Full turn: audio in, audio out
    pub async fn process_audio(&self, call_id: &str, audio: &[u8]) -> PipelineResult {
        let start = Instant::now();
        let mut durations = StageDurations::default();

        let transcription = self.transcriber.transcribe(audio, &self.language).await;
        durations.transcription = transcription.duration;
        if !transcription.success {
            durations.total = start.elapsed().as_secs_f64();
            let error = transcription
                .error
                .unwrap_or_else(|| "unknown error".to_string());
            tracing::warn!(call_id, %error, "Transcription stage failed");
            return PipelineResult::failure("STT failed", error, durations);
        }
        if transcription.text.trim().is_empty() {
            durations.total = start.elapsed().as_secs_f64();
            return PipelineResult::failure(
                "STT failed",
                "no speech detected".to_string(),
                durations,
            );
        }

        let mut result = self
            .respond(call_id, &transcription.text, start, durations)
            .await;
        result.transcript = Some(transcription.text);
        result
    }

    /// Text-only turn, skipping transcription
    pub async fn process_text(&self, call_id: &str, text: &str) -> PipelineResult {
        let start = Instant::now();
        let mut result = self
            .respond(call_id, text, start, StageDurations::default())
            .await;
        result.transcript = Some(text.to_string());
        result
    }

    /// Shared reason-then-synthesize tail of both entry points
    async fn respond(
        &self,
        call_id: &str,
        text: &str,
        start: Instant,
        mut durations: StageDurations,
    ) -> PipelineResult {
        // Retention keeps 20 messages, but the reasoner only sees the
        // trailing window.
        let snapshot: Vec<ChatMessage> = self
            .history
            .lock()
            .get(call_id)
            .map(|messages| {
                let skip = messages.len().saturating_sub(REASONER_WINDOW);
                messages[skip..].to_vec()
            })
            .unwrap_or_default();

        let reply = self.reasoner.respond(text, call_id, &snapshot).await;
        durations.reasoning = reply.duration;
        if !reply.success {
            durations.total = start.elapsed().as_secs_f64();
            let error = reply.error.unwrap_or_else(|| "unknown error".to_string());
            tracing::warn!(call_id, %error, "Reasoning stage failed");
            let mut result = PipelineResult::failure("AI failed", error, durations);
            // Speakable fallback so the caller is not left in silence.
            result.response_text = Some(reply.response);
            return result;
        }

        self.append_exchange(call_id, text, &reply.response);

        let synthesis = self.synthesizer.synthesize(&reply.response).await;
        durations.synthesis = synthesis.duration;
        durations.total = start.elapsed().as_secs_f64();
        if !synthesis.success {
            let error = synthesis.error.unwrap_or_else(|| "unknown error".to_string());
            tracing::warn!(call_id, %error, "Synthesis stage failed");
            let mut result = PipelineResult::failure("TTS failed", error, durations);
            result.response_text = Some(reply.response);
            return result;
        }

        tracing::debug!(
            call_id,
            total_secs = durations.total,
            tokens = reply.tokens_used,
            "Pipeline turn complete"
        );

        PipelineResult {
            success: true,
            stage: None,
            transcript: None,
            response_text: Some(reply.response),
            audio: Some(synthesis.audio),
            error: None,
            durations,
        }
    }

    /// Record one exchange and drop the oldest messages past the bound
    fn append_exchange(&self, call_id: &str, user: &str, assistant: &str) {
        let mut history = self.history.lock();
        let messages = history.entry(call_id.to_string()).or_default();
        messages.push(ChatMessage::user(user));
        messages.push(ChatMessage::assistant(assistant));
        if messages.len() > MAX_HISTORY_MESSAGES {
            let excess = messages.len() - MAX_HISTORY_MESSAGES;
            messages.drain(..excess);
        }
    }

    /// Forget the conversation for a call
    pub fn reset_conversation(&self, call_id: &str) {
        if self.history.lock().remove(call_id).is_some() {
            tracing::info!(call_id, "Conversation history reset");
        }
    }

    /// Forget every conversation
    pub fn reset_all_conversations(&self) {
        let mut history = self.history.lock();
        let cleared = history.len();
        history.clear();
        if cleared > 0 {
            tracing::info!(cleared, "All conversation histories reset");
        }
    }

    /// Messages currently retained for a call
    pub fn history_len(&self, call_id: &str) -> usize {
        self.history.lock().get(call_id).map_or(0, Vec::len)
    }

    /// Calls with retained history
    pub fn active_conversations(&self) -> usize {
        self.history.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use callflow_core::{ReasonerReply, Synthesis, Transcription};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockTranscriber {
        calls: AtomicUsize,
        fail: bool,
        empty: bool,
    }

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe(&self, _audio: &[u8], language: &str) -> Transcription {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Transcription::failure("whisper unreachable", 0.2);
            }
            Transcription {
                success: true,
                text: if self.empty { "  ".into() } else { "hello".into() },
                language: language.to_string(),
                confidence: 0.9,
                duration: 0.2,
                error: None,
            }
        }
    }

    #[derive(Default)]
    struct MockReasoner {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Reasoner for MockReasoner {
        async fn respond(
            &self,
            text: &str,
            _call_id: &str,
            history: &[ChatMessage],
        ) -> ReasonerReply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return ReasonerReply {
                    success: false,
                    response: "I'm having trouble processing that. Could you try again?".into(),
                    tokens_used: 0,
                    duration: 0.1,
                    error: Some("model overloaded".into()),
                };
            }
            ReasonerReply {
                success: true,
                response: format!("echo {} ({} prior)", text, history.len()),
                tokens_used: 5,
                duration: 0.1,
                error: None,
            }
        }
    }

    #[derive(Default)]
    struct MockSynthesizer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Synthesizer for MockSynthesizer {
        async fn synthesize(&self, _text: &str) -> Synthesis {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Synthesis::failure("edge-tts error", 0.1);
            }
            Synthesis {
                success: true,
                audio: vec![0xff; 8],
                format: "mp3".into(),
                duration: 0.1,
                error: None,
            }
        }
    }

    fn orchestrator(
        stt: Arc<MockTranscriber>,
        llm: Arc<MockReasoner>,
        tts: Arc<MockSynthesizer>,
    ) -> PipelineOrchestrator {
        PipelineOrchestrator::new(stt, llm, tts, "en")
    }

    #[tokio::test]
    async fn full_turn_success() {
        let stt = Arc::new(MockTranscriber::default());
        let llm = Arc::new(MockReasoner::default());
        let tts = Arc::new(MockSynthesizer::default());
        let pipeline = orchestrator(stt, llm, tts);

        let result = pipeline.process_audio("call-1", &[1, 2, 3]).await;
        assert!(result.success);
        assert!(result.stage.is_none());
        assert_eq!(result.transcript.as_deref(), Some("hello"));
        assert!(result.response_text.unwrap().starts_with("echo hello"));
        assert!(result.audio.is_some());
        assert!(result.durations.total >= 0.0);
        assert_eq!(pipeline.history_len("call-1"), 2);
    }

    #[tokio::test]
    async fn stt_failure_short_circuits() {
        let stt = Arc::new(MockTranscriber {
            fail: true,
            ..Default::default()
        });
        let llm = Arc::new(MockReasoner::default());
        let tts = Arc::new(MockSynthesizer::default());
        let pipeline = orchestrator(stt, llm.clone(), tts.clone());

        let result = pipeline.process_audio("call-1", &[1]).await;
        assert!(!result.success);
        assert_eq!(result.stage.as_deref(), Some("STT failed"));
        assert!(result.error.unwrap().starts_with("STT failed"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(tts.calls.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.history_len("call-1"), 0);
    }

    #[tokio::test]
    async fn failure_serializes_structured_stage() {
        let stt = Arc::new(MockTranscriber {
            fail: true,
            ..Default::default()
        });
        let pipeline = orchestrator(
            stt,
            Arc::new(MockReasoner::default()),
            Arc::new(MockSynthesizer::default()),
        );

        let result = pipeline.process_audio("call-1", &[1]).await;
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["stage"], "STT failed");
        assert!(json["error"].as_str().unwrap().contains("whisper unreachable"));
    }

    #[tokio::test]
    async fn empty_transcript_is_stt_failure() {
        let stt = Arc::new(MockTranscriber {
            empty: true,
            ..Default::default()
        });
        let llm = Arc::new(MockReasoner::default());
        let pipeline = orchestrator(stt, llm.clone(), Arc::new(MockSynthesizer::default()));

        let result = pipeline.process_audio("call-1", &[1]).await;
        assert!(!result.success);
        assert_eq!(result.stage.as_deref(), Some("STT failed"));
        assert!(result.error.unwrap().contains("no speech detected"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reasoner_failure_skips_synthesis_and_keeps_fallback() {
        let llm = Arc::new(MockReasoner {
            fail: true,
            ..Default::default()
        });
        let tts = Arc::new(MockSynthesizer::default());
        let pipeline = orchestrator(Arc::new(MockTranscriber::default()), llm, tts.clone());

        let result = pipeline.process_audio("call-1", &[1]).await;
        assert!(!result.success);
        assert_eq!(result.stage.as_deref(), Some("AI failed"));
        assert!(result.error.unwrap().starts_with("AI failed"));
        assert!(result.response_text.unwrap().contains("try again"));
        assert_eq!(tts.calls.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.history_len("call-1"), 0, "failed turns are not recorded");
    }

    #[tokio::test]
    async fn synthesis_failure_retains_response_text() {
        let tts = Arc::new(MockSynthesizer {
            fail: true,
            ..Default::default()
        });
        let pipeline = orchestrator(
            Arc::new(MockTranscriber::default()),
            Arc::new(MockReasoner::default()),
            tts,
        );

        let result = pipeline.process_audio("call-1", &[1]).await;
        assert!(!result.success);
        assert_eq!(result.stage.as_deref(), Some("TTS failed"));
        assert!(result.error.unwrap().starts_with("TTS failed"));
        assert!(result.response_text.is_some());
        assert!(result.audio.is_none());
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let pipeline = orchestrator(
            Arc::new(MockTranscriber::default()),
            Arc::new(MockReasoner::default()),
            Arc::new(MockSynthesizer::default()),
        );

        for i in 0..13 {
            let result = pipeline.process_text("call-1", &format!("turn {}", i)).await;
            assert!(result.success);
        }
        assert_eq!(pipeline.history_len("call-1"), MAX_HISTORY_MESSAGES);
    }

    #[tokio::test]
    async fn history_is_isolated_per_call() {
        let pipeline = orchestrator(
            Arc::new(MockTranscriber::default()),
            Arc::new(MockReasoner::default()),
            Arc::new(MockSynthesizer::default()),
        );

        pipeline.process_text("call-a", "hi").await;
        pipeline.process_text("call-a", "again").await;
        pipeline.process_text("call-b", "hi").await;

        assert_eq!(pipeline.history_len("call-a"), 4);
        assert_eq!(pipeline.history_len("call-b"), 2);
        assert_eq!(pipeline.active_conversations(), 2);
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let pipeline = orchestrator(
            Arc::new(MockTranscriber::default()),
            Arc::new(MockReasoner::default()),
            Arc::new(MockSynthesizer::default()),
        );

        pipeline.process_text("call-1", "hi").await;
        assert_eq!(pipeline.history_len("call-1"), 2);
        pipeline.reset_conversation("call-1");
        assert_eq!(pipeline.history_len("call-1"), 0);
        // Resetting an unknown call is a no-op.
        pipeline.reset_conversation("call-unknown");
    }

    #[tokio::test]
    async fn reset_all_clears_every_call() {
        let pipeline = orchestrator(
            Arc::new(MockTranscriber::default()),
            Arc::new(MockReasoner::default()),
            Arc::new(MockSynthesizer::default()),
        );

        pipeline.process_text("call-a", "hi").await;
        pipeline.process_text("call-b", "hi").await;
        pipeline.reset_all_conversations();
        assert_eq!(pipeline.active_conversations(), 0);
    }

    #[tokio::test]
    async fn reasoner_sees_prior_history() {
        let pipeline = orchestrator(
            Arc::new(MockTranscriber::default()),
            Arc::new(MockReasoner::default()),
            Arc::new(MockSynthesizer::default()),
        );

        pipeline.process_text("call-1", "first").await;
        let second = pipeline.process_text("call-1", "second").await;
        assert!(second.response_text.unwrap().contains("(2 prior)"));
    }

    #[tokio::test]
    async fn reasoner_window_is_bounded() {
        let pipeline = orchestrator(
            Arc::new(MockTranscriber::default()),
            Arc::new(MockReasoner::default()),
            Arc::new(MockSynthesizer::default()),
        );

        let mut last = None;
        for i in 0..12 {
            last = Some(pipeline.process_text("call-1", &format!("turn {}", i)).await);
        }
        // 20 messages are retained, but the reasoner sees at most 10.
        assert_eq!(pipeline.history_len("call-1"), MAX_HISTORY_MESSAGES);
        let reply = last.unwrap().response_text.unwrap();
        assert!(reply.contains("(10 prior)"), "got {}", reply);
    }
}
