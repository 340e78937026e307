//! Workflow node execution
//!
//! One handler per node type, dispatched through an exhaustive match so an
//! unregistered variant is a compile error rather than a silent runtime miss.
//! Handlers never panic and never let collaborator failures escape: every
//! path returns a structured [`ExecutionResult`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use callflow_core::Synthesizer;

use crate::condition::{evaluate_condition, Operator};
use crate::data::{
    parse_node_data, validate_node_data, AiAssistantData, ApiCallData, AudioData, ConditionalData,
    EndData, GreetingData, InputData, NodeData, QueueData, RepeatData, SetVariableData, SmsData,
    TransferData, VoicemailData,
};
use crate::result::ExecutionResult;
use crate::types::NodeType;

/// Per-call variable bindings visible to conditional evaluation
pub type ExecutionContext = HashMap<String, Value>;

/// Workflow node engine
///
/// Holds the synthesis collaborator used to render prompt audio. The engine
/// is stateless across executions; it never touches sessions or conversation
/// memory.
pub struct WorkflowEngine {
    synthesizer: Arc<dyn Synthesizer>,
}

impl WorkflowEngine {
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self { synthesizer }
    }

    /// Execute a single workflow node
    ///
    /// Validates `node_data` against the contract for `node_type` before any
    /// handler runs. Unknown types and constraint violations produce failure
    /// results, not errors.
    pub async fn execute(
        &self,
        node_type: &str,
        node_data: &Value,
        context: &ExecutionContext,
    ) -> ExecutionResult {
        let Some(nt) = NodeType::parse(node_type) else {
            tracing::warn!(node_type, "No handler found for node type");
            return ExecutionResult::error(format!("Unknown node type: {}", node_type));
        };

        let validation = validate_node_data(nt, node_data);
        if !validation.valid {
            tracing::debug!(node_type, errors = ?validation.errors, "Node data rejected");
            return ExecutionResult::validation_failed(validation.errors);
        }

        // Reparse from the canonical record; it is guaranteed well-formed.
        let Some(canonical) = validation.data else {
            return ExecutionResult::error("Validation produced no canonical data");
        };
        let data = match parse_node_data(nt, canonical) {
            Ok(data) => data,
            Err(e) => return ExecutionResult::error(format!("Node data parse error: {}", e)),
        };

        match data {
            NodeData::Greeting(d) => self.handle_greeting(d).await,
            NodeData::Audio(d) => self.handle_audio(d).await,
            NodeData::Input(d) => self.handle_input(d).await,
            NodeData::Conditional(d) => self.handle_conditional(d, context),
            NodeData::Voicemail(d) => self.handle_voicemail(d).await,
            NodeData::Transfer(d) => self.handle_transfer(d).await,
            NodeData::Repeat(d) => self.handle_repeat(d).await,
            NodeData::End(d) => self.handle_end(d).await,
            NodeData::AiAssistant(d) => self.handle_ai_assistant(d).await,
            NodeData::Queue(d) => self.handle_queue(d).await,
            NodeData::Sms(d) => self.handle_sms(d),
            NodeData::SetVariable(d) => self.handle_set_variable(d),
            NodeData::ApiCall(d) => self.handle_api_call(d),
        }
    }

    /// Render prompt text through the synthesizer, returning base64 audio.
    /// Synthesis failure degrades to a null prompt; the node still executes.
    async fn render_prompt(&self, text: &str) -> Value {
        let result = self.synthesizer.synthesize(text).await;
        if result.success {
            Value::String(BASE64.encode(&result.audio))
        } else {
            tracing::warn!(
                error = result.error.as_deref().unwrap_or("unknown"),
                "Prompt synthesis failed, continuing without audio"
            );
            Value::Null
        }
    }

    async fn handle_greeting(&self, data: GreetingData) -> ExecutionResult {
        let prompt_audio = self.render_prompt(&data.text).await;
        let mut result = ExecutionResult::ok("play_prompt")
            .with_field("prompt_audio", prompt_audio)
            .with_field("timeout", json!(data.timeout))
            .with_field("max_retries", json!(data.max_retries))
            .with_next("wait_for_input");
        if !data.menu_options.is_empty() {
            result = result.with_field("menu_options", json!(data.menu_options));
        }
        result
    }

    async fn handle_audio(&self, data: AudioData) -> ExecutionResult {
        // Upload mode plays the referenced recording; the mode field decides
        // the path statically, no heuristics on which fields are present.
        if data.mode == "upload" {
            let mut result = ExecutionResult::ok("play_audio").with_next("wait_for_input");
            if let Some(url) = data.audio_url {
                result = result.with_field("audio_url", json!(url));
            }
            if let Some(asset) = data.audio_asset_id {
                result = result.with_field("audio_asset_id", json!(asset));
            }
            return result;
        }

        let prompt_audio = self.render_prompt(&data.message_text).await;
        ExecutionResult::ok("play_prompt")
            .with_field("prompt_audio", prompt_audio)
            .with_field("after_playback", json!(data.after_playback))
            .with_field("timeout", json!(data.timeout))
            .with_next("wait_for_input")
    }

    async fn handle_input(&self, data: InputData) -> ExecutionResult {
        let prompt = if data.label.is_empty() {
            "Please enter your selection."
        } else {
            &data.label
        };
        let prompt_audio = self.render_prompt(prompt).await;

        let mut result = ExecutionResult::ok("collect_input")
            .with_field("prompt_audio", prompt_audio)
            .with_field("digit", json!(data.digit))
            .with_field("input_action", json!(data.action))
            .with_field("timeout", json!(data.timeout))
            .with_field("max_attempts", json!(data.max_attempts))
            .with_next("wait_for_input");
        if let Some(dest) = data.destination {
            result = result.with_field("destination", json!(dest));
        }
        result
    }

    fn handle_conditional(&self, data: ConditionalData, context: &ExecutionContext) -> ExecutionResult {
        let variable = data.variable.as_deref().unwrap_or("caller_input");
        let operator = Operator::parse(&data.operator).unwrap_or(Operator::Equals);
        let expected = data.value.as_deref().unwrap_or("");

        let outcome = evaluate_condition(context.get(variable), operator, expected);

        let next_node = if outcome { data.true_path } else { data.false_path };
        let mut result = ExecutionResult::ok("evaluate_condition")
            .with_field("result", json!(outcome))
            .with_next("route_based_on_result");
        if let Some(node) = next_node {
            result = result.with_field("next_node", json!(node));
        }
        result
    }

    async fn handle_voicemail(&self, data: VoicemailData) -> ExecutionResult {
        let prompt_audio = self.render_prompt(&data.text).await;
        ExecutionResult::ok("record_voicemail")
            .with_field("prompt_audio", prompt_audio)
            .with_field("max_length", json!(data.max_length))
            .with_field("transcribe", json!(data.transcribe))
            .with_field("play_beep", json!(data.play_beep))
            .with_field("mailbox", json!(data.mailbox))
            .with_next("wait_for_recording")
    }

    async fn handle_transfer(&self, data: TransferData) -> ExecutionResult {
        let prompt_audio = match &data.announce_text {
            Some(text) => self.render_prompt(text).await,
            None => Value::Null,
        };

        ExecutionResult::ok("transfer_call")
            .with_field("destination", json!(data.destination))
            .with_field("prompt_audio", prompt_audio)
            .with_field("timeout", json!(data.timeout))
            .with_next("initiate_transfer")
    }

    async fn handle_repeat(&self, data: RepeatData) -> ExecutionResult {
        let message = data
            .repeat_message
            .as_deref()
            .unwrap_or("Repeating the options.");
        let prompt_audio = self.render_prompt(message).await;

        let mut result = ExecutionResult::ok("repeat_prompt")
            .with_field("prompt_audio", prompt_audio)
            .with_field("max_repeats", json!(data.max_repeats))
            .with_field("replay_last_prompt", json!(data.replay_last_prompt))
            .with_next("repeat_or_fallback");
        if let Some(node) = data.fallback_node_id {
            result = result.with_field("fallback_node_id", json!(node));
        }
        result
    }

    async fn handle_end(&self, data: EndData) -> ExecutionResult {
        let prompt_audio = match &data.text {
            Some(text) => self.render_prompt(text).await,
            None => Value::Null,
        };

        let mut result = ExecutionResult::ok("end_call")
            .with_field("prompt_audio", prompt_audio)
            .with_field("reason", json!(data.termination_type))
            .with_next("terminate_call");
        if let Some(number) = data.transfer_number {
            result = result.with_field("transfer_number", json!(number));
        }
        result
    }

    async fn handle_ai_assistant(&self, data: AiAssistantData) -> ExecutionResult {
        let prompt_audio = match &data.welcome_message {
            Some(text) => self.render_prompt(text).await,
            None => Value::Null,
        };

        ExecutionResult::ok("connect_ai_assistant")
            .with_field("stream_url", json!(data.stream_url))
            .with_field("prompt_audio", prompt_audio)
            .with_field("max_duration", json!(data.max_duration))
            .with_field("language", json!(data.language))
            .with_next("stream_to_ai")
    }

    async fn handle_queue(&self, data: QueueData) -> ExecutionResult {
        let prompt_audio = match &data.wait_message {
            Some(text) => self.render_prompt(text).await,
            None => Value::Null,
        };

        ExecutionResult::ok("join_queue")
            .with_field("queue_name", json!(data.queue_name))
            .with_field("prompt_audio", prompt_audio)
            .with_field("max_wait_time", json!(data.max_wait_time))
            .with_field("position_announcement", json!(data.position_announcement))
            .with_next("wait_in_queue")
    }

    fn handle_sms(&self, data: SmsData) -> ExecutionResult {
        let mut result = ExecutionResult::ok("send_sms")
            .with_field("message", json!(data.message))
            .with_field("send_immediately", json!(data.send_immediately))
            .with_next("continue");
        if let Some(to) = data.to {
            result = result.with_field("to", json!(to));
        }
        if let Some(from) = data.from_number {
            result = result.with_field("from_number", json!(from));
        }
        result
    }

    /// The engine returns the binding as a decision; the flow runner applies
    /// it to the call context.
    fn handle_set_variable(&self, data: SetVariableData) -> ExecutionResult {
        ExecutionResult::ok("set_variable")
            .with_field("variable", json!(data.variable))
            .with_field("value", data.value)
            .with_field("scope", json!(data.scope))
            .with_field("overwrite", json!(data.overwrite))
            .with_next("continue")
    }

    /// The HTTP request itself is the flow runner's job; the engine only
    /// shapes the request decision.
    fn handle_api_call(&self, data: ApiCallData) -> ExecutionResult {
        let mut result = ExecutionResult::ok("api_request")
            .with_field("url", json!(data.url))
            .with_field("method", json!(data.method))
            .with_field("timeout", json!(data.timeout))
            .with_field("retry_count", json!(data.retry_count))
            .with_field("success_codes", json!(data.success_codes))
            .with_next("await_response");
        if let Some(headers) = data.headers {
            result = result.with_field("headers", headers);
        }
        if let Some(body) = data.body {
            result = result.with_field("body", body);
        }
        if let Some(var) = data.output_variable {
            result = result.with_field("output_variable", json!(var));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use callflow_core::Synthesis;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Synthesizer stub that counts invocations
    struct CountingSynth {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSynth {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Synthesizer for CountingSynth {
        async fn synthesize(&self, _text: &str) -> Synthesis {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Synthesis::failure("tts down", 0.0)
            } else {
                Synthesis {
                    success: true,
                    audio: vec![1, 2, 3],
                    format: "mp3".to_string(),
                    duration: 0.1,
                    error: None,
                }
            }
        }
    }

    fn engine_with(synth: Arc<CountingSynth>) -> WorkflowEngine {
        WorkflowEngine::new(synth)
    }

    #[tokio::test]
    async fn unknown_node_type_is_error_result() {
        let engine = engine_with(CountingSynth::new());
        let result = engine
            .execute("bogus", &json!({}), &ExecutionContext::new())
            .await;
        assert!(!result.success);
        assert_eq!(result.action, "error");
        assert!(result.error.unwrap().contains("bogus"));
    }

    #[tokio::test]
    async fn transfer_scenario() {
        let engine = engine_with(CountingSynth::new());
        let result = engine
            .execute(
                "transfer",
                &json!({"destination": "+14155550123", "timeout": 30}),
                &ExecutionContext::new(),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.action, "transfer_call");
        assert_eq!(result.next_action.as_deref(), Some("initiate_transfer"));
        assert_eq!(result.payload["destination"], "+14155550123");
        assert_eq!(result.payload["timeout"], 30);
    }

    #[tokio::test]
    async fn validation_failure_never_reaches_handler() {
        let synth = CountingSynth::new();
        let engine = engine_with(synth.clone());
        let result = engine
            .execute(
                "transfer",
                &json!({"destination": "not-a-number"}),
                &ExecutionContext::new(),
            )
            .await;

        assert!(!result.success);
        assert_eq!(result.action, "validation_failed");
        assert!(!result.payload["errors"].as_array().unwrap().is_empty());
        assert_eq!(synth.count(), 0, "handler must not run on invalid data");
    }

    #[tokio::test]
    async fn greeting_renders_prompt_audio() {
        let synth = CountingSynth::new();
        let engine = engine_with(synth.clone());
        let result = engine
            .execute("greeting", &json!({"text": "Hello"}), &ExecutionContext::new())
            .await;

        assert!(result.success);
        assert_eq!(result.action, "play_prompt");
        assert!(result.payload["prompt_audio"].is_string());
        assert_eq!(synth.count(), 1);
    }

    #[tokio::test]
    async fn menu_shares_greeting_contract() {
        let engine = engine_with(CountingSynth::new());
        let result = engine
            .execute("menu", &json!({}), &ExecutionContext::new())
            .await;
        assert!(result.success);
        assert_eq!(result.action, "play_prompt");
    }

    #[tokio::test]
    async fn audio_upload_mode_skips_synthesis() {
        let synth = CountingSynth::new();
        let engine = engine_with(synth.clone());
        let result = engine
            .execute(
                "audio",
                &json!({"mode": "upload", "audioUrl": "https://cdn.example.com/a.mp3"}),
                &ExecutionContext::new(),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.action, "play_audio");
        assert_eq!(result.payload["audio_url"], "https://cdn.example.com/a.mp3");
        assert_eq!(synth.count(), 0, "upload mode must not synthesize");
    }

    #[tokio::test]
    async fn synthesis_failure_degrades_to_null_prompt() {
        let engine = engine_with(CountingSynth::failing());
        let result = engine
            .execute("greeting", &json!({}), &ExecutionContext::new())
            .await;

        assert!(result.success, "collaborator failure must not fail the node");
        assert!(result.payload["prompt_audio"].is_null());
    }

    #[tokio::test]
    async fn conditional_routes_on_context() {
        let engine = engine_with(CountingSynth::new());
        let mut context = ExecutionContext::new();
        context.insert("caller_input".to_string(), json!("2"));

        let result = engine
            .execute(
                "conditional",
                &json!({
                    "variable": "caller_input",
                    "operator": "equals",
                    "value": "2",
                    "truePath": "node-yes",
                    "falsePath": "node-no"
                }),
                &context,
            )
            .await;

        assert!(result.success);
        assert_eq!(result.payload["result"], true);
        assert_eq!(result.payload["next_node"], "node-yes");
        assert_eq!(result.next_action.as_deref(), Some("route_based_on_result"));
    }

    #[tokio::test]
    async fn conditional_unbound_variable_is_false() {
        let engine = engine_with(CountingSynth::new());
        let result = engine
            .execute(
                "conditional",
                &json!({"variable": "missing", "operator": "exists", "falsePath": "fallback"}),
                &ExecutionContext::new(),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.payload["result"], false);
        assert_eq!(result.payload["next_node"], "fallback");
    }

    #[tokio::test]
    async fn set_variable_returns_binding_decision() {
        let engine = engine_with(CountingSynth::new());
        let result = engine
            .execute(
                "set_variable",
                &json!({"variable": "department", "value": "sales"}),
                &ExecutionContext::new(),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.action, "set_variable");
        assert_eq!(result.payload["variable"], "department");
        assert_eq!(result.payload["value"], "sales");
        assert_eq!(result.payload["scope"], "call");
    }

    #[tokio::test]
    async fn end_node_without_text_has_null_prompt() {
        let synth = CountingSynth::new();
        let engine = engine_with(synth.clone());
        let result = engine
            .execute("end", &json!({}), &ExecutionContext::new())
            .await;

        assert!(result.success);
        assert_eq!(result.action, "end_call");
        assert_eq!(result.payload["reason"], "hangup");
        assert!(result.payload["prompt_audio"].is_null());
        assert_eq!(synth.count(), 0);
    }
}
