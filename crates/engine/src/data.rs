//! Per-node-type data contracts
//!
//! Each node type has exactly one canonical record. Caller-facing camelCase
//! field names are accepted through `serde(alias)` and normalized at the
//! deserialization boundary; execution logic only ever sees the snake_case
//! canonical form.
//!
//! `validate_node_data` collects every violated constraint instead of
//! stopping at the first, so callers get a complete diagnosis in one pass.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use callflow_core::voice::{is_allowed_voice, voice_validation_error};

use crate::condition::Operator;
use crate::types::NodeType;

/// E.164-like phone number pattern
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").unwrap());
/// http(s) URL pattern
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/$]+").unwrap());
/// BCP-47-style language tag, e.g. "en-GB"
static LANG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2}-[A-Z]{2}$").unwrap());

/// Result of validating node data against its contract
#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    pub valid: bool,
    /// Canonical (snake_case) record, present when valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Violated constraints, present when invalid
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Validation {
    fn ok(data: Value) -> Self {
        Self {
            valid: true,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    fn fail(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            data: None,
            errors,
        }
    }
}

/// Canonical node data, one variant per node type
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NodeData {
    Greeting(GreetingData),
    Audio(AudioData),
    Input(InputData),
    Conditional(ConditionalData),
    Voicemail(VoicemailData),
    Transfer(TransferData),
    Repeat(RepeatData),
    End(EndData),
    AiAssistant(AiAssistantData),
    Queue(QueueData),
    Sms(SmsData),
    SetVariable(SetVariableData),
    ApiCall(ApiCallData),
}

/// Greeting and menu nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingData {
    #[serde(default = "default_welcome")]
    pub text: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, alias = "audioUrl")]
    pub audio_url: Option<String>,
    #[serde(default, alias = "menuOptions")]
    pub menu_options: Vec<Value>,
    #[serde(default = "default_timeout", alias = "timeoutSeconds")]
    pub timeout: u32,
    #[serde(default = "default_retries", alias = "maxRetries")]
    pub max_retries: u32,
}

impl GreetingData {
    fn check(&self, errors: &mut Vec<String>) {
        check_range(errors, "timeout", self.timeout as i64, 1, 60);
        check_range(errors, "max_retries", self.max_retries as i64, 1, 10);
        check_voice(errors, &self.voice);
        check_language(errors, &self.language);
    }
}

/// Audio message node. `mode` statically selects between TTS rendering and a
/// pre-recorded audio reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioData {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_welcome", alias = "messageText")]
    pub message_text: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, alias = "audioUrl")]
    pub audio_url: Option<String>,
    #[serde(default, alias = "audioAssetId")]
    pub audio_asset_id: Option<String>,
    #[serde(default = "default_after_playback", alias = "afterPlayback")]
    pub after_playback: String,
    #[serde(default = "default_timeout", alias = "timeoutSeconds")]
    pub timeout: u32,
    #[serde(default = "default_retries", alias = "maxRetries")]
    pub max_retries: u32,
    #[serde(default, alias = "fallbackAudioNodeId")]
    pub fallback_audio_node_id: Option<String>,
    #[serde(default, alias = "promptKey")]
    pub prompt_key: Option<String>,
}

impl AudioData {
    fn check(&self, errors: &mut Vec<String>) {
        check_choice(errors, "mode", &self.mode, &["tts", "upload"]);
        check_choice(errors, "after_playback", &self.after_playback, &["next", "wait"]);
        check_range(errors, "timeout", self.timeout as i64, 1, 60);
        check_range(errors, "max_retries", self.max_retries as i64, 1, 10);
        check_voice(errors, &self.voice);
        check_language(errors, &self.language);
        if self.mode == "upload" && self.audio_url.is_none() && self.audio_asset_id.is_none() {
            errors.push("Upload mode requires audio_url or audio_asset_id".to_string());
        }
    }
}

/// User input and speech input nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputData {
    #[serde(default = "default_digit")]
    pub digit: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_input_action")]
    pub action: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, alias = "promptAudioNodeId")]
    pub prompt_audio_node_id: Option<String>,
    #[serde(default, alias = "invalidAudioNodeId")]
    pub invalid_audio_node_id: Option<String>,
    #[serde(default, alias = "timeoutAudioNodeId")]
    pub timeout_audio_node_id: Option<String>,
    #[serde(default = "default_retries", alias = "maxAttempts")]
    pub max_attempts: u32,
    #[serde(default = "default_timeout", alias = "timeoutSeconds")]
    pub timeout: u32,
}

impl InputData {
    fn check(&self, errors: &mut Vec<String>) {
        check_choice(
            errors,
            "action",
            &self.action,
            &["transfer", "voicemail", "menu", "end"],
        );
        check_range(errors, "max_attempts", self.max_attempts as i64, 1, 10);
        check_range(errors, "timeout", self.timeout as i64, 1, 60);
    }
}

/// Conditional branch node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalData {
    #[serde(default = "default_condition")]
    pub condition: String,
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, alias = "truePath")]
    pub true_path: Option<String>,
    #[serde(default, alias = "falsePath")]
    pub false_path: Option<String>,
}

impl ConditionalData {
    fn check(&self, errors: &mut Vec<String>) {
        check_choice(
            errors,
            "condition",
            &self.condition,
            &["business_hours", "caller_id", "custom"],
        );
        if Operator::parse(&self.operator).is_none() {
            errors.push(format!(
                "Field 'operator' must be one of equals, not_equals, contains, greater_than, \
                 less_than, exists, regex (got '{}')",
                self.operator
            ));
        }
    }
}

/// Voicemail recording node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicemailData {
    #[serde(default = "default_voicemail_text")]
    pub text: String,
    #[serde(default = "default_max_length", alias = "maxLength")]
    pub max_length: u32,
    #[serde(default = "default_bool_true")]
    pub transcribe: bool,
    #[serde(default = "default_bool_true", alias = "playBeep")]
    pub play_beep: bool,
    #[serde(default, alias = "greetingAudioNodeId")]
    pub greeting_audio_node_id: Option<String>,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    #[serde(default, alias = "storageRoute")]
    pub storage_route: Option<String>,
}

impl VoicemailData {
    fn check(&self, errors: &mut Vec<String>) {
        check_range(errors, "max_length", self.max_length as i64, 1, 300);
    }
}

/// Call transfer node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferData {
    pub destination: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, alias = "announceText")]
    pub announce_text: Option<String>,
    #[serde(default = "default_transfer_timeout")]
    pub timeout: u32,
}

impl TransferData {
    fn check(&self, errors: &mut Vec<String>) {
        if !PHONE_RE.is_match(&self.destination) {
            errors.push(format!(
                "Field 'destination' must be an E.164-like phone number (got '{}')",
                self.destination
            ));
        }
        check_range(errors, "timeout", self.timeout as i64, 1, 120);
    }
}

/// Prompt repeat node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatData {
    #[serde(default = "default_retries", alias = "maxRepeats")]
    pub max_repeats: u32,
    #[serde(default, alias = "repeatMessage")]
    pub repeat_message: Option<String>,
    #[serde(default, alias = "fallbackNodeId")]
    pub fallback_node_id: Option<String>,
    #[serde(default, alias = "fallbackMessage")]
    pub fallback_message: Option<String>,
    #[serde(default = "default_bool_true", alias = "replayLastPrompt")]
    pub replay_last_prompt: bool,
    #[serde(default, alias = "resetOnRepeat")]
    pub reset_on_repeat: bool,
}

impl RepeatData {
    fn check(&self, errors: &mut Vec<String>) {
        check_range(errors, "max_repeats", self.max_repeats as i64, 1, 10);
    }
}

/// Call termination node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndData {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "default_termination", alias = "terminationType")]
    pub termination_type: String,
    #[serde(default, alias = "transferNumber")]
    pub transfer_number: Option<String>,
    #[serde(default, alias = "voicemailBox")]
    pub voicemail_box: Option<String>,
    #[serde(default = "default_callback_delay", alias = "callbackDelay")]
    pub callback_delay: u32,
    #[serde(default = "default_retries", alias = "maxCallbackAttempts")]
    pub max_callback_attempts: u32,
    #[serde(default, alias = "sendSurvey")]
    pub send_survey: bool,
    #[serde(default = "default_bool_true", alias = "logCall")]
    pub log_call: bool,
    #[serde(default, alias = "sendReceipt")]
    pub send_receipt: bool,
    #[serde(default = "default_contact_method", alias = "contactMethod")]
    pub contact_method: String,
}

impl EndData {
    fn check(&self, errors: &mut Vec<String>) {
        check_choice(
            errors,
            "termination_type",
            &self.termination_type,
            &["hangup", "transfer", "voicemail", "callback"],
        );
        check_choice(
            errors,
            "contact_method",
            &self.contact_method,
            &["sms", "email", "whatsapp"],
        );
        check_range(errors, "callback_delay", self.callback_delay as i64, 1, 60);
        check_range(
            errors,
            "max_callback_attempts",
            self.max_callback_attempts as i64,
            1,
            10,
        );
        if self.termination_type == "transfer" && self.transfer_number.is_none() {
            errors.push("Termination type 'transfer' requires transfer_number".to_string());
        }
    }
}

/// AI assistant hand-off node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAssistantData {
    #[serde(alias = "streamUrl")]
    pub stream_url: String,
    #[serde(default, alias = "welcomeMessage")]
    pub welcome_message: Option<String>,
    #[serde(default = "default_max_duration", alias = "maxDuration")]
    pub max_duration: u32,
    #[serde(default = "default_assistant_language")]
    pub language: String,
    #[serde(default = "default_voice_profile", alias = "voiceProfile")]
    pub voice_profile: String,
    #[serde(default, alias = "contextData")]
    pub context_data: Option<Value>,
    #[serde(default = "default_bool_true", alias = "transferOnHumanRequest")]
    pub transfer_on_human_request: bool,
    #[serde(default, alias = "humanTransferDestination")]
    pub human_transfer_destination: Option<String>,
}

impl AiAssistantData {
    fn check(&self, errors: &mut Vec<String>) {
        if !URL_RE.is_match(&self.stream_url) {
            errors.push(format!(
                "Field 'stream_url' must be an http(s) URL (got '{}')",
                self.stream_url
            ));
        }
        check_range(errors, "max_duration", self.max_duration as i64, 30, 1800);
        check_language(errors, &self.language);
        check_choice(
            errors,
            "voice_profile",
            &self.voice_profile,
            &["professional", "friendly", "casual"],
        );
    }
}

/// Waiting queue node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueData {
    #[serde(default = "default_queue_name", alias = "queueName")]
    pub queue_name: String,
    #[serde(default = "default_max_duration", alias = "maxWaitTime")]
    pub max_wait_time: u32,
    #[serde(default, alias = "waitMessage")]
    pub wait_message: Option<String>,
    #[serde(default = "default_bool_true", alias = "positionAnnouncement")]
    pub position_announcement: bool,
    #[serde(default = "default_music", alias = "musicOnHold")]
    pub music_on_hold: String,
    #[serde(default, alias = "customMusicUrl")]
    pub custom_music_url: Option<String>,
}

impl QueueData {
    fn check(&self, errors: &mut Vec<String>) {
        check_range(errors, "max_wait_time", self.max_wait_time as i64, 30, 1800);
        check_choice(
            errors,
            "music_on_hold",
            &self.music_on_hold,
            &["default", "none", "custom"],
        );
    }
}

/// SMS send node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsData {
    pub message: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default, alias = "fromNumber")]
    pub from_number: Option<String>,
    #[serde(default = "default_bool_true", alias = "sendImmediately")]
    pub send_immediately: bool,
}

impl SmsData {
    fn check(&self, errors: &mut Vec<String>) {
        if self.message.is_empty() || self.message.len() > 1600 {
            errors.push(format!(
                "Field 'message' length must be in [1, 1600] (got {})",
                self.message.len()
            ));
        }
        if let Some(to) = &self.to {
            if !PHONE_RE.is_match(to) {
                errors.push(format!(
                    "Field 'to' must be an E.164-like phone number (got '{}')",
                    to
                ));
            }
        }
    }
}

/// Context variable binding node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetVariableData {
    pub variable: String,
    pub value: Value,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_bool_true")]
    pub overwrite: bool,
}

impl SetVariableData {
    fn check(&self, errors: &mut Vec<String>) {
        if self.variable.is_empty() || self.variable.len() > 100 {
            errors.push(format!(
                "Field 'variable' length must be in [1, 100] (got {})",
                self.variable.len()
            ));
        }
        check_choice(errors, "scope", &self.scope, &["call", "session", "global"]);
    }
}

/// External HTTP call node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCallData {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: Option<Value>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default, alias = "outputVariable")]
    pub output_variable: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default, alias = "retryCount")]
    pub retry_count: u32,
    #[serde(default = "default_success_codes", alias = "successCodes")]
    pub success_codes: Vec<u16>,
}

impl ApiCallData {
    fn check(&self, errors: &mut Vec<String>) {
        if !URL_RE.is_match(&self.url) {
            errors.push(format!(
                "Field 'url' must be an http(s) URL (got '{}')",
                self.url
            ));
        }
        check_choice(
            errors,
            "method",
            &self.method,
            &["GET", "POST", "PUT", "DELETE", "PATCH"],
        );
        check_range(errors, "timeout", self.timeout as i64, 1, 60);
        check_range(errors, "retry_count", self.retry_count as i64, 0, 5);
    }
}

fn default_welcome() -> String {
    "Welcome to our service.".to_string()
}
fn default_voice() -> String {
    callflow_core::voice::DEFAULT_VOICE.to_string()
}
fn default_language() -> String {
    callflow_core::voice::DEFAULT_LANGUAGE.to_string()
}
fn default_timeout() -> u32 {
    10
}
fn default_retries() -> u32 {
    3
}
fn default_mode() -> String {
    "tts".to_string()
}
fn default_after_playback() -> String {
    "next".to_string()
}
fn default_digit() -> String {
    "1".to_string()
}
fn default_input_action() -> String {
    "transfer".to_string()
}
fn default_condition() -> String {
    "custom".to_string()
}
fn default_operator() -> String {
    "equals".to_string()
}
fn default_voicemail_text() -> String {
    "Please leave your message after the beep.".to_string()
}
fn default_max_length() -> u32 {
    60
}
fn default_bool_true() -> bool {
    true
}
fn default_mailbox() -> String {
    "general".to_string()
}
fn default_transfer_timeout() -> u32 {
    30
}
fn default_termination() -> String {
    "hangup".to_string()
}
fn default_callback_delay() -> u32 {
    15
}
fn default_contact_method() -> String {
    "sms".to_string()
}
fn default_max_duration() -> u32 {
    300
}
fn default_assistant_language() -> String {
    "en-US".to_string()
}
fn default_voice_profile() -> String {
    "professional".to_string()
}
fn default_queue_name() -> String {
    "General".to_string()
}
fn default_music() -> String {
    "default".to_string()
}
fn default_scope() -> String {
    "call".to_string()
}
fn default_method() -> String {
    "GET".to_string()
}
fn default_success_codes() -> Vec<u16> {
    vec![200, 201, 202]
}

fn check_range(errors: &mut Vec<String>, field: &str, value: i64, min: i64, max: i64) {
    if value < min || value > max {
        errors.push(format!(
            "Field '{}' must be in [{}, {}] (got {})",
            field, min, max, value
        ));
    }
}

fn check_choice(errors: &mut Vec<String>, field: &str, value: &str, options: &[&str]) {
    if !options.contains(&value) {
        errors.push(format!(
            "Field '{}' must be one of {} (got '{}')",
            field,
            options.join(", "),
            value
        ));
    }
}

fn check_voice(errors: &mut Vec<String>, voice: &str) {
    if !is_allowed_voice(voice) {
        errors.push(voice_validation_error());
    }
}

fn check_language(errors: &mut Vec<String>, language: &str) {
    if !LANG_RE.is_match(language) {
        errors.push(format!(
            "Field 'language' must match xx-XX (got '{}')",
            language
        ));
    }
}

/// Required fields per node type, as (canonical, accepted aliases)
fn required_fields(node_type: NodeType) -> &'static [(&'static str, &'static [&'static str])] {
    match node_type {
        NodeType::Transfer => &[("destination", &[])],
        NodeType::AiAssistant => &[("stream_url", &["streamUrl"])],
        NodeType::Sms => &[("message", &[])],
        NodeType::SetVariable => &[("variable", &[]), ("value", &[])],
        NodeType::ApiCall => &[("url", &[])],
        _ => &[],
    }
}

/// Validate raw node data against the contract for `node_type`
///
/// Returns the canonical record on success, or the full list of violated
/// constraints on failure. Never panics on malformed input.
pub fn validate_node_data(node_type: NodeType, raw: &Value) -> Validation {
    if !raw.is_object() {
        return Validation::fail(vec!["Node data must be an object".to_string()]);
    }

    // Collect every missing required field before attempting to deserialize,
    // so the caller sees them all at once.
    let obj = raw.as_object().expect("checked above");
    let mut errors: Vec<String> = Vec::new();
    for (canonical, aliases) in required_fields(node_type) {
        let present =
            obj.contains_key(*canonical) || aliases.iter().any(|a| obj.contains_key(*a));
        if !present {
            errors.push(format!("Missing required field: {}", canonical));
        }
    }
    if !errors.is_empty() {
        return Validation::fail(errors);
    }

    match parse_node_data(node_type, raw.clone()) {
        Ok(data) => {
            let mut errors = Vec::new();
            data.check(&mut errors);
            if errors.is_empty() {
                let canonical = serde_json::to_value(&data)
                    .expect("canonical node data serializes");
                Validation::ok(canonical)
            } else {
                Validation::fail(errors)
            }
        }
        Err(e) => Validation::fail(vec![format!("Malformed node data: {}", e)]),
    }
}

/// Deserialize raw data into the canonical record for `node_type`
pub fn parse_node_data(node_type: NodeType, raw: Value) -> Result<NodeData, serde_json::Error> {
    use serde_json::from_value;

    Ok(match node_type {
        NodeType::Greeting | NodeType::Menu => NodeData::Greeting(from_value(raw)?),
        NodeType::Audio => NodeData::Audio(from_value(raw)?),
        NodeType::UserInput | NodeType::SpeechInput => NodeData::Input(from_value(raw)?),
        NodeType::Conditional => NodeData::Conditional(from_value(raw)?),
        NodeType::Voicemail => NodeData::Voicemail(from_value(raw)?),
        NodeType::Transfer => NodeData::Transfer(from_value(raw)?),
        NodeType::Repeat => NodeData::Repeat(from_value(raw)?),
        NodeType::End => NodeData::End(from_value(raw)?),
        NodeType::AiAssistant => NodeData::AiAssistant(from_value(raw)?),
        NodeType::Queue => NodeData::Queue(from_value(raw)?),
        NodeType::Sms => NodeData::Sms(from_value(raw)?),
        NodeType::SetVariable => NodeData::SetVariable(from_value(raw)?),
        NodeType::ApiCall => NodeData::ApiCall(from_value(raw)?),
    })
}

impl NodeData {
    fn check(&self, errors: &mut Vec<String>) {
        match self {
            NodeData::Greeting(d) => d.check(errors),
            NodeData::Audio(d) => d.check(errors),
            NodeData::Input(d) => d.check(errors),
            NodeData::Conditional(d) => d.check(errors),
            NodeData::Voicemail(d) => d.check(errors),
            NodeData::Transfer(d) => d.check(errors),
            NodeData::Repeat(d) => d.check(errors),
            NodeData::End(d) => d.check(errors),
            NodeData::AiAssistant(d) => d.check(errors),
            NodeData::Queue(d) => d.check(errors),
            NodeData::Sms(d) => d.check(errors),
            NodeData::SetVariable(d) => d.check(errors),
            NodeData::ApiCall(d) => d.check(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_data_defaults_or_lists_missing_fields() {
        for nt in NodeType::all() {
            let result = validate_node_data(*nt, &json!({}));
            let required = required_fields(*nt);
            if required.is_empty() {
                assert!(result.valid, "{} should accept empty data", nt);
                assert!(result.data.is_some());
            } else {
                assert!(!result.valid, "{} should reject empty data", nt);
                assert_eq!(result.errors.len(), required.len());
                for (field, _) in required {
                    assert!(
                        result.errors.iter().any(|e| e.contains(field)),
                        "{} missing-field errors should name '{}'",
                        nt,
                        field
                    );
                }
            }
        }
    }

    #[test]
    fn camel_case_fields_normalize_to_canonical() {
        let result = validate_node_data(
            NodeType::Audio,
            &json!({
                "messageText": "Hello there",
                "timeoutSeconds": 20,
                "maxRetries": 5,
                "afterPlayback": "wait"
            }),
        );
        assert!(result.valid, "{:?}", result.errors);
        let data = result.data.unwrap();
        assert_eq!(data["message_text"], "Hello there");
        assert_eq!(data["timeout"], 20);
        assert_eq!(data["max_retries"], 5);
        assert_eq!(data["after_playback"], "wait");
        // Canonical record carries no camelCase duplicates
        assert!(data.get("messageText").is_none());
        assert!(data.get("timeoutSeconds").is_none());
    }

    #[test]
    fn transfer_destination_pattern() {
        let good = validate_node_data(
            NodeType::Transfer,
            &json!({"destination": "+14155550123", "timeout": 30}),
        );
        assert!(good.valid);

        let bad = validate_node_data(NodeType::Transfer, &json!({"destination": "not-a-number"}));
        assert!(!bad.valid);
        assert!(bad.errors[0].contains("destination"));
    }

    #[test]
    fn all_violations_reported_together() {
        let result = validate_node_data(
            NodeType::Transfer,
            &json!({"destination": "bogus", "timeout": 500}),
        );
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn upload_mode_requires_audio_reference() {
        let missing = validate_node_data(NodeType::Audio, &json!({"mode": "upload"}));
        assert!(!missing.valid);

        let with_url = validate_node_data(
            NodeType::Audio,
            &json!({"mode": "upload", "audioUrl": "https://cdn.example.com/a.mp3"}),
        );
        assert!(with_url.valid);
    }

    #[test]
    fn legacy_voice_names_rejected() {
        let result = validate_node_data(NodeType::Greeting, &json!({"voice": "alice"}));
        assert!(!result.valid);
        assert!(result.errors[0].starts_with("Voice must be one of"));
    }

    #[test]
    fn timeout_bounds() {
        assert!(!validate_node_data(NodeType::Greeting, &json!({"timeout": 0})).valid);
        assert!(!validate_node_data(NodeType::Greeting, &json!({"timeout": 61})).valid);
        assert!(validate_node_data(NodeType::Transfer, &json!({
            "destination": "+14155550123", "timeout": 120
        }))
        .valid);
    }

    #[test]
    fn set_variable_requires_both_fields() {
        let result = validate_node_data(NodeType::SetVariable, &json!({}));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn sms_length_bounds() {
        let long = "x".repeat(1601);
        assert!(!validate_node_data(NodeType::Sms, &json!({ "message": long })).valid);
        assert!(validate_node_data(NodeType::Sms, &json!({"message": "hi"})).valid);
    }

    #[test]
    fn malformed_types_do_not_panic() {
        let result = validate_node_data(NodeType::Greeting, &json!({"timeout": "soon"}));
        assert!(!result.valid);
        assert!(result.errors[0].starts_with("Malformed node data"));

        let result = validate_node_data(NodeType::Greeting, &json!([1, 2, 3]));
        assert!(!result.valid);
    }
}
