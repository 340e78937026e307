//! Node type definitions and the static node registry

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of workflow node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Greeting,
    /// Audio message node (TTS or uploaded file)
    Audio,
    Menu,
    /// DTMF/speech input collection. Wire name is the historical "input".
    #[serde(rename = "input")]
    UserInput,
    SpeechInput,
    Conditional,
    Voicemail,
    Transfer,
    Repeat,
    End,
    AiAssistant,
    Queue,
    Sms,
    SetVariable,
    ApiCall,
}

impl NodeType {
    /// Parse the wire name of a node type
    pub fn parse(s: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).ok()
    }

    /// Wire name of this node type
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Greeting => "greeting",
            NodeType::Audio => "audio",
            NodeType::Menu => "menu",
            NodeType::UserInput => "input",
            NodeType::SpeechInput => "speech_input",
            NodeType::Conditional => "conditional",
            NodeType::Voicemail => "voicemail",
            NodeType::Transfer => "transfer",
            NodeType::Repeat => "repeat",
            NodeType::End => "end",
            NodeType::AiAssistant => "ai_assistant",
            NodeType::Queue => "queue",
            NodeType::Sms => "sms",
            NodeType::SetVariable => "set_variable",
            NodeType::ApiCall => "api_call",
        }
    }

    /// All declared node types
    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::Greeting,
            NodeType::Audio,
            NodeType::Menu,
            NodeType::UserInput,
            NodeType::SpeechInput,
            NodeType::Conditional,
            NodeType::Voicemail,
            NodeType::Transfer,
            NodeType::Repeat,
            NodeType::End,
            NodeType::AiAssistant,
            NodeType::Queue,
            NodeType::Sms,
            NodeType::SetVariable,
            NodeType::ApiCall,
        ]
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node categories for display grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Interaction,
    Logic,
    Action,
    Service,
    Data,
}

/// Execution flags for a node type
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecutionFlags {
    /// Node advances to the next one without caller interaction
    pub auto_advance: bool,
    /// Node blocks the flow until it completes
    pub blocking: bool,
    /// Node collects caller input
    pub collect_input: bool,
}

/// Display metadata for a node type
#[derive(Debug, Clone, Serialize)]
pub struct NodeConfig {
    pub node_type: NodeType,
    pub name: &'static str,
    pub category: NodeCategory,
    pub description: &'static str,
    /// Named output edges
    pub outputs: &'static [&'static str],
    pub execution: ExecutionFlags,
}

const DTMF_OUTPUTS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "*", "#", "timeout", "no_match",
];

static NODE_CONFIGS: Lazy<HashMap<NodeType, NodeConfig>> = Lazy::new(|| {
    use NodeCategory::*;
    use NodeType::*;

    let configs = [
        NodeConfig {
            node_type: Greeting,
            name: "Greeting/Menu",
            category: Interaction,
            description: "Welcome message and menu options",
            outputs: DTMF_OUTPUTS,
            execution: ExecutionFlags {
                auto_advance: false,
                blocking: true,
                collect_input: true,
            },
        },
        NodeConfig {
            node_type: Audio,
            name: "Audio Message",
            category: Interaction,
            description: "Play audio message (TTS or uploaded file)",
            outputs: &["next", "timeout"],
            execution: ExecutionFlags {
                auto_advance: false,
                blocking: true,
                collect_input: false,
            },
        },
        NodeConfig {
            node_type: Menu,
            name: "Menu",
            category: Interaction,
            description: "Menu prompt with option routing",
            outputs: DTMF_OUTPUTS,
            execution: ExecutionFlags {
                auto_advance: false,
                blocking: true,
                collect_input: true,
            },
        },
        NodeConfig {
            node_type: UserInput,
            name: "User Input",
            category: Interaction,
            description: "Collect user input via DTMF or speech",
            outputs: DTMF_OUTPUTS,
            execution: ExecutionFlags {
                auto_advance: false,
                blocking: true,
                collect_input: true,
            },
        },
        NodeConfig {
            node_type: SpeechInput,
            name: "Speech Input",
            category: Interaction,
            description: "Collect spoken input",
            outputs: &["matched", "timeout", "no_match"],
            execution: ExecutionFlags {
                auto_advance: false,
                blocking: true,
                collect_input: true,
            },
        },
        NodeConfig {
            node_type: Conditional,
            name: "Conditional",
            category: Logic,
            description: "Route calls based on conditions",
            outputs: &["true", "false"],
            execution: ExecutionFlags {
                auto_advance: true,
                blocking: false,
                collect_input: false,
            },
        },
        NodeConfig {
            node_type: Voicemail,
            name: "Voicemail",
            category: Action,
            description: "Record voicemail messages",
            outputs: &["completed", "timeout", "error"],
            execution: ExecutionFlags {
                auto_advance: false,
                blocking: true,
                collect_input: false,
            },
        },
        NodeConfig {
            node_type: Transfer,
            name: "Transfer",
            category: Action,
            description: "Transfer call to another number",
            outputs: &["answered", "busy", "no_answer", "failed"],
            execution: ExecutionFlags {
                auto_advance: false,
                blocking: true,
                collect_input: false,
            },
        },
        NodeConfig {
            node_type: Repeat,
            name: "Repeat",
            category: Logic,
            description: "Repeat previous prompt or menu",
            outputs: &["repeat", "fallback"],
            execution: ExecutionFlags {
                auto_advance: true,
                blocking: false,
                collect_input: false,
            },
        },
        NodeConfig {
            node_type: End,
            name: "End",
            category: Action,
            description: "End the call",
            outputs: &[],
            execution: ExecutionFlags {
                auto_advance: false,
                blocking: true,
                collect_input: false,
            },
        },
        NodeConfig {
            node_type: AiAssistant,
            name: "AI Assistant",
            category: Service,
            description: "Connect to AI assistant",
            outputs: &["completed", "transferred", "error"],
            execution: ExecutionFlags {
                auto_advance: false,
                blocking: true,
                collect_input: false,
            },
        },
        NodeConfig {
            node_type: Queue,
            name: "Queue",
            category: Service,
            description: "Place caller in a waiting queue",
            outputs: &["answered", "timeout", "abandoned"],
            execution: ExecutionFlags {
                auto_advance: false,
                blocking: true,
                collect_input: false,
            },
        },
        NodeConfig {
            node_type: Sms,
            name: "SMS",
            category: Data,
            description: "Send an SMS message",
            outputs: &["sent", "failed"],
            execution: ExecutionFlags {
                auto_advance: true,
                blocking: false,
                collect_input: false,
            },
        },
        NodeConfig {
            node_type: SetVariable,
            name: "Set Variable",
            category: Data,
            description: "Bind a value into the call context",
            outputs: &["next"],
            execution: ExecutionFlags {
                auto_advance: true,
                blocking: false,
                collect_input: false,
            },
        },
        NodeConfig {
            node_type: ApiCall,
            name: "API Call",
            category: Data,
            description: "Call an external HTTP API",
            outputs: &["success", "failure"],
            execution: ExecutionFlags {
                auto_advance: true,
                blocking: false,
                collect_input: false,
            },
        },
    ];

    configs.into_iter().map(|c| (c.node_type, c)).collect()
});

/// Get display metadata for a node type
pub fn node_config(node_type: NodeType) -> &'static NodeConfig {
    // Every variant is registered above; a miss would be a construction bug.
    &NODE_CONFIGS[&node_type]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_is_registered() {
        for nt in NodeType::all() {
            let config = node_config(*nt);
            assert_eq!(config.node_type, *nt);
        }
        assert_eq!(NODE_CONFIGS.len(), NodeType::all().len());
    }

    #[test]
    fn wire_names_round_trip() {
        for nt in NodeType::all() {
            assert_eq!(NodeType::parse(nt.as_str()), Some(*nt));
        }
        assert_eq!(NodeType::parse("input"), Some(NodeType::UserInput));
        assert_eq!(NodeType::parse("bogus"), None);
    }
}
