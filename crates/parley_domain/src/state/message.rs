#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    User,
    Assistant,
    ToolUse,
    ToolResult,
    Error,
    System,
    ResearchProgress,
    ResearchResult,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::User => "user",
            MessageType::Assistant => "assistant",
            MessageType::ToolUse => "tool_use",
            MessageType::ToolResult => "tool_result",
            MessageType::Error => "error",
            MessageType::System => "system",
            MessageType::ResearchProgress => "research_progress",
            MessageType::ResearchResult => "research_result",
        }
    }

    /// Message kinds that count toward unread badges.
    pub fn counts_as_unread(self) -> bool {
        matches!(self, MessageType::Assistant | MessageType::Error)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchSource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One line of a conversation's message log. Immutable once written.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub uuid: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub content: String,
    pub timestamp: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_tool_error: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<ResearchSource>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings_count: Option<u64>,
}

impl ConversationMessage {
    pub fn new(
        uuid: impl Into<String>,
        kind: MessageType,
        content: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            kind,
            content: content.into(),
            timestamp,
            tool_name: None,
            tool_input: None,
            tool_use_id: None,
            is_tool_error: None,
            input_tokens: None,
            output_tokens: None,
            cost_usd: None,
            duration_ms: None,
            research_phase: None,
            sources: None,
            sources_count: None,
            findings_count: None,
        }
    }
}
