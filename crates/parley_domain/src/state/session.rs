use super::{AgentId, Conversation, ConversationId, ConversationMessage, WorkspaceId};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Ready,
    Busy,
    Error,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Ready => "ready",
            AgentStatus::Busy => "busy",
            AgentStatus::Error => "error",
        }
    }

    /// Statuses after which no further output is expected for the current turn.
    pub fn ends_turn(self) -> bool {
        matches!(self, AgentStatus::Ready | AgentStatus::Error)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StreamingState {
    pub conversation_id: ConversationId,
    pub agent_id: AgentId,
    pub content: String,
}

/// In-memory state of one chat window. Mutated only through `apply`.
#[derive(Clone, Debug, Default)]
pub struct ChatSessionState {
    pub workspace_id: Option<WorkspaceId>,
    pub agent_id: Option<AgentId>,
    pub active_conversation_id: Option<ConversationId>,
    pub conversations: Vec<Conversation>,
    pub messages: Vec<ConversationMessage>,
    pub is_loading: bool,
    pub streaming: Option<StreamingState>,
    pub agent_status: HashMap<AgentId, AgentStatus>,
    pub unread_counts: HashMap<ConversationId, u32>,
    pub unread_by_agent: HashMap<AgentId, u32>,
    pub agent_executable: Option<PathBuf>,
    pub last_error: Option<String>,

    pub(crate) unread_owners: HashMap<ConversationId, AgentId>,
}

impl ChatSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    pub fn streaming_conversation_id(&self) -> Option<&ConversationId> {
        self.streaming.as_ref().map(|s| &s.conversation_id)
    }

    pub fn streaming_content(&self) -> &str {
        self.streaming.as_ref().map(|s| s.content.as_str()).unwrap_or("")
    }

    pub fn agent_status(&self, agent_id: &AgentId) -> AgentStatus {
        self.agent_status.get(agent_id).copied().unwrap_or_default()
    }

    pub fn unread_count(&self, conversation_id: &ConversationId) -> u32 {
        self.unread_counts.get(conversation_id).copied().unwrap_or(0)
    }

    pub fn unread_for_agent(&self, agent_id: &AgentId) -> u32 {
        self.unread_by_agent.get(agent_id).copied().unwrap_or(0)
    }

    pub fn conversation(&self, conversation_id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == conversation_id)
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_conversation_id
            .as_ref()
            .and_then(|id| self.conversation(id))
    }

    pub(crate) fn conversation_mut(
        &mut self,
        conversation_id: &ConversationId,
    ) -> Option<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| &c.id == conversation_id)
    }

    pub(crate) fn is_active(&self, conversation_id: &ConversationId) -> bool {
        self.active_conversation_id.as_ref() == Some(conversation_id)
    }

    pub(crate) fn record_unread(&mut self, conversation_id: &ConversationId, agent_id: &AgentId) {
        *self
            .unread_counts
            .entry(conversation_id.clone())
            .or_insert(0) += 1;
        *self.unread_by_agent.entry(agent_id.clone()).or_insert(0) += 1;
        self.unread_owners
            .insert(conversation_id.clone(), agent_id.clone());
    }

    /// Drops a conversation's unread count and takes exactly that amount off
    /// its agent's aggregate.
    pub(crate) fn clear_unread(&mut self, conversation_id: &ConversationId) {
        let cleared = self.unread_counts.remove(conversation_id).unwrap_or(0);
        let Some(agent_id) = self.unread_owners.remove(conversation_id) else {
            return;
        };
        if let Some(total) = self.unread_by_agent.get_mut(&agent_id) {
            *total = total.saturating_sub(cleared);
            if *total == 0 {
                self.unread_by_agent.remove(&agent_id);
            }
        }
    }

    pub(crate) fn clear_streaming_for_agent(&mut self, agent_id: &AgentId) {
        if self
            .streaming
            .as_ref()
            .is_some_and(|s| &s.agent_id == agent_id)
        {
            self.streaming = None;
        }
    }

    pub(crate) fn reset_active_conversation(&mut self) {
        self.active_conversation_id = None;
        self.conversations.clear();
        self.messages.clear();
        self.streaming = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_unread_decrements_agent_by_cleared_amount() {
        let mut state = ChatSessionState::new();
        let agent = AgentId::new("a");
        let c1 = ConversationId::new("c1");
        let c2 = ConversationId::new("c2");
        state.record_unread(&c1, &agent);
        state.record_unread(&c1, &agent);
        state.record_unread(&c2, &agent);
        assert_eq!(state.unread_for_agent(&agent), 3);

        state.clear_unread(&c1);
        assert_eq!(state.unread_count(&c1), 0);
        assert_eq!(state.unread_for_agent(&agent), 1);

        state.clear_unread(&c1);
        assert_eq!(state.unread_for_agent(&agent), 1);

        state.clear_unread(&c2);
        assert_eq!(state.unread_for_agent(&agent), 0);
        assert!(state.unread_by_agent.is_empty());
    }

    #[test]
    fn agent_status_defaults_to_ready() {
        let state = ChatSessionState::new();
        assert_eq!(state.agent_status(&AgentId::new("x")), AgentStatus::Ready);
        assert!(AgentStatus::Error.ends_turn());
        assert!(!AgentStatus::Busy.ends_turn());
    }
}
