use crate::{
    AgentId, AgentStatus, Conversation, ConversationId, ConversationLocation, ConversationMessage,
    ConversationPatch, ConversationSettings, ConversationSettingsPatch, LoadedConversation,
    WorkspaceId,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum AgentEvent {
    StreamDelta {
        conversation_id: ConversationId,
        agent_id: AgentId,
        delta: String,
    },
    Message {
        conversation_id: ConversationId,
        agent_id: AgentId,
        message: ConversationMessage,
    },
    Status {
        agent_id: AgentId,
        status: AgentStatus,
        error: Option<String>,
    },
    SessionStarted {
        conversation_id: ConversationId,
        agent_id: AgentId,
        session_id: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SendMessageRequest {
    pub conversation_id: ConversationId,
    pub agent_id: AgentId,
    pub content: String,
    pub working_directory: PathBuf,
    pub session_id: Option<String>,
    pub agent_prompt_file: Option<PathBuf>,
    pub settings: ConversationSettings,
}

/// Keeps an agent event listener registered. Dropping it unregisters.
#[must_use = "dropping the subscription unregisters the listener"]
pub struct AgentSubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl AgentSubscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A subscription with nothing to release.
    pub fn detached() -> Self {
        Self { unsubscribe: None }
    }
}

impl Drop for AgentSubscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for AgentSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSubscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

pub type AgentEventCallback = Arc<dyn Fn(AgentEvent) + Send + Sync>;

/// The external agent runtime.
pub trait AgentClient: Send + Sync {
    fn send_message(&self, request: SendMessageRequest) -> Result<(), String>;

    fn stop_agent(&self, agent_id: AgentId) -> Result<(), String>;

    /// Path to the runtime executable, if it can be found.
    fn check_available(&self) -> Option<PathBuf>;

    fn subscribe(&self, on_event: AgentEventCallback) -> AgentSubscription;
}

pub trait WorkspaceSettingsProvider: Send + Sync {
    fn conversation_defaults(&self, workspace_id: &WorkspaceId)
    -> Result<ConversationSettings, String>;
}

/// Always answers with the global defaults.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalDefaults;

impl WorkspaceSettingsProvider for GlobalDefaults {
    fn conversation_defaults(
        &self,
        _workspace_id: &WorkspaceId,
    ) -> Result<ConversationSettings, String> {
        Ok(ConversationSettings::default())
    }
}

/// Conversation metadata and message log persistence.
///
/// Reads degrade to empty values and lookup misses surface as `None`/`false`;
/// only conversation creation reports an error.
pub trait ConversationStore: Send + Sync {
    fn list_conversations(&self, workspace_id: WorkspaceId, agent_id: AgentId)
    -> Vec<Conversation>;

    fn create_conversation(
        &self,
        workspace_id: WorkspaceId,
        agent_id: AgentId,
    ) -> Result<Conversation, String>;

    fn load_conversation(&self, conversation_id: ConversationId) -> Option<LoadedConversation>;

    fn update_conversation(
        &self,
        conversation_id: ConversationId,
        patch: ConversationPatch,
    ) -> Option<Conversation>;

    fn update_conversation_settings(
        &self,
        conversation_id: ConversationId,
        patch: ConversationSettingsPatch,
    ) -> Option<Conversation>;

    fn delete_conversation(&self, conversation_id: ConversationId) -> bool;

    fn delete_conversations_by_branch(
        &self,
        workspace_id: WorkspaceId,
        branch_name: String,
    ) -> Vec<ConversationId>;

    fn append_message(&self, conversation_id: ConversationId, message: ConversationMessage)
    -> bool;

    /// Cached location only; never touches the disk.
    fn conversation_location(&self, conversation_id: &ConversationId)
    -> Option<ConversationLocation>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dropping_subscription_runs_unsubscribe_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let subscription = AgentSubscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        drop(subscription);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(AgentSubscription::detached());
    }

    #[test]
    fn global_defaults_ignore_workspace() {
        let settings = GlobalDefaults
            .conversation_defaults(&WorkspaceId::new("anything"))
            .unwrap();
        assert_eq!(settings, ConversationSettings::default());
    }
}
