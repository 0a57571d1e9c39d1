use crate::{
    AgentEvent, AgentId, Conversation, ConversationId, ConversationSettingsPatch,
    LoadedConversation, PendingMessage, WorkspaceId,
};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub enum Action {
    LoadConversations {
        workspace_id: WorkspaceId,
        agent_id: AgentId,
    },
    ConversationsLoaded {
        workspace_id: WorkspaceId,
        agent_id: AgentId,
        conversations: Vec<Conversation>,
    },

    SelectConversation {
        conversation_id: Option<ConversationId>,
    },
    ConversationLoaded {
        conversation_id: ConversationId,
        loaded: Option<LoadedConversation>,
    },

    CreateConversation,
    ConversationCreated {
        conversation: Conversation,
        pending: Option<PendingMessage>,
    },
    ConversationCreateFailed {
        message: String,
    },

    SendMessage {
        content: String,
        working_directory: PathBuf,
        agent_prompt_file: Option<PathBuf>,
    },
    MessageDispatchFailed {
        conversation_id: ConversationId,
        message: String,
    },
    MessagePersisted {
        conversation_id: ConversationId,
    },
    AgentEventReceived {
        event: AgentEvent,
    },

    StopAgent {
        agent_id: AgentId,
    },
    AgentStopped {
        agent_id: AgentId,
    },
    AgentStopFailed {
        agent_id: AgentId,
        message: String,
    },

    CheckAgentAvailable,
    AgentAvailabilityChecked {
        executable: Option<PathBuf>,
    },

    RenameConversation {
        conversation_id: ConversationId,
        title: String,
    },
    UpdateConversationSettings {
        conversation_id: ConversationId,
        patch: ConversationSettingsPatch,
    },
    ConversationUpdated {
        conversation: Conversation,
    },

    DeleteConversation {
        conversation_id: ConversationId,
    },
    DeleteConversationsByBranch {
        workspace_id: WorkspaceId,
        branch_name: String,
    },
    ConversationsDeleted {
        conversation_ids: Vec<ConversationId>,
    },

    DismissError,
}
