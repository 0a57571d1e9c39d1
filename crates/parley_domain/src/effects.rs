use crate::{
    AgentId, ConversationId, ConversationMessage, ConversationPatch, ConversationSettingsPatch,
    SendMessageRequest, WorkspaceId,
};
use std::path::PathBuf;

/// A send that is waiting for its conversation to be created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingMessage {
    pub content: String,
    pub working_directory: PathBuf,
    pub agent_prompt_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub enum Effect {
    ListConversations {
        workspace_id: WorkspaceId,
        agent_id: AgentId,
    },
    LoadConversation {
        conversation_id: ConversationId,
    },
    CreateConversation {
        workspace_id: WorkspaceId,
        agent_id: AgentId,
        pending: Option<PendingMessage>,
    },
    AppendMessage {
        conversation_id: ConversationId,
        message: ConversationMessage,
    },
    UpdateConversation {
        conversation_id: ConversationId,
        patch: ConversationPatch,
    },
    UpdateConversationSettings {
        conversation_id: ConversationId,
        patch: ConversationSettingsPatch,
    },
    DeleteConversation {
        conversation_id: ConversationId,
    },
    DeleteConversationsByBranch {
        workspace_id: WorkspaceId,
        branch_name: String,
    },

    DispatchMessage {
        request: SendMessageRequest,
    },
    StopAgent {
        agent_id: AgentId,
    },
    CheckAgentAvailable,
}
