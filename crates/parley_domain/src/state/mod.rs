mod conversation;
mod ids;
mod message;
mod session;

pub use conversation::{
    Conversation, ConversationIndex, ConversationPatch, DEFAULT_CONVERSATION_TITLE,
    LoadedConversation, sort_by_recent,
};
pub use ids::{AgentId, ConversationId, ConversationLocation, WorkspaceId};
pub use message::{ConversationMessage, MessageType, ResearchSource};
pub use session::{AgentStatus, ChatSessionState, StreamingState};
