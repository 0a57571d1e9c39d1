use crate::{
    Action, AgentEvent, AgentId, AgentStatus, ChatSessionState, Conversation, ConversationId,
    ConversationMessage, ConversationPatch, Effect, MessageType, PendingMessage,
    SendMessageRequest, StreamingState, sort_by_recent,
};
use crate::time::unix_epoch_millis_now;

mod title;

pub use title::derive_conversation_title;

impl ChatSessionState {
    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::LoadConversations {
                workspace_id,
                agent_id,
            } => {
                self.reset_active_conversation();
                self.workspace_id = Some(workspace_id.clone());
                self.agent_id = Some(agent_id.clone());
                self.is_loading = true;
                vec![Effect::ListConversations {
                    workspace_id,
                    agent_id,
                }]
            }
            Action::ConversationsLoaded {
                workspace_id,
                agent_id,
                mut conversations,
            } => {
                if self.workspace_id.as_ref() != Some(&workspace_id)
                    || self.agent_id.as_ref() != Some(&agent_id)
                {
                    return Vec::new();
                }
                self.is_loading = false;
                sort_by_recent(&mut conversations);
                self.conversations = conversations;

                if self.active_conversation_id.is_some() {
                    return Vec::new();
                }
                match self.conversations.first() {
                    Some(most_recent) => {
                        let conversation_id = most_recent.id.clone();
                        self.select_conversation(Some(conversation_id))
                    }
                    None => Vec::new(),
                }
            }

            Action::SelectConversation { conversation_id } => {
                self.select_conversation(conversation_id)
            }
            Action::ConversationLoaded {
                conversation_id,
                loaded,
            } => {
                if !self.is_active(&conversation_id) {
                    return Vec::new();
                }
                match loaded {
                    Some(loaded) => {
                        self.messages = loaded.messages;
                        self.upsert_conversation(loaded.conversation);
                    }
                    None => self.messages.clear(),
                }
                Vec::new()
            }

            Action::CreateConversation => {
                let (Some(workspace_id), Some(agent_id)) =
                    (self.workspace_id.clone(), self.agent_id.clone())
                else {
                    self.last_error = Some("no agent selected".to_owned());
                    return Vec::new();
                };
                vec![Effect::CreateConversation {
                    workspace_id,
                    agent_id,
                    pending: None,
                }]
            }
            Action::ConversationCreated {
                conversation,
                pending,
            } => {
                let conversation_id = conversation.id.clone();
                let in_scope = self.workspace_id.as_ref() == Some(&conversation.workspace_id)
                    && self.agent_id.as_ref() == Some(&conversation.agent_id);
                if in_scope {
                    self.upsert_conversation(conversation.clone());
                    self.active_conversation_id = Some(conversation_id.clone());
                    self.messages.clear();
                    self.clear_unread(&conversation_id);
                }
                match pending {
                    Some(pending) => self.start_send(&conversation, pending),
                    None => Vec::new(),
                }
            }
            Action::ConversationCreateFailed { message } => {
                self.streaming = None;
                self.last_error = Some(message);
                Vec::new()
            }

            Action::SendMessage {
                content,
                working_directory,
                agent_prompt_file,
            } => {
                if content.trim().is_empty() {
                    return Vec::new();
                }
                let pending = PendingMessage {
                    content,
                    working_directory,
                    agent_prompt_file,
                };

                if let Some(conversation) = self.active_conversation().cloned() {
                    return self.start_send(&conversation, pending);
                }

                let (Some(workspace_id), Some(agent_id)) =
                    (self.workspace_id.clone(), self.agent_id.clone())
                else {
                    self.last_error = Some("no agent selected".to_owned());
                    return Vec::new();
                };
                vec![Effect::CreateConversation {
                    workspace_id,
                    agent_id,
                    pending: Some(pending),
                }]
            }
            Action::MessageDispatchFailed {
                conversation_id,
                message,
            } => {
                if self.streaming_conversation_id() == Some(&conversation_id) {
                    self.streaming = None;
                }
                self.last_error = Some(message);
                Vec::new()
            }
            Action::MessagePersisted { conversation_id } => {
                let now = unix_epoch_millis_now();
                if let Some(conversation) = self.conversation_mut(&conversation_id) {
                    conversation.message_count = conversation.message_count.saturating_add(1);
                    conversation.updated_at = now;
                    sort_by_recent(&mut self.conversations);
                }
                Vec::new()
            }
            Action::AgentEventReceived { event } => self.apply_agent_event(event),

            Action::StopAgent { agent_id } => vec![Effect::StopAgent { agent_id }],
            Action::AgentStopped { agent_id } => {
                self.agent_status.insert(agent_id.clone(), AgentStatus::Ready);
                self.clear_streaming_for_agent(&agent_id);
                Vec::new()
            }
            Action::AgentStopFailed { agent_id, message } => {
                self.last_error = Some(format!("failed to stop {agent_id}: {message}"));
                Vec::new()
            }

            Action::CheckAgentAvailable => vec![Effect::CheckAgentAvailable],
            Action::AgentAvailabilityChecked { executable } => {
                self.agent_executable = executable;
                Vec::new()
            }

            Action::RenameConversation {
                conversation_id,
                title,
            } => {
                let title = title.trim().to_owned();
                if title.is_empty() {
                    return Vec::new();
                }
                if let Some(conversation) = self.conversation_mut(&conversation_id) {
                    conversation.title = title.clone();
                }
                vec![Effect::UpdateConversation {
                    conversation_id,
                    patch: ConversationPatch::title(title),
                }]
            }
            Action::UpdateConversationSettings {
                conversation_id,
                patch,
            } => {
                if patch.is_empty() {
                    return Vec::new();
                }
                vec![Effect::UpdateConversationSettings {
                    conversation_id,
                    patch,
                }]
            }
            Action::ConversationUpdated { conversation } => {
                if self.conversation(&conversation.id).is_some() {
                    self.upsert_conversation(conversation);
                }
                Vec::new()
            }

            Action::DeleteConversation { conversation_id } => {
                vec![Effect::DeleteConversation { conversation_id }]
            }
            Action::DeleteConversationsByBranch {
                workspace_id,
                branch_name,
            } => vec![Effect::DeleteConversationsByBranch {
                workspace_id,
                branch_name,
            }],
            Action::ConversationsDeleted { conversation_ids } => {
                let mut active_deleted = false;
                for conversation_id in &conversation_ids {
                    self.conversations.retain(|c| &c.id != conversation_id);
                    self.clear_unread(conversation_id);
                    if self.streaming_conversation_id() == Some(conversation_id) {
                        self.streaming = None;
                    }
                    if self.is_active(conversation_id) {
                        active_deleted = true;
                    }
                }
                if !active_deleted {
                    return Vec::new();
                }
                let next = self.conversations.first().map(|c| c.id.clone());
                self.select_conversation(next)
            }

            Action::DismissError => {
                self.last_error = None;
                Vec::new()
            }
        }
    }

    fn select_conversation(&mut self, conversation_id: Option<ConversationId>) -> Vec<Effect> {
        self.messages.clear();
        self.active_conversation_id = conversation_id.clone();
        let Some(conversation_id) = conversation_id else {
            return Vec::new();
        };
        self.clear_unread(&conversation_id);
        vec![Effect::LoadConversation { conversation_id }]
    }

    fn upsert_conversation(&mut self, conversation: Conversation) {
        match self.conversation_mut(&conversation.id) {
            Some(existing) => *existing = conversation,
            None => self.conversations.push(conversation),
        }
        sort_by_recent(&mut self.conversations);
    }

    fn next_user_message_id(&self, timestamp: u64) -> String {
        format!("user-{timestamp}-{}", self.messages.len())
    }

    fn start_send(&mut self, conversation: &Conversation, pending: PendingMessage) -> Vec<Effect> {
        let conversation_id = conversation.id.clone();
        let agent_id = conversation.agent_id.clone();
        let now = unix_epoch_millis_now();
        let mut effects = Vec::new();

        let message = ConversationMessage::new(
            self.next_user_message_id(now),
            MessageType::User,
            pending.content.clone(),
            now,
        );
        let is_active = self.is_active(&conversation_id);
        let is_first_user_message = conversation.message_count == 0
            && !self.messages.iter().any(|m| m.kind == MessageType::User);
        if is_active {
            self.messages.push(message.clone());
        }
        effects.push(Effect::AppendMessage {
            conversation_id: conversation_id.clone(),
            message,
        });

        if conversation.has_default_title()
            && is_first_user_message
            && let Some(title) = derive_conversation_title(&pending.content)
        {
            if let Some(local) = self.conversation_mut(&conversation_id) {
                local.title = title.clone();
            }
            effects.push(Effect::UpdateConversation {
                conversation_id: conversation_id.clone(),
                patch: ConversationPatch::title(title),
            });
        }

        self.streaming = Some(StreamingState {
            conversation_id: conversation_id.clone(),
            agent_id: agent_id.clone(),
            content: String::new(),
        });
        self.agent_status.insert(agent_id.clone(), AgentStatus::Busy);

        let working_directory = conversation
            .worktree_path
            .clone()
            .unwrap_or(pending.working_directory);
        effects.push(Effect::DispatchMessage {
            request: SendMessageRequest {
                conversation_id,
                agent_id,
                content: pending.content,
                working_directory,
                session_id: conversation.session_id.clone(),
                agent_prompt_file: pending.agent_prompt_file,
                settings: conversation.effective_settings(),
            },
        });
        effects
    }

    fn apply_agent_event(&mut self, event: AgentEvent) -> Vec<Effect> {
        match event {
            AgentEvent::StreamDelta {
                conversation_id,
                delta,
                ..
            } => {
                // Deltas never start a stream; only a send does.
                if self.is_active(&conversation_id)
                    && let Some(streaming) = &mut self.streaming
                    && streaming.conversation_id == conversation_id
                {
                    streaming.content.push_str(&delta);
                }
                Vec::new()
            }
            AgentEvent::Message {
                conversation_id,
                agent_id,
                message,
            } => {
                let kind = message.kind;
                if self.is_active(&conversation_id) {
                    if kind == MessageType::Assistant
                        && let Some(streaming) = &mut self.streaming
                        && streaming.conversation_id == conversation_id
                    {
                        streaming.content.clear();
                    }
                    self.messages.push(message.clone());
                } else if kind.counts_as_unread() {
                    self.record_unread(&conversation_id, &agent_id);
                }
                vec![Effect::AppendMessage {
                    conversation_id,
                    message,
                }]
            }
            AgentEvent::Status {
                agent_id,
                status,
                error,
            } => {
                self.agent_status.insert(agent_id.clone(), status);
                if status.ends_turn() {
                    self.clear_streaming_for_agent(&agent_id);
                }
                if status == AgentStatus::Error
                    && let Some(error) = error
                {
                    self.last_error = Some(error);
                }
                Vec::new()
            }
            AgentEvent::SessionStarted {
                conversation_id,
                session_id,
                ..
            } => {
                let now = unix_epoch_millis_now();
                if let Some(conversation) = self.conversation_mut(&conversation_id) {
                    if conversation.session_id.as_deref() == Some(session_id.as_str()) {
                        return Vec::new();
                    }
                    conversation.session_id = Some(session_id.clone());
                    conversation.session_created_at = Some(now);
                }
                vec![Effect::UpdateConversation {
                    conversation_id,
                    patch: ConversationPatch::session(session_id, now),
                }]
            }
        }
    }

    /// Total unread messages across every agent.
    pub fn total_unread(&self) -> u32 {
        self.unread_by_agent.values().copied().sum()
    }

    pub fn agent_has_unread(&self, agent_id: &AgentId) -> bool {
        self.unread_for_agent(agent_id) > 0
    }
}
