use super::{AgentId, ConversationId, ConversationLocation, ConversationMessage, WorkspaceId};
use crate::ConversationSettings;
use std::path::PathBuf;

pub const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_created_at: Option<u64>,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub worktree_path: Option<PathBuf>,
    pub agent_id: AgentId,
    pub workspace_id: WorkspaceId,
    #[serde(default = "default_title")]
    pub title: String,
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub settings: Option<ConversationSettings>,
}

fn default_title() -> String {
    DEFAULT_CONVERSATION_TITLE.to_owned()
}

impl Conversation {
    pub fn location(&self) -> ConversationLocation {
        ConversationLocation::new(self.workspace_id.clone(), self.agent_id.clone())
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_CONVERSATION_TITLE
    }

    /// Settings in effect for this conversation.
    pub fn effective_settings(&self) -> ConversationSettings {
        self.settings.clone().unwrap_or_default()
    }

    /// Applies the mutable subset of fields and reports whether anything was set.
    pub fn apply_patch(&mut self, patch: ConversationPatch) -> bool {
        let mut touched = false;
        if let Some(title) = patch.title {
            self.title = title;
            touched = true;
        }
        if let Some(session_id) = patch.session_id {
            self.session_id = session_id;
            touched = true;
        }
        if let Some(session_created_at) = patch.session_created_at {
            self.session_created_at = session_created_at;
            touched = true;
        }
        if let Some(branch_name) = patch.branch_name {
            self.branch_name = branch_name;
            touched = true;
        }
        if let Some(message_count) = patch.message_count {
            self.message_count = message_count;
            touched = true;
        }
        if let Some(settings) = patch.settings {
            self.settings = Some(settings);
            touched = true;
        }
        touched
    }
}

/// Fields a caller may change after creation. Nullable fields use a nested
/// `Option` so that "clear" and "leave alone" stay distinct.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub session_id: Option<Option<String>>,
    pub session_created_at: Option<Option<u64>>,
    pub branch_name: Option<Option<String>>,
    pub message_count: Option<u64>,
    pub settings: Option<ConversationSettings>,
}

impl ConversationPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn session(session_id: impl Into<String>, created_at_unix_ms: u64) -> Self {
        Self {
            session_id: Some(Some(session_id.into())),
            session_created_at: Some(Some(created_at_unix_ms)),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadedConversation {
    pub conversation: Conversation,
    pub messages: Vec<ConversationMessage>,
}

#[derive(Clone, Debug, Eq, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ConversationIndex {
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

pub fn sort_by_recent(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        Conversation {
            id: ConversationId::new("c1"),
            session_id: None,
            session_created_at: None,
            branch_name: Some("feature/x".to_owned()),
            worktree_path: None,
            agent_id: AgentId::new("agentA"),
            workspace_id: WorkspaceId::new("ws1"),
            title: DEFAULT_CONVERSATION_TITLE.to_owned(),
            created_at: 1,
            updated_at: 2,
            message_count: 0,
            settings: None,
        }
    }

    #[test]
    fn conversation_uses_camel_case_keys() {
        let json = serde_json::to_value(conversation()).unwrap();
        assert_eq!(json["workspaceId"], "ws1");
        assert_eq!(json["agentId"], "agentA");
        assert_eq!(json["branchName"], "feature/x");
        assert_eq!(json["messageCount"], 0);
        assert!(json["sessionId"].is_null());
    }

    #[test]
    fn conversation_tolerates_missing_optional_fields() {
        let parsed: Conversation = serde_json::from_str(
            r#"{"id":"c9","agentId":"a","workspaceId":"w","createdAt":5,"updatedAt":6}"#,
        )
        .unwrap();
        assert_eq!(parsed.title, DEFAULT_CONVERSATION_TITLE);
        assert_eq!(parsed.message_count, 0);
        assert!(parsed.settings.is_none());
        assert_eq!(parsed.effective_settings(), ConversationSettings::default());
    }

    #[test]
    fn apply_patch_can_clear_nullable_fields() {
        let mut c = conversation();
        assert!(!c.apply_patch(ConversationPatch::default()));

        assert!(c.apply_patch(ConversationPatch {
            branch_name: Some(None),
            ..Default::default()
        }));
        assert_eq!(c.branch_name, None);

        c.apply_patch(ConversationPatch::session("sess-1", 42));
        assert_eq!(c.session_id.as_deref(), Some("sess-1"));
        assert_eq!(c.session_created_at, Some(42));
    }

    #[test]
    fn sort_by_recent_orders_descending() {
        let mut a = conversation();
        a.updated_at = 10;
        let mut b = conversation();
        b.id = ConversationId::new("c2");
        b.updated_at = 30;
        let mut c = conversation();
        c.id = ConversationId::new("c3");
        c.updated_at = 20;
        let mut list = vec![a, b, c];
        sort_by_recent(&mut list);
        let ids = list.iter().map(|c| c.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["c2", "c3", "c1"]);
    }
}
