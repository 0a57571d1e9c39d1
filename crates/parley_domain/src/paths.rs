use crate::{AgentId, ConversationId, WorkspaceId};
use std::path::{Path, PathBuf};

pub const PARLEY_ROOT_ENV: &str = "PARLEY_ROOT";
pub const PARLEY_WORKSPACE_ID_ENV: &str = "PARLEY_WORKSPACE_ID";
pub const PARLEY_AGENT_ID_ENV: &str = "PARLEY_AGENT_ID";

pub const CONVERSATION_INDEX_FILE: &str = "conversations.json";
pub const MESSAGE_LOG_SUFFIX: &str = "-messages.jsonl";

pub fn conversations_root(parley_root: &Path) -> PathBuf {
    parley_root.join("conversations")
}

pub fn workspace_settings_root(parley_root: &Path) -> PathBuf {
    parley_root.join("workspace-settings")
}

pub fn workspace_conversation_dir(
    conversations_root: &Path,
    workspace_id: &WorkspaceId,
) -> PathBuf {
    conversations_root.join(workspace_id.as_str())
}

pub fn agent_conversation_dir(
    conversations_root: &Path,
    workspace_id: &WorkspaceId,
    agent_id: &AgentId,
) -> PathBuf {
    workspace_conversation_dir(conversations_root, workspace_id).join(agent_id.as_str())
}

pub fn conversation_index_path(agent_dir: &Path) -> PathBuf {
    agent_dir.join(CONVERSATION_INDEX_FILE)
}

pub fn message_log_path(agent_dir: &Path, conversation_id: &ConversationId) -> PathBuf {
    agent_dir.join(format!("{}{MESSAGE_LOG_SUFFIX}", conversation_id.as_str()))
}

/// Ids become directory and file names, so they must be a single plain
/// path component.
pub fn is_safe_path_component(raw: &str) -> bool {
    !raw.is_empty()
        && raw != "."
        && raw != ".."
        && !raw.contains(['/', '\\', '\0'])
        && raw.trim() == raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_nests_agent_under_workspace() {
        let root = PathBuf::from("parley-root");
        let conversations = conversations_root(&root);
        assert_eq!(conversations, root.join("conversations"));
        assert_eq!(
            workspace_settings_root(&root),
            root.join("workspace-settings")
        );

        let agent_dir = agent_conversation_dir(
            &conversations,
            &WorkspaceId::new("ws1"),
            &AgentId::new("agentA"),
        );
        assert_eq!(agent_dir, conversations.join("ws1").join("agentA"));
        assert_eq!(
            conversation_index_path(&agent_dir),
            agent_dir.join("conversations.json")
        );
        assert_eq!(
            message_log_path(&agent_dir, &ConversationId::new("abc")),
            agent_dir.join("abc-messages.jsonl")
        );
        assert_eq!(PARLEY_ROOT_ENV, "PARLEY_ROOT");
    }

    #[test]
    fn safe_path_component_rejects_traversal() {
        assert!(is_safe_path_component("ws1"));
        assert!(is_safe_path_component("agent.v2"));
        assert!(!is_safe_path_component(""));
        assert!(!is_safe_path_component("."));
        assert!(!is_safe_path_component(".."));
        assert!(!is_safe_path_component("a/b"));
        assert!(!is_safe_path_component("a\\b"));
        assert!(!is_safe_path_component(" padded "));
    }
}
