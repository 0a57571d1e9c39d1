use anyhow::{Context as _, anyhow};
use parley_domain::paths;
use parley_domain::{
    AgentId, Conversation, ConversationId, ConversationLocation, ConversationMessage,
    ConversationPatch, ConversationSettings, ConversationSettingsPatch, ConversationStore,
    DEFAULT_CONVERSATION_TITLE, LoadedConversation, WorkspaceId, WorkspaceSettingsProvider,
    sort_by_recent, unix_epoch_millis_now,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::workspace_settings::FileWorkspaceSettings;

mod index;
mod location_cache;
mod message_log;

use index::{read_index, write_index};
use location_cache::LocationCache;
use message_log::{append_message_line, read_message_lines};

/// Conversation index and message logs under `<root>/conversations`.
///
/// Each `(workspace, agent)` pair owns a directory holding
/// `conversations.json` and one `<id>-messages.jsonl` per conversation.
/// The store assumes it is the only writer of that tree.
pub struct FileConversationStore {
    conversations_root: PathBuf,
    workspace_settings: Arc<dyn WorkspaceSettingsProvider>,
    locations: LocationCache,
}

impl FileConversationStore {
    pub fn new() -> anyhow::Result<Arc<Self>> {
        let parley_root = crate::resolve_parley_root()?;
        std::fs::create_dir_all(&parley_root)
            .with_context(|| format!("failed to create {}", parley_root.display()))?;

        let workspace_settings = Arc::new(FileWorkspaceSettings::new(&parley_root));
        Ok(Arc::new(Self::with_root(&parley_root, workspace_settings)))
    }

    pub fn with_root(
        parley_root: &Path,
        workspace_settings: Arc<dyn WorkspaceSettingsProvider>,
    ) -> Self {
        Self {
            conversations_root: paths::conversations_root(parley_root),
            workspace_settings,
            locations: LocationCache::default(),
        }
    }

    pub fn conversations_root(&self) -> &Path {
        &self.conversations_root
    }

    fn agent_dir(&self, location: &ConversationLocation) -> PathBuf {
        paths::agent_conversation_dir(
            &self.conversations_root,
            &location.workspace_id,
            &location.agent_id,
        )
    }

    fn index_path(&self, location: &ConversationLocation) -> PathBuf {
        paths::conversation_index_path(&self.agent_dir(location))
    }

    fn message_log_path(
        &self,
        location: &ConversationLocation,
        conversation_id: &ConversationId,
    ) -> PathBuf {
        paths::message_log_path(&self.agent_dir(location), conversation_id)
    }

    fn is_addressable(workspace_id: &WorkspaceId, agent_id: &AgentId) -> bool {
        paths::is_safe_path_component(workspace_id.as_str())
            && paths::is_safe_path_component(agent_id.as_str())
    }

    /// Cache first; on a miss, rescans the whole tree once.
    fn resolve_location(&self, conversation_id: &ConversationId) -> Option<ConversationLocation> {
        if let Some(location) = self.locations.get(conversation_id) {
            return Some(location);
        }
        let indexed = self.rescan_locations();
        let found = self.locations.get(conversation_id);
        if found.is_none() {
            tracing::debug!(
                conversation_id = %conversation_id,
                indexed,
                "conversation location not found"
            );
        }
        found
    }

    fn rescan_locations(&self) -> usize {
        let mut indexed = 0;
        for workspace_id in child_dir_names(&self.conversations_root) {
            let workspace_id = WorkspaceId::new(workspace_id);
            let workspace_dir =
                paths::workspace_conversation_dir(&self.conversations_root, &workspace_id);
            for agent_id in child_dir_names(&workspace_dir) {
                let location =
                    ConversationLocation::new(workspace_id.clone(), AgentId::new(agent_id));
                let index = read_index(&self.index_path(&location));
                self.locations.remember_all(&location, &index.conversations);
                indexed += index.conversations.len();
            }
        }
        indexed
    }

    pub fn list(&self, workspace_id: &WorkspaceId, agent_id: &AgentId) -> Vec<Conversation> {
        if !Self::is_addressable(workspace_id, agent_id) {
            return Vec::new();
        }
        let location = ConversationLocation::new(workspace_id.clone(), agent_id.clone());
        let mut conversations = read_index(&self.index_path(&location)).conversations;
        self.locations.remember_all(&location, &conversations);
        sort_by_recent(&mut conversations);
        conversations
    }

    pub fn create(
        &self,
        workspace_id: &WorkspaceId,
        agent_id: &AgentId,
    ) -> anyhow::Result<Conversation> {
        if !Self::is_addressable(workspace_id, agent_id) {
            return Err(anyhow!(
                "invalid conversation location {workspace_id}/{agent_id}"
            ));
        }

        let settings = self
            .workspace_settings
            .conversation_defaults(workspace_id)
            .unwrap_or_else(|err| {
                tracing::debug!(
                    workspace_id = %workspace_id,
                    error = %err,
                    "using global conversation defaults"
                );
                ConversationSettings::default()
            });

        let now = unix_epoch_millis_now();
        let conversation = Conversation {
            id: ConversationId::new(uuid::Uuid::new_v4().to_string()),
            session_id: None,
            session_created_at: None,
            branch_name: None,
            worktree_path: None,
            agent_id: agent_id.clone(),
            workspace_id: workspace_id.clone(),
            title: DEFAULT_CONVERSATION_TITLE.to_owned(),
            created_at: now,
            updated_at: now,
            message_count: 0,
            settings: Some(settings),
        };

        let location = conversation.location();
        let index_path = self.index_path(&location);
        let mut index = read_index(&index_path);
        index.conversations.push(conversation.clone());
        write_index(&index_path, &index).context("failed to save new conversation")?;

        self.locations.insert(conversation.id.clone(), location);
        tracing::info!(
            conversation_id = %conversation.id,
            workspace_id = %workspace_id,
            agent_id = %agent_id,
            "conversation created"
        );
        Ok(conversation)
    }

    pub fn load(&self, conversation_id: &ConversationId) -> Option<LoadedConversation> {
        let location = self.resolve_location(conversation_id)?;
        let conversation = read_index(&self.index_path(&location))
            .conversations
            .into_iter()
            .find(|c| &c.id == conversation_id)?;
        let messages = read_message_lines(&self.message_log_path(&location, conversation_id));
        Some(LoadedConversation {
            conversation,
            messages,
        })
    }

    /// Read-modify-write of a single index entry. `mutate` returning false
    /// aborts without writing.
    fn modify_entry(
        &self,
        conversation_id: &ConversationId,
        mutate: impl FnOnce(&mut Conversation) -> bool,
    ) -> Option<Conversation> {
        let location = self.resolve_location(conversation_id)?;
        let index_path = self.index_path(&location);
        let mut index = read_index(&index_path);
        let entry = index
            .conversations
            .iter_mut()
            .find(|c| &c.id == conversation_id)?;
        if !mutate(entry) {
            return None;
        }
        let updated = entry.clone();

        if let Err(err) = write_index(&index_path, &index) {
            tracing::warn!(
                conversation_id = %conversation_id,
                error = %format!("{err:#}"),
                "failed to update conversation"
            );
            return None;
        }
        Some(updated)
    }

    pub fn update(
        &self,
        conversation_id: &ConversationId,
        patch: ConversationPatch,
    ) -> Option<Conversation> {
        let now = unix_epoch_millis_now();
        self.modify_entry(conversation_id, |conversation| {
            conversation.apply_patch(patch);
            conversation.updated_at = now;
            true
        })
    }

    pub fn update_settings(
        &self,
        conversation_id: &ConversationId,
        patch: ConversationSettingsPatch,
    ) -> Option<Conversation> {
        let now = unix_epoch_millis_now();
        self.modify_entry(conversation_id, |conversation| {
            let merged = conversation
                .settings
                .take()
                .unwrap_or_default()
                .merged(patch);
            conversation.settings = Some(merged);
            conversation.updated_at = now;
            true
        })
    }

    pub fn delete(&self, conversation_id: &ConversationId) -> bool {
        let Some(location) = self.resolve_location(conversation_id) else {
            return false;
        };
        let index_path = self.index_path(&location);
        let mut index = read_index(&index_path);
        let before = index.conversations.len();
        index.conversations.retain(|c| &c.id != conversation_id);
        if index.conversations.len() == before {
            self.locations.remove(conversation_id);
            return false;
        }
        if let Err(err) = write_index(&index_path, &index) {
            tracing::warn!(
                conversation_id = %conversation_id,
                error = %format!("{err:#}"),
                "failed to delete conversation"
            );
            return false;
        }

        let _ = std::fs::remove_file(self.message_log_path(&location, conversation_id));
        self.locations.remove(conversation_id);

        if index.conversations.is_empty() {
            let _ = std::fs::remove_file(&index_path);
            let agent_dir = self.agent_dir(&location);
            let _ = std::fs::remove_dir(&agent_dir);
            if let Some(workspace_dir) = agent_dir.parent() {
                let _ = std::fs::remove_dir(workspace_dir);
            }
        }

        tracing::info!(conversation_id = %conversation_id, "conversation deleted");
        true
    }

    pub fn delete_by_branch(
        &self,
        workspace_id: &WorkspaceId,
        branch_name: &str,
    ) -> Vec<ConversationId> {
        if !paths::is_safe_path_component(workspace_id.as_str()) {
            return Vec::new();
        }
        let workspace_dir =
            paths::workspace_conversation_dir(&self.conversations_root, workspace_id);

        let mut deleted = Vec::new();
        for agent_id in child_dir_names(&workspace_dir) {
            let location = ConversationLocation::new(workspace_id.clone(), AgentId::new(agent_id));
            let index = read_index(&self.index_path(&location));
            self.locations.remember_all(&location, &index.conversations);

            for conversation in index.conversations {
                if conversation.branch_name.as_deref() != Some(branch_name) {
                    continue;
                }
                if self.delete(&conversation.id) {
                    deleted.push(conversation.id);
                }
            }
        }
        deleted
    }

    /// Appends one log line, then bumps the index counters. The two writes
    /// are not atomic with each other.
    pub fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: &ConversationMessage,
    ) -> bool {
        let Some(location) = self.resolve_location(conversation_id) else {
            return false;
        };
        let agent_dir = self.agent_dir(&location);
        if let Err(err) = std::fs::create_dir_all(&agent_dir) {
            tracing::warn!(
                path = %agent_dir.display(),
                error = %err,
                "failed to create conversation dir"
            );
            return false;
        }
        if let Err(err) =
            append_message_line(&self.message_log_path(&location, conversation_id), message)
        {
            tracing::warn!(
                conversation_id = %conversation_id,
                error = %format!("{err:#}"),
                "failed to append message"
            );
            return false;
        }

        let now = unix_epoch_millis_now();
        let counted = self.modify_entry(conversation_id, |conversation| {
            conversation.message_count = conversation.message_count.saturating_add(1);
            conversation.updated_at = now;
            true
        });
        if counted.is_none() {
            tracing::warn!(
                conversation_id = %conversation_id,
                "message appended but index count not updated"
            );
        }
        true
    }

    pub fn location(&self, conversation_id: &ConversationId) -> Option<ConversationLocation> {
        self.locations.get(conversation_id)
    }
}

fn child_dir_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| paths::is_safe_path_component(name))
        .collect::<Vec<_>>();
    names.sort();
    names
}

impl ConversationStore for FileConversationStore {
    fn list_conversations(
        &self,
        workspace_id: WorkspaceId,
        agent_id: AgentId,
    ) -> Vec<Conversation> {
        self.list(&workspace_id, &agent_id)
    }

    fn create_conversation(
        &self,
        workspace_id: WorkspaceId,
        agent_id: AgentId,
    ) -> Result<Conversation, String> {
        self.create(&workspace_id, &agent_id)
            .map_err(|err| format!("{err:#}"))
    }

    fn load_conversation(&self, conversation_id: ConversationId) -> Option<LoadedConversation> {
        self.load(&conversation_id)
    }

    fn update_conversation(
        &self,
        conversation_id: ConversationId,
        patch: ConversationPatch,
    ) -> Option<Conversation> {
        self.update(&conversation_id, patch)
    }

    fn update_conversation_settings(
        &self,
        conversation_id: ConversationId,
        patch: ConversationSettingsPatch,
    ) -> Option<Conversation> {
        self.update_settings(&conversation_id, patch)
    }

    fn delete_conversation(&self, conversation_id: ConversationId) -> bool {
        self.delete(&conversation_id)
    }

    fn delete_conversations_by_branch(
        &self,
        workspace_id: WorkspaceId,
        branch_name: String,
    ) -> Vec<ConversationId> {
        self.delete_by_branch(&workspace_id, &branch_name)
    }

    fn append_message(
        &self,
        conversation_id: ConversationId,
        message: ConversationMessage,
    ) -> bool {
        FileConversationStore::append_message(self, &conversation_id, &message)
    }

    fn conversation_location(
        &self,
        conversation_id: &ConversationId,
    ) -> Option<ConversationLocation> {
        self.location(conversation_id)
    }
}
