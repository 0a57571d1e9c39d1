use anyhow::Context as _;
use parley_domain::paths;
use parley_domain::{
    ConversationSettings, ConversationSettingsPatch, WorkspaceId, WorkspaceSettingsProvider,
};
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum WorkspaceSettingsError {
    NotConfigured,
    InvalidWorkspaceId,
}

impl std::fmt::Display for WorkspaceSettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkspaceSettingsError::NotConfigured => write!(f, "workspace settings not configured"),
            WorkspaceSettingsError::InvalidWorkspaceId => write!(f, "invalid workspace id"),
        }
    }
}

impl std::error::Error for WorkspaceSettingsError {}

/// Per-workspace conversation defaults stored as
/// `<root>/workspace-settings/<workspaceId>.json`.
#[derive(Clone, Debug)]
pub struct FileWorkspaceSettings {
    root: PathBuf,
}

impl FileWorkspaceSettings {
    pub fn new(parley_root: &Path) -> Self {
        Self {
            root: paths::workspace_settings_root(parley_root),
        }
    }

    fn settings_path(&self, workspace_id: &WorkspaceId) -> anyhow::Result<PathBuf> {
        if !paths::is_safe_path_component(workspace_id.as_str()) {
            return Err(WorkspaceSettingsError::InvalidWorkspaceId.into());
        }
        Ok(self.root.join(format!("{workspace_id}.json")))
    }

    pub fn load(&self, workspace_id: &WorkspaceId) -> anyhow::Result<ConversationSettingsPatch> {
        let path = self.settings_path(workspace_id)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(WorkspaceSettingsError::NotConfigured.into());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn save(
        &self,
        workspace_id: &WorkspaceId,
        patch: &ConversationSettingsPatch,
    ) -> anyhow::Result<()> {
        let path = self.settings_path(workspace_id)?;
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let json = serde_json::to_vec_pretty(patch).context("failed to encode workspace settings")?;
        std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}

impl WorkspaceSettingsProvider for FileWorkspaceSettings {
    fn conversation_defaults(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<ConversationSettings, String> {
        self.load(workspace_id)
            .map(|patch| ConversationSettings::default().merged(patch))
            .map_err(|err| format!("{err:#}"))
    }
}
