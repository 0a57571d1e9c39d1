#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    Default,
    AcceptEdits,
    BypassPermissions,
    Plan,
}

impl PermissionMode {
    pub const ALL: [PermissionMode; 4] = [
        PermissionMode::Default,
        PermissionMode::AcceptEdits,
        PermissionMode::BypassPermissions,
        PermissionMode::Plan,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Plan => "plan",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PermissionMode::Default => "Ask before edits",
            PermissionMode::AcceptEdits => "Accept edits",
            PermissionMode::BypassPermissions => "Bypass permissions",
            PermissionMode::Plan => "Plan only",
        }
    }
}

pub fn parse_permission_mode(value: &str) -> Option<PermissionMode> {
    let value = value.trim();
    PermissionMode::ALL
        .into_iter()
        .find(|mode| value.eq_ignore_ascii_case(mode.as_str()))
}

pub fn default_permission_mode() -> PermissionMode {
    PermissionMode::Default
}

pub fn default_model_id() -> &'static str {
    "claude-sonnet-4-5"
}

pub fn default_allowed_tools() -> Vec<String> {
    ["Read", "Write", "Edit", "Glob", "Grep", "Bash"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSettings {
    pub permission_mode: PermissionMode,
    pub allowed_tools: Vec<String>,
    pub model: String,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            permission_mode: default_permission_mode(),
            allowed_tools: default_allowed_tools(),
            model: default_model_id().to_owned(),
        }
    }
}

impl ConversationSettings {
    /// Shallow merge: every field present in `patch` replaces the current one.
    pub fn merged(mut self, patch: ConversationSettingsPatch) -> Self {
        if let Some(permission_mode) = patch.permission_mode {
            self.permission_mode = permission_mode;
        }
        if let Some(allowed_tools) = patch.allowed_tools {
            self.allowed_tools = allowed_tools;
        }
        if let Some(model) = patch.model {
            self.model = model;
        }
        self
    }
}

/// Partial settings. Also the on-disk shape of per-workspace defaults, where
/// every field is optional.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<PermissionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ConversationSettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.permission_mode.is_none() && self.allowed_tools.is_none() && self.model.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_permission_mode_is_case_insensitive() {
        assert_eq!(
            parse_permission_mode("acceptedits"),
            Some(PermissionMode::AcceptEdits)
        );
        assert_eq!(
            parse_permission_mode(" bypassPermissions "),
            Some(PermissionMode::BypassPermissions)
        );
        assert_eq!(parse_permission_mode("PLAN"), Some(PermissionMode::Plan));
        assert_eq!(parse_permission_mode("yolo"), None);
    }

    #[test]
    fn permission_mode_round_trips_through_as_str() {
        for mode in PermissionMode::ALL {
            assert_eq!(parse_permission_mode(mode.as_str()), Some(mode));
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
        }
    }

    #[test]
    fn merged_only_replaces_present_fields() {
        let base = ConversationSettings::default();
        let merged = base.clone().merged(ConversationSettingsPatch {
            model: Some("claude-opus-4-1".to_owned()),
            ..Default::default()
        });
        assert_eq!(merged.model, "claude-opus-4-1");
        assert_eq!(merged.permission_mode, base.permission_mode);
        assert_eq!(merged.allowed_tools, base.allowed_tools);
    }

    #[test]
    fn settings_patch_reads_partial_json() {
        let patch: ConversationSettingsPatch =
            serde_json::from_str(r#"{"permissionMode":"plan"}"#).unwrap();
        assert_eq!(patch.permission_mode, Some(PermissionMode::Plan));
        assert!(patch.allowed_tools.is_none());
        assert!(!patch.is_empty());
        assert!(ConversationSettingsPatch::default().is_empty());
    }
}
