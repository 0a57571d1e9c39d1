use parley_domain::paths::{PARLEY_AGENT_ID_ENV, PARLEY_WORKSPACE_ID_ENV};
use parley_domain::{AgentId, WorkspaceId};

pub mod engine;

pub use engine::{Engine, EngineHandle, SessionSnapshot};

#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    /// Conversations to load as soon as the engine starts.
    pub initial_scope: Option<(WorkspaceId, AgentId)>,
    pub check_agent_on_start: bool,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let workspace_id = std::env::var(PARLEY_WORKSPACE_ID_ENV).ok();
        let agent_id = std::env::var(PARLEY_AGENT_ID_ENV).ok();
        Self::from_values(workspace_id, agent_id)
    }

    fn from_values(workspace_id: Option<String>, agent_id: Option<String>) -> Self {
        let non_empty = |value: Option<String>| {
            value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let initial_scope = match (non_empty(workspace_id), non_empty(agent_id)) {
            (Some(workspace_id), Some(agent_id)) => {
                Some((WorkspaceId::new(workspace_id), AgentId::new(agent_id)))
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "{PARLEY_WORKSPACE_ID_ENV} and {PARLEY_AGENT_ID_ENV} must be set together, \
                     ignoring both"
                );
                None
            }
            (None, None) => None,
        };

        Self {
            initial_scope,
            check_agent_on_start: true,
        }
    }
}
