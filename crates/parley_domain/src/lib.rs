mod actions;
pub use actions::Action;
mod effects;
pub use effects::{Effect, PendingMessage};

mod adapters;
pub use adapters::{
    AgentClient, AgentEvent, AgentEventCallback, AgentSubscription, ConversationStore,
    GlobalDefaults, SendMessageRequest, WorkspaceSettingsProvider,
};

mod agent_settings;
pub use agent_settings::{
    ConversationSettings, ConversationSettingsPatch, PermissionMode, default_allowed_tools,
    default_model_id, default_permission_mode, parse_permission_mode,
};

pub mod paths;

mod state;
pub use state::*;

mod reducer;
pub use reducer::derive_conversation_title;

mod time;
pub use time::unix_epoch_millis_now;

pub const CONVERSATION_TITLE_MAX_CHARS: usize = 40;
