mod env;
mod store;
#[cfg(test)]
mod test_support;
mod workspace_settings;

pub use env::resolve_parley_root;
pub use store::FileConversationStore;
pub use workspace_settings::FileWorkspaceSettings;
