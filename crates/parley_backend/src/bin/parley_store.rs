use anyhow::{Context as _, anyhow};
use clap::{Parser, Subcommand};
use parley_backend::FileConversationStore;
use parley_domain::{
    AgentId, ConversationId, ConversationSettingsPatch, PermissionMode, WorkspaceId,
    parse_permission_mode,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley-store")]
#[command(about = "Inspect and maintain the parley conversation store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved store root
    Root,
    /// List conversations for a workspace agent, most recent first
    List { workspace_id: String, agent_id: String },
    /// Create an empty conversation
    Create {
        workspace_id: String,
        agent_id: String,
        /// One of default, acceptEdits, bypassPermissions, plan
        #[arg(long)]
        permission_mode: Option<String>,
    },
    /// Print a conversation and its messages as JSON
    Show { conversation_id: String },
    /// Delete a conversation and its message log
    Delete { conversation_id: String },
    /// Delete every conversation bound to a branch in a workspace
    DeleteBranch {
        workspace_id: String,
        branch_name: String,
    },
}

fn parse_mode_arg(raw: &str) -> anyhow::Result<PermissionMode> {
    parse_permission_mode(raw).ok_or_else(|| {
        let known = PermissionMode::ALL.map(PermissionMode::as_str).join(", ");
        anyhow!("unknown permission mode {raw:?}, expected one of: {known}")
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Command::Root = cli.command {
        let root = parley_backend::resolve_parley_root()?;
        println!("{}", root.display());
        return Ok(());
    }

    let store = FileConversationStore::new().context("failed to open conversation store")?;
    match cli.command {
        Command::Root => {}
        Command::List {
            workspace_id,
            agent_id,
        } => {
            let conversations =
                store.list(&WorkspaceId::new(workspace_id), &AgentId::new(agent_id));
            for conversation in conversations {
                println!(
                    "{}\t{}\t{} messages\t{}\t{}",
                    conversation.id,
                    conversation.updated_at,
                    conversation.message_count,
                    conversation.effective_settings().permission_mode.label(),
                    conversation.title
                );
            }
        }
        Command::Create {
            workspace_id,
            agent_id,
            permission_mode,
        } => {
            let permission_mode = permission_mode
                .as_deref()
                .map(parse_mode_arg)
                .transpose()?;
            let conversation =
                store.create(&WorkspaceId::new(workspace_id), &AgentId::new(agent_id))?;
            if let Some(permission_mode) = permission_mode {
                let patch = ConversationSettingsPatch {
                    permission_mode: Some(permission_mode),
                    ..Default::default()
                };
                store
                    .update_settings(&conversation.id, patch)
                    .ok_or_else(|| anyhow!("failed to set permission mode"))?;
            }
            println!("{}", conversation.id);
        }
        Command::Show { conversation_id } => {
            let loaded = store
                .load(&ConversationId::new(conversation_id.clone()))
                .ok_or_else(|| anyhow!("conversation not found: {conversation_id}"))?;
            let json = serde_json::json!({
                "conversation": loaded.conversation,
                "messages": loaded.messages,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Command::Delete { conversation_id } => {
            if !store.delete(&ConversationId::new(conversation_id.clone())) {
                return Err(anyhow!("conversation not found: {conversation_id}"));
            }
        }
        Command::DeleteBranch {
            workspace_id,
            branch_name,
        } => {
            let deleted = store.delete_by_branch(&WorkspaceId::new(workspace_id), &branch_name);
            for conversation_id in deleted {
                println!("{conversation_id}");
            }
        }
    }
    Ok(())
}
