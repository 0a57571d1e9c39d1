use anyhow::Context as _;
use parley_domain::{
    Action, AgentClient, AgentEvent, AgentEventCallback, ChatSessionState, ConversationStore,
    Effect,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::SessionConfig;

#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub rev: u64,
    pub state: ChatSessionState,
}

#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Applies `action` and every follow-up it produces. Resolves with the
    /// revision reached once the queue is drained.
    pub async fn dispatch(&self, action: Action) -> anyhow::Result<u64> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Dispatch {
                action: Box::new(action),
                reply: tx,
            })
            .await
            .context("engine unavailable")?;
        rx.await.context("engine stopped")
    }

    pub async fn snapshot(&self) -> anyhow::Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::GetSnapshot { reply: tx })
            .await
            .context("engine unavailable")?;
        rx.await.context("engine stopped")
    }
}

pub enum EngineCommand {
    Dispatch {
        action: Box<Action>,
        reply: oneshot::Sender<u64>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

pub struct Engine {
    state: ChatSessionState,
    rev: u64,
    store: Arc<dyn ConversationStore>,
    agent: Arc<dyn AgentClient>,
    events: broadcast::Sender<SessionSnapshot>,
}

impl Engine {
    /// Spawns the engine task. It runs until every `EngineHandle` is dropped,
    /// then releases its agent subscription.
    pub fn start(
        store: Arc<dyn ConversationStore>,
        agent: Arc<dyn AgentClient>,
        config: SessionConfig,
    ) -> (EngineHandle, broadcast::Sender<SessionSnapshot>) {
        let (tx, mut rx) = mpsc::channel::<EngineCommand>(256);
        let (events, _) = broadcast::channel::<SessionSnapshot>(256);

        // Unbounded so agent callbacks never block, whatever thread they run on.
        let (agent_tx, mut agent_rx) = mpsc::unbounded_channel::<AgentEvent>();
        let on_event: AgentEventCallback = Arc::new(move |event| {
            let _ = agent_tx.send(event);
        });
        let subscription = agent.subscribe(on_event);

        let mut engine = Self {
            state: ChatSessionState::new(),
            rev: 0,
            store,
            agent,
            events: events.clone(),
        };

        tokio::spawn(async move {
            let _subscription = subscription;
            engine.bootstrap(config).await;
            loop {
                tokio::select! {
                    cmd = rx.recv() => match cmd {
                        Some(cmd) => engine.handle(cmd).await,
                        None => break,
                    },
                    Some(event) = agent_rx.recv() => {
                        if let AgentEvent::Status { agent_id, status, .. } = &event {
                            tracing::debug!(
                                agent_id = %agent_id,
                                status = status.as_str(),
                                "agent status changed"
                            );
                        }
                        engine
                            .process_action_queue(Action::AgentEventReceived { event })
                            .await;
                    }
                }
            }
            tracing::debug!(rev = engine.rev, "session engine stopped");
        });

        (EngineHandle { tx }, events)
    }

    async fn bootstrap(&mut self, config: SessionConfig) {
        if config.check_agent_on_start {
            self.process_action_queue(Action::CheckAgentAvailable).await;
        }
        if let Some((workspace_id, agent_id)) = config.initial_scope {
            self.process_action_queue(Action::LoadConversations {
                workspace_id,
                agent_id,
            })
            .await;
        }
    }

    async fn handle(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Dispatch { action, reply } => {
                self.process_action_queue(*action).await;
                let _ = reply.send(self.rev);
            }
            EngineCommand::GetSnapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn process_action_queue(&mut self, initial: Action) {
        let mut actions = VecDeque::from([initial]);
        let mut effects = VecDeque::<Effect>::new();

        while let Some(action) = actions.pop_front() {
            self.rev = self.rev.saturating_add(1);

            let new_effects = self.state.apply(action);
            self.publish_snapshot();

            effects.extend(new_effects);

            while let Some(effect) = effects.pop_front() {
                match self.run_effect(effect).await {
                    Ok(mut followups) => actions.append(&mut followups),
                    Err(err) => {
                        tracing::error!(error = %format!("{err:#}"), "effect failed");
                    }
                }
            }
        }
    }

    async fn run_effect(&mut self, effect: Effect) -> anyhow::Result<VecDeque<Action>> {
        match effect {
            Effect::ListConversations {
                workspace_id,
                agent_id,
            } => {
                let store = self.store.clone();
                let (ws, agent) = (workspace_id.clone(), agent_id.clone());
                let conversations =
                    tokio::task::spawn_blocking(move || store.list_conversations(ws, agent))
                        .await
                        .context("failed to join list conversations task")?;
                Ok(VecDeque::from([Action::ConversationsLoaded {
                    workspace_id,
                    agent_id,
                    conversations,
                }]))
            }
            Effect::LoadConversation { conversation_id } => {
                let store = self.store.clone();
                let id = conversation_id.clone();
                let loaded = tokio::task::spawn_blocking(move || store.load_conversation(id))
                    .await
                    .context("failed to join load conversation task")?;
                if loaded.is_none() {
                    tracing::debug!(conversation_id = %conversation_id, "conversation not found");
                }
                Ok(VecDeque::from([Action::ConversationLoaded {
                    conversation_id,
                    loaded,
                }]))
            }
            Effect::CreateConversation {
                workspace_id,
                agent_id,
                pending,
            } => {
                let store = self.store.clone();
                let created = tokio::task::spawn_blocking(move || {
                    store.create_conversation(workspace_id, agent_id)
                })
                .await
                .ok()
                .unwrap_or_else(|| Err("failed to join create conversation task".to_owned()));
                let action = match created {
                    Ok(conversation) => Action::ConversationCreated {
                        conversation,
                        pending,
                    },
                    Err(message) => Action::ConversationCreateFailed { message },
                };
                Ok(VecDeque::from([action]))
            }
            Effect::AppendMessage {
                conversation_id,
                message,
            } => {
                let store = self.store.clone();
                let id = conversation_id.clone();
                let kind = message.kind;
                let appended =
                    tokio::task::spawn_blocking(move || store.append_message(id, message))
                        .await
                        .context("failed to join append message task")?;
                if !appended {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        kind = kind.as_str(),
                        "message was not persisted"
                    );
                    return Ok(VecDeque::new());
                }
                Ok(VecDeque::from([Action::MessagePersisted { conversation_id }]))
            }
            Effect::UpdateConversation {
                conversation_id,
                patch,
            } => {
                let store = self.store.clone();
                let id = conversation_id.clone();
                let updated =
                    tokio::task::spawn_blocking(move || store.update_conversation(id, patch))
                        .await
                        .context("failed to join update conversation task")?;
                Ok(conversation_updated(&conversation_id, updated))
            }
            Effect::UpdateConversationSettings {
                conversation_id,
                patch,
            } => {
                let store = self.store.clone();
                let id = conversation_id.clone();
                let updated = tokio::task::spawn_blocking(move || {
                    store.update_conversation_settings(id, patch)
                })
                .await
                .context("failed to join update settings task")?;
                Ok(conversation_updated(&conversation_id, updated))
            }
            Effect::DeleteConversation { conversation_id } => {
                let store = self.store.clone();
                let id = conversation_id.clone();
                let deleted = tokio::task::spawn_blocking(move || store.delete_conversation(id))
                    .await
                    .context("failed to join delete conversation task")?;
                if !deleted {
                    tracing::debug!(conversation_id = %conversation_id, "nothing to delete");
                    return Ok(VecDeque::new());
                }
                Ok(VecDeque::from([Action::ConversationsDeleted {
                    conversation_ids: vec![conversation_id],
                }]))
            }
            Effect::DeleteConversationsByBranch {
                workspace_id,
                branch_name,
            } => {
                let store = self.store.clone();
                let conversation_ids = tokio::task::spawn_blocking(move || {
                    store.delete_conversations_by_branch(workspace_id, branch_name)
                })
                .await
                .context("failed to join delete by branch task")?;
                if conversation_ids.is_empty() {
                    return Ok(VecDeque::new());
                }
                Ok(VecDeque::from([Action::ConversationsDeleted {
                    conversation_ids,
                }]))
            }
            Effect::DispatchMessage { request } => {
                let agent = self.agent.clone();
                let conversation_id = request.conversation_id.clone();
                let result = tokio::task::spawn_blocking(move || agent.send_message(request))
                    .await
                    .ok()
                    .unwrap_or_else(|| Err("failed to join send message task".to_owned()));
                match result {
                    Ok(()) => Ok(VecDeque::new()),
                    Err(message) => Ok(VecDeque::from([Action::MessageDispatchFailed {
                        conversation_id,
                        message,
                    }])),
                }
            }
            Effect::StopAgent { agent_id } => {
                let agent = self.agent.clone();
                let id = agent_id.clone();
                let result = tokio::task::spawn_blocking(move || agent.stop_agent(id))
                    .await
                    .ok()
                    .unwrap_or_else(|| Err("failed to join stop agent task".to_owned()));
                let action = match result {
                    Ok(()) => Action::AgentStopped { agent_id },
                    Err(message) => Action::AgentStopFailed { agent_id, message },
                };
                Ok(VecDeque::from([action]))
            }
            Effect::CheckAgentAvailable => {
                let agent = self.agent.clone();
                let executable = tokio::task::spawn_blocking(move || agent.check_available())
                    .await
                    .context("failed to join agent availability task")?;
                if executable.is_none() {
                    tracing::warn!("agent runtime executable not found");
                }
                Ok(VecDeque::from([Action::AgentAvailabilityChecked {
                    executable,
                }]))
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            rev: self.rev,
            state: self.state.clone(),
        }
    }

    fn publish_snapshot(&self) {
        let _ = self.events.send(self.snapshot());
    }
}

fn conversation_updated(
    conversation_id: &parley_domain::ConversationId,
    updated: Option<parley_domain::Conversation>,
) -> VecDeque<Action> {
    match updated {
        Some(conversation) => VecDeque::from([Action::ConversationUpdated { conversation }]),
        None => {
            tracing::warn!(
                conversation_id = %conversation_id,
                "conversation update was not persisted"
            );
            VecDeque::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_domain::{
        AgentId, AgentSubscription, Conversation, ConversationId, ConversationLocation,
        ConversationMessage, ConversationPatch, ConversationSettingsPatch, LoadedConversation,
        SendMessageRequest, WorkspaceId,
    };
    use std::path::PathBuf;

    struct EmptyStore;

    impl ConversationStore for EmptyStore {
        fn list_conversations(&self, _: WorkspaceId, _: AgentId) -> Vec<Conversation> {
            Vec::new()
        }

        fn create_conversation(&self, _: WorkspaceId, _: AgentId) -> Result<Conversation, String> {
            Err("read-only store".to_owned())
        }

        fn load_conversation(&self, _: ConversationId) -> Option<LoadedConversation> {
            None
        }

        fn update_conversation(
            &self,
            _: ConversationId,
            _: ConversationPatch,
        ) -> Option<Conversation> {
            None
        }

        fn update_conversation_settings(
            &self,
            _: ConversationId,
            _: ConversationSettingsPatch,
        ) -> Option<Conversation> {
            None
        }

        fn delete_conversation(&self, _: ConversationId) -> bool {
            false
        }

        fn delete_conversations_by_branch(&self, _: WorkspaceId, _: String) -> Vec<ConversationId> {
            Vec::new()
        }

        fn append_message(&self, _: ConversationId, _: ConversationMessage) -> bool {
            false
        }

        fn conversation_location(&self, _: &ConversationId) -> Option<ConversationLocation> {
            None
        }
    }

    struct IdleAgent;

    impl AgentClient for IdleAgent {
        fn send_message(&self, _: SendMessageRequest) -> Result<(), String> {
            Ok(())
        }

        fn stop_agent(&self, _: AgentId) -> Result<(), String> {
            Ok(())
        }

        fn check_available(&self) -> Option<PathBuf> {
            Some(PathBuf::from("/usr/local/bin/agent"))
        }

        fn subscribe(&self, _: AgentEventCallback) -> AgentSubscription {
            AgentSubscription::detached()
        }
    }

    fn engine() -> Engine {
        let (events, _) = broadcast::channel::<SessionSnapshot>(4);
        Engine {
            state: ChatSessionState::new(),
            rev: 0,
            store: Arc::new(EmptyStore),
            agent: Arc::new(IdleAgent),
            events,
        }
    }

    #[tokio::test]
    async fn failed_create_surfaces_as_last_error() {
        let mut engine = engine();
        engine
            .process_action_queue(Action::LoadConversations {
                workspace_id: WorkspaceId::new("ws1"),
                agent_id: AgentId::new("agentA"),
            })
            .await;
        engine.process_action_queue(Action::CreateConversation).await;

        assert_eq!(engine.state.last_error.as_deref(), Some("read-only store"));
        assert!(engine.state.conversations.is_empty());
        // LoadConversations, ConversationsLoaded, CreateConversation, ConversationCreateFailed
        assert_eq!(engine.rev, 4);
    }

    #[tokio::test]
    async fn missed_delete_produces_no_followup() {
        let mut engine = engine();
        let followups = engine
            .run_effect(Effect::DeleteConversation {
                conversation_id: ConversationId::new("missing"),
            })
            .await
            .unwrap();
        assert!(followups.is_empty());
    }

    #[tokio::test]
    async fn bootstrap_checks_agent_and_loads_scope() {
        let mut engine = engine();
        engine
            .bootstrap(SessionConfig {
                initial_scope: Some((WorkspaceId::new("ws1"), AgentId::new("agentA"))),
                check_agent_on_start: true,
            })
            .await;

        assert_eq!(
            engine.state.agent_executable,
            Some(PathBuf::from("/usr/local/bin/agent"))
        );
        assert_eq!(engine.state.workspace_id, Some(WorkspaceId::new("ws1")));
        assert!(!engine.state.is_loading);
    }
}
