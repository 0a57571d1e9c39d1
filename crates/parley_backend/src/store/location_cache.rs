use parley_domain::{Conversation, ConversationId, ConversationLocation};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Conversation id to on-disk location. Owned by one store instance.
#[derive(Debug, Default)]
pub(super) struct LocationCache {
    entries: Mutex<HashMap<ConversationId, ConversationLocation>>,
}

impl LocationCache {
    fn lock(&self) -> MutexGuard<'_, HashMap<ConversationId, ConversationLocation>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(super) fn get(&self, conversation_id: &ConversationId) -> Option<ConversationLocation> {
        self.lock().get(conversation_id).cloned()
    }

    pub(super) fn insert(&self, conversation_id: ConversationId, location: ConversationLocation) {
        self.lock().insert(conversation_id, location);
    }

    pub(super) fn remember_all(
        &self,
        location: &ConversationLocation,
        conversations: &[Conversation],
    ) {
        let mut entries = self.lock();
        for conversation in conversations {
            entries.insert(conversation.id.clone(), location.clone());
        }
    }

    pub(super) fn remove(&self, conversation_id: &ConversationId) {
        self.lock().remove(conversation_id);
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.lock().len()
    }
}
