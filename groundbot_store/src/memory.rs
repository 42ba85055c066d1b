use async_trait::async_trait;
use groundbot_core::{ConversationData, ConversationStore};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Process-local store; history is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    records: RwLock<HashMap<String, ConversationData>>,
}

impl InMemoryConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, conversation_id: &str) -> anyhow::Result<Option<ConversationData>> {
        Ok(self.records.read().await.get(conversation_id).cloned())
    }

    async fn save(&self, conversation_id: &str, data: &ConversationData) -> anyhow::Result<()> {
        self.records
            .write()
            .await
            .insert(conversation_id.to_string(), data.clone());
        debug!(
            "Saved conversation {conversation_id} ({} turns)",
            data.len()
        );
        Ok(())
    }

    async fn clear(&self, conversation_id: &str) -> anyhow::Result<()> {
        self.records.write().await.remove(conversation_id);
        debug!("Cleared conversation {conversation_id}");
        Ok(())
    }
}
