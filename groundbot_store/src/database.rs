use async_trait::async_trait;
use groundbot_core::{ConversationData, ConversationStore};
use groundbot_entities::conversations;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, Set,
};
use tracing::info;

/// Conversation store backed by `sea-orm` (SQLite or Postgres).
///
/// Each conversation is one row holding its history as JSON.
pub struct DatabaseConversationStore {
    db: DatabaseConnection,
}

impl DatabaseConversationStore {
    /// Connect and create the `conversations` table if it does not exist.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to conversation database");
        let db = Database::connect(database_url).await?;

        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        let mut stmt = schema.create_table_from_entity(conversations::Entity);
        stmt.if_not_exists();
        db.execute_unprepared(&backend.build(&stmt).to_string())
            .await?;

        info!("DatabaseConversationStore initialized");
        Ok(Self { db })
    }

    pub async fn conversation_ids(&self) -> anyhow::Result<Vec<String>> {
        let rows = conversations::Entity::find().all(&self.db).await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }
}

#[async_trait]
impl ConversationStore for DatabaseConversationStore {
    async fn load(&self, conversation_id: &str) -> anyhow::Result<Option<ConversationData>> {
        let Some(row) = conversations::Entity::find_by_id(conversation_id.to_owned())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let data: ConversationData = serde_json::from_str(&row.history)?;
        Ok(Some(data))
    }

    async fn save(&self, conversation_id: &str, data: &ConversationData) -> anyhow::Result<()> {
        let history = serde_json::to_string(data)?;
        let now = chrono::Utc::now().naive_utc();

        if let Some(row) = conversations::Entity::find_by_id(conversation_id.to_owned())
            .one(&self.db)
            .await?
        {
            conversations::Entity::update(conversations::ActiveModel {
                id: Set(row.id),
                history: Set(history),
                created_at: Set(row.created_at),
                updated_at: Set(now),
            })
            .exec(&self.db)
            .await?;
        } else {
            conversations::ActiveModel {
                id: Set(conversation_id.to_owned()),
                history: Set(history),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&self.db)
            .await?;
        }

        info!(
            "Saved conversation {conversation_id} ({} turns)",
            data.len()
        );
        Ok(())
    }

    async fn clear(&self, conversation_id: &str) -> anyhow::Result<()> {
        conversations::Entity::delete_by_id(conversation_id.to_owned())
            .exec(&self.db)
            .await?;

        info!("Cleared conversation: {conversation_id}");
        Ok(())
    }
}
