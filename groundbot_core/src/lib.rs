#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod activity;
pub mod chat;
pub mod citation;
pub mod conversation;

pub use activity::{Activity, ActivityType, ChannelAccount, Reply};
pub use chat::{
    AzureSearchParameters, ChatRequest, ChatResponse, Citation, DataSource, ExecutionSettings,
    QueryType, SearchAuthentication,
};
pub use citation::{CitationCard, CitationEntry, CitationError};
pub use conversation::{ConversationData, ConversationTurn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    /// Any role string this build does not recognise.
    #[serde(other)]
    Other,
}

impl Role {
    /// Role a stored turn is sent to the completion service with.
    ///
    /// Only user turns keep their role; every other stored role is replayed
    /// as an assistant message.
    #[must_use]
    pub fn for_completion(&self) -> Self {
        if *self == Self::User {
            Self::User
        } else {
            Self::Assistant
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Remote chat completion service with a grounding data source attached.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse>;
}

/// Per-conversation persistence of the turn history.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, conversation_id: &str) -> anyhow::Result<Option<ConversationData>>;
    async fn save(&self, conversation_id: &str, data: &ConversationData) -> anyhow::Result<()>;
    async fn clear(&self, conversation_id: &str) -> anyhow::Result<()>;

    /// Load the record, or an empty history when none exists yet.
    async fn get_or_default(&self, conversation_id: &str) -> anyhow::Result<ConversationData> {
        Ok(self.load(conversation_id).await?.unwrap_or_default())
    }
}

/// One inbound activity plus the means to reply to it.
#[async_trait]
pub trait TurnContext: Send {
    fn activity(&self) -> &Activity;
    async fn send_activity(&mut self, reply: Reply) -> anyhow::Result<()>;
}

#[async_trait]
impl<T> ChatCompletion for std::sync::Arc<T>
where
    T: ChatCompletion + ?Sized,
{
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        (**self).complete(request).await
    }
}

#[async_trait]
impl<T> ConversationStore for std::sync::Arc<T>
where
    T: ConversationStore + ?Sized,
{
    async fn load(&self, conversation_id: &str) -> anyhow::Result<Option<ConversationData>> {
        (**self).load(conversation_id).await
    }

    async fn save(&self, conversation_id: &str, data: &ConversationData) -> anyhow::Result<()> {
        (**self).save(conversation_id, data).await
    }

    async fn clear(&self, conversation_id: &str) -> anyhow::Result<()> {
        (**self).clear(conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_mapping_collapses_non_user_roles() {
        assert_eq!(Role::User.for_completion(), Role::User);
        assert_eq!(Role::Assistant.for_completion(), Role::Assistant);
        assert_eq!(Role::System.for_completion(), Role::Assistant);
        assert_eq!(Role::Tool.for_completion(), Role::Assistant);
        assert_eq!(Role::Other.for_completion(), Role::Assistant);
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn unknown_role_string_deserializes() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role":"function","content":"x"}"#).unwrap();
        assert_eq!(msg.role, Role::Other);

        let msg: ChatMessage = serde_json::from_str(r#"{"role":"user","content":"x"}"#).unwrap();
        assert_eq!(msg.role, Role::User);
    }
}
