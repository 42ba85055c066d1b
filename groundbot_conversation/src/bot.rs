//! The activity handler behind every channel.

use groundbot_core::citation;
use groundbot_core::{
    ActivityType, ChatCompletion, ChatRequest, ConversationStore, ExecutionSettings, Reply, Role,
    TurnContext,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Static configuration shared by every turn.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Settings block attached to each completion request.
    pub execution: ExecutionSettings,
    /// Greeting sent to members joining a conversation.
    pub welcome_message: String,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            execution: ExecutionSettings::default(),
            welcome_message: "Hello and welcome to groundbot!".to_string(),
        }
    }
}

impl BotSettings {
    #[must_use]
    pub fn with_execution(mut self, execution: ExecutionSettings) -> Self {
        self.execution = execution;
        self
    }

    #[must_use]
    pub fn with_welcome_message(mut self, message: String) -> Self {
        self.welcome_message = message;
        self
    }
}

/// Why a turn was aborted. Nothing is retried.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Incoming message has no text")]
    MissingText,

    #[error("Conversation store unavailable: {0}")]
    StoreUnavailable(anyhow::Error),

    #[error("Completion service failed: {0}")]
    RemoteService(anyhow::Error),

    #[error("Failed to send reply: {0}")]
    Send(anyhow::Error),
}

/// Grounded chat bot.
///
/// Holds a long-lived completion client and store; both are shared
/// read-only between conversations. The host is expected to deliver at most
/// one activity per conversation at a time.
pub struct GroundedBot<P = Arc<dyn ChatCompletion>, S = Arc<dyn ConversationStore>>
where
    P: Send + Sync,
    S: Send + Sync,
{
    provider: P,
    store: S,
    settings: BotSettings,
}

impl<P, S> GroundedBot<P, S>
where
    P: ChatCompletion + Send + Sync,
    S: ConversationStore + Send + Sync,
{
    pub const fn new(provider: P, store: S, settings: BotSettings) -> Self {
        Self {
            provider,
            store,
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Route one activity to its handler.
    pub async fn on_turn(&self, ctx: &mut dyn TurnContext) -> Result<(), TurnError> {
        let activity = ctx.activity();
        let kind = activity.kind;
        let has_new_members = !activity.members_added.is_empty();

        match kind {
            ActivityType::Message => self.on_message_activity(ctx).await,
            ActivityType::ConversationUpdate if has_new_members => {
                self.on_members_added_activity(ctx).await
            }
            ActivityType::ConversationUpdate => {
                debug!(
                    "Ignoring conversation update for {}",
                    ctx.activity().conversation_id
                );
                Ok(())
            }
        }
    }

    /// Answer a user message.
    ///
    /// The history grows by exactly one user and one assistant turn, and is
    /// persisted before the reply goes out. If the completion call fails the
    /// stored history is left as it was and nothing is sent.
    pub async fn on_message_activity(&self, ctx: &mut dyn TurnContext) -> Result<(), TurnError> {
        let activity = ctx.activity();
        let text = activity.text.clone().ok_or(TurnError::MissingText)?;
        let conversation_id = activity.conversation_id.clone();

        info!("[{conversation_id}] Message: {text}");

        let mut data = self
            .store
            .get_or_default(&conversation_id)
            .await
            .map_err(TurnError::StoreUnavailable)?;

        data.add_turn(Role::User, text);

        let request = ChatRequest::from_history(&data, self.settings.execution.clone());
        debug!(
            "[{conversation_id}] Request: {} messages, {} data sources",
            request.messages.len(),
            request.settings.data_sources.len()
        );

        let response = self
            .provider
            .complete(&request)
            .await
            .map_err(TurnError::RemoteService)?;

        let answer = citation::normalize(&response.content);
        data.add_turn(Role::Assistant, answer.clone());

        self.store
            .save(&conversation_id, &data)
            .await
            .map_err(TurnError::StoreUnavailable)?;

        info!(
            "[{conversation_id}] Response: {answer} ({} citations)",
            response.citations.len()
        );

        ctx.send_activity(Reply::Text(answer))
            .await
            .map_err(TurnError::Send)?;

        if response.has_citations() {
            let card = citation::build_card(&response.citations)
                .map_err(|e| TurnError::Send(e.into()))?;
            ctx.send_activity(Reply::Card(card))
                .await
                .map_err(TurnError::Send)?;
        }

        Ok(())
    }

    /// Greet every newly added member other than the bot itself.
    pub async fn on_members_added_activity(
        &self,
        ctx: &mut dyn TurnContext,
    ) -> Result<(), TurnError> {
        let activity = ctx.activity();
        let greetings = activity
            .members_added
            .iter()
            .filter(|member| member.id != activity.recipient.id)
            .count();

        for _ in 0..greetings {
            ctx.send_activity(Reply::Text(self.settings.welcome_message.clone()))
                .await
                .map_err(TurnError::Send)?;
        }

        Ok(())
    }

    /// Forget a conversation's history.
    pub async fn reset(&self, conversation_id: &str) -> Result<(), TurnError> {
        self.store
            .clear(conversation_id)
            .await
            .map_err(TurnError::StoreUnavailable)?;
        info!("[{conversation_id}] History reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_has_no_data_sources() {
        let settings = BotSettings::default();
        assert!(settings.execution.data_sources.is_empty());
        assert!(!settings.welcome_message.is_empty());
    }

    #[test]
    fn turn_error_messages_name_the_failure() {
        let err = TurnError::RemoteService(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Completion service failed: connection refused");

        let err = TurnError::StoreUnavailable(anyhow::anyhow!("disk full"));
        assert_eq!(err.to_string(), "Conversation store unavailable: disk full");
    }
}
