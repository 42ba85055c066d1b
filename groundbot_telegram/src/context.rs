use async_trait::async_trait;
use groundbot_core::{Activity, ChannelAccount, Reply, TurnContext};
use teloxide::prelude::*;
use teloxide::types::User;
use tracing::debug;

/// Conversation key for a Telegram chat.
#[must_use]
pub fn conversation_id(chat_id: ChatId) -> String {
    chat_id.0.to_string()
}

pub(crate) fn account(user: &User) -> ChannelAccount {
    ChannelAccount::new(user.id.0.to_string()).with_name(user.full_name())
}

/// Replies for one Telegram update go back to the chat it came from.
pub struct TelegramTurnContext {
    bot: Bot,
    chat_id: ChatId,
    activity: Activity,
}

impl TelegramTurnContext {
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId, activity: Activity) -> Self {
        Self {
            bot,
            chat_id,
            activity,
        }
    }
}

#[async_trait]
impl TurnContext for TelegramTurnContext {
    fn activity(&self) -> &Activity {
        &self.activity
    }

    async fn send_activity(&mut self, reply: Reply) -> anyhow::Result<()> {
        let text = match reply {
            Reply::Text(text) => text,
            Reply::Card(card) => {
                debug!("Sending {} citations as text", card.len());
                card.render_text()
            }
        };
        self.bot.send_message(self.chat_id, text).await?;
        Ok(())
    }
}
