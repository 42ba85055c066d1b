use crate::Result;
use crate::context::account;
use groundbot_conversation::GroundedBot;
use groundbot_core::ChannelAccount;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{info, warn};

/// Telegram bot answering every allowed chat through one [`GroundedBot`].
#[derive(Clone)]
pub struct TelegramBot {
    /// Teloxide bot instance
    pub bot: Bot,
    /// Shared turn processor
    pub handler: Arc<GroundedBot>,
    /// Allowed chat IDs; empty allows everyone
    allowed_chats: Vec<i64>,
}

impl TelegramBot {
    #[must_use]
    pub fn new(token: String, handler: Arc<GroundedBot>, allowed_chats: &[String]) -> Self {
        let allowed_chats = allowed_chats
            .iter()
            .filter_map(|s| match s.trim().parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!("Ignoring invalid chat id in allow list: {s}");
                    None
                }
            })
            .collect();

        Self {
            bot: Bot::new(token),
            handler,
            allowed_chats,
        }
    }

    /// Check if a chat is allowed
    #[must_use]
    pub fn is_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chats.is_empty() || self.allowed_chats.contains(&chat_id)
    }

    /// Check the token once and return the bot's own account.
    ///
    /// A bad token or an unreachable API fails startup instead of retrying.
    async fn test_connection(&self) -> Result<ChannelAccount> {
        match self.bot.get_me().await {
            Ok(me) => {
                info!(
                    "Connected to Telegram API: @{} (id: {})",
                    me.user.username.as_deref().unwrap_or("no username"),
                    me.user.id
                );
                Ok(account(&me.user))
            }
            Err(e) => {
                warn!("Could not reach the Telegram API: {e}");
                warn!("Check the bot token and that api.telegram.org is reachable");
                Err(e.into())
            }
        }
    }

    /// Run the bot until interrupted.
    pub async fn run(self) -> Result<()> {
        use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
        use teloxide::dptree;
        use teloxide::types::Update;

        let me = self.test_connection().await?;

        if let Err(e) = self
            .bot
            .set_my_commands(crate::Command::bot_commands())
            .await
        {
            warn!("Failed to register bot commands: {e}");
        }

        let bot = self.bot.clone();

        let schema = dptree::entry().branch(Update::filter_message().endpoint({
            let telegram = self.clone();
            move |_bot: Bot, msg: Message| {
                let telegram = telegram.clone();
                let me = me.clone();
                async move { crate::handler::handle_message(telegram, me, msg).await }
            }
        }));

        info!("Telegram bot started");
        Dispatcher::builder(bot, schema)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}
