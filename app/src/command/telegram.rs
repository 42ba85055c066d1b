use crate::command::CommandStrategy;
use groundbot_config::Config;
use groundbot_telegram::TelegramBot;
use std::sync::Arc;
use tracing::info;

/// Input for Telegram bot command.
pub struct TelegramInput {
    /// Optional bot token (overrides config)
    pub token: Option<String>,
    /// Optional allowed chat IDs (overrides config)
    pub allow_from: Option<Vec<String>>,
}

/// Strategy for running Telegram bot.
pub struct TelegramStrategy;

impl CommandStrategy for TelegramStrategy {
    type Input = TelegramInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        // An explicit token on the command line enables the channel
        let token = match input.token {
            Some(t) => t,
            None if !config.telegram.enabled => {
                anyhow::bail!("Telegram is not enabled in config. Set \"telegram.enabled\": true")
            }
            None if config.telegram.token.is_empty() => {
                anyhow::bail!("missing configuration: TELEGRAM_BOT_TOKEN")
            }
            None => config.telegram.token.clone(),
        };

        let allow_from = input
            .allow_from
            .unwrap_or_else(|| config.telegram.allow_from.clone());

        info!("Starting Telegram bot...");
        let handler = Arc::new(super::build_bot(&config).await?);
        let bot = TelegramBot::new(token, handler, &allow_from);

        info!("Telegram bot is running. Press Ctrl+C to stop.");
        bot.run().await?;

        Ok(())
    }
}
