//! Static strategy pattern for CLI commands.
//!
//! Each command is its own strategy type with its own input, dispatched
//! statically from `main`.

use groundbot_config::Config;
use groundbot_conversation::{BotSettings, GroundedBot};
use groundbot_core::{ChatCompletion, ConversationStore};
use groundbot_providers::{AzureOpenAiProvider, Credential};
use groundbot_store::{DatabaseConversationStore, InMemoryConversationStore};
use std::sync::Arc;
use tracing::info;

mod chat;
mod info;
mod init;
mod telegram;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use telegram::{TelegramInput, TelegramStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Build the completion client. An API key wins over an AD token.
fn build_provider(config: &Config) -> anyhow::Result<AzureOpenAiProvider> {
    let credential = match (config.openai_api_key(), config.openai_ad_token()) {
        (Some(key), _) => Credential::ApiKey(key.to_string()),
        (None, Some(token)) => Credential::BearerToken(token.to_string()),
        (None, None) => {
            anyhow::bail!("missing configuration: AZURE_OPENAI_API_KEY or AZURE_OPENAI_AD_TOKEN")
        }
    };

    Ok(AzureOpenAiProvider::new(
        config.openai_endpoint()?.to_string(),
        config.deployment()?.to_string(),
        credential,
    )
    .with_api_version(config.azure_openai.api_version.clone()))
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn ConversationStore>> {
    match config.database.url.as_deref().filter(|url| !url.trim().is_empty()) {
        Some(url) => Ok(Arc::new(DatabaseConversationStore::connect(url).await?)),
        None => {
            info!("No database configured, conversation history is kept in memory");
            Ok(Arc::new(InMemoryConversationStore::new()))
        }
    }
}

/// Wire provider, store and settings into the shared turn processor.
async fn build_bot(config: &Config) -> anyhow::Result<GroundedBot> {
    let provider: Arc<dyn ChatCompletion> = Arc::new(build_provider(config)?);
    let settings = BotSettings::default()
        .with_execution(config.execution_settings()?)
        .with_welcome_message(config.bot.welcome_message.clone());
    let store = build_store(config).await?;

    info!(
        "Using deployment {} with {} data source(s)",
        config.deployment()?,
        settings.execution.data_sources.len()
    );

    Ok(GroundedBot::new(provider, store, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut config = Config::default();
        config.azure_openai.endpoint = "https://res.openai.azure.com".to_string();
        config.azure_openai.deployment = "gpt".to_string();
        config
    }

    #[test]
    fn provider_requires_a_credential() {
        let err = build_provider(&configured()).unwrap_err();
        assert!(err.to_string().contains("AZURE_OPENAI_API_KEY"));
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn provider_accepts_an_ad_token() {
        let mut config = configured();
        config.azure_openai.ad_token = Some("token".to_string());
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.deployment(), "gpt");
    }

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn bot_without_search_index_is_rejected() {
        let mut config = configured();
        config.azure_openai.api_key = Some("key".to_string());
        let err = build_bot(&config).await.err().unwrap();
        assert!(err.to_string().starts_with("missing configuration"));
    }
}
