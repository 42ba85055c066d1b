use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use groundbot_core::{DataSource, ExecutionSettings, QueryType, SearchAuthentication};

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub azure_openai: AzureOpenAiConfig,
    #[serde(default)]
    pub azure_search: AzureSearchConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AzureOpenAiConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub deployment: String,
    #[serde(default = "AzureOpenAiConfig::default_api_version")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Pre-issued Entra ID access token, used when no API key is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for AzureOpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment: String::new(),
            api_version: Self::default_api_version(),
            api_key: None,
            ad_token: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl AzureOpenAiConfig {
    fn default_api_version() -> String {
        "2024-02-01".to_string()
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct AzureSearchConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub index_name: String,
    #[serde(default)]
    pub query_type: QueryType,
    /// Admin or query key; without it the completion service's managed
    /// identity is used to reach the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BotConfig {
    #[serde(default = "BotConfig::default_welcome_message")]
    pub welcome_message: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            welcome_message: Self::default_welcome_message(),
        }
    }
}

impl BotConfig {
    fn default_welcome_message() -> String {
        "Hello and welcome to groundbot!".to_string()
    }
}

/// Where conversation history is kept. No URL means process memory.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub allow_from: Vec<String>,
}

fn required<'a>(value: &'a str, key: &str) -> anyhow::Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        anyhow::bail!("missing configuration: {key}");
    }
    Ok(value)
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("groundbot"))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load `~/groundbot/config.json` when present, then apply environment
    /// overrides. A missing file is not an error.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            info!("Loading config from {}", config_path.display());
            Self::load_from(&config_path)?
        } else {
            info!(
                "No config file at {}, using environment only",
                config_path.display()
            );
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Override file values with whatever `lookup` yields for the known
    /// environment variable names. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AZURE_OPENAI_API_ENDPOINT") {
            self.azure_openai.endpoint = v;
        }
        if let Some(v) = get("AZURE_OPENAI_DEPLOYMENT_NAME") {
            self.azure_openai.deployment = v;
        }
        if let Some(v) = get("AZURE_OPENAI_API_VERSION") {
            self.azure_openai.api_version = v;
        }
        if let Some(v) = get("AZURE_OPENAI_API_KEY") {
            self.azure_openai.api_key = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_AD_TOKEN") {
            self.azure_openai.ad_token = Some(v);
        }
        if let Some(v) = get("AZURE_SEARCH_API_ENDPOINT") {
            self.azure_search.endpoint = v;
        }
        if let Some(v) = get("AZURE_SEARCH_INDEX") {
            self.azure_search.index_name = v;
        }
        if let Some(v) = get("AZURE_SEARCH_QUERY_TYPE") {
            match v.parse::<QueryType>() {
                Ok(query_type) => self.azure_search.query_type = query_type,
                Err(e) => warn!("Ignoring AZURE_SEARCH_QUERY_TYPE: {e}"),
            }
        }
        if let Some(v) = get("AZURE_SEARCH_API_KEY") {
            self.azure_search.api_key = Some(v);
        }
        if let Some(v) = get("GROUNDBOT_DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.token = v;
        }
    }

    pub fn openai_endpoint(&self) -> anyhow::Result<&str> {
        required(&self.azure_openai.endpoint, "AZURE_OPENAI_API_ENDPOINT")
    }

    pub fn deployment(&self) -> anyhow::Result<&str> {
        required(&self.azure_openai.deployment, "AZURE_OPENAI_DEPLOYMENT_NAME")
    }

    #[must_use]
    pub fn openai_api_key(&self) -> Option<&str> {
        non_empty(self.azure_openai.api_key.as_ref())
    }

    #[must_use]
    pub fn openai_ad_token(&self) -> Option<&str> {
        non_empty(self.azure_openai.ad_token.as_ref())
    }

    pub fn search_endpoint(&self) -> anyhow::Result<&str> {
        required(&self.azure_search.endpoint, "AZURE_SEARCH_API_ENDPOINT")
    }

    pub fn search_index(&self) -> anyhow::Result<&str> {
        required(&self.azure_search.index_name, "AZURE_SEARCH_INDEX")
    }

    /// The execution settings every completion request carries: the search
    /// data source plus any configured sampling options.
    pub fn execution_settings(&self) -> anyhow::Result<ExecutionSettings> {
        let authentication = non_empty(self.azure_search.api_key.as_ref()).map_or(
            SearchAuthentication::SystemAssignedManagedIdentity,
            |key| SearchAuthentication::ApiKey {
                key: key.to_string(),
            },
        );

        let source = DataSource::azure_search(
            self.search_endpoint()?,
            self.search_index()?,
            self.azure_search.query_type,
        )
        .with_authentication(authentication);

        let mut settings = ExecutionSettings::default().with_data_source(source);
        if let Some(temperature) = self.azure_openai.temperature {
            settings = settings.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.azure_openai.max_tokens {
            settings = settings.with_max_tokens(max_tokens);
        }
        Ok(settings)
    }

    /// Default database location: `~/groundbot/conversations.db`.
    pub fn default_database_url() -> anyhow::Result<String> {
        let path = Self::config_dir()?.join("conversations.db");
        Ok(format!("sqlite://{}?mode=rwc", path.display()))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub const TEMPLATE: &'static str = r#"{
  "azure_openai": {
    "endpoint": "https://your-resource.openai.azure.com",
    "deployment": "your-deployment-name",
    "api_version": "2024-02-01",
    "api_key": "your-azure-openai-api-key"
  },
  "azure_search": {
    "endpoint": "https://your-search.search.windows.net",
    "index_name": "your-index",
    "query_type": "simple"
  },
  "bot": {
    "welcome_message": "Hello and welcome to groundbot!"
  },
  "database": {},
  "telegram": {
    "enabled": false,
    "token": "",
    "allow_from": []
  }
}"#;

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, Self::TEMPLATE)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Fill in the Azure OpenAI endpoint, deployment and API key");
        println!("   2. Point azure_search at the index to ground answers on");
        println!("   3. Run 'groundbot chat' to start a conversation");
        println!();
        println!("💾 History is kept in memory unless database.url is set, e.g.:");
        println!("   {}", Self::default_database_url()?);
        println!();
        println!("🔧 Environment variables override the file:");
        println!("   AZURE_OPENAI_API_ENDPOINT, AZURE_OPENAI_DEPLOYMENT_NAME, AZURE_OPENAI_API_KEY,");
        println!("   AZURE_OPENAI_AD_TOKEN, AZURE_SEARCH_API_ENDPOINT, AZURE_SEARCH_INDEX,");
        println!("   AZURE_SEARCH_API_KEY, GROUNDBOT_DATABASE_URL, TELEGRAM_BOT_TOKEN");
        println!();
        Ok(())
    }
}
