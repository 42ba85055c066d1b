//! Request and response shapes exchanged with the completion service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{ChatMessage, ConversationData, Usage};

/// How the search index is queried by the grounding data source.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    #[default]
    Simple,
    Semantic,
    Vector,
    VectorSimpleHybrid,
    VectorSemanticHybrid,
}

impl QueryType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Semantic => "semantic",
            Self::Vector => "vector",
            Self::VectorSimpleHybrid => "vector_simple_hybrid",
            Self::VectorSemanticHybrid => "vector_semantic_hybrid",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "semantic" => Ok(Self::Semantic),
            "vector" => Ok(Self::Vector),
            "vector_simple_hybrid" => Ok(Self::VectorSimpleHybrid),
            "vector_semantic_hybrid" => Ok(Self::VectorSemanticHybrid),
            other => Err(format!("unknown query type: {other}")),
        }
    }
}

/// Credentials the completion service uses to reach the search index.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchAuthentication {
    ApiKey { key: String },
    SystemAssignedManagedIdentity,
}

impl fmt::Debug for SearchAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey { .. } => f.write_str("ApiKey { key: *** }"),
            Self::SystemAssignedManagedIdentity => f.write_str("SystemAssignedManagedIdentity"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AzureSearchParameters {
    pub endpoint: String,
    pub index_name: String,
    #[serde(default)]
    pub query_type: QueryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<SearchAuthentication>,
}

/// Grounding data source attached to a completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "parameters", rename_all = "snake_case")]
pub enum DataSource {
    AzureSearch(AzureSearchParameters),
}

impl DataSource {
    #[must_use]
    pub fn azure_search(
        endpoint: impl Into<String>,
        index_name: impl Into<String>,
        query_type: QueryType,
    ) -> Self {
        Self::AzureSearch(AzureSearchParameters {
            endpoint: endpoint.into(),
            index_name: index_name.into(),
            query_type,
            authentication: None,
        })
    }

    #[must_use]
    pub fn with_authentication(self, authentication: SearchAuthentication) -> Self {
        match self {
            Self::AzureSearch(mut params) => {
                params.authentication = Some(authentication);
                Self::AzureSearch(params)
            }
        }
    }
}

/// The single execution-settings block of a request.
///
/// It ties the data sources to the completion call; sampling options are
/// only sent when set.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSettings {
    pub service_id: String,
    pub data_sources: Vec<DataSource>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            service_id: "default".to_string(),
            data_sources: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl ExecutionSettings {
    #[must_use]
    pub fn with_data_source(mut self, source: DataSource) -> Self {
        self.data_sources.push(source);
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A completion request, rebuilt from the stored history on every turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub settings: ExecutionSettings,
}

impl ChatRequest {
    #[must_use]
    pub fn from_history(data: &ConversationData, settings: ExecutionSettings) -> Self {
        Self {
            messages: data.messages(),
            settings,
        }
    }
}

/// A source document the answer was grounded on.
///
/// Its reference marker is its 1-based position in [`ChatResponse::citations`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub chunk_id: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    pub citations: Vec<Citation>,
    pub usage: Option<Usage>,
}

impl ChatResponse {
    #[must_use]
    pub fn has_citations(&self) -> bool {
        !self.citations.is_empty()
    }
}
