use std::fmt;

use async_trait::async_trait;
use groundbot_core::{ChatCompletion, ChatRequest, ChatResponse, Citation, Usage};
use reqwest::Client;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Credential material for the completion endpoint.
///
/// Acquiring and refreshing tokens is the caller's job; the provider only
/// attaches what it is given.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Sent as the `api-key` header.
    ApiKey(String),
    /// Sent as `Authorization: Bearer <token>`.
    BearerToken(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
            Self::BearerToken(_) => f.write_str("BearerToken(***)"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Azure OpenAI chat completions with "on your data" grounding.
///
/// Built once at startup and shared read-only across conversations.
#[derive(Debug, Clone)]
pub struct AzureOpenAiProvider {
    client: Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    credential: Credential,
}

impl AzureOpenAiProvider {
    pub const DEFAULT_API_VERSION: &'static str = "2024-02-01";

    pub fn new(endpoint: String, deployment: String, credential: Credential) -> Self {
        info!("Creating AzureOpenAiProvider for deployment {deployment}");
        Self {
            client: Client::new(),
            endpoint,
            deployment,
            api_version: Self::DEFAULT_API_VERSION.to_string(),
            credential,
        }
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: String) -> Self {
        self.api_version = api_version;
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    /// Wire body: messages plus the execution settings flattened into it.
    fn build_body(request: &ChatRequest) -> Value {
        let mut body = Map::new();
        body.insert("messages".to_string(), json!(request.messages));

        let settings = &request.settings;
        if !settings.data_sources.is_empty() {
            body.insert("data_sources".to_string(), json!(settings.data_sources));
        }
        if let Some(temperature) = settings.temperature {
            body.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = settings.max_tokens {
            body.insert("max_tokens".to_string(), json!(max_tokens));
        }

        Value::Object(body)
    }

    fn parse_response(response: &Value) -> Result<ChatResponse, ProviderError> {
        let message = &response["choices"][0]["message"];

        let content = message["content"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("missing content".to_string()))?
            .to_string();

        let citations = parse_citations(&message["context"]);

        let usage = &response["usage"];
        let usage = usage.is_object().then(|| Usage {
            prompt_tokens: token_count(usage, "prompt_tokens"),
            completion_tokens: token_count(usage, "completion_tokens"),
            total_tokens: token_count(usage, "total_tokens"),
        });

        Ok(ChatResponse {
            content,
            citations,
            usage,
        })
    }

    async fn try_send(&self, body: &Value) -> Result<ChatResponse, ProviderError> {
        let builder = self.client.post(self.completions_url()).json(body);
        let builder = match &self.credential {
            Credential::ApiKey(key) => builder.header("api-key", key),
            Credential::BearerToken(token) => builder.bearer_auth(token),
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value = response.json::<Value>().await?;
        Self::parse_response(&value)
    }
}

/// Citations from `message.context.citations`.
///
/// An absent or oddly shaped context means "no citations". An entry that
/// fails to parse is kept as an empty citation so later entries keep the
/// position their `[docN]` marker refers to.
/// Missing, non-numeric or out-of-range counts read as zero.
fn token_count(usage: &Value, key: &str) -> u32 {
    usage[key]
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn parse_citations(context: &Value) -> Vec<Citation> {
    let Some(entries) = context.get("citations").and_then(Value::as_array) else {
        if !context.is_null() {
            debug!("Response context carries no citation list");
        }
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            serde_json::from_value::<Citation>(entry.clone()).unwrap_or_else(|e| {
                warn!("Malformed citation {}: {e}", i + 1);
                Citation::default()
            })
        })
        .collect()
}

#[async_trait]
impl ChatCompletion for AzureOpenAiProvider {
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let body = Self::build_body(request);

        info!(
            "Sending request to Azure OpenAI: deployment={}, messages={}, data_sources={}",
            self.deployment,
            request.messages.len(),
            request.settings.data_sources.len()
        );

        let response = self.try_send(&body).await?;

        info!(
            "Received response from Azure OpenAI: {} chars, {} citations",
            response.content.len(),
            response.citations.len()
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundbot_core::{
        ChatMessage, DataSource, ExecutionSettings, QueryType, Role, SearchAuthentication,
    };

    fn request(settings: ExecutionSettings) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage {
                    role: Role::User,
                    content: "What is Rust?".to_string(),
                },
                ChatMessage {
                    role: Role::Assistant,
                    content: "A language.".to_string(),
                },
            ],
            settings,
        }
    }

    #[test]
    fn url_includes_deployment_and_api_version() {
        let provider = AzureOpenAiProvider::new(
            "https://example.openai.azure.com/".to_string(),
            "gpt-4o".to_string(),
            Credential::ApiKey("k".to_string()),
        );

        assert_eq!(
            provider.completions_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-01"
        );

        let provider = provider.with_api_version("2024-05-01-preview".to_string());
        assert!(provider.completions_url().ends_with("api-version=2024-05-01-preview"));
    }

    #[test]
    fn body_carries_messages_and_data_source() {
        let settings = ExecutionSettings::default().with_data_source(
            DataSource::azure_search("https://search.example.net", "docs", QueryType::Simple)
                .with_authentication(SearchAuthentication::SystemAssignedManagedIdentity),
        );

        let body = AzureOpenAiProvider::build_body(&request(settings));

        assert_eq!(body["messages"][0], json!({"role": "user", "content": "What is Rust?"}));
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(
            body["data_sources"],
            json!([{
                "type": "azure_search",
                "parameters": {
                    "endpoint": "https://search.example.net",
                    "index_name": "docs",
                    "query_type": "simple",
                    "authentication": {"type": "system_assigned_managed_identity"}
                }
            }])
        );
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn body_includes_sampling_options_when_set() {
        let settings = ExecutionSettings::default()
            .with_temperature(0.5)
            .with_max_tokens(800);

        let body = AzureOpenAiProvider::build_body(&request(settings));

        assert_eq!(body["temperature"], json!(0.5));
        assert_eq!(body["max_tokens"], json!(800));
        assert!(body.get("data_sources").is_none());
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn parses_content_citations_and_usage() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Rust is a systems language [doc1][doc2].",
                    "context": {
                        "citations": [
                            {"content": "Rust is fast.", "title": "Intro", "url": "https://a", "filepath": null, "chunk_id": "0"},
                            {"content": "Rust is safe.", "title": null}
                        ],
                        "intent": "[\"what is rust\"]"
                    }
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });

        let parsed = AzureOpenAiProvider::parse_response(&response).unwrap();

        assert_eq!(parsed.content, "Rust is a systems language [doc1][doc2].");
        assert_eq!(parsed.citations.len(), 2);
        assert_eq!(parsed.citations[0].title.as_deref(), Some("Intro"));
        assert_eq!(parsed.citations[1].content, "Rust is safe.");
        assert_eq!(parsed.usage.unwrap().total_tokens, 15);
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn missing_context_means_no_citations() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello"}}]
        });

        let parsed = AzureOpenAiProvider::parse_response(&response).unwrap();
        assert_eq!(parsed.content, "Hello");
        assert!(!parsed.has_citations());
        assert!(parsed.usage.is_none());
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn malformed_citation_shapes_degrade() {
        for context in [
            json!(null),
            json!("not an object"),
            json!({}),
            json!({"citations": null}),
            json!({"citations": "nope"}),
            json!({"citations": []}),
        ] {
            let response = json!({
                "choices": [{"message": {"content": "Hi", "context": context.clone()}}]
            });
            let parsed = AzureOpenAiProvider::parse_response(&response).unwrap();
            assert!(parsed.citations.is_empty(), "context: {context}");
        }
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn malformed_entry_keeps_positions() {
        let response = json!({
            "choices": [{"message": {"content": "x", "context": {"citations": [
                {"title": 42},
                {"title": "Second"}
            ]}}}]
        });

        let parsed = AzureOpenAiProvider::parse_response(&response).unwrap();
        assert_eq!(parsed.citations.len(), 2);
        assert_eq!(parsed.citations[0], Citation::default());
        assert_eq!(parsed.citations[1].title.as_deref(), Some("Second"));
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn missing_content_is_an_error() {
        let response = json!({"choices": []});
        let err = AzureOpenAiProvider::parse_response(&response).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn partial_usage_reads_missing_counts_as_zero() {
        let response = json!({
            "choices": [{"message": {
                "content": "Hi [doc1]",
                "context": {"citations": [{"content": "x"}]}
            }}],
            "usage": {"total_tokens": 15}
        });
        let parsed = AzureOpenAiProvider::parse_response(&response).unwrap();
        assert_eq!(parsed.citations.len(), 1);
        assert_eq!(
            parsed.usage,
            Some(Usage {
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 15,
            })
        );
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn malformed_usage_values_do_not_fail_the_response() {
        let response = json!({
            "choices": [{"message": {"content": "ok"}}],
            "usage": {"prompt_tokens": "ten", "completion_tokens": -1, "total_tokens": 99_999_999_999u64}
        });
        let usage = AzureOpenAiProvider::parse_response(&response)
            .unwrap()
            .usage
            .unwrap();
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 0);

        let response = json!({"choices": [{"message": {"content": "ok"}}], "usage": 12});
        assert!(AzureOpenAiProvider::parse_response(&response).unwrap().usage.is_none());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let debug = format!("{:?}", Credential::BearerToken("token-value".to_string()));
        assert!(!debug.contains("token-value"));
    }

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn unreachable_endpoint_surfaces_http_error() {
        let provider = AzureOpenAiProvider::new(
            "http://127.0.0.1:9".to_string(),
            "gpt".to_string(),
            Credential::ApiKey("key".to_string()),
        );
        let err = provider
            .complete(&request(ExecutionSettings::default()))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::Http(_))
        ));
    }
}
