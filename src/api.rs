//! Perplexity chat-completion client.
//!
//! One POST per question, no retries. The whole body is read before it is
//! parsed, and failures are classified into [`ApiError`] for the caller.

use crate::credentials::ApiKey;
use crate::models::Model;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai/chat/completions";

/// Overall deadline for a single request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A non-empty question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

#[derive(Debug, Error)]
#[error("question must not be empty")]
pub struct InvalidQuestion;

impl Question {
    pub fn new(text: impl Into<String>) -> Result<Self, InvalidQuestion> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(InvalidQuestion);
        }
        Ok(Self(text))
    }

    /// Join command-line words into a single question.
    pub fn from_words(words: &[String]) -> Result<Self, InvalidQuestion> {
        Self::new(words.join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Errors returned by [`ApiClient::ask`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed ({status}): {message}. Check your key with 'pplx configure'")]
    Auth { status: StatusCode, message: String },
    #[error("API request failed with status {status}{}", error_detail(.body))]
    Http { status: StatusCode, body: String },
    #[error("failed to reach the Perplexity API: {}", network_detail(.0))]
    Network(reqwest::Error),
    #[error("failed to decode API response")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected API response: expected a JSON object")]
    UnexpectedBody,
}

/// A successful response: the body exactly as received, and its parsed form.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    raw: String,
    body: Value,
}

impl ResponseEnvelope {
    /// Parse a response body. Anything but a JSON object is rejected.
    pub fn parse(raw: String) -> Result<Self, ApiError> {
        let body: Value = serde_json::from_str(&raw)?;
        if !body.is_object() {
            return Err(ApiError::UnexpectedBody);
        }
        Ok(Self { raw, body })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: Model,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// HTTP client for the chat-completion endpoint.
pub struct ApiClient {
    endpoint: String,
    client: Client,
}

impl ApiClient {
    /// Create a client for the public endpoint with the default timeout.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_endpoint(PERPLEXITY_API_URL, REQUEST_TIMEOUT)
    }

    /// Create a client for a custom endpoint and timeout.
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self::with_client(endpoint, client))
    }

    /// Use an already configured HTTP client.
    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    /// Ask a single question.
    pub async fn ask(
        &self,
        question: &Question,
        model: Model,
        api_key: &ApiKey,
    ) -> Result<ResponseEnvelope, ApiError> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: question.as_str(),
            }],
        };

        debug!("Sending question to {} (model {})", self.endpoint, model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.as_str())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(ApiError::Network)?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::Network)?;
        debug!("Received {} ({} bytes)", status, body.len());

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = error_message(&body).unwrap_or_else(|| "invalid API key".to_string());
            return Err(ApiError::Auth { status, message });
        }
        if !status.is_success() {
            return Err(ApiError::Http { status, body });
        }

        ResponseEnvelope::parse(body)
    }
}

/// Pull a human-readable message out of an error body, if it has one.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    match error {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(error.to_string())),
        _ => None,
    }
}

fn network_detail(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        "could not connect".to_string()
    } else {
        error.to_string()
    }
}

fn error_detail(body: &str) -> String {
    match error_message(body) {
        Some(message) => format!(": {}", message),
        None if body.trim().is_empty() => String::new(),
        None => format!(": {}", body.trim()),
    }
}
