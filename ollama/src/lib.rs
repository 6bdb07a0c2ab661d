//! Minimal Ollama chat API client.
//!
//! This crate provides a focused client for Ollama's `/api/chat` endpoint:
//! non-streaming chat completions against a local (or remote) Ollama server.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

const DEFAULT_HOST: &str = "http://localhost:11434";

/// Errors that can occur when using the Ollama client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Ollama API client.
#[derive(Clone)]
pub struct Ollama {
    client: reqwest::Client,
    host: String,
}

impl Ollama {
    /// Create a new client pointed at the given host, e.g. `http://localhost:11434`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            host: host.into(),
        }
    }

    /// Create a client from the `OLLAMA_HOST` environment variable,
    /// falling back to `http://localhost:11434`.
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::new(host)
    }

    /// Send a chat request and return the full response.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_request = ApiRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model name, e.g. `gemma3:4b`.
    pub model: String,

    /// Conversation messages in order.
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /// Create a request for the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
        }
    }

    /// Append a message to the conversation.
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Message roles recognized by the chat API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Response from a chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// The generated assistant message.
    pub message: Message,

    /// Model that produced the response.
    #[serde(default)]
    pub model: String,

    /// Whether generation finished.
    #[serde(default)]
    pub done: bool,
}

impl ChatResponse {
    /// The response text, trimmed.
    pub fn text(&self) -> &str {
        self.message.content.trim()
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::system("You are a suspect.");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.content, "You are a suspect.");

        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::assistant("hello").role, Role::Assistant);
    }

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::new("gemma3:4b")
            .with_message(Message::system("persona"))
            .with_message(Message::user("question"));

        assert_eq!(request.model, "gemma3:4b");
        assert_eq!(request.messages.len(), 2);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Message::user("q")).unwrap();
        assert!(json.contains("\"role\":\"user\""));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "model": "gemma3:4b",
            "created_at": "2024-01-01T00:00:00Z",
            "message": {"role": "assistant", "content": "  I was home.  "},
            "done": true
        }"#;

        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), "I was home.");
        assert!(response.done);
    }
}
