use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{InvocationError, Result};
use crate::llm::prompts::SYSTEM_PROMPT;
use crate::llm::provider::{status_error, transport_error, LLMProvider};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions backend for OpenAI and API-compatible servers.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
pub(crate) struct ChatRequest {
    /// Azure routes by deployment instead and omits it.
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub(crate) fn new(model: Option<String>, prompt: &str) -> Self {
        Self {
            model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Sends a chat-completions request and returns the first choice's text.
pub(crate) async fn send_chat(
    request: RequestBuilder,
    body: &ChatRequest,
    timeout: Duration,
    backend: &str,
) -> std::result::Result<String, InvocationError> {
    let response = request
        .timeout(timeout)
        .json(body)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout, backend))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, body, backend));
    }

    let result: ChatResponse = response
        .json()
        .await
        .map_err(|e| transport_error(e, timeout, backend))?;

    result
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.is_empty())
        .ok_or(InvocationError::EmptyResponse)
}

impl OpenAIProvider {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn invoke(&self, prompt: &str, timeout: Duration) -> std::result::Result<String, InvocationError> {
        let body = ChatRequest::new(Some(self.model.clone()), prompt);
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key);

        send_chat(request, &body, timeout, "OpenAI").await
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one connection with a canned response head, then holds it open.
    async fn canned_server(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 16 * 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });

        format!("http://{}", addr)
    }

    fn provider(base_url: String) -> OpenAIProvider {
        OpenAIProvider {
            client: Client::builder().no_proxy().build().unwrap(),
            api_key: "test-key".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url,
        }
    }

    #[test]
    fn test_request_omits_missing_model() {
        let body = serde_json::to_value(ChatRequest::new(None, "hi")).unwrap();
        assert!(body.get("model").is_none());
        assert_eq!(body["messages"][1]["content"], "hi");

        let body = serde_json::to_value(ChatRequest::new(Some("gpt-4o".to_string()), "hi")).unwrap();
        assert_eq!(body["model"], "gpt-4o");
    }

    #[tokio::test]
    async fn test_reads_first_choice() {
        let url = canned_server(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 49\r\n\r\n{\"choices\":[{\"message\":{\"content\":\"{\\\"a\\\":1}\"}}]}",
        )
        .await;

        let text = provider(url).invoke("hello", Duration::from_secs(2)).await;
        assert_eq!(text, Ok(r#"{"a":1}"#.to_string()));
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let url = canned_server("HTTP/1.1 503 Service Unavailable\r\ncontent-length: 4\r\n\r\nbusy").await;

        let err = provider(url).invoke("hello", Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, InvocationError::Network(ref msg) if msg.contains("503")));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_stalled_body_is_a_timeout() {
        // Promises 100 bytes of body, sends one
        let url = canned_server(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{",
        )
        .await;

        let limit = Duration::from_millis(300);
        let err = provider(url).invoke("hello", limit).await.unwrap_err();
        assert_eq!(err, InvocationError::Timeout(limit));
    }
}
