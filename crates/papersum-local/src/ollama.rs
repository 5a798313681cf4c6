use crate::{lookup_trimmed, Lookup, DEFAULT_TIMEOUT_MS, SYSTEM_PROMPT};
use async_trait::async_trait;
use papersum_core::{Error, Result, Summarizer, SummaryLimits};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
// Users should override this based on what they have pulled locally.
pub const DEFAULT_MODEL: &str = "qwen2.5:3b-instruct";

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn from_lookup(client: reqwest::Client, lookup: Lookup<'_>) -> Result<Self> {
        let base_url = lookup_trimmed(lookup, "PAPERSUM_OLLAMA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("PAPERSUM_OLLAMA_BASE_URL: {e}")))?;
        let model = lookup_trimmed(lookup, "PAPERSUM_OLLAMA_MODEL")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            client,
            base_url,
            model,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ollama is local and needs no credentials; the defaults are enough to build a client.
    pub(crate) fn describe(
        lookup: Lookup<'_>,
    ) -> (Option<String>, Option<String>, Vec<&'static str>) {
        let model = lookup_trimmed(lookup, "PAPERSUM_OLLAMA_MODEL")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base = lookup_trimmed(lookup, "PAPERSUM_OLLAMA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let missing = if url::Url::parse(&base).is_err() {
            vec!["PAPERSUM_OLLAMA_BASE_URL"]
        } else {
            Vec::new()
        };
        (Some(model), Some(base), missing)
    }

    fn endpoint_chat(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat(&self, system: &str, user: &str, options: ChatOptions) -> Result<String> {
        let req = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            stream: Some(false),
            options: Some(options),
        };

        let resp = self
            .client
            .post(self.endpoint_chat())
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Summarization(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Summarization(format!("ollama chat HTTP {status}")));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| Error::Summarization(e.to_string()))?;
        Ok(parsed.message.content)
    }
}

#[async_trait]
impl Summarizer for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn summarize(&self, text: &str, limits: &SummaryLimits) -> Result<String> {
        let options = ChatOptions {
            temperature: 0.0,
            num_predict: limits.max_length,
        };
        self.chat(SYSTEM_PROMPT, text, options).await
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChatOptions {
    pub temperature: f64,
    pub num_predict: u32,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}
