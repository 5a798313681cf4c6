use crate::{lookup_trimmed, Lookup, DEFAULT_TIMEOUT_MS, SYSTEM_PROMPT};
use async_trait::async_trait;
use papersum_core::{Error, Result, Summarizer, SummaryLimits};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl OpenAiCompatClient {
    pub fn from_lookup(client: reqwest::Client, lookup: Lookup<'_>) -> Result<Self> {
        let base_url = lookup_trimmed(lookup, "PAPERSUM_OPENAI_COMPAT_BASE_URL").ok_or_else(
            || Error::NotConfigured("missing PAPERSUM_OPENAI_COMPAT_BASE_URL".to_string()),
        )?;
        let api_key = lookup_trimmed(lookup, "PAPERSUM_OPENAI_COMPAT_API_KEY");
        let model = lookup_trimmed(lookup, "PAPERSUM_OPENAI_COMPAT_MODEL").ok_or_else(|| {
            Error::NotConfigured("missing PAPERSUM_OPENAI_COMPAT_MODEL".to_string())
        })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn describe(
        lookup: Lookup<'_>,
    ) -> (Option<String>, Option<String>, Vec<&'static str>) {
        let base = lookup_trimmed(lookup, "PAPERSUM_OPENAI_COMPAT_BASE_URL");
        let model = lookup_trimmed(lookup, "PAPERSUM_OPENAI_COMPAT_MODEL");
        let mut missing = Vec::new();
        if base.is_none() {
            missing.push("PAPERSUM_OPENAI_COMPAT_BASE_URL");
        }
        if model.is_none() {
            missing.push("PAPERSUM_OPENAI_COMPAT_MODEL");
        }
        (model, base, missing)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_chat_completions(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    pub async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: Option<u64>,
        temperature: Option<f64>,
    ) -> Result<String> {
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
            temperature,
            stream: Some(false),
        };

        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Summarization(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Summarization(format!(
                "openai_compat chat.completions HTTP {status}"
            )));
        }

        let parsed: ChatCompletionsResponse = resp
            .json()
            .await
            .map_err(|e| Error::Summarization(e.to_string()))?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Summarizer for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai-compat"
    }

    // Chat models have no minimum-length control; only the upper bound is passed through.
    async fn summarize(&self, text: &str, limits: &SummaryLimits) -> Result<String> {
        self.chat(
            SYSTEM_PROMPT,
            text,
            Some(u64::from(limits.max_length)),
            Some(0.0),
        )
        .await
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
