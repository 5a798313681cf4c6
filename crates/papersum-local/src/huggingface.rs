//! Hugging Face Inference API client for seq2seq summarization models.

use crate::{lookup_trimmed, Lookup, DEFAULT_TIMEOUT_MS};
use async_trait::async_trait;
use papersum_core::{Error, Result, Summarizer, SummaryLimits};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/hf-inference/models";
pub const DEFAULT_MODEL: &str = "facebook/bart-large-cnn";

#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    model: String,
    timeout: Duration,
}

impl HuggingFaceClient {
    pub fn from_lookup(client: reqwest::Client, lookup: Lookup<'_>) -> Result<Self> {
        let base_url = lookup_trimmed(lookup, "PAPERSUM_HF_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("PAPERSUM_HF_BASE_URL: {e}")))?;
        let api_token = lookup_trimmed(lookup, "PAPERSUM_HF_API_TOKEN")
            .or_else(|| lookup_trimmed(lookup, "HF_TOKEN"));
        let model = lookup_trimmed(lookup, "PAPERSUM_HF_MODEL")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            client,
            base_url,
            api_token,
            model,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// (model, base_url, missing settings) for diagnostics.
    ///
    /// The hosted API needs a token; a custom base URL (self-hosted TGI / endpoint) may not.
    pub(crate) fn describe(
        lookup: Lookup<'_>,
    ) -> (Option<String>, Option<String>, Vec<&'static str>) {
        let custom = lookup_trimmed(lookup, "PAPERSUM_HF_BASE_URL");
        let has_token = lookup_trimmed(lookup, "PAPERSUM_HF_API_TOKEN").is_some()
            || lookup_trimmed(lookup, "HF_TOKEN").is_some();
        let missing = if custom.is_none() && !has_token {
            vec!["PAPERSUM_HF_API_TOKEN"]
        } else {
            Vec::new()
        };
        let model = lookup_trimmed(lookup, "PAPERSUM_HF_MODEL")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base = custom.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        (Some(model), Some(base), missing)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.model)
    }

    pub async fn summarize_text(&self, text: &str, limits: &SummaryLimits) -> Result<String> {
        let req = InferenceRequest {
            inputs: text,
            parameters: Parameters {
                max_length: limits.max_length,
                min_length: limits.min_length,
                do_sample: false,
            },
            options: Options {
                wait_for_model: true,
            },
        };

        let mut rb = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(t) = &self.api_token {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {t}"));
        }

        let resp = rb
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Summarization(e.to_string()))?;
        let status = resp.status();
        let body: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(_) if !status.is_success() => {
                return Err(Error::Summarization(format!("huggingface HTTP {status}")))
            }
            Err(e) => return Err(Error::Summarization(e.to_string())),
        };
        if let Some(msg) = body.get("error").and_then(|v| v.as_str()) {
            return Err(Error::Summarization(format!("huggingface: {msg}")));
        }
        if !status.is_success() {
            return Err(Error::Summarization(format!("huggingface HTTP {status}")));
        }
        parse_summary(&body).ok_or_else(|| {
            Error::Summarization("huggingface response had no summary_text".to_string())
        })
    }
}

/// Accepts `[{"summary_text": ..}]`, a bare object, or `generated_text` from text2text models.
fn parse_summary(body: &serde_json::Value) -> Option<String> {
    let item = match body {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };
    item.get("summary_text")
        .or_else(|| item.get("generated_text"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[async_trait]
impl Summarizer for HuggingFaceClient {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn summarize(&self, text: &str, limits: &SummaryLimits) -> Result<String> {
        self.summarize_text(text, limits).await
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Parameters {
    max_length: u32,
    min_length: u32,
    do_sample: bool,
}

#[derive(Debug, Serialize)]
struct Options {
    wait_for_model: bool,
}
