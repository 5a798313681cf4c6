//! Bounded HTTP download of remote paper sources.

use futures_util::StreamExt;
use papersum_core::{Error, Result};
use std::time::Duration;

pub const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub final_url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedBody {
    pub fn content_type_is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("application/pdf"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    max_bytes: u64,
    timeout: Duration,
}

/// Only absolute http(s) URLs are fetched.
pub fn parse_http_url(raw: &str) -> Result<url::Url> {
    let u = url::Url::parse(raw.trim()).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
    match u.scheme() {
        "http" | "https" => Ok(u),
        other => Err(Error::InvalidUrl(format!(
            "{raw}: unsupported scheme {other:?}"
        ))),
    }
}

impl Fetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            max_bytes: DEFAULT_MAX_BYTES,
            timeout,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// GET `url`, failing on non-2xx status or a body larger than `max_bytes`.
    pub async fn get(&self, url: &str) -> Result<FetchedBody> {
        let u = parse_http_url(url)?;
        let resp = self
            .client
            .get(u)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        let final_url = resp.url().to_string();
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {status} for {final_url}")));
        }
        if resp.content_length().is_some_and(|n| n > self.max_bytes) {
            return Err(Error::Fetch(format!(
                "response body exceeds {} bytes",
                self.max_bytes
            )));
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let max_bytes = usize::try_from(self.max_bytes).unwrap_or(usize::MAX);
        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Fetch(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > max_bytes {
                return Err(Error::Fetch(format!(
                    "response body exceeds {} bytes",
                    self.max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!(url = %final_url, bytes = bytes.len(), "fetched source");
        Ok(FetchedBody {
            final_url,
            content_type,
            bytes,
        })
    }
}
