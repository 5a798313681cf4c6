use papersum_core::{Error, Result, Summarizer};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod extract;
pub mod fetch;
pub mod huggingface;
pub mod ollama;
pub mod openai_compat;
pub mod shellout;

pub use config::{apply_env_overrides, config_from_env, config_from_lookup, load_config_file};
pub use extract::{bytes_look_like_pdf, load_source, ExtractedText, PdfShellout, PdfSource};
pub use fetch::{FetchedBody, Fetcher, DEFAULT_MAX_BYTES};

/// System prompt shared by the chat-style backends.
pub const SYSTEM_PROMPT: &str =
    "Summarize this passage of a research paper in clear, plain English.";

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Environment lookup; `std::env` in production, a map in tests.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn lookup_trimmed(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Per-request timeout for model calls and downloads (`PAPERSUM_TIMEOUT_MS`).
pub fn timeout_from_lookup(lookup: Lookup<'_>) -> Duration {
    let ms = lookup_trimmed(lookup, "PAPERSUM_TIMEOUT_MS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_MS)
        .clamp(100, 600_000);
    Duration::from_millis(ms)
}

pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("papersum/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::Fetch(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BackendKind {
    #[default]
    #[serde(rename = "huggingface")]
    HuggingFace,
    #[serde(rename = "openai-compat")]
    OpenAiCompat,
    #[serde(rename = "ollama")]
    Ollama,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [Self::HuggingFace, Self::OpenAiCompat, Self::Ollama];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HuggingFace => "huggingface",
            Self::OpenAiCompat => "openai-compat",
            Self::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai-compat" | "openai_compat" | "openai" => Ok(Self::OpenAiCompat),
            "ollama" => Ok(Self::Ollama),
            other => Err(Error::Config(format!(
                "unknown backend {other:?} (allowed: huggingface, openai-compat, ollama)"
            ))),
        }
    }
}

/// `PAPERSUM_BACKEND`, defaulting to Hugging Face.
pub fn backend_kind_from_lookup(lookup: Lookup<'_>) -> Result<BackendKind> {
    match lookup_trimmed(lookup, "PAPERSUM_BACKEND") {
        Some(s) => s.parse(),
        None => Ok(BackendKind::default()),
    }
}

pub fn summarizer_for(
    kind: BackendKind,
    client: reqwest::Client,
    lookup: Lookup<'_>,
) -> Result<Arc<dyn Summarizer>> {
    let timeout = timeout_from_lookup(lookup);
    let s: Arc<dyn Summarizer> = match kind {
        BackendKind::HuggingFace => Arc::new(
            huggingface::HuggingFaceClient::from_lookup(client, lookup)?.with_timeout(timeout),
        ),
        BackendKind::OpenAiCompat => Arc::new(
            openai_compat::OpenAiCompatClient::from_lookup(client, lookup)?
                .with_timeout(timeout),
        ),
        BackendKind::Ollama => {
            Arc::new(ollama::OllamaClient::from_lookup(client, lookup)?.with_timeout(timeout))
        }
    };
    tracing::debug!(backend = s.name(), "summarizer constructed");
    Ok(s)
}

/// Build the backend named by `PAPERSUM_BACKEND` from the process environment.
pub fn summarizer_from_env() -> Result<Arc<dyn Summarizer>> {
    let lookup = |k: &str| env(k);
    let kind = backend_kind_from_lookup(&lookup)?;
    summarizer_for(kind, http_client()?, &lookup)
}

/// Construct-once holder for the summarization capability.
///
/// The first caller builds the backend; later callers get the same `Arc`. A failed
/// construction is not cached, so the next call retries.
pub struct SummarizerCell {
    cell: tokio::sync::OnceCell<Arc<dyn Summarizer>>,
}

impl Default for SummarizerCell {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SummarizerCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizerCell")
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}

impl SummarizerCell {
    pub fn new() -> Self {
        Self {
            cell: tokio::sync::OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<Arc<dyn Summarizer>> {
        self.cell.get().cloned()
    }

    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<dyn Summarizer>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Arc<dyn Summarizer>>>,
    {
        self.cell.get_or_try_init(init).await.cloned()
    }

    pub async fn get_or_init_from_env(&self) -> Result<Arc<dyn Summarizer>> {
        self.get_or_try_init(|| async { summarizer_from_env() }).await
    }
}

/// Whether a backend has what it needs in the environment. Never carries secret values.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub backend: BackendKind,
    pub configured: bool,
    pub selected: bool,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub missing: Vec<&'static str>,
}

pub fn backend_statuses(lookup: Lookup<'_>) -> Vec<BackendStatus> {
    let selected = backend_kind_from_lookup(lookup).ok();
    BackendKind::ALL
        .iter()
        .map(|&kind| {
            let (model, base_url, missing) = match kind {
                BackendKind::HuggingFace => huggingface::HuggingFaceClient::describe(lookup),
                BackendKind::OpenAiCompat => {
                    openai_compat::OpenAiCompatClient::describe(lookup)
                }
                BackendKind::Ollama => ollama::OllamaClient::describe(lookup),
            };
            BackendStatus {
                backend: kind,
                configured: missing.is_empty(),
                selected: selected == Some(kind),
                model,
                base_url,
                missing,
            }
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::testing::lookup_from;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed;

    #[async_trait::async_trait]
    impl Summarizer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn summarize(
            &self,
            _text: &str,
            _limits: &papersum_core::SummaryLimits,
        ) -> Result<String> {
            Ok("fixed.".to_string())
        }
    }

    #[test]
    fn backend_kind_parses_aliases() {
        assert_eq!("hf".parse::<BackendKind>().unwrap(), BackendKind::HuggingFace);
        assert_eq!(
            "OpenAI-Compat".parse::<BackendKind>().unwrap(),
            BackendKind::OpenAiCompat
        );
        assert!(matches!(
            "bard".parse::<BackendKind>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn backend_defaults_to_huggingface() {
        let l = lookup_from(&[]);
        assert_eq!(backend_kind_from_lookup(&l).unwrap(), BackendKind::HuggingFace);
        let l = lookup_from(&[("PAPERSUM_BACKEND", " ollama ")]);
        assert_eq!(backend_kind_from_lookup(&l).unwrap(), BackendKind::Ollama);
    }

    #[test]
    fn timeout_is_clamped() {
        let l = lookup_from(&[("PAPERSUM_TIMEOUT_MS", "5")]);
        assert_eq!(timeout_from_lookup(&l), Duration::from_millis(100));
        let l = lookup_from(&[("PAPERSUM_TIMEOUT_MS", "nope")]);
        assert_eq!(timeout_from_lookup(&l), Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn openai_compat_without_base_url_is_not_configured() {
        let l = lookup_from(&[("PAPERSUM_OPENAI_COMPAT_MODEL", "gpt-4o-mini")]);
        let err = summarizer_for(BackendKind::OpenAiCompat, reqwest::Client::new(), &l)
            .err()
            .unwrap();
        assert!(matches!(err, Error::NotConfigured(_)));
    }

    #[test]
    fn statuses_never_leak_secrets() {
        let l = lookup_from(&[
            ("PAPERSUM_BACKEND", "openai-compat"),
            ("PAPERSUM_OPENAI_COMPAT_BASE_URL", "http://localhost:9999"),
            ("PAPERSUM_OPENAI_COMPAT_API_KEY", "sk-very-secret"),
            ("PAPERSUM_OPENAI_COMPAT_MODEL", "m"),
            ("PAPERSUM_HF_API_TOKEN", "hf_secret"),
        ]);
        let statuses = backend_statuses(&l);
        assert_eq!(statuses.len(), 3);
        let json = serde_json::to_string(&statuses).unwrap();
        assert!(!json.contains("sk-very-secret"));
        assert!(!json.contains("hf_secret"));
        let oa = statuses
            .iter()
            .find(|s| s.backend == BackendKind::OpenAiCompat)
            .unwrap();
        assert!(oa.configured && oa.selected);
        let ollama = statuses
            .iter()
            .find(|s| s.backend == BackendKind::Ollama)
            .unwrap();
        assert!(!ollama.selected);
    }

    #[tokio::test]
    async fn cell_constructs_once() {
        let cell = SummarizerCell::new();
        let built = AtomicUsize::new(0);
        for _ in 0..3 {
            let s = cell
                .get_or_try_init(|| async {
                    built.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(Fixed) as Arc<dyn Summarizer>)
                })
                .await
                .unwrap();
            assert_eq!(s.name(), "fixed");
        }
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(cell.get().is_some());
    }

    #[tokio::test]
    async fn cell_retries_after_failed_construction() {
        let cell = SummarizerCell::new();
        let err = cell
            .get_or_try_init(|| async { Err(Error::NotConfigured("no backend".to_string())) })
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::NotConfigured(_)));
        assert!(cell.get().is_none());
        let s = cell
            .get_or_try_init(|| async { Ok(Arc::new(Fixed) as Arc<dyn Summarizer>) })
            .await
            .unwrap();
        assert_eq!(s.name(), "fixed");
    }
}
