use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod chunk;
pub mod clean;
pub mod pipeline;
pub mod render;
pub mod sections;
pub mod summarize;

pub use aggregate::{
    aggregate, dedup_sentences, Aggregator, FinalSummary, Progress, SectionStatus, SectionSummary,
};
pub use chunk::{chunk, ChunkUnit, Chunker};
pub use clean::clean;
pub use pipeline::{generate_summary, Pipeline, PipelineConfig, SummaryOutcome};
pub use render::{RenderFormat, NOTHING_TO_SUMMARIZE};
pub use sections::{
    split, DocumentSections, DuplicateHeaderPolicy, HeaderMatch, HeaderVocabulary, Section,
    Splitter,
};
pub use summarize::{summarize_chunk, ChunkOutcome, SkipReason};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("summarization failed: {0}")]
    Summarization(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("invalid config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Output-length bounds handed to the summarization capability on every call.
///
/// Units are whatever the backend counts in (model tokens for hosted seq2seq models,
/// `max_tokens` for chat backends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLimits {
    pub max_length: u32,
    pub min_length: u32,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            max_length: 130,
            min_length: 30,
        }
    }
}

/// The external summarization capability.
///
/// Implementations must be deterministic (no sampling) and safe to share across requests:
/// the pipeline only ever calls `summarize` through a shared reference.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;
    async fn summarize(&self, text: &str, limits: &SummaryLimits) -> Result<String>;
}

#[async_trait::async_trait]
impl<S: Summarizer + ?Sized> Summarizer for std::sync::Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn summarize(&self, text: &str, limits: &SummaryLimits) -> Result<String> {
        (**self).summarize(text, limits).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Scripted stand-in for a hosted model.
    ///
    /// Successful calls return `"summary of <first word>."`; `fail_when` decides which inputs
    /// produce a `Summarization` error.
    pub struct StubSummarizer {
        pub calls: Mutex<Vec<String>>,
        fail_when: fn(&str) -> bool,
    }

    impl StubSummarizer {
        pub fn ok() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_when: |_| false,
            }
        }

        pub fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_when: |_| true,
            }
        }

        pub fn failing_when(f: fn(&str) -> bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_when: f,
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl Summarizer for StubSummarizer {
        fn name(&self) -> &str {
            "stub"
        }

        async fn summarize(&self, text: &str, _limits: &SummaryLimits) -> Result<String> {
            self.calls.lock().unwrap().push(text.to_string());
            if (self.fail_when)(text) {
                return Err(Error::Summarization("model unavailable".to_string()));
            }
            let first = text.split_whitespace().next().unwrap_or("nothing");
            Ok(format!("summary of {first}."))
        }
    }
}
