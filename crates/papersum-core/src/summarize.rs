use crate::{Error, Summarizer, SummaryLimits};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Chunk text was below the minimum viable length; the model was not called.
    ChunkTooShort { chars: usize },
}

/// Result of summarizing one chunk. Failures are values, not errors: the pipeline keeps
/// going and the presentation step turns them into inline markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkOutcome {
    Summary { text: String },
    Skipped { reason: SkipReason },
    Failed { reason: String },
}

impl ChunkOutcome {
    pub fn summary_text(&self) -> Option<&str> {
        match self {
            Self::Summary { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Summarize one chunk, never propagating a model failure.
///
/// Chunks shorter than `min_chunk_chars` (after trimming) are skipped without a model call.
/// An empty model response counts as a failure.
pub async fn summarize_chunk(
    summarizer: &dyn Summarizer,
    chunk: &str,
    limits: &SummaryLimits,
    min_chunk_chars: usize,
) -> ChunkOutcome {
    let chars = chunk.trim().chars().count();
    if chars < min_chunk_chars {
        tracing::debug!(chars, "skipping degenerate chunk");
        return ChunkOutcome::Skipped {
            reason: SkipReason::ChunkTooShort { chars },
        };
    }

    tracing::debug!(
        backend = summarizer.name(),
        chars,
        max_length = limits.max_length,
        min_length = limits.min_length,
        "summarizing chunk"
    );
    match summarizer.summarize(chunk, limits).await {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                tracing::warn!(backend = summarizer.name(), "model returned empty summary");
                return ChunkOutcome::Failed {
                    reason: "model returned an empty summary".to_string(),
                };
            }
            ChunkOutcome::Summary {
                text: text.to_string(),
            }
        }
        Err(e) => {
            tracing::warn!(backend = summarizer.name(), error = %e, "chunk summarization failed");
            let reason = match e {
                Error::Summarization(msg) => msg,
                other => other.to_string(),
            };
            ChunkOutcome::Failed { reason }
        }
    }
}
