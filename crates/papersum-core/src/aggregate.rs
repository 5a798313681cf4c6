//! Per-section chunk summarization and document assembly.

use crate::chunk::Chunker;
use crate::sections::DocumentSections;
use crate::summarize::{summarize_chunk, ChunkOutcome};
use crate::{Summarizer, SummaryLimits};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const OVERVIEW_TITLE: &str = "Overview";

/// Cooperative progress signal, emitted after each section completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.done as f64 / self.total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionStatus {
    Summarized,
    /// Body too short to produce a single viable chunk.
    Skipped { chars: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub title: String,
    #[serde(flatten)]
    pub status: SectionStatus,
    pub chunks: Vec<ChunkOutcome>,
}

impl SectionSummary {
    pub fn failed_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_failed()).count()
    }

    /// Successful chunk summaries joined with single spaces (markers excluded).
    pub fn summary_text(&self, dedup: bool) -> String {
        let mut dd = SentenceDedup::default();
        let mut parts: Vec<String> = Vec::new();
        for text in self.chunks.iter().filter_map(|c| c.summary_text()) {
            let t = if dedup {
                dd.filter(text)
            } else {
                text.to_string()
            };
            if !t.is_empty() {
                parts.push(t);
            }
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalSummary {
    /// Condensed summary of all section summaries, when requested.
    pub overview: Option<SectionSummary>,
    pub sections: Vec<SectionSummary>,
    /// Titles left out of the summarization pass (references, funding, ...).
    pub excluded: Vec<String>,
    pub dedup_sentences: bool,
}

impl FinalSummary {
    pub fn failed_chunks(&self) -> usize {
        self.overview.iter().map(SectionSummary::failed_chunks).sum::<usize>()
            + self
                .sections
                .iter()
                .map(SectionSummary::failed_chunks)
                .sum::<usize>()
    }
}

#[derive(Debug, Default)]
pub(crate) struct SentenceDedup {
    seen: HashSet<String>,
}

impl SentenceDedup {
    /// Drops sentences already seen (case-insensitive exact match), keeping first occurrence.
    pub(crate) fn filter(&mut self, text: &str) -> String {
        let mut kept: Vec<&str> = Vec::new();
        for s in sentences(text) {
            if self.seen.insert(s.to_lowercase()) {
                kept.push(s);
            }
        }
        kept.join(" ")
    }
}

/// Sentences are delimited by `.`, `!` or `?` followed by whitespace (or end of text).
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = match iter.peek() {
                Some((_, next)) => next.is_whitespace(),
                None => true,
            };
            if at_boundary {
                let end = i + c.len_utf8();
                let s = text[start..end].trim();
                if !s.is_empty() {
                    out.push(s);
                }
                start = end;
            }
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Remove repeated sentences, order-preserving, keeping the first occurrence.
pub fn dedup_sentences(text: &str) -> String {
    SentenceDedup::default().filter(text)
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    pub chunker: Chunker,
    pub limits: SummaryLimits,
    pub dedup_sentences: bool,
    pub overview: bool,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            chunker: Chunker::default(),
            limits: SummaryLimits::default(),
            dedup_sentences: true,
            overview: false,
        }
    }
}

impl Aggregator {
    async fn summarize_body(
        &self,
        summarizer: &dyn Summarizer,
        title: &str,
        body: &str,
    ) -> SectionSummary {
        let chunks = self.chunker.chunk(body);
        if chunks.is_empty() {
            return SectionSummary {
                title: title.to_string(),
                status: SectionStatus::Skipped {
                    chars: body.trim().chars().count(),
                },
                chunks: Vec::new(),
            };
        }
        let mut outcomes = Vec::with_capacity(chunks.len());
        for c in &chunks {
            outcomes.push(
                summarize_chunk(summarizer, c, &self.limits, self.chunker.min_chunk_chars).await,
            );
        }
        SectionSummary {
            title: title.to_string(),
            status: SectionStatus::Summarized,
            chunks: outcomes,
        }
    }

    /// Summarize every section in order, one chunk at a time. Never aborts early: every
    /// section appears in the result, with failures recorded per chunk.
    pub async fn aggregate(
        &self,
        sections: &DocumentSections,
        summarizer: &dyn Summarizer,
        on_progress: &mut (dyn FnMut(Progress) + Send),
    ) -> FinalSummary {
        let total = sections.len();
        let mut out = Vec::with_capacity(total);
        for (i, section) in sections.iter().enumerate() {
            let s = self
                .summarize_body(summarizer, &section.title, &section.body)
                .await;
            tracing::info!(
                section = %s.title,
                chunks = s.chunks.len(),
                failed = s.failed_chunks(),
                done = i + 1,
                total,
                "section summarized"
            );
            out.push(s);
            on_progress(Progress { done: i + 1, total });
        }

        let overview = if self.overview {
            let all = out
                .iter()
                .map(|s| s.summary_text(self.dedup_sentences))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Some(self.summarize_body(summarizer, OVERVIEW_TITLE, &all).await)
        } else {
            None
        };

        FinalSummary {
            overview,
            sections: out,
            excluded: Vec::new(),
            dedup_sentences: self.dedup_sentences,
        }
    }
}

/// [`Aggregator::aggregate`] with default chunking, limits, and no progress reporting.
pub async fn aggregate(sections: &DocumentSections, summarizer: &dyn Summarizer) -> FinalSummary {
    Aggregator::default()
        .aggregate(sections, summarizer, &mut |_| {})
        .await
}
