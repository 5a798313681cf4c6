//! Pipeline entry point: raw text -> clean -> split -> exclude -> chunk/summarize -> aggregate.

use crate::aggregate::{Aggregator, FinalSummary, Progress};
use crate::chunk::{ChunkUnit, Chunker, DEFAULT_MAX_CHUNK_UNITS, DEFAULT_MIN_CHUNK_CHARS};
use crate::clean::clean;
use crate::render::{RenderFormat, NOTHING_TO_SUMMARIZE};
use crate::sections::{
    DocumentSections, DuplicateHeaderPolicy, HeaderVocabulary, Splitter,
    DEFAULT_EXCLUDED_TITLES, DEFAULT_MIN_SECTION_CHARS,
};
use crate::{Error, Result, Summarizer, SummaryLimits};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub vocabulary: HeaderVocabulary,
    pub duplicate_headers: DuplicateHeaderPolicy,
    pub min_section_chars: usize,
    pub exclude_non_content: bool,
    pub excluded_titles: Vec<String>,
    pub chunk_unit: ChunkUnit,
    pub max_chunk_units: usize,
    pub min_chunk_chars: usize,
    pub limits: SummaryLimits,
    pub dedup_sentences: bool,
    pub overview: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vocabulary: HeaderVocabulary::default(),
            duplicate_headers: DuplicateHeaderPolicy::default(),
            min_section_chars: DEFAULT_MIN_SECTION_CHARS,
            exclude_non_content: true,
            excluded_titles: DEFAULT_EXCLUDED_TITLES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            chunk_unit: ChunkUnit::default(),
            max_chunk_units: DEFAULT_MAX_CHUNK_UNITS,
            min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
            limits: SummaryLimits::default(),
            dedup_sentences: true,
            overview: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_units == 0 {
            return Err(Error::Config("max_chunk_units must be > 0".to_string()));
        }
        if self.limits.max_length == 0 {
            return Err(Error::Config("max_length must be > 0".to_string()));
        }
        if self.limits.min_length > self.limits.max_length {
            return Err(Error::Config(format!(
                "min_length ({}) must not exceed max_length ({})",
                self.limits.min_length, self.limits.max_length
            )));
        }
        if self.vocabulary.entries.is_empty() {
            return Err(Error::Config(
                "header vocabulary must have at least one entry".to_string(),
            ));
        }
        Ok(())
    }

    /// True if `title` would be dropped by the non-content denylist.
    pub fn is_excluded(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.exclude_non_content
            && self
                .excluded_titles
                .iter()
                .any(|t| t.trim().to_lowercase() == title)
    }

    pub fn splitter(&self) -> Splitter {
        Splitter {
            vocabulary: self.vocabulary.clone(),
            duplicate_headers: self.duplicate_headers,
            min_section_chars: self.min_section_chars,
        }
    }

    pub fn chunker(&self) -> Chunker {
        Chunker {
            unit: self.chunk_unit,
            max_units: self.max_chunk_units,
            min_chunk_chars: self.min_chunk_chars,
        }
    }

    pub fn aggregator(&self) -> Aggregator {
        Aggregator {
            chunker: self.chunker(),
            limits: self.limits,
            dedup_sentences: self.dedup_sentences,
            overview: self.overview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SummaryOutcome {
    /// Input was empty after cleaning.
    NothingToSummarize,
    Summarized(FinalSummary),
}

impl SummaryOutcome {
    pub fn render(&self, format: RenderFormat) -> String {
        match self {
            Self::NothingToSummarize => NOTHING_TO_SUMMARIZE.to_string(),
            Self::Summarized(fs) => fs.render(format),
        }
    }

    pub fn final_summary(&self) -> Option<&FinalSummary> {
        match self {
            Self::Summarized(fs) => Some(fs),
            Self::NothingToSummarize => None,
        }
    }
}

/// Stateless summarization pipeline over an injected capability.
///
/// The pipeline holds no per-request state; one instance may serve concurrent requests.
/// Constructing the capability once and sharing it is the host's job.
#[derive(Clone)]
pub struct Pipeline {
    summarizer: Arc<dyn Summarizer>,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("summarizer", &self.summarizer.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Pipeline {
    pub fn new(summarizer: Arc<dyn Summarizer>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { summarizer, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Clean, split, and apply the non-content denylist. Returns the sections to
    /// summarize plus the excluded titles.
    pub fn sections(&self, raw_text: &str) -> (DocumentSections, Vec<String>) {
        self.split_cleaned(&clean(raw_text))
    }

    fn split_cleaned(&self, cleaned: &str) -> (DocumentSections, Vec<String>) {
        let mut sections = self.config.splitter().split(cleaned);
        let excluded = if self.config.exclude_non_content {
            sections.exclude(&self.config.excluded_titles)
        } else {
            Vec::new()
        };
        (sections, excluded)
    }

    pub async fn run(
        &self,
        raw_text: &str,
        on_progress: &mut (dyn FnMut(Progress) + Send),
    ) -> SummaryOutcome {
        let cleaned = clean(raw_text);
        if cleaned.is_empty() {
            tracing::info!("nothing to summarize after cleaning");
            return SummaryOutcome::NothingToSummarize;
        }
        let (sections, excluded) = self.split_cleaned(&cleaned);
        tracing::info!(
            sections = sections.len(),
            excluded = excluded.len(),
            backend = self.summarizer.name(),
            "starting summarization"
        );
        let mut fs = self
            .config
            .aggregator()
            .aggregate(&sections, self.summarizer.as_ref(), on_progress)
            .await;
        fs.excluded = excluded;
        SummaryOutcome::Summarized(fs)
    }
}

/// One-shot entry point: summarize `raw_text` and render it as markdown.
///
/// Empty or whitespace-only input renders the "nothing to summarize" message.
pub async fn generate_summary(
    summarizer: Arc<dyn Summarizer>,
    raw_text: &str,
    config: PipelineConfig,
) -> Result<String> {
    let pipeline = Pipeline::new(summarizer, config)?;
    let outcome = pipeline.run(raw_text, &mut |_| {}).await;
    Ok(outcome.render(RenderFormat::Markdown))
}
