//! Presentation step: turns structured outcomes into the human-readable FinalSummary.
//!
//! This is the only place inline markers are produced.

use crate::aggregate::{FinalSummary, SectionStatus, SectionSummary, SentenceDedup};
use crate::summarize::{ChunkOutcome, SkipReason};
use serde::{Deserialize, Serialize};

pub const NOTHING_TO_SUMMARIZE: &str =
    "Nothing to summarize: the document contains no extractable text.";
pub const SECTION_SKIPPED_MARKER: &str = "[Skipped: section too short to summarize]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderFormat {
    /// `**Title**` line per section.
    #[default]
    Markdown,
    /// `== Title ==` line per section.
    Text,
}

impl std::str::FromStr for RenderFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "text" | "plain" => Ok(Self::Text),
            other => Err(crate::Error::Config(format!(
                "unknown render format {other:?} (allowed: markdown, text)"
            ))),
        }
    }
}

impl ChunkOutcome {
    /// Summary text, or the inline marker standing in for it.
    pub fn to_display_text(&self) -> String {
        match self {
            Self::Summary { text } => text.clone(),
            Self::Skipped {
                reason: SkipReason::ChunkTooShort { chars },
            } => format!("[Skipped: chunk too short ({chars} chars)]"),
            Self::Failed { reason } => format!("[Error summarizing section: {reason}]"),
        }
    }
}

impl SectionSummary {
    /// Chunk summaries joined with single spaces, markers kept in place.
    ///
    /// With `dedup`, repeated sentences across this section's summaries are dropped;
    /// markers are never deduplicated.
    pub fn render_body(&self, dedup: bool) -> String {
        if let SectionStatus::Skipped { .. } = self.status {
            return SECTION_SKIPPED_MARKER.to_string();
        }
        let mut dd = SentenceDedup::default();
        let mut parts: Vec<String> = Vec::with_capacity(self.chunks.len());
        for c in &self.chunks {
            let piece = match c {
                ChunkOutcome::Summary { text } if dedup => dd.filter(text),
                other => other.to_display_text(),
            };
            if !piece.is_empty() {
                parts.push(piece);
            }
        }
        parts.join(" ")
    }
}

fn heading(format: RenderFormat, title: &str) -> String {
    match format {
        RenderFormat::Markdown => format!("**{title}**"),
        RenderFormat::Text => format!("== {title} =="),
    }
}

impl FinalSummary {
    /// Sections in encounter order under their titles, preceded by the overview if any.
    pub fn render(&self, format: RenderFormat) -> String {
        let mut blocks: Vec<String> = Vec::new();
        for s in self.overview.iter().chain(self.sections.iter()) {
            blocks.push(format!(
                "{}\n{}",
                heading(format, &s.title),
                s.render_body(self.dedup_sentences)
            ));
        }
        if !self.excluded.is_empty() {
            let list = self.excluded.join(", ");
            blocks.push(match format {
                RenderFormat::Markdown => format!("_Not summarized: {list}_"),
                RenderFormat::Text => format!("Not summarized: {list}"),
            });
        }
        blocks.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(text: &str) -> ChunkOutcome {
        ChunkOutcome::Summary {
            text: text.to_string(),
        }
    }

    fn failed(reason: &str) -> ChunkOutcome {
        ChunkOutcome::Failed {
            reason: reason.to_string(),
        }
    }

    #[test]
    fn markers_have_fixed_shape() {
        assert_eq!(
            failed("timeout").to_display_text(),
            "[Error summarizing section: timeout]"
        );
        assert_eq!(
            ChunkOutcome::Skipped {
                reason: SkipReason::ChunkTooShort { chars: 2 }
            }
            .to_display_text(),
            "[Skipped: chunk too short (2 chars)]"
        );
    }

    #[test]
    fn identical_error_markers_are_not_deduplicated() {
        let s = SectionSummary {
            title: "Methods".to_string(),
            status: SectionStatus::Summarized,
            chunks: vec![failed("boom"), failed("boom"), failed("boom")],
        };
        let body = s.render_body(true);
        assert_eq!(body.matches("[Error summarizing section: boom]").count(), 3);
    }

    #[test]
    fn render_markdown_orders_overview_then_sections() {
        let fs = FinalSummary {
            overview: Some(SectionSummary {
                title: "Overview".to_string(),
                status: SectionStatus::Summarized,
                chunks: vec![summary("All in all, it works.")],
            }),
            sections: vec![
                SectionSummary {
                    title: "Abstract".to_string(),
                    status: SectionStatus::Skipped { chars: 4 },
                    chunks: vec![],
                },
                SectionSummary {
                    title: "Results".to_string(),
                    status: SectionStatus::Summarized,
                    chunks: vec![summary("It works. It is fast."), summary("It works.")],
                },
            ],
            excluded: vec!["References".to_string()],
            dedup_sentences: true,
        };
        assert_eq!(
            fs.render(RenderFormat::Markdown),
            "**Overview**\nAll in all, it works.\n\n\
             **Abstract**\n[Skipped: section too short to summarize]\n\n\
             **Results**\nIt works. It is fast.\n\n\
             _Not summarized: References_"
        );
        assert!(fs
            .render(RenderFormat::Text)
            .starts_with("== Overview ==\nAll in all, it works."));
    }

    #[test]
    fn render_format_parses() {
        assert_eq!("md".parse::<RenderFormat>().unwrap(), RenderFormat::Markdown);
        assert_eq!("TEXT".parse::<RenderFormat>().unwrap(), RenderFormat::Text);
        assert!("html".parse::<RenderFormat>().is_err());
    }
}
