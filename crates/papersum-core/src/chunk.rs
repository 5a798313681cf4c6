//! Size-bounded, order-preserving chunking of section bodies.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_CHUNK_UNITS: usize = 700;
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkUnit {
    /// Whitespace-delimited words; chunks are re-joined with single spaces.
    #[default]
    Words,
    /// Unicode scalar values; chunks concatenate back to the exact body.
    Chars,
}

impl std::str::FromStr for ChunkUnit {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "words" | "word" => Ok(Self::Words),
            "chars" | "char" | "characters" => Ok(Self::Chars),
            other => Err(crate::Error::Config(format!(
                "unknown chunk unit {other:?} (allowed: words, chars)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    pub unit: ChunkUnit,
    pub max_units: usize,
    pub min_chunk_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            unit: ChunkUnit::default(),
            max_units: DEFAULT_MAX_CHUNK_UNITS,
            min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
        }
    }
}

fn is_degenerate(s: &str, min_chars: usize) -> bool {
    s.trim().chars().count() < min_chars
}

impl Chunker {
    /// Split `body` into pieces of at most `max_units` units.
    ///
    /// - A body shorter than `min_chunk_chars` (after trimming) yields no chunks.
    /// - A trailing piece shorter than `min_chunk_chars` is folded into the previous one
    ///   rather than dropped, so the last chunk may exceed the bound by that fragment.
    /// - Words: `chunks.join(" ")` equals the body with whitespace collapsed.
    /// - Chars: `chunks.concat()` equals the body exactly.
    pub fn chunk(&self, body: &str) -> Vec<String> {
        if is_degenerate(body, self.min_chunk_chars) {
            return Vec::new();
        }
        let max = self.max_units.max(1);
        let (mut pieces, sep) = match self.unit {
            ChunkUnit::Words => {
                let words: Vec<&str> = body.split_whitespace().collect();
                let pieces: Vec<String> = words.chunks(max).map(|w| w.join(" ")).collect();
                (pieces, " ")
            }
            ChunkUnit::Chars => {
                let chars: Vec<char> = body.chars().collect();
                let pieces: Vec<String> = chars.chunks(max).map(|c| c.iter().collect()).collect();
                (pieces, "")
            }
        };

        if pieces.len() > 1
            && pieces
                .last()
                .is_some_and(|p| is_degenerate(p, self.min_chunk_chars))
        {
            if let Some(tail) = pieces.pop() {
                if let Some(prev) = pieces.last_mut() {
                    prev.push_str(sep);
                    prev.push_str(&tail);
                }
            }
        }
        pieces
    }
}

/// Word-based [`Chunker::chunk`] with the default minimum chunk length.
pub fn chunk(body: &str, max_units: usize) -> Vec<String> {
    Chunker {
        max_units,
        ..Chunker::default()
    }
    .chunk(body)
}
