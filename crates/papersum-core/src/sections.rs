//! Heuristic, line-based section detection for academic papers.
//!
//! A line is a header when it matches an entry of a [`HeaderVocabulary`]; every other line
//! is appended to the current section. Sections shorter than `min_section_chars` are
//! treated as noise and dropped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Label for text that appears before the first recognized header.
pub const PREAMBLE_TITLE: &str = "Preamble";
/// Label used when no header is recognized at all.
pub const FULL_TEXT_TITLE: &str = "Full Text";

pub const DEFAULT_MIN_SECTION_CHARS: usize = 100;
pub const DEFAULT_MAX_HEADER_WORDS: usize = 6;

/// Recognized section names, longest phrase first where one entry contains another
/// (`contains` matching takes the first hit).
pub const DEFAULT_HEADERS: &[&str] = &[
    "materials and methods",
    "study design",
    "methodology",
    "methods",
    "abstract",
    "background",
    "introduction",
    "objectives",
    "objective",
    "participants",
    "results",
    "findings",
    "discussion",
    "interpretation",
    "conclusions",
    "conclusion",
    "references",
    "acknowledgments",
    "acknowledgements",
    "keywords",
    "funding",
    "conflicts of interest",
    "conflict of interest",
    "competing interests",
];

/// Non-content sections left out of the summarization pass.
pub const DEFAULT_EXCLUDED_TITLES: &[&str] = &[
    "references",
    "acknowledgments",
    "acknowledgements",
    "funding",
    "keywords",
    "conflict of interest",
    "conflicts of interest",
    "competing interests",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMatch {
    /// Normalized line equals an entry.
    #[default]
    Exact,
    /// Short line (at most `max_header_words` words) contains an entry as a whole-word phrase.
    Contains,
}

impl std::str::FromStr for HeaderMatch {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            other => Err(crate::Error::Config(format!(
                "unknown header match {other:?} (allowed: exact, contains)"
            ))),
        }
    }
}

/// What to do when a header is seen a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateHeaderPolicy {
    /// Keep accumulating into the existing section.
    #[default]
    Append,
    /// Discard what was accumulated so far and start over (section keeps its position).
    Restart,
}

impl std::str::FromStr for DuplicateHeaderPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "restart" => Ok(Self::Restart),
            other => Err(crate::Error::Config(format!(
                "unknown duplicate header policy {other:?} (allowed: append, restart)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderVocabulary {
    #[serde(deserialize_with = "deserialize_entries")]
    pub entries: Vec<String>,
    pub match_mode: HeaderMatch,
    pub max_header_words: usize,
}

impl Default for HeaderVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_HEADERS.iter().copied())
    }
}

fn numbering_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "1 ", "2.3 ", "4. ", "IV. ", "A. "
    RE.get_or_init(|| {
        Regex::new(r"^(?:\d+(?:\.\d+)*\.?|[ivxlc]+\.|[a-h]\.)\s+")
            .unwrap_or_else(|e| panic!("numbering pattern: {e}"))
    })
}

fn words_of(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_entries<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|e| {
            e.as_ref()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .filter(|e| !e.is_empty())
        .collect()
}

/// Config files may spell headers as they appear in papers ("Methods"); store them folded.
fn deserialize_entries<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(normalize_entries(raw))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl HeaderVocabulary {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: normalize_entries(entries),
            match_mode: HeaderMatch::default(),
            max_header_words: DEFAULT_MAX_HEADER_WORDS,
        }
    }

    pub fn with_match_mode(mut self, match_mode: HeaderMatch) -> Self {
        self.match_mode = match_mode;
        self
    }

    /// Trim, case-fold, and strip section numbering and trailing `:`/`.`.
    pub fn normalize_line(line: &str) -> String {
        let lower = line.trim().to_lowercase();
        let stripped = numbering_re().replace(&lower, "");
        stripped
            .trim_end_matches(|c: char| c == ':' || c == '.' || c.is_whitespace())
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns the section label for `line` if it is a recognized header.
    pub fn classify(&self, line: &str) -> Option<String> {
        let norm = Self::normalize_line(line);
        if norm.is_empty() {
            return None;
        }
        let hit = match self.match_mode {
            HeaderMatch::Exact => self.entries.iter().find(|e| **e == norm),
            HeaderMatch::Contains => {
                let line_words = words_of(&norm);
                if line_words.split(' ').count() > self.max_header_words {
                    return None;
                }
                let padded = format!(" {line_words} ");
                self.entries
                    .iter()
                    .find(|e| padded.contains(&format!(" {} ", words_of(e))))
            }
        };
        hit.map(|e| capitalize(e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub body: String,
}

impl Section {
    pub fn char_count(&self) -> usize {
        self.body.chars().count()
    }
}

/// Ordered title -> body mapping; insertion order is order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSections {
    sections: Vec<Section>,
}

impl DocumentSections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.sections.iter()
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.body.as_str())
    }

    pub fn titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    /// Appends `body` to an existing section of the same title, or adds a new one.
    pub fn push(&mut self, title: impl Into<String>, body: impl Into<String>) {
        let title = title.into();
        let body = body.into();
        if let Some(s) = self.sections.iter_mut().find(|s| s.title == title) {
            if !s.body.is_empty() && !body.is_empty() {
                s.body.push('\n');
            }
            s.body.push_str(&body);
            return;
        }
        self.sections.push(Section { title, body });
    }

    /// Removes sections whose title (case-insensitive) is on `denylist`.
    ///
    /// Returns the removed titles in document order.
    pub fn exclude(&mut self, denylist: &[String]) -> Vec<String> {
        let deny: Vec<String> = denylist.iter().map(|d| d.trim().to_lowercase()).collect();
        let mut removed = Vec::new();
        self.sections.retain(|s| {
            let hit = deny.contains(&s.title.to_lowercase());
            if hit {
                removed.push(s.title.clone());
            }
            !hit
        });
        removed
    }

    pub fn into_vec(self) -> Vec<Section> {
        self.sections
    }
}

impl<'a> IntoIterator for &'a DocumentSections {
    type Item = &'a Section;
    type IntoIter = std::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Splitter {
    pub vocabulary: HeaderVocabulary,
    pub duplicate_headers: DuplicateHeaderPolicy,
    pub min_section_chars: usize,
}

impl Default for Splitter {
    fn default() -> Self {
        Self {
            vocabulary: HeaderVocabulary::default(),
            duplicate_headers: DuplicateHeaderPolicy::default(),
            min_section_chars: DEFAULT_MIN_SECTION_CHARS,
        }
    }
}

impl Splitter {
    /// Partition cleaned text into titled sections. Never fails.
    ///
    /// - No recognized header: one [`FULL_TEXT_TITLE`] section with all non-empty lines.
    /// - Sections whose body is shorter than `min_section_chars` are dropped.
    /// - If that drops everything, a lone detected section is kept as is; otherwise the
    ///   whole text becomes one [`FULL_TEXT_TITLE`] section.
    /// - Empty text yields no sections.
    pub fn split(&self, text: &str) -> DocumentSections {
        let mut raw: Vec<(String, Vec<&str>)> = Vec::new();
        let mut current: Option<usize> = None;
        let mut saw_header = false;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(label) = self.vocabulary.classify(line) {
                saw_header = true;
                let idx = match raw.iter().position(|(t, _)| *t == label) {
                    Some(i) => {
                        if self.duplicate_headers == DuplicateHeaderPolicy::Restart {
                            raw[i].1.clear();
                        }
                        i
                    }
                    None => {
                        raw.push((label, Vec::new()));
                        raw.len() - 1
                    }
                };
                current = Some(idx);
                continue;
            }
            let idx = match current {
                Some(i) => i,
                None => {
                    raw.push((PREAMBLE_TITLE.to_string(), Vec::new()));
                    raw.len() - 1
                }
            };
            current = Some(idx);
            raw[idx].1.push(line);
        }

        if !saw_header {
            if let Some((title, _)) = raw.first_mut() {
                *title = FULL_TEXT_TITLE.to_string();
            }
        }

        let all: Vec<Section> = raw
            .into_iter()
            .map(|(title, lines)| Section {
                title,
                body: lines.join("\n"),
            })
            .collect();

        let kept: Vec<Section> = all
            .iter()
            .filter(|s| s.char_count() >= self.min_section_chars)
            .cloned()
            .collect();

        let sections = if !kept.is_empty() {
            kept
        } else if all.len() == 1 {
            all
        } else if all.is_empty() {
            Vec::new()
        } else {
            vec![Section {
                title: FULL_TEXT_TITLE.to_string(),
                body: text.trim().to_string(),
            }]
        };

        tracing::debug!(
            sections = sections.len(),
            headers = saw_header,
            "split document into sections"
        );
        DocumentSections { sections }
    }
}

/// [`Splitter::split`] with the default vocabulary and policies.
pub fn split(text: &str) -> DocumentSections {
    Splitter::default().split(text)
}
