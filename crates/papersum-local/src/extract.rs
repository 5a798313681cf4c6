//! Source acquisition and PDF text extraction.
//!
//! `pdf-extract` (pure Rust, in-memory) is the primary extractor; `pdftotext` is an
//! opportunistic fallback when it fails or finds nothing.

use crate::fetch::Fetcher;
use crate::shellout;
use papersum_core::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const SHELLOUT_MAX_PAGES: usize = 200;
const SHELLOUT_MAX_STDOUT_BYTES: usize = 20 * 1024 * 1024;
const SHELLOUT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    /// Which extractor produced `text` (`pdf-extract`, `pdftotext`, `text`).
    pub engine: &'static str,
    pub text: String,
    pub warnings: Vec<&'static str>,
}

impl ExtractedText {
    /// First `max_chars` characters, for previews.
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((i, _)) => &self.text[..i],
            None => &self.text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PdfShellout {
    #[default]
    Auto,
    Off,
}

impl PdfShellout {
    /// `PAPERSUM_PDF_SHELLOUT`; unknown values behave like `auto`.
    pub fn from_env() -> Self {
        match crate::env("PAPERSUM_PDF_SHELLOUT").as_deref() {
            Some("off") | Some("0") | Some("false") => Self::Off,
            _ => Self::Auto,
        }
    }
}

/// Sniff the `%PDF-` magic header, tolerating leading junk within the first KiB.
pub fn bytes_look_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

fn has_any_text(s: &str) -> bool {
    s.chars().any(|c| !c.is_whitespace())
}

/// Extract text from an in-memory PDF with `pdf-extract`.
///
/// Malformed PDFs can make the parser panic; that is reported as an error string.
pub fn pdf_to_text(bytes: &[u8]) -> std::result::Result<String, String> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    })) {
        Ok(r) => r.map_err(|e| e.to_string()),
        Err(_) => Err("pdf-extract panicked on malformed input".to_string()),
    }
}

fn pdf_to_text_shellout(bytes: &[u8]) -> std::result::Result<String, &'static str> {
    if !shellout::has("pdftotext") {
        return Err("pdf_shellout_tool_not_found");
    }
    let tmp = shellout::write_temp_file(bytes, ".pdf")?;
    let mut cmd = Command::new("pdftotext");
    cmd.args(["-f", "1", "-l"])
        .arg(SHELLOUT_MAX_PAGES.to_string())
        .args(["-nopgbrk", "-enc", "UTF-8"])
        .arg(tmp.path())
        .arg("-");
    let out = shellout::run_stdout_bounded(cmd, SHELLOUT_TIMEOUT, SHELLOUT_MAX_STDOUT_BYTES)?;
    let s = String::from_utf8_lossy(&out).to_string();
    if !has_any_text(&s) {
        return Err("pdf_shellout_empty_output");
    }
    Ok(s)
}

/// Extract text from PDF bytes. The caller has already decided these bytes are a PDF.
///
/// A PDF with no text layer yields empty text plus the `pdf_no_text_layer` warning; only
/// an unparseable PDF (with no working fallback) is an error.
pub fn extract_pdf(bytes: &[u8], shellout_mode: PdfShellout) -> Result<ExtractedText> {
    let mut warnings = Vec::new();
    let primary = pdf_to_text(bytes);
    let primary_err = match primary {
        Ok(text) if has_any_text(&text) => {
            return Ok(ExtractedText {
                engine: "pdf-extract",
                text,
                warnings,
            });
        }
        Ok(_) => {
            warnings.push("pdf_extract_empty");
            None
        }
        Err(e) => {
            warnings.push("pdf_extract_failed");
            Some(e)
        }
    };

    if shellout_mode == PdfShellout::Auto {
        match pdf_to_text_shellout(bytes) {
            Ok(text) => {
                tracing::warn!(
                    reason = primary_err.as_deref().unwrap_or("empty text"),
                    "pdf-extract fell back to pdftotext"
                );
                warnings.push("pdf_shellout_used");
                return Ok(ExtractedText {
                    engine: "pdftotext",
                    text,
                    warnings,
                });
            }
            Err(code) => warnings.push(code),
        }
    }

    match primary_err {
        Some(e) => Err(Error::Extraction(e)),
        None => {
            warnings.push("pdf_no_text_layer");
            Ok(ExtractedText {
                engine: "pdf-extract",
                text: String::new(),
                warnings,
            })
        }
    }
}

fn plain_text(text: String) -> ExtractedText {
    ExtractedText {
        engine: "text",
        text,
        warnings: Vec::new(),
    }
}

fn is_plain_text_path(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("txt") | Some("md") | Some("text")
    )
}

async fn extract_pdf_blocking(bytes: Vec<u8>, mode: PdfShellout) -> Result<ExtractedText> {
    tokio::task::spawn_blocking(move || extract_pdf(&bytes, mode))
        .await
        .map_err(|e| Error::Extraction(format!("extraction task failed: {e}")))?
}

/// Load a source and turn it into text.
///
/// Text files (`.txt`, `.md`) are read as is. Everything else must be a PDF: bytes that do
/// not sniff as one (and, for URLs, are not served as `application/pdf`) are rejected.
pub async fn load_source(
    source: &PdfSource,
    fetcher: &Fetcher,
    mode: PdfShellout,
) -> Result<ExtractedText> {
    match source {
        PdfSource::Bytes(bytes) => {
            if !bytes_look_like_pdf(bytes) {
                return Err(Error::Extraction("input is not a PDF".to_string()));
            }
            extract_pdf_blocking(bytes.clone(), mode).await
        }
        PdfSource::Path(path) => {
            let bytes = tokio::task::spawn_blocking({
                let path = path.clone();
                move || std::fs::read(&path)
            })
            .await
            .map_err(|e| Error::Extraction(format!("read task failed: {e}")))?
            .map_err(|e| Error::Extraction(format!("{}: {e}", path.display())))?;
            if is_plain_text_path(path) {
                return Ok(plain_text(String::from_utf8_lossy(&bytes).into_owned()));
            }
            if !bytes_look_like_pdf(&bytes) {
                return Err(Error::Extraction(format!(
                    "{} is not a PDF",
                    path.display()
                )));
            }
            extract_pdf_blocking(bytes, mode).await
        }
        PdfSource::Url(url) => {
            let warnings = url_warnings(url);
            let body = fetcher.get(url).await?;
            if !bytes_look_like_pdf(&body.bytes) && !body.content_type_is_pdf() {
                return Err(Error::Extraction(format!(
                    "{} did not return a PDF",
                    body.final_url
                )));
            }
            let mut out = extract_pdf_blocking(body.bytes, mode).await?;
            let mut all = warnings;
            all.append(&mut out.warnings);
            out.warnings = all;
            Ok(out)
        }
    }
}

/// Warnings knowable from the URL alone.
pub fn url_warnings(url: &str) -> Vec<&'static str> {
    let path_is_pdf = url::Url::parse(url.trim())
        .map(|u| u.path().to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or(false);
    if path_is_pdf {
        Vec::new()
    } else {
        vec!["url_not_pdf_suffix"]
    }
}
