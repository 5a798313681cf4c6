//! Pipeline configuration from a JSON file and `PAPERSUM_*` environment variables.
//!
//! Precedence, lowest first: defaults, config file, environment. CLI flags are applied
//! on top by the binary.

use crate::{lookup_trimmed, Lookup};
use papersum_core::{Error, PipelineConfig, Result};
use std::path::{Path, PathBuf};

/// Read a JSON `PipelineConfig`; missing fields take their defaults.
pub fn load_config_file(path: &Path) -> Result<PipelineConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
}

fn parse_bool(key: &str, v: &str) -> Result<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{key}: expected a boolean, got {v:?}"))),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, v: &str) -> Result<T> {
    v.parse::<T>()
        .map_err(|_| Error::Config(format!("{key}: expected a number, got {v:?}")))
}

fn parse_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Apply `PAPERSUM_*` overrides to `cfg`. Malformed values are errors, not silently ignored.
pub fn apply_env_overrides(cfg: &mut PipelineConfig, lookup: Lookup<'_>) -> Result<()> {
    let get = |k: &str| lookup_trimmed(lookup, k);

    if let Some(v) = get("PAPERSUM_HEADERS") {
        cfg.vocabulary.entries = parse_list(&v);
    }
    if let Some(v) = get("PAPERSUM_HEADER_MATCH") {
        cfg.vocabulary.match_mode = v.parse()?;
    }
    if let Some(v) = get("PAPERSUM_MAX_HEADER_WORDS") {
        cfg.vocabulary.max_header_words = parse_num("PAPERSUM_MAX_HEADER_WORDS", &v)?;
    }
    if let Some(v) = get("PAPERSUM_DUPLICATE_HEADERS") {
        cfg.duplicate_headers = v.parse()?;
    }
    if let Some(v) = get("PAPERSUM_MIN_SECTION_CHARS") {
        cfg.min_section_chars = parse_num("PAPERSUM_MIN_SECTION_CHARS", &v)?;
    }
    if let Some(v) = get("PAPERSUM_EXCLUDE_NON_CONTENT") {
        cfg.exclude_non_content = parse_bool("PAPERSUM_EXCLUDE_NON_CONTENT", &v)?;
    }
    if let Some(v) = get("PAPERSUM_EXCLUDED_TITLES") {
        cfg.excluded_titles = parse_list(&v);
    }
    if let Some(v) = get("PAPERSUM_CHUNK_UNIT") {
        cfg.chunk_unit = v.parse()?;
    }
    if let Some(v) = get("PAPERSUM_MAX_CHUNK_UNITS") {
        cfg.max_chunk_units = parse_num("PAPERSUM_MAX_CHUNK_UNITS", &v)?;
    }
    if let Some(v) = get("PAPERSUM_MIN_CHUNK_CHARS") {
        cfg.min_chunk_chars = parse_num("PAPERSUM_MIN_CHUNK_CHARS", &v)?;
    }
    if let Some(v) = get("PAPERSUM_MAX_LENGTH") {
        cfg.limits.max_length = parse_num("PAPERSUM_MAX_LENGTH", &v)?;
    }
    if let Some(v) = get("PAPERSUM_MIN_LENGTH") {
        cfg.limits.min_length = parse_num("PAPERSUM_MIN_LENGTH", &v)?;
    }
    if let Some(v) = get("PAPERSUM_DEDUP_SENTENCES") {
        cfg.dedup_sentences = parse_bool("PAPERSUM_DEDUP_SENTENCES", &v)?;
    }
    if let Some(v) = get("PAPERSUM_OVERVIEW") {
        cfg.overview = parse_bool("PAPERSUM_OVERVIEW", &v)?;
    }
    Ok(())
}

/// Defaults, then the config file (`explicit` or `PAPERSUM_CONFIG`), then env overrides.
///
/// The result is not validated here; CLI flags may still change it.
pub fn config_from_lookup(
    explicit: Option<&Path>,
    lookup: Lookup<'_>,
) -> Result<PipelineConfig> {
    let path: Option<PathBuf> = explicit
        .map(Path::to_path_buf)
        .or_else(|| lookup_trimmed(lookup, "PAPERSUM_CONFIG").map(PathBuf::from));
    let mut cfg = match path {
        Some(p) => {
            tracing::debug!(path = %p.display(), "loading config file");
            load_config_file(&p)?
        }
        None => PipelineConfig::default(),
    };
    apply_env_overrides(&mut cfg, lookup)?;
    Ok(cfg)
}

pub fn config_from_env(explicit: Option<&Path>) -> Result<PipelineConfig> {
    config_from_lookup(explicit, &|k: &str| crate::env(k))
}
