use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use papersum_core::{
    clean, ChunkUnit, DuplicateHeaderPolicy, HeaderMatch, Pipeline, PipelineConfig,
    RenderFormat, SummaryOutcome,
};
use papersum_local::{ExtractedText, Fetcher, PdfShellout, PdfSource, SummarizerCell};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "papersum")]
#[command(about = "Summarize research papers section by section", long_about = None)]
struct Cli {
    /// Log progress and backend calls at info level (stderr).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract, section, and summarize a paper.
    Summarize(SummarizeCmd),
    /// Print the extracted text of a paper (bounded preview).
    Extract(ExtractCmd),
    /// Show detected sections as JSON (title, chars, excluded).
    Sections(SectionsCmd),
    /// Diagnose configuration (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// PDF or text file, http(s) URL to a PDF, or `-` for plain text on stdin.
    #[arg(default_value = "-")]
    source: String,
    /// Maximum download size for URL sources (bytes).
    #[arg(long, default_value_t = papersum_local::DEFAULT_MAX_BYTES)]
    max_bytes: u64,
}

#[derive(clap::Args, Debug)]
struct PipelineArgs {
    /// JSON PipelineConfig file (overrides defaults; env and flags override it).
    #[arg(long, env = "PAPERSUM_CONFIG")]
    config: Option<PathBuf>,
    /// Header matching: exact|contains
    #[arg(long)]
    header_match: Option<String>,
    /// Repeated header handling: append|restart
    #[arg(long)]
    duplicate_headers: Option<String>,
    /// Chunk size unit: words|chars
    #[arg(long)]
    chunk_unit: Option<String>,
    #[arg(long)]
    max_chunk_units: Option<usize>,
    #[arg(long)]
    max_length: Option<u32>,
    #[arg(long)]
    min_length: Option<u32>,
    /// Also summarize references, funding, acknowledgements, ...
    #[arg(long)]
    keep_non_content: bool,
    /// Keep repeated sentences across a section's chunk summaries.
    #[arg(long)]
    no_dedup: bool,
    /// Prepend an overview condensed from all section summaries.
    #[arg(long)]
    overview: bool,
}

impl PipelineArgs {
    fn resolve(&self) -> Result<PipelineConfig> {
        let mut cfg = papersum_local::config_from_env(self.config.as_deref())?;
        if let Some(v) = &self.header_match {
            cfg.vocabulary.match_mode = v.parse::<HeaderMatch>()?;
        }
        if let Some(v) = &self.duplicate_headers {
            cfg.duplicate_headers = v.parse::<DuplicateHeaderPolicy>()?;
        }
        if let Some(v) = &self.chunk_unit {
            cfg.chunk_unit = v.parse::<ChunkUnit>()?;
        }
        if let Some(v) = self.max_chunk_units {
            cfg.max_chunk_units = v;
        }
        if let Some(v) = self.max_length {
            cfg.limits.max_length = v;
        }
        if let Some(v) = self.min_length {
            cfg.limits.min_length = v;
        }
        if self.keep_non_content {
            cfg.exclude_non_content = false;
        }
        if self.no_dedup {
            cfg.dedup_sentences = false;
        }
        if self.overview {
            cfg.overview = true;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(clap::Args, Debug)]
struct SummarizeCmd {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    pipeline: PipelineArgs,
    /// Output format: markdown|text|json
    #[arg(long = "format", alias = "output", default_value = "markdown")]
    format: String,
    /// Print `progress: done/total` to stderr after each section.
    #[arg(long)]
    progress: bool,
}

#[derive(clap::Args, Debug)]
struct ExtractCmd {
    #[command(flatten)]
    source: SourceArgs,
    /// Preview length in characters.
    #[arg(long, default_value_t = 2000)]
    max_chars: usize,
    /// Output format: text|json
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct SectionsCmd {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

enum SummaryFormat {
    Rendered(RenderFormat),
    Json,
}

fn parse_summary_format(s: &str) -> Result<SummaryFormat> {
    if s.trim().eq_ignore_ascii_case("json") {
        return Ok(SummaryFormat::Json);
    }
    Ok(SummaryFormat::Rendered(s.parse::<RenderFormat>()?))
}

/// Optional env-file loader (`PAPERSUM_ENV_FILE`): `KEY=VALUE` lines, `#` comments.
/// Never overrides variables already set; values are never logged.
fn load_env_file() {
    let Ok(p) = std::env::var("PAPERSUM_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim().trim_matches('"');
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::prelude::*;
    let filter = tracing_subscriber::EnvFilter::try_from_env("PAPERSUM_LOG").unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose { "info" } else { "warn" })
    });
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn source_of(raw: &str) -> Option<PdfSource> {
    let s = raw.trim();
    if s == "-" {
        return None;
    }
    let lower = s.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(PdfSource::Url(s.to_string()))
    } else {
        Some(PdfSource::Path(PathBuf::from(s)))
    }
}

async fn load_text(args: &SourceArgs) -> Result<ExtractedText> {
    let source = match source_of(&args.source) {
        Some(source) => source,
        None => {
            use tokio::io::AsyncReadExt;
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("read stdin")?;
            if !papersum_local::bytes_look_like_pdf(&buf) {
                let text = String::from_utf8(buf)
                    .map_err(|_| anyhow::anyhow!("stdin is neither a PDF nor UTF-8 text"))?;
                return Ok(ExtractedText {
                    engine: "text",
                    text,
                    warnings: Vec::new(),
                });
            }
            PdfSource::Bytes(buf)
        }
    };
    let lookup = |k: &str| std::env::var(k).ok();
    let fetcher = Fetcher::new(
        papersum_local::http_client()?,
        papersum_local::timeout_from_lookup(&lookup),
    )
    .with_max_bytes(args.max_bytes);
    let out = papersum_local::load_source(&source, &fetcher, PdfShellout::from_env()).await?;
    for w in &out.warnings {
        tracing::warn!(warning = *w, engine = out.engine, "extraction warning");
    }
    Ok(out)
}

async fn summarize(args: SummarizeCmd) -> Result<()> {
    let format = parse_summary_format(&args.format)?;
    let cfg = args.pipeline.resolve()?;
    let extracted = load_text(&args.source).await?;

    let outcome = if clean(&extracted.text).is_empty() {
        SummaryOutcome::NothingToSummarize
    } else {
        let cell = SummarizerCell::new();
        let summarizer = cell
            .get_or_init_from_env()
            .await
            .context("configure summarization backend (see `papersum doctor`)")?;
        let pipeline = Pipeline::new(summarizer, cfg)?;
        let show = args.progress;
        pipeline
            .run(&extracted.text, &mut |p| {
                if show {
                    eprintln!("progress: {}/{}", p.done, p.total);
                }
            })
            .await
    };

    if let Some(fs) = outcome.final_summary() {
        let failed = fs.failed_chunks();
        if failed > 0 {
            tracing::warn!(failed, "some chunks could not be summarized");
        }
    }
    match format {
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        SummaryFormat::Rendered(f) => println!("{}", outcome.render(f)),
    }
    Ok(())
}

async fn extract(args: ExtractCmd) -> Result<()> {
    let extracted = load_text(&args.source).await?;
    let preview = extracted.preview(args.max_chars);
    match args.output.to_ascii_lowercase().as_str() {
        "json" => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "extract",
                "engine": extracted.engine,
                "chars": extracted.text.chars().count(),
                "truncated": preview.len() < extracted.text.len(),
                "warnings": extracted.warnings,
                "text": preview,
            });
            println!("{v}");
        }
        _ => println!("{preview}"),
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct SectionRow<'a> {
    title: &'a str,
    chars: usize,
    excluded: bool,
}

async fn sections(args: SectionsCmd) -> Result<()> {
    let cfg = args.pipeline.resolve()?;
    let extracted = load_text(&args.source).await?;
    let doc = cfg.splitter().split(&clean(&extracted.text));
    let rows: Vec<SectionRow<'_>> = doc
        .iter()
        .map(|s| SectionRow {
            title: &s.title,
            chars: s.char_count(),
            excluded: cfg.is_excluded(&s.title),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn doctor(args: DoctorCmd) -> Result<()> {
    let t0 = std::time::Instant::now();
    let lookup = |k: &str| std::env::var(k).ok();
    let backends = papersum_local::backend_statuses(&lookup);
    let selected = papersum_local::backend_kind_from_lookup(&lookup);
    let pdftotext = papersum_local::shellout::has("pdftotext");
    let shellout = match PdfShellout::from_env() {
        PdfShellout::Auto => "auto",
        PdfShellout::Off => "off",
    };
    let (config_ok, config_error) = match papersum_local::config_from_env(None)
        .and_then(|c| c.validate().map(|_| c))
    {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };
    let selected_ready = match &selected {
        Ok(kind) => backends.iter().any(|b| b.backend == *kind && b.configured),
        Err(_) => false,
    };

    let v = serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": config_ok && selected.is_ok(),
        "name": "papersum",
        "version": env!("CARGO_PKG_VERSION"),
        "selected_backend": selected.as_ref().ok().map(|k| k.as_str()),
        "selected_backend_error": selected.as_ref().err().map(|e| e.to_string()),
        "selected_backend_ready": selected_ready,
        "backends": backends,
        "pdf": {
            "pdftotext": pdftotext,
            "shellout": shellout,
        },
        "config": {
            "ok": config_ok,
            "error": config_error,
        },
        "elapsed_ms": t0.elapsed().as_millis() as u64,
    });
    match args.output.to_ascii_lowercase().as_str() {
        "text" => {
            println!("papersum {}", env!("CARGO_PKG_VERSION"));
            for b in &backends {
                println!(
                    "backend {}: configured={} selected={}{}",
                    b.backend,
                    b.configured,
                    b.selected,
                    if b.missing.is_empty() {
                        String::new()
                    } else {
                        format!(" missing={}", b.missing.join(","))
                    }
                );
            }
            println!("pdftotext: {pdftotext} (shellout={shellout})");
            match &config_error {
                None => println!("config: ok"),
                Some(e) => println!("config: {e}"),
            }
        }
        _ => println!("{v}"),
    }
    Ok(())
}

fn version(args: VersionCmd) {
    let v = serde_json::json!({
        "schema_version": 1,
        "kind": "version",
        "ok": true,
        "name": "papersum",
        "version": env!("CARGO_PKG_VERSION"),
    });
    match args.output.to_ascii_lowercase().as_str() {
        "text" => println!("papersum {}", env!("CARGO_PKG_VERSION")),
        _ => println!("{v}"),
    }
}

fn main() -> Result<()> {
    // Before any threads exist.
    load_env_file();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")?;
    rt.block_on(async move {
        match cli.command {
            Commands::Summarize(args) => summarize(args).await,
            Commands::Extract(args) => extract(args).await,
            Commands::Sections(args) => sections(args).await,
            Commands::Doctor(args) => doctor(args),
            Commands::Version(args) => {
                version(args);
                Ok(())
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn sources_are_classified() {
        assert_eq!(source_of("-"), None);
        assert_eq!(
            source_of("HTTPS://example.org/a.pdf"),
            Some(PdfSource::Url("HTTPS://example.org/a.pdf".to_string()))
        );
        assert_eq!(
            source_of("paper.pdf"),
            Some(PdfSource::Path(PathBuf::from("paper.pdf")))
        );
    }

    #[test]
    fn summary_format_parses() {
        assert!(matches!(parse_summary_format("JSON"), Ok(SummaryFormat::Json)));
        assert!(matches!(
            parse_summary_format("text"),
            Ok(SummaryFormat::Rendered(RenderFormat::Text))
        ));
        assert!(parse_summary_format("html").is_err());
    }

    #[test]
    fn flags_override_config() {
        let args = PipelineArgs {
            config: None,
            header_match: Some("contains".to_string()),
            duplicate_headers: None,
            chunk_unit: Some("chars".to_string()),
            max_chunk_units: Some(2000),
            max_length: None,
            min_length: None,
            keep_non_content: true,
            no_dedup: true,
            overview: true,
        };
        let cfg = args.resolve().unwrap();
        assert_eq!(cfg.vocabulary.match_mode, HeaderMatch::Contains);
        assert_eq!(cfg.chunk_unit, ChunkUnit::Chars);
        assert_eq!(cfg.max_chunk_units, 2000);
        assert!(!cfg.exclude_non_content);
        assert!(!cfg.dedup_sentences);
        assert!(cfg.overview);
    }
}
