use axum::{http::StatusCode, routing::post, Json, Router};
use std::net::SocketAddr;

const MODEL: &str = "stub/bart";

fn paragraph(sentence: &str) -> String {
    std::iter::repeat(sentence).take(6).collect::<Vec<_>>().join(" ")
}

fn paper() -> String {
    format!(
        "A Randomized Trial of Something\n\
         Abstract\n{}\n\
         1. Methods\n{}\n\
         RESULTS:\n{}\n\
         Downloaded from https://journal.example.org/article on 1 May 2024\n\
         References\n{}\n",
        paragraph("We tested a new drug in adults with hypertension."),
        paragraph("Participants were randomized to drug or placebo for twelve weeks."),
        paragraph("Blood pressure fell more in the drug group than with placebo."),
        paragraph("Smith J. A prior study of blood pressure. J Med. 2020;1:1-10."),
    )
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Hugging Face style stub: "Summary of <first word>." per request.
async fn stub_ok() -> SocketAddr {
    let app = Router::new().route(
        &format!("/models/{MODEL}"),
        post(|Json(body): Json<serde_json::Value>| async move {
            let first = body["inputs"]
                .as_str()
                .and_then(|s| s.split_whitespace().next())
                .unwrap_or("nothing")
                .to_string();
            Json(serde_json::json!([{ "summary_text": format!("Summary of {first}.") }]))
        }),
    );
    serve(app).await
}

async fn stub_failing() -> SocketAddr {
    let app = Router::new().route(
        &format!("/models/{MODEL}"),
        post(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": "Model is loading" })),
            )
        }),
    );
    serve(app).await
}

fn papersum(addr: SocketAddr) -> tokio::process::Command {
    let bin = assert_cmd::cargo::cargo_bin!("papersum");
    let mut cmd = tokio::process::Command::new(bin);
    for k in ["PAPERSUM_ENV_FILE", "PAPERSUM_CONFIG", "PAPERSUM_LOG", "HF_TOKEN"] {
        cmd.env_remove(k);
    }
    cmd.env("PAPERSUM_BACKEND", "huggingface")
        .env("PAPERSUM_HF_BASE_URL", format!("http://{addr}/models"))
        .env("PAPERSUM_HF_MODEL", MODEL)
        .env("PAPERSUM_HF_API_TOKEN", "hf_test")
        .env("PAPERSUM_TIMEOUT_MS", "5000");
    cmd
}

fn write_paper(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let p = dir.path().join("paper.txt");
    std::fs::write(&p, paper()).unwrap();
    p
}

#[tokio::test]
async fn summarize_renders_sections_in_order_and_skips_references() {
    let addr = stub_ok().await;
    let tmp = tempfile::tempdir().unwrap();
    let path = write_paper(&tmp);

    let out = papersum(addr)
        .arg("summarize")
        .arg(&path)
        .arg("--progress")
        .output()
        .await
        .expect("run papersum summarize");

    assert!(
        out.status.success(),
        "summarize failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(
        stdout.trim_end(),
        "**Abstract**\nSummary of We.\n\n\
         **Methods**\nSummary of Participants.\n\n\
         **Results**\nSummary of Blood.\n\n\
         _Not summarized: References_"
    );
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("progress: 1/3"), "{stderr}");
    assert!(stderr.contains("progress: 3/3"), "{stderr}");
}

#[tokio::test]
async fn summarize_json_is_structured() {
    let addr = stub_ok().await;
    let tmp = tempfile::tempdir().unwrap();
    let path = write_paper(&tmp);

    let out = papersum(addr)
        .arg("summarize")
        .arg(&path)
        .args(["--format", "json", "--overview"])
        .output()
        .await
        .expect("run papersum summarize --format json");

    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["result"].as_str(), Some("summarized"));
    let titles: Vec<&str> = v["sections"]
        .as_array()
        .expect("sections")
        .iter()
        .filter_map(|s| s["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Abstract", "Methods", "Results"]);
    assert_eq!(v["sections"][0]["status"].as_str(), Some("summarized"));
    assert_eq!(
        v["sections"][0]["chunks"][0]["text"].as_str(),
        Some("Summary of We.")
    );
    assert_eq!(v["excluded"][0].as_str(), Some("References"));
    assert_eq!(v["overview"]["title"].as_str(), Some("Overview"));
}

#[tokio::test]
async fn summarize_keeps_going_when_every_chunk_fails() {
    let addr = stub_failing().await;
    let tmp = tempfile::tempdir().unwrap();
    let path = write_paper(&tmp);

    let out = papersum(addr)
        .arg("summarize")
        .arg(&path)
        .args(["--max-chunk-units", "20"])
        .output()
        .await
        .expect("run papersum summarize");

    assert!(out.status.success(), "per-chunk failures must not fail the run");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("**Abstract**"));
    assert!(stdout.contains("**Results**"));
    assert!(stdout.contains("[Error summarizing section: huggingface: Model is loading]"));
    assert!(!stdout.contains("Summary of"));
}

#[test]
fn empty_stdin_is_nothing_to_summarize_without_a_backend() {
    assert_cmd::Command::cargo_bin("papersum")
        .unwrap()
        .env_remove("PAPERSUM_ENV_FILE")
        .env_remove("PAPERSUM_CONFIG")
        // Unconfigured backend: must not be constructed for empty input.
        .env("PAPERSUM_BACKEND", "openai-compat")
        .env_remove("PAPERSUM_OPENAI_COMPAT_BASE_URL")
        .args(["summarize", "-"])
        .write_stdin("   \n\t\n")
        .assert()
        .success()
        .stdout(predicates::str::contains(
            "Nothing to summarize: the document contains no extractable text.",
        ));
}

#[test]
fn unconfigured_backend_is_a_clear_error() {
    assert_cmd::Command::cargo_bin("papersum")
        .unwrap()
        .env_remove("PAPERSUM_ENV_FILE")
        .env_remove("PAPERSUM_CONFIG")
        .env("PAPERSUM_BACKEND", "openai-compat")
        .env_remove("PAPERSUM_OPENAI_COMPAT_BASE_URL")
        .args(["summarize", "-"])
        .write_stdin(paper())
        .assert()
        .failure()
        .stderr(predicates::str::contains(
            "PAPERSUM_OPENAI_COMPAT_BASE_URL",
        ));
}

#[test]
fn missing_file_fails_with_extraction_error() {
    assert_cmd::Command::cargo_bin("papersum")
        .unwrap()
        .env_remove("PAPERSUM_ENV_FILE")
        .args(["summarize", "/definitely/not/here.pdf"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("extraction failed"));
}
