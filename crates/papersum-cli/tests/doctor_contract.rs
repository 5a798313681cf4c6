const SECRET_KEYS: &[&str] = &[
    "PAPERSUM_HF_API_TOKEN",
    "HF_TOKEN",
    "PAPERSUM_OPENAI_COMPAT_API_KEY",
];

fn doctor_cmd() -> std::process::Command {
    let bin = assert_cmd::cargo::cargo_bin!("papersum");
    let mut cmd = std::process::Command::new(bin);
    cmd.arg("doctor");
    for k in [
        "PAPERSUM_ENV_FILE",
        "PAPERSUM_CONFIG",
        "PAPERSUM_BACKEND",
        "PAPERSUM_HF_BASE_URL",
        "PAPERSUM_OPENAI_COMPAT_BASE_URL",
        "PAPERSUM_OPENAI_COMPAT_MODEL",
        "PAPERSUM_OLLAMA_BASE_URL",
        "PAPERSUM_OLLAMA_MODEL",
        "PAPERSUM_PDF_SHELLOUT",
    ]
    .iter()
    .chain(SECRET_KEYS)
    {
        cmd.env_remove(k);
    }
    cmd
}

#[test]
fn papersum_doctor_contract_json_without_secrets() {
    let out = doctor_cmd()
        .env("PAPERSUM_BACKEND", "openai-compat")
        .env("PAPERSUM_OPENAI_COMPAT_BASE_URL", "http://127.0.0.1:9")
        .env("PAPERSUM_OPENAI_COMPAT_MODEL", "test-model")
        .env("PAPERSUM_OPENAI_COMPAT_API_KEY", "sk-doctor-must-not-print")
        .env("HF_TOKEN", "hf_doctor_must_not_print")
        .output()
        .expect("run papersum doctor");

    assert!(out.status.success(), "papersum doctor failed");
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(!s.contains("sk-doctor-must-not-print"));
    assert!(!s.contains("hf_doctor_must_not_print"));

    let v: serde_json::Value = serde_json::from_str(&s).expect("parse doctor json");
    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["kind"].as_str(), Some("doctor"));
    assert_eq!(v["name"].as_str(), Some("papersum"));
    assert!(v.get("elapsed_ms").is_some());
    assert_eq!(v["selected_backend"].as_str(), Some("openai-compat"));
    assert_eq!(v["selected_backend_ready"].as_bool(), Some(true));
    assert!(v["pdf"]["pdftotext"].is_boolean());
    assert_eq!(v["pdf"]["shellout"].as_str(), Some("auto"));
    assert_eq!(v["config"]["ok"].as_bool(), Some(true));

    let backends = v["backends"].as_array().expect("backends array");
    assert_eq!(backends.len(), 3);
    let hf = backends
        .iter()
        .find(|b| b["backend"].as_str() == Some("huggingface"))
        .expect("huggingface entry");
    assert_eq!(hf["configured"].as_bool(), Some(true));
    let ollama = backends
        .iter()
        .find(|b| b["backend"].as_str() == Some("ollama"))
        .expect("ollama entry");
    assert_eq!(ollama["configured"].as_bool(), Some(true));
    assert_eq!(ollama["model"].as_str(), Some("qwen2.5:3b-instruct"));
}

#[test]
fn papersum_doctor_reports_unknown_backend_and_bad_config() {
    let out = doctor_cmd()
        .env("PAPERSUM_BACKEND", "bard")
        .env("PAPERSUM_MAX_CHUNK_UNITS", "0")
        .output()
        .expect("run papersum doctor");

    assert!(out.status.success());
    let v: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("parse doctor json");
    assert_eq!(v["ok"].as_bool(), Some(false));
    assert!(v["selected_backend"].is_null());
    assert!(v["selected_backend_error"]
        .as_str()
        .unwrap_or("")
        .contains("unknown backend"));
    assert_eq!(v["config"]["ok"].as_bool(), Some(false));
}

#[test]
fn papersum_doctor_text_output_contract() {
    let out = doctor_cmd()
        .args(["--output", "text"])
        .output()
        .expect("run papersum doctor --output text");
    assert!(out.status.success());
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.starts_with("papersum "));
    assert!(s.contains("backend huggingface:"));
    assert!(s.contains("pdftotext:"));
}
