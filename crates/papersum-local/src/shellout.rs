//! Opportunistic shellouts to well-known local CLIs (currently `pdftotext`).
//!
//! Tools are used only when present on `PATH`; every run is bounded by a timeout and an
//! output cap. Failures are short static codes so callers can surface them as warnings.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub fn which(bin: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let cand = dir.join(bin);
        if cand.is_file() {
            return Some(cand);
        }
        if cfg!(windows) {
            let cand = dir.join(format!("{bin}.exe"));
            if cand.is_file() {
                return Some(cand);
            }
        }
    }
    None
}

pub fn has(bin: &str) -> bool {
    which(bin).is_some()
}

fn join_reader(h: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, &'static str> {
    h.join()
        .map_err(|_| "shellout_read_failed")?
        .map_err(|_| "shellout_read_failed")
}

/// Run a command and capture at most `max_stdout_bytes` of stdout, killing it after `timeout`.
///
/// Stdout is drained on a helper thread so chatty tools cannot stall on a full pipe. Once
/// the cap is reached the child is killed and the truncated output returned.
pub fn run_stdout_bounded(
    mut cmd: Command,
    timeout: Duration,
    max_stdout_bytes: usize,
) -> Result<Vec<u8>, &'static str> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            "shellout_tool_not_found"
        } else {
            "shellout_spawn_failed"
        }
    })?;
    let Some(stdout) = child.stdout.take() else {
        let _ = child.kill();
        return Err("shellout_spawn_failed");
    };
    let cap = max_stdout_bytes as u64;
    let mut reader = Some(std::thread::spawn(move || {
        let mut out = Vec::new();
        stdout.take(cap).read_to_end(&mut out).map(|_| out)
    }));
    let mut drained: Option<Vec<u8>> = None;

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(|_| "shellout_wait_failed")? {
            if !status.success() {
                return Err("shellout_nonzero_exit");
            }
            break;
        }
        if reader.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(h) = reader.take() {
                let out = join_reader(h)?;
                if out.len() >= max_stdout_bytes {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok(out);
                }
                drained = Some(out);
            }
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err("shellout_timeout");
        }
        std::thread::sleep(Duration::from_millis(25));
    }

    match (drained, reader) {
        (Some(out), _) => Ok(out),
        (None, Some(h)) => join_reader(h),
        (None, None) => Ok(Vec::new()),
    }
}

pub fn write_temp_file(
    bytes: &[u8],
    suffix: &str,
) -> Result<tempfile::NamedTempFile, &'static str> {
    let mut tmp = tempfile::Builder::new()
        .prefix("papersum-")
        .suffix(suffix)
        .tempfile()
        .map_err(|_| "shellout_tempfile_failed")?;
    use std::io::Write;
    tmp.write_all(bytes)
        .map_err(|_| "shellout_tempfile_write_failed")?;
    Ok(tmp)
}
