use std::io::Write as _;
use std::process::{Command, Output};

use anyhow::Context as _;
use slapper_testserver::TestServer;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn ensure_code(out: &Output, expected: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out.status) == expected,
        "expected exit code {expected}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

fn targets_file(contents: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new().context("create targets file")?;
    file.write_all(contents.as_bytes())
        .context("write targets file")?;
    Ok(file)
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_slapper");

    let out = Command::new(exe)
        .arg("run")
        .arg("--targets")
        .arg("./does-not-matter.txt")
        .arg("--timeout")
        .arg("10x")
        .output()
        .context("run slapper binary")?;

    ensure_code(&out, 30)
}

#[test]
fn missing_targets_file_exits_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let missing = dir.path().join("missing.txt");
    let exe = env!("CARGO_BIN_EXE_slapper");

    let out = Command::new(exe)
        .arg("run")
        .arg("--targets")
        .arg(&missing)
        .arg("--output")
        .arg("json")
        .output()
        .context("run slapper binary")?;

    ensure_code(&out, 30)?;
    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(
        stderr.contains("failed to read targets file"),
        "stderr:\n{stderr}"
    );
    Ok(())
}

#[test]
fn bad_base64_body_exits_30_with_line_number() -> anyhow::Result<()> {
    let file = targets_file("POST http://127.0.0.1:1/x\nH A: b\n$ not*base64\n")?;
    let exe = env!("CARGO_BIN_EXE_slapper");

    let out = Command::new(exe)
        .arg("run")
        .arg("--targets")
        .arg(file.path())
        .arg("--base64body")
        .arg("--output")
        .arg("json")
        .output()
        .context("run slapper binary")?;

    ensure_code(&out, 30)?;
    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(stderr.contains("line 3"), "stderr:\n{stderr}");
    Ok(())
}

#[test]
fn empty_targets_file_exits_30() -> anyhow::Result<()> {
    let file = targets_file("\n{}\n\n")?;
    let exe = env!("CARGO_BIN_EXE_slapper");

    let out = Command::new(exe)
        .arg("run")
        .arg("--targets")
        .arg(file.path())
        .arg("--output")
        .arg("json")
        .output()
        .context("run slapper binary")?;

    ensure_code(&out, 30)
}

#[test]
fn inverted_chart_bounds_exit_30() -> anyhow::Result<()> {
    let file = targets_file("GET http://127.0.0.1:1/\n")?;
    let exe = env!("CARGO_BIN_EXE_slapper");

    let out = Command::new(exe)
        .arg("run")
        .arg("--targets")
        .arg(file.path())
        .arg("--minY")
        .arg("200ms")
        .arg("--maxY")
        .arg("100ms")
        .arg("--output")
        .arg("json")
        .output()
        .context("run slapper binary")?;

    ensure_code(&out, 30)
}

#[test]
fn zero_rate_exits_30() -> anyhow::Result<()> {
    let file = targets_file("GET http://127.0.0.1:1/\n")?;
    let exe = env!("CARGO_BIN_EXE_slapper");

    let out = Command::new(exe)
        .arg("run")
        .arg("--targets")
        .arg(file.path())
        .arg("--rate")
        .arg("0")
        .arg("--output")
        .arg("json")
        .output()
        .context("run slapper binary")?;

    ensure_code(&out, 30)
}

#[tokio::test]
async fn failing_requests_still_exit_0() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let file = targets_file(&format!("GET {}\n", server.urls().status(500)))?;
    let path = file.path().to_path_buf();
    let exe = env!("CARGO_BIN_EXE_slapper");

    let out = tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .arg("run")
            .arg("--targets")
            .arg(&path)
            .arg("--duration")
            .arg("500ms")
            .arg("--rate")
            .arg("20")
            .arg("--output")
            .arg("json")
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run slapper binary")?;

    server.shutdown().await;
    ensure_code(&out, 0)
}
