//! End-to-end tests driving the real `blink` binary.
//!
//! Each test starts the executable with a scrubbed environment, reads the URL
//! it prints, and talks to the detached server it spawned.

use axum_extra::headers::{HeaderMapExt, LastModified};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use test_support::{POLL_DELAY, POLL_TRIES, http_client, input_file, wait_for_refusal};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;

const BODY: &[u8] = b"hello from the command line\n";

fn blink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_blink"));
    for key in [
        "DEBUG",
        "BLINK_CHILD",
        "BLINK_IDLE_TIMEOUT_SECS",
        "BLINK_SHUTDOWN_GRACE_SECS",
        "BLINK_HOST",
        "BLINK_LAUNCH",
        "BLINK_DETACH",
    ] {
        cmd.env_remove(key);
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd
}

async fn read_url(stdout: &mut BufReader<ChildStdout>) -> String {
    let mut line = String::new();
    timeout(Duration::from_secs(10), stdout.read_line(&mut line))
        .await
        .expect("URL within 10s")
        .expect("read stdout");
    assert!(line.ends_with('\n'), "URL line must be newline-terminated");
    line.trim_end().to_owned()
}

async fn interrupt(child: &mut Child) -> ExitStatus {
    let pid = child.id().and_then(|id| i32::try_from(id).ok()).expect("pid");
    kill(Pid::from_raw(pid), Signal::SIGINT).expect("send SIGINT");
    timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("supervisor should exit")
        .expect("wait")
}

async fn get(url: &str) -> reqwest::Response {
    http_client().get(url).send().await.expect("request")
}

#[tokio::test]
async fn help_prints_usage_only() {
    let out = blink().arg("-h").output().await.expect("run");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim_end(), "usage: blink [file]");
    assert!(!String::from_utf8_lossy(&out.stdout).contains("http://"));
}

#[tokio::test]
async fn missing_file_is_reported_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    let out = blink()
        .arg(dir.path().join("absent.txt"))
        .stdin(Stdio::null())
        .output()
        .await
        .expect("run");
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("error: "), "stderr was {stderr:?}");
    assert_eq!(stderr.lines().count(), 1);
}

#[tokio::test]
async fn debug_mode_shows_the_cause_chain() {
    let dir = tempfile::tempdir().expect("temp dir");
    let out = blink()
        .arg(dir.path().join("absent.txt"))
        .env("DEBUG", "1")
        .stdin(Stdio::null())
        .output()
        .await
        .expect("run");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Caused by"));
}

#[tokio::test]
async fn shares_a_file_until_interrupted() {
    let file = input_file(BODY, ".txt");
    let mut child = blink()
        .arg(file.path())
        .stdin(Stdio::null())
        .spawn()
        .expect("spawn");
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout"));
    let url = read_url(&mut stdout).await;
    assert!(url.starts_with("http://127.0.0.1:"));

    let res = get(&url).await;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let last_modified: SystemTime = res
        .headers()
        .typed_get::<LastModified>()
        .expect("last-modified")
        .into();
    let mtime = file
        .as_file()
        .metadata()
        .expect("metadata")
        .modified()
        .expect("mtime");
    let mtime_secs = mtime.duration_since(UNIX_EPOCH).expect("after epoch").as_secs();
    assert_eq!(last_modified, UNIX_EPOCH + Duration::from_secs(mtime_secs));
    assert_eq!(res.bytes().await.expect("body").as_ref(), BODY);

    assert!(interrupt(&mut child).await.success());
    assert!(wait_for_refusal(&url, POLL_TRIES, POLL_DELAY).await);

    let mut rest = String::new();
    stdout.read_to_string(&mut rest).await.expect("drain stdout");
    assert!(rest.is_empty(), "only one URL line may be printed");
}

#[tokio::test]
async fn shares_piped_input() {
    let mut child = blink().stdin(Stdio::piped()).spawn().expect("spawn");
    let mut stdin = child.stdin.take().expect("stdin");
    stdin.write_all(BODY).await.expect("write stdin");
    drop(stdin);

    let mut stdout = BufReader::new(child.stdout.take().expect("stdout"));
    let url = read_url(&mut stdout).await;
    let res = get(&format!("{url}/any/path")).await;
    assert_eq!(
        res.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(res.bytes().await.expect("body").as_ref(), BODY);

    assert!(interrupt(&mut child).await.success());
    assert!(wait_for_refusal(&url, POLL_TRIES, POLL_DELAY).await);
}

#[tokio::test]
async fn idle_server_ends_the_supervisor() {
    let file = input_file(BODY, ".bin");
    let mut child = blink()
        .arg(file.path())
        .env("BLINK_IDLE_TIMEOUT_SECS", "1")
        .stdin(Stdio::null())
        .spawn()
        .expect("spawn");
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout"));
    let url = read_url(&mut stdout).await;

    let status = timeout(Duration::from_secs(15), child.wait())
        .await
        .expect("supervisor should exit after the idle window")
        .expect("wait");
    assert!(status.success());
    assert!(wait_for_refusal(&url, POLL_TRIES, POLL_DELAY).await);
}

#[tokio::test]
async fn detached_supervisor_leaves_the_server_running() {
    let file = input_file(BODY, ".txt");
    let mut child = blink()
        .arg(file.path())
        .env("BLINK_DETACH", "true")
        .env("BLINK_IDLE_TIMEOUT_SECS", "2")
        .stdin(Stdio::null())
        .spawn()
        .expect("spawn");
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout"));
    let url = read_url(&mut stdout).await;

    let status = timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("detached supervisor should exit")
        .expect("wait");
    assert!(status.success());
    assert_eq!(get(&url).await.bytes().await.expect("body").as_ref(), BODY);
    assert!(wait_for_refusal(&url, POLL_TRIES, POLL_DELAY).await);
}

#[tokio::test]
async fn in_process_launch_serves_without_a_child() {
    let file = input_file(BODY, ".txt");
    let mut child = blink()
        .arg(file.path())
        .env("BLINK_LAUNCH", "in-process")
        .stdin(Stdio::null())
        .spawn()
        .expect("spawn");
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout"));
    let url = read_url(&mut stdout).await;
    assert_eq!(get(&url).await.bytes().await.expect("body").as_ref(), BODY);

    assert!(interrupt(&mut child).await.success());
    assert!(wait_for_refusal(&url, POLL_TRIES, POLL_DELAY).await);
}
