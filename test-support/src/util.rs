//! Helpers for tests that talk to a running endpoint.

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::net::TcpStream;
use tokio::time::sleep;

/// Default number of polling attempts.
pub const POLL_TRIES: u32 = 100;
/// Default pause between polling attempts.
pub const POLL_DELAY: Duration = Duration::from_millis(50);

/// A temporary file holding `bytes`, named with `suffix`.
///
/// # Panics
/// Panics if the file cannot be created or written.
pub fn input_file(bytes: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("blink-")
        .suffix(suffix)
        .tempfile()
        .expect("create temp input");
    file.write_all(bytes).expect("write temp input");
    file.flush().expect("flush temp input");
    file
}

/// The socket address in an `http://host:port` URL.
///
/// # Panics
/// Panics if `url` is not of that form.
pub fn socket_addr(url: &str) -> SocketAddr {
    url.strip_prefix("http://")
        .and_then(|rest| rest.trim_end_matches('/').parse().ok())
        .unwrap_or_else(|| panic!("not an http socket URL: {url}"))
}

/// An HTTP client that never reuses connections.
///
/// Pooled keep-alive connections would otherwise outlive the endpoint's
/// listener and hide a closed port.
///
/// # Panics
/// Panics if the client cannot be built.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .expect("build HTTP client")
}

/// Poll `url` until connections are refused.
///
/// Returns `true` once a connection attempt fails within `tries` attempts.
///
/// # Examples
/// ```rust,ignore
/// use test_support::{POLL_DELAY, POLL_TRIES, wait_for_refusal};
///
/// assert!(wait_for_refusal("http://127.0.0.1:9", POLL_TRIES, POLL_DELAY).await);
/// ```
pub async fn wait_for_refusal(url: &str, tries: u32, delay: Duration) -> bool {
    let addr = socket_addr(url);
    for _ in 0..tries {
        if TcpStream::connect(addr).await.is_err() {
            return true;
        }
        sleep(delay).await;
    }
    false
}
