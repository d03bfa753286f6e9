//! Fatal errors and how they reach the user.
//!
//! Every failure is reported once on stderr as `error: <detail>`. With
//! `DEBUG=1` the full cause chain is shown instead, and panics keep Rust's
//! default output.

use blink_lib::BlinkError;
use std::io::{self, Write};
use std::process::ExitStatus;
use thiserror::Error;
use tokio::task::JoinError;

/// Errors that end a `blink` invocation.
#[derive(Debug, Error)]
pub enum RunError {
    /// Input, listener, spawn or rendezvous failure.
    #[error(transparent)]
    Blink(#[from] BlinkError),
    /// A `BLINK_*` variable could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[source] Box<figment::Error>),
    /// The interrupt handler could not be installed.
    #[error("failed to install {signal} handler: {source}")]
    Signal {
        signal: &'static str,
        #[source]
        source: io::Error,
    },
    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),
    /// The URL could not be written to stdout.
    #[error("failed to print URL: {0}")]
    Output(#[source] io::Error),
    /// Waiting on the background process failed.
    #[error("failed to wait for server: {0}")]
    Wait(#[source] io::Error),
    /// The background process stopped unsuccessfully after reporting its URL.
    #[error("server exited unexpectedly ({0})")]
    ServerExit(ExitStatus),
    /// The in-process server task panicked.
    #[error("server task failed: {0}")]
    Task(#[from] JoinError),
}

impl From<figment::Error> for RunError {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}

/// The text printed for `err`.
///
/// # Examples
///
/// ```
/// use blink::report::render;
/// use blink::RunError;
/// use std::io;
///
/// let err = RunError::Runtime(io::Error::other("no threads"));
/// assert_eq!(render(err, false), "error: failed to start runtime: no threads");
/// ```
pub fn render(err: RunError, debug: bool) -> String {
    if debug {
        format!("error: {:?}", anyhow::Error::new(err))
    } else {
        format!("error: {err}")
    }
}

/// Print `err` to stderr.
pub fn emit(err: RunError, debug: bool) {
    let text = render(err, debug);
    // Nothing useful can be done if stderr is gone.
    let _ = writeln!(io::stderr().lock(), "{text}");
}

/// Replace the default panic output with a single `error:` line.
///
/// Does nothing in debug mode so backtraces stay available.
pub fn install_panic_hook(debug: bool) {
    if debug {
        return;
    }
    std::panic::set_hook(Box::new(|info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unexpected panic");
        let _ = writeln!(io::stderr().lock(), "error: {message}");
    }));
}
