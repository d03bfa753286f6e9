//! Logging utilities for both roles.
//!
//! Initializes structured logging using `tracing` and
//! `tracing-subscriber`, reading filter settings from the `RUST_LOG`
//! environment variable. Output goes to stderr: in the server role stdout is
//! the rendezvous channel, and in the supervisor role stdout carries only the
//! URL.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the global tracing subscriber.
///
/// Without `RUST_LOG` only errors are shown, or everything down to `debug`
/// when `debug` is set.
///
/// # Examples
///
/// ```rust,no_run
/// use blinkd::logging::init;
///
/// init(false);
/// tracing::error!("Logging is initialized!");
/// ```
pub fn init(debug: bool) {
    init_with_writer(fmt::writer::BoxMakeWriter::new(std::io::stderr), debug);
}

/// Initialize logging with a custom writer.
///
/// # Examples
///
/// ```rust,no_run
/// use blinkd::logging::init_with_writer;
/// use tracing_subscriber::fmt;
///
/// init_with_writer(fmt::writer::BoxMakeWriter::new(std::io::stderr), true);
/// ```
pub fn init_with_writer<W>(writer: W, debug: bool)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fmt()
        .with_env_filter(filter(debug))
        .with_writer(writer)
        .with_ansi(false)
        .init();
}

fn filter(debug: bool) -> EnvFilter {
    let default = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::ERROR
    };
    EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy()
}
