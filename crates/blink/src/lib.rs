//! The `blink` executable.
//!
//! Shares one file, or piped input, over a short-lived URL reachable only from
//! this machine. The first invocation re-executes itself as a detached server,
//! prints the URL the server reports, and stays in the foreground to forward
//! interrupts.

use blink_lib::InvocationTarget;
use clap::Parser;
use std::path::{Path, PathBuf};

pub mod channel;
pub mod dispatch;
pub mod report;
pub mod supervisor;

pub use dispatch::run;
pub use report::RunError;

/// Command line arguments for `blink`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "blink",
    override_usage = "blink [file]",
    help_template = "usage: {usage}",
    disable_version_flag = true
)]
pub struct Args {
    /// File to share; `-` or nothing reads standard input.
    #[arg(allow_hyphen_values = true)]
    pub file: Option<PathBuf>,
}

impl Args {
    /// The target named by the arguments.
    pub fn target(&self) -> InvocationTarget {
        InvocationTarget::from_arg(self.file.as_deref().map(Path::as_os_str))
    }
}
