//! The server's end of the rendezvous pipe.
//!
//! The supervisor wires a pipe to the server's stdout. Once the URL is
//! written the server points its stdout at `/dev/null`, so the pipe closes
//! and nothing the server does later can block on, or break, a reader that
//! has gone away.

use blink_lib::rendezvous::{LineSender, RendezvousSender};
use nix::libc::STDOUT_FILENO;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, RawFd};

/// Sends the URL as one line on stdout, then releases stdout.
#[derive(Debug, Default)]
pub struct StdoutChannel;

impl RendezvousSender for StdoutChannel {
    async fn send(self, message: String) -> io::Result<()> {
        LineSender::new(tokio::io::stdout()).send(message).await?;
        redirect_to_null(STDOUT_FILENO)
    }
}

/// Replace `fd` with a descriptor open on `/dev/null`.
///
/// # Errors
/// Fails when `/dev/null` cannot be opened or the descriptor cannot be
/// duplicated.
pub fn redirect_to_null(fd: RawFd) -> io::Result<()> {
    let null = OpenOptions::new().read(true).write(true).open("/dev/null")?;
    nix::unistd::dup2(null.as_raw_fd(), fd)?;
    Ok(())
}
