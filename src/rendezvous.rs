//! One-shot channel carrying the server's URL back to its spawner.
//!
//! Both halves are consumed by their single operation, so a second send or
//! receive is a compile error rather than a runtime check. The stream-backed
//! halves work over any async byte stream (an OS pipe in production, an
//! in-memory duplex in tests); the `oneshot` halves serve the in-process
//! launch mode.

use std::future::Future;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;

/// Sending half: delivers exactly one message, then closes.
pub trait RendezvousSender {
    /// Send `message` and close the channel.
    fn send(self, message: String) -> impl Future<Output = io::Result<()>> + Send;
}

/// Receiving half: yields exactly one message, then closes.
pub trait RendezvousReceiver {
    /// Wait for the message and close the channel.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] when the sender goes away
    /// without sending.
    fn recv(self) -> impl Future<Output = io::Result<String>> + Send;
}

fn closed() -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "channel closed before a message arrived",
    )
}

/// Writes the message as a single newline-terminated line.
#[derive(Debug)]
pub struct LineSender<W> {
    writer: W,
}

impl<W> LineSender<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W> RendezvousSender for LineSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(mut self, message: String) -> io::Result<()> {
        if message.contains(['\n', '\r']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "rendezvous message must be a single line",
            ));
        }
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        self.writer.shutdown().await
    }
}

/// Reads a single line and discards the rest of the stream.
#[derive(Debug)]
pub struct LineReceiver<R> {
    reader: R,
}

impl<R> LineReceiver<R> {
    /// Wrap `reader`.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R> RendezvousReceiver for LineReceiver<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn recv(self) -> io::Result<String> {
        let mut reader = BufReader::new(self.reader);
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(closed());
        }
        if !line.ends_with('\n') {
            return Err(closed());
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }
}

impl RendezvousSender for oneshot::Sender<String> {
    async fn send(self, message: String) -> io::Result<()> {
        oneshot::Sender::send(self, message).map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "rendezvous receiver dropped")
        })
    }
}

impl RendezvousReceiver for oneshot::Receiver<String> {
    async fn recv(self) -> io::Result<String> {
        self.await.map_err(|_| closed())
    }
}

/// Create an in-process channel.
pub fn channel() -> (oneshot::Sender<String>, oneshot::Receiver<String>) {
    oneshot::channel()
}
