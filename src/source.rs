//! Resolution of the invocation target into servable content.
//!
//! Resolution runs twice per invocation: once in the foreground as a
//! pre-flight check (`consume = false`) and once in the server instance that
//! will actually serve the bytes (`consume = true`). Only the second call may
//! read input, so piped data is never split between the two processes.

use bytes::Bytes;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::os::fd::AsFd;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::BlinkError;
use crate::target::InvocationTarget;

/// Display name used for content read from standard input.
pub const STDIN_NAME: &str = "stdin";

/// Bytes backing a [`ContentSource`].
#[derive(Debug, Clone)]
pub enum Content {
    /// Fully buffered in memory.
    Buffered(Bytes),
    /// A seekable file, read by offset.
    File(Arc<File>),
    /// Validated but deliberately left unread.
    Unconsumed,
}

impl Content {
    /// Current size in bytes.
    ///
    /// Files are measured on every call so a file that grows between
    /// requests is served whole.
    ///
    /// # Errors
    /// Fails for [`Content::Unconsumed`] or when the file cannot be stat'ed.
    pub fn size(&self) -> io::Result<u64> {
        match self {
            Self::Buffered(bytes) => Ok(bytes.len() as u64),
            Self::File(file) => Ok(file.metadata()?.len()),
            Self::Unconsumed => Err(unconsumed()),
        }
    }

    /// Read up to `max` bytes starting at `offset`.
    ///
    /// Blocking for files; async callers should run it on the blocking pool.
    /// An empty result means `offset` is at or past the end.
    ///
    /// # Errors
    /// Fails for [`Content::Unconsumed`] or on a read error.
    pub fn read_at(&self, offset: u64, max: usize) -> io::Result<Bytes> {
        match self {
            Self::Buffered(bytes) => {
                let start = usize::try_from(offset).map_or(bytes.len(), |o| o.min(bytes.len()));
                let end = start.saturating_add(max).min(bytes.len());
                Ok(bytes.slice(start..end))
            }
            Self::File(file) => {
                let mut buf = vec![0; max];
                let n = file.read_at(&mut buf, offset)?;
                buf.truncate(n);
                Ok(Bytes::from(buf))
            }
            Self::Unconsumed => Err(unconsumed()),
        }
    }
}

fn unconsumed() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "input was not consumed")
}

/// Resolved content together with the metadata HTTP responses need.
#[derive(Debug, Clone)]
pub struct ContentSource {
    /// The bytes to serve.
    pub content: Content,
    /// Base name of the file, or `stdin`.
    pub name: String,
    /// Modification time used for `Last-Modified` and conditional requests.
    pub modified: SystemTime,
}

/// Resolve `target` using the process's real standard input.
///
/// # Errors
/// Returns [`BlinkError::InputUnavailable`] when the file cannot be opened or
/// read, or when standard input is closed.
///
/// # Examples
///
/// ```no_run
/// use blink_lib::{InvocationTarget, resolve};
///
/// let target = InvocationTarget::from_arg(Some("notes.txt".as_ref()));
/// // Fail fast without reading anything.
/// resolve(&target, false)?;
/// let source = resolve(&target, true)?;
/// assert_eq!(source.name, "notes.txt");
/// # Ok::<(), blink_lib::BlinkError>(())
/// ```
pub fn resolve(target: &InvocationTarget, consume: bool) -> Result<ContentSource, BlinkError> {
    resolve_with(target, consume, io::stdin().lock())
}

/// Resolve `target`, treating `stdin` as standard input.
///
/// With `consume = false` nothing is read: standard input is only checked to
/// be an open descriptor, and a non-seekable path is returned as
/// [`Content::Unconsumed`].
///
/// # Errors
/// See [`resolve`].
pub fn resolve_with<S>(
    target: &InvocationTarget,
    consume: bool,
    stdin: S,
) -> Result<ContentSource, BlinkError>
where
    S: Read + AsFd,
{
    match target {
        InvocationTarget::Stdin => resolve_stdin(consume, stdin),
        InvocationTarget::NamedFile(path) => resolve_file(path, consume),
    }
}

fn resolve_stdin<S: Read + AsFd>(consume: bool, mut stdin: S) -> Result<ContentSource, BlinkError> {
    let fail = |e| BlinkError::input(InvocationTarget::Stdin, e);
    let content = if consume {
        let mut buf = Vec::new();
        stdin.read_to_end(&mut buf).map_err(fail)?;
        tracing::debug!(bytes = buf.len(), "Buffered standard input");
        Content::Buffered(Bytes::from(buf))
    } else {
        let fd = stdin.as_fd().try_clone_to_owned().map_err(fail)?;
        File::from(fd).metadata().map_err(fail)?;
        Content::Unconsumed
    };
    Ok(ContentSource {
        content,
        name: STDIN_NAME.to_owned(),
        modified: SystemTime::now(),
    })
}

fn resolve_file(path: &Path, consume: bool) -> Result<ContentSource, BlinkError> {
    let fail = |e| BlinkError::input(path.display(), e);
    let mut file = File::open(path).map_err(fail)?;
    let meta = file.metadata().map_err(fail)?;
    if meta.is_dir() {
        return Err(fail(io::Error::new(
            io::ErrorKind::IsADirectory,
            "is a directory",
        )));
    }
    let name = path.file_name().map_or_else(
        || path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    );
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);

    let content = match file.seek(SeekFrom::Start(0)) {
        Ok(_) => Content::File(Arc::new(file)),
        Err(e) if consume => {
            tracing::debug!(error = %e, path = %path.display(), "Input is not seekable; buffering");
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).map_err(fail)?;
            Content::Buffered(Bytes::from(buf))
        }
        Err(_) => Content::Unconsumed,
    };
    Ok(ContentSource {
        content,
        name,
        modified,
    })
}
