//! HTTP responses for a single resolved resource.
//!
//! Implements the usual "serve content" behaviour: `Last-Modified` with
//! conditional requests, byte ranges (single and multipart), and streaming
//! bodies read by offset so concurrent requests never share a cursor.

use axum::body::Body;
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HeaderValue, RANGE,
};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;
use axum_extra::headers::{
    HeaderMapExt, IfModifiedSince, IfRange, IfUnmodifiedSince, LastModified, Range,
};
use blink_lib::{Content, ContentSource};
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::io;
use std::ops::Bound;
use std::time::SystemTime;
use thiserror::Error;
use uuid::Uuid;

/// Bytes read per streamed chunk.
const CHUNK_LEN: u64 = 64 * 1024;
/// Bytes inspected when guessing a content type from data.
const SNIFF_LEN: usize = 512;

const OCTET_STREAM: &str = "application/octet-stream";
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// A satisfiable byte range, clamped to the content size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteRange {
    start: u64,
    /// Never zero.
    length: u64,
}

impl ByteRange {
    /// Clamp one requested range to content of `size` bytes.
    ///
    /// `None` means the range starts at or past the end.
    fn within((start, end): (Bound<u64>, Bound<u64>), size: u64) -> Result<Option<Self>, RangeError> {
        let first = match start {
            Bound::Included(n) => n,
            Bound::Excluded(n) => n.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let last = match end {
            Bound::Included(n) => Some(n),
            Bound::Excluded(n) => Some(n.checked_sub(1).ok_or(RangeError::Invalid)?),
            Bound::Unbounded => None,
        };
        if last.is_some_and(|last| last < first) {
            return Err(RangeError::Invalid);
        }
        if first >= size {
            return Ok(None);
        }
        let last = last.map_or(size - 1, |last| last.min(size - 1));
        Ok(Some(Self {
            start: first,
            length: last - first + 1,
        }))
    }

    fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.start + self.length - 1)
    }
}

/// Why a `Range` header could not be honoured.
#[derive(Debug, Error, PartialEq, Eq)]
enum RangeError {
    #[error("invalid range")]
    Invalid,
    #[error("invalid range: failed to overlap")]
    NoOverlap,
}

/// A resolved source plus the response metadata derived from it once.
#[derive(Debug, Clone)]
pub struct Resource {
    content: Content,
    content_type: HeaderValue,
    modified: Option<SystemTime>,
}

impl Resource {
    /// Prepare `source` for serving.
    ///
    /// The content type is guessed from the name's extension, falling back to
    /// the first bytes of the content.
    ///
    /// # Errors
    /// Fails when the content was never consumed or cannot be read.
    pub async fn new(source: ContentSource) -> io::Result<Self> {
        let ContentSource {
            content,
            name,
            modified,
        } = source;
        let guessed = match mime_guess::from_path(&name).first() {
            Some(mime) if mime.type_() == mime_guess::mime::TEXT => {
                format!("{}; charset=utf-8", mime.essence_str())
            }
            Some(mime) => mime.essence_str().to_owned(),
            None => sniff(&read_chunk(&content, 0, SNIFF_LEN).await?).to_owned(),
        };
        let content_type = HeaderValue::from_str(&guessed)
            .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM));
        let modified = (modified > SystemTime::UNIX_EPOCH).then_some(modified);
        Ok(Self {
            content,
            content_type,
            modified,
        })
    }

    /// Build the response to a request with `method` and `headers`.
    pub async fn respond(&self, method: &Method, headers: &HeaderMap) -> Response {
        let size = match self.content.size() {
            Ok(size) => size,
            Err(e) => {
                tracing::error!(error = %e, "Failed to measure content");
                return status_only(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        if let Some(modified) = self.modified {
            if let Some(cond) = headers.typed_get::<IfUnmodifiedSince>() {
                if !cond.precondition_passes(modified) {
                    return status_only(StatusCode::PRECONDITION_FAILED);
                }
            }
            if matches!(*method, Method::GET | Method::HEAD) {
                if let Some(cond) = headers.typed_get::<IfModifiedSince>() {
                    if !cond.is_modified(modified) {
                        let mut res = status_only(StatusCode::NOT_MODIFIED);
                        res.headers_mut().typed_insert(LastModified::from(modified));
                        return res;
                    }
                }
            }
        }

        let ranges = match self.requested_ranges(headers, size) {
            Ok(ranges) => ranges,
            Err(e) => {
                let mut res = text(StatusCode::RANGE_NOT_SATISFIABLE, e.to_string());
                if e == RangeError::NoOverlap {
                    res.headers_mut().insert(
                        CONTENT_RANGE,
                        header_value(&format!("bytes */{size}")),
                    );
                }
                return res;
            }
        };
        let head_only = *method == Method::HEAD;

        let mut res = match ranges.as_slice() {
            [] => self.body_response(StatusCode::OK, 0, size, head_only),
            [range] => {
                let mut res =
                    self.body_response(StatusCode::PARTIAL_CONTENT, range.start, range.length, head_only);
                res.headers_mut()
                    .insert(CONTENT_RANGE, header_value(&range.content_range(size)));
                res
            }
            many => self.multipart_response(many, size, head_only),
        };

        let headers = res.headers_mut();
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        if let Some(modified) = self.modified {
            headers.typed_insert(LastModified::from(modified));
        }
        res
    }

    /// Ranges to serve; empty means "the whole content".
    fn requested_ranges(&self, headers: &HeaderMap, size: u64) -> Result<Vec<ByteRange>, RangeError> {
        if !headers.contains_key(RANGE) {
            return Ok(Vec::new());
        }
        if let Some(if_range) = headers.typed_get::<IfRange>() {
            let last_modified = self.modified.map(LastModified::from);
            if if_range.is_modified(None, last_modified.as_ref()) {
                return Ok(Vec::new());
            }
        }
        let ranges = match byte_ranges(headers, size) {
            // Empty content is sent whole rather than refused.
            Err(RangeError::NoOverlap) if size == 0 => return Ok(Vec::new()),
            res => res?,
        };
        let total = ranges
            .iter()
            .fold(0_u64, |acc, r| acc.saturating_add(r.length));
        if total > size {
            // Overlapping ranges larger than the content: send it whole.
            return Ok(Vec::new());
        }
        Ok(ranges)
    }

    fn body_response(&self, status: StatusCode, start: u64, length: u64, head_only: bool) -> Response {
        let body = if head_only {
            Body::empty()
        } else {
            Body::from_stream(read_stream(self.content.clone(), start, length))
        };
        let mut res = Response::new(body);
        *res.status_mut() = status;
        let headers = res.headers_mut();
        headers.insert(CONTENT_TYPE, self.content_type.clone());
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        res
    }

    fn multipart_response(&self, ranges: &[ByteRange], size: u64, head_only: bool) -> Response {
        let boundary = Uuid::new_v4().simple().to_string();
        let content_type = self.content_type.to_str().unwrap_or(OCTET_STREAM);
        let mut parts: Vec<BoxStream<'static, io::Result<Bytes>>> = Vec::new();
        let mut length = 0_u64;

        for (i, range) in ranges.iter().enumerate() {
            let lead = if i == 0 { "" } else { "\r\n" };
            let head = format!(
                "{lead}--{boundary}\r\n{CONTENT_TYPE}: {content_type}\r\n{CONTENT_RANGE}: {}\r\n\r\n",
                range.content_range(size)
            );
            length += head.len() as u64 + range.length;
            parts.push(stream::once(async move { Ok(Bytes::from(head)) }).boxed());
            parts.push(read_stream(self.content.clone(), range.start, range.length).boxed());
        }
        let tail = format!("\r\n--{boundary}--\r\n");
        length += tail.len() as u64;
        parts.push(stream::once(async move { Ok(Bytes::from(tail)) }).boxed());

        let body = if head_only {
            Body::empty()
        } else {
            Body::from_stream(stream::iter(parts).flatten())
        };
        let mut res = Response::new(body);
        *res.status_mut() = StatusCode::PARTIAL_CONTENT;
        let headers = res.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            header_value(&format!("multipart/byteranges; boundary={boundary}")),
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        res
    }
}

/// Satisfiable ranges of the request's `Range` header.
///
/// A header that does not parse is [`RangeError::Invalid`]; one that names
/// nothing inside the content is [`RangeError::NoOverlap`].
fn byte_ranges(headers: &HeaderMap, size: u64) -> Result<Vec<ByteRange>, RangeError> {
    let range = headers.typed_get::<Range>().ok_or(RangeError::Invalid)?;
    let mut ranges = Vec::new();
    for bounds in range.satisfiable_ranges(size) {
        ranges.extend(ByteRange::within(bounds, size)?);
    }
    if ranges.is_empty() {
        return Err(RangeError::NoOverlap);
    }
    Ok(ranges)
}

/// Stream `length` bytes of `content` starting at `start`.
///
/// File reads run on the blocking pool. Content that shrinks mid-stream ends
/// the body with an error, which aborts only this response.
pub fn read_stream(
    content: Content,
    start: u64,
    length: u64,
) -> impl futures::Stream<Item = io::Result<Bytes>> + Send + 'static {
    stream::try_unfold((content, start, length), next_chunk)
}

type Cursor = (Content, u64, u64);

async fn next_chunk((content, offset, remaining): Cursor) -> io::Result<Option<(Bytes, Cursor)>> {
    if remaining == 0 {
        return Ok(None);
    }
    let want = usize::try_from(remaining.min(CHUNK_LEN))
        .map_err(|_| io::Error::other("chunk length overflow"))?;
    let chunk = read_chunk(&content, offset, want).await?;
    if chunk.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "content shrank while streaming",
        ));
    }
    let read = chunk.len() as u64;
    Ok(Some((chunk, (content, offset + read, remaining - read))))
}

/// Read from `content`, moving file reads onto the blocking pool.
async fn read_chunk(content: &Content, offset: u64, max: usize) -> io::Result<Bytes> {
    if matches!(content, Content::File(_)) {
        let reader = content.clone();
        tokio::task::spawn_blocking(move || reader.read_at(offset, max))
            .await
            .map_err(io::Error::other)?
    } else {
        content.read_at(offset, max)
    }
}

/// Guess a content type from the leading bytes.
pub fn sniff(prefix: &[u8]) -> &'static str {
    let text = match std::str::from_utf8(prefix) {
        Ok(_) => true,
        // A multi-byte character cut off by the sniff window is still text.
        Err(e) => e.error_len().is_none(),
    };
    let control = prefix
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b));
    if text && !control {
        PLAIN_TEXT
    } else {
        OCTET_STREAM
    }
}

fn header_value(s: &str) -> HeaderValue {
    HeaderValue::from_str(s).unwrap_or_else(|_| HeaderValue::from_static(""))
}

fn status_only(status: StatusCode) -> Response {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = status;
    res
}

fn text(status: StatusCode, message: String) -> Response {
    let mut res = Response::new(Body::from(message));
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(PLAIN_TEXT));
    res
}
