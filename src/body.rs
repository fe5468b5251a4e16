//! Request body type.
//!
//! Trimmed adaptation of `hreq`'s `Body` (`src/body.rs`): an
//! `AsyncRead`-only body abstraction, stripped of the charset, compression,
//! and on-disk-file constructors that only make sense for an HTTP
//! *client* role (see `DESIGN.md` for the list of drops). What remains is
//! a declared length, a readable stream, and a way to rebind the stream
//! to an in-memory reader after buffering.

use bytes::Bytes;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

enum BodyImpl {
    Empty,
    Bytes(io::Cursor<Bytes>),
    AsyncRead(Pin<Box<dyn AsyncRead + Send + Sync>>),
}

/// Body of an inbound HTTP request.
///
/// `length()` mirrors the `Content-Length` the host framework observed on
/// the wire: `None` when no header was present (treated as unknown, see
/// §4.5 invariant 2b), `Some(n)` otherwise.
pub struct Body {
    inner: BodyImpl,
    length: Option<u64>,
}

impl Body {
    /// A body with no bytes and a known length of `0`.
    pub fn empty() -> Self {
        Body {
            inner: BodyImpl::Empty,
            length: Some(0),
        }
    }

    /// A body backed by bytes already in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let length = Some(bytes.len() as u64);
        Body {
            inner: BodyImpl::Bytes(io::Cursor::new(bytes)),
            length,
        }
    }

    /// A body streamed from an arbitrary async reader, with a declared
    /// length if the host framework knows it ahead of time (`None` means
    /// `Content-Length: -1`/chunked, per §3's "unknown" marker).
    pub fn from_async_read<R>(reader: R, length: Option<u64>) -> Self
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        Body {
            inner: BodyImpl::AsyncRead(Box::pin(reader)),
            length,
        }
    }

    /// The declared length, if any.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// True when the body has already been fully drained and rebound
    /// in-memory by the body-read gate (§4.5/§4.1 step 3).
    pub fn is_buffered(&self) -> bool {
        matches!(self.inner, BodyImpl::Bytes(_) | BodyImpl::Empty)
    }

    /// Drain the body fully into memory, then rebind a fresh [`Body`]
    /// over the captured bytes so the application handler reads the
    /// exact same bytes unchanged (§4.1 step 3, §9 "body-buffer
    /// ownership"). Read errors are tolerated silently: whatever was
    /// read before the error is kept (§7 "body read error").
    ///
    /// Consumes `self` — the original reader is dropped (closed) once
    /// this returns.
    pub async fn drain(self) -> (Bytes, Body) {
        let captured = match self.inner {
            BodyImpl::Empty => Bytes::new(),
            BodyImpl::Bytes(cursor) => cursor.into_inner(),
            BodyImpl::AsyncRead(mut reader) => {
                let mut buf = Vec::new();
                // Errors are tolerated: keep whatever was read so far.
                let _ = reader.read_to_end(&mut buf).await;
                Bytes::from(buf)
            }
        };
        let rebound = Body::from_bytes(captured.clone());
        (captured, rebound)
    }
}

impl AsyncRead for Body {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.inner {
            BodyImpl::Empty => Poll::Ready(Ok(())),
            BodyImpl::Bytes(cursor) => Pin::new(cursor).poll_read(cx, buf),
            BodyImpl::AsyncRead(reader) => reader.as_mut().poll_read(cx, buf),
        }
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Body::empty()
    }
}

impl<'a> From<&'a str> for Body {
    fn from(v: &'a str) -> Self {
        Body::from_bytes(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::from_bytes(Bytes::from(v))
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body").field("length", &self.length).finish()
    }
}
