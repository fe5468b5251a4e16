//! Response recorder (§4.4) and the generic response-writer contract it
//! wraps.
//!
//! Binding layers for specific HTTP frameworks stay out of this crate
//! (§1); the contract below operates over *a response writer*,
//! imperatively (status, bytes-written, capability probes) — the Go
//! `net/http.ResponseWriter` shape, rather than a value-returning
//! `async fn(Request<Body>) -> impl Into<Reply>` server handler. A
//! concrete framework binding (axum, actix, hyper's `Service`) would
//! implement this trait once, outside this crate.
//!
//! Capability forwarding (hijack / flush / read-from / close-notify) is
//! the idiomatic-Rust analogue of Go's runtime interface assertion
//! (`w.(http.Flusher)`): an `Option<&mut dyn Trait>` accessor method,
//! which is dynamic by construction — unlike Go, there is no need for two
//! separate static wrapper *types* (one with a `Flush` method, one
//! without) to keep a non-flushing base from appearing to flush, because
//! the accessor itself returns `None` when the base doesn't support it.
//! See `DESIGN.md` for why this collapses a "factory picks a variant"
//! design into a single wrapper type. The extension-trait-heavy naming
//! (`Flusher`, `Hijacker`, …) follows `hreq`'s own
//! `ResponseBuilderExt`/`ServerRequestExt` convention of one small trait
//! per capability.

use http::header::HeaderMap;
use http::StatusCode;
use std::io;

/// Streaming flush, for long-lived/chunked responses.
pub trait Flusher: Send {
    fn flush(&mut self) -> io::Result<()>;
}

/// Connection takeover for protocol upgrades (websockets, CONNECT).
/// Mirrors `hyper::upgrade::OnUpgrade` (`examples/hyperium-hyper/src/upgrade.rs`):
/// the hijacked stream plus any bytes already read off it but not yet
/// consumed as part of the original protocol.
pub trait Hijacker: Send {
    fn hijack(&mut self) -> Result<(Box<dyn ReadWrite>, Vec<u8>), crate::error::Error>;
}

/// A bidirectional byte stream, as returned by a successful hijack.
pub trait ReadWrite: io::Read + io::Write + Send {}
impl<T: io::Read + io::Write + Send> ReadWrite for T {}

/// `io.ReaderFrom`-style sendfile optimization.
pub trait ReadFromer: Send {
    fn read_from(&mut self, r: &mut dyn io::Read) -> io::Result<u64>;
}

/// Cooperative cancellation signal for the underlying connection closing
/// early. When the base writer doesn't support it, the wrapper must still
/// answer structurally — the default accessor (`as_close_notifier`
/// returning `None`) lets a caller fall back to a sentinel channel that
/// never fires, matching §4.4 "returns a sentinel channel".
pub trait CloseNotifier: Send {
    fn close_notify(&self) -> tokio::sync::oneshot::Receiver<()>;
}

/// Generic, framework-agnostic response writer contract (§4.1, §4.4, §9).
pub trait ResponseWriter: Send {
    fn headers_mut(&mut self) -> &mut HeaderMap;
    fn write_header(&mut self, status: StatusCode);
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        None
    }
    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }
    fn as_read_fromer(&mut self) -> Option<&mut dyn ReadFromer> {
        None
    }
    fn as_close_notifier(&mut self) -> Option<&dyn CloseNotifier> {
        None
    }
}

/// Wraps a downstream [`ResponseWriter`], recording status and bytes
/// written, and applying the agent's response-header actions exactly
/// once, at the first `write_header`/`write` call (§4.4, §8 invariant 6).
pub struct RecordingWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: StatusCode,
    bytes_written: u64,
    pending_actions: Vec<crate::message::HeaderAction>,
    actions_applied: bool,
}

impl<'a> RecordingWriter<'a> {
    /// Built *after* the inspect-gate (§9 "ownership of the recorder"):
    /// bypassed requests never see this wrapper, so they keep every
    /// optional capability of the raw writer without an observable type
    /// change.
    pub fn new(inner: &'a mut dyn ResponseWriter, pending_actions: Vec<crate::message::HeaderAction>) -> Self {
        RecordingWriter {
            inner,
            status: StatusCode::OK,
            bytes_written: 0,
            pending_actions,
            actions_applied: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn apply_pending_actions_once(&mut self) {
        if self.actions_applied {
            return;
        }
        self.actions_applied = true;
        let headers = self.inner.headers_mut();
        for action in &self.pending_actions {
            crate::headers::apply_response_header_action(headers, action);
        }
        self.pending_actions.clear();
    }
}

impl<'a> ResponseWriter for RecordingWriter<'a> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.apply_pending_actions_once();
        self.status = status;
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.apply_pending_actions_once();
        let n = self.inner.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        self.inner.as_flusher()
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        self.inner.as_hijacker()
    }

    fn as_read_fromer(&mut self) -> Option<&mut dyn ReadFromer> {
        self.inner.as_read_fromer()
    }

    fn as_close_notifier(&mut self) -> Option<&dyn CloseNotifier> {
        self.inner.as_close_notifier()
    }
}
