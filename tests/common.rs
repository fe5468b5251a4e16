#![allow(unused)]

use http::{HeaderMap, StatusCode};
use sigsci_agent_module::{Body, Handler, ResponseWriter};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Once;

pub fn setup_logger() {
    static START: Once = Once::new();
    START.call_once(|| {
        let test_log = std::env::var("TEST_LOG")
            .map(|x| x != "0" && x.to_lowercase() != "false")
            .unwrap_or(false);
        let level = if test_log { log::LevelFilter::Trace } else { log::LevelFilter::Info };
        pretty_env_logger::formatted_builder()
            .filter_level(log::LevelFilter::Warn)
            .filter_module("sigsci_agent_module", level)
            .target(env_logger::Target::Stdout)
            .init();
    });
}

/// A [`ResponseWriter`] that keeps everything written to it in memory, for
/// assertion by the test. No optional capability is supported — every
/// `as_*` probe answers `None`, which is itself part of what the tests
/// check (a module must never invent a capability the base writer lacks).
#[derive(Default)]
pub struct RecordingSink {
    pub headers: HeaderMap,
    pub status: Option<StatusCode>,
    pub body: Vec<u8>,
}

impl ResponseWriter for RecordingSink {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// Downstream app that writes a fixed status and body, and captures
/// whatever bytes it received as its own request body (for the body-gate
/// and fail-open scenarios, which assert on what the handler actually saw).
pub struct FixedHandler {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl FixedHandler {
    pub fn ok(body: impl AsRef<[u8]>) -> Self {
        FixedHandler {
            status: StatusCode::OK,
            body: body.as_ref().to_vec(),
        }
    }

    pub fn with_status(status: StatusCode, body: impl AsRef<[u8]>) -> Self {
        FixedHandler {
            status,
            body: body.as_ref().to_vec(),
        }
    }
}

impl Handler for FixedHandler {
    fn call<'a>(&'a self, w: &'a mut dyn ResponseWriter, _req: http::Request<Body>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            w.write_header(self.status);
            let _ = w.write(&self.body);
        })
    }
}

pub struct CapturedRequest {
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Downstream app that records the exact request it was handed — headers
/// after the module's propagation step and whatever bytes its body reader
/// yields — so a test can assert on what reaches application code. Module
/// ownership takes the handler by value, so the capture slot is a shared
/// `Arc` the test keeps its own handle to.
pub struct CapturingHandler {
    captured: std::sync::Arc<std::sync::Mutex<Option<CapturedRequest>>>,
}

impl CapturingHandler {
    pub fn new() -> Self {
        CapturingHandler {
            captured: std::sync::Arc::new(std::sync::Mutex::new(None)),
        }
    }

    pub fn new_shared() -> (Self, std::sync::Arc<std::sync::Mutex<Option<CapturedRequest>>>) {
        let handler = Self::new();
        let slot = handler.captured.clone();
        (handler, slot)
    }
}

impl Handler for CapturingHandler {
    fn call<'a>(&'a self, w: &'a mut dyn ResponseWriter, mut req: http::Request<Body>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            use tokio::io::AsyncReadExt;
            let headers = req.headers().clone();
            let mut body = Vec::new();
            let _ = req.body_mut().read_to_end(&mut body).await;
            *self.captured.lock().unwrap() = Some(CapturedRequest { headers, body });
            w.write_header(StatusCode::OK);
        })
    }
}
