//! Request lifecycle (§4.1): the state machine wrapping one downstream
//! handler invocation.
//!
//! `Handler`/`Module` follow `hreq`'s own `server::Handler` /
//! `server::Middleware` shape (`src/server/handler.rs`, `src/server/middle.rs`):
//! a plain `Send + Sync + 'static` trait with a `Pin<Box<dyn Future<...> +
//! Send + 'a>>`-returning method, and a blanket impl over closures so an
//! application can hand a plain async fn to [`Module::wrap`] without
//! implementing the trait by hand. `Module<H>` itself implements
//! `Handler`, so it composes the same way `hreq` chains middleware
//! (`src/server/chain.rs`): nothing stops a `Module` from being wrapped by
//! another layer.

use crate::body::Body;
use crate::body_gate;
use crate::config::ModuleConfig;
use crate::headers;
use crate::inspector::{Inspector, ModuleInitIn, RpcInspector};
use crate::message::{RequestIn, RequestInFollowup};
use crate::writer::{RecordingWriter, ResponseWriter};
use http::{HeaderMap, HeaderValue, Request, StatusCode};
use log::{debug, error};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

/// Connection-level facts a framework binding may attach to a request's
/// extensions (`req.extensions_mut().insert(ConnectionInfo { .. })`) before
/// handing it to [`Module::handle`]. None of this crate's own code produces
/// one — it is the seam through which a concrete HTTP framework (out of
/// scope per §1) supplies what a generic `http::Request` cannot: the peer
/// address and, for TLS listeners, the negotiated protocol/cipher.
#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    pub remote_addr: Option<SocketAddr>,
    pub tls_protocol: Option<String>,
    pub tls_cipher: Option<String>,
}

/// Framework-agnostic request handler (§2 "RUST SURFACE CHOICES").
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: Request<Body>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, Request<Body>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: Request<Body>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        (self)(w, req)
    }
}

/// Single-shot "run this once the last of N tracked tasks finishes"
/// primitive (§5, §9 "fini synchronization"): a plain atomic counter plus
/// a `Notify`, not modeled on a specific teacher file — the teacher's own
/// `ServerHandle`/`EndFut` (`src/server/serv_handle.rs`) signals shutdown
/// with a single `async_channel::bounded(1)` send raced via `select!`,
/// with no outstanding-count tracking at all, which doesn't fit a "wait
/// for N background RPCs to finish" requirement.
struct Outstanding {
    count: AtomicU64,
    notify: Notify,
}

impl Outstanding {
    fn new() -> Self {
        Outstanding {
            count: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// Run `fut` on a fresh task, tracked until completion.
    fn spawn(self: &Arc<Self>, fut: impl Future<Output = ()> + Send + 'static) {
        self.count.fetch_add(1, Ordering::SeqCst);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            fut.await;
            this.count.fetch_sub(1, Ordering::SeqCst);
            this.notify.notify_one();
        });
    }

    /// Resolve once the count of tasks started via [`Self::spawn`] returns
    /// to zero. At most one background RPC is ever spawned per request
    /// (§5), so this never actually waits on more than a single permit,
    /// but the counter generalizes cleanly if that ever changes.
    async fn wait_until_zero(&self) {
        loop {
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            self.notify.notified().await;
        }
    }
}

enum Verdict {
    Allow,
    Block,
    Unknown,
}

fn classify(code: i64) -> Verdict {
    if code == 200 {
        Verdict::Allow
    } else if (300..=599).contains(&code) {
        Verdict::Block
    } else {
        Verdict::Unknown
    }
}

fn content_length_of(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

/// Best-effort local hostname (§3 "server hostname"). Empty if unset —
/// there is no portable, dependency-free way to read `gethostname(2)`
/// without reaching for a crate the rest of the corpus never uses for this.
fn local_server_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_default()
}

/// The wrapping middleware: a downstream [`Handler`] plus the agent
/// inspector and configuration that govern how requests reaching it are
/// inspected (§2, §4.1).
pub struct Module<H: Handler> {
    handler: H,
    config: Arc<ModuleConfig>,
    inspector: Arc<dyn Inspector>,
}

impl<H: Handler> Module<H> {
    /// Construct the module, performing the one-time `ModuleInit` call
    /// (§4.2). A `ModuleInit` failure is logged, not fatal — the module
    /// still serves traffic (§4.2 "does not prevent the module from
    /// serving traffic").
    pub async fn wrap(handler: H, config: ModuleConfig) -> Self {
        let config = Arc::new(config);
        let inspector: Arc<dyn Inspector> = match &config.custom_inspector {
            Some(insp) => insp.clone(),
            None => Arc::new(RpcInspector::new(config.clone())),
        };

        let init = ModuleInitIn {
            module_name: config.module_name.clone(),
            module_version: config.module_version.clone(),
            server_identifier: config.server_identifier.clone(),
        };
        if let Err(e) = inspector.module_init(init).await {
            if config.debug {
                debug!("sigsci: module init failed: {}", e);
            }
        }

        Module { handler, config, inspector }
    }

    fn build_request_in(&self, req: &Request<Body>, headers_in: crate::message::HeaderList, post_body: Vec<u8>) -> RequestIn {
        let conn = req.extensions().get::<ConnectionInfo>();
        let remote_addr = conn
            .and_then(|c| c.remote_addr)
            .map(|a| a.ip().to_string())
            .unwrap_or_default();
        let tls_protocol = conn.and_then(|c| c.tls_protocol.clone()).unwrap_or_default();
        let tls_cipher = conn.and_then(|c| c.tls_cipher.clone()).unwrap_or_default();

        let scheme = req
            .uri()
            .scheme_str()
            .map(str::to_string)
            .unwrap_or_else(|| if tls_protocol.is_empty() { "http".to_string() } else { "https".to_string() });
        let uri = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let protocol = format!("{:?}", req.version());

        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();

        RequestIn::pre_request(
            self.config.module_version.clone(),
            self.config.server_identifier.clone(),
            self.config.server_flavor.clone(),
            local_server_name(),
            now.as_secs() as i64,
            now.as_millis() as i64,
            remote_addr,
            req.method().to_string(),
            scheme,
            uri,
            protocol,
            tls_protocol,
            tls_cipher,
            headers_in,
            post_body,
        )
    }

    fn write_block_response(&self, w: &mut dyn ResponseWriter, code: i64, headers: &HeaderMap) {
        let status = StatusCode::from_u16(code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if (300..=399).contains(&code) {
            if let Some(location) = headers.get(headers::REDIRECT).and_then(|v| v.to_str().ok()) {
                if let Ok(value) = HeaderValue::from_str(location) {
                    w.headers_mut().insert(http::header::LOCATION, value);
                    w.write_header(status);
                    return;
                }
            }
        }

        let reason = status.canonical_reason().unwrap_or("Error");
        let body = format!("{} {}\n", status.as_u16(), reason);
        w.write_header(status);
        let _ = w.write(body.as_bytes());
    }

    /// Handle one request end to end (§4.1 steps 1–7). Never returns an
    /// error: every inspector/transport failure is logged and the request
    /// falls through to the downstream handler.
    pub async fn handle(&self, w: &mut dyn ResponseWriter, mut req: Request<Body>) {
        // Step 1: inspect-gate.
        if let Some(init) = &self.config.inspector_init {
            if !(**init)() {
                self.handler.call(w, req).await;
                return;
            }
        }

        let start = Instant::now();
        let outstanding = Arc::new(Outstanding::new());

        // Step 3: body-buffer.
        let has_body = req.body().length() != Some(0);
        let content_length = content_length_of(req.headers());
        let content_type = req.headers().get(http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok());

        let post_body = if body_gate::should_buffer(&self.config, has_body, content_length, content_type) {
            let body = std::mem::replace(req.body_mut(), Body::empty());
            let (captured, rebound) = body.drain().await;
            *req.body_mut() = rebound;
            captured.to_vec()
        } else {
            Vec::new()
        };

        let headers_in = match &self.config.header_extractor {
            Some(extractor) => (**extractor)(&req),
            None => headers::capture_request_headers(req.headers(), req.uri()),
        };

        // Step 4: PreRequest.
        let request_in = self.build_request_in(&req, headers_in, post_body);
        let request_in_for_post = request_in.clone();

        let verdict = match self.inspector.pre_request(request_in).await {
            Ok(v) => v,
            Err(e) => {
                if self.config.debug {
                    debug!("sigsci: pre_request failed, failing open: {}", e);
                }
                self.handler.call(w, req).await;
                return;
            }
        };

        // Step 5: header propagation.
        headers::apply_request_header_effects(
            req.headers_mut(),
            verdict.waf_response,
            verdict.request_id.as_deref(),
            &verdict.request_headers,
        );

        // Step 6: verdict dispatch.
        match classify(verdict.waf_response) {
            Verdict::Block => {
                self.write_block_response(w, verdict.waf_response, req.headers());
                return;
            }
            Verdict::Unknown => {
                error!("sigsci: unknown verdict code {}, failing open", verdict.waf_response);
                self.handler.call(w, req).await;
                return;
            }
            Verdict::Allow => {}
        }

        let mut recorder = RecordingWriter::new(w, verdict.response_headers);
        self.handler.call(&mut recorder, req).await;

        let code = recorder.status().as_u16() as i64;
        let size = recorder.bytes_written() as i64;
        let duration = start.elapsed();
        let headers_out = headers::capture_header_list(recorder.headers_mut());

        // Step 7: post-response decision.
        let inspector = self.inspector.clone();
        let debug_enabled = self.config.debug;

        if let Some(request_id) = verdict.request_id {
            let followup = RequestInFollowup {
                request_id,
                response_code: code,
                response_millis: duration.as_millis() as i64,
                response_size: size,
                headers_out,
            };
            outstanding.spawn(async move {
                if let Err(e) = inspector.update_request(followup).await {
                    if debug_enabled {
                        debug!("sigsci: update_request failed: {}", e);
                    }
                }
            });
        } else if code >= 300 || size as u64 >= self.config.anomaly_size || duration >= self.config.anomaly_duration {
            let mut post_request = request_in_for_post;
            post_request.waf_response = verdict.waf_response;
            post_request.response_code = code;
            post_request.response_millis = duration.as_millis() as i64;
            post_request.response_size = size;
            post_request.headers_out = Some(headers_out);
            outstanding.spawn(async move {
                if let Err(e) = inspector.post_request(post_request).await {
                    if debug_enabled {
                        debug!("sigsci: post_request failed: {}", e);
                    }
                }
            });
        }

        // Step 2: fini-defer, scheduled last so it only ever waits on
        // background work already spawned above.
        if let Some(fini) = self.config.inspector_fini.clone() {
            tokio::spawn(async move {
                outstanding.wait_until_zero().await;
                (*fini)();
            });
        }
    }
}

impl<H: Handler> Handler for Module<H> {
    fn call<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: Request<Body>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(self.handle(w, req))
    }
}
