//! Inspector contract (§2, §4.2): four named operations over the
//! transport, each a typed input to a typed output.
//!
//! Trait shape follows `hreq`'s own `Handler`/`Middleware` traits
//! (`src/server/handler.rs`, `src/server/middle.rs`): a plain trait with
//! `Pin<Box<dyn Future<...> + Send + 'a>>`-returning methods rather than
//! `#[async_trait]`, so implementers (including the in-process test double
//! used in `tests/`) don't need an extra proc-macro dependency.

use crate::error::Error;
use crate::message::{RequestIn, RequestInFollowup, ResponseOut};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity sent once at construction (§4.2 "ModuleInit").
#[derive(Debug, Clone)]
pub struct ModuleInitIn {
    pub module_name: String,
    pub module_version: String,
    pub server_identifier: String,
}

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// The abstraction over the agent (glossary). The default implementation
/// is the RPC transport; custom implementations are permitted — e.g. an
/// in-process fake for tests (§4.6 `CustomInspector`).
pub trait Inspector: Send + Sync + 'static {
    fn module_init<'a>(&'a self, arg: ModuleInitIn) -> BoxFut<'a, ()>;
    fn pre_request<'a>(&'a self, arg: RequestIn) -> BoxFut<'a, ResponseOut>;
    fn post_request<'a>(&'a self, arg: RequestIn) -> BoxFut<'a, ()>;
    fn update_request<'a>(&'a self, arg: RequestInFollowup) -> BoxFut<'a, ()>;
}

/// Default [`Inspector`]: one fresh [`crate::transport`] connection per call.
pub(crate) struct RpcInspector {
    config: std::sync::Arc<crate::config::ModuleConfig>,
    seq: AtomicU64,
}

impl RpcInspector {
    pub fn new(config: std::sync::Arc<crate::config::ModuleConfig>) -> Self {
        RpcInspector {
            config,
            seq: AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl Inspector for RpcInspector {
    fn module_init<'a>(&'a self, arg: ModuleInitIn) -> BoxFut<'a, ()> {
        Box::pin(async move {
            let seq = self.next_seq();
            crate::transport::call::<_, ()>(&self.config, seq, crate::transport::RpcOp::ModuleInit, &arg_to_wire(arg))
                .await
        })
    }

    fn pre_request<'a>(&'a self, arg: RequestIn) -> BoxFut<'a, ResponseOut> {
        Box::pin(async move {
            let seq = self.next_seq();
            crate::transport::call(&self.config, seq, crate::transport::RpcOp::PreRequest, &arg).await
        })
    }

    fn post_request<'a>(&'a self, arg: RequestIn) -> BoxFut<'a, ()> {
        Box::pin(async move {
            let seq = self.next_seq();
            crate::transport::call::<_, ()>(&self.config, seq, crate::transport::RpcOp::PostRequest, &arg).await
        })
    }

    fn update_request<'a>(&'a self, arg: RequestInFollowup) -> BoxFut<'a, ()> {
        Box::pin(async move {
            let seq = self.next_seq();
            crate::transport::call::<_, ()>(&self.config, seq, crate::transport::RpcOp::UpdateRequest, &arg).await
        })
    }
}

#[derive(serde::Serialize)]
struct ModuleInitWire {
    module_name: String,
    module_version: String,
    server_identifier: String,
}

fn arg_to_wire(arg: ModuleInitIn) -> ModuleInitWire {
    ModuleInitWire {
        module_name: arg.module_name,
        module_version: arg.module_version,
        server_identifier: arg.server_identifier,
    }
}

/// An in-process [`Inspector`] test double, public so both this crate's
/// own tests and a downstream integration suite can plug it in as a
/// [`crate::config::ModuleConfigBuilder::custom_inspector`] without a real
/// agent socket — the same role `hreq`'s own test suite fills with an
/// in-memory driver instead of a live TCP stack.
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    pub struct FakeInspector {
        pub verdict: Mutex<ResponseOut>,
        pub pre_request_calls: Mutex<Vec<RequestIn>>,
        pub post_request_calls: Mutex<Vec<RequestIn>>,
        pub update_request_calls: Mutex<Vec<RequestInFollowup>>,
        pub fail_pre_request: bool,
    }

    impl FakeInspector {
        pub fn allow() -> Self {
            FakeInspector {
                verdict: Mutex::new(ResponseOut {
                    waf_response: 200,
                    ..Default::default()
                }),
                pre_request_calls: Mutex::new(Vec::new()),
                post_request_calls: Mutex::new(Vec::new()),
                update_request_calls: Mutex::new(Vec::new()),
                fail_pre_request: false,
            }
        }

        pub fn with_verdict(verdict: ResponseOut) -> Self {
            FakeInspector {
                verdict: Mutex::new(verdict),
                pre_request_calls: Mutex::new(Vec::new()),
                post_request_calls: Mutex::new(Vec::new()),
                update_request_calls: Mutex::new(Vec::new()),
                fail_pre_request: false,
            }
        }

        pub fn unreachable() -> Self {
            FakeInspector {
                verdict: Mutex::new(ResponseOut::default()),
                pre_request_calls: Mutex::new(Vec::new()),
                post_request_calls: Mutex::new(Vec::new()),
                update_request_calls: Mutex::new(Vec::new()),
                fail_pre_request: true,
            }
        }
    }

    impl Inspector for FakeInspector {
        fn module_init<'a>(&'a self, _arg: ModuleInitIn) -> BoxFut<'a, ()> {
            Box::pin(async { Ok(()) })
        }

        fn pre_request<'a>(&'a self, arg: RequestIn) -> BoxFut<'a, ResponseOut> {
            self.pre_request_calls.lock().unwrap().push(arg);
            let fail = self.fail_pre_request;
            let verdict = self.verdict.lock().unwrap().clone();
            Box::pin(async move {
                if fail {
                    Err(Error::Transport(std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "fake agent unreachable",
                    )))
                } else {
                    Ok(verdict)
                }
            })
        }

        fn post_request<'a>(&'a self, arg: RequestIn) -> BoxFut<'a, ()> {
            self.post_request_calls.lock().unwrap().push(arg);
            Box::pin(async { Ok(()) })
        }

        fn update_request<'a>(&'a self, arg: RequestInFollowup) -> BoxFut<'a, ()> {
            self.update_request_calls.lock().unwrap().push(arg);
            Box::pin(async { Ok(()) })
        }
    }
}
