//! In-process HTTP inspection middleware: fingerprints each request to a
//! local inspection agent over a UNIX or TCP socket, blocks on its verdict
//! within a bounded latency budget, and applies allow/block/redirect,
//! failing open whenever the agent is slow, unreachable, or returns
//! something the module doesn't understand.
//!
//! The middleware is framework-agnostic: it operates over a generic
//! [`writer::ResponseWriter`] rather than any particular server's request
//! type, the same way the crate this one is adapted from
//! (`hreq`, see `DESIGN.md`) keeps its own server layer decoupled from any
//! specific transport.
//!
//! ```no_run
//! # use sigsci_agent_module::{Module, ModuleConfig, Network, ResponseWriter, Body, Handler};
//! # use http::{Request, StatusCode};
//! # use std::pin::Pin;
//! # use std::future::Future;
//! struct App;
//! impl Handler for App {
//!     fn call<'a>(&'a self, w: &'a mut dyn ResponseWriter, _req: Request<Body>)
//!         -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>
//!     {
//!         Box::pin(async move {
//!             w.write_header(StatusCode::OK);
//!             let _ = w.write(b"hello");
//!         })
//!     }
//! }
//!
//! # async fn run() {
//! let config = ModuleConfig::builder()
//!     .socket(Network::Unix, "/var/run/sigsci/sigsci.sock")
//!     .build()
//!     .expect("valid configuration");
//! let module = Module::wrap(App, config).await;
//! # let _ = module;
//! # }
//! ```

#[macro_use]
extern crate log;

mod body;
mod body_gate;
mod config;
mod deadline;
mod error;
mod headers;
mod inspector;
mod lifecycle;
mod message;
mod transport;
mod writer;

pub use body::Body;
pub use config::{ModuleConfig, ModuleConfigBuilder, Network};
pub use error::Error;
pub use inspector::{testing, Inspector, ModuleInitIn};
pub use lifecycle::{ConnectionInfo, Handler, Module};
pub use message::{HeaderAction, HeaderList, HeaderOp, RequestIn, RequestInFollowup, ResponseOut};
pub use writer::{CloseNotifier, Flusher, Hijacker, ReadFromer, ReadWrite, RecordingWriter, ResponseWriter};
