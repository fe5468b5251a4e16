//! Typed configuration built by composable options (§4.6).
//!
//! `ModuleConfigBuilder` accumulates settings through chained,
//! `self`-consuming methods (the same shape `hreq::Agent` uses, e.g.
//! `agent.retries(0)`) rather than a vector of `fn(&mut Config)` options,
//! and every setting that can fail is validated once, at `.build()`.

use crate::inspector::Inspector;
use crate::message::HeaderList;
use http::Request;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::body::Body;

/// Transport used to reach the agent (§6 "Agent socket").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Unix,
    Tcp,
}

#[derive(Debug, Clone)]
pub(crate) struct Socket {
    pub network: Network,
    pub address: String,
}

type HeaderExtractor = dyn Fn(&Request<Body>) -> HeaderList + Send + Sync;
type InitHook = dyn Fn() -> bool + Send + Sync;
type FiniHook = dyn Fn() + Send + Sync;

/// Immutable, validated module configuration (§3 "ModuleConfig").
///
/// Built exclusively through [`ModuleConfigBuilder`]; there is no public
/// way to mutate one after construction (§4.6 "Configuration is immutable
/// after construction").
#[derive(Clone)]
pub struct ModuleConfig {
    pub(crate) socket: Socket,
    pub(crate) timeout: Duration,
    pub(crate) anomaly_size: u64,
    pub(crate) anomaly_duration: Duration,
    pub(crate) max_content_length: u64,
    pub(crate) allow_unknown_content_length: bool,
    pub(crate) module_name: String,
    pub(crate) module_version: String,
    pub(crate) server_identifier: String,
    pub(crate) server_flavor: String,
    pub(crate) debug: bool,
    pub(crate) custom_inspector: Option<Arc<dyn Inspector>>,
    pub(crate) inspector_init: Option<Arc<InitHook>>,
    pub(crate) inspector_fini: Option<Arc<FiniHook>>,
    pub(crate) header_extractor: Option<Arc<HeaderExtractor>>,
    pub(crate) extra_content_type: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl ModuleConfig {
    pub fn builder() -> ModuleConfigBuilder {
        ModuleConfigBuilder::new()
    }
}

/// Builder for [`ModuleConfig`]. See §4.6 for the option table this
/// mirrors one-to-one.
pub struct ModuleConfigBuilder {
    socket: Option<Socket>,
    timeout: Duration,
    anomaly_size: u64,
    anomaly_duration: Duration,
    max_content_length: u64,
    allow_unknown_content_length: bool,
    module_name: String,
    module_version: String,
    server_identifier: String,
    server_flavor: String,
    debug: bool,
    custom_inspector: Option<Arc<dyn Inspector>>,
    inspector_init: Option<Arc<InitHook>>,
    inspector_fini: Option<Arc<FiniHook>>,
    header_extractor: Option<Arc<HeaderExtractor>>,
    extra_content_type: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl Default for ModuleConfigBuilder {
    fn default() -> Self {
        ModuleConfigBuilder {
            socket: None,
            timeout: Duration::from_millis(100),
            anomaly_size: 512 * 1024,
            anomaly_duration: Duration::from_secs(1),
            max_content_length: 100_000,
            allow_unknown_content_length: false,
            module_name: "sigsci-agent-module".into(),
            module_version: env!("CARGO_PKG_VERSION").into(),
            server_identifier: String::new(),
            server_flavor: String::new(),
            debug: false,
            custom_inspector: None,
            inspector_init: None,
            inspector_fini: None,
            header_extractor: None,
            extra_content_type: None,
        }
    }
}

impl ModuleConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Socket(network, address)`: `network` is `unix` or `tcp`; for
    /// `unix`, `address` must be an absolute path; for `tcp`, `host:port`.
    pub fn socket(mut self, network: Network, address: impl Into<String>) -> Self {
        self.socket = Some(Socket {
            network,
            address: address.into(),
        });
        self
    }

    /// Per-RPC total deadline. Default ≈ 100ms.
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    /// Response size threshold that triggers a post-call when no request
    /// id exists. Default 512 KiB.
    pub fn anomaly_size(mut self, n: u64) -> Self {
        self.anomaly_size = n;
        self
    }

    /// Response duration threshold ditto. Default 1s.
    pub fn anomaly_duration(mut self, d: Duration) -> Self {
        self.anomaly_duration = d;
        self
    }

    /// Inclusive upper bound on buffered body size. Default 100,000.
    pub fn max_content_length(mut self, n: u64) -> Self {
        self.max_content_length = n;
        self
    }

    /// Permit buffering when the declared length is unknown. Default false.
    pub fn allow_unknown_content_length(mut self, b: bool) -> Self {
        self.allow_unknown_content_length = b;
        self
    }

    /// Replace the default transport-backed inspector; optional init
    /// predicate (skip inspection on `false`) and fini callback.
    pub fn custom_inspector(
        mut self,
        inspector: Arc<dyn Inspector>,
        init: Option<Arc<InitHook>>,
        fini: Option<Arc<FiniHook>>,
    ) -> Self {
        self.custom_inspector = Some(inspector);
        self.inspector_init = init;
        self.inspector_fini = fini;
        self
    }

    /// Alternative inbound header extraction.
    pub fn custom_header_extractor(mut self, f: Arc<HeaderExtractor>) -> Self {
        self.header_extractor = Some(f);
        self
    }

    /// Extension hook for the body-read gate's content-type family test
    /// (§4.5 condition 3's "configuration additionally permits it").
    pub fn custom_content_type(mut self, f: Arc<dyn Fn(&str) -> bool + Send + Sync>) -> Self {
        self.extra_content_type = Some(f);
        self
    }

    pub fn module_identifier(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.module_name = name.into();
        self.module_version = version.into();
        self
    }

    pub fn server_identifier(mut self, id: impl Into<String>) -> Self {
        self.server_identifier = id.into();
        self
    }

    pub fn server_flavor(mut self, s: impl Into<String>) -> Self {
        self.server_flavor = s.into();
        self
    }

    pub fn debug(mut self, b: bool) -> Self {
        self.debug = b;
        self
    }

    /// Validate and finalize. The only fatal error case in the whole
    /// module (§7 "Invalid configuration at construction").
    pub fn build(self) -> Result<ModuleConfig, crate::error::Error> {
        let socket = self
            .socket
            .ok_or_else(|| crate::error::Error::Config("no agent socket configured".into()))?;

        match socket.network {
            Network::Unix => {
                if !Path::new(&socket.address).is_absolute() {
                    return Err(crate::error::Error::Config(format!(
                        "unix socket address must be an absolute path: {}",
                        socket.address
                    )));
                }
            }
            Network::Tcp => {
                if socket.address.rsplit_once(':').is_none() {
                    return Err(crate::error::Error::Config(format!(
                        "tcp socket address must be host:port: {}",
                        socket.address
                    )));
                }
            }
        }

        if self.timeout.is_zero() {
            return Err(crate::error::Error::Config("timeout must be > 0".into()));
        }

        Ok(ModuleConfig {
            socket,
            timeout: self.timeout,
            anomaly_size: self.anomaly_size,
            anomaly_duration: self.anomaly_duration,
            max_content_length: self.max_content_length,
            allow_unknown_content_length: self.allow_unknown_content_length,
            module_name: self.module_name,
            module_version: self.module_version,
            server_identifier: self.server_identifier,
            server_flavor: self.server_flavor,
            debug: self.debug,
            custom_inspector: self.custom_inspector,
            inspector_init: self.inspector_init,
            inspector_fini: self.inspector_fini,
            header_extractor: self.header_extractor,
            extra_content_type: self.extra_content_type,
        })
    }
}
