//! Wire message schema (§3).
//!
//! These are the records exchanged with the agent. Field names follow the
//! module's lineage (`signalsciences/sigsci-module-golang`) closely
//! enough to stay a drop-in schema for an existing agent, while the Rust
//! shapes themselves follow `hreq`'s own plain
//! `#[derive(Serialize, Deserialize)]` struct style.

use serde::{Deserialize, Serialize};

/// Ordered `(name, value)` header pairs. A `Vec` rather than a map: §3
/// requires insertion order and duplicate names to survive the wire.
pub type HeaderList = Vec<(String, String)>;

/// Numeric "unknown" marker for fields on [`RequestIn`] that don't yet
/// have a value (response code/millis/size before the response exists).
pub const UNKNOWN: i64 = -1;

/// The pre-request (and, on Post, post-response) fingerprint sent to the
/// agent. See §3 "RequestIn".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestIn {
    pub module_version: String,
    pub server_version: String,
    pub server_flavor: String,
    pub server_name: String,
    pub timestamp: i64,
    pub now_millis: i64,
    pub remote_addr: String,
    pub method: String,
    pub scheme: String,
    pub uri: String,
    pub protocol: String,
    pub tls_protocol: String,
    pub tls_cipher: String,
    /// Precomputed verdict, set only when this `RequestIn` is built for a
    /// Post call after the response (§3 invariant).
    pub waf_response: i64,
    pub response_code: i64,
    pub response_millis: i64,
    pub response_size: i64,
    pub headers_in: HeaderList,
    /// `None` except on Post (§3 "nil except on Post").
    pub headers_out: Option<HeaderList>,
    #[serde(with = "serde_bytes")]
    pub post_body: Vec<u8>,
}

impl RequestIn {
    /// A `RequestIn` with every response-side field set to the "not yet
    /// known" sentinel (§3 invariant: -1 for code/millis/size, nil
    /// headers, no body).
    pub fn pre_request(
        module_version: String,
        server_version: String,
        server_flavor: String,
        server_name: String,
        timestamp: i64,
        now_millis: i64,
        remote_addr: String,
        method: String,
        scheme: String,
        uri: String,
        protocol: String,
        tls_protocol: String,
        tls_cipher: String,
        headers_in: HeaderList,
        post_body: Vec<u8>,
    ) -> Self {
        RequestIn {
            module_version,
            server_version,
            server_flavor,
            server_name,
            timestamp,
            now_millis,
            remote_addr,
            method,
            scheme,
            uri,
            protocol,
            tls_protocol,
            tls_cipher,
            waf_response: UNKNOWN,
            response_code: UNKNOWN,
            response_millis: UNKNOWN,
            response_size: UNKNOWN,
            headers_in,
            headers_out: None,
            post_body,
        }
    }
}

/// The update fingerprint sent after the response, when PreRequest issued
/// a request id. See §3 "RequestInFollowup".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestInFollowup {
    pub request_id: String,
    pub response_code: i64,
    pub response_millis: i64,
    pub response_size: i64,
    pub headers_out: HeaderList,
}

/// Opcode for a response-header mutation (§3 "HeaderAction").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderOp {
    Add,
    Set,
    SetIfAbsent,
    Del,
}

/// A single response-header mutation returned by the agent (§3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderAction {
    pub op: HeaderOp,
    pub name: String,
    /// Absent for `Del`, which needs only a name.
    pub value: Option<String>,
}

impl HeaderAction {
    pub fn add(name: impl Into<String>, value: impl Into<String>) -> Self {
        HeaderAction {
            op: HeaderOp::Add,
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        HeaderAction {
            op: HeaderOp::Set,
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn set_if_absent(name: impl Into<String>, value: impl Into<String>) -> Self {
        HeaderAction {
            op: HeaderOp::SetIfAbsent,
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn del(name: impl Into<String>) -> Self {
        HeaderAction {
            op: HeaderOp::Del,
            name: name.into(),
            value: None,
        }
    }
}

/// The agent's verdict (§3 "ResponseOut").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseOut {
    pub waf_response: i64,
    /// Opaque correlation token. Presence mandates an UpdateRequest
    /// follow-up rather than a PostRequest (§3 invariant, §4.3).
    pub request_id: Option<String>,
    pub request_headers: HeaderList,
    pub response_headers: Vec<HeaderAction>,
}
