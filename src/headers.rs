//! Header list helpers shared by the transport-facing schema (§3) and the
//! request/response header side effects (§4.1 step 5, §6).

use crate::message::{HeaderAction, HeaderList, HeaderOp};
use http::header::HeaderMap;
use http::Uri;

pub const AGENT_RESPONSE: &str = "X-Sigsci-Agentresponse";
pub const REQUEST_ID: &str = "X-Sigsci-Requestid";
pub const TAGS: &str = "X-Sigsci-Tags";
pub const REDIRECT: &str = "X-Sigsci-Redirect";
const SIGSCI_PREFIX: &str = "x-sigsci-";

/// Build the ordered header list sent to the agent. `http::HeaderMap`
/// already iterates in insertion order and yields every value for
/// repeated names (`iter()` walks each stored entry, not just the first
/// per name), which is exactly what §3's invariant requires — no
/// additional bookkeeping needed here beyond the `Host` reinsertion rule.
///
/// Per §3/§6: if the host framework keeps the request-line host out of
/// the header map (as `http::Request` does, via `uri.authority()`), it is
/// reinserted as the first entry.
pub fn capture_request_headers(headers: &HeaderMap, uri: &Uri) -> HeaderList {
    let mut out = Vec::with_capacity(headers.len() + 1);

    if headers.get(http::header::HOST).is_none() {
        if let Some(authority) = uri.authority() {
            out.push(("Host".to_string(), authority.as_str().to_string()));
        }
    }

    out.extend(capture_header_list(headers));
    out
}

/// Plain ordered capture with no `Host` reinsertion, used for the outbound
/// response side of `RequestIn`/`RequestInFollowup` (§3 "response header
/// list"), which has no request-line host to restore.
pub fn capture_header_list(headers: &HeaderMap) -> HeaderList {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

/// Apply the agent's verdict-time request-header mutations to the inbound
/// request (§4.1 step 5, §6, §8 invariant 5).
///
/// - `X-Sigsci-Agentresponse` is set to the verdict code (decimal).
/// - `X-Sigsci-Requestid` is set to the returned id, or removed if none.
/// - `X-Sigsci-Tags` and `X-Sigsci-Redirect` are cleared before the
///   agent-supplied list is applied.
/// - Header pairs whose canonical name starts with `X-Sigsci-` replace any
///   existing values; all others append, in order.
pub fn apply_request_header_effects(
    headers: &mut HeaderMap,
    waf_response: i64,
    request_id: Option<&str>,
    agent_request_headers: &[(String, String)],
) {
    set_single(headers, AGENT_RESPONSE, &waf_response.to_string());

    match request_id {
        Some(id) => set_single(headers, REQUEST_ID, id),
        None => {
            headers.remove(REQUEST_ID);
        }
    }

    headers.remove(TAGS);
    headers.remove(REDIRECT);

    for (name, value) in agent_request_headers {
        let is_sigsci = name.len() >= SIGSCI_PREFIX.len()
            && name.as_bytes()[..SIGSCI_PREFIX.len()].eq_ignore_ascii_case(SIGSCI_PREFIX.as_bytes());

        let (Ok(header_name), Ok(header_value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) else {
            continue;
        };

        if is_sigsci {
            headers.insert(header_name, header_value);
        } else {
            headers.append(header_name, header_value);
        }
    }
}

fn set_single(headers: &mut HeaderMap, name: &str, value: &str) {
    if let Ok(v) = http::header::HeaderValue::from_str(value) {
        headers.insert(http::header::HeaderName::from_bytes(name.as_bytes()).unwrap(), v);
    }
}

/// Apply one response-header action (§3, §4.4). `Set`/`Del`/`SetIfAbsent`
/// act on all values for `name`; `Add` appends. Actions are applied in
/// order, so a `Set` followed by a `Del` for the same name resolves with
/// the `Del` winning (§9 "last-writer-wins inside the single application
/// pass") simply because we replay them sequentially against the same map.
pub fn apply_response_header_action(headers: &mut HeaderMap, action: &HeaderAction) {
    let name = match http::header::HeaderName::from_bytes(action.name.as_bytes()) {
        Ok(n) => n,
        Err(_) => return,
    };

    match action.op {
        HeaderOp::Add => {
            if let Some(value) = &action.value {
                if let Ok(v) = http::header::HeaderValue::from_str(value) {
                    headers.append(name, v);
                }
            }
        }
        HeaderOp::Set => {
            headers.remove(&name);
            if let Some(value) = &action.value {
                if let Ok(v) = http::header::HeaderValue::from_str(value) {
                    headers.insert(name, v);
                }
            }
        }
        HeaderOp::SetIfAbsent => {
            let absent = headers.get(&name).map(|v| v.is_empty()).unwrap_or(true);
            if absent {
                if let Some(value) = &action.value {
                    if let Ok(v) = http::header::HeaderValue::from_str(value) {
                        headers.insert(name, v);
                    }
                }
            }
        }
        HeaderOp::Del => {
            headers.remove(&name);
        }
    }
}
