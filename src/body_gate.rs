//! Body-read gate (§4.5): a pure predicate over content length and
//! content type, with no side effects on the request itself — the
//! lifecycle (§4.1 step 3) is the only place that actually drains a body.

use crate::config::ModuleConfig;

/// Evaluate whether the request body should be buffered.
///
/// `has_body` stands in for "a body reader exists" (§4.5 condition 1):
/// hosts that distinguish a bodyless request (e.g. `GET` with no
/// `Content-Length`) from an always-present-but-empty reader should pass
/// `false` for the former.
pub fn should_buffer(cfg: &ModuleConfig, has_body: bool, content_length: Option<u64>, content_type: Option<&str>) -> bool {
    if !has_body {
        return false;
    }

    let length_ok = match content_length {
        Some(0) => false,
        Some(n) => n <= cfg.max_content_length,
        None => cfg.allow_unknown_content_length,
    };
    if !length_ok {
        return false;
    }

    content_type_is_inspectable(cfg, content_type)
}

/// §4.5 condition 3: case-insensitive, first-match-wins family test.
fn content_type_is_inspectable(cfg: &ModuleConfig, content_type: Option<&str>) -> bool {
    let ct = match content_type {
        None => return true,
        Some(v) if v.is_empty() => return true,
        Some(v) => v,
    };

    // A comma-separated list or (by construction, since hosts fold
    // repeated headers into one `HeaderMap` entry joined by `, `) a
    // header with multiple values implies structured content regardless
    // of which family it names.
    if ct.contains(',') {
        return true;
    }

    let lower = ct.to_ascii_lowercase();

    if lower.starts_with("application/x-www-form-urlencoded") {
        return true;
    }
    if lower.starts_with("multipart/form-data") {
        return true;
    }
    if lower.contains("json") || lower.contains("javascript") {
        return true;
    }
    if lower.starts_with("text/xml") || lower.starts_with("application/xml") || lower.contains("+xml") {
        return true;
    }
    if lower.starts_with("application/grpc") {
        return true;
    }
    if lower.starts_with("application/graphql") {
        return true;
    }

    if let Some(extra) = &cfg.extra_content_type {
        if extra(&lower) {
            return true;
        }
    }

    false
}
