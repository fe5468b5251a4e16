//! §8 scenario 4 ("Update with tags") and invariants 4–5: a request id in
//! the verdict dispatches exactly one `UpdateRequest` (never `PostRequest`)
//! and agent-supplied `X-Sigsci-`-prefixed headers are visible to the
//! handler with replace semantics.

mod common;

use common::{setup_logger, CapturingHandler, RecordingSink};
use http::Request;
use sigsci_agent_module::testing::FakeInspector;
use sigsci_agent_module::{Body, Module, ModuleConfig, Network, ResponseOut};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn update_with_tags_dispatches_exactly_one_update_request() {
    setup_logger();

    let fake = Arc::new(FakeInspector::with_verdict(ResponseOut {
        waf_response: 200,
        request_id: Some("0123456789abcdef01234567".to_string()),
        request_headers: vec![("X-SigSci-Tags".to_string(), "XSS".to_string())],
        ..Default::default()
    }));
    let config = ModuleConfig::builder()
        .socket(Network::Unix, "/tmp/unused-sigsci-update.sock")
        .custom_inspector(fake.clone(), None, None)
        .build()
        .unwrap();

    let (handler, captured) = CapturingHandler::new_shared();
    let module = Module::wrap(handler, config).await;

    let req = Request::builder()
        .method("POST")
        .uri("http://example.com/x")
        .header("content-type", "application/json")
        .body(Body::from_bytes(&b"{}"[..]))
        .unwrap();

    let mut sink = RecordingSink::default();
    module.handle(&mut sink, req).await;

    let seen = captured.lock().unwrap();
    let seen = seen.as_ref().expect("handler ran");
    assert_eq!(seen.headers.get("x-sigsci-requestid").unwrap(), "0123456789abcdef01234567");
    assert_eq!(seen.headers.get("x-sigsci-tags").unwrap(), "XSS");
    drop(seen);

    // Background dispatch is fire-and-forget from the handler's point of
    // view; give the spawned task a moment to land.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let updates = fake.update_request_calls.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].request_id, "0123456789abcdef01234567");
    assert_eq!(updates[0].response_code, 200);
    assert!(fake.post_request_calls.lock().unwrap().is_empty());
}
