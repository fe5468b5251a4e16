//! §8 invariant 5, exercised end to end: `X-Sigsci-`-prefixed
//! agent-returned request headers replace; everything else appends.

mod common;

use common::{setup_logger, CapturingHandler, RecordingSink};
use http::Request;
use sigsci_agent_module::testing::FakeInspector;
use sigsci_agent_module::{Body, Module, ModuleConfig, Network, ResponseOut};
use std::sync::Arc;

#[tokio::test]
async fn sigsci_prefixed_headers_replace_others_append() {
    setup_logger();

    let fake = Arc::new(FakeInspector::with_verdict(ResponseOut {
        waf_response: 200,
        request_headers: vec![
            ("X-Sigsci-Tags".to_string(), "XSS".to_string()),
            ("x-forwarded-for".to_string(), "10.0.0.1".to_string()),
        ],
        ..Default::default()
    }));
    let config = ModuleConfig::builder()
        .socket(Network::Unix, "/tmp/unused-sigsci-headers.sock")
        .custom_inspector(fake, None, None)
        .build()
        .unwrap();

    let (handler, captured) = CapturingHandler::new_shared();
    let module = Module::wrap(handler, config).await;

    let req = Request::builder()
        .method("GET")
        .uri("http://example.com/")
        .header("x-forwarded-for", "192.168.1.1")
        .body(Body::empty())
        .unwrap();

    let mut sink = RecordingSink::default();
    module.handle(&mut sink, req).await;

    let seen = captured.lock().unwrap();
    let seen = seen.as_ref().unwrap();

    assert_eq!(seen.headers.get("x-sigsci-tags").unwrap(), "XSS");
    assert_eq!(seen.headers.get("x-sigsci-agentresponse").unwrap(), "200");

    let forwarded: Vec<_> = seen.headers.get_all("x-forwarded-for").iter().collect();
    assert_eq!(forwarded.len(), 2);
    assert_eq!(forwarded[0], "192.168.1.1");
    assert_eq!(forwarded[1], "10.0.0.1");
}
