//! §8 scenario 6 ("Fail-open on transport"): when the agent is
//! unreachable, the downstream handler still runs with the original
//! writer and no background call is made.

mod common;

use common::{setup_logger, FixedHandler, RecordingSink};
use http::{Request, StatusCode};
use sigsci_agent_module::testing::FakeInspector;
use sigsci_agent_module::{Body, Module, ModuleConfig, Network};
use std::sync::Arc;

#[tokio::test]
async fn unreachable_agent_falls_through_to_handler() {
    setup_logger();

    let fake = Arc::new(FakeInspector::unreachable());
    let config = ModuleConfig::builder()
        .socket(Network::Unix, "/tmp/unused-sigsci-failopen.sock")
        .custom_inspector(fake.clone(), None, None)
        .build()
        .unwrap();

    let module = Module::wrap(FixedHandler::ok("still served"), config).await;

    let req = Request::builder().method("GET").uri("http://example.com/").body(Body::empty()).unwrap();

    let mut sink = RecordingSink::default();
    module.handle(&mut sink, req).await;

    assert_eq!(sink.status, Some(StatusCode::OK));
    assert_eq!(sink.body, b"still served");
    assert!(fake.post_request_calls.lock().unwrap().is_empty());
    assert!(fake.update_request_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn module_init_failure_does_not_block_construction_or_serving() {
    setup_logger();

    // ModuleInit is a no-op on the fake (it always succeeds), but the
    // construction path must never be fatal regardless — this exercises
    // `Module::wrap` end to end, matching §4.2's "does not prevent the
    // module from serving traffic".
    let fake = Arc::new(FakeInspector::allow());
    let config = ModuleConfig::builder()
        .socket(Network::Unix, "/tmp/unused-sigsci-init.sock")
        .custom_inspector(fake, None, None)
        .build()
        .unwrap();

    let module = Module::wrap(FixedHandler::ok("served"), config).await;
    let req = Request::builder().method("GET").uri("http://example.com/").body(Body::empty()).unwrap();
    let mut sink = RecordingSink::default();
    module.handle(&mut sink, req).await;

    assert_eq!(sink.status, Some(StatusCode::OK));
}
