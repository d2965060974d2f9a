//! Integration tests for the single-shared binding variant.

use axum::http::StatusCode;
use tower::ServiceExt;

use tunnel_gateway::config::BindingVariant;

mod common;
use common::*;

fn shared_config() -> tunnel_gateway::GatewayConfig {
    let mut config = test_config();
    config.session.variant = BindingVariant::SingleShared;
    config
}

#[tokio::test]
async fn resolution_redirects_without_a_cookie() {
    let transport = MockTransport::new(TEST_HOST);
    transport.add_tenant("t1", echo_tenant("t1"));
    let router = gateway(shared_config(), transport);

    let resp = router.oneshot(get(TEST_HOST, "/t1/page")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(set_cookies(&resp).is_empty());
}

#[tokio::test]
async fn last_resolved_tenant_wins_for_every_client() {
    let transport = MockTransport::new(TEST_HOST);
    transport.add_tenant("t1", echo_tenant("t1"));
    transport.add_tenant("t2", echo_tenant("t2"));
    let router = gateway(shared_config(), transport);

    router.clone().oneshot(get(TEST_HOST, "/t1/x")).await.unwrap();
    let resp = router.clone().oneshot(get(TEST_HOST, "/")).await.unwrap();
    assert_eq!(body_string(resp).await, "t1:/");

    // Re-resolution replaces the process-wide binding for everyone.
    router.clone().oneshot(get(TEST_HOST, "/t2/x")).await.unwrap();
    let resp = router.oneshot(get(TEST_HOST, "/")).await.unwrap();
    assert_eq!(body_string(resp).await, "t2:/");
}

#[tokio::test]
async fn stale_shared_binding_falls_through() {
    let transport = MockTransport::new(TEST_HOST);
    transport.add_tenant("t1", echo_tenant("t1"));
    let router = gateway(shared_config(), transport.clone());

    router.clone().oneshot(get(TEST_HOST, "/t1/x")).await.unwrap();
    transport.remove_tenant("t1");

    let resp = router.clone().oneshot(get(TEST_HOST, "/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // The binding was dropped, not retried.
    let resp = router.oneshot(get(TEST_HOST, "/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
