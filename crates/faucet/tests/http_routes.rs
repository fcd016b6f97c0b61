//! Router behaviour: status codes, bodies and origin identification.

mod support;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use faucet_common::types::Amount;
use faucet_service::api::{router, RouterOptions};
use faucet_service::{DispensePolicy, RateLimiter};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use support::{address, default_service, service_with, MockChain, FAUCET};
use tower::ServiceExt;

const OPTIONS: RouterOptions = RouterOptions {
    cors_enabled: true,
    trust_proxy: true,
    metrics_enabled: true,
};

fn app(chain: Arc<MockChain>) -> Router {
    router(Arc::new(default_service(chain)), OPTIONS)
}

fn request(method: Method, uri: &str, body: Body, peer: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .unwrap();
    let peer: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

fn raw_dispense(target: &str) -> Request<Body> {
    request(Method::POST, "/", Body::from(target.to_string()), "192.0.2.10:40000")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_raw_post_returns_tx_hash() {
    let chain = Arc::new(MockChain::new());
    let response = app(chain.clone())
        .oneshot(raw_dispense(address(7).as_str()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, format!("0x{:064x}", 1));
    assert_eq!(chain.sent()[0].to, address(7));
}

#[tokio::test]
async fn test_malformed_address_is_bad_request() {
    let chain = Arc::new(MockChain::new());
    let response = app(chain.clone()).oneshot(raw_dispense("0xdeadbeef")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "INVALID_ADDRESS");
    assert!(body["message"].as_str().unwrap().contains("0xdeadbeef"));
    assert_eq!(chain.rpc_calls(), 0);
}

#[tokio::test]
async fn test_greedy_is_forbidden() {
    let chain = Arc::new(MockChain::new());
    chain.set_balance(&address(8), Amount::ether(25));

    let response = app(chain).oneshot(raw_dispense(address(8).as_str())).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "GREEDY");
    assert_eq!(body["message"], "User is greedy.");
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let chain = Arc::new(MockChain::new());
    chain.fail_send.store(true, Ordering::SeqCst);

    let response = app(chain).oneshot(raw_dispense(address(9).as_str())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "RPC_ERROR");
}

#[tokio::test]
async fn test_rate_limit_uses_forwarded_origin() {
    let chain = Arc::new(MockChain::new());
    let service = service_with(
        chain,
        DispensePolicy::default(),
        RateLimiter::new(1, Duration::from_secs(900)),
    );
    let app = router(Arc::new(service), OPTIONS);

    let forwarded = |target: &str, client: &str| {
        let mut req = raw_dispense(target);
        req.headers_mut()
            .insert("x-forwarded-for", client.parse().unwrap());
        req
    };

    let first = app
        .clone()
        .oneshot(forwarded(address(1).as_str(), "203.0.113.1"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // Same socket peer, different client behind the proxy.
    let other = app
        .clone()
        .oneshot(forwarded(address(2).as_str(), "203.0.113.2"))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);

    let limited = app
        .clone()
        .oneshot(forwarded(address(3).as_str(), "203.0.113.1"))
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(body_json(limited).await["error"], "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn test_json_dispense() {
    let chain = Arc::new(MockChain::new());
    let body = serde_json::json!({ "address": address(5).as_str() }).to_string();
    let mut req = request(Method::POST, "/api/dispense", Body::from(body), "192.0.2.10:40000");
    req.headers_mut()
        .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());

    let response = app(chain).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["address"], address(5).as_str());
    assert_eq!(body["data"]["amount"], "1000000000000000000");
    assert!(body["data"]["tx_hash"].as_str().unwrap().starts_with("0x"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_status_reports_faucet_balance() {
    let chain = Arc::new(MockChain::new());
    chain.set_balance(
        &faucet_common::types::AccountAddress::normalize(FAUCET).unwrap(),
        Amount::ether(42),
    );

    let response = app(chain)
        .oneshot(request(Method::GET, "/api/status", Body::empty(), "192.0.2.10:40000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["address"], FAUCET);
    assert_eq!(body["data"]["balance"], "42000000000000000000");
    assert_eq!(body["data"]["total_distributions"], 0);
}

#[tokio::test]
async fn test_health_and_info() {
    let chain = Arc::new(MockChain::new());
    let app = app(chain);

    let health = app
        .clone()
        .oneshot(request(Method::GET, "/health", Body::empty(), "192.0.2.10:40000"))
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health).await["status"], "ok");

    let info = app
        .oneshot(request(Method::GET, "/", Body::empty(), "192.0.2.10:40000"))
        .await
        .unwrap();
    assert_eq!(info.status(), StatusCode::OK);
    assert_eq!(body_json(info).await["faucet_address"], FAUCET);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let chain = Arc::new(MockChain::new());
    let app = app(chain);

    let _ = app.clone().oneshot(raw_dispense("short")).await.unwrap();
    let response = app
        .oneshot(request(Method::GET, "/metrics", Body::empty(), "192.0.2.10:40000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("faucet_requests_total{outcome=\"invalid_address\"} 1"));
}

#[tokio::test]
async fn test_metrics_route_can_be_disabled() {
    let chain = Arc::new(MockChain::new());
    let options = RouterOptions {
        metrics_enabled: false,
        ..OPTIONS
    };
    let app = router(Arc::new(default_service(chain)), options);

    let response = app
        .oneshot(request(Method::GET, "/metrics", Body::empty(), "192.0.2.10:40000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
