use actix_middleware::JwtAuthMiddleware;
use actix_web::{test, web, App};
use async_trait::async_trait;
use auth_gateway::routes;
use nova_cache::MemoryCache;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use token_lifecycle::{
    AuthenticationGate, Claims, LifecycleConfig, LifecycleTracker, PayloadDecoder,
    StaticIpReputation, SystemClock, TokenVerifier,
};

/// Accepts `valid:<sub>` tokens that expire in ten minutes
struct PrefixVerifier;

#[async_trait]
impl TokenVerifier for PrefixVerifier {
    async fn verify(&self, token: &str) -> Option<Claims> {
        let sub = token.strip_prefix("valid:")?;
        let now = chrono::Utc::now().timestamp();
        Some(Claims {
            sub: sub.to_string(),
            iat: now,
            exp: now + 600,
            jti: None,
            token_type: Some("access".to_string()),
            email: Some(format!("{sub}@example.com")),
            username: None,
        })
    }
}

struct Harness {
    _dir: TempDir,
    tracker: Arc<LifecycleTracker>,
    gate: Arc<AuthenticationGate>,
    registry: Registry,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let config = LifecycleConfig {
        revoked_list_path: dir.path().join("revoked.json"),
        expired_list_path: dir.path().join("expired.json"),
        cache_namespace: "gateway_test".to_string(),
        ..LifecycleConfig::default()
    };
    let tracker = Arc::new(
        LifecycleTracker::new(
            config,
            Arc::new(MemoryCache::new()),
            Arc::new(PayloadDecoder),
            Arc::new(SystemClock),
        )
        .unwrap(),
    );
    let gate = Arc::new(AuthenticationGate::new(
        tracker.clone(),
        Arc::new(PrefixVerifier),
        Arc::new(StaticIpReputation::default()),
    ));
    let registry = Registry::new();
    token_lifecycle::metrics::register(&registry).unwrap();

    Harness {
        _dir: dir,
        tracker,
        gate,
        registry,
    }
}

fn peer() -> SocketAddr {
    "192.0.2.44:40000".parse().unwrap()
}

macro_rules! app {
    ($h:expr) => {{
        let gate = $h.gate.clone();
        test::init_service(
            App::new()
                .app_data(web::Data::new($h.tracker.clone()))
                .app_data(web::Data::new($h.registry.clone()))
                .configure(|cfg| routes::configure(cfg, JwtAuthMiddleware::new(gate))),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_health_is_public() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn test_me_returns_claims() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .peer_addr(peer())
        .insert_header(("Authorization", "Bearer valid:alice"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["sub"], "alice");
    assert_eq!(body["email"], "alice@example.com");
}

#[actix_web::test]
async fn test_logout_revokes_presented_token() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .peer_addr(peer())
        .insert_header(("Authorization", "Bearer valid:alice"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["revoked"], true);
    assert!(h.tracker.is_token_revoked("valid:alice").await);

    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .peer_addr(peer())
        .insert_header(("Authorization", "Bearer valid:alice"))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), 403);
    assert_eq!(err.to_string(), "token revoked");

    // Other tokens are unaffected
    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .peer_addr(peer())
        .insert_header(("Authorization", "Bearer valid:bob"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn test_expire_records_token_for_remaining_lifetime() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/expire")
        .peer_addr(peer())
        .insert_header(("Authorization", "Bearer valid:carol"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["expired"], true);
    let ttl = body["ttl_seconds"].as_u64().unwrap();
    assert!(ttl > 0 && ttl <= 600);

    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .peer_addr(peer())
        .insert_header(("Authorization", "Bearer valid:carol"))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.to_string(), "token expired");
}

#[actix_web::test]
async fn test_metrics_expose_rejections() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .peer_addr(peer())
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.to_string(), "no token");

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("token_gate_rejections_total"));
    assert!(text.contains("no_token"));
}
