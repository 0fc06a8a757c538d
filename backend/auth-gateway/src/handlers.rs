use actix_middleware::AuthenticatedUser;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use token_lifecycle::LifecycleTracker;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub expires_at: i64,
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub async fn me(user: AuthenticatedUser) -> impl Responder {
    let claims = user.claims;
    HttpResponse::Ok().json(MeResponse {
        sub: claims.sub,
        email: claims.email,
        username: claims.username,
        expires_at: claims.exp,
    })
}

/// Revoke the token that authenticated this request
pub async fn logout(
    user: AuthenticatedUser,
    tracker: web::Data<Arc<LifecycleTracker>>,
) -> impl Responder {
    let newly_revoked = tracker.revoke_token(&user.token).await;
    HttpResponse::Ok().json(serde_json::json!({
        "revoked": true,
        "already_revoked": !newly_revoked,
    }))
}

/// Record the presented token as expired for the rest of its lifetime
pub async fn expire(
    user: AuthenticatedUser,
    tracker: web::Data<Arc<LifecycleTracker>>,
) -> impl Responder {
    let remaining = user.claims.exp.saturating_sub(Utc::now().timestamp()).max(1) as u64;
    tracker.expire_token(&user.token, remaining).await;
    HttpResponse::Ok().json(serde_json::json!({
        "expired": true,
        "ttl_seconds": remaining,
    }))
}

pub async fn metrics(registry: web::Data<Registry>) -> impl Responder {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
