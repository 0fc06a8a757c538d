use crate::handlers;
use actix_middleware::JwtAuthMiddleware;
use actix_web::web;

/// Public probes plus the authenticated `/api/v1` scope.
///
/// Handlers expect `web::Data<Arc<LifecycleTracker>>` and `web::Data<Registry>`
/// to be registered on the app.
pub fn configure(cfg: &mut web::ServiceConfig, auth: JwtAuthMiddleware) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/metrics", web::get().to(handlers::metrics))
        .service(
            web::scope("/api/v1")
                .wrap(auth)
                .route("/me", web::get().to(handlers::me))
                .route("/auth/logout", web::post().to(handlers::logout))
                .route("/auth/expire", web::post().to(handlers::expire)),
        );
}
