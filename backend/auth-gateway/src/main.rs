/// Auth Gateway Main Entry Point
///
/// Starts the HTTP server with:
/// - Token lifecycle tracker (persisted lists + periodic cleanup)
/// - Redis-backed cache mirror, or an in-memory cache when REDIS_URL is unset
/// - JWT authentication middleware on `/api/v1`
use actix_web::{web, App, HttpServer};
use actix_middleware::JwtAuthMiddleware;
use anyhow::{Context, Result};
use auth_gateway::{config::Settings, routes};
use nova_cache::{CacheMetrics, MemoryCache, NamespacedCache, RedisCache};
use prometheus::Registry;
use std::sync::Arc;
use token_lifecycle::{
    AuthenticationGate, LifecycleTracker, PayloadDecoder, Rs256Verifier, StaticIpReputation,
    SystemClock,
};
use tokio::sync::Mutex;
use tracing::info;
use tracing_actix_web::TracingLogger;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "auth_gateway=info,token_lifecycle=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting auth gateway");

    let settings = Settings::from_env().context("Failed to load configuration")?;
    info!(
        host = %settings.server.host,
        port = settings.server.port,
        redis = settings.redis_url.is_some(),
        "Configuration loaded"
    );

    let registry = Registry::new();
    CacheMetrics::register(&registry).context("Failed to register cache metrics")?;
    token_lifecycle::metrics::register(&registry)
        .context("Failed to register token lifecycle metrics")?;

    let cache: Arc<dyn NamespacedCache> = match &settings.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid REDIS_URL")?;
            let manager = redis::aio::ConnectionManager::new(client)
                .await
                .context("Failed to connect to Redis")?;
            info!("Redis connection established");
            Arc::new(RedisCache::new(Arc::new(Mutex::new(manager))))
        }
        None => {
            info!("REDIS_URL not set, using in-memory token cache");
            Arc::new(MemoryCache::new())
        }
    };

    let tracker = Arc::new(
        LifecycleTracker::new(
            settings.lifecycle.clone(),
            cache,
            Arc::new(PayloadDecoder),
            Arc::new(SystemClock),
        )
        .context("Failed to build token lifecycle tracker")?,
    );
    tracker
        .start()
        .await
        .context("Failed to start token cleanup")?;

    let verifier = Rs256Verifier::from_public_pem(&settings.jwt.public_key_pem)
        .context("Invalid JWT_PUBLIC_KEY_PEM")?
        .with_leeway(settings.jwt.leeway_secs);
    let ip_reputation = StaticIpReputation::with_blocklist(
        Arc::new(SystemClock),
        settings.ip_blocklist.iter().cloned(),
    );
    let gate = Arc::new(AuthenticationGate::new(
        tracker.clone(),
        Arc::new(verifier),
        Arc::new(ip_reputation),
    ));
    let auth = JwtAuthMiddleware::new(gate).with_trusted_proxies(settings.trusted_proxies.clone());

    let bind_addr = (settings.server.host.clone(), settings.server.port);
    info!("HTTP server listening on {}:{}", bind_addr.0, bind_addr.1);

    let tracker_data = web::Data::new(tracker.clone());
    let registry_data = web::Data::new(registry);
    let server = HttpServer::new(move || {
        let auth = auth.clone();
        App::new()
            .wrap(TracingLogger::default())
            .app_data(tracker_data.clone())
            .app_data(registry_data.clone())
            .configure(|cfg| routes::configure(cfg, auth))
    })
    .bind(bind_addr)
    .context("Failed to bind HTTP server")?
    .run();

    let result = server.await.context("HTTP server error");

    tracker.shutdown().await;
    info!("Auth gateway stopped");
    result
}
