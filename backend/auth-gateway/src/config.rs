//! Configuration management for the auth gateway
//!
//! Loaded from environment variables; a `.env` file is honoured in debug
//! builds. Token lifecycle settings come from [`LifecycleConfig::from_env`].

use anyhow::{Context, Result};
use std::env;
use token_lifecycle::{parse_ip_list, LifecycleConfig};
use tracing::info;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    /// In-memory cache when unset (single-process deployments)
    pub redis_url: Option<String>,
    pub jwt: JwtSettings,
    pub ip_blocklist: Vec<String>,
    /// Peers whose `X-Forwarded-For` header is trusted for the client IP
    pub trusted_proxies: Vec<String>,
    pub lifecycle: LifecycleConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        Ok(Self {
            server: ServerSettings::from_env()?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            jwt: JwtSettings::from_env()?,
            ip_blocklist: env::var("IP_BLOCKLIST")
                .map(|raw| parse_ip_list(&raw))
                .unwrap_or_default(),
            trusted_proxies: env::var("TRUSTED_PROXIES")
                .map(|raw| parse_ip_list(&raw))
                .unwrap_or_default(),
            lifecycle: LifecycleConfig::from_env().context("Invalid token lifecycle configuration")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
        })
    }
}

#[derive(Clone)]
pub struct JwtSettings {
    /// RS256 verification key (PEM)
    pub public_key_pem: String,
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("public_key_pem", &"<redacted>")
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        let pem = env::var("JWT_PUBLIC_KEY_PEM").context("JWT_PUBLIC_KEY_PEM must be set")?;
        Ok(Self {
            // Single-line env values carry escaped newlines
            public_key_pem: pem.replace("\\n", "\n"),
            leeway_secs: env::var("JWT_LEEWAY_SECS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .context("Invalid JWT_LEEWAY_SECS")?,
        })
    }
}
