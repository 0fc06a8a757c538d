//! Auth gateway service
//!
//! Hosts the token lifecycle tracker behind an actix-web server: every
//! `/api/v1` route passes through [`actix_middleware::JwtAuthMiddleware`].

pub mod config;
pub mod handlers;
pub mod routes;
