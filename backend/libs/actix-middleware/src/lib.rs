//! # Actix Middleware Library
//!
//! Actix integration for token lifecycle tracking
//!
//! ## Modules
//! - `jwt_auth`: authentication middleware backed by
//!   [`token_lifecycle::AuthenticationGate`], plus request extractors

pub mod jwt_auth;

pub use jwt_auth::{AuthenticatedUser, JwtAuthMiddleware, UserId};
