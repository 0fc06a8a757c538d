use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::{ready, Ready};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use token_lifecycle::{AuthenticationGate, Claims, Rejection};
use uuid::Uuid;

/// User ID extracted from JWT (only when `sub` is a UUID)
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

/// Verified token and its claims, available to handlers behind the middleware
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub token: String,
    pub claims: Claims,
}

/// JWT Authentication Middleware
///
/// Runs every request through the [`AuthenticationGate`]; any rejection ends
/// the request with 403 and the rejection's fixed message.
///
/// The client IP is the socket peer. `X-Forwarded-For` is honoured only when
/// the peer is one of the configured trusted proxies.
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    gate: Arc<AuthenticationGate>,
    trusted_proxies: Arc<HashSet<String>>,
}

impl JwtAuthMiddleware {
    pub fn new(gate: Arc<AuthenticationGate>) -> Self {
        Self {
            gate,
            trusted_proxies: Arc::new(HashSet::new()),
        }
    }

    pub fn with_trusted_proxies(mut self, trusted_proxies: Vec<String>) -> Self {
        let proxy_set: HashSet<String> = trusted_proxies
            .into_iter()
            .filter_map(|ip| {
                let trimmed = ip.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect();
        self.trusted_proxies = Arc::new(proxy_set);
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            gate: self.gate.clone(),
            trusted_proxies: self.trusted_proxies.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    gate: Arc<AuthenticationGate>,
    trusted_proxies: Arc<HashSet<String>>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let gate = self.gate.clone();
        let client_ip = client_ip(&req, &self.trusted_proxies);

        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string);

            let identity = gate
                .authenticate(client_ip.as_deref(), auth_header.as_deref())
                .await
                .map_err(reject)?;

            if let Ok(user_id) = Uuid::parse_str(&identity.claims.sub) {
                req.extensions_mut().insert(UserId(user_id));
            }
            req.extensions_mut().insert(AuthenticatedUser {
                token: identity.token,
                claims: identity.claims,
            });

            service.call(req).await
        })
    }
}

/// Peer address, or the first `X-Forwarded-For` hop when the peer is a trusted proxy
fn client_ip(req: &ServiceRequest, trusted_proxies: &HashSet<String>) -> Option<String> {
    let peer_ip = req.peer_addr()?.ip().to_string();
    if !trusted_proxies.contains(&peer_ip) {
        return Some(peer_ip);
    }

    let forwarded = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| {
            header
                .split(',')
                .map(|part| part.trim())
                .find(|part| !part.is_empty())
                .map(|part| part.to_string())
        });
    Some(forwarded.unwrap_or(peer_ip))
}

fn reject(rejection: Rejection) -> Error {
    actix_web::error::ErrorForbidden(rejection.message())
}

/// FromRequest implementation for UserId
impl actix_web::FromRequest for UserId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<UserId>() {
            Some(user_id) => ready(Ok(*user_id)),
            None => ready(Err(actix_web::error::ErrorUnauthorized(
                "User not authenticated",
            ))),
        }
    }
}

impl actix_web::FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(actix_web::error::ErrorForbidden(
                Rejection::NoToken.message(),
            ))),
        }
    }
}
