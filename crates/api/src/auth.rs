//! Bearer-token authentication for the order endpoints.
//!
//! Every `/orders` route sits behind [`require_auth`], which resolves the
//! `Authorization: Bearer <token>` header to a [`Caller`] and stores it in
//! the request extensions. Handlers that need a particular role ask for it
//! with the [`Caller`] or [`Admin`] extractors.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::config::Config;
use crate::error::ApiError;

/// What an authenticated caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Canteen staff: create, read, update and move orders.
    Staff,
    /// Staff plus deleting and importing orders.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

/// The authenticated identity attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub role: Role,
}

/// Maps configured bearer tokens to roles.
#[derive(Debug, Clone, Default)]
pub struct TokenAuthenticator {
    tokens: HashMap<String, Role>,
}

impl TokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an authenticator from `STAFF_TOKENS` and `ADMIN_TOKENS`.
    ///
    /// A token listed under both gets the admin role.
    pub fn from_config(config: &Config) -> Self {
        let mut auth = Self::new();
        for token in &config.staff_tokens {
            auth = auth.with_token(token.clone(), Role::Staff);
        }
        for token in &config.admin_tokens {
            auth = auth.with_token(token.clone(), Role::Admin);
        }
        auth
    }

    /// Registers `token` for `role`, replacing any earlier registration.
    pub fn with_token(mut self, token: impl Into<String>, role: Role) -> Self {
        self.tokens.insert(token.into(), role);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Resolves the bearer token in `headers` to a caller.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Caller, ApiError> {
        let token = bearer_token(headers)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        self.tokens
            .get(token)
            .map(|&role| Caller { role })
            .ok_or_else(|| ApiError::Unauthorized("invalid bearer token".to_string()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Middleware that rejects unauthenticated requests with 401.
pub async fn require_auth(
    State(auth): State<Arc<TokenAuthenticator>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match auth.authenticate(request.headers()) {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            Ok(next.run(request).await)
        }
        Err(err) => {
            metrics::counter!("auth_rejections_total").increment(1);
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "rejected unauthenticated request"
            );
            Err(err)
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .copied()
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))
    }
}

/// Extractor that only admits admin callers; staff get 403.
#[derive(Debug, Clone, Copy)]
pub struct Admin(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        if caller.role != Role::Admin {
            tracing::warn!(role = caller.role.as_str(), path = %parts.uri.path(), "admin role required");
            return Err(ApiError::Forbidden("admin role required".to_string()));
        }
        Ok(Admin(caller))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    fn authenticator() -> TokenAuthenticator {
        TokenAuthenticator::new()
            .with_token("counter", Role::Staff)
            .with_token("manager", Role::Admin)
    }

    #[test]
    fn resolves_known_tokens_to_roles() {
        let auth = authenticator();
        assert_eq!(
            auth.authenticate(&headers("Bearer counter")).unwrap().role,
            Role::Staff
        );
        assert_eq!(
            auth.authenticate(&headers("bearer manager")).unwrap().role,
            Role::Admin
        );
    }

    #[test]
    fn rejects_missing_malformed_and_unknown_tokens() {
        let auth = authenticator();
        assert!(auth.authenticate(&HeaderMap::new()).is_err());
        assert!(auth.authenticate(&headers("counter")).is_err());
        assert!(auth.authenticate(&headers("Basic counter")).is_err());
        assert!(auth.authenticate(&headers("Bearer ")).is_err());
        assert!(auth.authenticate(&headers("Bearer stranger")).is_err());
    }

    #[test]
    fn admin_listing_wins_over_staff() {
        let config = Config {
            staff_tokens: vec!["shared".into(), "counter".into()],
            admin_tokens: vec!["shared".into()],
            ..Config::default()
        };
        let auth = TokenAuthenticator::from_config(&config);

        assert_eq!(
            auth.authenticate(&headers("Bearer shared")).unwrap().role,
            Role::Admin
        );
        assert_eq!(
            auth.authenticate(&headers("Bearer counter")).unwrap().role,
            Role::Staff
        );
    }

    #[test]
    fn empty_config_has_no_tokens() {
        assert!(TokenAuthenticator::from_config(&Config::default()).is_empty());
    }
}
