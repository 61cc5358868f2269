// Authentication middleware and extractors
// Decision: Route groups share one AuthGuard and differ only by their allow-list
// Decision: CORS preflight never reaches the guard
// Decision: An unconfigured provider fails fast with 503 before any token handling

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

use super::{
    config::AuthConfig,
    cookies::{CookiePolicy, SessionCookies},
    error::AuthError,
    guard::AuthGuard,
    provider::{Identity, IdentityProvider, ProviderHandle},
};

/// Auth state shared across routes
#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AuthConfig>,
    pub provider: Arc<ProviderHandle>,
    pub cookies: SessionCookies,
    provider_configured: bool,
}

impl AuthState {
    /// Build state from configuration. The cookie policy is derived here,
    /// once, and reused for every cookie this process writes.
    pub fn new(config: AuthConfig) -> Self {
        let provider = Arc::new(ProviderHandle::new(config.supabase.clone()));
        Self::from_parts(config, provider)
    }

    /// Build state around an already constructed provider client.
    pub fn with_provider(config: AuthConfig, provider: Arc<dyn IdentityProvider>) -> Self {
        Self::from_parts(config, Arc::new(ProviderHandle::with_provider(provider)))
    }

    fn from_parts(config: AuthConfig, provider: Arc<ProviderHandle>) -> Self {
        let policy = CookiePolicy::from_origin(&config.frontend_origin);
        tracing::info!(
            origin = %config.frontend_origin,
            same_site = ?policy.same_site,
            secure = policy.secure,
            "Cookie policy configured"
        );
        let provider_configured = provider.is_configured();

        Self {
            config: Arc::new(config),
            provider,
            cookies: SessionCookies::new(policy),
            provider_configured,
        }
    }

    pub fn is_provider_configured(&self) -> bool {
        self.provider_configured
    }

    pub fn guard(&self) -> AuthGuard {
        AuthGuard::new(self.provider.clone(), self.cookies)
    }

    /// Compose the guard middleware for one route group.
    pub fn composed_guard(&self, allow_list: Vec<AllowListEntry>) -> GuardComposer {
        build_auth_guard(self.guard(), allow_list, self.provider_configured)
    }
}

/// How the request's identity was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Presented access token was accepted
    AccessToken,
    /// Session was renewed from the refresh cookie during this request
    Refreshed,
}

/// Authenticated user attached to the request by the guard
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    pub method: AuthMethod,
}

/// Extractor for the guard's identity; 401 on routes the guard did not run for.
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(AuthError::missing_credential)
    }
}

/// Request predicate used by [`AllowListEntry::Predicate`]
pub type RequestPredicate = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Route matcher exempt from authentication
#[derive(Clone)]
pub enum AllowListEntry {
    /// Exact path equality
    PathExact(String),
    /// Regex tested against the path
    PathPattern(Regex),
    /// Arbitrary test on the request
    Predicate(RequestPredicate),
}

impl AllowListEntry {
    pub fn exact(path: impl Into<String>) -> Self {
        AllowListEntry::PathExact(path.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(AllowListEntry::PathPattern)
    }

    pub fn predicate(f: impl Fn(&Request) -> bool + Send + Sync + 'static) -> Self {
        AllowListEntry::Predicate(Arc::new(f))
    }

    pub fn matches(&self, request: &Request) -> bool {
        let path = request.uri().path();
        match self {
            AllowListEntry::PathExact(expected) => path == expected,
            AllowListEntry::PathPattern(pattern) => pattern.is_match(path),
            AllowListEntry::Predicate(predicate) => predicate(request),
        }
    }
}

impl std::fmt::Debug for AllowListEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllowListEntry::PathExact(path) => f.debug_tuple("PathExact").field(path).finish(),
            AllowListEntry::PathPattern(re) => {
                f.debug_tuple("PathPattern").field(&re.as_str()).finish()
            }
            AllowListEntry::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// [`AuthGuard`] wrapped with a bypass allow-list, installable as middleware
/// via [`require_auth`].
#[derive(Clone)]
pub struct GuardComposer {
    guard: AuthGuard,
    allow_list: Arc<[AllowListEntry]>,
    provider_configured: bool,
}

/// Compose a guard for one route group.
pub fn build_auth_guard(
    guard: AuthGuard,
    allow_list: Vec<AllowListEntry>,
    provider_configured: bool,
) -> GuardComposer {
    GuardComposer {
        guard,
        allow_list: allow_list.into(),
        provider_configured,
    }
}

impl GuardComposer {
    /// Preflight requests and allow-listed routes skip authentication.
    pub fn is_bypassed(&self, request: &Request) -> bool {
        request.method() == Method::OPTIONS
            || self.allow_list.iter().any(|entry| entry.matches(request))
    }

    pub async fn handle(&self, mut request: Request, next: Next) -> Response {
        if self.is_bypassed(&request) {
            return next.run(request).await;
        }

        if !self.provider_configured {
            return AuthError::ServiceUnavailable(
                "identity provider is not configured".to_string(),
            )
            .into_response();
        }

        let (jar, result) = self.guard.authenticate(request.headers()).await;
        match result {
            Ok(user) => {
                request.extensions_mut().insert(user);
                let response = next.run(request).await;
                (jar, response).into_response()
            }
            Err(e) => (jar, e).into_response(),
        }
    }
}

/// Middleware function for `axum::middleware::from_fn_with_state`
pub async fn require_auth(
    State(composer): State<GuardComposer>,
    request: Request,
    next: Next,
) -> Response {
    composer.handle(request, next).await
}
