// Authentication module
// Decision: Stateless session auth; identity lives with the provider, session in cookies
// Decision: Guard logic is independent of the routes it protects

pub mod config;
pub mod cookies;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod middleware;
pub mod provider;
pub mod routes;
pub mod supabase;

#[cfg(test)]
pub(crate) mod testing;

pub use config::AuthConfig;
pub use cookies::{CookiePolicy, SessionCookies};
pub use error::{AuthError, UnauthorizedReason};
pub use guard::AuthGuard;
pub use middleware::{
    build_auth_guard, require_auth, AllowListEntry, AuthMethod, AuthState, AuthUser,
    GuardComposer,
};
pub use provider::{Identity, IdentityProvider, ProviderError, ProviderHandle, Session};
pub use routes::routes;
