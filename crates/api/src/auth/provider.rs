// Identity provider contract
// Decision: The provider is an injected trait object, never a module-level singleton
// Decision: The concrete client is built lazily on first use and memoized per AuthState

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::config::SupabaseConfig;
use super::error::AuthError;
use super::supabase::SupabaseProvider;

/// User record owned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Token pair issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: Identity,
}

impl Session {
    /// Both tokens present; only complete sessions are written to cookies.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

/// Result of a sign-up. `session` is `None` when the provider requires the
/// address to be confirmed before issuing tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: Identity,
    pub session: Option<Session>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("identity provider returned no user")]
    NoUser,

    #[error("identity provider returned an incomplete session")]
    IncompleteSession,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("invalid identity provider configuration: {0}")]
    Config(String),
}

impl ProviderError {
    /// Transport or server-side failure, as opposed to a verdict on the credential.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_) | ProviderError::Config(_))
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        if err.is_unavailable() {
            AuthError::ServiceUnavailable(err.to_string())
        } else {
            AuthError::invalid_credential()
        }
    }
}

/// Operations consumed from the identity provider.
///
/// Calls are fallible and may suspend; no retries happen at this layer.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the user an access token belongs to.
    async fn validate_access_token(&self, access_token: &str) -> Result<Identity, ProviderError>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ProviderError>;

    /// Revoke the session the access token belongs to.
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;
}

/// Lazily initialized handle to the identity provider client.
pub struct ProviderHandle {
    config: Option<SupabaseConfig>,
    client: OnceCell<Arc<dyn IdentityProvider>>,
}

impl ProviderHandle {
    /// Handle that builds a Supabase client from `config` on first use.
    pub fn new(config: Option<SupabaseConfig>) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub fn unconfigured() -> Self {
        Self::new(None)
    }

    /// Handle around an already constructed provider.
    pub fn with_provider(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            config: None,
            client: OnceCell::new_with(Some(provider)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some() || self.client.initialized()
    }

    /// Get the provider client, building it if needed.
    ///
    /// Fails with [`AuthError::ServiceUnavailable`] when no provider is
    /// configured or the client cannot be built.
    pub async fn resolve(&self) -> Result<Arc<dyn IdentityProvider>, AuthError> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let config = self.config.as_ref().ok_or_else(|| {
                    AuthError::ServiceUnavailable(
                        "identity provider is not configured (SUPABASE_URL / SUPABASE_ANON_KEY)"
                            .to_string(),
                    )
                })?;
                let provider = SupabaseProvider::new(config)?;
                tracing::info!(url = %config.url, "Identity provider client initialized");
                Ok::<Arc<dyn IdentityProvider>, AuthError>(Arc::new(provider))
            })
            .await?;

        Ok(client.clone())
    }
}
