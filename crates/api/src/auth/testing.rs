// Stub identity provider for guard and route tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::provider::{Identity, IdentityProvider, ProviderError, Session, SignUpOutcome};

pub(crate) fn identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: Some(format!("{}@example.com", id)),
        role: None,
    }
}

pub(crate) fn session(access: &str, refresh: &str, user: &str) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_in: Some(60),
        user: identity(user),
    }
}

/// In-memory provider: accepts the access and refresh tokens it was told about.
#[derive(Default)]
pub(crate) struct StubProvider {
    access_tokens: HashMap<String, Identity>,
    refresh_tokens: HashMap<String, Session>,
    accounts: HashMap<String, (String, Session)>,
    unavailable: bool,
    validate_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    signed_out: Mutex<Vec<String>>,
}

impl StubProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn accept_access(mut self, token: &str, user: Identity) -> Self {
        self.access_tokens.insert(token.to_string(), user);
        self
    }

    pub(crate) fn accept_refresh(mut self, token: &str, session: Session) -> Self {
        self.refresh_tokens.insert(token.to_string(), session);
        self
    }

    pub(crate) fn account(mut self, email: &str, password: &str, session: Session) -> Self {
        self.accounts
            .insert(email.to_string(), (password.to_string(), session));
        self
    }

    /// Every call fails as if the provider were down.
    pub(crate) fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub(crate) fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn signed_out(&self) -> Vec<String> {
        self.signed_out.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable {
            Err(ProviderError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

fn rejected() -> ProviderError {
    ProviderError::Rejected {
        status: 401,
        message: "invalid token".to_string(),
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn validate_access_token(&self, access_token: &str) -> Result<Identity, ProviderError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.access_tokens
            .get(access_token)
            .cloned()
            .ok_or_else(rejected)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.refresh_tokens
            .get(refresh_token)
            .cloned()
            .ok_or_else(rejected)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        self.check_available()?;
        match self.accounts.get(email) {
            Some((expected, session)) if expected == password => Ok(session.clone()),
            _ => Err(ProviderError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string(),
            }),
        }
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpOutcome, ProviderError> {
        self.check_available()?;
        match self.accounts.get(email) {
            Some(_) => Err(ProviderError::Rejected {
                status: 422,
                message: "User already registered".to_string(),
            }),
            None => Ok(SignUpOutcome {
                user: Identity {
                    id: "new-user".to_string(),
                    email: Some(email.to_string()),
                    role: None,
                },
                session: None,
            }),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        self.check_available()?;
        self.signed_out
            .lock()
            .unwrap()
            .push(access_token.to_string());
        Ok(())
    }
}
