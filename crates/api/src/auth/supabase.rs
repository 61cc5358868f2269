// GoTrue-compatible identity provider over HTTP
// Decision: Manual REST calls with reqwest; the provider SDK surface we need is five endpoints
// Decision: 5xx, 408, 429 and transport failures are "unavailable"; other non-2xx are rejections

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::config::SupabaseConfig;
use super::provider::{Identity, IdentityProvider, ProviderError, Session, SignUpOutcome};

/// Identity provider backed by a Supabase (GoTrue) auth server
pub struct SupabaseProvider {
    http: reqwest::Client,
    auth_url: url::Url,
    anon_key: String,
}

/// Token endpoint payload; fields are optional so incomplete sessions can be detected.
#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    user: Option<Identity>,
}

impl TokenPayload {
    fn has_tokens(&self) -> bool {
        self.access_token.is_some() || self.refresh_token.is_some()
    }

    fn into_session(self) -> Result<Session, ProviderError> {
        let session = match (self.access_token, self.refresh_token, self.user) {
            (Some(access_token), Some(refresh_token), Some(user)) => Session {
                access_token,
                refresh_token,
                expires_in: self.expires_in,
                user,
            },
            _ => return Err(ProviderError::IncompleteSession),
        };

        if session.is_complete() {
            Ok(session)
        } else {
            Err(ProviderError::IncompleteSession)
        }
    }
}

/// GoTrue error bodies use different field names depending on the endpoint.
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorPayload {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or(self.error)
    }
}

impl SupabaseProvider {
    pub fn new(config: &SupabaseConfig) -> Result<Self, ProviderError> {
        let mut base = url::Url::parse(&config.url)
            .map_err(|e| ProviderError::Config(format!("SUPABASE_URL: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let auth_url = base
            .join("auth/v1/")
            .map_err(|e| ProviderError::Config(format!("SUPABASE_URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            auth_url,
            anon_key: config.anon_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, ProviderError> {
        self.auth_url
            .join(path)
            .map_err(|e| ProviderError::Config(format!("endpoint {}: {}", path, e)))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorPayload>()
            .await
            .ok()
            .and_then(ErrorPayload::into_message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        if is_transient(status) {
            Err(ProviderError::Unavailable(format!("{}: {}", status, message)))
        } else {
            Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, ProviderError> {
        let url = self.endpoint("token")?;
        let response = self
            .send(
                self.http
                    .post(url)
                    .query(&[("grant_type", grant_type)])
                    .json(&body),
            )
            .await?;

        decode::<TokenPayload>(response).await?.into_session()
    }
}

/// Statuses that say "try again later" rather than "this credential is bad".
fn is_transient(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    response.json::<T>().await.map_err(|e| ProviderError::Rejected {
        status: status.as_u16(),
        message: format!("unexpected response body: {}", e),
    })
}

#[async_trait]
impl IdentityProvider for SupabaseProvider {
    async fn validate_access_token(&self, access_token: &str) -> Result<Identity, ProviderError> {
        let url = self.endpoint("user")?;
        let response = self
            .send(self.http.get(url).bearer_auth(access_token))
            .await?;

        let user: Option<Identity> = decode(response).await?;
        match user {
            Some(user) if !user.id.is_empty() => Ok(user),
            _ => Err(ProviderError::NoUser),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ProviderError> {
        let url = self.endpoint("signup")?;
        let response = self
            .send(
                self.http
                    .post(url)
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;

        // Auto-confirmed projects answer with a session, others with the bare user
        let body: serde_json::Value = decode(response).await?;
        let payload: TokenPayload =
            serde_json::from_value(body.clone()).map_err(|_| ProviderError::NoUser)?;

        if payload.has_tokens() {
            let session = payload.into_session()?;
            return Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user = payload
            .user
            .or_else(|| serde_json::from_value::<Identity>(body).ok())
            .ok_or(ProviderError::NoUser)?;
        Ok(SignUpOutcome {
            user,
            session: None,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let url = self.endpoint("logout")?;
        self.send(self.http.post(url).bearer_auth(access_token))
            .await?;
        Ok(())
    }
}
