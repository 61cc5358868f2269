// Authentication configuration loaded from environment variables.
// Decision: The provider counts as configured only when both SUPABASE_URL and SUPABASE_ANON_KEY are set
// Decision: Default front-end origin is the local Vite dev server

use std::time::Duration;

pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:5173";

/// Connection settings for the GoTrue-compatible identity provider
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public (anon) API key sent as `apikey`
    pub anon_key: String,
    /// Per-request transport timeout
    pub timeout: Duration,
}

/// Complete authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Origin the browser app is served from; drives cookie policy and CORS
    pub frontend_origin: String,
    /// Identity provider, if configured
    pub supabase: Option<SupabaseConfig>,
    /// Extra exact paths that never require authentication
    pub public_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
            supabase: None,
            public_paths: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let frontend_origin = lookup("FRONTEND_ORIGIN")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGIN.to_string());

        let timeout = lookup("AUTH_PROVIDER_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));

        let supabase = match (lookup("SUPABASE_URL"), lookup("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) if !url.trim().is_empty() && !anon_key.is_empty() => {
                Some(SupabaseConfig {
                    url: url.trim().trim_end_matches('/').to_string(),
                    anon_key,
                    timeout,
                })
            }
            _ => None,
        };

        let public_paths = lookup("AUTH_PUBLIC_PATHS")
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            frontend_origin,
            supabase,
            public_paths,
        }
    }

    /// Check if an identity provider is available
    pub fn is_provider_configured(&self) -> bool {
        self.supabase.is_some()
    }
}
