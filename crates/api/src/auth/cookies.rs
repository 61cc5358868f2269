// Session cookies
// Decision: Cookie attributes come from one CookiePolicy computed at startup from FRONTEND_ORIGIN
// Decision: A local front-end gets SameSite=Lax without Secure; anything else (including an
// unparsable origin) gets SameSite=None; Secure

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use super::provider::Session;

pub const ACCESS_COOKIE: &str = "sb_access_token";
pub const REFRESH_COOKIE: &str = "sb_refresh_token";
pub const PERSISTENT_COOKIE: &str = "sb_persistent";

/// Access cookie lifetime when the provider does not report one.
pub const DEFAULT_ACCESS_TOKEN_SECS: i64 = 3600;

/// Lifetime of the refresh and persistence cookies for "remember me" sessions.
pub const PERSISTENT_MAX_AGE: Duration = Duration::days(30);

/// Cross-site attributes shared by every session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub same_site: SameSite,
    pub secure: bool,
}

impl CookiePolicy {
    pub fn local() -> Self {
        Self {
            same_site: SameSite::Lax,
            secure: false,
        }
    }

    pub fn remote() -> Self {
        Self {
            same_site: SameSite::None,
            secure: true,
        }
    }

    /// Classify the configured front-end origin.
    pub fn from_origin(origin: &str) -> Self {
        let host = url::Url::parse(origin)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();

        if is_loopback_host(&host) {
            Self::local()
        } else {
            Self::remote()
        }
    }

    pub fn is_local(&self) -> bool {
        *self == Self::local()
    }
}

fn is_loopback_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
}

/// Writes and clears the access, refresh and persistence cookies.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookies {
    policy: CookiePolicy,
}

impl SessionCookies {
    pub fn new(policy: CookiePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CookiePolicy {
        self.policy
    }

    /// Add the three session cookies for `session` to `jar`.
    ///
    /// Refresh and persistence cookies share one lifetime: 30 days when
    /// `persistent`, browser-session scoped otherwise.
    pub fn set_session_cookies(
        &self,
        jar: CookieJar,
        session: &Session,
        persistent: bool,
    ) -> CookieJar {
        let access_max_age =
            Duration::seconds(session.expires_in.unwrap_or(DEFAULT_ACCESS_TOKEN_SECS));
        let long_lived = persistent.then_some(PERSISTENT_MAX_AGE);
        let flag = if persistent { "1" } else { "0" };

        jar.add(self.cookie(
            ACCESS_COOKIE,
            session.access_token.clone(),
            Some(access_max_age),
        ))
        .add(self.cookie(REFRESH_COOKIE, session.refresh_token.clone(), long_lived))
        .add(self.cookie(PERSISTENT_COOKIE, flag.to_string(), long_lived))
    }

    /// Add removal instructions for all three cookies, with the same
    /// attributes they were set with.
    pub fn clear_session_cookies(&self, jar: CookieJar) -> CookieJar {
        [ACCESS_COOKIE, REFRESH_COOKIE, PERSISTENT_COOKIE]
            .into_iter()
            .fold(jar, |jar, name| {
                let mut cookie = self.cookie(name, String::new(), None);
                cookie.make_removal();
                jar.add(cookie)
            })
    }

    fn cookie(
        &self,
        name: &'static str,
        value: String,
        max_age: Option<Duration>,
    ) -> Cookie<'static> {
        let builder = Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.policy.secure)
            .same_site(self.policy.same_site);

        match max_age {
            Some(age) => builder.max_age(age).build(),
            None => builder.build(),
        }
    }
}

/// Whether the request's persistence cookie records a "remember me" session.
pub fn is_persistent(jar: &CookieJar) -> bool {
    jar.get(PERSISTENT_COOKIE).is_some_and(|c| c.value() == "1")
}

#[cfg(test)]
pub(crate) fn set_cookie_headers(response: &axum::response::Response) -> Vec<Cookie<'static>> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v.to_string()).ok())
        .collect()
}
