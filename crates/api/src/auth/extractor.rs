// Bearer credential extraction
// Decision: The Authorization header wins over the access cookie; the two are not compared

use axum::http::{header, HeaderMap};
use axum_extra::extract::CookieJar;

use super::cookies::ACCESS_COOKIE;

/// Pull the access token from `Authorization: Bearer <token>`, falling back
/// to the access cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_bearer);

    let jar = CookieJar::from_headers(headers);
    let from_cookie = jar
        .get(ACCESS_COOKIE)
        .map(|c| c.value().trim())
        .filter(|v| !v.is_empty());

    match (from_header, from_cookie) {
        (Some(token), cookie) => {
            if cookie.is_some_and(|c| c != token) {
                tracing::debug!("Bearer header and access cookie differ; using header");
            }
            Some(token.to_string())
        }
        (None, Some(cookie)) => Some(cookie.to_string()),
        (None, None) => None,
    }
}

/// Parse `Bearer <token>`: case-insensitive scheme, split on the first space,
/// exactly one non-empty token.
fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, rest) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = rest.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}
