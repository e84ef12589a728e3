//! Credential extraction from the `Cookie` header.

use axum_extra::extract::cookie::CookieJar;
use http::HeaderMap;

/// Returns the value of cookie `name`, if present and non-empty.
pub fn token_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    jar.get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
