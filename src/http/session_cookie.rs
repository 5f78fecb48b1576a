use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub const SESSION_COOKIE: &str = "bz_session";
pub const SESSION_HEADER: &str = "X-Session-Id";

/// Browser session id from the `bz_session` cookie, falling back to the
/// `X-Session-Id` header. Empty when neither is present.
pub fn session_id(headers: &HeaderMap) -> String {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"').to_string());

    from_cookie
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|h| h.to_str().ok())
                .map(|v| v.trim().to_string())
        })
        .unwrap_or_default()
}
