//! Helpers for inspecting redirect responses

use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::HttpResponse;

/// `Location` header of a redirect
///
/// # Panics
///
/// Panics if the response has no `Location` header.
#[must_use]
pub fn location(response: &HttpResponse) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("response has no Location header")
}

/// Every cookie set by the response, in header order
///
/// # Panics
///
/// Panics if a `Set-Cookie` header cannot be parsed.
#[must_use]
pub fn set_cookies(response: &HttpResponse) -> Vec<Cookie<'static>> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .map(|value| {
            let raw = value.to_str().expect("Set-Cookie is not ASCII");
            Cookie::parse(raw.to_string()).expect("unparseable Set-Cookie")
        })
        .collect()
}

/// Value of the `error` query parameter on a failure redirect
#[must_use]
pub fn error_reason(response: &HttpResponse) -> Option<String> {
    let url = url::Url::parse("http://localhost").ok()?.join(location(response)).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "error")
        .map(|(_, value)| value.into_owned())
}
