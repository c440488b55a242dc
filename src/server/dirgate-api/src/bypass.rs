//! Reverse proxy bypass filter.
//!
//! A request for the login page that carries a trusted identity is sent to
//! the bypass validation endpoint instead of the credential form.

use axum::extract::{OriginalUri, Request, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;
use url::Url;

use crate::state::AppState;

const LOGIN_PAGE_SEGMENT: &str = "sessions/new";
const VALIDATE_SEGMENT: &str = "ldap/validate";

/// Headers carrying the scheme seen by the client, in lookup order.
static FORWARDED_PROTO_HEADERS: [HeaderName; 2] = [
    HeaderName::from_static("x-forwarded-proto"),
    HeaderName::from_static("x_forwarded_proto"),
];

/// Redirects login page requests carrying a trusted identity.
pub async fn bypass_filter(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(user) = state.reverse_proxy().trusted_user(request.headers()) {
        match bypass_location(&state, &request) {
            Some(location) => {
                debug!(user = %user, location = %location, "Trusted identity, redirecting");
                return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
            }
            None => debug!(user = %user, "Cannot build bypass redirect, rendering login page"),
        }
    }

    next.run(request).await
}

fn bypass_location(state: &AppState, request: &Request) -> Option<String> {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path())
        .unwrap_or_else(|| request.uri().path());

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))?;

    let scheme = forwarded_proto(request.headers()).unwrap_or_else(|| state.public_scheme());

    redirect_target(scheme, host, path)
}

/// Scheme announced by an upstream proxy.
///
/// Only the first hop of a comma separated list is used.
fn forwarded_proto(headers: &HeaderMap) -> Option<&str> {
    FORWARDED_PROTO_HEADERS.iter().find_map(|name| {
        let value = headers.get(name)?.to_str().ok()?;
        let first = value.split(',').next()?.trim();
        (first.eq_ignore_ascii_case("http") || first.eq_ignore_ascii_case("https")).then_some(first)
    })
}

/// Builds the bypass validation URL for a login page request.
///
/// Keeps the origin and base path of `path` and replaces its final
/// `sessions/new` segment with `ldap/validate`. Returns `None` when `path`
/// is not a login page path or the origin is not a valid URL.
pub fn redirect_target(scheme: &str, host: &str, path: &str) -> Option<String> {
    let base = path
        .trim_end_matches('/')
        .strip_suffix(LOGIN_PAGE_SEGMENT)?;

    if !base.ends_with('/') {
        return None;
    }

    let mut url = Url::parse(&format!("{}://{host}", scheme.to_ascii_lowercase())).ok()?;
    if url.cannot_be_a_base() || url.host().is_none() {
        return None;
    }
    url.set_path(&format!("{base}{VALIDATE_SEGMENT}"));

    Some(url.into())
}
