//! HTTP handlers.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use dirgate_auth::{AuthRequest, CredentialSource, ReverseProxyCredentials};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ApiError;
use crate::state::AppState;
use crate::LOGIN_PATH;

/// Login form fields.
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct LoginForm {
    /// Login typed by the user.
    #[serde(default)]
    pub login: String,
    /// Password typed by the user.
    #[serde(default)]
    pub password: String,
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Always true.
    pub authenticated: bool,
    /// Authenticated login.
    pub login: String,
}

/// Health status.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` while serving.
    pub status: &'static str,
    /// Server version.
    pub version: &'static str,
    /// Number of configured backends.
    pub backends: usize,
}

/// Renders the credential form.
pub async fn login_page(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sign in</title></head>
<body>
<form method="post" action="{}{LOGIN_PATH}">
<label>Login <input type="text" name="login" autofocus></label>
<label>Password <input type="password" name="password"></label>
<button type="submit">Sign in</button>
</form>
</body>
</html>
"#,
        state.context_path()
    ))
}

/// Authenticates typed credentials, or the trusted identity when present.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, ApiError> {
    let request = AuthRequest::new(form.login.as_str(), Some(form.password.as_str()), headers);
    drop(form);

    let attempt = ReverseProxyCredentials::new(state.reverse_proxy(), &request)
        .attempt()
        .ok_or(ApiError::Unauthorized)?;

    let authenticated = state
        .authenticator()
        .authenticate(attempt.login(), attempt.password(), attempt.check_password())
        .await;

    if !authenticated {
        debug!(login = attempt.login(), "Login rejected");
        return Err(ApiError::Unauthorized);
    }

    info!(login = attempt.login(), "User logged in");
    Ok(Json(LoginResponse {
        authenticated: true,
        login: attempt.login().to_string(),
    }))
}

/// Validates the trusted identity and sends the user to the application.
pub async fn validate(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let user = state
        .reverse_proxy()
        .trusted_user(&headers)
        .ok_or(ApiError::Unauthorized)?;

    if !state.authenticator().authenticate(&user, None, false).await {
        debug!(user = %user, "Trusted identity not found in any backend");
        return Err(ApiError::Unauthorized);
    }

    info!(user = %user, "Trusted identity validated");
    Ok((StatusCode::FOUND, [(header::LOCATION, state.home_path())]).into_response())
}

/// Reports liveness.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backends: state.authenticator().registry().len(),
    })
}
