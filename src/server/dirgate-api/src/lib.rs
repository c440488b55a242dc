//! # Dirgate API
//!
//! HTTP layer for Dirgate.
//!
//! ## Endpoints
//!
//! All paths are relative to the configured context path.
//!
//! - `GET /sessions/new` - Login page, behind the reverse proxy bypass filter
//! - `POST /sessions/login` - Credential login
//! - `GET /ldap/validate` - Reverse proxy bypass validation
//! - `GET /health` - Liveness and backend count

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bypass;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

pub use bypass::redirect_target;
pub use error::ApiError;
pub use state::AppState;

/// Path of the login page, relative to the context path.
pub const LOGIN_PAGE_PATH: &str = "/sessions/new";

/// Path of the credential login endpoint.
pub const LOGIN_PATH: &str = "/sessions/login";

/// Path of the bypass validation endpoint.
pub const VALIDATE_PATH: &str = "/ldap/validate";

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let login_page = get(handlers::login_page).layer(middleware::from_fn_with_state(
        state.clone(),
        bypass::bypass_filter,
    ));

    let routes = Router::new()
        .route(LOGIN_PAGE_PATH, login_page)
        .route(LOGIN_PATH, post(handlers::login))
        .route(VALIDATE_PATH, get(handlers::validate))
        .route(HEALTH_PATH, get(handlers::health));

    let app = if state.context_path().is_empty() {
        routes
    } else {
        Router::new().nest(state.context_path(), routes)
    };

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
