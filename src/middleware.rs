//! Identity middleware for owner routes
//!
//! Authentication happens upstream. The identity proxy forwards the signed-in
//! user in two headers:
//!
//! - `X-User-Id` (required) - opaque external user ID
//! - `X-User-Name` (optional) - display name, used when naming new forms
//!
//! When `Config::auth_secret` is set the proxy must also send the shared
//! secret in the `Authorization` header, so requests that bypass the proxy
//! cannot claim an identity.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::database::AppState;
use crate::error::AppError;
use crate::model::CurrentUser;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Resolves the [`CurrentUser`] and stores it in the request extensions
///
/// Responds with 401 when the shared secret does not match or no user ID is
/// present.
pub async fn identity_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(secret) = &state.config.auth_secret {
        if header(&headers, "authorization") != Some(secret.as_str()) {
            return Err(AppError::Unauthorized);
        }
    }

    let id = header(&headers, USER_ID_HEADER).ok_or(AppError::Unauthorized)?;
    let user = CurrentUser {
        id: id.to_string(),
        display_name: header(&headers, USER_NAME_HEADER).map(str::to_string),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
