use axum::{extract::FromRequestParts, http::HeaderMap, http::request::Parts};

use jdrtables_api::{Actor, UserRole};

use crate::error::ApiErr;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

// ---------------------------------------------------------------------------
// Auth extractor
// ---------------------------------------------------------------------------

/// Caller identity as forwarded by the authenticating proxy in front of the
/// server: `X-User-Id` (required) and `X-User-Role` (defaults to `player`).
pub struct AuthUser(pub Actor);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(AuthUser)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiErr> {
    let user_id = header(headers, USER_ID_HEADER)
        .ok_or_else(|| ApiErr::unauthorized("missing X-User-Id header"))?;
    let role = match header(headers, USER_ROLE_HEADER) {
        None => UserRole::Player,
        Some(raw) => UserRole::parse(raw)
            .ok_or_else(|| ApiErr::unauthorized(format!("unknown role: {raw}")))?,
    };
    Ok(Actor::new(user_id, role))
}
