//! Session cookie transport and the guards that run before handlers.

use std::marker::PhantomData;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use time::{format_description::FormatItem, macros::format_description, Duration, OffsetDateTime, UtcOffset};
use tracing::warn;
use uuid::Uuid;

use crate::{
    config::CookieConfig,
    error::AppError,
    state::AppState,
    users::{Role, User},
};

pub const LOGIN_FIRST: &str = "Login first to access this resource";

const HTTP_DATE: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// `Set-Cookie` value carrying a freshly issued session credential.
pub fn session_cookie(
    cfg: &CookieConfig,
    token: &str,
    now: OffsetDateTime,
) -> anyhow::Result<HeaderValue> {
    let max_age = Duration::days(cfg.ttl_days);
    let expires = now
        .checked_add(max_age)
        .ok_or_else(|| anyhow::anyhow!("cookie expiry out of range"))?
        .to_offset(UtcOffset::UTC)
        .format(HTTP_DATE)?;
    let mut cookie = format!(
        "{}={}; Expires={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        cfg.name,
        token,
        expires,
        max_age.whole_seconds()
    );
    if cfg.secure {
        cookie.push_str("; Secure");
    }
    Ok(HeaderValue::from_str(&cookie)?)
}

/// `Set-Cookie` value that makes the client drop its credential.
pub fn expired_cookie(cfg: &CookieConfig) -> anyhow::Result<HeaderValue> {
    let expires = OffsetDateTime::UNIX_EPOCH.format(HTTP_DATE)?;
    Ok(HeaderValue::from_str(&format!(
        "{}=; Expires={}; Max-Age=0; Path=/; HttpOnly; SameSite=Lax",
        cfg.name, expires
    ))?)
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
}

/// Authenticated principal: the user id carried by a valid session.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = cookie_value(&parts.headers, &state.config.cookie.name)
            .or_else(|| bearer_token(&parts.headers))
            .ok_or_else(|| AppError::Unauthenticated(LOGIN_FIRST.into()))?;

        let claims = state.jwt.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired session");
            AppError::Unauthenticated(LOGIN_FIRST.into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}

/// Set of roles a route admits.
pub trait RoleGate: Send + Sync + 'static {
    const ALLOWED: &'static [Role];
}

pub struct AdminOnly;

impl RoleGate for AdminOnly {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

/// Session plus role check. The role is read from the store so a demotion
/// takes effect on the next request rather than when the token expires.
pub struct Authorized<G: RoleGate>(pub User, pub PhantomData<fn() -> G>);

#[async_trait]
impl<G: RoleGate> FromRequestParts<AppState> for Authorized<G> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;

        let user = state
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated(LOGIN_FIRST.into()))?;

        if !G::ALLOWED.contains(&user.role) {
            warn!(%user_id, role = %user.role, path = %parts.uri.path(), "role not allowed");
            return Err(AppError::Forbidden(format!(
                "Role ({}) is not allowed to access this resource",
                user.role
            )));
        }

        Ok(Authorized(user, PhantomData))
    }
}
