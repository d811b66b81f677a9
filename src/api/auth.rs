//! Role-guarded request authentication.
//!
//! Every protected route goes through one of these extractors: the token is
//! decoded from the session cookie (or a bearer header), the account is
//! re-fetched from the store, and suspended or mismatched identities are
//! rejected with the cookie expired. The token never substitutes for the
//! stored account.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use super::errors::ApiError;
use super::handlers::AppState;
use super::middleware::RequestId;
use crate::account::{Account, Role};
use crate::token::Claims;

/// A verified token plus the live account it names.
pub struct AuthSession {
    pub account: Account,
    pub claims: Claims,
    pub request_id: String,
}

pub struct AdminAuth(pub AuthSession);
pub struct SubAdminAuth(pub AuthSession);
pub struct UserAuth(pub AuthSession);
/// Any active authenticated account, role checked by the handler if at all.
pub struct AnyAuth(pub AuthSession);

pub fn request_id(parts: &Parts) -> String {
    parts
        .extensions
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

fn extract_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    if let Some(cookies) = parts
        .headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
    {
        let found = cookies.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == cookie_name).then(|| value.to_string())
        });
        if found.is_some() {
            return found;
        }
    }
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthSession, ApiError> {
    let request_id = request_id(parts);
    let cookie = state.config.auth.session_cookie.as_str();
    let reject = || ApiError::unauthorized(request_id.clone(), cookie);

    let token = extract_token(parts, cookie).ok_or_else(reject)?;
    let claims = state.codec.decode(&token).map_err(|_| reject())?;
    let account = state.store.get(claims.account_id()).ok_or_else(reject)?;
    if !account.is_active() || claims.role() != account.role() {
        return Err(reject());
    }

    Ok(AuthSession {
        account,
        claims,
        request_id,
    })
}

fn require_role(session: AuthSession, role: Role, cookie: &str) -> Result<AuthSession, ApiError> {
    if session.account.role() != role {
        return Err(ApiError::unauthorized(session.request_id, cookie));
    }
    Ok(session)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AnyAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(AnyAuth(authenticate(parts, state)?))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = authenticate(parts, state)?;
        let session = require_role(session, Role::Admin, &state.config.auth.session_cookie)?;
        Ok(AdminAuth(session))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SubAdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = authenticate(parts, state)?;
        let session = require_role(session, Role::SubAdmin, &state.config.auth.session_cookie)?;
        Ok(SubAdminAuth(session))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = authenticate(parts, state)?;
        let session = require_role(session, Role::User, &state.config.auth.session_cookie)?;
        Ok(UserAuth(session))
    }
}
