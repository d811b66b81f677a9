//! Core request handlers: health, session lifecycle, and status.

use axum::{
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use std::sync::Arc;
use tracing::info;

use super::auth::AnyAuth;
use super::errors::ApiError;
use super::middleware::RequestId;
use super::models::{utilization_percent, LoginRequest, LoginResponse, MessageResponse, StatusResponse};
use crate::account::RoleData;
use crate::config::LedgerConfig;
use crate::game::GameSessionEngine;
use crate::password::verify_password;
use crate::store::AccountStore;
use crate::token::{Claims, IdentityClaims, SessionTokenCodec};
use crate::transfer::TransferCoordinator;
use crate::update::AccountUpdater;

/// Shared application state
pub struct AppState {
    pub store: Arc<AccountStore>,
    pub codec: SessionTokenCodec,
    pub transfers: TransferCoordinator,
    pub engine: GameSessionEngine,
    pub updater: AccountUpdater,
    pub config: LedgerConfig,
}

impl AppState {
    /// `Set-Cookie` value carrying a freshly minted session token.
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={token}; HttpOnly; SameSite=Lax; Path=/",
            self.config.auth.session_cookie
        )
    }

    pub fn expired_cookie(&self) -> String {
        format!(
            "{}=; Max-Age=0; HttpOnly; Path=/",
            self.config.auth.session_cookie
        )
    }
}

/// Health check handler - minimal response time
/// GET /health
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /login
///
/// Unknown usernames, wrong passwords, and suspended accounts all produce
/// the same response so nothing about the account leaks.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cookie = state.config.auth.session_cookie.clone();
    let reject = || ApiError::unauthorized(request_id.clone(), &cookie);

    let account = state
        .store
        .find_by_username(body.username.trim())
        .ok_or_else(reject)?;
    if !verify_password(&body.password, &account.password_hash) || !account.is_active() {
        return Err(reject());
    }

    let claims = Claims::Identity(IdentityClaims {
        account_id: account.id,
        role: account.role(),
        name: account.name.clone(),
    });
    let token = state
        .codec
        .encode(&claims)
        .map_err(|e| ApiError::new(request_id.clone(), e))?;

    info!(username = %account.username, role = %account.role(), "login");

    Ok((
        AppendHeaders([(header::SET_COOKIE, state.session_cookie(&token))]),
        Json(LoginResponse {
            token,
            role: account.role(),
            name: account.name,
        }),
    ))
}

/// POST /logout
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, state.expired_cookie())]),
        Json(MessageResponse {
            message: "logged out".to_string(),
        }),
    )
}

/// GET /status
///
/// Caller's balance/credit snapshot. Admins hold no money and always read
/// zero.
pub async fn status_handler(AnyAuth(session): AnyAuth) -> Json<StatusResponse> {
    let (balance, credit) = match &session.account.data {
        RoleData::Admin => (0.0, 0.0),
        RoleData::SubAdmin {
            balance, credit, ..
        }
        | RoleData::User {
            balance, credit, ..
        } => (*balance, *credit),
    };
    Json(StatusResponse {
        name: session.account.name,
        balance,
        credit,
        percent: utilization_percent(balance, credit),
    })
}
