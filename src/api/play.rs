//! Game session handlers.
//!
//! The session state machine lives entirely in the signed token the client
//! carries; these handlers validate it against the store, move it forward,
//! and hand back the refreshed token.

use axum::{
    extract::{Query, State},
    http::header,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::auth::UserAuth;
use super::errors::ApiError;
use super::handlers::AppState;
use super::models::{CallRequest, ConfigureGameRequest, GamesQuery, GameTokenResponse, SuccessResponse};
use crate::account::RoleData;
use crate::errors::LedgerError;
use crate::game::GameRecord;
use crate::token::{Claims, GameClaims};

/// POST /game/configure
///
/// Idle -> Configured. No money moves; the stake figures ride forward only
/// in the returned token.
pub async fn configure_game_handler(
    UserAuth(session): UserAuth,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConfigureGameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = state
        .engine
        .configure(
            &session.account,
            body.bet_birr,
            body.selected_cards,
            body.line_checker,
        )
        .map_err(|e| ApiError::new(&session.request_id, e))?;

    respond_with_token(&state, &session.request_id, claims)
}

/// POST /game/start
///
/// Configured -> InProgress. Requires a game token; the debit is recomputed
/// from the stored commission, so a tampered token cannot change the price.
pub async fn start_game_handler(
    UserAuth(session): UserAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let configured = game_claims(&session.claims, &state, &session.request_id)?;
    let started = state
        .engine
        .start(session.account.id, configured)
        .map_err(|e| ApiError::new(&session.request_id, e))?;

    info!(game_index = ?started.game_index, "game started");
    respond_with_token(&state, &session.request_id, started)
}

/// POST /game/call
///
/// Card-call event for the in-progress game named by the token. Unknown
/// indexes are ignored so a stale client cannot fail the round.
pub async fn call_handler(
    UserAuth(session): UserAuth,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CallRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let claims = game_claims(&session.claims, &state, &session.request_id)?;
    let index = claims.game_index.ok_or_else(|| {
        ApiError::unauthorized(&session.request_id, &state.config.auth.session_cookie)
    })?;

    state
        .engine
        .record_call(session.account.id, index, body.card.as_deref(), body.flags)
        .map_err(|e| ApiError::new(&session.request_id, e))?;

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /games?date=YYYY-MM-DD
///
/// Caller's game records, newest ticket first, optionally narrowed to the
/// tickets issued on one day.
pub async fn games_handler(
    UserAuth(session): UserAuth,
    Query(query): Query<GamesQuery>,
) -> Result<Json<Vec<GameRecord>>, ApiError> {
    let RoleData::User { games, .. } = &session.account.data else {
        return Err(ApiError::new(
            &session.request_id,
            LedgerError::Unauthorized,
        ));
    };

    let mut out: Vec<GameRecord> = games
        .iter()
        .filter(|g| match &query.date {
            Some(date) => g.time.starts_with(date.as_str()),
            None => true,
        })
        .cloned()
        .collect();
    out.sort_by(|a, b| b.index.cmp(&a.index));
    Ok(Json(out))
}

fn game_claims<'a>(
    claims: &'a Claims,
    state: &AppState,
    request_id: &str,
) -> Result<&'a GameClaims, ApiError> {
    claims
        .as_game()
        .ok_or_else(|| ApiError::unauthorized(request_id, &state.config.auth.session_cookie))
}

fn respond_with_token(
    state: &AppState,
    request_id: &str,
    claims: GameClaims,
) -> Result<impl IntoResponse, ApiError> {
    let response = GameTokenResponse {
        token: String::new(),
        total_bet: claims.total_bet,
        winning_amount: claims.winning_amount,
        required_balance: claims.required_balance,
        game_index: claims.game_index,
    };
    let token = state
        .codec
        .encode(&Claims::Game(claims))
        .map_err(|e| ApiError::new(request_id, e))?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, state.session_cookie(&token))]),
        Json(GameTokenResponse { token, ..response }),
    ))
}
