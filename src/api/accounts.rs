//! Account management handlers: creation, listing, sparse updates, deletion,
//! and the SubAdmin transfer ledger.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::auth::{AdminAuth, SubAdminAuth, UserAuth};
use super::errors::ApiError;
use super::handlers::AppState;
use super::models::{
    AccountSummary, ChangePasswordRequest, CommissionUpdated, HistoryResponse, MessageResponse,
    ProfileResponse, SignupAdminRequest, SignupSubAdminRequest, SignupUserRequest,
    UpdateCommissionRequest, UpdateUsernameRequest, UsernameUpdated,
};
use crate::account::{
    validate_commission, validate_credit, validate_name, validate_password, validate_username,
    Account, Role, RoleData, DEFAULT_COMMISSION,
};
use crate::errors::LedgerError;
use crate::history;
use crate::password::hash_password;
use crate::transfer::NewUserSpec;

/// Validate the identity triple shared by every signup, accumulating one
/// message per failed field.
fn validate_identity(
    name: &str,
    username: &str,
    password: &str,
) -> Result<(String, String, String), Vec<String>> {
    let mut errors = Vec::new();
    let name = validate_name(name).map_err(|e| errors.push(format!("name: {e}")));
    let username = validate_username(username).map_err(|e| errors.push(format!("username: {e}")));
    let password = validate_password(password).map_err(|e| errors.push(format!("password: {e}")));
    match (name, username, password) {
        (Ok(n), Ok(u), Ok(p)) => Ok((n, u, p)),
        _ => Err(errors),
    }
}

/// POST /signup/admin
pub async fn signup_admin_handler(
    AdminAuth(session): AdminAuth,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupAdminRequest>,
) -> Result<Json<AccountSummary>, ApiError> {
    let (name, username, password) =
        validate_identity(&body.name, &body.username, &body.password)
            .map_err(|errors| ApiError::new(&session.request_id, LedgerError::Validation(errors)))?;

    let account = Account::admin(
        name,
        username,
        hash_password(&password),
        Some(session.account.id),
        Utc::now(),
    );
    let summary = AccountSummary::from(&account);

    let mut txn = state.store.begin();
    txn.insert(account);
    txn.commit()
        .map_err(|e| ApiError::new(&session.request_id, e))?;

    info!(username = %summary.username, "admin created");
    Ok(Json(summary))
}

/// POST /signup/subadmin
pub async fn signup_subadmin_handler(
    AdminAuth(session): AdminAuth,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupSubAdminRequest>,
) -> Result<Json<AccountSummary>, ApiError> {
    let mut errors = Vec::new();
    let identity = validate_identity(&body.name, &body.username, &body.password)
        .map_err(|e| errors.extend(e));
    let credit =
        validate_credit(body.credit).map_err(|e| errors.push(format!("credit: {e}")));
    let ((name, username, password), credit) = match (identity, credit) {
        (Ok(identity), Ok(credit)) => (identity, credit),
        _ => return Err(ApiError::new(&session.request_id, LedgerError::Validation(errors))),
    };

    let account = Account::subadmin(
        name,
        username,
        hash_password(&password),
        credit,
        session.account.id,
        Utc::now(),
    );
    let summary = AccountSummary::from(&account);

    let mut txn = state.store.begin();
    txn.insert(account);
    txn.commit()
        .map_err(|e| ApiError::new(&session.request_id, e))?;

    info!(username = %summary.username, credit, "subadmin created");
    Ok(Json(summary))
}

/// POST /signup/user
///
/// Creation and funding are one transfer: the new User's opening balance is
/// debited from the calling SubAdmin in the same commit.
pub async fn signup_user_handler(
    SubAdminAuth(session): SubAdminAuth,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupUserRequest>,
) -> Result<Json<AccountSummary>, ApiError> {
    let mut errors = Vec::new();
    let identity = validate_identity(&body.name, &body.username, &body.password)
        .map_err(|e| errors.extend(e));
    let user_commission = validate_commission(body.user_commission.unwrap_or(DEFAULT_COMMISSION))
        .map_err(|e| errors.push(format!("user_commission: {e}")));
    let owner_commission = validate_commission(body.owner_commission.unwrap_or(DEFAULT_COMMISSION))
        .map_err(|e| errors.push(format!("owner_commission: {e}")));
    let ((name, username, password), user_commission, owner_commission) =
        match (identity, user_commission, owner_commission) {
            (Ok(identity), Ok(user), Ok(owner)) => (identity, user, owner),
            _ => {
                return Err(ApiError::new(
                    &session.request_id,
                    LedgerError::Validation(errors),
                ))
            }
        };

    let user = state
        .transfers
        .credit_new_user(
            session.account.id,
            NewUserSpec {
                name,
                username,
                password_hash: hash_password(&password),
                credit: body.credit,
                user_commission,
                owner_commission,
            },
        )
        .map_err(|e| ApiError::new(&session.request_id, e))?;

    info!(username = %user.username, credit = body.credit, "user created");
    Ok(Json(AccountSummary::from(&user)))
}

/// GET /accounts/admin
pub async fn list_admins_handler(
    AdminAuth(session): AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<AccountSummary>> {
    list(&state, session.account.id, Role::Admin)
}

/// GET /accounts/subadmin
pub async fn list_subadmins_handler(
    AdminAuth(session): AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<AccountSummary>> {
    list(&state, session.account.id, Role::SubAdmin)
}

/// GET /accounts/user
pub async fn list_users_handler(
    SubAdminAuth(session): SubAdminAuth,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<AccountSummary>> {
    list(&state, session.account.id, Role::User)
}

fn list(state: &AppState, creator: Uuid, role: Role) -> Json<Vec<AccountSummary>> {
    Json(
        state
            .store
            .list_created_by(creator, role)
            .iter()
            .map(AccountSummary::from)
            .collect(),
    )
}

/// PUT /account/admin/:id
pub async fn update_admin_handler(
    AdminAuth(session): AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<MessageResponse>, ApiError> {
    update(&state, &session.account, &session.request_id, id, Role::Admin, &fields)
}

/// PUT /account/subadmin/:id
pub async fn update_subadmin_handler(
    AdminAuth(session): AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<MessageResponse>, ApiError> {
    update(&state, &session.account, &session.request_id, id, Role::SubAdmin, &fields)
}

/// PUT /account/user/:id
pub async fn update_user_handler(
    SubAdminAuth(session): SubAdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<MessageResponse>, ApiError> {
    update(&state, &session.account, &session.request_id, id, Role::User, &fields)
}

fn update(
    state: &AppState,
    caller: &Account,
    request_id: &str,
    id: Uuid,
    role: Role,
    fields: &Map<String, Value>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_role(state, request_id, id, role)?;
    state
        .updater
        .apply(caller, id, fields)
        .map_err(|e| ApiError::new(request_id, e))?;
    info!(account = %id, "account updated");
    Ok(Json(MessageResponse {
        message: "account updated".to_string(),
    }))
}

/// DELETE /account/admin/:id
pub async fn delete_admin_handler(
    AdminAuth(session): AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    delete(&state, session.account.id, &session.request_id, id, Role::Admin)
}

/// DELETE /account/subadmin/:id
pub async fn delete_subadmin_handler(
    AdminAuth(session): AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    delete(&state, session.account.id, &session.request_id, id, Role::SubAdmin)
}

/// DELETE /account/user/:id
pub async fn delete_user_handler(
    SubAdminAuth(session): SubAdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    delete(&state, session.account.id, &session.request_id, id, Role::User)
}

fn delete(
    state: &AppState,
    caller: Uuid,
    request_id: &str,
    id: Uuid,
    role: Role,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_role(state, request_id, id, role)?;
    let removed = state
        .store
        .remove(id, caller)
        .map_err(|e| ApiError::new(request_id, e))?;
    info!(username = %removed.username, "account deleted");
    Ok(Json(MessageResponse {
        message: "account deleted".to_string(),
    }))
}

/// The route's role segment must match the stored account; a mismatch reads
/// as not-found rather than leaking what the id actually is.
fn ensure_role(state: &AppState, request_id: &str, id: Uuid, role: Role) -> Result<(), ApiError> {
    let found = state
        .store
        .get(id)
        .ok_or_else(|| ApiError::new(request_id, LedgerError::not_found("account")))?;
    if found.role() != role {
        return Err(ApiError::new(request_id, LedgerError::not_found("account")));
    }
    Ok(())
}

// ---- profile self-service (best-effort: each field is its own call) ----

/// GET /profile
pub async fn profile_handler(
    UserAuth(session): UserAuth,
) -> Result<Json<ProfileResponse>, ApiError> {
    let RoleData::User {
        shop_name,
        user_commission,
        ..
    } = &session.account.data
    else {
        return Err(ApiError::new(
            &session.request_id,
            LedgerError::Unauthorized,
        ));
    };
    let shop_name = if shop_name.is_empty() {
        session.account.name.clone()
    } else {
        shop_name.clone()
    };
    Ok(Json(ProfileResponse {
        name: session.account.name.clone(),
        username: session.account.username.clone(),
        shop_name,
        user_commission: *user_commission,
    }))
}

/// POST /profile/username
pub async fn profile_username_handler(
    UserAuth(session): UserAuth,
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateUsernameRequest>,
) -> Result<Json<UsernameUpdated>, ApiError> {
    let new_username = state
        .updater
        .change_own_username(session.account.id, &body.username)
        .map_err(|e| ApiError::new(&session.request_id, e))?;
    info!(username = %new_username, "profile username updated");
    Ok(Json(UsernameUpdated {
        success: true,
        new_username,
    }))
}

/// POST /profile/password
pub async fn profile_password_handler(
    UserAuth(session): UserAuth,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .updater
        .change_own_password(
            session.account.id,
            &body.current_password,
            &body.new_password,
            &body.confirm_password,
        )
        .map_err(|e| ApiError::new(&session.request_id, e))?;
    info!(username = %session.account.username, "profile password updated");
    Ok(Json(MessageResponse {
        message: "password updated".to_string(),
    }))
}

/// POST /profile/commission
pub async fn profile_commission_handler(
    UserAuth(session): UserAuth,
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateCommissionRequest>,
) -> Result<Json<CommissionUpdated>, ApiError> {
    let new_commission = state
        .updater
        .change_own_commission(session.account.id, body.commission)
        .map_err(|e| ApiError::new(&session.request_id, e))?;
    Ok(Json(CommissionUpdated {
        success: true,
        new_commission,
    }))
}

/// GET /history
pub async fn history_handler(
    SubAdminAuth(session): SubAdminAuth,
) -> Result<Json<HistoryResponse>, ApiError> {
    match &session.account.data {
        RoleData::SubAdmin { history: entries, .. } => Ok(Json(HistoryResponse {
            total_credited: history::total_credited(entries),
            entries: history::newest_first(entries),
        })),
        _ => Err(ApiError::new(
            &session.request_id,
            LedgerError::Unauthorized,
        )),
    }
}
