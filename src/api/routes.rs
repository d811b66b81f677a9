//! Route definitions.
//!
//! Maps URLs to handlers with type-safe routing.

use super::{accounts::*, handlers::*, play::*};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Session lifecycle
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/status", get(status_handler))
        // Account creation (role-guarded)
        .route("/signup/admin", post(signup_admin_handler))
        .route("/signup/subadmin", post(signup_subadmin_handler))
        .route("/signup/user", post(signup_user_handler))
        // Account listing, sparse updates, deletion
        .route("/accounts/admin", get(list_admins_handler))
        .route("/accounts/subadmin", get(list_subadmins_handler))
        .route("/accounts/user", get(list_users_handler))
        .route(
            "/account/admin/:id",
            put(update_admin_handler).delete(delete_admin_handler),
        )
        .route(
            "/account/subadmin/:id",
            put(update_subadmin_handler).delete(delete_subadmin_handler),
        )
        .route(
            "/account/user/:id",
            put(update_user_handler).delete(delete_user_handler),
        )
        // SubAdmin transfer ledger
        .route("/history", get(history_handler))
        // User profile self-service
        .route("/profile", get(profile_handler))
        .route("/profile/username", post(profile_username_handler))
        .route("/profile/password", post(profile_password_handler))
        .route("/profile/commission", post(profile_commission_handler))
        // Game session state machine
        .route("/game/configure", post(configure_game_handler))
        .route("/game/start", post(start_game_handler))
        .route("/game/call", post(call_handler))
        .route("/games", get(games_handler))
        // Attach shared state
        .with_state(state)
}
