//! Wire models.
//!
//! Request and response payloads, kept separate from the domain types so the
//! JSON surface can evolve without touching the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{Account, AccountState, Role, RoleData};
use crate::game::CallFlags;
use crate::history::HistoryEntry;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct SignupAdminRequest {
    pub name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupSubAdminRequest {
    pub name: String,
    pub username: String,
    pub password: String,
    pub credit: f64,
}

#[derive(Debug, Deserialize)]
pub struct SignupUserRequest {
    pub name: String,
    pub username: String,
    pub password: String,
    pub credit: f64,
    pub user_commission: Option<f64>,
    pub owner_commission: Option<f64>,
}

/// Account as listed back to its creator. Monetary fields appear only for
/// the roles that carry them.
#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub state: AccountState,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_credit_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_commission: Option<f64>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        let mut summary = AccountSummary {
            id: account.id,
            username: account.username.clone(),
            name: account.name.clone(),
            state: account.state,
            role: account.role(),
            created_at: account.created_at,
            credit: None,
            balance: None,
            last_credit_time: None,
            shop_name: None,
            user_commission: None,
        };
        match &account.data {
            RoleData::Admin => {}
            RoleData::SubAdmin {
                credit,
                balance,
                last_credit_time,
                ..
            } => {
                summary.credit = Some(*credit);
                summary.balance = Some(*balance);
                summary.last_credit_time = Some(*last_credit_time);
            }
            RoleData::User {
                credit,
                balance,
                last_credit_time,
                shop_name,
                user_commission,
                ..
            } => {
                summary.credit = Some(*credit);
                summary.balance = Some(*balance);
                summary.last_credit_time = Some(*last_credit_time);
                summary.shop_name = Some(shop_name.clone());
                summary.user_commission = Some(*user_commission);
            }
        }
        summary
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub total_credited: f64,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub balance: f64,
    pub credit: f64,
    /// Remaining balance as a share of allocated credit, 0-100.
    pub percent: u8,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub name: String,
    pub username: String,
    pub shop_name: String,
    pub user_commission: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct UsernameUpdated {
    pub success: bool,
    pub new_username: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommissionRequest {
    pub commission: f64,
}

#[derive(Debug, Serialize)]
pub struct CommissionUpdated {
    pub success: bool,
    pub new_commission: f64,
}

#[derive(Debug, Deserialize)]
pub struct ConfigureGameRequest {
    pub bet_birr: f64,
    pub selected_cards: Vec<String>,
    pub line_checker: u32,
}

#[derive(Debug, Serialize)]
pub struct GameTokenResponse {
    pub token: String,
    pub total_bet: f64,
    pub winning_amount: f64,
    pub required_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CallRequest {
    pub card: Option<String>,
    #[serde(flatten)]
    pub flags: CallFlags,
}

#[derive(Debug, Deserialize)]
pub struct GamesQuery {
    /// `YYYY-MM-DD`; matches the ticket timestamp prefix.
    pub date: Option<String>,
}

/// Percent of allocated credit still held, clamped to 0-100.
pub fn utilization_percent(balance: f64, credit: f64) -> u8 {
    if credit <= 0.0 || !credit.is_finite() || !balance.is_finite() {
        return 0;
    }
    (balance / credit * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_clamped_and_rounded() {
        assert_eq!(utilization_percent(50.0, 100.0), 50);
        assert_eq!(utilization_percent(150.0, 100.0), 100);
        assert_eq!(utilization_percent(-10.0, 100.0), 0);
        assert_eq!(utilization_percent(66.6, 100.0), 67);
        assert_eq!(utilization_percent(10.0, 0.0), 0);
    }

    #[test]
    fn summary_hides_money_for_admins() {
        let admin = Account::admin(
            "Head Office".into(),
            "headoffice".into(),
            "hash".into(),
            None,
            Utc::now(),
        );
        let summary = AccountSummary::from(&admin);
        assert!(summary.balance.is_none());
        assert_eq!(summary.role, Role::Admin);
    }
}
