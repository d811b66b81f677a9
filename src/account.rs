//! Account model: three roles sharing one base record, selected by a role
//! tag carrying the variant-specific fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::game::types::GameRecord;
use crate::history::HistoryEntry;

pub const DEFAULT_COMMISSION: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    SubAdmin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::SubAdmin => write!(f, "subadmin"),
            Role::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    Active,
    Suspended,
}

/// Role-specific payload. Only SubAdmins carry a transfer history; only
/// Users carry game records and commissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleData {
    Admin,
    SubAdmin {
        credit: f64,
        balance: f64,
        last_credit_time: DateTime<Utc>,
        history: Vec<HistoryEntry>,
    },
    User {
        credit: f64,
        balance: f64,
        initial_balance: f64,
        last_credit_time: DateTime<Utc>,
        shop_name: String,
        /// Percentage (1-100) deducted from this player's payouts.
        user_commission: f64,
        owner_commission: f64,
        games: Vec<GameRecord>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub state: AccountState,
    /// Creating account, establishing the Admin -> SubAdmin -> User chain.
    /// Only the bootstrap admin has no creator.
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub data: RoleData,
}

impl Account {
    pub fn admin(
        name: String,
        username: String,
        password_hash: String,
        created_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            name,
            password_hash,
            state: AccountState::Active,
            created_by,
            created_at: now,
            data: RoleData::Admin,
        }
    }

    pub fn subadmin(
        name: String,
        username: String,
        password_hash: String,
        credit: f64,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            name,
            password_hash,
            state: AccountState::Active,
            created_by: Some(created_by),
            created_at: now,
            data: RoleData::SubAdmin {
                credit,
                balance: credit,
                last_credit_time: now,
                history: Vec::new(),
            },
        }
    }

    pub fn role(&self) -> Role {
        match self.data {
            RoleData::Admin => Role::Admin,
            RoleData::SubAdmin { .. } => Role::SubAdmin,
            RoleData::User { .. } => Role::User,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == AccountState::Active
    }

    /// Spendable amount; admins hold no money.
    pub fn balance(&self) -> f64 {
        match &self.data {
            RoleData::Admin => 0.0,
            RoleData::SubAdmin { balance, .. } | RoleData::User { balance, .. } => *balance,
        }
    }
}

// ---- field validators, shared by signup and sparse updates ----

pub fn validate_name(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.len() < 4 {
        return Err("name must be at least 4 characters".into());
    }
    Ok(trimmed.to_string())
}

pub fn validate_username(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.len() < 8 {
        return Err("username must be at least 8 characters".into());
    }
    // Case preserved on purpose; uniqueness is case-sensitive.
    Ok(trimmed.to_string())
}

pub fn validate_password(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.len() < 8 {
        return Err("password must be at least 8 characters".into());
    }
    let has_upper = trimmed.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = trimmed.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = trimmed.chars().any(|c| c.is_ascii_digit());
    let has_special = trimmed.chars().any(|c| !c.is_ascii_alphanumeric());
    if !(has_upper && has_lower && has_digit && has_special) {
        return Err(
            "password must contain at least one uppercase letter, one lowercase letter, \
             one number, and one special character"
                .into(),
        );
    }
    Ok(trimmed.to_string())
}

pub fn validate_credit(value: f64) -> Result<f64, String> {
    if !value.is_finite() || value <= 0.0 {
        return Err("credit must be a positive number".into());
    }
    Ok(value)
}

pub fn validate_commission(value: f64) -> Result<f64, String> {
    if !value.is_finite() {
        return Err("commission must be a number".into());
    }
    if !(1.0..=100.0).contains(&value) {
        return Err("commission must be between 1 and 100".into());
    }
    Ok(value)
}

pub fn validate_state(value: &str) -> Result<AccountState, String> {
    match value {
        "active" => Ok(AccountState::Active),
        "suspended" => Ok(AccountState::Suspended),
        _ => Err("state must be either active or suspended".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules_require_all_character_classes() {
        assert!(validate_password("Aa1!aaaa").is_ok());
        assert!(validate_password("aa1!aaaa").is_err()); // no uppercase
        assert!(validate_password("AA1!AAAA").is_err()); // no lowercase
        assert!(validate_password("Aa!aaaaa").is_err()); // no digit
        assert!(validate_password("Aa1aaaaa").is_err()); // no special
        assert!(validate_password("Aa1!a").is_err()); // too short
    }

    #[test]
    fn username_is_trimmed_but_case_preserved() {
        assert_eq!(validate_username("  ShopUser1  ").unwrap(), "ShopUser1");
        assert!(validate_username("short").is_err());
    }

    #[test]
    fn commission_bounds() {
        assert!(validate_commission(1.0).is_ok());
        assert!(validate_commission(100.0).is_ok());
        assert!(validate_commission(0.5).is_err());
        assert!(validate_commission(101.0).is_err());
        assert!(validate_commission(f64::NAN).is_err());
    }

    #[test]
    fn credit_must_be_positive() {
        assert!(validate_credit(0.01).is_ok());
        assert!(validate_credit(0.0).is_err());
        assert!(validate_credit(-5.0).is_err());
        assert!(validate_credit(f64::INFINITY).is_err());
    }

    #[test]
    fn role_tag_matches_data() {
        let now = Utc::now();
        let admin = Account::admin("Head Office".into(), "headoffice".into(), "h".into(), None, now);
        assert_eq!(admin.role(), Role::Admin);
        assert_eq!(admin.balance(), 0.0);

        let sub = Account::subadmin(
            "Branch One".into(),
            "branchone".into(),
            "h".into(),
            500.0,
            admin.id,
            now,
        );
        assert_eq!(sub.role(), Role::SubAdmin);
        assert_eq!(sub.balance(), 500.0);
    }
}
