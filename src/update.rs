//! Per-field account updates, under two distinct policies.
//!
//! Creator-facing sparse updates are all-or-nothing: each recognized field
//! maps to a validator + mutator, errors accumulate per field, and the
//! update commits only when every field passed. Monetary fields route
//! through the same transaction as everything else, so a credit edit and a
//! rename either land together or not at all.
//!
//! Self-service profile changes are best-effort: username, password, and
//! commission each apply independently in their own transaction, so one
//! rejected field never rolls back another that already landed.

use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::account::{
    validate_commission, validate_credit, validate_name, validate_password, validate_state,
    validate_username, Account, Role, RoleData,
};
use crate::errors::{LedgerError, LedgerResult};
use crate::password::{hash_password, verify_password};
use crate::store::AccountStore;
use crate::transfer::stage_debit;

pub struct AccountUpdater {
    store: Arc<AccountStore>,
    retry_limit: u32,
}

impl AccountUpdater {
    pub fn new(store: Arc<AccountStore>, retry_limit: u32) -> Self {
        Self { store, retry_limit }
    }

    /// Apply a sparse field set to an account the caller created. Collects
    /// one error per rejected field; any error means nothing is committed.
    pub fn apply(
        &self,
        caller: &Account,
        target_id: Uuid,
        fields: &Map<String, Value>,
    ) -> LedgerResult<()> {
        for attempt in 0..self.retry_limit {
            match self.try_apply(caller, target_id, fields) {
                Err(LedgerError::Conflict) if attempt + 1 < self.retry_limit => continue,
                other => return other,
            }
        }
        Err(LedgerError::Conflict)
    }

    fn try_apply(
        &self,
        caller: &Account,
        target_id: Uuid,
        fields: &Map<String, Value>,
    ) -> LedgerResult<()> {
        let now = Utc::now();
        let mut txn = self.store.begin();
        let mut target = txn.fetch(target_id)?;
        if target.created_by != Some(caller.id) {
            return Err(LedgerError::not_found("account"));
        }

        let mut errors = Vec::new();
        let mut needs_issuer_debit: Option<f64> = None;

        for (key, value) in fields {
            let result = match key.as_str() {
                "name" => self.update_name(&mut target, value),
                "username" => self.update_username(&mut target, value),
                "password" => update_password(&mut target, value),
                "state" => update_state(&mut target, value),
                "credit" => match update_credit(&mut target, value, now) {
                    Ok(debit) => {
                        needs_issuer_debit = debit;
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                _ => Err(format!("field \"{key}\" is not allowed")),
            };
            if let Err(message) = result {
                errors.push(format!("{key}: {message}"));
            }
        }

        if !errors.is_empty() {
            return Err(LedgerError::Validation(errors));
        }

        // A User credit edit is a real transfer: debit the issuing SubAdmin
        // and record it, in the same commit as the field changes.
        if let Some(amount) = needs_issuer_debit {
            let recipient = target.username.clone();
            stage_debit(&mut txn, caller.id, &recipient, amount, now)?;
        }

        txn.stage(target);
        txn.commit()
    }

    fn update_name(&self, target: &mut Account, value: &Value) -> Result<(), String> {
        let name = validate_name(as_str(value)?)?;
        if self.store.name_taken(&name, Some(target.id)) {
            return Err("name already exists".into());
        }
        target.name = name;
        Ok(())
    }

    fn update_username(&self, target: &mut Account, value: &Value) -> Result<(), String> {
        let username = validate_username(as_str(value)?)?;
        if self.store.username_taken(&username, Some(target.id)) {
            return Err("username already exists".into());
        }
        target.username = username;
        Ok(())
    }
}

// ---- self-service profile operations (best-effort, one field per call) ----

impl AccountUpdater {
    /// Change the caller's own username. Submitting the current username is
    /// a successful no-op.
    pub fn change_own_username(&self, account_id: Uuid, raw: &str) -> LedgerResult<String> {
        let username = validate_username(raw).map_err(LedgerError::invalid)?;
        for attempt in 0..self.retry_limit {
            let mut txn = self.store.begin();
            let mut account = txn.fetch(account_id)?;
            if account.username == username {
                return Ok(username);
            }
            if self.store.username_taken(&username, Some(account_id)) {
                return Err(LedgerError::DuplicateUsername);
            }
            account.username = username.clone();
            txn.stage(account);
            match txn.commit() {
                Ok(()) => return Ok(username),
                Err(LedgerError::Conflict) if attempt + 1 < self.retry_limit => continue,
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// Change the caller's own password. The current password must verify
    /// and the new one must actually differ.
    pub fn change_own_password(
        &self,
        account_id: Uuid,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> LedgerResult<()> {
        if current.is_empty() || new.is_empty() || confirm.is_empty() {
            return Err(LedgerError::invalid("all password fields are required"));
        }
        if new != confirm {
            return Err(LedgerError::invalid("new passwords do not match"));
        }
        let new = validate_password(new).map_err(LedgerError::invalid)?;

        for attempt in 0..self.retry_limit {
            let mut txn = self.store.begin();
            let mut account = txn.fetch(account_id)?;
            if !verify_password(current, &account.password_hash) {
                return Err(LedgerError::invalid("current password is incorrect"));
            }
            if verify_password(&new, &account.password_hash) {
                return Err(LedgerError::invalid(
                    "new password must be different from current password",
                ));
            }
            account.password_hash = hash_password(&new);
            txn.stage(account);
            match txn.commit() {
                Ok(()) => return Ok(()),
                Err(LedgerError::Conflict) if attempt + 1 < self.retry_limit => continue,
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// Change the caller's own payout commission. Only Users carry one.
    pub fn change_own_commission(&self, account_id: Uuid, value: f64) -> LedgerResult<f64> {
        let value = validate_commission(value).map_err(LedgerError::invalid)?;
        for attempt in 0..self.retry_limit {
            let mut txn = self.store.begin();
            let mut account = txn.fetch(account_id)?;
            match &mut account.data {
                RoleData::User {
                    user_commission, ..
                } => *user_commission = value,
                _ => return Err(LedgerError::Unauthorized),
            }
            txn.stage(account);
            match txn.commit() {
                Ok(()) => return Ok(value),
                Err(LedgerError::Conflict) if attempt + 1 < self.retry_limit => continue,
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::Conflict)
    }
}

fn update_password(target: &mut Account, value: &Value) -> Result<(), String> {
    let password = validate_password(as_str(value)?)?;
    if verify_password(&password, &target.password_hash) {
        return Err("new password must be different from current password".into());
    }
    target.password_hash = hash_password(&password);
    Ok(())
}

fn update_state(target: &mut Account, value: &Value) -> Result<(), String> {
    target.state = validate_state(as_str(value)?)?;
    Ok(())
}

/// Returns the amount to debit from the issuing SubAdmin when the target is
/// a User (SubAdmin credit is allocated from above, with no issuer balance).
fn update_credit(
    target: &mut Account,
    value: &Value,
    now: chrono::DateTime<Utc>,
) -> Result<Option<f64>, String> {
    let amount = validate_credit(as_number(value)?)?;
    match &mut target.data {
        RoleData::SubAdmin {
            credit,
            balance,
            last_credit_time,
            ..
        } => {
            *credit = amount;
            *balance += amount;
            *last_credit_time = now;
            Ok(None)
        }
        RoleData::User {
            credit,
            balance,
            initial_balance,
            last_credit_time,
            ..
        } => {
            *credit = amount;
            *balance += amount;
            *initial_balance = *balance;
            *last_credit_time = now;
            Ok(Some(amount))
        }
        RoleData::Admin => Err(format!(
            "field \"credit\" is not allowed for {} accounts",
            Role::Admin
        )),
    }
}

fn as_str(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| "must be a string".to_string())
}

fn as_number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| "must be a number".to_string()),
        // Form posts often carry numbers as strings.
        Value::String(s) => s.trim().parse().map_err(|_| "must be a number".to_string()),
        _ => Err("must be a number".to_string()),
    }
}
