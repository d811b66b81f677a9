//! Atomic SubAdmin -> User credit transfers.
//!
//! Both entry points run as a single store transaction: the SubAdmin debit,
//! the history entry, and the User credit commit together or not at all.
//! There is no idempotency key; a retry after an ambiguous failure must
//! confirm state first or it will double-debit.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::account::{validate_credit, Account, AccountState, RoleData};
use crate::errors::{LedgerError, LedgerResult};
use crate::history::HistoryEntry;
use crate::store::{AccountStore, Txn};

/// Validated inputs for a User created with an initial allocation.
#[derive(Debug, Clone)]
pub struct NewUserSpec {
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub credit: f64,
    pub user_commission: f64,
    pub owner_commission: f64,
}

pub struct TransferCoordinator {
    store: Arc<AccountStore>,
    retry_limit: u32,
}

impl TransferCoordinator {
    pub fn new(store: Arc<AccountStore>, retry_limit: u32) -> Self {
        Self { store, retry_limit }
    }

    /// Create a User funded out of the issuing SubAdmin's balance.
    pub fn credit_new_user(&self, subadmin_id: Uuid, spec: NewUserSpec) -> LedgerResult<Account> {
        let amount = validate_credit(spec.credit).map_err(LedgerError::invalid)?;

        for attempt in 0..self.retry_limit {
            let now = Utc::now();
            let mut txn = self.store.begin();
            stage_debit(&mut txn, subadmin_id, &spec.username, amount, now)?;

            let user = Account {
                id: Uuid::new_v4(),
                username: spec.username.clone(),
                name: spec.name.clone(),
                password_hash: spec.password_hash.clone(),
                state: AccountState::Active,
                created_by: Some(subadmin_id),
                created_at: now,
                data: RoleData::User {
                    credit: amount,
                    balance: amount,
                    initial_balance: amount,
                    last_credit_time: now,
                    shop_name: spec.name.clone(),
                    user_commission: spec.user_commission,
                    owner_commission: spec.owner_commission,
                    games: Vec::new(),
                },
            };
            txn.insert(user.clone());

            match txn.commit() {
                Ok(()) => return Ok(user),
                Err(LedgerError::Conflict) if attempt + 1 < self.retry_limit => continue,
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// Add funds to an existing User created by this SubAdmin.
    pub fn top_up(&self, subadmin_id: Uuid, user_id: Uuid, amount: f64) -> LedgerResult<()> {
        let amount = validate_credit(amount).map_err(LedgerError::invalid)?;

        for attempt in 0..self.retry_limit {
            let now = Utc::now();
            let mut txn = self.store.begin();
            let mut user = txn.fetch(user_id)?;
            if user.created_by != Some(subadmin_id) {
                return Err(LedgerError::not_found("user"));
            }
            stage_debit(&mut txn, subadmin_id, &user.username.clone(), amount, now)?;

            match &mut user.data {
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
                }
                _ => return Err(LedgerError::not_found("user")),
            }
            txn.stage(user);

            match txn.commit() {
                Ok(()) => return Ok(()),
                Err(LedgerError::Conflict) if attempt + 1 < self.retry_limit => continue,
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::Conflict)
    }
}

/// Debit the issuer and append the ledger entry, inside the caller's
/// transaction. Shared with the sparse-update path so credit edits move money
/// under the same all-or-nothing rules.
pub(crate) fn stage_debit(
    txn: &mut Txn<'_>,
    subadmin_id: Uuid,
    recipient: &str,
    amount: f64,
    now: chrono::DateTime<Utc>,
) -> LedgerResult<()> {
    let mut issuer = txn.fetch(subadmin_id)?;
    if !issuer.is_active() {
        return Err(LedgerError::Suspended);
    }
    match &mut issuer.data {
        RoleData::SubAdmin {
            balance, history, ..
        } => {
            if *balance < amount {
                return Err(LedgerError::InsufficientBalance);
            }
            *balance -= amount;
            history.push(HistoryEntry::outflow(amount, recipient, now));
        }
        _ => return Err(LedgerError::not_found("subadmin")),
    }
    txn.stage(issuer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history;

    fn setup(credit: f64) -> (Arc<AccountStore>, Uuid) {
        let store = Arc::new(AccountStore::new());
        let admin = Account::admin("Head Office".into(), "headoffice".into(), "h".into(), None, Utc::now());
        let admin_id = admin.id;
        let sub = Account::subadmin(
            "Branch One".into(),
            "branchone1".into(),
            "h".into(),
            credit,
            admin_id,
            Utc::now(),
        );
        let sub_id = sub.id;
        let mut txn = store.begin();
        txn.insert(admin);
        txn.insert(sub);
        txn.commit().unwrap();
        (store, sub_id)
    }

    fn user_spec(credit: f64) -> NewUserSpec {
        NewUserSpec {
            name: "Shop One".into(),
            username: "shopone12".into(),
            password_hash: "h".into(),
            credit,
            user_commission: 20.0,
            owner_commission: 20.0,
        }
    }

    fn subadmin_parts(account: &Account) -> (f64, Vec<HistoryEntry>) {
        match &account.data {
            RoleData::SubAdmin {
                balance, history, ..
            } => (*balance, history.clone()),
            _ => panic!("not a subadmin"),
        }
    }

    #[test]
    fn transfer_conserves_total_balance() {
        let (store, sub_id) = setup(500.0);
        let coordinator = TransferCoordinator::new(store.clone(), 3);

        let user = coordinator.credit_new_user(sub_id, user_spec(120.0)).unwrap();

        let sub = store.get(sub_id).unwrap();
        let (balance, entries) = subadmin_parts(&sub);
        assert_eq!(balance, 380.0);
        assert_eq!(user.balance(), 120.0);
        assert_eq!(balance + user.balance(), 500.0);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, -120.0);
        assert_eq!(entries[0].recipient, "shopone12");
        assert_eq!(history::total_credited(&entries), 120.0);
    }

    #[test]
    fn insufficient_balance_changes_nothing() {
        let (store, sub_id) = setup(100.0);
        let coordinator = TransferCoordinator::new(store.clone(), 3);

        let err = coordinator
            .credit_new_user(sub_id, user_spec(150.0))
            .unwrap_err();
        assert_eq!(err, LedgerError::InsufficientBalance);

        let (balance, entries) = subadmin_parts(&store.get(sub_id).unwrap());
        assert_eq!(balance, 100.0);
        assert!(entries.is_empty());
        assert!(store.find_by_username("shopone12").is_none());
    }

    #[test]
    fn top_up_updates_credit_fields() {
        let (store, sub_id) = setup(500.0);
        let coordinator = TransferCoordinator::new(store.clone(), 3);
        let user = coordinator.credit_new_user(sub_id, user_spec(100.0)).unwrap();

        coordinator.top_up(sub_id, user.id, 50.0).unwrap();

        let user = store.get(user.id).unwrap();
        match &user.data {
            RoleData::User {
                credit,
                balance,
                initial_balance,
                ..
            } => {
                assert_eq!(*credit, 50.0);
                assert_eq!(*balance, 150.0);
                assert_eq!(*initial_balance, 150.0);
            }
            _ => panic!("not a user"),
        }
        let (balance, entries) = subadmin_parts(&store.get(sub_id).unwrap());
        assert_eq!(balance, 350.0);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn top_up_is_scoped_to_the_creator() {
        let (store, sub_id) = setup(500.0);
        let (_, other_store_sub) = setup(500.0);
        let coordinator = TransferCoordinator::new(store.clone(), 3);
        let user = coordinator.credit_new_user(sub_id, user_spec(100.0)).unwrap();

        // A different subadmin id cannot top up someone else's user.
        let err = coordinator.top_up(other_store_sub, user.id, 50.0).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn zero_or_negative_amounts_are_rejected() {
        let (store, sub_id) = setup(500.0);
        let coordinator = TransferCoordinator::new(store, 3);
        assert!(matches!(
            coordinator.credit_new_user(sub_id, user_spec(0.0)),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            coordinator.credit_new_user(sub_id, user_spec(-10.0)),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn suspended_issuer_cannot_transfer() {
        let (store, sub_id) = setup(500.0);
        let mut txn = store.begin();
        let mut sub = txn.fetch(sub_id).unwrap();
        sub.state = AccountState::Suspended;
        txn.stage(sub);
        txn.commit().unwrap();

        let coordinator = TransferCoordinator::new(store, 3);
        assert_eq!(
            coordinator.credit_new_user(sub_id, user_spec(10.0)),
            Err(LedgerError::Suspended)
        );
    }
}
