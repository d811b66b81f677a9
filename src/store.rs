//! Concurrent account store with optimistic transactions.
//!
//! The store is the single authoritative home of account and game data.
//! Every multi-account mutation goes through a [`Txn`] that snapshots
//! versions on fetch and re-checks them under the write side of a store-wide
//! commit gate; reads take the gate's read side, so no reader ever observes
//! a half-applied transaction (a debit without its matching credit). A
//! losing writer gets [`LedgerError::Conflict`] and nothing is applied.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::account::{Account, Role};
use crate::errors::{LedgerError, LedgerResult};

struct Stored {
    version: u64,
    account: Account,
}

#[derive(Default)]
pub struct AccountStore {
    accounts: DashMap<Uuid, Stored>,
    commit_gate: RwLock<()>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        let _gate = self.read_gate();
        self.accounts.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<Account> {
        let _gate = self.read_gate();
        self.accounts.get(&id).map(|s| s.account.clone())
    }

    /// Consistent multi-account snapshot: all entries are read under one
    /// gate acquisition, so a concurrent transfer is either fully visible
    /// or not at all.
    pub fn get_many(&self, ids: &[Uuid]) -> Vec<Option<Account>> {
        let _gate = self.read_gate();
        ids.iter()
            .map(|id| self.accounts.get(id).map(|s| s.account.clone()))
            .collect()
    }

    pub fn find_by_username(&self, username: &str) -> Option<Account> {
        let _gate = self.read_gate();
        self.accounts
            .iter()
            .find(|s| s.account.username == username)
            .map(|s| s.account.clone())
    }

    /// Case-sensitive, across all roles combined. `exclude` skips the account
    /// being updated.
    pub fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> bool {
        let _gate = self.read_gate();
        self.scan_username(username, exclude)
    }

    pub fn name_taken(&self, name: &str, exclude: Option<Uuid>) -> bool {
        let _gate = self.read_gate();
        self.scan_name(name, exclude)
    }

    /// Accounts of `role` created by `creator`, newest first.
    pub fn list_created_by(&self, creator: Uuid, role: Role) -> Vec<Account> {
        let _gate = self.read_gate();
        let mut out: Vec<Account> = self
            .accounts
            .iter()
            .filter(|s| s.account.role() == role && s.account.created_by == Some(creator))
            .map(|s| s.account.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Delete an account, scoped to its creator.
    pub fn remove(&self, id: Uuid, created_by: Uuid) -> LedgerResult<Account> {
        let _gate = self.write_gate();
        let owned = self
            .accounts
            .get(&id)
            .map(|s| s.account.created_by == Some(created_by))
            .unwrap_or(false);
        if !owned {
            return Err(LedgerError::not_found("account"));
        }
        self.accounts
            .remove(&id)
            .map(|(_, s)| s.account)
            .ok_or(LedgerError::Conflict)
    }

    pub fn begin(&self) -> Txn<'_> {
        Txn {
            store: self,
            reads: HashMap::new(),
            writes: HashMap::new(),
            inserts: Vec::new(),
        }
    }

    // Callers must hold the gate.
    fn scan_username(&self, username: &str, exclude: Option<Uuid>) -> bool {
        self.accounts
            .iter()
            .any(|s| s.account.username == username && Some(s.account.id) != exclude)
    }

    fn scan_name(&self, name: &str, exclude: Option<Uuid>) -> bool {
        self.accounts
            .iter()
            .any(|s| s.account.name == name && Some(s.account.id) != exclude)
    }

    fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.commit_gate
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.commit_gate
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One atomic unit of work. Dropping the transaction rolls it back.
pub struct Txn<'a> {
    store: &'a AccountStore,
    reads: HashMap<Uuid, u64>,
    writes: HashMap<Uuid, Account>,
    inserts: Vec<Account>,
}

impl Txn<'_> {
    /// Snapshot an account, recording its version for the commit check.
    /// Returns the staged copy if this transaction already wrote it.
    /// Fetches do not take the gate; a read that raced a commit is caught
    /// by the version check and surfaces as `Conflict`.
    pub fn fetch(&mut self, id: Uuid) -> LedgerResult<Account> {
        if let Some(staged) = self.writes.get(&id) {
            return Ok(staged.clone());
        }
        let stored = self
            .store
            .accounts
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("account"))?;
        self.reads.insert(id, stored.version);
        Ok(stored.account.clone())
    }

    /// Stage an update to an account previously fetched in this transaction.
    pub fn stage(&mut self, account: Account) {
        self.writes.insert(account.id, account);
    }

    /// Stage a brand new account; uniqueness is enforced at commit.
    pub fn insert(&mut self, account: Account) {
        self.inserts.push(account);
    }

    /// All-or-nothing commit: version checks, cross-role uniqueness, then
    /// apply, all under the write gate. Any failure leaves the store exactly
    /// as it was.
    pub fn commit(self) -> LedgerResult<()> {
        let _gate = self.store.write_gate();

        for (id, version) in &self.reads {
            match self.store.accounts.get(id) {
                Some(stored) if stored.version == *version => {}
                _ => return Err(LedgerError::Conflict),
            }
        }
        for id in self.writes.keys() {
            if !self.reads.contains_key(id) {
                // A write without a prior fetch has no version to check.
                return Err(LedgerError::Conflict);
            }
        }

        let staged: Vec<&Account> = self.inserts.iter().chain(self.writes.values()).collect();
        for (i, account) in staged.iter().enumerate() {
            if self.store.scan_username(&account.username, Some(account.id)) {
                return Err(LedgerError::DuplicateUsername);
            }
            if self.store.scan_name(&account.name, Some(account.id)) {
                return Err(LedgerError::DuplicateName);
            }
            for earlier in &staged[..i] {
                if earlier.id == account.id {
                    continue;
                }
                if earlier.username == account.username {
                    return Err(LedgerError::DuplicateUsername);
                }
                if earlier.name == account.name {
                    return Err(LedgerError::DuplicateName);
                }
            }
        }

        for account in self.inserts {
            self.store
                .accounts
                .insert(account.id, Stored { version: 1, account });
        }
        for (id, account) in self.writes {
            if let Some(mut stored) = self.store.accounts.get_mut(&id) {
                stored.version += 1;
                stored.account = account;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountState, RoleData};
    use chrono::Utc;
    use std::sync::Arc;

    fn admin(name: &str, username: &str) -> Account {
        Account::admin(name.into(), username.into(), "hash".into(), None, Utc::now())
    }

    fn subadmin(name: &str, username: &str, credit: f64, creator: Uuid) -> Account {
        Account::subadmin(name.into(), username.into(), "hash".into(), credit, creator, Utc::now())
    }

    fn seed(store: &AccountStore, account: Account) -> Uuid {
        let id = account.id;
        let mut txn = store.begin();
        txn.insert(account);
        txn.commit().unwrap();
        id
    }

    #[test]
    fn insert_and_lookup() {
        let store = AccountStore::new();
        let id = seed(&store, admin("Head Office", "headoffice"));
        assert_eq!(store.get(id).unwrap().username, "headoffice");
        assert!(store.find_by_username("headoffice").is_some());
        assert!(store.find_by_username("HEADOFFICE").is_none()); // case-sensitive
    }

    #[test]
    fn uniqueness_spans_roles() {
        let store = AccountStore::new();
        let admin_id = seed(&store, admin("Head Office", "headoffice"));

        let mut txn = store.begin();
        txn.insert(subadmin("Branch One", "headoffice", 100.0, admin_id));
        assert_eq!(txn.commit(), Err(LedgerError::DuplicateUsername));

        let mut txn = store.begin();
        txn.insert(subadmin("Head Office", "branchone1", 100.0, admin_id));
        assert_eq!(txn.commit(), Err(LedgerError::DuplicateName));
    }

    #[test]
    fn uniqueness_excludes_the_account_being_updated() {
        let store = AccountStore::new();
        let id = seed(&store, admin("Head Office", "headoffice"));

        let mut txn = store.begin();
        let mut account = txn.fetch(id).unwrap();
        account.state = AccountState::Suspended;
        txn.stage(account);
        txn.commit().unwrap();
        assert_eq!(store.get(id).unwrap().state, AccountState::Suspended);
    }

    #[test]
    fn stale_writer_gets_conflict() {
        let store = AccountStore::new();
        let admin_id = seed(&store, admin("Head Office", "headoffice"));
        let sub_id = seed(&store, subadmin("Branch One", "branchone1", 100.0, admin_id));

        let mut first = store.begin();
        let mut second = store.begin();
        let mut a = first.fetch(sub_id).unwrap();
        let mut b = second.fetch(sub_id).unwrap();

        if let RoleData::SubAdmin { balance, .. } = &mut a.data {
            *balance -= 40.0;
        }
        first.stage(a);
        first.commit().unwrap();

        if let RoleData::SubAdmin { balance, .. } = &mut b.data {
            *balance -= 40.0;
        }
        second.stage(b);
        assert_eq!(second.commit(), Err(LedgerError::Conflict));

        // Only the first debit applied.
        assert_eq!(store.get(sub_id).unwrap().balance(), 60.0);
    }

    #[test]
    fn readers_never_see_a_half_applied_transfer() {
        let store = Arc::new(AccountStore::new());
        let admin_id = seed(&store, admin("Head Office", "headoffice"));
        let a = seed(&store, subadmin("Branch One", "branchone1", 600.0, admin_id));
        let b = seed(&store, subadmin("Branch Two", "branchtwo1", 400.0, admin_id));

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..2_000 {
                    let mut txn = store.begin();
                    let mut from = txn.fetch(a).unwrap();
                    let mut to = txn.fetch(b).unwrap();
                    if let RoleData::SubAdmin { balance, .. } = &mut from.data {
                        *balance -= 10.0;
                    }
                    if let RoleData::SubAdmin { balance, .. } = &mut to.data {
                        *balance += 10.0;
                    }
                    txn.stage(from);
                    txn.stage(to);
                    txn.commit().unwrap();
                }
            })
        };

        // Both sides of every transfer land together: the pair's sum never
        // moves, no matter when the snapshot is taken.
        let pair_total = |store: &AccountStore| -> f64 {
            store
                .get_many(&[a, b])
                .iter()
                .flatten()
                .map(|account| account.balance())
                .sum()
        };
        while !writer.is_finished() {
            assert_eq!(pair_total(&store), 1_000.0);
        }
        writer.join().unwrap();
        assert_eq!(pair_total(&store), 1_000.0);
    }

    #[test]
    fn remove_is_scoped_to_creator() {
        let store = AccountStore::new();
        let admin_id = seed(&store, admin("Head Office", "headoffice"));
        let other_id = seed(&store, admin("Other Office", "otheroffice"));
        let sub_id = seed(&store, subadmin("Branch One", "branchone1", 0.0, admin_id));

        assert_eq!(
            store.remove(sub_id, other_id),
            Err(LedgerError::not_found("account"))
        );
        assert!(store.remove(sub_id, admin_id).is_ok());
        assert!(store.get(sub_id).is_none());
    }

    #[test]
    fn listing_is_newest_first_and_role_scoped() {
        let store = AccountStore::new();
        let admin_id = seed(&store, admin("Head Office", "headoffice"));
        let mut older = subadmin("Branch One", "branchone1", 0.0, admin_id);
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        seed(&store, older);
        seed(&store, subadmin("Branch Two", "branchtwo1", 0.0, admin_id));

        let listed = store.list_created_by(admin_id, Role::SubAdmin);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].username, "branchtwo1");
        assert!(store.list_created_by(admin_id, Role::User).is_empty());
    }
}
