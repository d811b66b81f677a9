//! End-to-end ledger flow: bootstrap admin, credit chain, game lifecycle.

use chrono::Utc;
use std::sync::Arc;

use cartela::account::{Account, RoleData};
use cartela::config::GameConfig;
use cartela::game::{CallFlags, GameSessionEngine};
use cartela::password::{hash_password, verify_password};
use cartela::store::AccountStore;
use cartela::token::{Claims, IdentityClaims, SessionTokenCodec};
use cartela::transfer::{NewUserSpec, TransferCoordinator};
use cartela::{LedgerError, Role};

fn seed_admin(store: &AccountStore) -> Account {
    let admin = Account::admin(
        "House Admin".into(),
        "houseadmin".into(),
        hash_password("ChangeMe123!"),
        None,
        Utc::now(),
    );
    let mut txn = store.begin();
    txn.insert(admin.clone());
    txn.commit().unwrap();
    admin
}

#[test]
fn full_credit_chain_and_game_lifecycle() {
    let store = Arc::new(AccountStore::new());
    let admin = seed_admin(&store);

    // Admin allocates a branch.
    let subadmin = Account::subadmin(
        "Branch Bole".into(),
        "branchbole".into(),
        hash_password("Branch1!pw"),
        1_000.0,
        admin.id,
        Utc::now(),
    );
    let sub_id = subadmin.id;
    let mut txn = store.begin();
    txn.insert(subadmin);
    txn.commit().unwrap();

    // Branch funds a shop out of its own balance.
    let transfers = TransferCoordinator::new(store.clone(), 3);
    let user = transfers
        .credit_new_user(
            sub_id,
            NewUserSpec {
                name: "Bole Shop".into(),
                username: "boleshop1".into(),
                password_hash: hash_password("Shop1!pass"),
                credit: 200.0,
                user_commission: 20.0,
                owner_commission: 20.0,
            },
        )
        .unwrap();

    assert_eq!(store.get(sub_id).unwrap().balance(), 800.0);
    assert_eq!(user.balance(), 200.0);

    // Shop runs a commissioned game: 5 cards at 10 birr, 20% commission.
    let engine = GameSessionEngine::new(store.clone(), GameConfig::default());
    let cards: Vec<String> = (1..=5).map(|n| n.to_string()).collect();
    let configured = engine.configure(&user, 10.0, cards, 2).unwrap();
    assert_eq!(configured.total_bet, 50.0);
    assert_eq!(configured.winning_amount, 40.0);
    assert_eq!(configured.required_balance, 10.0);
    assert_eq!(configured.game_index, None);

    // Configuring moves no money.
    assert_eq!(store.get(user.id).unwrap().balance(), 200.0);

    let started = engine.start(user.id, &configured).unwrap();
    assert_eq!(started.game_index, Some(0));
    assert_eq!(store.get(user.id).unwrap().balance(), 190.0);

    // Calls accumulate as sets; a replayed event changes nothing.
    engine
        .record_call(user.id, 0, Some("4"), CallFlags::default())
        .unwrap();
    engine
        .record_call(
            user.id,
            0,
            Some("4"),
            CallFlags {
                winner: true,
                ..CallFlags::default()
            },
        )
        .unwrap();

    let stored = store.get(user.id).unwrap();
    let RoleData::User { games, .. } = &stored.data else {
        panic!("not a user");
    };
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].on_calls, vec!["4".to_string()]);
    assert_eq!(games[0].winner_cards, vec!["4".to_string()]);
    assert_eq!(games[0].dersh, 40.0);
    assert_eq!(games[0].commission, 10.0);

    // Money never left the system: admin holds none, branch + shop + house
    // cut add back up to the original allocation.
    let sub_balance = store.get(sub_id).unwrap().balance();
    let user_balance = store.get(user.id).unwrap().balance();
    assert_eq!(sub_balance + user_balance + 10.0, 1_000.0);
}

#[test]
fn suspended_account_cannot_authenticate_or_play() {
    let store = Arc::new(AccountStore::new());
    let admin = seed_admin(&store);
    let subadmin = Account::subadmin(
        "Branch Two".into(),
        "branchtwo2".into(),
        hash_password("Branch2!pw"),
        500.0,
        admin.id,
        Utc::now(),
    );
    let sub_id = subadmin.id;
    let mut txn = store.begin();
    txn.insert(subadmin);
    txn.commit().unwrap();

    let transfers = TransferCoordinator::new(store.clone(), 3);
    let user = transfers
        .credit_new_user(
            sub_id,
            NewUserSpec {
                name: "Second Shop".into(),
                username: "secondshop".into(),
                password_hash: hash_password("Shop2!pass"),
                credit: 100.0,
                user_commission: 20.0,
                owner_commission: 20.0,
            },
        )
        .unwrap();

    let engine = GameSessionEngine::new(store.clone(), GameConfig::default());
    let cards: Vec<String> = (1..=5).map(|n| n.to_string()).collect();
    let configured = engine.configure(&user, 10.0, cards, 1).unwrap();

    // Suspend the shop between configure and start.
    let mut txn = store.begin();
    let mut frozen = txn.fetch(user.id).unwrap();
    frozen.state = cartela::AccountState::Suspended;
    txn.stage(frozen);
    txn.commit().unwrap();

    assert_eq!(
        engine.start(user.id, &configured),
        Err(LedgerError::Suspended)
    );
    assert_eq!(store.get(user.id).unwrap().balance(), 100.0);
}

#[test]
fn tokens_survive_restart_only_with_a_fixed_seed() {
    let claims = Claims::Identity(IdentityClaims {
        account_id: uuid::Uuid::new_v4(),
        role: Role::SubAdmin,
        name: "Branch Bole".into(),
    });

    let seed = [42u8; 32];
    let token = SessionTokenCodec::from_seed(seed).encode(&claims).unwrap();
    assert_eq!(
        SessionTokenCodec::from_seed(seed).decode(&token).unwrap(),
        claims
    );

    // A regenerated key invalidates every outstanding token.
    assert_eq!(
        SessionTokenCodec::generate().decode(&token),
        Err(LedgerError::Unauthorized)
    );
}

#[test]
fn password_digests_verify_and_differ_per_salt() {
    let a = hash_password("Shop1!pass");
    let b = hash_password("Shop1!pass");
    assert_ne!(a, b);
    assert!(verify_password("Shop1!pass", &a));
    assert!(verify_password("Shop1!pass", &b));
    assert!(!verify_password("Shop1!pasx", &a));
}
