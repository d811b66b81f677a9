//! Cartela - multi-tenant balance ledger for a bingo service.
//!
//! Three account tiers (Admin -> SubAdmin -> User) share one store; credit
//! flows strictly downward through atomic transfers, and game sessions are
//! driven by a signed token the client carries between requests. The
//! in-process store is the authoritative source of truth; tokens are
//! capabilities, never balances.

pub mod account;
pub mod api;
pub mod config;
pub mod errors;
pub mod game;
pub mod history;
pub mod password;
pub mod store;
pub mod token;
pub mod transfer;
pub mod update;

pub use account::{Account, AccountState, Role, RoleData};
pub use api::ApiServer;
pub use config::LedgerConfig;
pub use errors::{LedgerError, LedgerResult};
pub use game::GameSessionEngine;
pub use store::AccountStore;
pub use token::{Claims, SessionTokenCodec};
pub use transfer::TransferCoordinator;
