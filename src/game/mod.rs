//! Bingo game session engine.

pub mod engine;
pub mod types;

pub use engine::GameSessionEngine;
pub use types::{compute_stake, CallFlags, GameRecord, Stake};
