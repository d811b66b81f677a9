//! Game record and stake types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bingo session. The stake fields are frozen when the game starts; only
/// the call/winner sets and `game_end` change while the session is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_start: DateTime<Utc>,
    pub game_end: DateTime<Utc>,
    /// Stake per card.
    pub bet_birr: f64,
    /// Cards the player committed to at start.
    pub picked_cards: Vec<String>,
    pub on_calls: Vec<String>,
    pub winner_cards: Vec<String>,
    pub lucky_passed_cards: Vec<String>,
    /// Payout if the player wins.
    pub dersh: f64,
    /// Amount debited from the player's balance for this game.
    pub commission: f64,
    /// Username of the player that started the game.
    pub by: String,
    pub shop_name: String,
    /// Display timestamp, `YYYY-MM-DD hh:mm:ss AM/PM`.
    pub time: String,
    /// Position in the owning User's `games` sequence.
    pub index: usize,
}

/// Computed money figures for a configured game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stake {
    pub total_bet: f64,
    pub winning_amount: f64,
    pub required_balance: f64,
}

/// Payout rule: small games (at or below the free-card threshold) pay the
/// full pot and cost nothing to start; larger games deduct the player's
/// commission percentage, and that deduction is what the house debits.
pub fn compute_stake(
    bet_birr: f64,
    card_count: usize,
    commission_pct: f64,
    free_card_threshold: usize,
) -> Stake {
    let total_bet = round2(bet_birr * card_count as f64);
    if card_count <= free_card_threshold {
        return Stake {
            total_bet,
            winning_amount: total_bet,
            required_balance: 0.0,
        };
    }
    let winning_amount = round2(total_bet * (1.0 - commission_pct / 100.0));
    Stake {
        total_bet,
        winning_amount,
        required_balance: round2(total_bet - winning_amount),
    }
}

/// Round to two decimal places, matching how amounts are presented.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Display timestamp in the shop's ticket format.
pub fn ticket_time(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %I:%M:%S %p").to_string()
}

/// Flags attached to a card-call event.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CallFlags {
    #[serde(default)]
    pub winner: bool,
    #[serde(default)]
    pub lucky_passed: bool,
}
