//! Game-session state machine: Idle -> Configured -> InProgress -> Ended.
//!
//! All continuity between requests travels in the signed game token; the
//! engine re-validates every money-relevant figure against the store at the
//! moment funds move. Ending is implicit: once calls stop arriving a record
//! is just history, and configuring a new game mints a fresh token.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::account::{Account, RoleData};
use crate::config::GameConfig;
use crate::errors::{LedgerError, LedgerResult};
use crate::game::types::{compute_stake, ticket_time, CallFlags, GameRecord};
use crate::store::AccountStore;
use crate::token::GameClaims;

pub struct GameSessionEngine {
    store: Arc<AccountStore>,
    config: GameConfig,
}

impl GameSessionEngine {
    pub fn new(store: Arc<AccountStore>, config: GameConfig) -> Self {
        Self { store, config }
    }

    /// Idle -> Configured. Validates the stake inputs, computes the money
    /// figures from the player's durable commission, and checks the balance.
    /// No money moves; the result is carried forward only in the token.
    pub fn configure(
        &self,
        user: &Account,
        bet_birr: f64,
        selected_cards: Vec<String>,
        line_checker: u32,
    ) -> LedgerResult<GameClaims> {
        let mut errors = Vec::new();
        if !bet_birr.is_finite() || bet_birr < self.config.min_bet {
            errors.push(format!("bet_birr must be at least {}", self.config.min_bet));
        }
        if selected_cards.is_empty() {
            errors.push("select at least one card".to_string());
        }
        if line_checker < self.config.min_line_checker
            || line_checker > self.config.max_line_checker
        {
            errors.push(format!(
                "line_checker must be between {} and {}",
                self.config.min_line_checker, self.config.max_line_checker
            ));
        }
        if !errors.is_empty() {
            return Err(LedgerError::Validation(errors));
        }

        let RoleData::User {
            balance,
            user_commission,
            ..
        } = &user.data
        else {
            return Err(LedgerError::Unauthorized);
        };

        let stake = compute_stake(
            bet_birr,
            selected_cards.len(),
            *user_commission,
            self.config.free_card_threshold,
        );
        if *balance < stake.required_balance {
            return Err(LedgerError::InsufficientBalance);
        }

        Ok(GameClaims {
            account_id: user.id,
            role: user.role(),
            bet_birr,
            selected_cards,
            line_checker,
            total_bet: stake.total_bet,
            winning_amount: stake.winning_amount,
            required_balance: stake.required_balance,
            game_index: None,
        })
    }

    /// Configured -> InProgress. Recomputes the required balance from the
    /// durable commission (the token figures are not trusted), debits it, and
    /// appends the frozen GameRecord — one atomic commit. Returns the claims
    /// carrying the new record's index.
    pub fn start(&self, user_id: Uuid, claims: &GameClaims) -> LedgerResult<GameClaims> {
        if claims.account_id != user_id {
            return Err(LedgerError::Unauthorized);
        }

        for attempt in 0..self.config.commit_retry_limit {
            let now = Utc::now();
            let mut txn = self.store.begin();
            let mut user = txn.fetch(user_id)?;
            if !user.is_active() {
                return Err(LedgerError::Suspended);
            }
            let username = user.username.clone();
            let name = user.name.clone();

            let RoleData::User {
                balance,
                user_commission,
                shop_name,
                games,
                ..
            } = &mut user.data
            else {
                return Err(LedgerError::Unauthorized);
            };

            let stake = compute_stake(
                claims.bet_birr,
                claims.selected_cards.len(),
                *user_commission,
                self.config.free_card_threshold,
            );
            if *balance < stake.required_balance {
                return Err(LedgerError::InsufficientBalance);
            }
            *balance -= stake.required_balance;

            let index = games.len();
            let shop = if shop_name.is_empty() { name } else { shop_name.clone() };
            games.push(GameRecord {
                game_start: now,
                game_end: now,
                bet_birr: claims.bet_birr,
                picked_cards: claims.selected_cards.clone(),
                on_calls: Vec::new(),
                winner_cards: Vec::new(),
                lucky_passed_cards: Vec::new(),
                dersh: stake.winning_amount,
                commission: stake.required_balance,
                by: username,
                shop_name: shop,
                time: ticket_time(now),
                index,
            });
            txn.stage(user);

            match txn.commit() {
                Ok(()) => {
                    debug!(game_index = index, "game started");
                    let mut started = claims.clone();
                    started.total_bet = stake.total_bet;
                    started.winning_amount = stake.winning_amount;
                    started.required_balance = stake.required_balance;
                    started.game_index = Some(index);
                    return Ok(started);
                }
                Err(LedgerError::Conflict) if attempt + 1 < self.config.commit_retry_limit => {
                    continue
                }
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// InProgress -> InProgress. Advances `game_end` and set-adds the called
    /// card. An index that matches no record is a no-op, never an error; the
    /// adds are idempotent so re-delivered events are harmless.
    pub fn record_call(
        &self,
        user_id: Uuid,
        game_index: usize,
        card: Option<&str>,
        flags: CallFlags,
    ) -> LedgerResult<()> {
        for attempt in 0..self.config.commit_retry_limit {
            let mut txn = self.store.begin();
            let mut user = txn.fetch(user_id)?;
            if !user.is_active() {
                return Err(LedgerError::Suspended);
            }
            let RoleData::User { games, .. } = &mut user.data else {
                return Err(LedgerError::Unauthorized);
            };
            let Some(game) = games.get_mut(game_index) else {
                return Ok(());
            };

            game.game_end = Utc::now();
            if let Some(card) = card {
                set_add(&mut game.on_calls, card);
                if flags.lucky_passed {
                    set_add(&mut game.lucky_passed_cards, card);
                } else if flags.winner {
                    set_add(&mut game.winner_cards, card);
                }
            }
            txn.stage(user);

            match txn.commit() {
                Ok(()) => return Ok(()),
                Err(LedgerError::Conflict) if attempt + 1 < self.config.commit_retry_limit => {
                    continue
                }
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::Conflict)
    }
}

fn set_add(set: &mut Vec<String>, card: &str) {
    if !set.iter().any(|c| c == card) {
        set.push(card.to_string());
    }
}
