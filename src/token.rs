//! Signed session tokens.
//!
//! The token is the only channel of continuity between requests: there is no
//! server-side session store. The payload is JSON, signed with the process
//! ed25519 key and carried as `hex(payload).hex(signature)`. Decoding treats
//! the token as untrusted input; anything that does not verify is
//! `Unauthorized`. The token is a capability, never a source of truth for
//! money: every monetary field is re-checked against the store before a debit.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::Role;
use crate::errors::{LedgerError, LedgerResult};

/// Authenticated identity, minted at login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub account_id: Uuid,
    pub role: Role,
    pub name: String,
}

/// In-progress game configuration and, once started, the record index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameClaims {
    pub account_id: Uuid,
    pub role: Role,
    pub bet_birr: f64,
    pub selected_cards: Vec<String>,
    pub line_checker: u32,
    pub total_bet: f64,
    pub winning_amount: f64,
    pub required_balance: f64,
    /// Index into the owner's `games` sequence; set by the start transition.
    pub game_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Claims {
    Identity(IdentityClaims),
    Game(GameClaims),
}

impl Claims {
    pub fn account_id(&self) -> Uuid {
        match self {
            Claims::Identity(c) => c.account_id,
            Claims::Game(c) => c.account_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Claims::Identity(c) => c.role,
            Claims::Game(c) => c.role,
        }
    }

    pub fn as_game(&self) -> Option<&GameClaims> {
        match self {
            Claims::Game(c) => Some(c),
            Claims::Identity(_) => None,
        }
    }
}

/// Encodes and verifies session tokens with a process-wide key pair.
pub struct SessionTokenCodec {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl SessionTokenCodec {
    /// Build from a 32-byte seed (process configuration).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(&seed);
        let verifying = signing.verifying_key();
        Self { signing, verifying }
    }

    /// Fresh random key; outstanding tokens become invalid.
    pub fn generate() -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        Self { signing, verifying }
    }

    pub fn encode(&self, claims: &Claims) -> LedgerResult<String> {
        let payload =
            serde_json::to_vec(claims).map_err(|_| LedgerError::Unauthorized)?;
        let signature = self.signing.sign(&payload);
        Ok(format!(
            "{}.{}",
            hex::encode(&payload),
            hex::encode(signature.to_bytes())
        ))
    }

    pub fn decode(&self, token: &str) -> LedgerResult<Claims> {
        let (payload_hex, sig_hex) =
            token.split_once('.').ok_or(LedgerError::Unauthorized)?;
        let payload = hex::decode(payload_hex).map_err(|_| LedgerError::Unauthorized)?;
        let sig_bytes: [u8; 64] = hex::decode(sig_hex)
            .map_err(|_| LedgerError::Unauthorized)?
            .try_into()
            .map_err(|_| LedgerError::Unauthorized)?;
        let signature = Signature::from_bytes(&sig_bytes);
        self.verifying
            .verify(&payload, &signature)
            .map_err(|_| LedgerError::Unauthorized)?;
        serde_json::from_slice(&payload).map_err(|_| LedgerError::Unauthorized)
    }
}
