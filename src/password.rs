//! Password hash/verify capability.
//!
//! The rest of the crate treats the digest as an opaque string; only this
//! module knows the `hex(salt)$hex(sha256(salt || plaintext))` layout.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SALT_LEN: usize = 16;

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(plaintext: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!("{}${}", hex::encode(salt), hex::encode(digest(&salt, plaintext)))
}

/// Check a plaintext password against a stored digest.
pub fn verify_password(plaintext: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest_hex) else {
        return false;
    };
    // Constant-time: the comparison must not leak how much of the digest
    // matched.
    digest(&salt, plaintext).ct_eq(&expected).into()
}

fn digest(salt: &[u8], plaintext: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(plaintext.as_bytes());
    hasher.finalize().to_vec()
}
