//! Salted PBKDF2-HMAC-SHA256 password hashes.
//!
//! Encoded as `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>` so the work
//! factor can be raised without invalidating stored hashes.

use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const DEFAULT_ITERATIONS: u32 = 25_000;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 32;
const KEY_LEN: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    pub fn hash(&self, secret: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let key = derive(secret, &salt, self.iterations);

        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            hex::encode(salt),
            hex::encode(key)
        )
    }

    /// Constant-time check of `secret` against an encoded hash
    ///
    /// Malformed hashes never verify.
    pub fn verify(&self, secret: &str, encoded: &str) -> bool {
        let Some((iterations, salt, expected)) = parse(encoded) else {
            return false;
        };
        let candidate = derive(secret, &salt, iterations);
        candidate.as_slice().ct_eq(expected.as_slice()).into()
    }

    /// Spend one derivation without a stored hash, so that an unknown
    /// identifier costs as much as a wrong secret.
    pub fn burn(&self, secret: &str) {
        let _ = derive(secret, &[0u8; SALT_LEN], self.iterations);
    }
}

fn derive(secret: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, iterations, &mut key);
    key
}

fn parse(encoded: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations = parts.next()?.parse::<u32>().ok().filter(|n| *n > 0)?;
    let salt = hex::decode(parts.next()?).ok()?;
    let hash = hex::decode(parts.next()?).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((iterations, salt, hash))
}
