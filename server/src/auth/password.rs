//! Salted password hashing with PBKDF2-HMAC-SHA256.

use rand::RngCore;
use sha2::Sha256;

const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;
const ROUNDS: u32 = 100_000;

/// A stored password: salt plus its PBKDF2 derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub salt: Vec<u8>,
    pub hash: Vec<u8>,
}

impl PasswordHash {
    /// Hash a password under a fresh random salt.
    pub fn generate(password: &str) -> Self {
        let mut salt = vec![0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = digest(&salt, password);
        Self { salt, hash }
    }

    /// Check a candidate password.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = digest(&self.salt, password);
        candidate.len() == self.hash.len()
            && candidate
                .iter()
                .zip(&self.hash)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut key = vec![0u8; HASH_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ROUNDS, &mut key);
    key
}
