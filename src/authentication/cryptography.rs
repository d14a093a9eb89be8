use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::constants::TOKEN_KEY_BYTES;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    Ok(argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(
    password: &str,
    password_hash: &str,
) -> Result<bool, argon2::password_hash::Error> {
    let argon2 = Argon2::default();
    let parsed_hash = PasswordHash::new(password_hash)?;

    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Fresh token key: random bytes rendered as lowercase hex.
pub fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_KEY_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// HMAC-SHA256 of a token key under the server secret, hex encoded. Only
/// this digest is ever persisted.
pub fn token_digest(secret: &[u8], key: &str) -> String {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(key.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("testpass123").unwrap();

        assert_ne!(hash, "testpass123");
        assert!(verify_password("testpass123", &hash).unwrap());
        assert!(!verify_password("testpass124", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn token_keys_are_forty_hex_characters() {
        let key = generate_token_key();

        assert_eq!(key.len(), TOKEN_KEY_BYTES * 2);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(key, generate_token_key());
    }

    #[test]
    fn digest_depends_on_key_and_secret() {
        let digest = token_digest(b"secret", "abc");

        assert_eq!(digest.len(), 64);
        assert_eq!(digest, token_digest(b"secret", "abc"));
        assert_ne!(digest, token_digest(b"secret", "abd"));
        assert_ne!(digest, token_digest(b"other", "abc"));
    }

    #[test]
    fn digest_is_lowercase_hex_of_the_hmac() {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(b"secret").unwrap();
        mac.update(b"abc");
        let expected = mac.finalize().into_bytes();

        let digest = token_digest(b"secret", "abc");
        assert_eq!(hex::decode(&digest).unwrap(), expected.as_slice());
        assert_eq!(digest, digest.to_lowercase());
    }
}
