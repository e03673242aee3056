// Key management for named identities

use crate::core::{hash160, sha256_hash};
use secp256k1::{rand::rngs::OsRng, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};

/// Prefix mixed into every name before hashing it into a secret key
const IDENTITY_DOMAIN: &str = "banknetcoin:";

/// Short fingerprint of a public key, for display only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Hex-encoded HASH160 of the compressed public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(hex::encode(hash160(&public_key.serialize())))
    }

    /// Get address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key pair
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
    pub address: Address,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    /// Deterministic key pair for a human-readable name.
    ///
    /// Every process derives the same keys for "alice", so clients and the
    /// server agree on identities without sharing key files.
    pub fn from_name(name: &str) -> Self {
        let mut seed = sha256_hash(format!("{}{}", IDENTITY_DOMAIN, name).as_bytes());
        // A digest outside the curve order is astronomically unlikely; rehash if it happens
        let secret_key = loop {
            match SecretKey::from_slice(&seed) {
                Ok(key) => break key,
                Err(_) => seed = sha256_hash(&seed),
            }
        };
        Self::from_secret_key(secret_key)
    }

    fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = secret_key.public_key(&secp);
        let address = Address::from_public_key(&public_key);

        Self {
            secret_key,
            public_key,
            address,
        }
    }

    /// Get public key bytes (compressed)
    pub fn pubkey_bytes(&self) -> Vec<u8> {
        self.public_key.serialize().to_vec()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Never print the secret key
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Public key of a named user
pub fn user_public_key(name: &str) -> PublicKey {
    KeyPair::from_name(name).public_key
}

/// Private key of a named user
pub fn user_private_key(name: &str) -> SecretKey {
    KeyPair::from_name(name).secret_key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp = KeyPair::generate();

        assert_eq!(kp.pubkey_bytes().len(), 33); // Compressed pubkey
        assert_eq!(kp.address.as_str().len(), 40);
    }

    #[test]
    fn test_named_keys_deterministic() {
        assert_eq!(user_public_key("alice"), user_public_key("alice"));
        assert_eq!(user_private_key("bob"), user_private_key("bob"));
        assert_ne!(user_public_key("alice"), user_public_key("bob"));
    }

    #[test]
    fn test_private_matches_public() {
        let secp = Secp256k1::new();
        let sk = user_private_key("carol");
        assert_eq!(sk.public_key(&secp), user_public_key("carol"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let kp = KeyPair::from_name("erin");
        let debug = format!("{:?}", kp);
        assert!(debug.contains(kp.address.as_str()));
        assert!(!debug.contains(&hex::encode(kp.secret_key.secret_bytes())));
    }
}
