// crates/hyperchain-core/src/crypto.rs
//
// Hashing helpers and the signing capability consumed by the consensus core.
//
// The core never calls a signature scheme directly: it goes through the
// `CryptoProvider` trait with an open algorithm tag, so post-quantum schemes
// can be plugged in without touching block production. `Ed25519Provider` is
// the provider shipped with the workspace.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::ChainError;
use crate::Address;

/// Algorithm tag served by [`Ed25519Provider`].
pub const ED25519: &str = "ed25519";

/// Compute SHA-256 hash of the given bytes.
///
/// Returns a 32-byte hash.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 of the given bytes as a lowercase hex string.
pub fn hash_hex(data: &[u8]) -> String {
    hex::encode(hash_bytes(data))
}

/// Raw key material for one signature algorithm.
#[derive(Clone)]
pub struct KeyPair {
    pub algorithm: String,
    pub secret: Vec<u8>,
    pub public: Vec<u8>,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm)
            .field("secret_len", &self.secret.len())
            .field("public", &hex::encode(&self.public))
            .finish()
    }
}

/// Sign/verify capability keyed by an open algorithm tag.
pub trait CryptoProvider: Send + Sync {
    /// Algorithm tags this provider understands.
    fn algorithms(&self) -> Vec<String>;

    /// Generate a fresh keypair for `algorithm`.
    fn generate_keypair(&self, algorithm: &str) -> Result<KeyPair, ChainError>;

    /// Sign `message` with the secret key bytes.
    fn sign(&self, message: &[u8], secret: &[u8], algorithm: &str) -> Result<Vec<u8>, ChainError>;

    /// Verify a signature. Malformed keys, signatures, or unknown algorithms
    /// yield `false`, never an error.
    fn verify(&self, message: &[u8], signature: &[u8], public: &[u8], algorithm: &str) -> bool;
}

/// ed25519 provider backed by `ed25519-dalek`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Provider;

impl Ed25519Provider {
    fn check(algorithm: &str) -> Result<(), ChainError> {
        if algorithm == ED25519 {
            Ok(())
        } else {
            Err(ChainError::UnsupportedAlgorithm(algorithm.to_string()))
        }
    }
}

impl CryptoProvider for Ed25519Provider {
    fn algorithms(&self) -> Vec<String> {
        vec![ED25519.to_string()]
    }

    fn generate_keypair(&self, algorithm: &str) -> Result<KeyPair, ChainError> {
        Self::check(algorithm)?;
        let signing_key = SigningKey::generate(&mut OsRng);
        Ok(KeyPair {
            algorithm: algorithm.to_string(),
            secret: signing_key.to_bytes().to_vec(),
            public: signing_key.verifying_key().to_bytes().to_vec(),
        })
    }

    fn sign(&self, message: &[u8], secret: &[u8], algorithm: &str) -> Result<Vec<u8>, ChainError> {
        Self::check(algorithm)?;
        let secret: [u8; 32] = secret
            .try_into()
            .map_err(|_| ChainError::Crypto("ed25519 secret key must be exactly 32 bytes".to_string()))?;
        let signing_key = SigningKey::from_bytes(&secret);
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    fn verify(&self, message: &[u8], signature: &[u8], public: &[u8], algorithm: &str) -> bool {
        if algorithm != ED25519 {
            return false;
        }
        let Ok(public) = <[u8; 32]>::try_from(public) else {
            return false;
        };
        let Ok(signature) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&public) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&signature);
        verifying_key.verify(message, &signature).is_ok()
    }
}

/// Signing keys for the validators this node operates, keyed by
/// (address, algorithm).
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: RwLock<HashMap<(Address, String), KeyPair>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a keypair for `address`, replacing any previous key for the
    /// same algorithm.
    pub fn insert(&self, address: &str, keypair: KeyPair) {
        self.keys
            .write()
            .insert((address.to_string(), keypair.algorithm.clone()), keypair);
    }

    pub fn get(&self, address: &str, algorithm: &str) -> Option<KeyPair> {
        self.keys
            .read()
            .get(&(address.to_string(), algorithm.to_string()))
            .cloned()
    }

    /// Generate and store one keypair per algorithm for `address`.
    ///
    /// Returns the public keys so the caller can publish them to the
    /// validator registry.
    pub fn generate_for(
        &self,
        address: &str,
        provider: &dyn CryptoProvider,
        algorithms: &[String],
    ) -> Result<BTreeMap<String, Vec<u8>>, ChainError> {
        let mut publics = BTreeMap::new();
        for algorithm in algorithms {
            let keypair = provider.generate_keypair(algorithm)?;
            publics.insert(algorithm.clone(), keypair.public.clone());
            self.insert(address, keypair);
        }
        Ok(publics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_sign_verify() {
        let provider = Ed25519Provider;
        let keypair = provider.generate_keypair(ED25519).unwrap();
        let message = b"hello hyperchain";

        let signature = provider.sign(message, &keypair.secret, ED25519).unwrap();
        assert!(provider.verify(message, &signature, &keypair.public, ED25519));

        // Verify wrong message fails
        assert!(!provider.verify(b"wrong message", &signature, &keypair.public, ED25519));
    }

    #[test]
    fn test_unsupported_algorithm() {
        let provider = Ed25519Provider;
        assert_eq!(
            provider.generate_keypair("sphincs").unwrap_err(),
            ChainError::UnsupportedAlgorithm("sphincs".to_string())
        );
        assert!(provider.sign(b"m", &[0u8; 32], "falcon").is_err());
    }

    #[test]
    fn test_verify_malformed_input_is_false() {
        let provider = Ed25519Provider;
        let keypair = provider.generate_keypair(ED25519).unwrap();
        let signature = provider.sign(b"m", &keypair.secret, ED25519).unwrap();

        assert!(!provider.verify(b"m", &signature[..10], &keypair.public, ED25519));
        assert!(!provider.verify(b"m", &signature, &[1, 2, 3], ED25519));
        assert!(!provider.verify(b"m", &signature, &keypair.public, "sphincs"));
    }

    #[test]
    fn test_keystore_generate_for() {
        let store = KeyStore::new();
        let publics = store
            .generate_for("val1", &Ed25519Provider, &[ED25519.to_string()])
            .unwrap();
        assert_eq!(publics.len(), 1);

        let keypair = store.get("val1", ED25519).unwrap();
        assert_eq!(&keypair.public, &publics[ED25519]);
        assert!(store.get("val2", ED25519).is_none());
    }

    #[test]
    fn test_hash_bytes() {
        let data = b"hyperchain";
        let hash = hash_bytes(data);
        assert_eq!(hash.len(), 32);

        // Same input should produce same hash
        assert_eq!(hash, hash_bytes(data));

        // Different input should produce different hash
        assert_ne!(hash, hash_bytes(b"different"));
        assert_eq!(hash_hex(data).len(), 64);
    }
}
