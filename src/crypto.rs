//! Cryptographic primitives for coinledger

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, SECRET_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};

/// A thread-safe, lazily initialized Secp256k1 context.
/// This prevents repeated, unnecessary context creation.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Tag byte secp256k1 puts in front of an uncompressed public key.
const UNCOMPRESSED_TAG: u8 = 0x04;

/// Length in bytes of an address: the X and Y coordinates of the public key.
pub const ADDRESS_SIZE: usize = UNCOMPRESSED_PUBLIC_KEY_SIZE - 1;

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    /// Creates a KeyPair from an existing SecretKey.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(secret_hex)
            .map_err(|e| ChainError::CryptoError(format!("Invalid secret key hex: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Hex encoding of the public key coordinates (X || Y).
    pub fn address(&self) -> String {
        let serialized = self.public_key.serialize_uncompressed();
        hex::encode(&serialized[1..])
    }

    /// Signs a hex-encoded 32-byte digest and returns the hex compact signature.
    pub fn sign(&self, payload_hex: &str) -> Result<String, ChainError> {
        let message = message_from_hex(payload_hex)?;
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(hex::encode(signature.serialize_compact()))
    }
}

fn message_from_hex(payload_hex: &str) -> Result<Message, ChainError> {
    let digest = hex::decode(payload_hex)
        .map_err(|e| ChainError::CryptoError(format!("Invalid payload hex: {}", e)))?;
    Message::from_digest_slice(&digest)
        .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))
}

/// Rebuilds the public key an address was derived from.
pub fn public_key_from_address(address_hex: &str) -> Result<PublicKey, ChainError> {
    let coordinates = hex::decode(address_hex)
        .map_err(|e| ChainError::CryptoError(format!("Invalid hex address: {}", e)))?;
    if coordinates.len() != ADDRESS_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Address must be {} bytes, got {}",
            ADDRESS_SIZE,
            coordinates.len()
        )));
    }

    let mut serialized = Vec::with_capacity(UNCOMPRESSED_PUBLIC_KEY_SIZE);
    serialized.push(UNCOMPRESSED_TAG);
    serialized.extend_from_slice(&coordinates);
    PublicKey::from_slice(&serialized)
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))
}

/// Verifies a hex compact signature over a hex digest against a hex address.
pub fn verify_signature(
    signature_hex: &str,
    payload_hex: &str,
    address_hex: &str,
) -> Result<(), ChainError> {
    let signature_bytes = hex::decode(signature_hex)
        .map_err(|e| ChainError::CryptoError(format!("Invalid signature hex: {}", e)))?;
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }

    let public_key = public_key_from_address(address_hex)?;
    let message = message_from_hex(payload_hex)?;
    let signature = Signature::from_compact(&signature_bytes)
        .map_err(|e| ChainError::CryptoError(format!("Invalid signature: {}", e)))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| ChainError::CryptoError("Signature verification failed".to_string()))
}

/// Boolean form of [`verify_signature`]; malformed input is simply invalid.
pub fn verify(signature_hex: &str, payload_hex: &str, address_hex: &str) -> bool {
    verify_signature(signature_hex, payload_hex, address_hex).is_ok()
}
