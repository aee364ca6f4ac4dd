//! NEAR public keys
//!
//! Text form is `<curve>:<base58>`, e.g. `ed25519:6E8sCci9...`. A key without
//! a curve prefix is read as ed25519, matching what NEAR tooling accepts.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};

use super::NearError;

const ED25519_PREFIX: &str = "ed25519";
const SECP256K1_PREFIX: &str = "secp256k1";

/// Public key bound to an access key on-chain
#[derive(Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum PublicKey {
    /// 32-byte ed25519 point
    Ed25519([u8; 32]),
    /// 64-byte uncompressed secp256k1 point, without the 0x04 tag
    Secp256k1([u8; 64]),
}

impl PublicKey {
    /// Curve name used in the text form
    pub fn curve(&self) -> &'static str {
        match self {
            PublicKey::Ed25519(_) => ED25519_PREFIX,
            PublicKey::Secp256k1(_) => SECP256K1_PREFIX,
        }
    }

    /// Raw key bytes
    pub fn key_data(&self) -> &[u8] {
        match self {
            PublicKey::Ed25519(bytes) => bytes,
            PublicKey::Secp256k1(bytes) => bytes,
        }
    }
}

impl FromStr for PublicKey {
    type Err = NearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (curve, data) = match s.split_once(':') {
            Some((curve, data)) => (curve.to_lowercase(), data),
            None => (ED25519_PREFIX.to_string(), s),
        };

        let bytes = bs58::decode(data)
            .into_vec()
            .map_err(|e| NearError::InvalidPublicKey(format!("Invalid base58 in {}: {}", s, e)))?;

        match curve.as_str() {
            ED25519_PREFIX => {
                let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                    NearError::InvalidPublicKey(format!(
                        "Invalid ed25519 key length: expected 32 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                Ok(PublicKey::Ed25519(key))
            }
            SECP256K1_PREFIX => {
                let key: [u8; 64] = bytes.as_slice().try_into().map_err(|_| {
                    NearError::InvalidPublicKey(format!(
                        "Invalid secp256k1 key length: expected 64 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                Ok(PublicKey::Secp256k1(key))
            }
            other => Err(NearError::InvalidPublicKey(format!(
                "Unknown key type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.curve(),
            bs58::encode(self.key_data()).into_string()
        )
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl From<ed25519_dalek::VerifyingKey> for PublicKey {
    fn from(key: ed25519_dalek::VerifyingKey) -> Self {
        PublicKey::Ed25519(key.to_bytes())
    }
}

impl From<k256::PublicKey> for PublicKey {
    fn from(key: k256::PublicKey) -> Self {
        use k256::elliptic_curve::sec1::ToEncodedPoint;

        let point = key.to_encoded_point(false);
        let mut bytes = [0u8; 64];
        // Skip the 0x04 uncompressed tag
        bytes.copy_from_slice(&point.as_bytes()[1..65]);
        PublicKey::Secp256k1(bytes)
    }
}

/// Decode a base58 block hash into its 32 raw bytes
pub fn decode_block_hash(hash: &str) -> Result<[u8; 32], NearError> {
    let bytes = bs58::decode(hash)
        .into_vec()
        .map_err(|e| NearError::InvalidBlockHash(format!("Invalid base58: {}", e)))?;

    bytes.as_slice().try_into().map_err(|_| {
        NearError::InvalidBlockHash(format!("Expected 32 bytes, got {}", bytes.len()))
    })
}
