//! NEAR transaction builder and encoder

use base64::{engine::general_purpose, Engine};
use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use super::{Action, NearError, PublicKey};

/// Unsigned transaction, as handed to the wallet for signing
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    pub block_hash: [u8; 32],
    pub actions: Vec<Action>,
}

impl Transaction {
    pub fn new(
        signer_id: &str,
        public_key: PublicKey,
        receiver_id: &str,
        nonce: u64,
        actions: Vec<Action>,
        block_hash: [u8; 32],
    ) -> Self {
        Self {
            signer_id: signer_id.to_string(),
            public_key,
            nonce,
            receiver_id: receiver_id.to_string(),
            block_hash,
            actions,
        }
    }

    /// Borsh-encode the transaction
    pub fn encode(&self) -> Result<Vec<u8>, NearError> {
        borsh::to_vec(self).map_err(|e| NearError::Encoding(e.to_string()))
    }

    /// Borsh-encode and wrap as standard base64
    pub fn encode_base64(&self) -> Result<String, NearError> {
        Ok(general_purpose::STANDARD.encode(self.encode()?))
    }

    /// Decode a base64 envelope back into a transaction
    pub fn decode_base64(envelope: &str) -> Result<Self, NearError> {
        let bytes = general_purpose::STANDARD
            .decode(envelope)
            .map_err(|e| NearError::Encoding(format!("Invalid base64: {}", e)))?;

        borsh::from_slice(&bytes).map_err(|e| NearError::Encoding(e.to_string()))
    }

    /// Transaction hash: base58 of sha256 over the encoded bytes
    pub fn hash(&self) -> Result<String, NearError> {
        let digest = Sha256::digest(self.encode()?);
        Ok(bs58::encode(digest).into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::near::TransferAction;

    fn transfer_tx() -> Transaction {
        Transaction::new(
            "a",
            PublicKey::Ed25519([0u8; 32]),
            "b",
            1,
            vec![Action::Transfer(TransferAction { deposit: 1 })],
            [0u8; 32],
        )
    }

    #[test]
    fn test_encode_layout() {
        let bytes = transfer_tx().encode().unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&[1, 0, 0, 0, b'a']);
        expected.push(0);
        expected.extend_from_slice(&[0u8; 32]);
        expected.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0]);
        expected.extend_from_slice(&[1, 0, 0, 0, b'b']);
        expected.extend_from_slice(&[0u8; 32]);
        expected.extend_from_slice(&[1, 0, 0, 0]);
        expected.push(3);
        expected.push(1);
        expected.extend_from_slice(&[0u8; 15]);

        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_base64_envelope_decodes() {
        let tx = transfer_tx();
        let envelope = tx.encode_base64().unwrap();

        assert_eq!(Transaction::decode_base64(&envelope).unwrap(), tx);
        assert!(Transaction::decode_base64("not base64!").is_err());
    }

    #[test]
    fn test_hash_is_stable() {
        let tx = transfer_tx();
        let hash = tx.hash().unwrap();

        assert_eq!(hash, tx.hash().unwrap());
        assert_eq!(bs58::decode(&hash).into_vec().unwrap().len(), 32);

        let mut other = tx.clone();
        other.nonce += 1;
        assert_ne!(hash, other.hash().unwrap());
    }
}
