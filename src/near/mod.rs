//! NEAR chain primitives
//!
//! Keys, actions and transactions in their chain-native (borsh) form, plus
//! the JSON-RPC network provider used to look up access keys.

pub mod action;
pub mod key;
pub mod rpc;
pub mod transaction;

pub use action::*;
pub use key::{decode_block_hash, PublicKey};
pub use rpc::{AccessKeyPermissionView, AccessKeyView, JsonRpcProvider, NetworkError, NetworkProvider};
pub use transaction::Transaction;

/// Encoding errors from the chain primitives
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NearError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid block hash: {0}")]
    InvalidBlockHash(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}
