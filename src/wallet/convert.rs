//! Transaction converter
//!
//! Turns a selector transaction into the base64 envelope the extension signs.

use tracing::debug;

use super::WalletError;
use crate::near::{decode_block_hash, PublicKey, Transaction};
use crate::selector::{create_actions, TransactionParams};

/// Build the chain transaction for `params`
pub fn build_transaction(
    public_key: &str,
    nonce: u64,
    block_hash: &str,
    params: &TransactionParams,
) -> Result<Transaction, WalletError> {
    if params.signer_id.is_empty() {
        return Err(WalletError::MissingField("signerId"));
    }

    if params.receiver_id.is_empty() {
        return Err(WalletError::MissingField("receiverId"));
    }

    let block_hash = decode_block_hash(block_hash)?;
    let public_key: PublicKey = public_key.parse()?;
    let actions = create_actions(&params.actions)?;

    Ok(Transaction::new(
        &params.signer_id,
        public_key,
        &params.receiver_id,
        nonce,
        actions,
        block_hash,
    ))
}

/// Build, encode and base64-wrap the transaction for `params`
pub fn convert_transaction(
    public_key: &str,
    nonce: u64,
    block_hash: &str,
    params: &TransactionParams,
) -> Result<String, WalletError> {
    let transaction = build_transaction(public_key, nonce, block_hash, params)?;
    debug!(
        "converted transaction {} -> {} nonce={} hash={}",
        transaction.signer_id,
        transaction.receiver_id,
        nonce,
        transaction.hash()?
    );

    Ok(transaction.encode_base64()?)
}
