//! Injected Provider
//!
//! The WELLDONE extension exposes a `request(chain, {method, params})` call
//! and an `on(event, handler)` subscription. [`InjectedProvider`] is that
//! contract; the adapter receives a handle at construction instead of
//! probing a page global.

pub mod bridge;
#[cfg(test)]
pub(crate) mod mock;

pub use bridge::{BridgeConfig, BridgeProvider};

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requests the adapter sends to the extension
pub mod methods {
    /// Active account per chain: `{"near": {"address", "pubKey"}}`
    pub const ACCOUNTS: &str = "dapp:accounts";
    /// Sign and broadcast base64 transactions, returning their hashes
    pub const SEND_TRANSACTION: &str = "dapp:sendTransaction";
    /// Final execution outcome for `[hash, signerId]`
    pub const TX_STATUS: &str = "tx";
}

/// Errors surfaced by the injected provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider rejected request [{code}]: {message}")]
    Rejected { code: i64, message: String },

    #[error("Provider transport error: {0}")]
    Transport(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider connection closed")]
    Closed,
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::InvalidResponse(err.to_string())
    }
}

/// A `request` call payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl ProviderRequest {
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            params: None,
        }
    }

    pub fn with_params(method: &str, params: Value) -> Self {
        Self {
            method: method.to_string(),
            params: Some(params),
        }
    }
}

/// Events the extension publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
}

impl ProviderEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEventKind::AccountsChanged => "dapp:accountsChanged",
            ProviderEventKind::ChainChanged => "dapp:chainChanged",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "dapp:accountsChanged" => Some(ProviderEventKind::AccountsChanged),
            "dapp:chainChanged" => Some(ProviderEventKind::ChainChanged),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event and its payload
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEvent {
    pub kind: ProviderEventKind,
    pub data: Value,
}

impl ProviderEvent {
    /// Network id carried by a `dapp:chainChanged` payload
    pub fn network_id(&self) -> Option<&str> {
        self.data.get("networkId").and_then(Value::as_str)
    }
}

/// Stream of events of one kind
pub type EventStream = Pin<Box<dyn Stream<Item = ProviderEvent> + Send>>;

/// Handle to the extension's injected provider
#[async_trait]
pub trait InjectedProvider: Send + Sync {
    /// `request(chain, {method, params})`
    async fn request(&self, chain: &str, request: ProviderRequest) -> Result<Value, ProviderError>;

    /// `on(event, handler)`; the stream ends when the provider goes away
    fn subscribe(&self, kind: ProviderEventKind) -> EventStream;
}

/// Active account reported by `dapp:accounts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainAccount {
    pub address: String,
    pub pub_key: String,
}

/// Pick the account for `chain` out of a `dapp:accounts` response
pub fn parse_accounts(response: &Value, chain: &str) -> Result<Option<ChainAccount>, ProviderError> {
    match response.get(chain) {
        None | Some(Value::Null) => Ok(None),
        Some(account) => Ok(Some(serde_json::from_value(account.clone())?)),
    }
}
