//! NEAR JSON-RPC network provider
//!
//! Only the access-key view is needed by the wallet adapter. Errors are
//! classified here so callers match on `NetworkError` variants instead of
//! inspecting RPC error payloads.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::NetworkConfig;

/// Errors returned by a network provider
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("access key {public_key} does not exist while viewing account {account_id}")]
    AccessKeyDoesNotExist {
        account_id: String,
        public_key: String,
    },

    #[error("RPC error [{name}]: {message}")]
    Rpc { name: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
}

/// Access key as reported by `view_access_key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessKeyView {
    pub nonce: u64,
    pub permission: AccessKeyPermissionView,
    pub block_hash: String,
    #[serde(default)]
    pub block_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessKeyPermissionView {
    FullAccess,
    FunctionCall {
        allowance: Option<String>,
        receiver_id: String,
        method_names: Vec<String>,
    },
}

impl AccessKeyPermissionView {
    pub fn is_full_access(&self) -> bool {
        matches!(self, AccessKeyPermissionView::FullAccess)
    }
}

/// Read access to chain state used by the wallet adapter
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    /// Look up the access key binding `public_key` to `account_id`
    async fn view_access_key(
        &self,
        account_id: &str,
        public_key: &str,
    ) -> Result<AccessKeyView, NetworkError>;
}

/// JSON-RPC provider talking to a NEAR node over HTTP
pub struct JsonRpcProvider {
    client: Client,
    node_url: String,
}

impl JsonRpcProvider {
    pub fn new(node_url: &str) -> Self {
        Self {
            client: Client::new(),
            node_url: node_url.to_string(),
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(&config.node_url)
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    /// Send a JSON-RPC request and return its `result`
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, NetworkError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "method": method,
            "params": params,
        });

        debug!("RPC {} -> {}", method, self.node_url);

        let resp = self.client.post(&self.node_url).json(&body).send().await?;
        let data: RpcResponse = resp.json().await?;

        if let Some(error) = data.error {
            return Err(error.into_network_error());
        }

        data.result
            .ok_or_else(|| NetworkError::InvalidResponse("missing result".to_string()))
    }
}

#[async_trait]
impl NetworkProvider for JsonRpcProvider {
    async fn view_access_key(
        &self,
        account_id: &str,
        public_key: &str,
    ) -> Result<AccessKeyView, NetworkError> {
        let params = serde_json::json!({
            "request_type": "view_access_key",
            "finality": "final",
            "account_id": account_id,
            "public_key": public_key,
        });

        let result = self
            .call("query", params)
            .await
            .map_err(|e| classify_access_key_error(e, account_id, public_key))?;

        parse_access_key_result(result, account_id, public_key)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cause: Option<RpcErrorCause>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorCause {
    name: String,
}

impl RpcErrorBody {
    fn into_network_error(self) -> NetworkError {
        let name = self
            .cause
            .map(|c| c.name)
            .or(self.name)
            .unwrap_or_else(|| "UNKNOWN".to_string());

        let message = match self.data {
            Some(Value::String(data)) => data,
            Some(other) => other.to_string(),
            None => self.message.unwrap_or_default(),
        };

        NetworkError::Rpc { name, message }
    }
}

fn classify_access_key_error(err: NetworkError, account_id: &str, public_key: &str) -> NetworkError {
    match err {
        NetworkError::Rpc { ref name, .. } if name == "UNKNOWN_ACCESS_KEY" => {
            NetworkError::AccessKeyDoesNotExist {
                account_id: account_id.to_string(),
                public_key: public_key.to_string(),
            }
        }
        other => other,
    }
}

/// Older nodes report a missing key as a successful result carrying an
/// `error` string instead of an RPC error.
fn parse_access_key_result(
    result: Value,
    account_id: &str,
    public_key: &str,
) -> Result<AccessKeyView, NetworkError> {
    if let Some(message) = result.get("error").and_then(Value::as_str) {
        if message.contains("does not exist while viewing") {
            return Err(NetworkError::AccessKeyDoesNotExist {
                account_id: account_id.to_string(),
                public_key: public_key.to_string(),
            });
        }
        return Err(NetworkError::Rpc {
            name: "QUERY_ERROR".to_string(),
            message: message.to_string(),
        });
    }

    serde_json::from_value(result).map_err(|e| NetworkError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_access_key() {
        let result = serde_json::json!({
            "nonce": 85,
            "permission": "FullAccess",
            "block_height": 19884918,
            "block_hash": "GGJQ8yjmo7aEoj8ZpAhGehnq9BSWFx4xswHYzDwwAP2n"
        });

        let key = parse_access_key_result(result, "alice.near", "ed25519:ABC").unwrap();
        assert_eq!(key.nonce, 85);
        assert!(key.permission.is_full_access());
        assert_eq!(key.block_height, 19884918);
    }

    #[test]
    fn test_parse_function_call_key() {
        let result = serde_json::json!({
            "nonce": 1,
            "permission": {
                "FunctionCall": {
                    "allowance": "250000000000000000000000",
                    "receiver_id": "app.near",
                    "method_names": []
                }
            },
            "block_height": 1,
            "block_hash": "GGJQ8yjmo7aEoj8ZpAhGehnq9BSWFx4xswHYzDwwAP2n"
        });

        let key = parse_access_key_result(result, "alice.near", "ed25519:ABC").unwrap();
        assert!(!key.permission.is_full_access());
    }

    #[test]
    fn test_legacy_missing_key_result() {
        let result = serde_json::json!({
            "error": "access key ed25519:ABC does not exist while viewing",
            "logs": [],
            "block_height": 1,
            "block_hash": "GGJQ8yjmo7aEoj8ZpAhGehnq9BSWFx4xswHYzDwwAP2n"
        });

        let err = parse_access_key_result(result, "alice.near", "ed25519:ABC").unwrap_err();
        assert!(matches!(err, NetworkError::AccessKeyDoesNotExist { .. }));
    }

    #[test]
    fn test_unknown_access_key_cause_is_classified() {
        let body: RpcErrorBody = serde_json::from_value(serde_json::json!({
            "name": "HANDLER_ERROR",
            "cause": { "name": "UNKNOWN_ACCESS_KEY", "info": {} },
            "code": -32000,
            "message": "Server error",
            "data": "Access key for public key ed25519:ABC has never been observed on the node"
        }))
        .unwrap();

        let err = classify_access_key_error(body.into_network_error(), "alice.near", "ed25519:ABC");
        match err {
            NetworkError::AccessKeyDoesNotExist { account_id, public_key } => {
                assert_eq!(account_id, "alice.near");
                assert_eq!(public_key, "ed25519:ABC");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_other_rpc_errors_pass_through() {
        let body: RpcErrorBody = serde_json::from_value(serde_json::json!({
            "name": "HANDLER_ERROR",
            "cause": { "name": "UNKNOWN_ACCOUNT" },
            "message": "Server error"
        }))
        .unwrap();

        let err = classify_access_key_error(body.into_network_error(), "alice.near", "ed25519:ABC");
        assert!(matches!(err, NetworkError::Rpc { ref name, .. } if name == "UNKNOWN_ACCOUNT"));
    }
}
