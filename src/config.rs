//! Network and wallet configuration

use serde::{Deserialize, Serialize};

/// Chain key the injected provider uses for NEAR requests
pub const DEFAULT_CHAIN: &str = "near";

/// NEAR network the dApp is configured for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub network_id: String,
    pub node_url: String,
    pub explorer_url: String,
}

impl NetworkConfig {
    pub fn mainnet() -> Self {
        Self {
            network_id: "mainnet".to_string(),
            node_url: "https://rpc.mainnet.near.org".to_string(),
            explorer_url: "https://explorer.near.org".to_string(),
        }
    }

    pub fn testnet() -> Self {
        Self {
            network_id: "testnet".to_string(),
            node_url: "https://rpc.testnet.near.org".to_string(),
            explorer_url: "https://explorer.testnet.near.org".to_string(),
        }
    }

    /// Resolve a preset by network id
    pub fn from_network_id(network_id: &str) -> Option<Self> {
        match network_id.to_lowercase().as_str() {
            "mainnet" => Some(Self::mainnet()),
            "testnet" => Some(Self::testnet()),
            _ => None,
        }
    }

    /// Override the RPC node
    pub fn with_node_url(mut self, node_url: &str) -> Self {
        self.node_url = node_url.to_string();
        self
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Options the host selector passes to every wallet
#[derive(Debug, Clone, Default)]
pub struct WalletOptions {
    pub network: NetworkConfig,
    /// Chain key used in injected provider requests
    pub chain: Option<String>,
}

impl WalletOptions {
    pub fn new(network: NetworkConfig) -> Self {
        Self {
            network,
            chain: None,
        }
    }

    pub fn with_chain(mut self, chain: &str) -> Self {
        self.chain = Some(chain.to_string());
        self
    }

    pub fn chain(&self) -> &str {
        self.chain.as_deref().unwrap_or(DEFAULT_CHAIN)
    }
}
