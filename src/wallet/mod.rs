//! Wallet adapters
//!
//! This module provides the WELLDONE injected wallet for NEAR wallet
//! selectors: the behaviour every selector wallet exposes, the module
//! factory the selector registers, and the adapter's error type.

pub mod access_key;
pub mod convert;
pub mod session;
pub mod welldone;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::WalletOptions;
use crate::near::{NearError, NetworkError, NetworkProvider};
use crate::provider::{InjectedProvider, ProviderError};
use crate::selector::{
    Account, Emitter, FinalExecutionOutcome, TransactionBatch, TransactionParams, VerifiedOwner,
    VerifyOwnerParams,
};

/// Wallet adapter error type
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Missing transaction field: {0}")]
    MissingField(&'static str),

    #[error("Public key requires 'FullAccess' permission")]
    InvalidPermission,

    #[error("Public key ({public_key}) is not registered with the account '{account_id}'.")]
    UnregisteredKey {
        account_id: String,
        public_key: String,
    },

    #[error("Wallet is not installed")]
    WalletNotInstalled,

    #[error("Wallet not signed in")]
    NotSignedIn,

    #[error("Method not supported by {wallet}")]
    NotSupported { wallet: String },

    #[error(transparent)]
    Encoding(#[from] NearError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// What a selector can ask of a wallet
#[async_trait]
pub trait WalletBehaviour: Send + Sync {
    async fn sign_in(&self) -> Result<Vec<Account>, WalletError>;

    async fn sign_out(&self) -> Result<(), WalletError>;

    async fn get_accounts(&self) -> Result<Vec<Account>, WalletError>;

    async fn verify_owner(&self, params: VerifyOwnerParams) -> Result<VerifiedOwner, WalletError>;

    async fn sign_and_send_transaction(
        &self,
        params: TransactionParams,
    ) -> Result<FinalExecutionOutcome, WalletError>;

    async fn sign_and_send_transactions(
        &self,
        params: TransactionBatch,
    ) -> Result<Vec<FinalExecutionOutcome>, WalletError>;
}

/// How the wallet reaches the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletType {
    Injected,
    Hardware,
}

/// Selector-facing description of a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletMetadata {
    pub name: String,
    pub description: String,
    pub icon_url: String,
    pub deprecated: bool,
    pub download_url: String,
    pub available: bool,
}

/// Collaborators the selector hands to a wallet on init
#[derive(Clone)]
pub struct WalletContext {
    pub options: WalletOptions,
    pub network: Arc<dyn NetworkProvider>,
    pub emitter: Emitter,
}

/// A registered wallet module, ready to be initialized
#[derive(Clone)]
pub struct WalletModule {
    pub id: String,
    pub kind: WalletType,
    pub metadata: WalletMetadata,
    provider: Option<Arc<dyn InjectedProvider>>,
}

impl WalletModule {
    /// Build the wallet behaviour for this module
    pub fn init(&self, context: WalletContext) -> WelldoneWallet {
        WelldoneWallet::new(self.metadata.clone(), self.provider.clone(), context)
    }
}

impl std::fmt::Debug for WalletModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletModule")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("metadata", &self.metadata)
            .finish()
    }
}

pub const WELLDONE_WALLET_ID: &str = "welldone-wallet";

const WELLDONE_DOWNLOAD_URL: &str =
    "https://chrome.google.com/webstore/detail/welldone-wallet/bmkakpenjmcpfhhjadflneinmhboecjf";

/// Options for [`setup_welldone_wallet`]
#[derive(Debug, Clone)]
pub struct WelldoneWalletParams {
    pub icon_url: String,
    pub deprecated: bool,
}

impl Default for WelldoneWalletParams {
    fn default() -> Self {
        Self {
            icon_url: "./assets/welldone-wallet.png".to_string(),
            deprecated: false,
        }
    }
}

/// Register the WELLDONE wallet; `provider` is the extension handle, if present
pub fn setup_welldone_wallet(
    params: WelldoneWalletParams,
    provider: Option<Arc<dyn InjectedProvider>>,
) -> WalletModule {
    WalletModule {
        id: WELLDONE_WALLET_ID.to_string(),
        kind: WalletType::Injected,
        metadata: WalletMetadata {
            name: "WELLDONE Wallet".to_string(),
            description: "WELLDONE Wallet for Multichains".to_string(),
            icon_url: params.icon_url,
            deprecated: params.deprecated,
            download_url: WELLDONE_DOWNLOAD_URL.to_string(),
            available: provider.is_some(),
        },
        provider,
    }
}

// Re-export wallet types
pub use session::{Session, SessionAccount};
pub use welldone::WelldoneWallet;
