//! welldone-near-wallet - WELLDONE injected wallet for NEAR wallet selectors
//!
//! Signs users in with the extension's active NEAR account, builds borsh
//! transactions from the selector's neutral action schema and hands them to
//! the extension for signing and broadcast.

pub mod config;
pub mod near;
pub mod provider;
pub mod selector;
pub mod wallet;

pub use config::{NetworkConfig, WalletOptions};
pub use provider::{InjectedProvider, ProviderError};
pub use selector::{Emitter, WalletEvent};
pub use wallet::{
    setup_welldone_wallet, WalletBehaviour, WalletContext, WalletError, WalletModule,
    WelldoneWallet, WelldoneWalletParams,
};
