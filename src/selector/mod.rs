//! Wallet-selector side of the adapter
//!
//! The neutral action schema, the account/transaction types the selector
//! exchanges with wallets, its event emitter and the headless modal.

pub mod action;
pub mod emitter;
pub mod modal;
pub mod types;

pub use action::{create_action, create_actions, Action, FunctionCallArgs};
pub use emitter::{Emitter, WalletEvent};
pub use modal::{
    LedgerWallet, ModalOptions, ModalState, ModalView, Theme, WalletSelection,
    DEFAULT_DERIVATION_PATH,
};
pub use types::*;
