//! Session state for the injected wallet
//!
//! The provider handle is fixed when the session is created. Only the
//! account changes, and it is only set after the access key was validated.

use std::sync::Arc;

use crate::provider::InjectedProvider;

/// Account the wallet is signed in with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAccount {
    pub account_id: String,
    pub public_key: String,
}

pub struct Session {
    wallet: Option<Arc<dyn InjectedProvider>>,
    account: Option<SessionAccount>,
}

impl Session {
    /// Start a session around whatever provider the host found, if any
    pub fn initialize(wallet: Option<Arc<dyn InjectedProvider>>) -> Self {
        Self {
            wallet,
            account: None,
        }
    }

    pub fn wallet(&self) -> Option<&Arc<dyn InjectedProvider>> {
        self.wallet.as_ref()
    }

    pub fn is_installed(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn account(&self) -> Option<&SessionAccount> {
        self.account.as_ref()
    }

    pub fn set_account(&mut self, account_id: &str, public_key: &str) {
        self.account = Some(SessionAccount {
            account_id: account_id.to_string(),
            public_key: public_key.to_string(),
        });
    }

    /// Drop the account; no-op when already signed out
    pub fn clear_account(&mut self) -> Option<SessionAccount> {
        self.account.take()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("installed", &self.is_installed())
            .field("account", &self.account)
            .finish()
    }
}
