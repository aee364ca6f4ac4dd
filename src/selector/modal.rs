//! Headless wallet-selection modal
//!
//! Holds what the selector modal shows and forwards user actions to wallets.
//! Rendering is left to the host; this only tracks panel visibility, the
//! Ledger derivation-path form and the selected wallet.

use async_trait::async_trait;

use super::{Account, WalletEvent};
use crate::wallet::{WalletBehaviour, WalletError, WalletModule, WalletType};

/// Default NEAR derivation path for Ledger devices
pub const DEFAULT_DERIVATION_PATH: &str = "44'/397'/0'/0'/0'";

const DEFAULT_DESCRIPTION: &str = "Please select a wallet to connect to this dApp:";

/// Wallet backed by a Ledger device; implemented by the Ledger wallet module
#[async_trait]
pub trait LedgerWallet: Send {
    fn set_derivation_path(&mut self, path: &str);

    fn set_account_id(&mut self, account_id: &str);

    async fn sign_in(&mut self) -> Result<Vec<Account>, WalletError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

/// Selector UI options
#[derive(Debug, Clone, Default)]
pub struct ModalOptions {
    pub theme: Option<Theme>,
    pub description: Option<String>,
    pub explanation: Option<String>,
    pub network_id: String,
}

/// Selector-owned state the modal is driven by
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalState {
    pub show_modal: bool,
    pub show_wallet_options: bool,
    pub show_ledger_derivation_path: bool,
    pub show_wallet_not_installed: bool,
    pub show_switch_network: bool,
    pub signed_in_wallet_id: Option<String>,
}

/// What picking a wallet from the list leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletSelection {
    /// Extension missing; the not-installed panel is shown
    NotInstalled,
    /// Hardware wallet; the derivation-path panel is shown
    DerivationPath,
    /// Ready to call `sign_in` on the wallet
    SignIn,
}

/// One entry of the wallet list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletListItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon_url: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LedgerForm {
    use_custom_path: bool,
    custom_path: String,
    account_id: String,
    error: Option<String>,
}

impl Default for LedgerForm {
    fn default() -> Self {
        Self {
            use_custom_path: false,
            custom_path: DEFAULT_DERIVATION_PATH.to_string(),
            account_id: String::new(),
            error: None,
        }
    }
}

pub struct ModalView {
    options: ModalOptions,
    state: ModalState,
    ledger: LedgerForm,
    wallet_info_visible: bool,
}

impl ModalView {
    pub fn new(options: ModalOptions) -> Self {
        Self {
            options,
            state: ModalState::default(),
            ledger: LedgerForm::default(),
            wallet_info_visible: false,
        }
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    /// Apply a selector state update
    pub fn update_state(&mut self, update: impl FnOnce(&mut ModalState)) {
        update(&mut self.state);
    }

    pub fn theme_class(&self) -> &'static str {
        match self.options.theme {
            Some(Theme::Dark) => "Modal-dark-theme",
            Some(Theme::Light) => "Modal-light-theme",
            None => "",
        }
    }

    pub fn description(&self) -> &str {
        self.options.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)
    }

    /// Wallets to list, with the signed-in one marked
    pub fn wallet_list(&self, modules: &[WalletModule]) -> Vec<WalletListItem> {
        modules
            .iter()
            .filter(|module| !module.metadata.deprecated)
            .map(|module| WalletListItem {
                id: module.id.clone(),
                name: module.metadata.name.clone(),
                description: module.metadata.description.clone(),
                icon_url: module.metadata.icon_url.clone(),
                selected: self.state.signed_in_wallet_id.as_deref() == Some(module.id.as_str()),
            })
            .collect()
    }

    /// Pick a wallet from the list and switch to the matching panel
    pub fn select_wallet(&mut self, module: &WalletModule) -> WalletSelection {
        self.state.show_wallet_options = false;

        if module.kind == WalletType::Injected && !module.metadata.available {
            self.state.show_wallet_not_installed = true;
            return WalletSelection::NotInstalled;
        }

        if module.kind == WalletType::Hardware {
            self.state.show_ledger_derivation_path = true;
            return WalletSelection::DerivationPath;
        }

        WalletSelection::SignIn
    }

    /// Sign in with the selected wallet; the modal closes on success
    pub async fn sign_in(
        &mut self,
        wallet_id: &str,
        wallet: &dyn WalletBehaviour,
    ) -> Result<Vec<Account>, WalletError> {
        let accounts = wallet.sign_in().await?;
        if !accounts.is_empty() {
            self.state.signed_in_wallet_id = Some(wallet_id.to_string());
            self.close();
        }
        Ok(accounts)
    }

    /// Sign out of the selected wallet
    pub async fn sign_out(&mut self, wallet: &dyn WalletBehaviour) -> Result<(), WalletError> {
        wallet.sign_out().await?;
        self.state.signed_in_wallet_id = None;
        Ok(())
    }

    /// Close the modal and reset the derivation-path form; the account id is kept
    pub fn close(&mut self) {
        self.state.show_modal = false;
        self.ledger.use_custom_path = false;
        self.ledger.custom_path = DEFAULT_DERIVATION_PATH.to_string();
        self.ledger.error = None;
        self.wallet_info_visible = false;
    }

    pub fn account_id(&self) -> &str {
        &self.ledger.account_id
    }

    pub fn use_custom_path(&mut self) {
        self.ledger.use_custom_path = true;
    }

    pub fn use_default_path(&mut self) {
        self.ledger.use_custom_path = false;
        self.ledger.error = None;
    }

    pub fn set_custom_path(&mut self, path: &str) {
        self.ledger.custom_path = path.to_string();
    }

    pub fn set_account_id(&mut self, account_id: &str) {
        self.ledger.account_id = account_id.to_string();
    }

    pub fn derivation_path(&self) -> &str {
        if self.ledger.use_custom_path {
            &self.ledger.custom_path
        } else {
            DEFAULT_DERIVATION_PATH
        }
    }

    pub fn ledger_error(&self) -> Option<&str> {
        self.ledger.error.as_deref()
    }

    /// "Connect" on the Ledger panel
    pub async fn connect_ledger(&mut self, wallet: &mut dyn LedgerWallet) -> Option<Vec<Account>> {
        wallet.set_derivation_path(self.derivation_path());
        wallet.set_account_id(&self.ledger.account_id);

        match wallet.sign_in().await {
            Ok(accounts) => Some(accounts),
            Err(e) => {
                self.ledger.error = Some(format!("Error: {}", e));
                None
            }
        }
    }

    /// "Back" on the wallet-not-installed panel
    pub fn back_to_wallet_options(&mut self) {
        self.state.show_wallet_options = true;
        self.state.show_wallet_not_installed = false;
    }

    /// "Switch Wallet" on the switch-network panel
    pub fn switch_wallet(&mut self) {
        self.state.show_wallet_options = true;
        self.state.show_switch_network = false;
    }

    pub fn switch_network_message(&self) -> String {
        format!(
            "We've detected that you need to change your wallet's network to {} for this dApp.",
            self.options.network_id
        )
    }

    /// Toggle the "What is a Wallet?" panel; only shown with an explanation
    pub fn toggle_explanation(&mut self) -> bool {
        if self.options.explanation.is_some() {
            self.wallet_info_visible = !self.wallet_info_visible;
        }
        self.wallet_info_visible
    }

    /// React to a wallet notification
    pub fn handle_event(&mut self, event: &WalletEvent) {
        match event {
            WalletEvent::SignedOut => {
                self.state.signed_in_wallet_id = None;
            }
            WalletEvent::NetworkChanged { .. } => {
                self.state.show_modal = true;
                self.state.show_wallet_options = false;
                self.state.show_switch_network = true;
            }
        }
    }
}
