//! WELLDONE Wallet
//!
//! Injected wallet adapter. Sign-in reads the extension's active NEAR account
//! and requires a full-access key for it; transactions are built here and
//! handed to the extension for signing and broadcast.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::access_key::validate_access_key;
use super::convert::convert_transaction;
use super::{
    Session, SessionAccount, WalletBehaviour, WalletContext, WalletError, WalletMetadata,
};
use crate::config::WalletOptions;
use crate::near::{NetworkError, NetworkProvider};
use crate::provider::{
    methods, parse_accounts, ChainAccount, EventStream, InjectedProvider, ProviderError,
    ProviderEventKind, ProviderRequest,
};
use crate::selector::{
    Account, Emitter, FinalExecutionOutcome, TransactionBatch, TransactionParams, VerifiedOwner,
    VerifyOwnerParams, WalletEvent,
};

/// Injected WELLDONE wallet
#[derive(Clone)]
pub struct WelldoneWallet {
    inner: Arc<Inner>,
}

struct Inner {
    metadata: WalletMetadata,
    options: WalletOptions,
    network: Arc<dyn NetworkProvider>,
    emitter: Emitter,
    session: RwLock<Session>,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// Event handler task; dropping the handle stops the handler
struct Subscription {
    kind: ProviderEventKind,
    task: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("releasing {} handler", self.kind);
        self.task.abort();
    }
}

impl WelldoneWallet {
    pub fn new(
        metadata: WalletMetadata,
        provider: Option<Arc<dyn InjectedProvider>>,
        context: WalletContext,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                metadata,
                options: context.options,
                network: context.network,
                emitter: context.emitter,
                session: RwLock::new(Session::initialize(provider)),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn metadata(&self) -> &WalletMetadata {
        &self.inner.metadata
    }

    fn chain(&self) -> &str {
        self.inner.options.chain()
    }

    async fn provider(&self) -> Option<Arc<dyn InjectedProvider>> {
        self.inner.session.read().await.wallet().cloned()
    }

    /// Provider and account of a signed-in session
    async fn require_session(
        &self,
    ) -> Result<(Arc<dyn InjectedProvider>, SessionAccount), WalletError> {
        let session = self.inner.session.read().await;
        let wallet = session.wallet().cloned().ok_or(WalletError::WalletNotInstalled)?;
        let account = session.account().cloned().ok_or(WalletError::NotSignedIn)?;
        Ok((wallet, account))
    }

    /// Account currently selected in the extension
    async fn active_account(&self) -> Result<Option<ChainAccount>, WalletError> {
        let Some(wallet) = self.provider().await else {
            return Ok(None);
        };

        let response = wallet
            .request(self.chain(), ProviderRequest::new(methods::ACCOUNTS))
            .await?;
        Ok(parse_accounts(&response, self.chain())?)
    }

    async fn send_envelopes(
        &self,
        wallet: &Arc<dyn InjectedProvider>,
        envelopes: Vec<String>,
    ) -> Result<Vec<String>, WalletError> {
        let response = wallet
            .request(
                self.chain(),
                ProviderRequest::with_params(methods::SEND_TRANSACTION, serde_json::json!(envelopes)),
            )
            .await?;

        let hashes: Vec<String> = serde_json::from_value(response).map_err(ProviderError::from)?;
        Ok(hashes)
    }

    async fn transaction_outcome(
        &self,
        wallet: &Arc<dyn InjectedProvider>,
        tx_hash: &str,
        signer_id: &str,
    ) -> Result<FinalExecutionOutcome, WalletError> {
        debug!("resolving outcome of {} ({})", tx_hash, signer_id);

        let response = wallet
            .request(
                self.chain(),
                ProviderRequest::with_params(methods::TX_STATUS, serde_json::json!([tx_hash, signer_id])),
            )
            .await?;

        let outcome = serde_json::from_value(response).map_err(ProviderError::from)?;
        Ok(outcome)
    }
}

impl Inner {
    async fn sign_out(&self) {
        let released = {
            if let Some(account) = self.session.write().await.clear_account() {
                info!("Signed out {}", account.account_id);
            }
            std::mem::take(&mut *self.subscriptions.lock().await)
        };

        self.emitter.emit(WalletEvent::SignedOut);
        // May include the handler we are running in; it stops at its next await
        drop(released);
    }

    fn setup_events(self: &Arc<Self>, wallet: &Arc<dyn InjectedProvider>) -> Vec<Subscription> {
        vec![
            spawn_handler(
                Arc::downgrade(self),
                ProviderEventKind::AccountsChanged,
                wallet.subscribe(ProviderEventKind::AccountsChanged),
            ),
            spawn_handler(
                Arc::downgrade(self),
                ProviderEventKind::ChainChanged,
                wallet.subscribe(ProviderEventKind::ChainChanged),
            ),
        ]
    }

    async fn on_account_change(&self, data: &Value) {
        info!("onAccountChange {}", data);
        self.sign_out().await;
    }

    async fn on_network_change(&self, network_id: Option<&str>) {
        info!("onNetworkChange {:?}", network_id);

        let expected = self.options.network.network_id.as_str();
        if network_id == Some(expected) {
            return;
        }

        self.sign_out().await;
        self.emitter.emit(WalletEvent::NetworkChanged {
            network_id: network_id.unwrap_or_default().to_string(),
        });
    }
}

fn next_nonce(nonce: u64) -> Result<u64, NetworkError> {
    nonce
        .checked_add(1)
        .ok_or_else(|| NetworkError::InvalidResponse(format!("access key nonce {} overflows", nonce)))
}

fn spawn_handler(inner: Weak<Inner>, kind: ProviderEventKind, mut events: EventStream) -> Subscription {
    let task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };

            match event.kind {
                ProviderEventKind::AccountsChanged => inner.on_account_change(&event.data).await,
                ProviderEventKind::ChainChanged => inner.on_network_change(event.network_id()).await,
            }
        }
    });

    Subscription { kind, task }
}

#[async_trait]
impl WalletBehaviour for WelldoneWallet {
    async fn sign_in(&self) -> Result<Vec<Account>, WalletError> {
        let existing = self.get_accounts().await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let Some(active) = self.active_account().await? else {
            info!("No active {} account in the extension", self.chain());
            return Ok(Vec::new());
        };

        let access_key =
            validate_access_key(self.inner.network.as_ref(), &active.address, &active.pub_key)
                .await?;

        if access_key.is_none() {
            self.inner.sign_out().await;
            return Err(WalletError::UnregisteredKey {
                account_id: active.address,
                public_key: active.pub_key,
            });
        }

        self.inner
            .session
            .write()
            .await
            .set_account(&active.address, &active.pub_key);

        if let Some(wallet) = self.provider().await {
            let subscriptions = self.inner.setup_events(&wallet);
            *self.inner.subscriptions.lock().await = subscriptions;
        }

        info!("Signed in as {}", active.address);
        self.get_accounts().await
    }

    async fn sign_out(&self) -> Result<(), WalletError> {
        self.inner.sign_out().await;
        Ok(())
    }

    async fn get_accounts(&self) -> Result<Vec<Account>, WalletError> {
        Ok(self
            .inner
            .session
            .read()
            .await
            .account()
            .map(|account| vec![Account::new(&account.account_id)])
            .unwrap_or_default())
    }

    async fn verify_owner(&self, params: VerifyOwnerParams) -> Result<VerifiedOwner, WalletError> {
        info!("Welldone:verifyOwner {}", params.message);

        Err(WalletError::NotSupported {
            wallet: self.inner.metadata.name.clone(),
        })
    }

    async fn sign_and_send_transaction(
        &self,
        params: TransactionParams,
    ) -> Result<FinalExecutionOutcome, WalletError> {
        info!(
            "signAndSendTransaction {} -> {} ({} actions)",
            params.signer_id,
            params.receiver_id,
            params.actions.len()
        );

        let (wallet, account) = self.require_session().await?;

        let access_key = self
            .inner
            .network
            .view_access_key(&account.account_id, &account.public_key)
            .await?;
        let nonce = next_nonce(access_key.nonce)?;

        let envelope =
            convert_transaction(&account.public_key, nonce, &access_key.block_hash, &params)?;

        let tx_hash = self
            .send_envelopes(&wallet, vec![envelope])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ProviderError::InvalidResponse("no transaction hash returned".to_string())
            })?;

        self.transaction_outcome(&wallet, &tx_hash, &params.signer_id).await
    }

    async fn sign_and_send_transactions(
        &self,
        params: TransactionBatch,
    ) -> Result<Vec<FinalExecutionOutcome>, WalletError> {
        info!("signAndSendTransactions ({} transactions)", params.transactions.len());

        let (wallet, account) = self.require_session().await?;

        let access_key = self
            .inner
            .network
            .view_access_key(&account.account_id, &account.public_key)
            .await?;

        // All nonces come from this one snapshot
        let mut nonce = access_key.nonce;
        let mut envelopes = Vec::with_capacity(params.transactions.len());
        for transaction in &params.transactions {
            nonce = next_nonce(nonce)?;
            envelopes.push(convert_transaction(
                &account.public_key,
                nonce,
                &access_key.block_hash,
                transaction,
            )?);
        }

        let hashes = self.send_envelopes(&wallet, envelopes).await?;
        if hashes.len() != params.transactions.len() {
            warn!(
                "extension returned {} hashes for {} transactions",
                hashes.len(),
                params.transactions.len()
            );
        }

        let mut outcomes = Vec::with_capacity(hashes.len());
        for (hash, transaction) in hashes.iter().zip(&params.transactions) {
            outcomes.push(
                self.transaction_outcome(&wallet, hash, &transaction.signer_id)
                    .await?,
            );
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::broadcast;

    use crate::config::NetworkConfig;
    use crate::near::{PublicKey, Transaction};
    use crate::provider::mock::{KeyLookup, MockNetwork, MockProvider};
    use crate::selector::{action::TransferParams, Action, U128};

    const ALICE: &str = "alice.near";
    const ALICE_KEY: &str = "ed25519:ABC";

    fn signing_key_text() -> String {
        let signing = ed25519_dalek::SigningKey::from_bytes(&[4u8; 32]);
        PublicKey::from(signing.verifying_key()).to_string()
    }

    fn wallet_with(
        provider: Option<Arc<MockProvider>>,
        network: Arc<MockNetwork>,
    ) -> (WelldoneWallet, broadcast::Receiver<WalletEvent>) {
        let emitter = Emitter::default();
        let events = emitter.subscribe();
        let metadata = super::super::setup_welldone_wallet(Default::default(), None).metadata;

        let wallet = WelldoneWallet::new(
            metadata,
            provider.map(|p| p as Arc<dyn InjectedProvider>),
            WalletContext {
                options: WalletOptions::new(NetworkConfig::testnet()),
                network,
                emitter,
            },
        );
        (wallet, events)
    }

    fn transfer(receiver: &str, deposit: u128) -> TransactionParams {
        TransactionParams::new(
            ALICE,
            receiver,
            vec![Action::Transfer(TransferParams { deposit: U128(deposit) })],
        )
    }

    async fn next_event(events: &mut broadcast::Receiver<WalletEvent>) -> WalletEvent {
        tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timed out waiting for wallet event")
            .expect("emitter closed")
    }

    #[tokio::test]
    async fn test_sign_in_with_full_access_key() {
        let provider = Arc::new(MockProvider::new(Some((ALICE, ALICE_KEY))));
        let (wallet, _events) = wallet_with(Some(provider), Arc::new(MockNetwork::full_access(5)));

        let accounts = wallet.sign_in().await.unwrap();
        assert_eq!(accounts, vec![Account::new(ALICE)]);
        assert_eq!(wallet.get_accounts().await.unwrap(), accounts);
    }

    #[tokio::test]
    async fn test_sign_in_twice_skips_validation() {
        let provider = Arc::new(MockProvider::new(Some((ALICE, ALICE_KEY))));
        let network = Arc::new(MockNetwork::full_access(5));
        let (wallet, _events) = wallet_with(Some(provider.clone()), network.clone());

        let first = wallet.sign_in().await.unwrap();
        let second = wallet.sign_in().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(network.calls(), 1);
        assert_eq!(provider.requests_for(methods::ACCOUNTS).len(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_with_unregistered_key() {
        let provider = Arc::new(MockProvider::new(Some((ALICE, ALICE_KEY))));
        let (wallet, mut events) =
            wallet_with(Some(provider), Arc::new(MockNetwork::new(KeyLookup::Missing)));

        let err = wallet.sign_in().await.unwrap_err();
        assert!(matches!(err, WalletError::UnregisteredKey { .. }));
        let message = err.to_string();
        assert!(message.contains("ABC"));
        assert!(message.contains(ALICE));

        assert!(wallet.get_accounts().await.unwrap().is_empty());
        assert_eq!(next_event(&mut events).await, WalletEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_limited_key() {
        let provider = Arc::new(MockProvider::new(Some((ALICE, ALICE_KEY))));
        let permission = crate::near::AccessKeyPermissionView::FunctionCall {
            allowance: None,
            receiver_id: "app.near".to_string(),
            method_names: vec![],
        };
        let network = MockNetwork::new(KeyLookup::Found(crate::provider::mock::access_key(1, permission)));
        let (wallet, _events) = wallet_with(Some(provider), Arc::new(network));

        let err = wallet.sign_in().await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidPermission));
        assert!(wallet.get_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_without_active_account() {
        let provider = Arc::new(MockProvider::new(None));
        let network = Arc::new(MockNetwork::full_access(5));
        let (wallet, _events) = wallet_with(Some(provider), network.clone());

        assert!(wallet.sign_in().await.unwrap().is_empty());
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_not_installed() {
        let (wallet, _events) = wallet_with(None, Arc::new(MockNetwork::full_access(5)));

        assert!(wallet.sign_in().await.unwrap().is_empty());
        let err = wallet
            .sign_and_send_transaction(transfer("bob.near", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::WalletNotInstalled));
    }

    #[tokio::test]
    async fn test_send_requires_sign_in() {
        let provider = Arc::new(MockProvider::new(Some((ALICE, ALICE_KEY))));
        let (wallet, _events) = wallet_with(Some(provider), Arc::new(MockNetwork::full_access(5)));

        let err = wallet
            .sign_and_send_transactions(TransactionBatch {
                transactions: vec![transfer("bob.near", 1)],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::NotSignedIn));
    }

    #[tokio::test]
    async fn test_sign_out_is_idempotent() {
        let (wallet, mut events) = wallet_with(None, Arc::new(MockNetwork::full_access(5)));

        tokio_test::assert_ok!(wallet.sign_out().await);
        assert_eq!(next_event(&mut events).await, WalletEvent::SignedOut);
        assert!(events.try_recv().is_err());

        tokio_test::assert_ok!(wallet.sign_out().await);
        assert_eq!(next_event(&mut events).await, WalletEvent::SignedOut);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_verify_owner_not_supported() {
        let (wallet, _events) = wallet_with(None, Arc::new(MockNetwork::full_access(5)));

        let err = wallet
            .verify_owner(VerifyOwnerParams {
                message: "hello".to_string(),
                callback_url: None,
                meta: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Method not supported by WELLDONE Wallet");
    }

    #[tokio::test]
    async fn test_sign_and_send_transaction() {
        let key = signing_key_text();
        let provider = Arc::new(MockProvider::new(Some((ALICE, key.as_str()))));
        let network = Arc::new(MockNetwork::full_access(5));
        let (wallet, _events) = wallet_with(Some(provider.clone()), network.clone());
        wallet.sign_in().await.unwrap();

        let outcome = wallet
            .sign_and_send_transaction(transfer("bob.near", 100))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(network.calls(), 2);

        let sends = provider.requests_for(methods::SEND_TRANSACTION);
        assert_eq!(sends.len(), 1);
        let envelope = sends[0].params.as_ref().unwrap()[0].as_str().unwrap().to_string();
        let tx = Transaction::decode_base64(&envelope).unwrap();
        assert_eq!(tx.nonce, 6);
        assert_eq!(tx.receiver_id, "bob.near");
        assert_eq!(tx.public_key.to_string(), key);

        let status = provider.requests_for(methods::TX_STATUS);
        assert_eq!(
            status[0].params,
            Some(serde_json::json!([tx.hash().unwrap(), ALICE]))
        );
    }

    #[tokio::test]
    async fn test_batch_uses_sequential_nonces() {
        let key = signing_key_text();
        let provider = Arc::new(MockProvider::new(Some((ALICE, key.as_str()))));
        let network = Arc::new(MockNetwork::full_access(5));
        let (wallet, _events) = wallet_with(Some(provider.clone()), network.clone());
        wallet.sign_in().await.unwrap();

        let batch = TransactionBatch {
            transactions: vec![
                transfer("a.near", 1),
                transfer("b.near", 2),
                transfer("c.near", 3),
            ],
        };
        let outcomes = wallet.sign_and_send_transactions(batch).await.unwrap();
        assert_eq!(outcomes.len(), 3);
        // One lookup for sign-in, one for the whole batch
        assert_eq!(network.calls(), 2);

        let sends = provider.requests_for(methods::SEND_TRANSACTION);
        assert_eq!(sends.len(), 1);
        let envelopes = sends[0].params.as_ref().unwrap().as_array().unwrap();
        let txs: Vec<Transaction> = envelopes
            .iter()
            .map(|e| Transaction::decode_base64(e.as_str().unwrap()).unwrap())
            .collect();

        assert_eq!(txs.iter().map(|t| t.nonce).collect::<Vec<_>>(), vec![6, 7, 8]);
        assert_eq!(
            txs.iter().map(|t| t.receiver_id.as_str()).collect::<Vec<_>>(),
            vec!["a.near", "b.near", "c.near"]
        );

        let status = provider.requests_for(methods::TX_STATUS);
        for (request, tx) in status.iter().zip(&txs) {
            assert_eq!(request.params.as_ref().unwrap()[0], tx.hash().unwrap());
        }
    }

    #[tokio::test]
    async fn test_provider_rejection_propagates() {
        let key = signing_key_text();
        let provider = Arc::new(MockProvider::new(Some((ALICE, key.as_str()))).rejecting_sends());
        let (wallet, _events) = wallet_with(Some(provider), Arc::new(MockNetwork::full_access(5)));
        wallet.sign_in().await.unwrap();

        let err = wallet
            .sign_and_send_transaction(transfer("bob.near", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Provider(ProviderError::Rejected { code: 4001, .. })));
        assert_eq!(err.to_string(), "Provider rejected request [4001]: User rejected the request");
    }

    #[tokio::test]
    async fn test_revoked_key_fails_send_unchanged() {
        let key = signing_key_text();
        let provider = Arc::new(MockProvider::new(Some((ALICE, key.as_str()))));
        let network = Arc::new(MockNetwork::full_access(5));
        let (wallet, _events) = wallet_with(Some(provider), network.clone());
        wallet.sign_in().await.unwrap();

        network.set_lookup(KeyLookup::Missing);
        let err = wallet
            .sign_and_send_transaction(transfer("bob.near", 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::Network(crate::near::NetworkError::AccessKeyDoesNotExist { .. })
        ));
    }

    #[tokio::test]
    async fn test_account_change_signs_out() {
        let provider = Arc::new(MockProvider::new(Some((ALICE, ALICE_KEY))));
        let (wallet, mut events) =
            wallet_with(Some(provider.clone()), Arc::new(MockNetwork::full_access(5)));
        wallet.sign_in().await.unwrap();

        provider.emit(ProviderEventKind::AccountsChanged, serde_json::json!("bob.near"));

        assert_eq!(next_event(&mut events).await, WalletEvent::SignedOut);
        assert!(wallet.get_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_network_change() {
        let provider = Arc::new(MockProvider::new(Some((ALICE, ALICE_KEY))));
        let (wallet, mut events) =
            wallet_with(Some(provider.clone()), Arc::new(MockNetwork::full_access(5)));
        wallet.sign_in().await.unwrap();

        // Same network is ignored; the next one signs out and reports the change
        provider.emit(ProviderEventKind::ChainChanged, serde_json::json!({ "networkId": "testnet" }));
        provider.emit(ProviderEventKind::ChainChanged, serde_json::json!({ "networkId": "mainnet" }));

        assert_eq!(next_event(&mut events).await, WalletEvent::SignedOut);
        assert_eq!(
            next_event(&mut events).await,
            WalletEvent::NetworkChanged {
                network_id: "mainnet".to_string()
            }
        );
        assert!(wallet.get_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_releases_subscriptions() {
        let provider = Arc::new(MockProvider::new(Some((ALICE, ALICE_KEY))));
        let (wallet, _events) =
            wallet_with(Some(provider.clone()), Arc::new(MockNetwork::full_access(5)));

        wallet.sign_in().await.unwrap();
        assert_eq!(provider.subscriber_count(), 2);

        wallet.sign_out().await.unwrap();
        let released = tokio::time::timeout(Duration::from_secs(1), async {
            while provider.subscriber_count() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(released.is_ok());
    }

    #[tokio::test]
    async fn test_exhausted_nonce_is_an_error() {
        let key = signing_key_text();
        let provider = Arc::new(MockProvider::new(Some((ALICE, key.as_str()))));
        let (wallet, _events) =
            wallet_with(Some(provider.clone()), Arc::new(MockNetwork::full_access(u64::MAX)));
        wallet.sign_in().await.unwrap();

        let err = wallet
            .sign_and_send_transaction(transfer("bob.near", 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::Network(crate::near::NetworkError::InvalidResponse(_))
        ));

        let err = wallet
            .sign_and_send_transactions(TransactionBatch {
                transactions: vec![transfer("a.near", 1)],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::Network(crate::near::NetworkError::InvalidResponse(_))
        ));
        assert!(provider.requests_for(methods::SEND_TRANSACTION).is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_after_sign_out_starts_fresh_handlers() {
        let provider = Arc::new(MockProvider::new(Some((ALICE, ALICE_KEY))));
        let network = Arc::new(MockNetwork::full_access(5));
        let (wallet, mut events) = wallet_with(Some(provider.clone()), network.clone());

        wallet.sign_in().await.unwrap();
        wallet.sign_out().await.unwrap();
        assert_eq!(next_event(&mut events).await, WalletEvent::SignedOut);

        let accounts = wallet.sign_in().await.unwrap();
        assert_eq!(accounts, vec![Account::new(ALICE)]);
        assert_eq!(network.calls(), 2);
        // No signedOut from the second sign-in
        assert!(events.try_recv().is_err());

        // Handlers from the first session are gone; only the new pair remains
        let settled = tokio::time::timeout(Duration::from_secs(1), async {
            while provider.subscriber_count() != 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(settled.is_ok());
    }
}
