//! In-memory provider doubles for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_stream::stream;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{
    methods, ChainAccount, EventStream, InjectedProvider, ProviderError, ProviderEvent,
    ProviderEventKind, ProviderRequest,
};
use crate::near::{
    AccessKeyPermissionView, AccessKeyView, NetworkError, NetworkProvider, Transaction,
};

/// Injected provider that answers from memory and records every request
pub(crate) struct MockProvider {
    account: Mutex<Option<ChainAccount>>,
    requests: Mutex<Vec<ProviderRequest>>,
    events: broadcast::Sender<ProviderEvent>,
    reject_sends: bool,
}

impl MockProvider {
    pub fn new(account: Option<(&str, &str)>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            account: Mutex::new(account.map(|(address, pub_key)| ChainAccount {
                address: address.to_string(),
                pub_key: pub_key.to_string(),
            })),
            requests: Mutex::new(Vec::new()),
            events,
            reject_sends: false,
        }
    }

    /// Reject every send the way the extension does when the user declines
    pub fn rejecting_sends(mut self) -> Self {
        self.reject_sends = true;
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, method: &str) -> Vec<ProviderRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub fn emit(&self, kind: ProviderEventKind, data: Value) {
        let _ = self.events.send(ProviderEvent { kind, data });
    }

    /// Number of live event subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn send_transactions(&self, params: Option<Value>) -> Result<Value, ProviderError> {
        if self.reject_sends {
            return Err(ProviderError::Rejected {
                code: 4001,
                message: "User rejected the request".to_string(),
            });
        }

        let envelopes: Vec<String> = serde_json::from_value(params.unwrap_or(Value::Null))?;

        let mut hashes = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            let tx = Transaction::decode_base64(&envelope)
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            hashes.push(
                tx.hash()
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?,
            );
        }

        Ok(serde_json::json!(hashes))
    }
}

#[async_trait]
impl InjectedProvider for MockProvider {
    async fn request(&self, chain: &str, request: ProviderRequest) -> Result<Value, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        match request.method.as_str() {
            methods::ACCOUNTS => {
                let mut response = serde_json::Map::new();
                if let Some(account) = self.account.lock().unwrap().clone() {
                    response.insert(chain.to_string(), serde_json::to_value(account)?);
                }
                Ok(Value::Object(response))
            }
            methods::SEND_TRANSACTION => self.send_transactions(request.params),
            methods::TX_STATUS => {
                let params = request.params.unwrap_or(Value::Null);
                Ok(serde_json::json!({
                    "status": { "SuccessValue": "" },
                    "transaction": { "hash": params[0], "signer_id": params[1] },
                    "transaction_outcome": {},
                    "receipts_outcome": []
                }))
            }
            other => Err(ProviderError::Rejected {
                code: -32601,
                message: format!("method not found: {}", other),
            }),
        }
    }

    fn subscribe(&self, kind: ProviderEventKind) -> EventStream {
        let mut receiver = self.events.subscribe();
        Box::pin(stream! {
            while let Ok(event) = receiver.recv().await {
                if event.kind == kind {
                    yield event;
                }
            }
        })
    }
}

/// What the mock network answers to `view_access_key`
#[derive(Debug, Clone)]
pub(crate) enum KeyLookup {
    Found(AccessKeyView),
    Missing,
    Failing(String),
}

/// Network provider double counting access-key lookups
pub(crate) struct MockNetwork {
    lookup: Mutex<KeyLookup>,
    calls: AtomicUsize,
}

impl MockNetwork {
    pub fn new(lookup: KeyLookup) -> Self {
        Self {
            lookup: Mutex::new(lookup),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn full_access(nonce: u64) -> Self {
        Self::new(KeyLookup::Found(access_key(nonce, AccessKeyPermissionView::FullAccess)))
    }

    pub fn set_lookup(&self, lookup: KeyLookup) {
        *self.lookup.lock().unwrap() = lookup;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkProvider for MockNetwork {
    async fn view_access_key(
        &self,
        account_id: &str,
        public_key: &str,
    ) -> Result<AccessKeyView, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.lookup.lock().unwrap().clone() {
            KeyLookup::Found(key) => Ok(key),
            KeyLookup::Missing => Err(NetworkError::AccessKeyDoesNotExist {
                account_id: account_id.to_string(),
                public_key: public_key.to_string(),
            }),
            KeyLookup::Failing(message) => Err(NetworkError::Rpc {
                name: "UNKNOWN_ACCOUNT".to_string(),
                message,
            }),
        }
    }
}

/// Block hash used by test access keys
pub(crate) fn test_block_hash() -> String {
    bs58::encode([7u8; 32]).into_string()
}

pub(crate) fn access_key(nonce: u64, permission: AccessKeyPermissionView) -> AccessKeyView {
    AccessKeyView {
        nonce,
        permission,
        block_hash: test_block_hash(),
        block_height: 1,
    }
}
