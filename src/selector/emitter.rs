//! Wallet event emitter consumed by the host selector

use tokio::sync::broadcast;
use tracing::debug;

/// Notifications a wallet publishes to the selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    SignedOut,
    NetworkChanged { network_id: String },
}

impl WalletEvent {
    /// Event name as the selector knows it
    pub fn name(&self) -> &'static str {
        match self {
            WalletEvent::SignedOut => "signedOut",
            WalletEvent::NetworkChanged { .. } => "networkChanged",
        }
    }
}

/// Broadcast emitter; every subscriber sees every event
#[derive(Debug, Clone)]
pub struct Emitter {
    sender: broadcast::Sender<WalletEvent>,
}

impl Emitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning how many subscribers received it
    pub fn emit(&self, event: WalletEvent) -> usize {
        debug!("emit {}: {:?}", event.name(), event);
        // No subscribers is not an error for the wallet
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(64)
    }
}
