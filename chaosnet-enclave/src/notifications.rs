//! Notifications for enclave lifecycle decisions.

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::lifecycle::EnclaveState;

/// One lifecycle step, published after it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleNotification {
    /// The manager inspected the enclave.
    StateObserved { enclave: String, state: EnclaveState },

    EnclaveDestroyed { enclave: String },

    /// The settle delay after a destroy has elapsed.
    PlatformSettled { enclave: String },

    EnclaveCreated { enclave: String },

    NetworkBuilt { enclave: String, nodes: usize },

    /// An already running devnet with the declared shape is reused.
    Attached { enclave: String },
}

/// Statistics about notification delivery
#[derive(Debug, Default, Clone)]
pub struct NotificationStats {
    pub notifications_sent: u64,
    pub notifications_dropped: u64,
}

/// Broadcast bus for lifecycle notifications
pub struct LifecycleNotificationBus {
    broadcast_tx: broadcast::Sender<LifecycleNotification>,
    stats: RwLock<NotificationStats>,
}

impl Default for LifecycleNotificationBus {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl LifecycleNotificationBus {
    pub fn with_capacity(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            broadcast_tx,
            stats: RwLock::new(NotificationStats::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleNotification> {
        self.broadcast_tx.subscribe()
    }

    /// Publishing never fails; without subscribers the notification is
    /// counted as dropped.
    pub fn publish(&self, notification: LifecycleNotification) {
        let delivered = self.broadcast_tx.send(notification.clone()).is_ok();
        let mut stats = self.stats.write();
        stats.notifications_sent += 1;
        if !delivered {
            stats.notifications_dropped += 1;
        }
        debug!(?notification, delivered, "lifecycle notification");
    }

    pub fn stats(&self) -> NotificationStats {
        self.stats.read().clone()
    }
}
