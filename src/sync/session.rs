//! Process-wide state of one authenticated operator session.
//!
//! The session object is shared by reference with every background task so
//! that selection and the polling flag are read fresh at each suspension
//! point, never captured by value at task start.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{RwLock, watch};

use super::types::{PeerId, UnreadTotals};

/// Mutable per-session state owned by the sync coordinator.
pub struct SyncSession {
    /// Currently selected conversation, if any.
    selected: RwLock<Option<PeerId>>,
    /// Cooperative-cancellation flag for the background tasks.
    polling: watch::Sender<bool>,
    /// Aggregate unread counters for the navigation badges.
    unread: RwLock<UnreadTotals>,
    /// Whether the conversation list is filtered to unread ones.
    unread_only: AtomicBool,
}

impl Default for SyncSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncSession {
    /// Create a session with polling disabled and nothing selected.
    #[must_use]
    pub fn new() -> Self {
        let (polling, _) = watch::channel(false);
        Self {
            selected: RwLock::new(None),
            polling,
            unread: RwLock::new(UnreadTotals::default()),
            unread_only: AtomicBool::new(false),
        }
    }

    /// The currently selected conversation, read fresh.
    pub async fn selected(&self) -> Option<PeerId> {
        self.selected.read().await.clone()
    }

    /// Select a conversation.
    pub async fn set_selected(&self, peer: PeerId) {
        let mut guard = self.selected.write().await;
        *guard = Some(peer);
    }

    /// Clear the selection.
    pub async fn clear_selected(&self) {
        let mut guard = self.selected.write().await;
        *guard = None;
    }

    /// Whether background polling is currently allowed.
    #[must_use]
    pub fn polling_enabled(&self) -> bool {
        *self.polling.borrow()
    }

    /// Allow background polling.
    pub fn enable_polling(&self) {
        self.polling.send_replace(true);
    }

    /// Disable background polling; loops observe this at their next
    /// suspension point and stop without issuing further requests.
    pub fn disable_polling(&self) {
        self.polling.send_replace(false);
    }

    /// Subscribe to polling-flag changes (used by the unread aggregator to
    /// stop without waiting out its interval).
    #[must_use]
    pub fn subscribe_polling(&self) -> watch::Receiver<bool> {
        self.polling.subscribe()
    }

    /// Current aggregate unread counters.
    pub async fn unread_totals(&self) -> UnreadTotals {
        *self.unread.read().await
    }

    /// Overwrite the messages-unread total.
    pub async fn set_unread_messages(&self, count: u64) {
        let mut guard = self.unread.write().await;
        guard.messages = count;
    }

    /// Overwrite the requests-unread total.
    pub async fn set_unread_requests(&self, count: u64) {
        let mut guard = self.unread.write().await;
        guard.requests = count;
    }

    /// Reduce the messages-unread total, saturating at zero.
    pub async fn reduce_unread_messages(&self, by: u64) {
        let mut guard = self.unread.write().await;
        guard.messages = guard.messages.saturating_sub(by);
    }

    /// Whether the conversation list is filtered to unread conversations.
    #[must_use]
    pub fn unread_only(&self) -> bool {
        self.unread_only.load(Ordering::Relaxed)
    }

    /// Toggle the unread-only list filter.
    pub fn set_unread_only(&self, enabled: bool) {
        self.unread_only.store(enabled, Ordering::Relaxed);
    }
}
