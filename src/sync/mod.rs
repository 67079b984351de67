//! Realtime conversation synchronization for the ClerkDesk operator console.
//!
//! The remote message store is only reachable through request/response and
//! long-polling primitives, so this module keeps the operator's view
//! consistent by reconciliation rather than by a persistent socket:
//! - Long-poll notification loop driving conversation/timeline refreshes
//! - Optimistic local send with server reconciliation
//! - Unread-counter bookkeeping across messages and customer requests
//! - Selection and read-state transitions
//!
//! All components run as cooperatively scheduled tokio tasks; consistency
//! comes from authoritative wholesale replaces plus idempotent, peer-keyed
//! patches, never from cross-component locks.

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod session;
pub mod store;
pub mod timeline;
pub mod types;
pub mod unread;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ChatTransport, HttpTransport};
pub use config::SyncConfig;
pub use error::{SendError, SyncError};
pub use session::SyncSession;
pub use store::{ConversationPatch, ConversationStore};
pub use timeline::MessageTimeline;
pub use types::{
    Conversation, Direction, Message, MessageId, PeerId, PollEvent, ProvisionalId, UnreadResource,
    UnreadTotals,
};

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;

use poller::NotificationPoller;
use unread::UnreadAggregator;

/// Operator-facing notification collaborator (sound, OS toast, …).
///
/// Invoked when activity lands in a conversation the operator is not looking
/// at. Raising the signal is best-effort: the coordinator logs and swallows
/// any failure.
pub trait AttentionSignal: Send + Sync {
    /// Raise the attention signal once.
    ///
    /// # Errors
    /// Implementations may fail (no audio device, notification permission
    /// revoked); the failure never propagates past the coordinator.
    fn raise(&self) -> anyhow::Result<()>;
}

/// Default attention sink that only writes a log line.
pub struct LogAttention;

impl AttentionSignal for LogAttention {
    fn raise(&self) -> anyhow::Result<()> {
        tracing::info!("new activity outside the active conversation");
        Ok(())
    }
}

/// Join handles of the background tasks driving a live session.
pub struct SyncTasks {
    poller: JoinHandle<()>,
    unread: JoinHandle<()>,
}

impl SyncTasks {
    /// Enable polling and spawn the notification poller and the unread
    /// aggregator over the given coordinator.
    ///
    /// Call [`SyncService::shutdown`] to stop both cooperatively, then
    /// [`join`](Self::join) to wait them out.
    #[must_use]
    pub fn spawn(service: &Arc<SyncService>) -> Self {
        service.session().enable_polling();
        Self {
            poller: tokio::spawn(NotificationPoller::new(Arc::clone(service)).run()),
            unread: tokio::spawn(UnreadAggregator::new(Arc::clone(service)).run()),
        }
    }

    /// Wait for both background tasks to finish after a shutdown.
    pub async fn join(self) {
        let (poller, unread) = tokio::join!(self.poller, self.unread);
        if let Err(err) = poller {
            tracing::warn!("notification poller task failed: {err}");
        }
        if let Err(err) = unread {
            tracing::warn!("unread aggregator task failed: {err}");
        }
    }
}

/// Coordinator that owns the session state and mediates every mutation of
/// the conversation store and the message timeline.
pub struct SyncService {
    config: SyncConfig,
    transport: Arc<dyn ChatTransport>,
    conversations: ConversationStore,
    timeline: MessageTimeline,
    session: Arc<SyncSession>,
    attention: Arc<dyn AttentionSignal>,
}

impl SyncService {
    /// Create a coordinator over an arbitrary transport and attention sink.
    #[must_use]
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn ChatTransport>,
        attention: Arc<dyn AttentionSignal>,
    ) -> Self {
        Self {
            config,
            transport,
            conversations: ConversationStore::new(),
            timeline: MessageTimeline::new(),
            session: Arc::new(SyncSession::new()),
            attention,
        }
    }

    /// Create a coordinator over the HTTP transport with the default
    /// log-based attention sink.
    ///
    /// # Errors
    /// Returns an error if the HTTP transport cannot be created.
    pub fn with_http(config: SyncConfig) -> Result<Self, SyncError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::new(config, transport, Arc::new(LogAttention)))
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The session state (selection, polling flag, aggregate unread).
    #[must_use]
    pub fn session(&self) -> &SyncSession {
        &self.session
    }

    /// The conversation table.
    #[must_use]
    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// The timeline of the selected conversation.
    #[must_use]
    pub fn timeline(&self) -> &MessageTimeline {
        &self.timeline
    }

    pub(crate) fn transport(&self) -> &dyn ChatTransport {
        self.transport.as_ref()
    }

    /// Issue one long-poll wait with the configured server-side budget.
    pub(crate) async fn wait_for_messages(&self) -> Result<PollEvent, SyncError> {
        self.transport
            .wait_for_messages(self.config.long_poll_wait)
            .await
    }

    /// React to a transport failure: an auth rejection anywhere disables all
    /// background polling.
    pub(crate) fn note_failure(&self, err: &SyncError) {
        if err.is_auth() {
            tracing::warn!("credential rejected; disabling background polling");
            self.session.disable_polling();
        }
    }

    /// Disable polling; the background loops observe the flag at their next
    /// suspension point and stop without issuing further requests.
    pub fn shutdown(&self) {
        self.session.disable_polling();
    }

    /// Fetch the conversation list (honoring the unread-only filter) and
    /// replace the table wholesale.
    pub async fn refresh_conversations(&self) -> Result<(), SyncError> {
        let unread_only = self.session.unread_only();
        let conversations = self.transport.conversations(unread_only).await?;
        tracing::debug!(count = conversations.len(), "conversation list refreshed");
        self.conversations.replace_all(conversations);
        Ok(())
    }

    /// Toggle the unread-only list filter and refresh the table.
    pub async fn set_unread_filter(&self, enabled: bool) -> Result<(), SyncError> {
        self.session.set_unread_only(enabled);
        self.refresh_conversations().await
    }

    /// Handle a long-poll notification for `peer`.
    ///
    /// The conversation list is refreshed unconditionally: the notification
    /// implies at least one preview or unread count changed, possibly for a
    /// conversation that is not loaded yet. Only when the event concerns the
    /// selected conversation is the timeline reloaded; otherwise the
    /// attention signal is raised.
    pub async fn on_notification(&self, peer: &PeerId) {
        if let Err(err) = self.refresh_conversations().await {
            self.note_failure(&err);
            tracing::warn!("conversation refresh after notification failed: {err}");
        }

        let selected = self.session.selected().await;
        if selected.as_ref() == Some(peer) {
            match self.transport.messages(peer).await {
                Ok(messages) => {
                    // the operator may have moved on while the fetch was in
                    // flight; apply only against the current selection
                    if self.session.selected().await.as_ref() == Some(peer) {
                        self.timeline.replace(peer.clone(), messages).await;
                    }
                }
                Err(err) => {
                    self.note_failure(&err);
                    tracing::warn!("timeline refresh for {peer} failed: {err}");
                }
            }
        } else {
            self.raise_attention();
        }
    }

    /// Select a conversation: load its timeline, then clear its unread state.
    ///
    /// A failed mark-as-read leaves every counter untouched and surfaces the
    /// error, but the timeline is already loaded and stays visible.
    pub async fn select_conversation(&self, peer: PeerId) -> Result<(), SyncError> {
        self.session.set_selected(peer.clone()).await;

        let messages = match self.transport.messages(&peer).await {
            Ok(messages) => messages,
            Err(err) => {
                self.note_failure(&err);
                return Err(err);
            }
        };
        if self.session.selected().await.as_ref() == Some(&peer) {
            self.timeline.replace(peer.clone(), messages).await;
        }

        let previously_unread = self.conversations.get(&peer).map_or(0, |c| c.unread_count);
        if previously_unread > 0 {
            if let Err(err) = self.transport.mark_as_read(&peer).await {
                self.note_failure(&err);
                return Err(err);
            }
            self.conversations
                .patch(&peer, ConversationPatch::new().unread(0));
            self.session
                .reduce_unread_messages(u64::from(previously_unread))
                .await;
        }
        Ok(())
    }

    /// Send a message optimistically and reconcile with the server record.
    ///
    /// On success the provisional timeline entry is promoted in place to the
    /// server id. On failure it is rolled back and the typed text travels
    /// back to the caller inside [`SendError`].
    pub async fn send_message(&self, peer: PeerId, text: String) -> Result<MessageId, SendError> {
        if text.trim().is_empty() {
            return Err(SendError {
                peer,
                text,
                source: SyncError::Validation("message text is empty".to_string()),
            });
        }
        if self.session.selected().await.is_none() {
            return Err(SendError {
                peer,
                text,
                source: SyncError::Validation("no conversation selected".to_string()),
            });
        }

        let provisional = ProvisionalId::new();
        let now = Utc::now();
        self.timeline
            .append_provisional(Message::provisional(
                provisional,
                peer.clone(),
                text.clone(),
                now,
            ))
            .await;
        self.conversations
            .patch(&peer, ConversationPatch::new().preview(text.clone()).at(now));

        match self.transport.send_message(&peer, &text).await {
            Ok(receipt) => {
                let confirmed = MessageId::Confirmed(receipt.server_message_id.clone());
                if !self
                    .timeline
                    .resolve_provisional(provisional, receipt.server_message_id)
                    .await
                {
                    tracing::debug!("provisional entry for {peer} was already invalidated");
                }
                Ok(confirmed)
            }
            Err(err) => {
                self.note_failure(&err);
                self.timeline.drop_provisional(provisional).await;
                Err(SendError {
                    peer,
                    text,
                    source: err,
                })
            }
        }
    }

    /// Delete a conversation on the backend and locally.
    ///
    /// Clears the selection and the timeline when the deleted conversation
    /// was the selected one, then refreshes the list best-effort.
    pub async fn delete_conversation(&self, peer: &PeerId) -> Result<(), SyncError> {
        if let Err(err) = self.transport.delete_conversation(peer).await {
            self.note_failure(&err);
            return Err(err);
        }

        self.conversations.remove(peer);
        if self.session.selected().await.as_ref() == Some(peer) {
            self.session.clear_selected().await;
            self.timeline.clear().await;
        }

        // local state is already consistent; the authoritative refresh is
        // allowed to fail quietly
        if let Err(err) = self.refresh_conversations().await {
            self.note_failure(&err);
            tracing::warn!("conversation refresh after delete failed: {err}");
        }
        Ok(())
    }

    fn raise_attention(&self) {
        if let Err(err) = self.attention.raise() {
            tracing::debug!("attention signal failed: {err}");
        }
    }
}
