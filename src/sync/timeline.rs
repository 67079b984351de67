//! Ordered message list for the currently selected conversation.
//!
//! Ordering is append order; a full authoritative load replaces the list and
//! is the only re-ordering that ever happens. Provisional entries live at the
//! tail until the send settles.

use tokio::sync::RwLock;

use super::types::{Message, MessageId, PeerId, ProvisionalId};

#[derive(Default)]
struct TimelineState {
    peer: Option<PeerId>,
    entries: Vec<Message>,
}

/// In-memory timeline of the selected conversation.
#[derive(Default)]
pub struct MessageTimeline {
    state: RwLock<TimelineState>,
}

impl MessageTimeline {
    /// Create an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the timeline with an authoritative history for `peer`.
    ///
    /// Any lingering provisional entries from a previous selection are
    /// discarded along with the rest of the old list.
    pub async fn replace(&self, peer: PeerId, messages: Vec<Message>) {
        let mut state = self.state.write().await;
        state.peer = Some(peer);
        state.entries = messages;
    }

    /// Drop everything, including the peer association.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = TimelineState::default();
    }

    /// Append an optimistic outgoing message.
    pub async fn append_provisional(&self, message: Message) {
        let mut state = self.state.write().await;
        state.entries.push(message);
    }

    /// Promote a provisional entry to its authoritative server id, in place.
    ///
    /// The entry keeps its array position and content; only the id changes.
    /// Returns `false` when no such provisional entry exists (it may have
    /// been invalidated by an authoritative reload).
    pub async fn resolve_provisional(&self, provisional: ProvisionalId, server_id: String) -> bool {
        let mut state = self.state.write().await;
        if let Some(entry) = state
            .entries
            .iter_mut()
            .find(|m| m.id == MessageId::Provisional(provisional))
        {
            entry.id = MessageId::Confirmed(server_id);
            true
        } else {
            false
        }
    }

    /// Remove a provisional entry after a failed send.
    ///
    /// Returns `false` when no such entry exists.
    pub async fn drop_provisional(&self, provisional: ProvisionalId) -> bool {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state
            .entries
            .retain(|m| m.id != MessageId::Provisional(provisional));
        state.entries.len() != before
    }

    /// Peer the timeline currently belongs to, if any.
    pub async fn peer(&self) -> Option<PeerId> {
        self.state.read().await.peer.clone()
    }

    /// Snapshot of the current entries in display order.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.state.read().await.entries.clone()
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::super::types::Direction;
    use super::*;

    fn incoming(peer: &str, id: &str, text: &str) -> Message {
        Message {
            id: MessageId::Confirmed(id.to_string()),
            conversation_id: PeerId::from(peer),
            direction: Direction::Incoming,
            text: text.to_string(),
            sent_at: Utc::now(),
            read_by_peer: false,
        }
    }

    #[tokio::test]
    async fn test_resolve_replaces_id_in_place() {
        let timeline = MessageTimeline::new();
        let peer = PeerId::from("p-2");
        timeline
            .replace(peer.clone(), vec![incoming("p-2", "m-1", "hi")])
            .await;

        let provisional = ProvisionalId::new();
        timeline
            .append_provisional(Message::provisional(
                provisional,
                peer,
                "hello".to_string(),
                Utc::now(),
            ))
            .await;

        assert!(timeline.resolve_provisional(provisional, "m-42".to_string()).await);

        let entries = timeline.snapshot().await;
        assert_eq!(entries.len(), 2);
        // same slot, confirmed id, untouched content
        assert_eq!(
            entries.get(1).map(|m| m.id.clone()),
            Some(MessageId::Confirmed("m-42".to_string()))
        );
        assert_eq!(
            entries.get(1).map(|m| m.text.clone()),
            Some("hello".to_string())
        );
    }

    #[tokio::test]
    async fn test_resolve_never_duplicates() {
        let timeline = MessageTimeline::new();
        let provisional = ProvisionalId::new();
        timeline
            .append_provisional(Message::provisional(
                provisional,
                PeerId::from("p-2"),
                "one".to_string(),
                Utc::now(),
            ))
            .await;

        assert!(timeline.resolve_provisional(provisional, "m-1".to_string()).await);
        // a second resolution finds nothing provisional left
        assert!(!timeline.resolve_provisional(provisional, "m-1".to_string()).await);
        assert_eq!(timeline.len().await, 1);
    }

    #[tokio::test]
    async fn test_drop_provisional_rolls_back() {
        let timeline = MessageTimeline::new();
        let provisional = ProvisionalId::new();
        timeline
            .append_provisional(Message::provisional(
                provisional,
                PeerId::from("p-2"),
                "oops".to_string(),
                Utc::now(),
            ))
            .await;

        assert!(timeline.drop_provisional(provisional).await);
        assert_eq!(timeline.len().await, 0);
        assert!(!timeline.drop_provisional(provisional).await);
    }

    #[tokio::test]
    async fn test_replace_discards_stale_provisionals() {
        let timeline = MessageTimeline::new();
        let provisional = ProvisionalId::new();
        timeline
            .append_provisional(Message::provisional(
                provisional,
                PeerId::from("p-1"),
                "stale".to_string(),
                Utc::now(),
            ))
            .await;

        timeline
            .replace(PeerId::from("p-9"), vec![incoming("p-9", "m-5", "fresh")])
            .await;

        assert_eq!(timeline.peer().await, Some(PeerId::from("p-9")));
        let entries = timeline.snapshot().await;
        assert_eq!(entries.len(), 1);
        assert!(!entries.iter().any(|m| m.id.is_provisional()));
    }
}
