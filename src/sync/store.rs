//! In-memory conversation table backing the operator's sidebar.
//!
//! Mutated only by the sync coordinator: wholesale replacement on refresh,
//! keyed patches for optimistic updates. A patch or removal addressed to a
//! peer a concurrent refresh already dropped is a no-op, never an error.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::types::{Conversation, PeerId};

/// Partial in-place update for a single conversation.
#[derive(Clone, Debug, Default)]
pub struct ConversationPatch {
    last_message_preview: Option<String>,
    last_message_at: Option<DateTime<Utc>>,
    unread_count: Option<u32>,
}

impl ConversationPatch {
    /// Start an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the last-message preview.
    #[must_use]
    pub fn preview(mut self, text: impl Into<String>) -> Self {
        self.last_message_preview = Some(text.into());
        self
    }

    /// Update the last-message timestamp.
    #[must_use]
    pub const fn at(mut self, when: DateTime<Utc>) -> Self {
        self.last_message_at = Some(when);
        self
    }

    /// Update the unread count.
    #[must_use]
    pub const fn unread(mut self, count: u32) -> Self {
        self.unread_count = Some(count);
        self
    }
}

/// Thread-safe table of conversation summaries keyed by peer.
pub struct ConversationStore {
    entries: DashMap<PeerId, Conversation>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Replace the table wholesale with a fresh authoritative list.
    pub fn replace_all(&self, conversations: Vec<Conversation>) {
        self.entries.clear();
        for conversation in conversations {
            self.entries
                .insert(conversation.peer_id.clone(), conversation);
        }
    }

    /// Apply a partial update in place.
    ///
    /// Unknown peers are ignored: the conversation may have been removed by a
    /// concurrent full refresh, and a patch never resurrects it.
    pub fn patch(&self, peer: &PeerId, patch: ConversationPatch) {
        if let Some(mut entry) = self.entries.get_mut(peer) {
            if let Some(preview) = patch.last_message_preview {
                entry.last_message_preview = preview;
            }
            if let Some(when) = patch.last_message_at {
                entry.last_message_at = when;
            }
            if let Some(count) = patch.unread_count {
                entry.unread_count = count;
            }
        }
    }

    /// Remove one conversation; unknown peers are ignored.
    pub fn remove(&self, peer: &PeerId) {
        self.entries.remove(peer);
    }

    /// Look up one conversation by peer.
    #[must_use]
    pub fn get(&self, peer: &PeerId) -> Option<Conversation> {
        self.entries.get(peer).map(|entry| entry.value().clone())
    }

    /// Snapshot of all conversations, most recent activity first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Conversation> {
        let mut items: Vec<Conversation> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        items
    }

    /// Number of conversations currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
