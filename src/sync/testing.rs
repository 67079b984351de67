//! In-memory test doubles shared by the sync unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::client::ChatTransport;
use super::config::SyncConfig;
use super::error::SyncError;
use super::types::{
    Conversation, Direction, Message, MessageId, PeerId, PollEvent, SendReceipt, UnreadResource,
};
use super::{AttentionSignal, SyncService};

/// Build a conversation summary for tests.
pub(crate) fn conversation(peer: &str, unread: u32) -> Conversation {
    Conversation {
        peer_id: PeerId::from(peer),
        display_name: None,
        last_message_preview: "…".to_string(),
        last_message_at: Utc::now(),
        unread_count: unread,
    }
}

fn incoming_message(peer: &PeerId, id: &str) -> Message {
    Message {
        id: MessageId::Confirmed(id.to_string()),
        conversation_id: peer.clone(),
        direction: Direction::Incoming,
        text: format!("message {id}"),
        sent_at: Utc::now(),
        read_by_peer: false,
    }
}

/// Attention sink that counts invocations.
#[derive(Default)]
pub(crate) struct CountingAttention {
    raised: AtomicUsize,
}

impl CountingAttention {
    pub(crate) fn raised(&self) -> usize {
        self.raised.load(Ordering::SeqCst)
    }
}

impl AttentionSignal for CountingAttention {
    fn raise(&self) -> anyhow::Result<()> {
        self.raised.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Attention sink that always fails.
pub(crate) struct FailingAttention;

impl AttentionSignal for FailingAttention {
    fn raise(&self) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("no audio device"))
    }
}

/// Scripted in-memory transport.
pub(crate) struct MockTransport {
    conversations: Mutex<Vec<Conversation>>,
    messages: Mutex<HashMap<PeerId, Vec<Message>>>,
    poll_queue: Mutex<VecDeque<PollEvent>>,
    next_server_id: Mutex<String>,
    unread_messages: Mutex<u64>,
    unread_requests: Mutex<u64>,
    sent: Mutex<Vec<(PeerId, String)>>,
    deleted: Mutex<Vec<PeerId>>,
    auth_fail: AtomicBool,
    send_fail: AtomicBool,
    requests_unread_fail: AtomicBool,
    read_calls: AtomicUsize,
    wait_calls: AtomicUsize,
    unread_calls: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            conversations: Mutex::new(Vec::new()),
            messages: Mutex::new(HashMap::new()),
            poll_queue: Mutex::new(VecDeque::new()),
            next_server_id: Mutex::new("m-1".to_string()),
            unread_messages: Mutex::new(0),
            unread_requests: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            auth_fail: AtomicBool::new(false),
            send_fail: AtomicBool::new(false),
            requests_unread_fail: AtomicBool::new(false),
            read_calls: AtomicUsize::new(0),
            wait_calls: AtomicUsize::new(0),
            unread_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) async fn set_conversations(&self, conversations: Vec<Conversation>) {
        *self.conversations.lock().await = conversations;
    }

    pub(crate) async fn set_messages(&self, peer: PeerId, ids: Vec<&str>) {
        let built = ids.iter().map(|id| incoming_message(&peer, id)).collect();
        self.messages.lock().await.insert(peer, built);
    }

    pub(crate) async fn set_next_server_id(&self, id: &str) {
        *self.next_server_id.lock().await = id.to_string();
    }

    pub(crate) async fn push_poll_event(&self, event: PollEvent) {
        self.poll_queue.lock().await.push_back(event);
    }

    pub(crate) async fn set_unread_counts(&self, messages: u64, requests: u64) {
        *self.unread_messages.lock().await = messages;
        *self.unread_requests.lock().await = requests;
    }

    pub(crate) fn fail_auth(&self, on: bool) {
        self.auth_fail.store(on, Ordering::SeqCst);
    }

    pub(crate) fn fail_sends(&self, on: bool) {
        self.send_fail.store(on, Ordering::SeqCst);
    }

    pub(crate) fn fail_requests_unread(&self, on: bool) {
        self.requests_unread_fail.store(on, Ordering::SeqCst);
    }

    pub(crate) async fn sent(&self) -> Vec<(PeerId, String)> {
        self.sent.lock().await.clone()
    }

    pub(crate) async fn deleted(&self) -> Vec<PeerId> {
        self.deleted.lock().await.clone()
    }

    pub(crate) fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn wait_calls(&self) -> usize {
        self.wait_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn unread_calls(&self) -> usize {
        self.unread_calls.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<(), SyncError> {
        if self.auth_fail.load(Ordering::SeqCst) {
            return Err(SyncError::Auth { status: 401 });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn conversations(&self, unread_only: bool) -> Result<Vec<Conversation>, SyncError> {
        self.gate()?;
        let all = self.conversations.lock().await.clone();
        if unread_only {
            Ok(all.into_iter().filter(|c| c.unread_count > 0).collect())
        } else {
            Ok(all)
        }
    }

    async fn messages(&self, peer: &PeerId) -> Result<Vec<Message>, SyncError> {
        self.gate()?;
        Ok(self
            .messages
            .lock()
            .await
            .get(peer)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(&self, peer: &PeerId, text: &str) -> Result<SendReceipt, SyncError> {
        self.gate()?;
        if self.send_fail.load(Ordering::SeqCst) {
            return Err(SyncError::Server {
                status: 502,
                detail: "send rejected".to_string(),
            });
        }
        self.sent.lock().await.push((peer.clone(), text.to_string()));
        Ok(SendReceipt {
            server_message_id: self.next_server_id.lock().await.clone(),
        })
    }

    async fn mark_as_read(&self, _peer: &PeerId) -> Result<(), SyncError> {
        self.gate()?;
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_conversation(&self, peer: &PeerId) -> Result<(), SyncError> {
        self.gate()?;
        self.deleted.lock().await.push(peer.clone());
        Ok(())
    }

    async fn wait_for_messages(&self, _wait: Duration) -> Result<PollEvent, SyncError> {
        self.wait_calls.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        if let Some(event) = self.poll_queue.lock().await.pop_front() {
            return Ok(event);
        }
        // emulate the server-side wait so quiet cycles do not spin hot
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(PollEvent::quiet())
    }

    async fn unread_count(&self, resource: UnreadResource) -> Result<u64, SyncError> {
        self.unread_calls.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        match resource {
            UnreadResource::Messages => Ok(*self.unread_messages.lock().await),
            UnreadResource::Requests => {
                if self.requests_unread_fail.load(Ordering::SeqCst) {
                    return Err(SyncError::Server {
                        status: 500,
                        detail: "requests counter unavailable".to_string(),
                    });
                }
                Ok(*self.unread_requests.lock().await)
            }
        }
    }
}

/// Build a coordinator over a mock transport with test-sized intervals.
pub(crate) fn service_over(
    transport: Arc<MockTransport>,
) -> (Arc<SyncService>, Arc<CountingAttention>) {
    let attention = Arc::new(CountingAttention::default());
    let config = SyncConfig::new()
        .with_long_poll_wait(Duration::from_millis(40))
        .with_poll_backoff(Duration::from_millis(10))
        .with_unread_refresh_interval(Duration::from_millis(50));
    let service = Arc::new(SyncService::new(
        config,
        transport,
        Arc::clone(&attention) as Arc<dyn AttentionSignal>,
    ));
    (service, attention)
}
