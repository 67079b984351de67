//! Long-poll driven notification loop.
//!
//! One suspension point per cycle: the wait call itself, or the fixed
//! backoff after a failure. The quiet server timeout is the expected common
//! case, not an error, so there is no exponential growth — the server-side
//! wait already rate-limits request volume.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::SyncService;
use super::types::{PeerId, PollEvent};

/// Outcome of one poll cycle.
#[derive(Debug)]
enum PollStep {
    /// Server wait elapsed with nothing new.
    Quiet,
    /// A new message arrived in the given conversation.
    Notified(PeerId),
    /// A new message arrived but the server did not name the conversation;
    /// only the list refresh applies.
    Touched,
    /// The wait call failed; back off before the next cycle.
    Failed,
}

/// Cancellable, indefinitely repeating long-poll task.
pub struct NotificationPoller {
    service: Arc<SyncService>,
}

impl NotificationPoller {
    /// Attach a poller to the coordinator.
    #[must_use]
    pub fn new(service: Arc<SyncService>) -> Self {
        Self { service }
    }

    /// Run until polling is disabled.
    ///
    /// The flag is checked at every loop boundary; an in-flight wait is
    /// allowed to complete and its result is discarded once the flag flips.
    pub async fn run(self) {
        info!("notification poller started");
        loop {
            if !self.service.session().polling_enabled() {
                break;
            }
            let step = self.wait_once().await;
            if !self.service.session().polling_enabled() {
                break;
            }
            match step {
                PollStep::Quiet => {}
                PollStep::Notified(peer) => self.service.on_notification(&peer).await,
                PollStep::Touched => {
                    if let Err(err) = self.service.refresh_conversations().await {
                        self.service.note_failure(&err);
                        warn!("conversation refresh failed: {err}");
                    }
                }
                PollStep::Failed => {
                    tokio::time::sleep(self.service.config().poll_backoff).await;
                }
            }
        }
        info!("notification poller stopped");
    }

    /// Issue one long-poll wait and classify its outcome.
    async fn wait_once(&self) -> PollStep {
        match self.service.wait_for_messages().await {
            Ok(PollEvent {
                new_message: false, ..
            }) => PollStep::Quiet,
            Ok(PollEvent {
                new_message: true,
                peer_id: Some(peer),
            }) => PollStep::Notified(peer),
            Ok(PollEvent {
                new_message: true,
                peer_id: None,
            }) => {
                debug!("new-message event without a peer id");
                PollStep::Touched
            }
            Err(err) => {
                self.service.note_failure(&err);
                warn!("long poll failed: {err}");
                PollStep::Failed
            }
        }
    }
}
