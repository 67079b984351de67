//! Periodic refresh of the aggregate unread counters.
//!
//! The two totals back the navigation badges and are fetched independently:
//! a failure on one side never blocks the other, and never cancels the
//! timer. The task stops the instant polling is disabled, without waiting
//! out the interval.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::SyncService;
use super::types::UnreadResource;

/// Fixed-interval unread-counter refresh task.
pub struct UnreadAggregator {
    service: Arc<SyncService>,
}

impl UnreadAggregator {
    /// Attach an aggregator to the coordinator.
    #[must_use]
    pub fn new(service: Arc<SyncService>) -> Self {
        Self { service }
    }

    /// Run until polling is disabled.
    ///
    /// Refreshes once immediately on activation, then on each interval tick.
    pub async fn run(self) {
        info!("unread aggregator started");
        let mut polling = self.service.session().subscribe_polling();
        let mut ticks = tokio::time::interval(self.service.config().unread_refresh_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if !self.service.session().polling_enabled() {
                break;
            }
            tokio::select! {
                _ = ticks.tick() => self.refresh_once().await,
                changed = polling.changed() => {
                    if changed.is_err() || !self.service.session().polling_enabled() {
                        break;
                    }
                }
            }
        }
        info!("unread aggregator stopped");
    }

    /// Fetch both totals independently and store whichever arrive.
    async fn refresh_once(&self) {
        let (messages, requests) = tokio::join!(
            self.service.transport().unread_count(UnreadResource::Messages),
            self.service.transport().unread_count(UnreadResource::Requests),
        );

        match messages {
            Ok(count) => self.service.session().set_unread_messages(count).await,
            Err(err) => {
                self.service.note_failure(&err);
                warn!("unread messages refresh failed: {err}");
            }
        }
        match requests {
            Ok(count) => self.service.session().set_unread_requests(count).await,
            Err(err) => {
                self.service.note_failure(&err);
                warn!("unread requests refresh failed: {err}");
            }
        }
    }
}
