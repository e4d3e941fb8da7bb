// Change Feed - publish/subscribe channel for committed mutations
// Realtime clients subscribe once and re-fetch what changed instead of polling.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::core::{current_time_millis, PageId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Page,
    Item,
    View,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub seq: u64,
    pub kind: ChangeKind,
    pub entity: EntityKind,
    pub id: String,
    #[serde(skip)]
    pub owner_id: UserId,
    /// Database page the record belongs to (items and views)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<PageId>,
    pub at: i64,
}

pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
    seq: AtomicU64,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            seq: AtomicU64::new(0),
        }
    }

    pub fn publish(
        &self,
        kind: ChangeKind,
        entity: EntityKind,
        id: impl ToString,
        owner_id: UserId,
        page_id: Option<PageId>,
    ) {
        let event = ChangeEvent {
            seq: self.seq.fetch_add(1, Ordering::Relaxed) + 1,
            kind,
            entity,
            id: id.to_string(),
            owner_id,
            page_id,
            at: current_time_millis(),
        };
        // Sending only fails when nobody is subscribed
        if self.sender.send(event).is_err() {
            debug!("Change published with no subscribers");
        }
    }

    /// Events for one owner only
    pub fn subscribe(&self, owner_id: UserId) -> OwnerSubscription {
        OwnerSubscription {
            receiver: self.sender.subscribe(),
            owner_id,
        }
    }
}

pub struct OwnerSubscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    owner_id: UserId,
}

impl OwnerSubscription {
    /// Next event for this owner; `None` once the feed is gone
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.owner_id == self.owner_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Change subscriber for user {} lagged by {} events", self.owner_id, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
