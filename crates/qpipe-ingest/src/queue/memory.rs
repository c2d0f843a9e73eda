//! In-process queue
//!
//! Mirrors the parts of SQS behavior the pipeline relies on: a polled message
//! becomes invisible until it is deleted, and an undeleted message stays
//! invisible for the rest of the run. [`InMemoryQueue::release_in_flight`]
//! plays the role of an expired visibility timeout and makes such messages
//! visible again.

use super::{Queue, QueuedMessage};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Stored {
    id: String,
    body: String,
}

#[derive(Default)]
struct State {
    visible: VecDeque<Stored>,
    /// Delivered but not yet deleted, keyed by receipt handle
    in_flight: HashMap<String, Stored>,
    deleted: u64,
}

pub struct InMemoryQueue {
    name: String,
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl InMemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IngestError::queue(format!("queue '{}' is offline", self.name)));
        }
        self.state
            .lock()
            .map_err(|_| IngestError::queue("queue state lock poisoned"))
    }

    /// Make every call fail with `QueueUnavailable` until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Visible messages
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.visible.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages delivered but never deleted
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().map(|s| s.in_flight.len()).unwrap_or(0)
    }

    pub fn deleted_count(&self) -> u64 {
        self.state.lock().map(|s| s.deleted).unwrap_or(0)
    }

    /// Bodies of all visible messages, front first
    pub fn visible_bodies(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.visible.iter().map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }

    /// Bodies of all delivered-but-undeleted messages
    pub fn in_flight_bodies(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.in_flight.values().map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }

    /// Return undeleted deliveries to the visible set, as if their
    /// visibility timeout expired. Returns how many were released.
    pub fn release_in_flight(&self) -> usize {
        let Ok(mut state) = self.state.lock() else {
            return 0;
        };
        let released: Vec<Stored> = state.in_flight.drain().map(|(_, m)| m).collect();
        let count = released.len();
        state.visible.extend(released);
        count
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, body: String) -> Result<()> {
        let mut state = self.lock()?;
        state.visible.push_back(Stored {
            id: Uuid::new_v4().to_string(),
            body,
        });
        Ok(())
    }

    async fn poll_next(&self) -> Result<Option<QueuedMessage>> {
        let mut state = self.lock()?;
        let Some(stored) = state.visible.pop_front() else {
            return Ok(None);
        };

        let receipt = Uuid::new_v4().to_string();
        let message = QueuedMessage {
            id: stored.id.clone(),
            body: stored.body.clone(),
            receipt: receipt.clone(),
        };
        state.in_flight.insert(receipt, stored);

        Ok(Some(message))
    }

    async fn delete(&self, message: &QueuedMessage) -> Result<()> {
        let mut state = self.lock()?;
        if state.in_flight.remove(&message.receipt).is_some() {
            state.deleted += 1;
        } else {
            debug!(message_id = %message.id, "Delete with stale receipt ignored");
        }
        Ok(())
    }

    async fn approximate_len(&self) -> Result<Option<u64>> {
        Ok(Some(self.lock()?.visible.len() as u64))
    }
}
