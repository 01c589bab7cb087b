//! Bounded, newest-first ledger of submission batches.
//!
//! Lives in the application state behind a `RwLock`; nothing is persisted, so
//! a restart starts from an empty ledger.
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub realism_lora: f64,
    pub detail_lora: f64,
    pub workflow_type: WorkflowType,
    /// Seed the caller asked for; `None` means every repetition drew its own.
    pub seed: Option<u64>,
    pub executions: u32,
    pub filename_prefix: String,
    pub batch_id: String,
}

#[derive(Debug)]
pub struct HistoryLedger {
    records: VecDeque<HistoryRecord>,
    capacity: usize,
}

impl HistoryLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        HistoryLedger { records: VecDeque::with_capacity(capacity.min(64)), capacity }
    }

    /// Insert at the front; the oldest record is dropped once full.
    pub fn append(&mut self, record: HistoryRecord) {
        self.records.push_front(record);
        while self.records.len() > self.capacity {
            if let Some(evicted) = self.records.pop_back() {
                tracing::debug!(batch_id = %evicted.batch_id, "History full, evicting oldest batch");
            }
        }
    }

    /// Newest first, at most `limit` entries when given.
    pub fn list(&self, limit: Option<usize>) -> Vec<HistoryRecord> {
        let take = limit.unwrap_or(self.records.len());
        self.records.iter().take(take).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
