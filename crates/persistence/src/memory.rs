//! In-memory call log
//!
//! Bounded, process-local store for development runs without a cluster.
//! Records are lost on restart.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use receptionist_core::{CallRecord, CallRecordStore};

/// Default number of records retained
const DEFAULT_CAPACITY: usize = 1_000;

pub struct InMemoryCallLogStore {
    records: Mutex<VecDeque<CallRecord>>,
    capacity: usize,
}

impl InMemoryCallLogStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Default for InMemoryCallLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallRecordStore for InMemoryCallLogStore {
    async fn store(&self, record: &CallRecord) -> receptionist_core::Result<()> {
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record.clone());
        tracing::debug!(call_id = %record.call_id, retained = records.len(), "Call log kept in memory");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> receptionist_core::Result<Vec<CallRecord>> {
        Ok(self.records.lock().iter().rev().take(limit).cloned().collect())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
