use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use autodial_core::{CallCompletion, CallRecord, CallStatus};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use utoipa::ToSchema;

use crate::error::{DialerError, Result};

const RECORD_CHANNEL_CAPACITY: usize = 256;

/// Per-status counts over the whole call history.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallStats {
    pub total: usize,
    /// Records that reached a terminal status
    pub completed: usize,
    pub in_progress: usize,
    pub answered: usize,
    pub not_answered: usize,
    pub not_active: usize,
    pub voicemail: usize,
    pub error: usize,
}

impl CallStats {
    fn count(&mut self, record: &CallRecord) {
        self.total += 1;
        if record.is_terminal() {
            self.completed += 1;
        }
        match record.status {
            CallStatus::InProgress => self.in_progress += 1,
            CallStatus::Answered => self.answered += 1,
            CallStatus::NotAnswered => self.not_answered += 1,
            CallStatus::NotActive => self.not_active += 1,
            CallStatus::Voicemail => self.voicemail += 1,
            CallStatus::Error => self.error += 1,
        }
    }
}

/// Append-only call history for the lifetime of the process.
///
/// Records keep insertion order. The only mutation after insert is the
/// single in-progress to terminal replace done by [`finalize`](Self::finalize);
/// readers always get clones and never observe a half-written record.
#[derive(Debug, Clone)]
pub struct CallRecordStore {
    records: Arc<RwLock<Vec<CallRecord>>>,
    updates: broadcast::Sender<CallRecord>,
}

impl Default for CallRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CallRecordStore {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(RECORD_CHANNEL_CAPACITY);
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            updates,
        }
    }

    /// Receive every appended record and every finalized replacement.
    pub fn subscribe(&self) -> broadcast::Receiver<CallRecord> {
        self.updates.subscribe()
    }

    fn notify(&self, record: CallRecord) {
        // No receivers is fine.
        let _ = self.updates.send(record);
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CallRecord>> {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CallRecord>> {
        self.records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn append(&self, record: CallRecord) {
        debug!(call_id = %record.id, case_id = %record.case_id, "Call record appended");
        self.write().push(record.clone());
        self.notify(record);
    }

    pub fn read_all(&self) -> Vec<CallRecord> {
        self.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<CallRecord> {
        self.read().iter().rev().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Replace the in-progress record `id` with its terminal form.
    pub fn finalize(&self, id: &str, completion: CallCompletion) -> Result<CallRecord> {
        let mut records = self.write();

        // The record being finalized is almost always the newest one.
        let index = records
            .iter()
            .rposition(|r| r.id == id)
            .ok_or_else(|| DialerError::RecordNotFound(id.to_string()))?;

        let finished = records[index]
            .finish(completion)
            .ok_or_else(|| DialerError::RecordAlreadyFinal(id.to_string()))?;

        records[index] = finished.clone();
        drop(records);
        self.notify(finished.clone());
        debug!(
            call_id = %id,
            status = %finished.status,
            duration = finished.duration,
            "Call record finalized"
        );
        Ok(finished)
    }

    /// Records in insertion order, optionally restricted to one status and
    /// capped to the newest `limit` entries.
    pub fn filter(&self, status: Option<CallStatus>, limit: Option<usize>) -> Vec<CallRecord> {
        let records = self.read();
        let matching: Vec<&CallRecord> = records
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect();

        let skip = limit.map_or(0, |limit| matching.len().saturating_sub(limit));
        matching.into_iter().skip(skip).cloned().collect()
    }

    /// The newest `n` terminal records, newest first.
    pub fn recent_completed(&self, n: usize) -> Vec<CallRecord> {
        self.read()
            .iter()
            .rev()
            .filter(|r| r.is_terminal())
            .take(n)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> CallStats {
        let mut stats = CallStats::default();
        for record in self.read().iter() {
            stats.count(record);
        }
        stats
    }
}
