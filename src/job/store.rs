//! Job record storage injected into the runner.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use super::{JobId, JobRecord, JobStatus};
use crate::error::{SpriteError, SpriteResult};

pub trait JobStore: Send + Sync {
    fn get(&self, id: &JobId) -> Option<JobRecord>;

    /// Insert or replace a record.
    fn put(&self, record: JobRecord);

    /// Apply `f` to a stored record, bump `updated_at`, and return the new state.
    fn update(&self, id: &JobId, f: &mut dyn FnMut(&mut JobRecord)) -> SpriteResult<JobRecord>;

    /// Move a record from `expected` to `next` in one step. Any other current status is a
    /// state error and leaves the record untouched.
    fn swap_status(
        &self,
        id: &JobId,
        expected: &JobStatus,
        next: JobStatus,
    ) -> SpriteResult<JobRecord>;
}

/// Process-local store. Records are lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    records: RwLock<HashMap<JobId, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobStore for InMemoryJobStore {
    fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    fn put(&self, record: JobRecord) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record.id.clone(), record);
    }

    fn update(&self, id: &JobId, f: &mut dyn FnMut(&mut JobRecord)) -> SpriteResult<JobRecord> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let record = records
            .get_mut(id)
            .ok_or_else(|| SpriteError::validation("job_id", "known job", id.as_str()))?;
        f(record);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn swap_status(
        &self,
        id: &JobId,
        expected: &JobStatus,
        next: JobStatus,
    ) -> SpriteResult<JobRecord> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let record = records
            .get_mut(id)
            .ok_or_else(|| SpriteError::validation("job_id", "known job", id.as_str()))?;
        if record.status != *expected {
            return Err(SpriteError::state(
                record.status.to_string(),
                format!("enter {}", next),
                format!("job is not {}", expected),
            ));
        }
        record.status = next;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}
