//! In-memory implementation of the [`JobStore`] port.
//!
//! Used by the test suites and for local development without a
//! database. Gives the same two guarantees as the PostgreSQL backend:
//! the conditional summary refresh and the at-most-once finalization
//! lock, both under a single mutex.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use plinth_core::types::DbId;

use crate::models::{JobInstance, JobStatus, NewJobInstance};

use super::{JobStore, StoreError};

#[derive(Default)]
struct Inner {
    next_id: DbId,
    jobs: HashMap<DbId, JobInstance>,
    locks: HashSet<DbId>,
    output_files: HashMap<DbId, Vec<String>>,
}

/// [`JobStore`] backed by process memory.
#[derive(Default)]
pub struct MemJobStore {
    inner: Mutex<Inner>,
}

impl MemJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_job<T>(
        &self,
        id: DbId,
        f: impl FnOnce(&mut JobInstance) -> T,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.jobs.get_mut(&id) {
            Some(job) => Ok(f(job)),
            None => Err(StoreError::NotFound(id)),
        }
    }
}

#[async_trait]
impl JobStore for MemJobStore {
    async fn create(&self, new: NewJobInstance) -> Result<JobInstance, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.next_id += 1;
        let now = chrono::Utc::now();
        let job = JobInstance {
            id: inner.next_id,
            status_id: JobStatus::Scheduled.id(),
            previous_id: new.previous_id,
            owner: new.owner,
            compute_url: new.compute_url,
            parameters: serde_json::to_value(&new.parameters).unwrap_or_default(),
            number_of_workers: new.number_of_workers,
            cpu_limit: new.cpu_limit,
            memory_limit: new.memory_limit,
            gpu_limit: new.gpu_limit,
            image: new.image,
            selfexec: new.selfexec,
            selfpath: new.selfpath,
            execshell: new.execshell,
            plugin_type: new.plugin_type,
            summary: None,
            raw: None,
            end_date: None,
            created_at: now,
            updated_at: now,
        };
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find(&self, id: DbId) -> Result<Option<JobInstance>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.jobs.get(&id).cloned())
    }

    async fn list_started(&self) -> Result<Vec<DbId>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<DbId> = inner
            .jobs
            .values()
            .filter(|job| job.status_id == JobStatus::Started.id())
            .map(|job| job.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn mark_started(&self, id: DbId, summary: &str, raw: &str) -> Result<(), StoreError> {
        self.with_job(id, |job| {
            job.status_id = JobStatus::Started.id();
            job.summary = Some(summary.to_string());
            job.raw = Some(raw.to_string());
            job.updated_at = chrono::Utc::now();
        })
    }

    async fn update_summary_if_started(
        &self,
        id: DbId,
        summary: &str,
        raw: &str,
    ) -> Result<bool, StoreError> {
        self.with_job(id, |job| {
            if job.status_id != JobStatus::Started.id() {
                return false;
            }
            job.summary = Some(summary.to_string());
            job.raw = Some(raw.to_string());
            job.updated_at = chrono::Utc::now();
            true
        })
    }

    async fn mark_registering(&self, id: DbId, summary: &str) -> Result<(), StoreError> {
        self.with_job(id, |job| {
            job.status_id = JobStatus::RegisteringFiles.id();
            job.summary = Some(summary.to_string());
            job.updated_at = chrono::Utc::now();
        })
    }

    async fn finish(&self, id: DbId, status: JobStatus) -> Result<(), StoreError> {
        self.with_job(id, |job| {
            job.status_id = status.id();
            job.end_date = Some(chrono::Utc::now());
            job.updated_at = chrono::Utc::now();
        })
    }

    async fn acquire_finalization_lock(&self, id: DbId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !inner.jobs.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Ok(inner.locks.insert(id))
    }

    async fn register_output_file(&self, id: DbId, path: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !inner.jobs.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        let files = inner.output_files.entry(id).or_default();
        if files.iter().any(|existing| existing == path) {
            return Ok(false);
        }
        files.push(path.to_string());
        Ok(true)
    }

    async fn output_files(&self, id: DbId) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.output_files.get(&id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job() -> NewJobInstance {
        NewJobInstance {
            owner: "alice".to_string(),
            compute_url: "http://compute.local".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn finalization_lock_is_acquired_at_most_once() {
        let store = MemJobStore::new();
        let job = store.create(new_job()).await.unwrap();
        assert!(store.acquire_finalization_lock(job.id).await.unwrap());
        assert!(!store.acquire_finalization_lock(job.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_output_registration_is_ignored() {
        let store = MemJobStore::new();
        let job = store.create(new_job()).await.unwrap();
        assert!(store.register_output_file(job.id, "a/b.txt").await.unwrap());
        assert!(!store.register_output_file(job.id, "a/b.txt").await.unwrap());
        assert_eq!(store.output_files(job.id).await.unwrap(), vec!["a/b.txt"]);
    }

    #[tokio::test]
    async fn summary_refresh_applies_only_while_started() {
        let store = MemJobStore::new();
        let job = store.create(new_job()).await.unwrap();
        assert!(!store
            .update_summary_if_started(job.id, "{}", "raw")
            .await
            .unwrap());

        store.mark_started(job.id, "{}", "raw").await.unwrap();
        assert!(store
            .update_summary_if_started(job.id, "{\"v\":1}", "raw2")
            .await
            .unwrap());

        store
            .finish(job.id, JobStatus::FinishedWithError)
            .await
            .unwrap();
        assert!(!store
            .update_summary_if_started(job.id, "{\"v\":2}", "raw3")
            .await
            .unwrap());
        let job = store.find(job.id).await.unwrap().unwrap();
        assert_eq!(job.summary.as_deref(), Some("{\"v\":1}"));
        assert!(job.end_date.is_some());
    }
}
