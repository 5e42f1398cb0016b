use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::gateway::{
    canonicalize, GatewayError, GatewayResult, NewResume, ResumeGateway, UNTITLED_RESUME,
};
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::models::{ResumeDocument, ResumeRecord};

/// Process-local gateway. Used when no database is configured, and as the fake in
/// autosave tests: it counts write calls, remembers the last payload, and can be told
/// to delay or fail writes.
pub struct InMemoryGateway {
    records: Mutex<HashMap<String, ResumeRecord>>,
    ids: Arc<dyn IdGenerator>,
    write_latency: Option<Duration>,
    failures_remaining: AtomicUsize,
    writes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    last_written: Mutex<Option<ResumeDocument>>,
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            ids: Arc::new(UuidIdGenerator),
            write_latency: None,
            failures_remaining: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            last_written: Mutex::new(None),
        }
    }

    /// Every replace-write sleeps for `latency` before completing.
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = Some(latency);
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Seeds a record, replacing any with the same id.
    pub fn insert(&self, record: ResumeRecord) {
        self.records().insert(record.id.clone(), record);
    }

    /// The next `n` replace-writes fail with a transport error.
    pub fn fail_next_writes(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Number of replace-write calls received, successful or not.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Highest number of replace-writes observed running at the same time.
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_written(&self) -> Option<ResumeDocument> {
        self.last_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, ResumeRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(&self) -> bool {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn store_replacement(&self, id: &str, document: &ResumeDocument) -> GatewayResult<ResumeRecord> {
        let mut records = self.records();
        let existing = records
            .get(id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        let mut record = canonicalize(id, document);
        record.created_at = existing.created_at;
        record.updated_at = Some(Utc::now());
        records.insert(id.to_string(), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl ResumeGateway for InMemoryGateway {
    async fn list_resumes(&self) -> GatewayResult<Vec<ResumeRecord>> {
        let mut all: Vec<ResumeRecord> = self.records().values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }

    async fn create_resume(&self, new: NewResume) -> GatewayResult<ResumeRecord> {
        let now = Utc::now();
        let record = ResumeRecord {
            id: self.ids.generate(),
            title: new.title.unwrap_or_else(|| UNTITLED_RESUME.to_string()),
            template: new.template.unwrap_or_default(),
            summary: None,
            personal_info: None,
            work_experiences: Vec::new(),
            educations: Vec::new(),
            skills: Vec::new(),
            projects: Vec::new(),
            certifications: Vec::new(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.insert(record.clone());
        debug!("Created resume {} in memory", record.id);
        Ok(record)
    }

    async fn fetch_resume(&self, id: &str) -> GatewayResult<ResumeRecord> {
        self.records()
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn replace_resume(
        &self,
        id: &str,
        document: &ResumeDocument,
    ) -> GatewayResult<ResumeRecord> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(latency) = self.write_latency {
            tokio::time::sleep(latency).await;
        }

        let result = if self.take_failure() {
            Err(GatewayError::Transport("injected write failure".to_string()))
        } else {
            *self
                .last_written
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(document.clone());
            self.store_replacement(id, document)
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn delete_resume(&self, id: &str) -> GatewayResult<()> {
        self.records()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIdGenerator;
    use crate::models::resume::fixtures::server_record;
    use crate::models::TemplateId;

    fn gateway() -> InMemoryGateway {
        let gw = InMemoryGateway::new();
        gw.insert(server_record());
        gw
    }

    #[tokio::test]
    async fn test_create_uses_defaults() {
        let gw = InMemoryGateway::new().with_ids(Arc::new(SequentialIdGenerator::new("r")));
        let created = gw.create_resume(NewResume::default()).await.unwrap();
        assert_eq!(created.id, "r-1");
        assert_eq!(created.title, "Untitled Resume");
        assert_eq!(created.template, TemplateId::Modern);
        assert!(created.created_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_missing_is_not_found() {
        let err = gateway().fetch_resume("nope").await.unwrap_err();
        assert_eq!(err, GatewayError::NotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn test_replace_overwrites_sections() {
        let gw = gateway();
        let mut doc = server_record().into_document();
        doc.skills.remove(0);
        doc.title = "Renamed".to_string();
        let saved = gw.replace_resume("resume-1", &doc).await.unwrap();
        assert_eq!(saved.title, "Renamed");
        assert_eq!(saved.skills.len(), 1);
        assert!(saved.updated_at.is_some());
        assert_eq!(gw.fetch_resume("resume-1").await.unwrap(), saved);
        assert_eq!(gw.write_count(), 1);
        assert_eq!(gw.last_written(), Some(doc));
    }

    #[tokio::test]
    async fn test_replace_unknown_id_is_not_found() {
        let gw = gateway();
        let err = gw
            .replace_resume("nope", &ResumeDocument::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let gw = gateway();
        gw.fail_next_writes(1);
        let doc = server_record().into_document();
        assert!(gw.replace_resume("resume-1", &doc).await.is_err());
        assert!(gw.replace_resume("resume-1", &doc).await.is_ok());
        assert_eq!(gw.write_count(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let gw = gateway();
        gw.delete_resume("resume-1").await.unwrap();
        assert!(gw.list_resumes().await.unwrap().is_empty());
        assert!(gw.delete_resume("resume-1").await.is_err());
    }
}
