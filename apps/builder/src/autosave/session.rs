use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::autosave::coordinator::{
    AutosaveConfig, AutosaveCoordinator, SaveOutcome, SyncEvent, SyncPhase, Synchronizer,
};
use crate::config::EditorConfig;
use crate::gateway::{GatewayResult, HttpGateway, ResumeGateway};
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::store::{lock, ResumeStore, SharedStore};

/// One resume open for editing: the store, its autosave loop and the manual save path.
///
/// The UI layer edits through [`EditorSession::edit`] (or the shared store handle) and
/// renders from [`EditorSession::read`]. Dropping the session stops autosave; call
/// [`EditorSession::close`] to also reset the store.
pub struct EditorSession {
    store: SharedStore,
    sync: Arc<Synchronizer>,
    autosave: AutosaveCoordinator,
}

impl EditorSession {
    /// Fetches `resume_id`, loads it into a fresh store and starts autosave.
    pub async fn open(
        gateway: Arc<dyn ResumeGateway>,
        resume_id: &str,
        ids: Arc<dyn IdGenerator>,
        config: AutosaveConfig,
    ) -> GatewayResult<Self> {
        let record = gateway.fetch_resume(resume_id).await?;

        let store = ResumeStore::new(ids).into_shared();
        lock(&store).load(record);

        let sync = Synchronizer::new(store.clone(), gateway, resume_id);
        let autosave = AutosaveCoordinator::spawn(sync.clone(), config);
        info!(
            "Opened resume {resume_id} for editing (autosave after {}ms)",
            config.delay.as_millis()
        );

        Ok(Self {
            store,
            sync,
            autosave,
        })
    }

    /// Opens a session against the HTTP persistence service named in `config`.
    pub async fn connect(config: &EditorConfig, resume_id: &str) -> GatewayResult<Self> {
        let gateway = Arc::new(HttpGateway::new(config.gateway_url.clone()));
        Self::open(gateway, resume_id, Arc::new(UuidIdGenerator), config.autosave).await
    }

    pub fn resume_id(&self) -> &str {
        self.sync.resume_id()
    }

    /// Shared handle for components that hold on to the store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn edit<R>(&self, f: impl FnOnce(&mut ResumeStore) -> R) -> R {
        f(&mut lock(&self.store))
    }

    pub fn read<R>(&self, f: impl FnOnce(&ResumeStore) -> R) -> R {
        f(&lock(&self.store))
    }

    pub async fn save_now(&self) -> SaveOutcome {
        self.sync.save_now().await
    }

    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.sync.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        self.autosave.phase()
    }

    /// Leaves the editing context: stops autosave, then resets the store. Unsaved
    /// edits are discarded.
    pub async fn close(mut self) {
        self.autosave.shutdown().await;
        let discarded = {
            let mut store = lock(&self.store);
            let dirty = store.is_dirty();
            store.reset();
            dirty
        };
        if discarded {
            info!("Closed resume {} with unsaved edits", self.resume_id());
        } else {
            info!("Closed resume {}", self.resume_id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    use crate::gateway::{GatewayError, InMemoryGateway};
    use crate::ids::SequentialIdGenerator;
    use crate::models::resume::fixtures::server_record;
    use crate::models::WorkExperiencePatch;
    use crate::store::SaveStatus;

    async fn open_session(gateway: Arc<InMemoryGateway>) -> EditorSession {
        EditorSession::open(
            gateway,
            "resume-1",
            Arc::new(SequentialIdGenerator::default()),
            AutosaveConfig::default(),
        )
        .await
        .unwrap()
    }

    fn seeded() -> Arc<InMemoryGateway> {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.insert(server_record());
        gateway
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_loads_record_clean() {
        let session = open_session(seeded()).await;
        session.read(|store| {
            assert_eq!(store.document().id.as_deref(), Some("resume-1"));
            assert_eq!(store.document().personal_info.full_name, "Jane Smith");
            assert!(!store.is_dirty());
            assert_eq!(store.save_status(), SaveStatus::Idle);
        });
        assert_eq!(session.resume_id(), "resume-1");
        assert_eq!(session.phase(), SyncPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_missing_resume() {
        let result = EditorSession::open(
            seeded(),
            "missing",
            Arc::new(SequentialIdGenerator::default()),
            AutosaveConfig::default(),
        )
        .await;
        assert_eq!(
            result.err(),
            Some(GatewayError::NotFound("missing".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_are_autosaved() {
        let gateway = seeded();
        let session = open_session(gateway.clone()).await;

        let id = session.edit(|store| {
            let id = store.add_work_experience();
            store.update_work_experience(
                &id,
                WorkExperiencePatch {
                    company: Some("NewCo".to_string()),
                    ..Default::default()
                },
            );
            id
        });
        assert_eq!(id, "test-id-1");
        assert_eq!(session.read(|s| s.save_status()), SaveStatus::Unsaved);

        sleep(Duration::from_secs(3)).await;

        assert_eq!(gateway.write_count(), 1);
        let written = gateway.last_written().unwrap();
        assert_eq!(written.work_experiences.len(), 2);
        assert_eq!(written.work_experiences[1].company, "NewCo");
        assert!(matches!(
            session.read(|s| s.save_status()),
            SaveStatus::Saved { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_now_through_session() {
        let gateway = seeded();
        let session = open_session(gateway.clone()).await;
        let mut events = session.events();

        session.edit(|store| store.update_summary("Shipped things."));
        let outcome = session.save_now().await;

        assert!(matches!(outcome, SaveOutcome::Saved { clean: true, .. }));
        assert_eq!(
            gateway.fetch_resume("resume-1").await.unwrap().summary.as_deref(),
            Some("Shipped things.")
        );
        assert!(matches!(events.try_recv().unwrap(), SyncEvent::Saved { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_resets_and_stops_syncing() {
        let gateway = seeded();
        let session = open_session(gateway.clone()).await;
        let store = session.store().clone();

        session.edit(|s| s.update_title("Unsaved title"));
        session.close().await;

        {
            let s = lock(&store);
            assert_eq!(s.document().title, "My Resume");
            assert!(s.document().id.is_none());
            assert!(!s.is_dirty());
        }

        lock(&store).update_title("After close");
        sleep(Duration::from_secs(5)).await;
        assert_eq!(gateway.write_count(), 0);
    }
}
