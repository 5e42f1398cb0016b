//! Background synchronization of the store with the persistence gateway.
//!
//! [`Synchronizer`] owns the write path shared by autosave and manual save: one write
//! gate per session (so at most one replace-write is in flight), the saving flag, and
//! version-checked confirmation. [`AutosaveCoordinator`] drives it from debounced store
//! snapshots.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::autosave::debounce::Debounced;
use crate::gateway::{GatewayError, ResumeGateway};
use crate::store::{lock, SharedStore, Snapshot};

/// Quiet period before an autosave fires.
pub const AUTOSAVE_DELAY_MS: u64 = 1500;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub delay: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(AUTOSAVE_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    Autosave,
    Manual,
}

impl fmt::Display for SaveTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveTrigger::Autosave => f.write_str("autosave"),
            SaveTrigger::Manual => f.write_str("manual save"),
        }
    }
}

/// Notifications for the UI layer. Failures are transient: the edits stay in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Saved {
        trigger: SaveTrigger,
        revision: u64,
        at: DateTime<Utc>,
        /// False when newer edits landed while the write was in flight.
        clean: bool,
    },
    Failed {
        trigger: SaveTrigger,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { at: DateTime<Utc>, clean: bool },
    Failed(GatewayError),
    /// A manual save was already running; nothing was sent.
    AlreadyInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    PendingSync,
}

/// Clears the manual-save flag however the save future ends, including being dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Holds the store's saving flag up for the duration of one write. Clearing happens on
/// drop, so a save future abandoned mid-write does not leave the flag set.
struct Saving<'a>(&'a SharedStore);

impl<'a> Saving<'a> {
    fn start(store: &'a SharedStore) -> Self {
        lock(store).set_is_saving(true);
        Self(store)
    }
}

impl Drop for Saving<'_> {
    fn drop(&mut self) {
        lock(self.0).set_is_saving(false);
    }
}

pub struct Synchronizer {
    store: SharedStore,
    gateway: Arc<dyn ResumeGateway>,
    resume_id: String,
    write_gate: AsyncMutex<()>,
    manual_in_flight: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl Synchronizer {
    pub fn new(
        store: SharedStore,
        gateway: Arc<dyn ResumeGateway>,
        resume_id: impl Into<String>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            store,
            gateway,
            resume_id: resume_id.into(),
            write_gate: AsyncMutex::new(()),
            manual_in_flight: AtomicBool::new(false),
            events,
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn resume_id(&self) -> &str {
        &self.resume_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Writes the newest document right away, skipping the debounce delay.
    ///
    /// A second call while one is running returns `AlreadyInFlight`. If an autosave is
    /// in flight, this waits for it and then writes.
    pub async fn save_now(&self) -> SaveOutcome {
        if self.manual_in_flight.swap(true, Ordering::AcqRel) {
            debug!("Manual save of resume {} already running", self.resume_id);
            return SaveOutcome::AlreadyInFlight;
        }
        let _in_flight = InFlight(&self.manual_in_flight);

        let _gate = self.write_gate.lock().await;
        let snapshot = lock(&self.store).snapshot();
        self.write(snapshot, SaveTrigger::Manual).await
    }

    /// Writes the newest document if the store is still dirty once the gate is free.
    ///
    /// The snapshot is taken under the gate: a write that held the gate meanwhile may
    /// already have sent the settled revision.
    async fn autosave(&self) -> Option<SaveOutcome> {
        let _gate = self.write_gate.lock().await;
        let snapshot = {
            let store = lock(&self.store);
            if !store.is_dirty() {
                return None;
            }
            store.snapshot()
        };
        Some(self.write(snapshot, SaveTrigger::Autosave).await)
    }

    /// Caller holds the write gate.
    async fn write(&self, snapshot: Snapshot, trigger: SaveTrigger) -> SaveOutcome {
        let saving = Saving::start(&self.store);
        let result = self
            .gateway
            .replace_resume(&self.resume_id, &snapshot.document)
            .await;
        drop(saving);

        let outcome = {
            let mut store = lock(&self.store);
            match result {
                Ok(_) => {
                    let at = Utc::now();
                    let clean = store.confirm_saved(&snapshot, at);
                    SaveOutcome::Saved { at, clean }
                }
                Err(e) => SaveOutcome::Failed(e),
            }
        };

        let event = match &outcome {
            SaveOutcome::Saved { at, clean } => {
                debug!(
                    "{trigger} stored revision {} of resume {} (clean: {clean})",
                    snapshot.revision, self.resume_id
                );
                Some(SyncEvent::Saved {
                    trigger,
                    revision: snapshot.revision,
                    at: *at,
                    clean: *clean,
                })
            }
            SaveOutcome::Failed(e) => {
                warn!("{trigger} of resume {} failed: {e}", self.resume_id);
                Some(SyncEvent::Failed {
                    trigger,
                    message: e.to_string(),
                })
            }
            SaveOutcome::AlreadyInFlight => None,
        };
        if let Some(event) = event {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        outcome
    }
}

/// Runs autosave for one session until shut down or dropped.
pub struct AutosaveCoordinator {
    cancel: CancellationToken,
    phase: watch::Receiver<SyncPhase>,
    task: Option<JoinHandle<()>>,
}

impl AutosaveCoordinator {
    pub fn spawn(sync: Arc<Synchronizer>, config: AutosaveConfig) -> Self {
        let snapshots = lock(sync.store()).subscribe();
        // The document as mounted is not an edit.
        let debounced = Debounced::new(snapshots, config.delay).skip_current();
        let cancel = CancellationToken::new();
        let (phase_tx, phase) = watch::channel(SyncPhase::Idle);
        let task = tokio::spawn(run(sync, debounced, cancel.clone(), phase_tx));
        Self {
            cancel,
            phase,
            task: Some(task),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Stops scheduling syncs. A write already in flight is allowed to finish.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Autosave task ended abnormally: {e}");
            }
        }
    }
}

impl Drop for AutosaveCoordinator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    sync: Arc<Synchronizer>,
    mut debounced: Debounced<Snapshot>,
    cancel: CancellationToken,
    phase: watch::Sender<SyncPhase>,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            settled = debounced.settled() => {
                if settled.is_none() {
                    break;
                }
            }
        }

        let dirty = lock(sync.store()).is_dirty();
        if !dirty {
            continue;
        }

        phase.send_replace(SyncPhase::PendingSync);
        sync.autosave().await;
        phase.send_replace(SyncPhase::Idle);
    }

    debug!("Autosave stopped for resume {}", sync.resume_id());
}
