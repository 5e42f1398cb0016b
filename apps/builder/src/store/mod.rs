//! Resume store, the only writer of the in-memory resume document.
//!
//! Every operation runs to completion synchronously; nothing here performs I/O.
//! Document changes bump a revision counter and publish a [`Snapshot`] on a watch
//! channel, which is what the autosave coordinator debounces.
//!
//! Sharing: one store per editing session, held as [`SharedStore`] by the UI layer and
//! the coordinator. The lock is never held across an `.await`.

pub mod status;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::ids::IdGenerator;
use crate::models::{
    ActiveSection, Certification, CertificationPatch, Education, EducationPatch, Entry, Patch,
    PersonalInfoPatch, Project, ProjectPatch, ResumeDocument, ResumeRecord, Skill, TemplateId,
    WorkExperience, WorkExperiencePatch,
};
use crate::validation::{validate_document, ValidationReport};

pub use status::SaveStatus;

pub type SharedStore = Arc<Mutex<ResumeStore>>;

/// Locks a shared store. Operations never leave partial state behind, so a poisoned
/// lock still guards a consistent document.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, ResumeStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Immutable view of the document at one revision.
///
/// `revision` increases on every document change and never repeats within a store.
/// `epoch` increases on `load` and `reset`, i.e. whenever the session starts over.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub revision: u64,
    pub epoch: u64,
    pub document: Arc<ResumeDocument>,
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.revision == other.revision && self.epoch == other.epoch
    }
}

pub struct ResumeStore {
    document: ResumeDocument,
    active_section: ActiveSection,
    is_saving: bool,
    last_saved: Option<DateTime<Utc>>,
    is_dirty: bool,
    revision: u64,
    epoch: u64,
    ids: Arc<dyn IdGenerator>,
    snapshots: watch::Sender<Snapshot>,
}

impl ResumeStore {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        let document = ResumeDocument::default();
        let (snapshots, _) = watch::channel(Snapshot {
            revision: 0,
            epoch: 0,
            document: Arc::new(document.clone()),
        });
        Self {
            document,
            active_section: ActiveSection::first(),
            is_saving: false,
            last_saved: None,
            is_dirty: false,
            revision: 0,
            epoch: 0,
            ids,
            snapshots,
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn document(&self) -> &ResumeDocument {
        &self.document
    }

    pub fn active_section(&self) -> ActiveSection {
        self.active_section
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn is_saving(&self) -> bool {
        self.is_saving
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn save_status(&self) -> SaveStatus {
        SaveStatus::from_flags(self.is_saving, self.is_dirty, self.last_saved)
    }

    pub fn validate(&self) -> ValidationReport {
        validate_document(&self.document)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every published snapshot, starting from the current one.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    // ── Session lifecycle ────────────────────────────────────────────────────

    /// Replaces the whole document with a persisted record. Leaves `is_saving` and
    /// `last_saved` alone: they describe this session, not the record.
    pub fn load(&mut self, record: ResumeRecord) {
        debug!("Loading resume {} into store", record.id);
        self.document = record.into_document();
        self.active_section = ActiveSection::first();
        self.is_dirty = false;
        self.epoch += 1;
        self.publish();
    }

    /// Back to the session-initial empty state.
    pub fn reset(&mut self) {
        debug!("Resetting resume store");
        self.document = ResumeDocument::default();
        self.active_section = ActiveSection::first();
        self.is_dirty = false;
        self.is_saving = false;
        self.last_saved = None;
        self.epoch += 1;
        self.publish();
    }

    pub fn set_active_section(&mut self, section: ActiveSection) {
        self.active_section = section;
    }

    // ── Top-level fields ─────────────────────────────────────────────────────

    pub fn update_title(&mut self, title: impl Into<String>) {
        self.document.title = title.into();
        self.touch();
    }

    pub fn update_summary(&mut self, summary: impl Into<String>) {
        self.document.summary = summary.into();
        self.touch();
    }

    pub fn set_template(&mut self, template: TemplateId) {
        self.document.template = template;
        self.touch();
    }

    pub fn update_personal_info(&mut self, patch: PersonalInfoPatch) {
        patch.apply_to(&mut self.document.personal_info);
        self.touch();
    }

    // ── Work experience ──────────────────────────────────────────────────────

    pub fn add_work_experience(&mut self) -> String {
        let id = self.ids.generate();
        self.document
            .work_experiences
            .push(WorkExperience::blank(id.clone()));
        self.touch();
        id
    }

    pub fn update_work_experience(&mut self, id: &str, patch: WorkExperiencePatch) {
        if update_entry(&mut self.document.work_experiences, id, patch) {
            self.touch();
        } else {
            debug!("Ignoring update for unknown work experience {id}");
        }
    }

    pub fn remove_work_experience(&mut self, id: &str) {
        remove_entry(&mut self.document.work_experiences, id);
        self.touch();
    }

    // ── Education ────────────────────────────────────────────────────────────

    pub fn add_education(&mut self) -> String {
        let id = self.ids.generate();
        self.document.educations.push(Education::blank(id.clone()));
        self.touch();
        id
    }

    pub fn update_education(&mut self, id: &str, patch: EducationPatch) {
        if update_entry(&mut self.document.educations, id, patch) {
            self.touch();
        } else {
            debug!("Ignoring update for unknown education {id}");
        }
    }

    pub fn remove_education(&mut self, id: &str) {
        remove_entry(&mut self.document.educations, id);
        self.touch();
    }

    // ── Skills ───────────────────────────────────────────────────────────────

    /// Adds a trimmed skill name. Blank names and exact duplicates are ignored and
    /// return `None`.
    pub fn add_skill(&mut self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() || self.document.skills.iter().any(|s| s.name == name) {
            return None;
        }
        let id = self.ids.generate();
        self.document.skills.push(Skill {
            id: id.clone(),
            name: name.to_string(),
        });
        self.touch();
        Some(id)
    }

    pub fn remove_skill(&mut self, id: &str) {
        remove_entry(&mut self.document.skills, id);
        self.touch();
    }

    // ── Projects ─────────────────────────────────────────────────────────────

    pub fn add_project(&mut self) -> String {
        let id = self.ids.generate();
        self.document.projects.push(Project::blank(id.clone()));
        self.touch();
        id
    }

    pub fn update_project(&mut self, id: &str, patch: ProjectPatch) {
        if update_entry(&mut self.document.projects, id, patch) {
            self.touch();
        } else {
            debug!("Ignoring update for unknown project {id}");
        }
    }

    pub fn remove_project(&mut self, id: &str) {
        remove_entry(&mut self.document.projects, id);
        self.touch();
    }

    // ── Certifications ───────────────────────────────────────────────────────

    pub fn add_certification(&mut self) -> String {
        let id = self.ids.generate();
        self.document
            .certifications
            .push(Certification::blank(id.clone()));
        self.touch();
        id
    }

    pub fn update_certification(&mut self, id: &str, patch: CertificationPatch) {
        if update_entry(&mut self.document.certifications, id, patch) {
            self.touch();
        } else {
            debug!("Ignoring update for unknown certification {id}");
        }
    }

    pub fn remove_certification(&mut self, id: &str) {
        remove_entry(&mut self.document.certifications, id);
        self.touch();
    }

    // ── Reordering ───────────────────────────────────────────────────────────
    //
    // `to` is clamped to the last position. Unknown ids and moves onto the current
    // position change nothing and leave `dirty` alone.

    pub fn move_work_experience(&mut self, id: &str, to: usize) {
        if move_entry(&mut self.document.work_experiences, id, to) {
            self.touch();
        }
    }

    pub fn move_education(&mut self, id: &str, to: usize) {
        if move_entry(&mut self.document.educations, id, to) {
            self.touch();
        }
    }

    pub fn move_skill(&mut self, id: &str, to: usize) {
        if move_entry(&mut self.document.skills, id, to) {
            self.touch();
        }
    }

    pub fn move_project(&mut self, id: &str, to: usize) {
        if move_entry(&mut self.document.projects, id, to) {
            self.touch();
        }
    }

    pub fn move_certification(&mut self, id: &str, to: usize) {
        if move_entry(&mut self.document.certifications, id, to) {
            self.touch();
        }
    }

    // ── Save bookkeeping ─────────────────────────────────────────────────────

    pub fn set_is_saving(&mut self, saving: bool) {
        self.is_saving = saving;
    }

    pub fn set_last_saved(&mut self, at: DateTime<Utc>) {
        self.last_saved = Some(at);
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    /// Records a confirmed write of `snapshot`.
    ///
    /// `last_saved` is updated unless the session was reloaded or reset since the
    /// snapshot was taken. `dirty` is cleared only if nothing changed after it; returns
    /// whether it was.
    pub fn confirm_saved(&mut self, snapshot: &Snapshot, at: DateTime<Utc>) -> bool {
        if snapshot.epoch != self.epoch {
            debug!(
                "Discarding save confirmation from epoch {} (now {})",
                snapshot.epoch, self.epoch
            );
            return false;
        }
        self.last_saved = Some(at);
        if snapshot.revision == self.revision {
            self.is_dirty = false;
            true
        } else {
            debug!(
                "Saved revision {} but store is at {}; staying dirty",
                snapshot.revision, self.revision
            );
            false
        }
    }

    fn touch(&mut self) {
        self.is_dirty = true;
        self.publish();
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.snapshots.send_replace(Snapshot {
            revision: self.revision,
            epoch: self.epoch,
            document: Arc::new(self.document.clone()),
        });
    }
}

/// Merges `patch` into the entry with `id`. Returns false when no entry matches.
fn update_entry<T: Entry, P: Patch<T>>(entries: &mut [T], id: &str, patch: P) -> bool {
    match entries.iter_mut().find(|e| e.id() == id) {
        Some(entry) => {
            patch.apply_to(entry);
            true
        }
        None => false,
    }
}

fn remove_entry<T: Entry>(entries: &mut Vec<T>, id: &str) {
    entries.retain(|e| e.id() != id);
}

fn move_entry<T: Entry>(entries: &mut Vec<T>, id: &str, to: usize) -> bool {
    let Some(from) = entries.iter().position(|e| e.id() == id) else {
        debug!("Ignoring move of unknown entry {id}");
        return false;
    };
    let to = to.min(entries.len() - 1);
    if from == to {
        return false;
    }
    let entry = entries.remove(from);
    entries.insert(to, entry);
    true
}
