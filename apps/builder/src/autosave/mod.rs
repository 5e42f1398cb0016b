//! Debounced background synchronization of the editing store.

pub mod coordinator;
pub mod debounce;
pub mod session;

pub use coordinator::{
    AutosaveConfig, AutosaveCoordinator, SaveOutcome, SaveTrigger, SyncEvent, SyncPhase,
    Synchronizer, AUTOSAVE_DELAY_MS,
};
pub use debounce::Debounced;
pub use session::EditorSession;
