//! Persistence of alert state stores to an append-only journal, and their
//! recovery when an evaluator starts.
//!
//! [`StatePersistor`] writes point-in-time snapshots of stores as
//! [`state_codec`] frames to a [`StateSink`]. [`StateProvider`] replays a
//! [`StateSource`] once at startup, keeping the latest snapshot of each
//! configured alert, and hands each recovered store out exactly once through
//! [`BootstrappedStates::take`].

mod bootstrap;
mod journal;
mod persistor;
mod provider;
mod transport;

pub use bootstrap::BootstrapStateStore;
pub use journal::{FileJournal, FileJournalReader, MemoryJournal, MemoryJournalReader};
pub use persistor::{PersistSummary, StatePersistor};
pub use provider::{
    BootstrapSummary, BootstrappedStates, RecoveredAlert, StateProvider, DEFAULT_READ_TIMEOUT,
};
pub use transport::{StateSink, StateSource};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read the alert state journal: {0:#}")]
    Transport(anyhow::Error),
    #[error("alert {0} is configured more than once")]
    DuplicateAlert(i64),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Names of metrics recorded through the `metrics` facade.
pub mod metric {
    pub const PERSIST_FRAMES: &str = "alert_state_persist_frames";
    pub const PERSIST_BYTES: &str = "alert_state_persist_bytes";
    pub const PERSIST_SECONDS: &str = "alert_state_persist_seconds";
    pub const PERSIST_ERRORS: &str = "alert_state_persist_errors";
    pub const PERSIST_ENTRIES: &str = "alert_state_persist_entries";
    pub const BOOTSTRAP_FRAMES: &str = "alert_state_bootstrap_frames";
    pub const BOOTSTRAP_SKIPPED: &str = "alert_state_bootstrap_skipped";
    pub const BOOTSTRAP_SECONDS: &str = "alert_state_bootstrap_seconds";
}
