//! Per-entity alert state tracking.
//!
//! An alerting entity is one monitored time series of an alert configuration,
//! identified by `(namespace, alert_id, tags)`. Each evaluation run computes a
//! signal ([`AlertState`]) for every entity and hands it to
//! [`AlertStateStore::raise_alert`], which decides whether the signal is a new,
//! alert-worthy event:
//!
//! - State changes are alert-worthy only if their edge is enabled in the
//!   active [`TransitionConfig`].
//! - An unchanged, non-GOOD state is re-raised ("nagged") once the nag interval
//!   has elapsed since the last emission or state change.
//! - An entity raises at most once per run. Runs are delimited by
//!   [`AlertStateStore::new_run`].
//!
//! The store is a plain single-owner value. Callers that evaluate many alert
//! configurations concurrently hold one store per configuration.

mod config;
mod entity;
mod entry;
mod state;
mod store;
mod transition;

pub use config::AlertConfig;
pub use entity::state_id;
pub use entry::AlertStateEntry;
pub use state::AlertState;
pub use store::{AlertStateChange, AlertStateStore, DO_NOT_NAG};
pub use transition::TransitionConfig;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("'{0}' is not a known alert state")]
    UnknownState(String),
    #[error("invalid transition '{0}': expected a token like 'goodToBad'")]
    InvalidTransition(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Current wall-clock time in epoch seconds.
pub fn now_sec() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
