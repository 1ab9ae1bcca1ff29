use alert_state::{AlertConfig, AlertStateStore};
use state_codec::{Deserializer, Frame, Part};

/// BootstrapStateStore accumulates the frames of a single alert during
/// bootstrap, tracking its latest complete snapshot and any snapshot
/// still in progress.
#[derive(Debug)]
pub struct BootstrapStateStore {
    config: AlertConfig,
    complete: Option<AlertStateStore>,
    incomplete: Option<Deserializer>,
}

impl BootstrapStateStore {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            complete: None,
            incomplete: None,
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Apply a decoded frame of this store's alert.
    pub fn apply(&mut self, frame: Frame<'_>) {
        let Frame { prefix, part } = frame;
        let alert_id = prefix.alert_id;
        let run_stamp_sec = prefix.run_stamp_sec;

        match part {
            Part::Header(header) => {
                if let Some(stale) = self.incomplete.take() {
                    tracing::warn!(
                        alert_id,
                        stale_run_stamp_sec = stale.prefix().run_stamp_sec,
                        entries = stale.len(),
                        run_stamp_sec,
                        "discarding incomplete alert state snapshot"
                    );
                }
                self.incomplete = Some(Deserializer::initialize(&self.config, prefix, &header));
            }
            Part::State(payload) => match &mut self.incomplete {
                Some(de) if de.prefix().run_stamp_sec == run_stamp_sec => {
                    if let Err(error) = de.update(payload) {
                        tracing::warn!(
                            %error,
                            alert_id,
                            run_stamp_sec,
                            "failed to decode alert state entries (skipping)"
                        );
                    }
                }
                _ => tracing::debug!(
                    alert_id,
                    run_stamp_sec,
                    "ignoring alert state without an open snapshot"
                ),
            },
            Part::Footer { count } => match self.incomplete.take() {
                Some(de) if de.prefix().run_stamp_sec == run_stamp_sec => {
                    self.complete = Some(de.finalize(count));
                }
                other => {
                    self.incomplete = other;
                    tracing::debug!(
                        alert_id,
                        run_stamp_sec,
                        "ignoring alert state footer without an open snapshot"
                    );
                }
            },
        }
    }

    /// Resolve the recovered store, preferring the latest complete snapshot.
    /// Returns the store and whether it was complete.
    pub fn into_store(self) -> Option<(AlertStateStore, bool)> {
        match (self.complete, self.incomplete) {
            (Some(store), _) => Some((store, true)),
            (None, Some(de)) => {
                tracing::warn!(
                    alert_id = self.config.alert_id,
                    run_stamp_sec = de.prefix().run_stamp_sec,
                    entries = de.len(),
                    "recovering alert state from an incomplete snapshot"
                );
                Some((de.into_store(), false))
            }
            (None, None) => None,
        }
    }
}
