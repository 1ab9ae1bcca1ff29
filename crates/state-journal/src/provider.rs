use crate::{metric, BootstrapStateStore, Error, StateSource};
use alert_state::{AlertConfig, AlertStateStore};
use state_codec::Frame;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Default time to wait for a frame before concluding the journal is drained.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// StateProvider replays a journal once to recover the stores of configured alerts.
pub struct StateProvider<S> {
    source: S,
    cutoff_sec: i64,
    read_timeout: Duration,
}

impl<S: StateSource> StateProvider<S> {
    /// Build a provider which replays frames of runs strictly before `cutoff_sec`.
    pub fn new(source: S, cutoff_sec: i64) -> Self {
        Self {
            source,
            cutoff_sec,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Replay the journal until it's drained or a frame of a run at or after
    /// the cutoff is reached, and then close it.
    ///
    /// Frames which can't be decoded, or which belong to alerts absent from
    /// `configs`, are skipped. An error reading the journal fails the bootstrap.
    #[tracing::instrument(skip_all, fields(cutoff_sec = self.cutoff_sec, alerts = configs.len()))]
    pub async fn bootstrap(mut self, configs: &[AlertConfig]) -> crate::Result<BootstrappedStates> {
        let started = Instant::now();

        let mut stores = BTreeMap::new();
        for config in configs {
            if stores
                .insert(config.alert_id, BootstrapStateStore::new(config.clone()))
                .is_some()
            {
                return Err(Error::DuplicateAlert(config.alert_id));
            }
        }

        let mut summary = BootstrapSummary::default();
        let result = self.replay(&mut stores, &mut summary).await;

        if let Err(error) = self.source.close().await {
            tracing::warn!(error = format!("{error:#}"), "failed to close alert state journal");
        }
        result?;

        let mut recovered = BTreeMap::new();
        for (alert_id, store) in stores {
            if let Some((store, complete)) = store.into_store() {
                summary.alerts.push(RecoveredAlert {
                    alert_id,
                    run_stamp_sec: store.run_stamp_sec(),
                    entries: store.len(),
                    complete,
                });
                recovered.insert(alert_id, store);
            }
        }

        metrics::counter!(metric::BOOTSTRAP_FRAMES).increment(summary.frames as u64);
        metrics::counter!(metric::BOOTSTRAP_SKIPPED).increment(summary.skipped as u64);
        metrics::histogram!(metric::BOOTSTRAP_SECONDS).record(started.elapsed().as_secs_f64());

        tracing::info!(
            frames = summary.frames,
            skipped = summary.skipped,
            reached_cutoff = summary.reached_cutoff,
            recovered = recovered.len(),
            elapsed = ?started.elapsed(),
            "bootstrapped alert state"
        );

        Ok(BootstrappedStates {
            stores: recovered,
            summary,
        })
    }

    async fn replay(
        &mut self,
        stores: &mut BTreeMap<i64, BootstrapStateStore>,
        summary: &mut BootstrapSummary,
    ) -> crate::Result<()> {
        loop {
            let message = match self.source.receive(self.read_timeout).await {
                Ok(Some(message)) => message,
                Ok(None) => return Ok(()),
                Err(err) => return Err(Error::Transport(err)),
            };
            summary.frames += 1;

            let frame = match Frame::decode(&message) {
                Ok(frame) => frame,
                Err(error) => {
                    tracing::warn!(%error, bytes = message.len(), "skipping undecodable alert state frame");
                    summary.skipped += 1;
                    continue;
                }
            };

            if frame.prefix.run_stamp_sec >= self.cutoff_sec {
                tracing::debug!(
                    alert_id = frame.prefix.alert_id,
                    run_stamp_sec = frame.prefix.run_stamp_sec,
                    "reached bootstrap cutoff"
                );
                summary.reached_cutoff = true;
                return Ok(());
            }

            match stores.get_mut(&frame.prefix.alert_id) {
                Some(store) if store.config().namespace == frame.prefix.namespace => {
                    store.apply(frame)
                }
                _ => {
                    tracing::debug!(
                        alert_id = frame.prefix.alert_id,
                        namespace = %frame.prefix.namespace,
                        "skipping frame of an unconfigured alert"
                    );
                    summary.skipped += 1;
                }
            }
        }
    }
}

/// Outcome of a [`StateProvider::bootstrap`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapSummary {
    /// Frames read from the journal.
    pub frames: usize,
    /// Frames which were undecodable or of unconfigured alerts.
    pub skipped: usize,
    /// Whether replay stopped at a frame of a run at or after the cutoff.
    pub reached_cutoff: bool,
    pub alerts: Vec<RecoveredAlert>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveredAlert {
    pub alert_id: i64,
    pub run_stamp_sec: i64,
    pub entries: usize,
    /// Whether the snapshot ended with its footer.
    pub complete: bool,
}

/// Stores recovered by a bootstrap, each of which may be taken once.
#[derive(Debug)]
pub struct BootstrappedStates {
    stores: BTreeMap<i64, AlertStateStore>,
    summary: BootstrapSummary,
}

impl BootstrappedStates {
    /// Take the recovered store of `config`'s alert. The store is updated to
    /// `config`'s transitions and nag interval.
    ///
    /// Returns None if no state was recovered, or if it was already taken.
    pub fn take(&mut self, config: &AlertConfig) -> Option<AlertStateStore> {
        let mut store = self.stores.remove(&config.alert_id)?;
        store.set_transition_config(config.transitions.clone());
        store.set_nag_interval_secs(config.nag_interval_secs);
        Some(store)
    }

    /// Number of stores which are yet to be taken.
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Alert ids of stores which are yet to be taken.
    pub fn alert_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.stores.keys().copied()
    }

    pub fn summary(&self) -> &BootstrapSummary {
        &self.summary
    }
}
