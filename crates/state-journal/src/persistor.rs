use crate::{metric, StateSink};
use alert_state::{AlertConfig, AlertStateStore};
use state_codec::{Serializer, DEFAULT_BATCH_SIZE};
use std::time::Instant;

/// Outcome of [`StatePersistor::persist`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PersistSummary {
    /// Frames appended successfully.
    pub frames: usize,
    /// Frames which failed to append.
    pub failed: usize,
    /// Bytes of successfully appended frames.
    pub bytes: usize,
    /// Entries encoded into the snapshot.
    pub entries: i64,
}

impl PersistSummary {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// StatePersistor writes snapshots of alert state stores to a [`StateSink`].
#[derive(Debug)]
pub struct StatePersistor<S> {
    sink: S,
    batch_size: usize,
}

impl<S: StateSink> StatePersistor<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the maximum number of entries written per STATE frame.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Write a snapshot of `store` as of `run_stamp_sec`.
    ///
    /// Failures to append a frame are logged and counted, and the remaining
    /// frames are still written. A snapshot with failed frames may be
    /// recovered as an incomplete snapshot, or not at all.
    #[tracing::instrument(
        skip_all,
        fields(
            alert_id = config.alert_id,
            namespace = %config.namespace,
            run_stamp_sec,
        )
    )]
    pub async fn persist(
        &self,
        config: &AlertConfig,
        store: &AlertStateStore,
        run_stamp_sec: i64,
    ) -> PersistSummary {
        let alert_id = config.alert_id.to_string();
        let snapshot = store.snapshot();

        let mut frames = Serializer::new(config, run_stamp_sec)
            .with_batch_size(self.batch_size)
            .frames(&snapshot);
        let mut summary = PersistSummary::default();

        for frame in frames.by_ref() {
            let len = frame.len();
            let started = Instant::now();
            let result = self.sink.append(frame).await;

            metrics::histogram!(metric::PERSIST_SECONDS, "alert_id" => alert_id.clone())
                .record(started.elapsed().as_secs_f64());

            match result {
                Ok(()) => {
                    summary.frames += 1;
                    summary.bytes += len;

                    metrics::counter!(metric::PERSIST_FRAMES, "alert_id" => alert_id.clone())
                        .increment(1);
                    metrics::histogram!(metric::PERSIST_BYTES, "alert_id" => alert_id.clone())
                        .record(len as f64);
                }
                Err(error) => {
                    summary.failed += 1;

                    tracing::error!(
                        error = format!("{error:#}"),
                        frame_bytes = len,
                        "failed to append alert state frame (continuing)"
                    );
                    metrics::counter!(metric::PERSIST_ERRORS, "alert_id" => alert_id.clone())
                        .increment(1);
                }
            }
        }
        summary.entries = frames.written();

        metrics::counter!(metric::PERSIST_ENTRIES, "alert_id" => alert_id)
            .increment(summary.entries as u64);

        tracing::debug!(
            frames = summary.frames,
            failed = summary.failed,
            entries = summary.entries,
            bytes = summary.bytes,
            "persisted alert state"
        );
        summary
    }
}
