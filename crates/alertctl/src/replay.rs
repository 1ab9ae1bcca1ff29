use crate::{parse_cutoff, Catalog};
use alert_state::AlertConfig;
use state_journal::{FileJournalReader, StateProvider, StateSource};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, clap::Args)]
pub struct Replay {
    /// Path of the journal file to read.
    #[clap(long, env = "ALERTCTL_JOURNAL")]
    pub journal: PathBuf,
    /// Path of a YAML catalog of alert configurations.
    #[clap(long, env = "ALERTCTL_CATALOG")]
    pub catalog: PathBuf,
    /// Replay only runs which began before this cutoff: "now", an RFC 3339
    /// timestamp, or a duration ago (like "1h").
    #[clap(long, default_value = "now")]
    pub cutoff: String,
    /// Time to wait for another frame before concluding the journal is drained.
    #[clap(long, default_value = "1s")]
    pub read_timeout: humantime::Duration,
}

impl Replay {
    pub async fn run<W: Write>(self, out: &mut W) -> anyhow::Result<()> {
        let catalog = Catalog::load(&self.catalog)?;
        let cutoff_sec = parse_cutoff(&self.cutoff, alert_state::now_sec())?;
        let source = FileJournalReader::open(&self.journal).await?;

        replay(
            source,
            &catalog.alerts,
            cutoff_sec,
            self.read_timeout.into(),
            out,
        )
        .await
    }
}

/// What a bootstrap recovered for one configured alert.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertReport<'a> {
    namespace: &'a str,
    alert_id: i64,
    store_identity: &'a str,
    recovered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_stamp_sec: Option<i64>,
    entries: usize,
    /// Entities whose current state isn't GOOD.
    unresolved: usize,
}

/// Bootstrap `configs` from `source`, and write a line of JSON per configuration.
pub async fn replay<S, W>(
    source: S,
    configs: &[AlertConfig],
    cutoff_sec: i64,
    read_timeout: Duration,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: StateSource,
    W: Write,
{
    let mut states = StateProvider::new(source, cutoff_sec)
        .with_read_timeout(read_timeout)
        .bootstrap(configs)
        .await?;

    let summary = states.summary().clone();
    tracing::info!(
        frames = summary.frames,
        skipped = summary.skipped,
        reached_cutoff = summary.reached_cutoff,
        "replayed journal"
    );

    for config in configs {
        let recovered = summary.alerts.iter().find(|a| a.alert_id == config.alert_id);
        let store = states.take(config);

        let report = AlertReport {
            namespace: &config.namespace,
            alert_id: config.alert_id,
            store_identity: &config.store_identity,
            recovered: store.is_some(),
            complete: recovered.map(|r| r.complete),
            run_stamp_sec: recovered.map(|r| r.run_stamp_sec),
            entries: store.as_ref().map_or(0, |s| s.len()),
            unresolved: store
                .as_ref()
                .map_or(0, |s| s.entries().filter(|e| !e.is_good()).count()),
        };

        serde_json::to_writer(&mut *out, &report)?;
        writeln!(out)?;
    }
    Ok(())
}
