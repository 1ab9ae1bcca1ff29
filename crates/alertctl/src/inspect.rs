use alert_state::AlertStateEntry;
use anyhow::Context;
use state_codec::{decode_entries, Frame, Header, Part, PartId, Prefix};
use state_journal::{FileJournalReader, StateSource};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, clap::Args)]
pub struct Inspect {
    /// Path of the journal file to read.
    #[clap(long, env = "ALERTCTL_JOURNAL")]
    pub journal: PathBuf,
}

impl Inspect {
    pub async fn run<W: Write>(self, out: &mut W) -> anyhow::Result<()> {
        let source = FileJournalReader::open(&self.journal).await?;
        // Files are read through to their end, so there's nothing to wait for.
        let frames = inspect(source, Duration::from_secs(1), out).await?;

        tracing::info!(frames, journal = %self.journal.display(), "inspected journal");
        Ok(())
    }
}

/// A decoded frame, as written by `inspect`.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameRecord {
    index: usize,
    bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<Prefix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    part: Option<PartId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<Header>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<Vec<AlertStateEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Write each frame of `source` to `out` as a line of JSON, returning the
/// number of frames read. Undecodable frames are written with their error.
pub async fn inspect<S, W>(
    mut source: S,
    read_timeout: Duration,
    out: &mut W,
) -> anyhow::Result<usize>
where
    S: StateSource,
    W: Write,
{
    let mut index = 0;

    while let Some(message) = source.receive(read_timeout).await? {
        let mut record = FrameRecord {
            index,
            bytes: message.len(),
            prefix: None,
            part: None,
            header: None,
            entries: None,
            count: None,
            error: None,
        };

        match Frame::decode(&message) {
            Ok(Frame { prefix, part }) => {
                record.prefix = Some(prefix);
                record.part = Some(part.id());

                match part {
                    Part::Header(header) => record.header = Some(header),
                    Part::State(payload) => match decode_entries(payload) {
                        Ok(entries) => record.entries = Some(entries),
                        Err(err) => record.error = Some(err.to_string()),
                    },
                    Part::Footer { count } => record.count = Some(count),
                }
            }
            Err(err) => record.error = Some(err.to_string()),
        }

        serde_json::to_writer(&mut *out, &record).context("failed to write frame")?;
        writeln!(out)?;
        index += 1;
    }
    source.close().await?;

    Ok(index)
}
