use crate::{entry::encode_entry, put_string, Header, PartId, Prefix};
use alert_state::{AlertConfig, AlertStateEntry};
use bytes::{BufMut, Bytes, BytesMut};
use std::borrow::Borrow;
use std::iter::Peekable;

/// Default number of entries written into each STATE message.
pub const DEFAULT_BATCH_SIZE: usize = 400;

/// Serializer writes the messages of one store snapshot.
#[derive(Debug, Clone)]
pub struct Serializer {
    prefix: Prefix,
    header: Header,
    batch_size: usize,
}

impl Serializer {
    pub fn new(config: &AlertConfig, run_stamp_sec: i64) -> Self {
        Self {
            prefix: Prefix::new(config.namespace.clone(), config.alert_id, run_stamp_sec),
            header: Header {
                nag_interval_sec: config.nag_interval_secs,
                store_identity: config.store_identity.clone(),
            },
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the maximum number of entries per STATE message (at least one).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    /// Lazily encode `entries` as HEADER, STATE*, and FOOTER messages.
    pub fn frames<I>(self, entries: I) -> Frames<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Borrow<AlertStateEntry>,
    {
        let mut encoded_prefix = BytesMut::new();
        self.prefix.encode(&mut encoded_prefix);

        Frames {
            encoded_prefix: encoded_prefix.freeze(),
            serializer: self,
            entries: entries.into_iter().peekable(),
            stage: Stage::Header,
            written: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    State,
    Done,
}

/// Iterator over the encoded messages of a store snapshot.
pub struct Frames<I: Iterator> {
    serializer: Serializer,
    encoded_prefix: Bytes,
    entries: Peekable<I>,
    stage: Stage,
    written: i64,
}

impl<I> Frames<I>
where
    I: Iterator,
    I::Item: Borrow<AlertStateEntry>,
{
    /// Number of entries written into STATE messages so far.
    pub fn written(&self) -> i64 {
        self.written
    }

    fn begin(&self, part: PartId) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.encoded_prefix.len() + 256);
        buf.put_slice(&self.encoded_prefix);
        buf.put_u8(part as u8);
        buf
    }

    fn next_state(&mut self) -> Bytes {
        let mut buf = self.begin(PartId::State);
        let mut batch = 0;

        while batch != self.serializer.batch_size {
            let Some(entry) = self.entries.next() else {
                break;
            };
            let entry: &AlertStateEntry = entry.borrow();

            let checkpoint = buf.len();
            buf.put_u8(1);

            if let Err(error) = encode_entry(entry, &mut buf) {
                tracing::error!(
                    %error,
                    alert_id = self.serializer.prefix.alert_id,
                    state_id = entry.state_id,
                    "failed to encode alert state entry (skipping)"
                );
                buf.truncate(checkpoint);
                continue;
            }
            batch += 1;
        }
        buf.put_u8(0);

        self.written += batch as i64;
        buf.freeze()
    }
}

impl<I> Iterator for Frames<I>
where
    I: Iterator,
    I::Item: Borrow<AlertStateEntry>,
{
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        match self.stage {
            Stage::Header => {
                let mut buf = self.begin(PartId::Header);
                buf.put_i64(self.serializer.header.nag_interval_sec);
                put_string(&mut buf, &self.serializer.header.store_identity);

                self.stage = Stage::State;
                Some(buf.freeze())
            }
            Stage::State if self.entries.peek().is_some() => Some(self.next_state()),
            Stage::State => {
                let mut buf = self.begin(PartId::Footer);
                buf.put_i64(self.written);

                self.stage = Stage::Done;
                Some(buf.freeze())
            }
            Stage::Done => None,
        }
    }
}
