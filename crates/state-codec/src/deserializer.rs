use crate::{decode_entries, Header, Prefix};
use alert_state::{AlertConfig, AlertStateStore};

/// Deserializer rebuilds a store from the messages of one snapshot stream.
///
/// It's created from the stream's HEADER, fed each STATE payload with
/// [`Deserializer::update`], and completed by the FOOTER's count with
/// [`Deserializer::finalize`]. A stream which never completes may still be
/// recovered through [`Deserializer::into_store`].
#[derive(Debug)]
pub struct Deserializer {
    prefix: Prefix,
    store: AlertStateStore,
    updates: usize,
}

impl Deserializer {
    /// Begin an empty store for `config`. The store's transitions and nag interval
    /// are those of `config`, rather than of the persisted `header`.
    pub fn initialize(config: &AlertConfig, prefix: Prefix, header: &Header) -> Self {
        if header.nag_interval_sec != config.nag_interval_secs {
            tracing::debug!(
                alert_id = prefix.alert_id,
                persisted = header.nag_interval_sec,
                configured = config.nag_interval_secs,
                "nag interval changed since the state was persisted"
            );
        }
        let store = AlertStateStore::new_at(config, prefix.run_stamp_sec);

        Self {
            prefix,
            store,
            updates: 0,
        }
    }

    /// Apply the entries of a STATE payload, returning how many were read.
    /// On error, no entries of the payload are applied.
    pub fn update(&mut self, payload: &[u8]) -> crate::Result<usize> {
        let entries = decode_entries(payload)?;
        let count = entries.len();

        for entry in entries {
            self.store.restore(entry);
        }
        self.updates += 1;

        Ok(count)
    }

    /// Complete the stream, checking the FOOTER's `count` of written entries.
    /// A mismatch is logged, and the store is returned as-is.
    pub fn finalize(self, count: i64) -> AlertStateStore {
        if count != self.store.len() as i64 {
            tracing::error!(
                alert_id = self.prefix.alert_id,
                run_stamp_sec = self.prefix.run_stamp_sec,
                expected = count,
                actual = self.store.len(),
                updates = self.updates,
                "restored alert state count doesn't match the persisted count"
            );
        }
        self.store
    }

    /// Return the store as it stands, without a FOOTER.
    pub fn into_store(self) -> AlertStateStore {
        self.store
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    /// Number of entries restored so far.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod test {
    use crate::{Deserializer, Frame, Part, Serializer, DEFAULT_BATCH_SIZE};
    use alert_state::{AlertConfig, AlertState, AlertStateEntry, AlertStateStore, TransitionConfig};
    use bytes::Bytes;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use std::collections::BTreeMap;

    const RUN: i64 = 1_700_000_000;

    fn config() -> AlertConfig {
        AlertConfig::new("ns", 77, TransitionConfig::new(["goodToBad"]).unwrap())
            .with_nag_interval_secs(600)
    }

    fn entry(i: u64) -> AlertStateEntry {
        AlertStateEntry {
            state_id: i.wrapping_mul(0x9E37_79B9_7F4A_7C15),
            tags: Some([("host".to_string(), format!("host-{i}"))].into()),
            current_state: Some(AlertState::Bad),
            previous_state: Some(AlertState::Good),
            last_seen_timestamp: RUN - i as i64,
            nag_interval_sec: 600,
        }
    }

    fn decode_all(config: &AlertConfig, frames: &[Bytes]) -> AlertStateStore {
        let mut de = None;

        for frame in frames {
            let Frame { prefix, part } = Frame::decode(frame).unwrap();
            match part {
                Part::Header(header) => de = Some(Deserializer::initialize(config, prefix, &header)),
                Part::State(payload) => {
                    de.as_mut().unwrap().update(payload).unwrap();
                }
                Part::Footer { count } => return de.take().unwrap().finalize(count),
            }
        }
        panic!("stream has no footer")
    }

    fn round_trip(entries: Vec<AlertStateEntry>, batch_size: usize) -> (usize, AlertStateStore) {
        let frames: Vec<Bytes> = Serializer::new(&config(), RUN)
            .with_batch_size(batch_size)
            .frames(&entries)
            .collect();

        (frames.len(), decode_all(&config(), &frames))
    }

    #[test]
    fn test_empty_store() {
        let (count, store) = round_trip(Vec::new(), DEFAULT_BATCH_SIZE);
        // Just HEADER and FOOTER.
        assert_eq!(count, 2);
        assert!(store.is_empty());
        assert_eq!(store.run_stamp_sec(), RUN);
    }

    #[test]
    fn test_single_entry() {
        let (count, store) = round_trip(vec![entry(1)], DEFAULT_BATCH_SIZE);
        assert_eq!(count, 3);
        assert_eq!(store.snapshot(), vec![entry(1)]);
    }

    #[test]
    fn test_many_batches() {
        let mut entries: Vec<_> = (0..1001).map(entry).collect();
        let (count, store) = round_trip(entries.clone(), DEFAULT_BATCH_SIZE);

        // HEADER, 400 + 400 + 201, FOOTER.
        assert_eq!(count, 5);
        entries.sort_by_key(|e| e.state_id);
        assert_eq!(store.snapshot(), entries);

        // Exactly a multiple of the batch size doesn't add an empty STATE message.
        let (count, _) = round_trip((0..800).map(entry).collect(), DEFAULT_BATCH_SIZE);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_restored_store_uses_live_config() {
        let frames: Vec<Bytes> = Serializer::new(&config(), RUN).frames(&[entry(3)]).collect();

        let mut live = config().with_nag_interval_secs(60);
        live.transitions = TransitionConfig::new(["goodToWarn"]).unwrap();

        let store = decode_all(&live, &frames);
        assert_eq!(store.nag_interval_secs(), 60);
        assert!(store
            .transition_config()
            .is_allowed(AlertState::Good, AlertState::Warn));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_footer_mismatch_is_not_fatal() {
        let frames: Vec<Bytes> = Serializer::new(&config(), RUN)
            .frames((0..5).map(entry))
            .collect();

        // Drop the single STATE message.
        let truncated = [frames[0].clone(), frames[2].clone()];
        let store = decode_all(&config(), &truncated);
        assert!(store.is_empty());
    }

    #[test]
    fn test_bad_update_is_skipped() {
        let frames: Vec<Bytes> = Serializer::new(&config(), RUN)
            .with_batch_size(2)
            .frames((0..4).map(entry))
            .collect();
        assert_eq!(frames.len(), 4);

        let Frame {
            prefix,
            part: Part::Header(header),
        } = Frame::decode(&frames[0]).unwrap()
        else {
            panic!("expected a header")
        };
        let mut de = Deserializer::initialize(&config(), prefix, &header);

        let Part::State(first) = Frame::decode(&frames[1]).unwrap().part else {
            panic!("expected state")
        };
        assert!(de.update(&first[..first.len() - 1]).is_err());
        assert!(de.is_empty());

        assert_eq!(de.update(first).unwrap(), 2);
        assert_eq!(de.len(), 2);
        assert_eq!(de.into_store().len(), 2);
    }

    #[derive(Debug, Clone)]
    struct ArbitraryEntry(AlertStateEntry);

    impl Arbitrary for ArbitraryEntry {
        fn arbitrary(g: &mut Gen) -> Self {
            let states = [
                None,
                Some(AlertState::Good),
                Some(AlertState::Bad),
                Some(AlertState::Warn),
                Some(AlertState::Unknown),
                Some(AlertState::Missing),
            ];
            ArbitraryEntry(AlertStateEntry {
                state_id: u64::arbitrary(g),
                tags: Option::<BTreeMap<String, String>>::arbitrary(g),
                current_state: *g.choose(&states).unwrap(),
                previous_state: *g.choose(&states).unwrap(),
                last_seen_timestamp: i64::arbitrary(g),
                nag_interval_sec: i64::arbitrary(g),
            })
        }
    }

    #[quickcheck]
    fn test_round_trip(entries: Vec<ArbitraryEntry>, batch_size: u8) -> bool {
        let expect: BTreeMap<u64, AlertStateEntry> = entries
            .into_iter()
            .map(|ArbitraryEntry(e)| (e.state_id, e))
            .collect();
        let batch_size = 1 + (batch_size % 8) as usize;

        let (count, store) = round_trip(expect.values().cloned().collect(), batch_size);

        count == 2 + (expect.len() + batch_size - 1) / batch_size
            && store.snapshot() == expect.into_values().collect::<Vec<_>>()
    }
}
