use crate::{put_string, Error, Reader};
use alert_state::{AlertState, AlertStateEntry};
use bytes::{BufMut, BytesMut};
use std::collections::BTreeMap;

const ABSENT: i8 = -1;
const ABSENT_TAGS: i16 = -1;

pub(crate) fn encode_entry(entry: &AlertStateEntry, buf: &mut BytesMut) -> crate::Result<()> {
    let AlertStateEntry {
        state_id,
        tags,
        current_state,
        previous_state,
        last_seen_timestamp,
        nag_interval_sec,
    } = entry;

    buf.put_u64(*state_id);

    match tags {
        None => buf.put_i16(ABSENT_TAGS),
        Some(tags) => {
            let count = i16::try_from(tags.len()).map_err(|_| Error::TooManyTags(tags.len()))?;
            buf.put_i16(count);

            for (key, value) in tags {
                put_string(buf, key);
                put_string(buf, value);
            }
        }
    }
    buf.put_i8(encode_state(*current_state));
    buf.put_i8(encode_state(*previous_state));
    buf.put_i64(*last_seen_timestamp);
    buf.put_i64(*nag_interval_sec);

    Ok(())
}

pub(crate) fn decode_entry(r: &mut Reader<'_>) -> crate::Result<AlertStateEntry> {
    let state_id = r.i64()? as u64;

    let tags = match r.i16()? {
        ABSENT_TAGS => None,
        count if count < 0 => return Err(Error::InvalidTagCount(count)),
        count => {
            let mut tags = BTreeMap::new();
            for _ in 0..count {
                let key = r.string()?;
                let value = r.string()?;
                tags.insert(key, value);
            }
            Some(tags)
        }
    };

    Ok(AlertStateEntry {
        state_id,
        tags,
        current_state: decode_state(r.i8()?)?,
        previous_state: decode_state(r.i8()?)?,
        last_seen_timestamp: r.i64()?,
        nag_interval_sec: r.i64()?,
    })
}

/// Decode the entries of a STATE payload, through its terminator.
pub fn decode_entries(payload: &[u8]) -> crate::Result<Vec<AlertStateEntry>> {
    let mut r = Reader::new(payload);
    let mut entries = Vec::new();

    while r.bool()? {
        entries.push(decode_entry(&mut r)?);
    }
    r.finish()?;

    Ok(entries)
}

fn encode_state(state: Option<AlertState>) -> i8 {
    match state {
        Some(state) => state.id() as i8,
        None => ABSENT,
    }
}

fn decode_state(id: i8) -> crate::Result<Option<AlertState>> {
    match id {
        ABSENT => Ok(None),
        id if id < 0 => Err(Error::InvalidState(id)),
        id => AlertState::from_id(id as u8)
            .map(Some)
            .ok_or(Error::InvalidState(id)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fixture() -> AlertStateEntry {
        AlertStateEntry {
            state_id: u64::MAX - 7,
            tags: Some([("host".to_string(), "web-01".to_string())].into()),
            current_state: Some(AlertState::Bad),
            previous_state: None,
            last_seen_timestamp: 1_700_000_000,
            nag_interval_sec: 300,
        }
    }

    #[test]
    fn test_entry_layout() {
        let mut buf = BytesMut::new();
        encode_entry(&fixture(), &mut buf).unwrap();

        let mut expect = Vec::new();
        expect.extend_from_slice(&(u64::MAX - 7).to_be_bytes());
        expect.extend_from_slice(&1i16.to_be_bytes());
        expect.extend_from_slice(&4u32.to_be_bytes());
        expect.extend_from_slice(b"host");
        expect.extend_from_slice(&6u32.to_be_bytes());
        expect.extend_from_slice(b"web-01");
        expect.push(1); // BAD
        expect.push(0xff); // None
        expect.extend_from_slice(&1_700_000_000i64.to_be_bytes());
        expect.extend_from_slice(&300i64.to_be_bytes());

        assert_eq!(&buf[..], &expect[..]);
    }

    #[test]
    fn test_absent_tags_and_states() {
        let entry = AlertStateEntry {
            tags: None,
            current_state: None,
            ..fixture()
        };
        let mut buf = BytesMut::new();
        buf.put_u8(1);
        encode_entry(&entry, &mut buf).unwrap();
        buf.put_u8(0);

        assert_eq!(buf[9..11], (-1i16).to_be_bytes());
        assert_eq!(decode_entries(&buf).unwrap(), vec![entry]);
    }

    #[test]
    fn test_decode_errors() {
        let mut buf = BytesMut::new();
        buf.put_u8(1);
        encode_entry(&fixture(), &mut buf).unwrap();

        // Missing terminator.
        assert!(matches!(decode_entries(&buf), Err(Error::MissingBytes)));
        // Truncated entry.
        assert!(matches!(
            decode_entries(&buf[..buf.len() - 3]),
            Err(Error::MissingBytes)
        ));

        // Trailing bytes after the terminator.
        let mut trailing = buf.clone();
        trailing.put_u8(0);
        trailing.put_u8(42);
        assert!(matches!(
            decode_entries(&trailing),
            Err(Error::TrailingBytes(1))
        ));

        // Out-of-range state id.
        let mut bad_state = buf.clone();
        let offset = 1 + 8 + 2 + 4 + 4 + 4 + 6;
        bad_state[offset] = 9;
        bad_state.put_u8(0);
        assert!(matches!(
            decode_entries(&bad_state),
            Err(Error::InvalidState(9))
        ));

        // Negative tag count which isn't the sentinel.
        let mut bad_count = buf.clone();
        bad_count[9..11].copy_from_slice(&(-2i16).to_be_bytes());
        assert!(matches!(
            decode_entries(&bad_count),
            Err(Error::InvalidTagCount(-2))
        ));
    }

    #[test]
    fn test_too_many_tags() {
        let tags = (0..=i16::MAX as usize)
            .map(|i| (i.to_string(), String::new()))
            .collect();
        let entry = AlertStateEntry {
            tags: Some(tags),
            ..fixture()
        };
        assert!(matches!(
            encode_entry(&entry, &mut BytesMut::new()),
            Err(Error::TooManyTags(32768))
        ));
    }
}
