use crate::{put_string, Error, Reader};
use bytes::{BufMut, BytesMut};

/// Version of the message encoding written by this crate.
pub const VERSION: u8 = 1;

/// Prefix shared by every message of a store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prefix {
    pub version: u8,
    pub alert_id: i64,
    pub run_stamp_sec: i64,
    pub namespace: String,
}

impl Prefix {
    pub fn new(namespace: impl Into<String>, alert_id: i64, run_stamp_sec: i64) -> Self {
        Self {
            version: VERSION,
            alert_id,
            run_stamp_sec,
            namespace: namespace.into(),
        }
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.version);
        buf.put_i64(self.alert_id);
        buf.put_i64(self.run_stamp_sec);
        put_string(buf, &self.namespace);
    }

    fn decode(r: &mut Reader<'_>) -> crate::Result<Self> {
        let version = r.u8()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(Self {
            version,
            alert_id: r.i64()?,
            run_stamp_sec: r.i64()?,
            namespace: r.string()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartId {
    Header = 1,
    State = 2,
    Footer = 3,
}

impl TryFrom<u8> for PartId {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(PartId::Header),
            2 => Ok(PartId::State),
            3 => Ok(PartId::Footer),
            id => Err(Error::UnknownPart(id)),
        }
    }
}

/// Payload of a HEADER message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Nag interval of the store when it was written.
    pub nag_interval_sec: i64,
    pub store_identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part<'m> {
    Header(Header),
    /// Encoded entries, decoded by [`crate::Deserializer::update`] or
    /// [`crate::decode_entries`].
    State(&'m [u8]),
    Footer { count: i64 },
}

impl Part<'_> {
    pub fn id(&self) -> PartId {
        match self {
            Part::Header(_) => PartId::Header,
            Part::State(_) => PartId::State,
            Part::Footer { .. } => PartId::Footer,
        }
    }
}

/// A decoded message. STATE payloads borrow from the message buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'m> {
    pub prefix: Prefix,
    pub part: Part<'m>,
}

impl<'m> Frame<'m> {
    pub fn decode(message: &'m [u8]) -> crate::Result<Self> {
        let mut r = Reader::new(message);
        let prefix = Prefix::decode(&mut r)?;

        let part = match PartId::try_from(r.u8()?)? {
            PartId::Header => {
                let header = Header {
                    nag_interval_sec: r.i64()?,
                    store_identity: r.string()?,
                };
                r.finish()?;
                Part::Header(header)
            }
            PartId::State => Part::State(r.rest()),
            PartId::Footer => {
                let count = r.i64()?;
                r.finish()?;
                Part::Footer { count }
            }
        };

        Ok(Frame { prefix, part })
    }
}
