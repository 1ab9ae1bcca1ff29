//! Binary encoding of alert state stores, for size-bounded log transports.
//!
//! A store snapshot is written as a stream of physical messages ("frames"):
//! one HEADER, zero or more STATE frames each holding up to a batch of
//! entries, and one FOOTER holding the total count of entries written.
//! Every frame begins with a common prefix:
//!
//! ```text
//! version:u8  alertId:i64  runStampSec:i64  namespace:string  partId:u8
//! ```
//!
//! followed by a part-specific payload:
//!
//! ```text
//! HEADER(1)  nagIntervalSec:i64  storeIdentity:string
//! STATE(2)   (continue:bool=1  entry)*  continue:bool=0
//! FOOTER(3)  count:i64
//! ```
//!
//! and each entry is:
//!
//! ```text
//! stateId:i64  tagCount:i16 (-1: absent)  (key:string value:string)*
//! currentState:i8 (-1: none)  previousState:i8 (-1: none)
//! lastSeenTimestamp:i64  nagIntervalSec:i64
//! ```
//!
//! Integers are big-endian. Strings are a u32 byte length followed by UTF-8.

mod deserializer;
mod entry;
mod frame;
mod serializer;

pub use deserializer::Deserializer;
pub use entry::decode_entries;
pub use frame::{Frame, Header, Part, PartId, Prefix, VERSION};
pub use serializer::{Frames, Serializer, DEFAULT_BATCH_SIZE};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("message is truncated")]
    MissingBytes,
    #[error("unsupported message version {0} (expected {})", VERSION)]
    UnsupportedVersion(u8),
    #[error("unknown message part id {0}")]
    UnknownPart(u8),
    #[error("invalid alert state id {0}")]
    InvalidState(i8),
    #[error("invalid tag count {0}")]
    InvalidTagCount(i16),
    #[error("invalid string length {0}")]
    InvalidLength(u32),
    #[error("string is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("entry has {0} tags, which is more than can be encoded")]
    TooManyTags(usize),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reader over a message, decoding big-endian primitives.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn u8(&mut self) -> Result<u8> {
        use byteorder::ReadBytesExt;
        self.buf.read_u8().map_err(|_| Error::MissingBytes)
    }

    pub fn i8(&mut self) -> Result<i8> {
        use byteorder::ReadBytesExt;
        self.buf.read_i8().map_err(|_| Error::MissingBytes)
    }

    pub fn i16(&mut self) -> Result<i16> {
        use byteorder::{BigEndian, ReadBytesExt};
        self.buf.read_i16::<BigEndian>().map_err(|_| Error::MissingBytes)
    }

    pub fn i64(&mut self) -> Result<i64> {
        use byteorder::{BigEndian, ReadBytesExt};
        self.buf.read_i64::<BigEndian>().map_err(|_| Error::MissingBytes)
    }

    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn string(&mut self) -> Result<String> {
        use byteorder::{BigEndian, ReadBytesExt};
        let len = self
            .buf
            .read_u32::<BigEndian>()
            .map_err(|_| Error::MissingBytes)?;

        let len_usize = usize::try_from(len).map_err(|_| Error::InvalidLength(len))?;
        if self.buf.len() < len_usize {
            return Err(Error::MissingBytes);
        }
        let (s, rest) = self.buf.split_at(len_usize);
        self.buf = rest;

        Ok(String::from_utf8(s.to_vec())?)
    }

    pub fn rest(self) -> &'a [u8] {
        self.buf
    }

    pub fn finish(self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(Error::TrailingBytes(self.buf.len()))
        }
    }
}

pub(crate) fn put_string(buf: &mut bytes::BytesMut, s: &str) {
    use bytes::BufMut;
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}
