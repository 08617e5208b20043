//! Log record encoding.

use std::io::Read;

use bytes::BufMut;

use crate::error::{Result, RungError};

use super::MAX_BLOB_LEN;

/// On-disk operation tag for an insert.
pub const OP_INSERT: u32 = 2;

/// On-disk operation tag for a delete.
pub const OP_DELETE: u32 = 3;

/// One decoded log record. Key and value are the codec's byte blobs; the
/// durability layer turns them back into typed keys and values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Insert {
        timestamp: u64,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        timestamp: u64,
        key: Vec<u8>,
    },
}

impl LogRecord {
    /// Wall-clock seconds the operation was applied at.
    pub fn timestamp(&self) -> u64 {
        match self {
            LogRecord::Insert { timestamp, .. } | LogRecord::Delete { timestamp, .. } => *timestamp,
        }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            LogRecord::Insert { key, .. } | LogRecord::Delete { key, .. } => key,
        }
    }

    /// Append the on-disk form to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            LogRecord::Insert {
                timestamp,
                key,
                value,
            } => {
                buf.put_u64_le(*timestamp);
                buf.put_u32_le(OP_INSERT);
                put_blob(buf, key);
                put_blob(buf, value);
            }
            LogRecord::Delete { timestamp, key } => {
                buf.put_u64_le(*timestamp);
                buf.put_u32_le(OP_DELETE);
                put_blob(buf, key);
            }
        }
    }
}

/// Length-prefixed blob: u64 LE length, then the bytes.
pub(crate) fn put_blob(buf: &mut Vec<u8>, data: &[u8]) {
    buf.put_u64_le(data.len() as u64);
    buf.put_slice(data);
}

/// Outcome of one fixed-width read: the bytes, a clean end of file before
/// the first byte, or a hard failure.
pub(crate) enum ReadStep<T> {
    Done(T),
    Eof,
}

/// Read exactly `N` bytes, reporting EOF-before-first-byte and
/// EOF-mid-read separately. The log reader treats both as a clean end
/// (truncated tail); the snapshot reader only tolerates the former.
pub(crate) fn read_array<const N: usize, R: Read>(reader: &mut R) -> Result<ReadStep<[u8; N]>> {
    let mut raw = [0u8; N];
    let mut filled = 0;
    while filled < N {
        match reader.read(&mut raw[filled..]) {
            Ok(0) if filled == 0 => return Ok(ReadStep::Eof),
            Ok(0) => {
                return Err(RungError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "record cut short",
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RungError::Io(e)),
        }
    }
    Ok(ReadStep::Done(raw))
}

/// Read one length-prefixed blob. EOF before the length is `Eof`; EOF
/// anywhere after it is `UnexpectedEof`.
pub(crate) fn read_blob<R: Read>(reader: &mut R) -> Result<ReadStep<Vec<u8>>> {
    let len = match read_array::<8, _>(reader)? {
        ReadStep::Done(raw) => u64::from_le_bytes(raw),
        ReadStep::Eof => return Ok(ReadStep::Eof),
    };
    if len > MAX_BLOB_LEN {
        return Err(RungError::Format(format!(
            "blob length {len} exceeds the {MAX_BLOB_LEN}-byte cap"
        )));
    }
    let mut data = vec![0u8; len as usize];
    let mut filled = 0;
    while filled < data.len() {
        match reader.read(&mut data[filled..]) {
            Ok(0) => {
                return Err(RungError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "blob cut short",
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RungError::Io(e)),
        }
    }
    Ok(ReadStep::Done(data))
}
