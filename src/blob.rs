//! Bounded byte strings
//!
//! [`Blob`] is the key/value type the request service stores: an inline
//! buffer of up to [`MAX_BLOB_PAYLOAD`] bytes. The fixed footprint is what
//! lets it live in a wire frame and in an arena slot without indirection;
//! the unused tail of the buffer is always zeroed so regions and frames
//! never leak heap garbage.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use crate::arena::FixedBytes;
use crate::error::{Result, RungError};

/// Cell size of a blob on the wire and in arena slots.
pub const BLOB_CAPACITY: usize = 1024;

/// Longest representable payload. One byte of the cell is reserved for the
/// wire protocol's NUL terminator.
pub const MAX_BLOB_PAYLOAD: usize = BLOB_CAPACITY - 1;

/// An owned byte string of at most [`MAX_BLOB_PAYLOAD`] bytes.
///
/// Ordering is plain lexicographic over the payload, so blob keys rank the
/// same way `&[u8]` keys would.
#[derive(Clone)]
pub struct Blob {
    len: u16,
    data: [u8; BLOB_CAPACITY],
}

impl Blob {
    /// The empty blob.
    pub const fn empty() -> Self {
        Self {
            len: 0,
            data: [0u8; BLOB_CAPACITY],
        }
    }

    /// Wrap a payload, rejecting anything over [`MAX_BLOB_PAYLOAD`] bytes.
    pub fn new(payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_BLOB_PAYLOAD {
            return Err(RungError::Protocol(format!(
                "blob payload of {} bytes exceeds the {MAX_BLOB_PAYLOAD}-byte limit",
                payload.len()
            )));
        }
        let mut blob = Self::empty();
        blob.len = payload.len() as u16;
        blob.data[..payload.len()].copy_from_slice(payload);
        Ok(blob)
    }

    /// Wrap a payload, silently dropping bytes past [`MAX_BLOB_PAYLOAD`].
    pub fn truncated(payload: &[u8]) -> Self {
        let cut = payload.len().min(MAX_BLOB_PAYLOAD);
        let mut blob = Self::empty();
        blob.len = cut as u16;
        blob.data[..cut].copy_from_slice(&payload[..cut]);
        blob
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Payload as text for display purposes, with invalid UTF-8 replaced.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.payload())
    }
}

impl Default for Blob {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.payload() == other.payload()
    }
}

impl Eq for Blob {}

impl Ord for Blob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.payload().cmp(other.payload())
    }
}

impl PartialOrd for Blob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({:?})", self.to_string_lossy())
    }
}

impl TryFrom<&[u8]> for Blob {
    type Error = RungError;

    fn try_from(payload: &[u8]) -> Result<Self> {
        Blob::new(payload)
    }
}

impl TryFrom<&str> for Blob {
    type Error = RungError;

    fn try_from(payload: &str) -> Result<Self> {
        Blob::new(payload.as_bytes())
    }
}

/// Arena cell encoding: `u16` little-endian payload length, payload bytes,
/// zero padding out to the cell size.
impl FixedBytes for Blob {
    const SIZE: usize = 2 + BLOB_CAPACITY;

    fn write_to(&self, buf: &mut [u8]) {
        buf[..2].copy_from_slice(&self.len.to_le_bytes());
        buf[2..2 + BLOB_CAPACITY].copy_from_slice(&self.data);
    }

    fn read_from(buf: &[u8]) -> Result<Self> {
        let len = u16::from_le_bytes([buf[0], buf[1]]);
        if len as usize > MAX_BLOB_PAYLOAD {
            return Err(RungError::RegionCorrupt(format!(
                "blob cell claims {len} payload bytes, limit is {MAX_BLOB_PAYLOAD}"
            )));
        }
        let mut blob = Self::empty();
        blob.len = len;
        blob.data.copy_from_slice(&buf[2..2 + BLOB_CAPACITY]);
        Ok(blob)
    }
}
