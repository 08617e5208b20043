//! Response definitions.

use crate::blob::Blob;

/// Successful SET/DEL; a successful GET carries the rank instead.
pub const STATUS_OK: i32 = 0;

/// SET found the key already present.
pub const STATUS_DUPLICATE: i32 = 1;

/// GET/DEL found no such key.
pub const STATUS_NOT_FOUND: i32 = -1;

/// The request frame could not be parsed.
pub const STATUS_INVALID_REQUEST: i32 = -10;

/// The store failed for a reason other than the key.
pub const STATUS_INTERNAL: i32 = -11;

/// An unset message; seeing this on the wire is a client-side bug.
pub const STATUS_EMPTY: i32 = -127;

/// A server reply. The status field carries the operation's result; the
/// key echoes the request and the value is filled for successful GETs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: i32,
    pub key: Blob,
    pub value: Blob,
}

impl Response {
    /// Successful GET: rank in the status field, value alongside.
    pub fn found(key: Blob, value: Blob, rank: i32) -> Self {
        Self {
            status: rank,
            key,
            value,
        }
    }

    /// Successful SET or DEL.
    pub fn ok(key: Blob) -> Self {
        Self {
            status: STATUS_OK,
            key,
            value: Blob::empty(),
        }
    }

    pub fn status(status: i32, key: Blob) -> Self {
        Self {
            status,
            key,
            value: Blob::empty(),
        }
    }

    pub fn invalid_request() -> Self {
        Self {
            status: STATUS_INVALID_REQUEST,
            key: Blob::empty(),
            value: Blob::empty(),
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: STATUS_EMPTY,
            key: Blob::empty(),
            value: Blob::empty(),
        }
    }
}
