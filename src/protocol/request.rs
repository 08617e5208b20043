//! Request definitions.

use crate::blob::Blob;

/// Wire tag for a lookup.
pub const TAG_GET: i32 = 1;

/// Wire tag for an insert.
pub const TAG_SET: i32 = 2;

/// Wire tag for a delete.
pub const TAG_DEL: i32 = 3;

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Look a key up, answering its value and rank.
    Get { key: Blob },

    /// Insert a key/value pair.
    Set { key: Blob, value: Blob },

    /// Delete a key.
    Del { key: Blob },
}

impl Request {
    pub fn tag(&self) -> i32 {
        match self {
            Request::Get { .. } => TAG_GET,
            Request::Set { .. } => TAG_SET,
            Request::Del { .. } => TAG_DEL,
        }
    }

    pub fn key(&self) -> &Blob {
        match self {
            Request::Get { key } | Request::Set { key, .. } | Request::Del { key } => key,
        }
    }
}
