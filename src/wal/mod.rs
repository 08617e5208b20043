//! Operation log and snapshot files
//!
//! The durability layer mirrors every applied mutation into an append-only
//! log and periodically writes a full snapshot; restore replays the snapshot
//! and then every log record newer than it. This module owns the two file
//! formats and the pluggable byte codec; the replay policy lives in
//! [`crate::durable`].
//!
//! ## Log File Format
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Record 1                                         │
//! │ ┌──────────┬─────────┬──────────┬──────────────┐ │
//! │ │ time (8) │ tag (4) │ key blob │ [value blob] │ │
//! │ └──────────┴─────────┴──────────┴──────────────┘ │
//! ├──────────────────────────────────────────────────┤
//! │ Record 2 ...                                     │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! - time: unix seconds, little-endian (the crash-ordering unit)
//! - tag: 2 = insert, 3 = delete; the value blob is present only for inserts
//! - blob: u64 LE length followed by that many bytes
//!
//! A truncated trailing record (crash mid-append) is a valid end of file,
//! not corruption: readers stop at the last complete record. There is no
//! per-record checksum; the formats rely on the timestamp boundary and the
//! clean-EOF rule instead.
//!
//! ## Snapshot File Format
//!
//! ```text
//! ┌──────────┬──────────┬────────────┬──────────┬────────────┬─────┐
//! │ time (8) │ key blob │ value blob │ key blob │ value blob │ ... │
//! └──────────┴──────────┴────────────┴──────────┴────────────┴─────┘
//! ```
//!
//! One key/value pair per entry, ascending key order, until end of file.

mod codec;
mod reader;
mod record;
mod snapshot;
mod writer;

pub use codec::{BincodeCodec, BlobCodec, RawCodec};
pub use reader::LogReader;
pub use record::{LogRecord, OP_DELETE, OP_INSERT};
pub use snapshot::{SnapshotReader, SnapshotWriter};
pub use writer::LogWriter;

/// Blobs past this length are rejected as malformed rather than allocated.
/// Nothing legitimate comes close; a length this large means the cursor is
/// not on a record boundary.
pub(crate) const MAX_BLOB_LEN: u64 = 64 * 1024 * 1024;
