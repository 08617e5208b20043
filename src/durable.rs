//! Crash-durable store wrapper
//!
//! [`DurableStore`] layers the operation log and snapshot protocol over any
//! [`RankedStore`]:
//!
//! - every *applied* insert/delete is mirrored to the log with the current
//!   wall-clock second
//! - `snapshot` writes a verified point-in-time dump of the store
//! - `restore` rebuilds the store as snapshot contents plus every log
//!   record strictly newer than the snapshot, then compacts the log down
//!   to the range it replayed
//!
//! The mirror direction is store-first: a log append failure after an
//! applied mutation is reported, not rolled back, so the store and the log
//! can diverge until the next successful append or snapshot. Rolling back
//! would re-enter the store and can itself fail; the divergence is the
//! documented contract instead.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::LogFlushStrategy;
use crate::error::{Result, RungError};
use crate::store::{Found, RankedStore};
use crate::wal::{BlobCodec, LogReader, LogRecord, LogWriter, SnapshotReader, SnapshotWriter};

/// What a [`DurableStore::restore`] pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Timestamp of the snapshot baseline (0 when restoring from log only).
    pub snapshot_timestamp: u64,
    /// Entries seeded from the snapshot.
    pub snapshot_entries: u64,
    /// Log records at or before the snapshot timestamp, parsed but skipped.
    pub stale: u64,
    /// Log records replayed into the store.
    pub replayed: u64,
}

/// A [`RankedStore`] with an operation log and snapshot/restore protocol.
///
/// Generic over the backing store and a [`BlobCodec`] that serializes both
/// its key and value types, so the same wrapper serves the heap
/// [`SkipList`](crate::skiplist::SkipList) and the shared-memory
/// [`ArenaStore`](crate::arena::ArenaStore).
pub struct DurableStore<S, C> {
    store: S,
    codec: C,
    log_path: PathBuf,
    strategy: LogFlushStrategy,
    writer: LogWriter,
}

impl<S, C> DurableStore<S, C>
where
    S: RankedStore,
    C: BlobCodec<S::Key> + BlobCodec<S::Value>,
{
    /// Wrap `store`, opening (or creating) the operation log at `log_path`.
    ///
    /// The store is taken as-is; call [`DurableStore::restore`] to rebuild
    /// it from the log and an optional snapshot first.
    pub fn open(
        store: S,
        codec: C,
        log_path: impl Into<PathBuf>,
        strategy: LogFlushStrategy,
    ) -> Result<Self> {
        let log_path = log_path.into();
        let writer = LogWriter::open(&log_path, strategy)?;
        Ok(Self {
            store,
            codec,
            log_path,
            strategy,
            writer,
        })
    }

    // =========================================================================
    // Mirrored operations
    // =========================================================================

    /// Insert and mirror to the log. Encoding failures abort before the
    /// store is touched; append failures after the applied insert are
    /// reported and swallowed.
    pub fn insert(&mut self, key: S::Key, value: S::Value) -> Result<()> {
        let key_bytes = self.codec.encode(&key)?;
        let value_bytes = self.codec.encode(&value)?;
        self.store.insert(key, value)?;
        self.log_applied(LogRecord::Insert {
            timestamp: now_secs(),
            key: key_bytes,
            value: value_bytes,
        });
        Ok(())
    }

    /// Delete and mirror to the log, with the same failure contract as
    /// [`DurableStore::insert`].
    pub fn delete(&mut self, key: &S::Key) -> Result<()> {
        let key_bytes = self.codec.encode(key)?;
        self.store.delete(key)?;
        self.log_applied(LogRecord::Delete {
            timestamp: now_secs(),
            key: key_bytes,
        });
        Ok(())
    }

    /// Forwarded to the backing store; reads are never logged.
    pub fn lookup(&self, key: &S::Key) -> Result<Found<S::Value>> {
        self.store.lookup(key)
    }

    pub fn len(&self) -> u64 {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The wrapped store. Mutating it through other means bypasses the log.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Force buffered log records to disk.
    pub fn flush_log(&mut self) -> Result<()> {
        self.writer.flush()
    }

    fn log_applied(&mut self, record: LogRecord) {
        if let Err(e) = self.writer.append(&record) {
            // The mutation is already applied; the log is now behind the
            // store until the next successful append or snapshot.
            tracing::error!(
                log = %self.log_path.display(),
                error = %e,
                "operation applied but not logged"
            );
        }
    }

    // =========================================================================
    // Snapshot / restore
    // =========================================================================

    /// Write a point-in-time dump of the store to `path`.
    ///
    /// Entries stream out in ascending key order; the writer verifies the
    /// entry count against the live length before the snapshot counts as
    /// successful.
    pub fn snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let timestamp = now_secs();
        let mut writer = SnapshotWriter::create(path.as_ref(), timestamp)?;
        let codec = &self.codec;
        self.store.scan(&mut |key, value| {
            writer.append(&codec.encode(key)?, &codec.encode(value)?)
        })?;
        writer.finish(self.store.len())?;
        tracing::info!(
            path = %path.as_ref().display(),
            entries = self.store.len(),
            timestamp,
            "snapshot written"
        );
        Ok(())
    }

    /// Clear the store and seed it from a snapshot, without touching the
    /// log. Returns the snapshot's timestamp.
    pub fn load_snapshot(&mut self, path: impl AsRef<Path>) -> Result<u64> {
        self.store.clear()?;
        let mut reader = SnapshotReader::open(path.as_ref())?;
        while let Some((key_bytes, value_bytes)) = reader.next_entry()? {
            let key: S::Key = self.codec.decode(&key_bytes)?;
            let value: S::Value = self.codec.decode(&value_bytes)?;
            self.store.insert(key, value)?;
        }
        Ok(reader.timestamp())
    }

    /// Rebuild the store from `snapshot` (if given) plus every log record
    /// with a timestamp strictly greater than the snapshot's, in log order.
    ///
    /// Stale records are parsed but skipped; that walk locates the boundary
    /// between provably-applied history and live records. Replay mismatches
    /// (an insert that collides, a delete that misses) are warnings, since
    /// only applied operations were ever logged. A truncated trailing
    /// record ends replay cleanly; an unknown tag aborts with
    /// [`RungError::Format`], keeping everything already replayed and
    /// leaving the log file untouched.
    ///
    /// Afterwards the log is compacted to exactly the replayed range — or
    /// truncated to empty when nothing was newer than the snapshot.
    pub fn restore(&mut self, snapshot: Option<&Path>) -> Result<RestoreSummary> {
        let snapshot_timestamp = match snapshot {
            Some(path) => self.load_snapshot(path)?,
            None => {
                self.store.clear()?;
                0
            }
        };
        let mut summary = RestoreSummary {
            snapshot_timestamp,
            snapshot_entries: self.store.len(),
            stale: 0,
            replayed: 0,
        };
        if !self.log_path.exists() {
            return Ok(summary);
        }

        let mut reader = LogReader::open(&self.log_path)?;
        let mut valid_start: Option<u64> = None;
        loop {
            let start = reader.offset();
            let Some(record) = reader.next_record()? else {
                break;
            };
            if record.timestamp() <= snapshot_timestamp {
                summary.stale += 1;
                continue;
            }
            if valid_start.is_none() {
                valid_start = Some(start);
            }
            summary.replayed += 1;
            self.apply_record(record)?;
        }
        let valid_end = reader.offset();
        drop(reader);

        self.compact_log(valid_start, valid_end)?;
        self.writer = LogWriter::open(&self.log_path, self.strategy)?;

        tracing::info!(
            log = %self.log_path.display(),
            stale = summary.stale,
            replayed = summary.replayed,
            entries = self.store.len(),
            "restore finished"
        );
        Ok(summary)
    }

    fn apply_record(&mut self, record: LogRecord) -> Result<()> {
        match record {
            LogRecord::Insert { key, value, .. } => {
                let key: S::Key = self.codec.decode(&key)?;
                let value: S::Value = self.codec.decode(&value)?;
                let shown = format!("{key:?}");
                match self.store.insert(key, value) {
                    Ok(()) => {}
                    Err(RungError::DuplicateKey) => {
                        tracing::warn!(key = %shown, "replayed insert collided with a live key");
                    }
                    Err(e) => return Err(e),
                }
            }
            LogRecord::Delete { key, .. } => {
                let key: S::Key = self.codec.decode(&key)?;
                match self.store.delete(&key) {
                    Ok(()) => {}
                    Err(RungError::KeyNotFound) => {
                        tracing::warn!(key = ?key, "replayed delete found nothing to remove");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Retain exactly `valid_start..valid_end` of the log file. `None`
    /// means no record survived the boundary: truncate to empty. When the
    /// range already is the whole file there is nothing to rewrite.
    fn compact_log(&self, valid_start: Option<u64>, valid_end: u64) -> Result<()> {
        let Some(start) = valid_start else {
            File::create(&self.log_path)?;
            tracing::debug!(log = %self.log_path.display(), "log truncated to empty");
            return Ok(());
        };
        let file_len = std::fs::metadata(&self.log_path)?.len();
        if start == 0 && valid_end == file_len {
            return Ok(());
        }

        let mut file = File::open(&self.log_path)?;
        file.seek(SeekFrom::Start(start))?;
        let mut keep = vec![0u8; (valid_end - start) as usize];
        file.read_exact(&mut keep)?;
        drop(file);
        std::fs::write(&self.log_path, &keep)?;
        tracing::debug!(
            log = %self.log_path.display(),
            dropped = file_len - keep.len() as u64,
            retained = keep.len(),
            "log compacted"
        );
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
