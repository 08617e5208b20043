//! Append side of the operation log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::config::LogFlushStrategy;
use crate::error::Result;

use super::record::LogRecord;

/// Appends records to the log file.
///
/// Each record is serialized into a reusable buffer and written with a
/// single `write_all`, so a crash leaves at most one truncated record at
/// the tail — exactly the case the reader treats as a clean end.
///
/// The flush strategy decides when appends are fsynced: `EveryWrite` pays
/// one `sync_all` per record, `EveryN` batches and trades a bounded window
/// of recent records for throughput.
pub struct LogWriter {
    file: File,
    strategy: LogFlushStrategy,
    /// Records appended since the last fsync.
    pending: usize,
    /// Reusable scratch buffer, cleared per append.
    buf: Vec<u8>,
}

impl LogWriter {
    /// Open (or create) the log at `path` in append mode.
    pub fn open(path: impl AsRef<Path>, strategy: LogFlushStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            file,
            strategy,
            pending: 0,
            buf: Vec::with_capacity(256),
        })
    }

    /// Append one record and apply the flush strategy.
    pub fn append(&mut self, record: &LogRecord) -> Result<()> {
        self.buf.clear();
        record.encode(&mut self.buf);
        self.file.write_all(&self.buf)?;
        self.pending += 1;

        match self.strategy {
            LogFlushStrategy::EveryWrite => self.flush()?,
            LogFlushStrategy::EveryN { count } => {
                if self.pending >= count {
                    self.flush()?;
                }
            }
        }
        Ok(())
    }

    /// Push everything appended so far to disk (fsync).
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        self.pending = 0;
        Ok(())
    }
}
