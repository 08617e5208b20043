//! Point-in-time snapshot files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, RungError};

use super::record::{put_blob, read_blob, ReadStep};

/// Streams a snapshot to disk: timestamp header first, then one
/// length-prefixed key/value pair per entry.
///
/// The writer counts entries so [`SnapshotWriter::finish`] can cross-check
/// against the store's live element count before the snapshot is declared
/// good; a mismatch means the scan and the store disagree and the file
/// must not be trusted as a restore baseline.
pub struct SnapshotWriter {
    writer: BufWriter<File>,
    written: u64,
    buf: Vec<u8>,
}

impl SnapshotWriter {
    /// Create (or truncate) the snapshot at `path` and write the header.
    pub fn create(path: impl AsRef<Path>, timestamp: u64) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&timestamp.to_le_bytes())?;
        Ok(Self {
            writer,
            written: 0,
            buf: Vec::with_capacity(256),
        })
    }

    /// Append one key/value pair.
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.buf.clear();
        put_blob(&mut self.buf, key);
        put_blob(&mut self.buf, value);
        self.writer.write_all(&self.buf)?;
        self.written += 1;
        Ok(())
    }

    /// Flush, fsync, and verify the entry count.
    pub fn finish(mut self, expected: u64) -> Result<()> {
        if self.written != expected {
            return Err(RungError::Format(format!(
                "snapshot wrote {} entries but the store holds {expected}",
                self.written
            )));
        }
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}

/// Reads a snapshot back: header timestamp, then entries until end of file.
///
/// Unlike the log, a snapshot is written in one sitting and verified, so a
/// file that ends mid-entry is malformed, not truncated-by-crash:
/// `next_entry` fails with [`RungError::Format`] there.
pub struct SnapshotReader {
    reader: BufReader<File>,
    timestamp: u64,
}

impl SnapshotReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let mut raw = [0u8; 8];
        std::io::Read::read_exact(&mut reader, &mut raw).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                RungError::Format("snapshot too short for a timestamp header".to_string())
            } else {
                RungError::Io(e)
            }
        })?;
        Ok(Self {
            reader,
            timestamp: u64::from_le_bytes(raw),
        })
    }

    /// The point in time the snapshot captures; log records at or before
    /// this second are already reflected in its entries.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The next key/value pair, or `None` at end of file.
    pub fn next_entry(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let key = match read_blob(&mut self.reader) {
            Ok(ReadStep::Done(key)) => key,
            Ok(ReadStep::Eof) => return Ok(None),
            Err(e) => return Err(tighten(e)),
        };
        match read_blob(&mut self.reader) {
            Ok(ReadStep::Done(value)) => Ok(Some((key, value))),
            Ok(ReadStep::Eof) => Err(RungError::Format(
                "snapshot entry has a key but no value".to_string(),
            )),
            Err(e) => Err(tighten(e)),
        }
    }
}

/// A short read inside a snapshot entry is a format problem, not an I/O one.
fn tighten(e: RungError) -> RungError {
    match e {
        RungError::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            RungError::Format("snapshot ends mid-entry".to_string())
        }
        other => other,
    }
}
