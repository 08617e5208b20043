//! Sequential scan side of the operation log.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Result, RungError};

use super::record::{read_array, read_blob, LogRecord, ReadStep, OP_DELETE, OP_INSERT};

/// Reads log records in file order, tracking byte offsets so restore can
/// compact the file down to the range it actually replayed.
///
/// A truncated trailing record ends the scan cleanly: `next_record`
/// returns `None` and [`LogReader::offset`] stays at the end of the last
/// complete record, so the partial bytes fall outside every retained
/// range. An unknown operation tag is a hard [`RungError::Format`] — the
/// bytes are on a record boundary, so the log itself is malformed.
pub struct LogReader {
    reader: BufReader<File>,
    /// End of the last complete record (start of the next one).
    offset: u64,
}

impl LogReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            reader: BufReader::new(file),
            offset: 0,
        })
    }

    /// Byte offset of the next record, or of the end of the last complete
    /// record once the scan has finished.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The next complete record, or `None` at a clean end of file
    /// (including a truncated tail).
    pub fn next_record(&mut self) -> Result<Option<LogRecord>> {
        let record = match self.read_record() {
            Ok(record) => record,
            // EOF inside a record is a partial append, not corruption.
            Err(RungError::Io(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::debug!(offset = self.offset, "log ends in a truncated record");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if let Some(record) = &record {
            self.offset += encoded_len(record);
        }
        Ok(record)
    }

    fn read_record(&mut self) -> Result<Option<LogRecord>> {
        let timestamp = match read_array::<8, _>(&mut self.reader)? {
            ReadStep::Done(raw) => u64::from_le_bytes(raw),
            ReadStep::Eof => return Ok(None),
        };
        let tag = match read_array::<4, _>(&mut self.reader)? {
            ReadStep::Done(raw) => u32::from_le_bytes(raw),
            ReadStep::Eof => return Ok(None),
        };
        match tag {
            OP_INSERT => {
                let ReadStep::Done(key) = read_blob(&mut self.reader)? else {
                    return Ok(None);
                };
                let ReadStep::Done(value) = read_blob(&mut self.reader)? else {
                    return Ok(None);
                };
                Ok(Some(LogRecord::Insert {
                    timestamp,
                    key,
                    value,
                }))
            }
            OP_DELETE => {
                let ReadStep::Done(key) = read_blob(&mut self.reader)? else {
                    return Ok(None);
                };
                Ok(Some(LogRecord::Delete { timestamp, key }))
            }
            other => Err(RungError::Format(format!(
                "unknown log operation tag {other} at offset {}",
                self.offset
            ))),
        }
    }
}

fn encoded_len(record: &LogRecord) -> u64 {
    match record {
        LogRecord::Insert { key, value, .. } => 8 + 4 + 8 + key.len() as u64 + 8 + value.len() as u64,
        LogRecord::Delete { key, .. } => 8 + 4 + 8 + key.len() as u64,
    }
}
