//! File-backed shared mapping.
//!
//! A [`Region`] is the raw byte window every arena accessor goes through.
//! It knows nothing about slots or headers; it hands out little-endian
//! integers and byte ranges at offsets the layout computed.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::Result;

use super::layout::u64_from;

pub(crate) struct Region {
    file: File,
    map: MmapMut,
    path: PathBuf,
}

impl Region {
    /// Map `file` as it currently is. The caller has already sized it.
    ///
    /// The mapping is shared: other processes mapping the same file see
    /// every write. Safety rests on the file not being truncated while
    /// mapped; growth is the one place that does, and it replaces the
    /// mapping in the same call.
    pub fn map(file: File, path: PathBuf) -> Result<Self> {
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { file, map, path })
    }

    /// Recreate the backing file at `total` zeroed bytes and remap.
    ///
    /// The old contents are destroyed; the caller holds a copy. If the
    /// remap fails the region is unusable and must be dropped.
    pub fn resize(&mut self, total: u64) -> Result<()> {
        self.file.set_len(0)?;
        self.file.set_len(total)?;
        self.map = unsafe { MmapMut::map_mut(&self.file)? };
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> &[u8] {
        &self.map[..]
    }

    /// Replace the whole region with `image` (same length).
    pub fn overwrite(&mut self, image: &[u8]) {
        self.map[..].copy_from_slice(image);
    }

    pub fn u64_at(&self, offset: usize) -> u64 {
        u64_from(&self.map, offset)
    }

    pub fn set_u64_at(&mut self, offset: usize, value: u64) {
        self.map[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    pub fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.map[offset..offset + len]
    }

    pub fn bytes_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.map[offset..offset + len]
    }

    /// Push dirty pages to the backing file.
    pub fn flush(&self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("path", &self.path)
            .field("len", &self.map.len())
            .finish()
    }
}
