//! The arena-backed ranked skip list.

use std::cmp::Ordering;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, RungError};
use crate::skiplist::{LevelGenerator, DEFAULT_LEVEL_CAPACITY, MAX_LEVEL_CAPACITY};
use crate::store::{Found, RankedStore};

use super::layout::{
    u64_from, Layout, HEADER_SIZE, H_ALLOC_BOUNDARY, H_CAPACITY, H_LEN, H_LEVEL,
    H_LEVEL_CAPACITY, H_MAGIC, H_TAIL, MAGIC,
};
use super::region::Region;
use super::{FixedBytes, DEFAULT_INITIAL_CAPACITY};

/// How [`ArenaStore::attach`] opens or creates a region.
#[derive(Debug, Clone)]
pub struct ArenaOptions {
    /// Reuse an existing region when its header checks out. When false the
    /// region is always reformatted.
    pub resume: bool,

    /// Maximum node height for a freshly formatted region. A resumed
    /// region keeps the capacity it was formatted with.
    pub level_capacity: usize,

    /// Slot capacity for a freshly formatted region.
    pub initial_capacity: u64,

    /// Pin the height draw sequence (deterministic tests).
    pub level_seed: Option<u64>,

    /// Delete the region file when the store is dropped.
    pub delete_region_on_close: bool,
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self {
            resume: true,
            level_capacity: DEFAULT_LEVEL_CAPACITY,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            level_seed: None,
            delete_region_on_close: false,
        }
    }
}

impl From<&Config> for ArenaOptions {
    fn from(config: &Config) -> Self {
        Self {
            resume: config.resume,
            level_capacity: config.level_capacity,
            initial_capacity: config.initial_capacity,
            level_seed: None,
            delete_region_on_close: config.delete_region_on_close,
        }
    }
}

/// One forward reference inside a slot: forward slot index (0 = none) and
/// the number of level-0 hops it covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Link {
    forward: u64,
    span: u64,
}

/// Ranked skip list stored entirely inside a file-backed shared mapping.
///
/// Same operations and complexity as the heap [`SkipList`]
/// (`insert`/`lookup`/`delete`, O(log n), lookups report rank), but every
/// node lives in a fixed-size slot addressed by index, so the whole store
/// is one relocatable byte region other processes can attach to.
///
/// Keys and values are fixed-width via [`FixedBytes`]; comparisons decode
/// the key out of the region, which is a copy per hop.
///
/// No internal synchronization: callers serialize access, across processes
/// too. A `RegionGrowth` error means the doubling protocol failed past the
/// point of no return; the store must be dropped.
///
/// [`SkipList`]: crate::skiplist::SkipList
pub struct ArenaStore<K, V> {
    region: Region,
    layout: Layout,
    heights: LevelGenerator,
    delete_on_close: bool,
    _types: PhantomData<(K, V)>,
}

impl<K: FixedBytes + Ord, V: FixedBytes> ArenaStore<K, V> {
    /// Open or create the region file at `path` and attach to it.
    ///
    /// With `options.resume`, an existing file whose header is intact (magic
    /// tag, sane geometry, size matching that geometry) is reused as-is and
    /// its stored level capacity wins over the requested one. Anything
    /// else — missing file, foreign bytes, size mismatch — is formatted
    /// fresh at `options.initial_capacity` slots.
    pub fn attach(path: impl AsRef<Path>, options: ArenaOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if options.level_capacity == 0 || options.level_capacity > MAX_LEVEL_CAPACITY {
            return Err(RungError::Config(format!(
                "level_capacity must be in 1..={MAX_LEVEL_CAPACITY}, got {}",
                options.level_capacity
            )));
        }
        if options.initial_capacity == 0 {
            return Err(RungError::Config(
                "initial_capacity must be at least 1".to_string(),
            ));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let file_len = file.metadata()?.len();

        let mut resumed: Option<(u64, usize)> = None;
        if options.resume && file_len >= HEADER_SIZE as u64 {
            let mut header = [0u8; HEADER_SIZE];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut header)?;
            match Self::header_geometry(&header, file_len) {
                Ok(geometry) => resumed = Some(geometry),
                Err(reason) => {
                    tracing::warn!(path = %path.display(), reason, "region not reusable, reformatting");
                }
            }
        }

        let store = match resumed {
            Some((capacity, level_capacity)) => {
                if level_capacity != options.level_capacity {
                    tracing::debug!(
                        stored = level_capacity,
                        requested = options.level_capacity,
                        "resumed region keeps its own level capacity"
                    );
                }
                let layout = Layout::new(K::SIZE, V::SIZE, level_capacity);
                let region = Region::map(file, path)?;
                let store = Self {
                    region,
                    layout,
                    heights: Self::generator(level_capacity, options.level_seed),
                    delete_on_close: options.delete_region_on_close,
                    _types: PhantomData,
                };
                tracing::info!(
                    path = %store.region.path().display(),
                    len = store.len(),
                    capacity,
                    "attached existing region"
                );
                store
            }
            None => {
                let layout = Layout::new(K::SIZE, V::SIZE, options.level_capacity);
                file.set_len(0)?;
                file.set_len(layout.total_size(options.initial_capacity))?;
                let mut region = Region::map(file, path)?;
                format_region(&mut region, &layout, options.initial_capacity);
                tracing::info!(
                    path = %region.path().display(),
                    capacity = options.initial_capacity,
                    level_capacity = options.level_capacity,
                    "formatted new region"
                );
                Self {
                    region,
                    layout,
                    heights: Self::generator(options.level_capacity, options.level_seed),
                    delete_on_close: options.delete_region_on_close,
                    _types: PhantomData,
                }
            }
        };
        Ok(store)
    }

    fn generator(level_capacity: usize, seed: Option<u64>) -> LevelGenerator {
        match seed {
            Some(seed) => LevelGenerator::with_seed(level_capacity, seed),
            None => LevelGenerator::new(level_capacity),
        }
    }

    /// Validate a peeked header against the file size. Returns
    /// (capacity, level_capacity) when the region is reusable.
    fn header_geometry(
        header: &[u8; HEADER_SIZE],
        file_len: u64,
    ) -> std::result::Result<(u64, usize), &'static str> {
        if header[H_MAGIC..H_MAGIC + 8] != MAGIC {
            return Err("integrity tag mismatch");
        }
        let level_capacity = u64_from(header, H_LEVEL_CAPACITY);
        if level_capacity == 0 || level_capacity > MAX_LEVEL_CAPACITY as u64 {
            return Err("level capacity out of range");
        }
        let capacity = u64_from(header, H_CAPACITY);
        if capacity == 0 {
            return Err("zero capacity");
        }
        let level = u64_from(header, H_LEVEL);
        if level == 0 || level > level_capacity {
            return Err("current level out of range");
        }
        let boundary = u64_from(header, H_ALLOC_BOUNDARY);
        if boundary == 0 || boundary > capacity + 1 {
            return Err("allocator boundary out of range");
        }
        if u64_from(header, H_LEN) != boundary - 1 {
            return Err("length disagrees with allocator boundary");
        }
        if u64_from(header, H_TAIL) > capacity {
            return Err("tail slot out of range");
        }
        let layout = Layout::new(K::SIZE, V::SIZE, level_capacity as usize);
        if layout.total_size(capacity) != file_len {
            return Err("file size disagrees with stored geometry");
        }
        Ok((capacity, level_capacity as usize))
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Insert a new key. Grows the region first when it is full;
    /// `DuplicateKey` aborts before any mutation.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        if self.len() == self.capacity() {
            self.grow()?;
        }

        let mut update = [0u64; MAX_LEVEL_CAPACITY];
        let mut rank = [0u64; MAX_LEVEL_CAPACITY];
        let level = self.level();

        let mut x = 0u64;
        for i in (0..level).rev() {
            rank[i] = if i == level - 1 { 0 } else { rank[i + 1] };
            loop {
                let link = self.link_of(x, i);
                if link.forward == 0 {
                    break;
                }
                let next = self.check_slot(link.forward)?;
                match self.read_key(next)?.cmp(&key) {
                    Ordering::Less => {
                        rank[i] += link.span;
                        x = next;
                    }
                    Ordering::Equal => return Err(RungError::DuplicateKey),
                    Ordering::Greater => break,
                }
            }
            update[i] = x;
        }

        let height = self.heights.next_height();
        if height > level {
            for i in level..height {
                rank[i] = 0;
                update[i] = 0;
                let link = self.link_of(0, i);
                self.set_link(0, i, Link { span: self.len(), ..link });
            }
            self.set_level(height as u64);
        }

        let id = self.allocate_slot(&key, &value)?;

        for i in 0..height {
            let up = update[i];
            let old = self.link_of(up, i);
            self.set_link(
                id,
                i,
                Link {
                    forward: old.forward,
                    span: old.span - (rank[0] - rank[i]),
                },
            );
            self.set_link(
                up,
                i,
                Link {
                    forward: id,
                    span: rank[0] - rank[i] + 1,
                },
            );
        }
        for i in height..level.max(height) {
            let link = self.link_of(update[i], i);
            self.set_link(update[i], i, Link { span: link.span + 1, ..link });
        }

        self.set_backward(id, update[0]);
        let after = self.link_of(id, 0).forward;
        if after != 0 {
            self.set_backward(after, id);
        } else {
            self.set_tail(id);
        }

        self.set_len(self.len() + 1);
        Ok(())
    }

    /// Decode the value and rank for `key`, or `KeyNotFound`.
    pub fn lookup(&self, key: &K) -> Result<Found<V>> {
        let mut x = 0u64;
        let mut rank = 0u64;
        for i in (0..self.level()).rev() {
            loop {
                let link = self.link_of(x, i);
                if link.forward == 0 {
                    break;
                }
                let next = self.check_slot(link.forward)?;
                match self.read_key(next)?.cmp(key) {
                    Ordering::Less => {
                        rank += link.span;
                        x = next;
                    }
                    Ordering::Equal => {
                        rank += link.span;
                        return Ok(Found {
                            value: self.read_value(next)?,
                            rank,
                        });
                    }
                    Ordering::Greater => break,
                }
            }
        }
        Err(RungError::KeyNotFound)
    }

    /// Remove `key` and recycle its slot.
    pub fn delete(&mut self, key: &K) -> Result<()> {
        let mut update = [0u64; MAX_LEVEL_CAPACITY];
        let level = self.level();

        let mut x = 0u64;
        for i in (0..level).rev() {
            loop {
                let link = self.link_of(x, i);
                if link.forward == 0 {
                    break;
                }
                let next = self.check_slot(link.forward)?;
                match self.read_key(next)?.cmp(key) {
                    Ordering::Less => x = next,
                    _ => break,
                }
            }
            update[i] = x;
        }

        let target = self.link_of(update[0], 0).forward;
        if target == 0 {
            return Err(RungError::KeyNotFound);
        }
        let target = self.check_slot(target)?;
        if self.read_key(target)? != *key {
            return Err(RungError::KeyNotFound);
        }

        for i in 0..level {
            let up = update[i];
            let old = self.link_of(up, i);
            if old.forward == target {
                let absorbed = self.link_of(target, i);
                self.set_link(
                    up,
                    i,
                    Link {
                        forward: absorbed.forward,
                        span: old.span + absorbed.span - 1,
                    },
                );
            } else {
                self.set_link(up, i, Link { span: old.span - 1, ..old });
            }
        }

        let backward = self.backward_of(target);
        let after = self.link_of(target, 0).forward;
        if after != 0 {
            self.set_backward(after, backward);
        } else {
            self.set_tail(backward);
        }

        self.set_len(self.len() - 1);
        self.free_slot(target);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Observability
    // -------------------------------------------------------------------------

    pub fn len(&self) -> u64 {
        self.region.u64_at(H_LEN)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usable slots before the next insert triggers growth.
    pub fn capacity(&self) -> u64 {
        self.region.u64_at(H_CAPACITY)
    }

    /// Slots the allocator can still hand out without growing.
    pub fn free_slots(&self) -> u64 {
        self.capacity() + 1 - self.alloc_boundary()
    }

    /// Current maximum node height in the region.
    pub fn level(&self) -> usize {
        self.region.u64_at(H_LEVEL) as usize
    }

    pub fn level_capacity(&self) -> usize {
        self.layout.level_capacity
    }

    /// Delete (true) or keep (false) the region file when this store drops.
    pub fn set_teardown_policy(&mut self, delete_region_on_close: bool) {
        self.delete_on_close = delete_region_on_close;
    }

    /// Reformat the region in place at its current capacity, dropping every
    /// entry. Old slot contents are left behind; nothing references them
    /// once the sentinel and the permutations are reset.
    pub fn clear(&mut self) -> Result<()> {
        let capacity = self.capacity();
        for level in 0..self.layout.level_capacity {
            self.set_link(0, level, Link::default());
        }
        self.set_backward(0, 0);
        let layout = self.layout;
        format_region(&mut self.region, &layout, capacity);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Slot allocator
    // -------------------------------------------------------------------------

    /// O(1) slot allocation: the permutation position at the boundary names
    /// the next free slot. The caller has ensured headroom; a full table
    /// here means the header lied.
    fn allocate_slot(&mut self, key: &K, value: &V) -> Result<u64> {
        let boundary = self.alloc_boundary();
        if boundary > self.capacity() {
            return Err(RungError::AllocationFailure(format!(
                "no free slots at capacity {}",
                self.capacity()
            )));
        }
        let slot = self.check_slot(self.slot_order_at(boundary))?;

        let off = self.layout.key_offset(slot);
        key.write_to(self.region.bytes_mut(off, K::SIZE));
        let off = self.layout.value_offset(slot);
        value.write_to(self.region.bytes_mut(off, V::SIZE));
        self.set_backward(slot, 0);
        for level in 0..self.layout.level_capacity {
            self.set_link(slot, level, Link::default());
        }

        self.set_alloc_boundary(boundary + 1);
        Ok(slot)
    }

    /// O(1) free: swap the released slot's permutation entry to the
    /// position just inside the boundary and shrink the boundary over it.
    fn free_slot(&mut self, slot: u64) {
        let last = self.alloc_boundary() - 1;
        let position = self.slot_position_at(slot);
        let moved = self.slot_order_at(last);
        self.set_slot_order_at(position, moved);
        self.set_slot_order_at(last, slot);
        self.set_slot_position_at(slot, last);
        self.set_slot_position_at(moved, position);
        self.set_alloc_boundary(last);
    }

    /// Double the region: copy everything out, rebuild the doubled image in
    /// memory, recreate the file, copy back. The permutation arrays move to
    /// their new offsets and gain identity entries for the new slots.
    ///
    /// Releasing the old file is the point of no return: an I/O failure
    /// after it loses the region, which is why pre-sizing via
    /// `initial_capacity` beats growing in production.
    fn grow(&mut self) -> Result<()> {
        let old_capacity = self.capacity();
        let new_capacity = old_capacity * 2;
        let old = self.region.contents().to_vec();

        let new_total = self.layout.total_size(new_capacity);
        let mut image = vec![0u8; new_total as usize];

        let table_end = self.layout.slot_offset(old_capacity + 1);
        image[..table_end].copy_from_slice(&old[..table_end]);

        for position in 0..=new_capacity {
            let value = if position <= old_capacity {
                u64_from(&old, self.layout.slot_order_offset(old_capacity, position))
            } else {
                position
            };
            let off = self.layout.slot_order_offset(new_capacity, position);
            image[off..off + 8].copy_from_slice(&value.to_le_bytes());
        }
        for slot in 0..=new_capacity {
            let value = if slot <= old_capacity {
                u64_from(&old, self.layout.slot_position_offset(old_capacity, slot))
            } else {
                slot
            };
            let off = self.layout.slot_position_offset(new_capacity, slot);
            image[off..off + 8].copy_from_slice(&value.to_le_bytes());
        }
        image[H_CAPACITY..H_CAPACITY + 8].copy_from_slice(&new_capacity.to_le_bytes());

        if let Err(e) = self.region.resize(new_total) {
            tracing::error!(
                path = %self.region.path().display(),
                error = %e,
                "region growth failed after releasing the old region"
            );
            return Err(RungError::RegionGrowth(format!(
                "recreating the region at capacity {new_capacity} failed: {e}; the region may be lost"
            )));
        }
        self.region.overwrite(&image);
        tracing::info!(
            path = %self.region.path().display(),
            old_capacity,
            new_capacity,
            "grew arena region"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Region accessors
    // -------------------------------------------------------------------------

    /// Reject slot indices outside the node table before they become
    /// offsets. Anything out of range here is region corruption.
    fn check_slot(&self, raw: u64) -> Result<u64> {
        if raw > self.capacity() {
            return Err(RungError::RegionCorrupt(format!(
                "slot index {raw} out of range (capacity {})",
                self.capacity()
            )));
        }
        Ok(raw)
    }

    fn read_key(&self, slot: u64) -> Result<K> {
        K::read_from(self.region.bytes(self.layout.key_offset(slot), K::SIZE))
    }

    fn read_value(&self, slot: u64) -> Result<V> {
        V::read_from(self.region.bytes(self.layout.value_offset(slot), V::SIZE))
    }

    fn link_of(&self, slot: u64, level: usize) -> Link {
        let off = self.layout.link_offset(slot, level);
        Link {
            forward: self.region.u64_at(off),
            span: self.region.u64_at(off + 8),
        }
    }

    fn set_link(&mut self, slot: u64, level: usize, link: Link) {
        let off = self.layout.link_offset(slot, level);
        self.region.set_u64_at(off, link.forward);
        self.region.set_u64_at(off + 8, link.span);
    }

    fn backward_of(&self, slot: u64) -> u64 {
        self.region.u64_at(self.layout.backward_offset(slot))
    }

    fn set_backward(&mut self, slot: u64, backward: u64) {
        self.region
            .set_u64_at(self.layout.backward_offset(slot), backward);
    }

    fn slot_order_at(&self, position: u64) -> u64 {
        self.region
            .u64_at(self.layout.slot_order_offset(self.capacity(), position))
    }

    fn set_slot_order_at(&mut self, position: u64, slot: u64) {
        let off = self.layout.slot_order_offset(self.capacity(), position);
        self.region.set_u64_at(off, slot);
    }

    fn slot_position_at(&self, slot: u64) -> u64 {
        self.region
            .u64_at(self.layout.slot_position_offset(self.capacity(), slot))
    }

    fn set_slot_position_at(&mut self, slot: u64, position: u64) {
        let off = self.layout.slot_position_offset(self.capacity(), slot);
        self.region.set_u64_at(off, position);
    }

    fn alloc_boundary(&self) -> u64 {
        self.region.u64_at(H_ALLOC_BOUNDARY)
    }

    fn set_alloc_boundary(&mut self, boundary: u64) {
        self.region.set_u64_at(H_ALLOC_BOUNDARY, boundary);
    }

    fn set_len(&mut self, len: u64) {
        self.region.set_u64_at(H_LEN, len);
    }

    fn set_level(&mut self, level: u64) {
        self.region.set_u64_at(H_LEVEL, level);
    }

    fn set_tail(&mut self, slot: u64) {
        self.region.set_u64_at(H_TAIL, slot);
    }
}

/// Write a fresh header and identity permutations. The caller guarantees
/// the sentinel slot is zeroed (a new file arrives zero-filled; `clear`
/// resets the sentinel by hand).
fn format_region(region: &mut Region, layout: &Layout, capacity: u64) {
    region.bytes_mut(H_MAGIC, 8).copy_from_slice(&MAGIC);
    region.set_u64_at(H_LEN, 0);
    region.set_u64_at(H_CAPACITY, capacity);
    region.set_u64_at(H_TAIL, 0);
    region.set_u64_at(H_LEVEL_CAPACITY, layout.level_capacity as u64);
    region.set_u64_at(H_LEVEL, 1);
    region.set_u64_at(H_ALLOC_BOUNDARY, 1);
    for i in 0..=capacity {
        region.set_u64_at(layout.slot_order_offset(capacity, i), i);
        region.set_u64_at(layout.slot_position_offset(capacity, i), i);
    }
}

impl<K, V> RankedStore for ArenaStore<K, V>
where
    K: FixedBytes + Ord + fmt::Debug,
    V: FixedBytes,
{
    type Key = K;
    type Value = V;

    fn insert(&mut self, key: K, value: V) -> Result<()> {
        ArenaStore::insert(self, key, value)
    }

    fn lookup(&self, key: &K) -> Result<Found<V>> {
        ArenaStore::lookup(self, key)
    }

    fn delete(&mut self, key: &K) -> Result<()> {
        ArenaStore::delete(self, key)
    }

    fn len(&self) -> u64 {
        ArenaStore::len(self)
    }

    fn clear(&mut self) -> Result<()> {
        ArenaStore::clear(self)
    }

    fn scan(&self, visit: &mut dyn FnMut(&K, &V) -> Result<()>) -> Result<()> {
        let mut slot = self.link_of(0, 0).forward;
        while slot != 0 {
            let current = self.check_slot(slot)?;
            let key = self.read_key(current)?;
            let value = self.read_value(current)?;
            visit(&key, &value)?;
            slot = self.link_of(current, 0).forward;
        }
        Ok(())
    }
}

impl<K, V> Drop for ArenaStore<K, V> {
    fn drop(&mut self) {
        if self.delete_on_close {
            tracing::debug!(path = %self.region.path().display(), "removing region on close");
            let _ = std::fs::remove_file(self.region.path());
        } else {
            let _ = self.region.flush();
        }
    }
}

impl<K, V> fmt::Debug for ArenaStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaStore")
            .field("path", &self.region.path())
            .field("len", &self.region.u64_at(H_LEN))
            .field("capacity", &self.region.u64_at(H_CAPACITY))
            .field("level_capacity", &self.layout.level_capacity)
            .finish()
    }
}
