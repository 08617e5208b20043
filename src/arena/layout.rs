//! Region geometry: every offset in the mapped file derives from the
//! constants and arithmetic here, nothing else does address math.

/// Region header, 7 fixed u64-width fields.
pub(crate) const HEADER_SIZE: usize = 56;

/// Integrity tag at offset 0. A region whose first 8 bytes differ is
/// reformatted on attach.
pub(crate) const MAGIC: [u8; 8] = *b"RUNGKV01";

pub(crate) const H_MAGIC: usize = 0;
pub(crate) const H_LEN: usize = 8;
pub(crate) const H_CAPACITY: usize = 16;
pub(crate) const H_TAIL: usize = 24;
pub(crate) const H_LEVEL_CAPACITY: usize = 32;
pub(crate) const H_LEVEL: usize = 40;
pub(crate) const H_ALLOC_BOUNDARY: usize = 48;

/// One level entry in a slot: forward slot index + span.
pub(crate) const LINK_SIZE: usize = 16;

/// Little-endian u64 out of an arbitrary buffer.
pub(crate) fn u64_from(buf: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

/// Slot and array offsets for one (key size, value size, level capacity)
/// instantiation. Capacity is passed where it matters because growth
/// doubles it while the rest of the geometry is fixed at format time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub key_size: usize,
    pub value_size: usize,
    pub level_capacity: usize,
}

impl Layout {
    pub fn new(key_size: usize, value_size: usize, level_capacity: usize) -> Self {
        Self {
            key_size,
            value_size,
            level_capacity,
        }
    }

    /// Bytes per node table slot: key, value, backward, full level array.
    /// Every slot reserves all `level_capacity` levels regardless of the
    /// node's drawn height.
    pub fn slot_size(&self) -> usize {
        self.key_size + self.value_size + 8 + LINK_SIZE * self.level_capacity
    }

    /// Total region size for `capacity` usable slots (+1 sentinel slot and
    /// the two permutation arrays).
    pub fn total_size(&self, capacity: u64) -> u64 {
        let slots = capacity + 1;
        HEADER_SIZE as u64 + slots * (self.slot_size() as u64 + 16)
    }

    pub fn slot_offset(&self, slot: u64) -> usize {
        HEADER_SIZE + slot as usize * self.slot_size()
    }

    pub fn key_offset(&self, slot: u64) -> usize {
        self.slot_offset(slot)
    }

    pub fn value_offset(&self, slot: u64) -> usize {
        self.slot_offset(slot) + self.key_size
    }

    pub fn backward_offset(&self, slot: u64) -> usize {
        self.slot_offset(slot) + self.key_size + self.value_size
    }

    pub fn link_offset(&self, slot: u64, level: usize) -> usize {
        self.backward_offset(slot) + 8 + level * LINK_SIZE
    }

    /// Start of the `slot_order` array, right after the node table.
    pub fn slot_order_offset(&self, capacity: u64, position: u64) -> usize {
        self.slot_offset(capacity + 1) + position as usize * 8
    }

    /// Start of the `slot_position` array, right after `slot_order`.
    pub fn slot_position_offset(&self, capacity: u64, slot: u64) -> usize {
        self.slot_order_offset(capacity, capacity + 1) + slot as usize * 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Layout {
        // 8-byte keys, 16-byte values, 4 levels.
        Layout::new(8, 16, 4)
    }

    #[test]
    fn slot_fields_are_contiguous() {
        let l = layout();
        assert_eq!(l.slot_size(), 8 + 16 + 8 + 4 * LINK_SIZE);
        let slot = 3;
        assert_eq!(l.key_offset(slot), l.slot_offset(slot));
        assert_eq!(l.value_offset(slot), l.key_offset(slot) + 8);
        assert_eq!(l.backward_offset(slot), l.value_offset(slot) + 16);
        assert_eq!(l.link_offset(slot, 0), l.backward_offset(slot) + 8);
        assert_eq!(
            l.link_offset(slot, 3) + LINK_SIZE,
            l.slot_offset(slot + 1)
        );
    }

    #[test]
    fn arrays_follow_the_node_table() {
        let l = layout();
        let capacity = 7;
        assert_eq!(
            l.slot_order_offset(capacity, 0),
            l.slot_offset(capacity + 1)
        );
        assert_eq!(
            l.slot_position_offset(capacity, 0),
            l.slot_order_offset(capacity, capacity + 1)
        );
        assert_eq!(
            l.slot_position_offset(capacity, capacity + 1),
            l.total_size(capacity) as usize
        );
    }

    #[test]
    fn total_size_counts_the_sentinel() {
        let l = layout();
        assert_eq!(
            l.total_size(1),
            HEADER_SIZE as u64 + 2 * (l.slot_size() as u64 + 16)
        );
    }

    #[test]
    fn u64_round_trip() {
        let mut buf = vec![0u8; 24];
        buf[8..16].copy_from_slice(&0xdead_beef_u64.to_le_bytes());
        assert_eq!(u64_from(&buf, 8), 0xdead_beef);
    }
}
