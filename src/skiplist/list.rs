//! The slab-addressed ranked skip list.

use std::cmp::Ordering;

use crate::error::{Result, RungError};
use crate::store::{Found, RankedStore};

use super::{LevelGenerator, DEFAULT_LEVEL_CAPACITY, MAX_LEVEL_CAPACITY};

/// Slot index into the node slab. Slot 0 is the sentinel head.
type NodeId = usize;

const HEAD: NodeId = 0;

/// One forward reference: the next node at this level and the number of
/// level-0 hops the reference covers.
#[derive(Debug, Clone, Copy, Default)]
struct Level {
    forward: Option<NodeId>,
    span: u64,
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// A slab slot. `entry` is `None` only for the sentinel and for freed
/// slots awaiting reuse; live nodes always carry an entry. The level vector
/// is sized to the node's drawn height (the sentinel gets the full level
/// capacity so every level always has a starting point).
#[derive(Debug)]
struct Node<K, V> {
    entry: Option<Entry<K, V>>,
    backward: Option<NodeId>,
    levels: Vec<Level>,
}

impl<K, V> Node<K, V> {
    fn sentinel(level_capacity: usize) -> Self {
        Self {
            entry: None,
            backward: None,
            levels: vec![Level::default(); level_capacity],
        }
    }
}

/// Ordered key-value map with O(log n) insert/lookup/delete where every
/// lookup also reports the key's 1-based rank.
///
/// Keys are pairwise distinct; inserting an existing key fails with
/// [`RungError::DuplicateKey`] and mutates nothing. Values are immutable
/// once stored (update = delete + insert).
///
/// Nodes live in a `Vec` slab and address each other by slot index; freed
/// slots are recycled through a free list. No operation synchronizes:
/// wrap the list in a lock for shared use.
#[derive(Debug)]
pub struct SkipList<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<NodeId>,
    tail: Option<NodeId>,
    len: u64,
    level: usize,
    level_capacity: usize,
    heights: LevelGenerator,
}

impl<K: Ord, V> SkipList<K, V> {
    /// An empty list drawing heights up to `level_capacity` (clamped to
    /// `1..=`[`MAX_LEVEL_CAPACITY`]) from an entropy-seeded generator.
    pub fn new(level_capacity: usize) -> Self {
        Self::with_generator(LevelGenerator::new(level_capacity))
    }

    /// An empty list with a deterministic height sequence. Two lists built
    /// from the same seed and the same operations have identical shape.
    pub fn with_seed(level_capacity: usize, seed: u64) -> Self {
        Self::with_generator(LevelGenerator::with_seed(level_capacity, seed))
    }

    fn with_generator(heights: LevelGenerator) -> Self {
        let level_capacity = heights.capacity();
        Self {
            nodes: vec![Node::sentinel(level_capacity)],
            free: Vec::new(),
            tail: None,
            len: 0,
            level: 1,
            level_capacity,
            heights,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current maximum node height in use (1 even when empty; never
    /// shrinks on delete).
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn level_capacity(&self) -> usize {
        self.level_capacity
    }

    /// Insert a new key. `DuplicateKey` aborts before any mutation.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        let mut update = [HEAD; MAX_LEVEL_CAPACITY];
        let mut rank = [0u64; MAX_LEVEL_CAPACITY];

        // Descend from the top level, recording at each level the last
        // node strictly before the key (update[i]) and its rank (rank[i]).
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            loop {
                let link = self.link(x, i);
                let Some(next) = link.forward else { break };
                match self.key_of(next).map(|k| k.cmp(&key)) {
                    Some(Ordering::Less) => {
                        rank[i] += link.span;
                        x = next;
                    }
                    Some(Ordering::Equal) => return Err(RungError::DuplicateKey),
                    _ => break,
                }
            }
            update[i] = x;
        }

        let height = self.heights.next_height();
        if height > self.level {
            // Fresh levels start at the sentinel with a span covering the
            // whole list; the splice below carves the new node out of it.
            for i in self.level..height {
                rank[i] = 0;
                update[i] = HEAD;
                self.link_mut(HEAD, i).span = self.len;
            }
            self.level = height;
        }

        let id = self.allocate(key, value, height);

        // Splice into every level up to the node's height. rank[0] - rank[i]
        // is the distance from update[i] to the new node's position.
        for i in 0..height {
            let up = update[i];
            let old = self.link(up, i);
            *self.link_mut(id, i) = Level {
                forward: old.forward,
                span: old.span - (rank[0] - rank[i]),
            };
            *self.link_mut(up, i) = Level {
                forward: Some(id),
                span: rank[0] - rank[i] + 1,
            };
        }

        // Levels above the node's height now cover one more element.
        for i in height..self.level {
            self.link_mut(update[i], i).span += 1;
        }

        self.nodes[id].backward = (update[0] != HEAD).then_some(update[0]);
        match self.link(id, 0).forward {
            Some(next) => self.nodes[next].backward = Some(id),
            None => self.tail = Some(id),
        }

        self.len += 1;
        Ok(())
    }

    /// Value and rank for `key`. Rank accumulates the span of every hop on
    /// the search path including the final hop onto the key itself.
    pub fn lookup(&self, key: &K) -> Result<Found<&V>> {
        let mut x = HEAD;
        let mut rank = 0u64;
        for i in (0..self.level).rev() {
            loop {
                let link = self.link(x, i);
                let Some(next) = link.forward else { break };
                let Some(entry) = self.entry_of(next) else { break };
                match entry.key.cmp(key) {
                    Ordering::Less => {
                        rank += link.span;
                        x = next;
                    }
                    Ordering::Equal => {
                        rank += link.span;
                        return Ok(Found {
                            value: &entry.value,
                            rank,
                        });
                    }
                    Ordering::Greater => break,
                }
            }
        }
        Err(RungError::KeyNotFound)
    }

    /// Remove `key`, splicing it out of every level it participates in and
    /// recycling its slab slot.
    pub fn delete(&mut self, key: &K) -> Result<()> {
        let mut update = [HEAD; MAX_LEVEL_CAPACITY];

        // Strictly-less descent: update[0] ends immediately before the
        // candidate node at level 0.
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            loop {
                let link = self.link(x, i);
                let Some(next) = link.forward else { break };
                match self.key_of(next).map(|k| k.cmp(key)) {
                    Some(Ordering::Less) => x = next,
                    _ => break,
                }
            }
            update[i] = x;
        }

        let Some(target) = self.link(update[0], 0).forward else {
            return Err(RungError::KeyNotFound);
        };
        if self.key_of(target) != Some(key) {
            return Err(RungError::KeyNotFound);
        }

        // Levels that point at the target absorb its span; levels that
        // merely cross it shrink by one.
        for i in 0..self.level {
            let up = update[i];
            let old = self.link(up, i);
            if old.forward == Some(target) {
                let absorbed = self.link(target, i);
                *self.link_mut(up, i) = Level {
                    forward: absorbed.forward,
                    span: old.span + absorbed.span - 1,
                };
            } else {
                self.link_mut(up, i).span -= 1;
            }
        }

        let backward = self.nodes[target].backward;
        match self.link(target, 0).forward {
            Some(next) => self.nodes[next].backward = backward,
            None => self.tail = backward,
        }

        self.len -= 1;
        self.release(target);
        Ok(())
    }

    /// Drop every entry. Slab and free list are reset; the level capacity
    /// and height generator are kept.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        for link in &mut self.nodes[HEAD].levels {
            *link = Level::default();
        }
        self.free.clear();
        self.tail = None;
        self.len = 0;
        self.level = 1;
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            next: self.link(HEAD, 0).forward,
        }
    }

    /// Entries in descending key order, walked over the backward chain.
    pub fn iter_rev(&self) -> IterRev<'_, K, V> {
        IterRev {
            list: self,
            next: self.tail,
        }
    }

    // -------------------------------------------------------------------------
    // Slab plumbing
    // -------------------------------------------------------------------------

    fn link(&self, id: NodeId, level: usize) -> Level {
        self.nodes[id].levels[level]
    }

    fn link_mut(&mut self, id: NodeId, level: usize) -> &mut Level {
        &mut self.nodes[id].levels[level]
    }

    fn entry_of(&self, id: NodeId) -> Option<&Entry<K, V>> {
        self.nodes[id].entry.as_ref()
    }

    fn key_of(&self, id: NodeId) -> Option<&K> {
        self.entry_of(id).map(|entry| &entry.key)
    }

    /// Take a recycled slot or extend the slab. Links are zeroed; the
    /// caller splices them.
    fn allocate(&mut self, key: K, value: V, height: usize) -> NodeId {
        let entry = Some(Entry { key, value });
        match self.free.pop() {
            Some(id) => {
                let node = &mut self.nodes[id];
                node.entry = entry;
                node.backward = None;
                node.levels.clear();
                node.levels.resize(height, Level::default());
                id
            }
            None => {
                self.nodes.push(Node {
                    entry,
                    backward: None,
                    levels: vec![Level::default(); height],
                });
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        node.entry = None;
        node.backward = None;
        node.levels.clear();
        self.free.push(id);
    }
}

impl<K: Ord, V> Default for SkipList<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL_CAPACITY)
    }
}

impl<K, V> RankedStore for SkipList<K, V>
where
    K: Ord + std::fmt::Debug,
    V: Clone,
{
    type Key = K;
    type Value = V;

    fn insert(&mut self, key: K, value: V) -> Result<()> {
        SkipList::insert(self, key, value)
    }

    fn lookup(&self, key: &K) -> Result<Found<V>> {
        let found = SkipList::lookup(self, key)?;
        Ok(Found {
            value: found.value.clone(),
            rank: found.rank,
        })
    }

    fn delete(&mut self, key: &K) -> Result<()> {
        SkipList::delete(self, key)
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn clear(&mut self) -> Result<()> {
        SkipList::clear(self);
        Ok(())
    }

    fn scan(&self, visit: &mut dyn FnMut(&K, &V) -> Result<()>) -> Result<()> {
        for (key, value) in self.iter() {
            visit(key, value)?;
        }
        Ok(())
    }
}

/// Forward iterator over the level-0 chain.
pub struct Iter<'a, K, V> {
    list: &'a SkipList<K, V>,
    next: Option<NodeId>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let entry = self.list.nodes[id].entry.as_ref()?;
        self.next = self.list.nodes[id].levels[0].forward;
        Some((&entry.key, &entry.value))
    }
}

/// Backward iterator from the tail.
pub struct IterRev<'a, K, V> {
    list: &'a SkipList<K, V>,
    next: Option<NodeId>,
}

impl<'a, K, V> Iterator for IterRev<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let entry = self.list.nodes[id].entry.as_ref()?;
        self.next = self.list.nodes[id].backward;
        Some((&entry.key, &entry.value))
    }
}
