//! 4-ary array heap over block ids.
//!
//! The heap stores only block ids; ordering keys are read through a closure
//! from the block cache, so a block's key can change in place and be
//! re-sifted without a remove/insert. A position map gives O(1) lookup from
//! block to slot.

use crate::domain::{Amount, BlockId};

use super::block::HeapKind;

/// Branching factor.
pub const ARITY: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct BlockHeap {
    nodes: Vec<BlockId>,
    /// `slots[block]` is the block's position in `nodes`, `None` if absent.
    slots: Vec<Option<usize>>,
}

impl BlockHeap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The block holding the extremum.
    #[must_use]
    pub fn root(&self) -> Option<BlockId> {
        self.nodes.first().copied()
    }

    /// Direct children of the root.
    pub fn root_children(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.nodes.iter().skip(1).take(ARITY).copied()
    }

    /// Block stored at `slot`.
    #[must_use]
    pub fn block_at(&self, slot: usize) -> Option<BlockId> {
        self.nodes.get(slot).copied()
    }

    /// Children of the node at `slot`, with their slots.
    pub fn children(&self, slot: usize) -> impl Iterator<Item = (usize, BlockId)> + '_ {
        let first = slot * ARITY + 1;
        self.nodes
            .iter()
            .enumerate()
            .skip(first)
            .take(ARITY)
            .map(|(slot, block)| (slot, *block))
    }

    /// Current slot of `block`.
    #[must_use]
    pub fn slot_of(&self, block: BlockId) -> Option<usize> {
        self.slots.get(block.index()).copied().flatten()
    }

    #[must_use]
    pub fn contains(&self, block: BlockId) -> bool {
        self.slot_of(block).is_some()
    }

    /// Insert a block not yet in the heap.
    pub fn push<F>(&mut self, block: BlockId, kind: HeapKind, key: F)
    where
        F: Fn(BlockId) -> Amount,
    {
        if self.contains(block) {
            self.reposition(block, kind, key);
            return;
        }
        if self.slots.len() <= block.index() {
            self.slots.resize(block.index() + 1, None);
        }
        let slot = self.nodes.len();
        self.nodes.push(block);
        self.slots[block.index()] = Some(slot);
        self.sift_up(slot, kind, &key);
    }

    /// Restore heap order after `block`'s key moved in either direction.
    pub fn reposition<F>(&mut self, block: BlockId, kind: HeapKind, key: F)
    where
        F: Fn(BlockId) -> Amount,
    {
        let Some(slot) = self.slot_of(block) else {
            return;
        };
        let slot = self.sift_up(slot, kind, &key);
        self.sift_down(slot, kind, &key);
    }

    fn sift_up<F>(&mut self, mut slot: usize, kind: HeapKind, key: &F) -> usize
    where
        F: Fn(BlockId) -> Amount,
    {
        while slot > 0 {
            let parent = (slot - 1) / ARITY;
            if !kind.beats(key(self.nodes[slot]), key(self.nodes[parent])) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
        slot
    }

    fn sift_down<F>(&mut self, mut slot: usize, kind: HeapKind, key: &F) -> usize
    where
        F: Fn(BlockId) -> Amount,
    {
        loop {
            let first_child = slot * ARITY + 1;
            if first_child >= self.nodes.len() {
                return slot;
            }
            let last_child = (first_child + ARITY).min(self.nodes.len());
            let mut best = first_child;
            for child in first_child + 1..last_child {
                if kind.beats(key(self.nodes[child]), key(self.nodes[best])) {
                    best = child;
                }
            }
            if !kind.beats(key(self.nodes[best]), key(self.nodes[slot])) {
                return slot;
            }
            self.swap(slot, best);
            slot = best;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.nodes.swap(a, b);
        self.slots[self.nodes[a].index()] = Some(a);
        self.slots[self.nodes[b].index()] = Some(b);
    }

    /// Check the heap property and the position map. Test helper.
    #[cfg(test)]
    pub(crate) fn is_consistent<F>(&self, kind: HeapKind, key: F) -> bool
    where
        F: Fn(BlockId) -> Amount,
    {
        let ordered = (1..self.nodes.len()).all(|slot| {
            let parent = (slot - 1) / ARITY;
            !kind.beats(key(self.nodes[slot]), key(self.nodes[parent]))
        });
        let mapped = self
            .nodes
            .iter()
            .enumerate()
            .all(|(slot, block)| self.slot_of(*block) == Some(slot));
        ordered && mapped
    }
}
