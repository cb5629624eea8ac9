//! Block index plus extremum heap for one (account, market, kind).

use rust_decimal::Decimal;

use crate::domain::{Amount, BlockId, OutcomeId};

use super::block::{scan_block, scan_block_beyond, BlockExtremum, HeapKind};
use super::heap::BlockHeap;

/// An extremum tilt and the outcome holding it.
///
/// `outcome` is `None` when there is no recorded exposure or when the zero
/// reserve (an expanding market's virtual bucket, or any outcome never
/// touched) is the extremum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiltExtremum {
    pub value: Amount,
    pub outcome: Option<OutcomeId>,
}

impl TiltExtremum {
    /// The result for an account with no exposure.
    pub const NONE: Self = Self {
        value: Decimal::ZERO,
        outcome: None,
    };
}

/// Tracks the global extremum of one heap kind across all blocks.
#[derive(Debug, Clone)]
pub struct ExtremumIndex {
    kind: HeapKind,
    block_size: u32,
    blocks: Vec<Option<BlockExtremum>>,
    heap: BlockHeap,
}

fn cached_value(blocks: &[Option<BlockExtremum>], block: BlockId) -> Amount {
    blocks
        .get(block.index())
        .copied()
        .flatten()
        .map_or(Decimal::ZERO, |cached| cached.value)
}

impl ExtremumIndex {
    #[must_use]
    pub fn new(kind: HeapKind, block_size: u32) -> Self {
        Self {
            kind,
            block_size,
            blocks: Vec::new(),
            heap: BlockHeap::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> HeapKind {
        self.kind
    }

    /// Cached extremum of `block`.
    #[must_use]
    pub fn block(&self, block: BlockId) -> Option<BlockExtremum> {
        self.blocks.get(block.index()).copied().flatten()
    }

    /// Number of blocks with recorded tilt.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.heap.len()
    }

    /// Fold a tilt change into the index.
    ///
    /// `tilts` must already hold `value` at `outcome`; a block rescan reads
    /// it from there.
    pub fn record(&mut self, outcome: OutcomeId, value: Amount, tilts: &[Option<Amount>]) {
        let block = outcome.block(self.block_size);
        if self.blocks.len() <= block.index() {
            self.blocks.resize(block.index() + 1, None);
        }

        let Some(cached) = self.blocks[block.index()] else {
            self.blocks[block.index()] = Some(BlockExtremum { outcome, value });
            let blocks = &self.blocks;
            self.heap
                .push(block, self.kind, |id| cached_value(blocks, id));
            return;
        };

        let updated = if cached.outcome == outcome {
            if self.kind.at_least_as_extreme(value, cached.value) {
                BlockExtremum { outcome, value }
            } else {
                // The holder got less extreme; somebody else may now lead.
                scan_block(self.kind, block, self.block_size, tilts, None)
                    .unwrap_or(BlockExtremum { outcome, value })
            }
        } else if self.kind.beats(value, cached.value) {
            BlockExtremum { outcome, value }
        } else {
            return;
        };

        self.blocks[block.index()] = Some(updated);
        if updated.value != cached.value {
            let blocks = &self.blocks;
            self.heap
                .reposition(block, self.kind, |id| cached_value(blocks, id));
        }
    }

    /// Raw extremum over recorded tilts.
    #[must_use]
    pub fn root(&self) -> Option<BlockExtremum> {
        self.heap.root().and_then(|block| self.block(block))
    }

    /// Extremum, with a zero candidate folded in when `reserve` is set.
    #[must_use]
    pub fn extremum(&self, reserve: bool) -> TiltExtremum {
        match self.root() {
            None => TiltExtremum::NONE,
            Some(root) if reserve && self.kind.reserve_beats(root.value) => TiltExtremum::NONE,
            Some(root) => TiltExtremum {
                value: root.value,
                outcome: Some(root.outcome),
            },
        }
    }

    /// Most extreme recorded tilt other than the root holder.
    ///
    /// The runner-up is either elsewhere in the root block or the cached
    /// extremum of one of the root's children.
    fn runner_up(&self, root: BlockExtremum, tilts: &[Option<Amount>]) -> Option<Amount> {
        let root_block = root.outcome.block(self.block_size);
        let in_block = scan_block(
            self.kind,
            root_block,
            self.block_size,
            tilts,
            Some(root.outcome),
        )
        .map(|found| found.value);
        self.heap
            .root_children()
            .filter_map(|child| self.block(child).map(|cached| cached.value))
            .chain(in_block)
            .reduce(|best, value| self.kind.pick(best, value))
    }

    /// Most extreme recorded tilt strictly less extreme than the root.
    ///
    /// Walks the blocks whose cached value ties the root, rescanning each
    /// without its duplicates. The first block below the tie contributes its
    /// cached value and is not descended into. With no ties this is the root
    /// block plus the root's children.
    fn next_distinct(&self, root: BlockExtremum, tilts: &[Option<Amount>]) -> Option<Amount> {
        let mut best: Option<Amount> = None;
        let mut offer = |value: Amount| {
            best = Some(best.map_or(value, |b| self.kind.pick(b, value)));
        };
        let mut pending = vec![0usize];
        while let Some(slot) = pending.pop() {
            for (child, block) in self.heap.children(slot) {
                let value = cached_value(&self.blocks, block);
                if value == root.value {
                    pending.push(child);
                } else {
                    offer(value);
                }
            }
            if let Some(block) = self.heap.block_at(slot) {
                if let Some(value) =
                    scan_block_beyond(self.kind, block, self.block_size, tilts, root.value)
                {
                    offer(value);
                }
            }
        }
        best
    }

    /// Non-negative gap between the extremum and the next distinct value.
    ///
    /// Entries duplicating the extremum are not candidates, so a tie at the
    /// extremum reports the distance to the next value rather than zero. The
    /// zero reserve counts as one candidate. Zero when there is no second
    /// distinct value.
    #[must_use]
    pub fn gap_to_second(&self, tilts: &[Option<Amount>], reserve: bool) -> Amount {
        let Some(root) = self.root() else {
            return Decimal::ZERO;
        };
        let mut first = root.value;
        let mut second = self.next_distinct(root, tilts);
        if reserve {
            if self.kind.reserve_beats(first) {
                second = Some(first);
                first = Decimal::ZERO;
            } else if !first.is_zero() {
                second = Some(second.map_or(Decimal::ZERO, |s| self.kind.pick(s, Decimal::ZERO)));
            }
        }
        second.map_or(Decimal::ZERO, |s| (s - first).abs())
    }

    /// The extremum value that would result from setting `outcome` to
    /// `value`, without mutating anything.
    #[must_use]
    pub fn project(
        &self,
        outcome: OutcomeId,
        value: Amount,
        tilts: &[Option<Amount>],
        reserve: bool,
    ) -> Amount {
        let others = match self.root() {
            None => None,
            Some(root) if root.outcome == outcome => self.runner_up(root, tilts),
            Some(root) => Some(root.value),
        };
        let raw = others.map_or(value, |other| self.kind.pick(other, value));
        if reserve && self.kind.reserve_beats(raw) {
            Decimal::ZERO
        } else {
            raw
        }
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let blocks = &self.blocks;
        self.heap
            .is_consistent(self.kind, |id| cached_value(blocks, id))
    }
}
