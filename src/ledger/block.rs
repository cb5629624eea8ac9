//! Per-block cached extremum.
//!
//! An account's outcome space in a market is cut into blocks of
//! `block_size` consecutive outcome ids. Each block caches the position
//! holding its most extreme tilt so the heap only has to order blocks.

use rust_decimal::Decimal;

use crate::domain::{Amount, BlockId, OutcomeId};

/// Which extremum a heap tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapKind {
    /// Worst case: smallest tilt.
    Min,
    /// Best case: largest tilt.
    Max,
}

impl HeapKind {
    /// True when `a` is strictly more extreme than `b`.
    #[must_use]
    pub fn beats(self, a: Amount, b: Amount) -> bool {
        match self {
            Self::Min => a < b,
            Self::Max => a > b,
        }
    }

    /// True when `a` is at least as extreme as `b`.
    #[must_use]
    pub fn at_least_as_extreme(self, a: Amount, b: Amount) -> bool {
        !self.beats(b, a)
    }

    /// The more extreme of the two, preferring `a` on ties.
    #[must_use]
    pub fn pick(self, a: Amount, b: Amount) -> Amount {
        if self.beats(b, a) {
            b
        } else {
            a
        }
    }

    /// Whether the zero reserve candidate beats `value`.
    #[must_use]
    pub fn reserve_beats(self, value: Amount) -> bool {
        self.beats(Decimal::ZERO, value)
    }
}

/// The cached `{outcome, value}` extremum of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockExtremum {
    pub outcome: OutcomeId,
    pub value: Amount,
}

/// Linear scan of one block over recorded tilts.
///
/// Ties go to the lowest outcome id. `skip` excludes one position, which is
/// how second-extremum and projection queries look past the current holder.
pub(crate) fn scan_block(
    kind: HeapKind,
    block: BlockId,
    block_size: u32,
    tilts: &[Option<Amount>],
    skip: Option<OutcomeId>,
) -> Option<BlockExtremum> {
    let mut best: Option<BlockExtremum> = None;
    for outcome in block.outcomes(block_size) {
        if Some(outcome) == skip {
            continue;
        }
        let Some(Some(value)) = tilts.get(outcome.index()).copied() else {
            continue;
        };
        match best {
            Some(current) if !kind.beats(value, current.value) => {}
            _ => best = Some(BlockExtremum { outcome, value }),
        }
    }
    best
}

/// Most extreme recorded tilt in one block that is strictly less extreme
/// than `floor`. Entries equal to `floor` are duplicates and are skipped.
pub(crate) fn scan_block_beyond(
    kind: HeapKind,
    block: BlockId,
    block_size: u32,
    tilts: &[Option<Amount>],
    floor: Amount,
) -> Option<Amount> {
    block
        .outcomes(block_size)
        .filter_map(|outcome| tilts.get(outcome.index()).copied().flatten())
        .filter(|value| kind.beats(floor, *value))
        .reduce(|best, value| kind.pick(best, value))
}
