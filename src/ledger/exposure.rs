//! Tilt store for one (account, market).
//!
//! Holds the raw signed tilt per outcome, the aggregate lay offset, the
//! monotone capital counters and the extremum indexes derived from the
//! tilts. MIN is always maintained; MAX only when the account is the
//! designated maker of a non-resolving market.
//!
//! Extremum queries take a `reserve` flag: when set, a zero tilt competes
//! with the recorded ones. Callers set it for expanding markets and whenever
//! some outcome of the market has never been touched.

use rust_decimal::Decimal;

use crate::domain::{Amount, OutcomeId};

use super::block::HeapKind;
use super::index::{ExtremumIndex, TiltExtremum};

#[derive(Debug, Clone)]
pub struct Exposure {
    /// `None` until the outcome is first touched.
    tilts: Vec<Option<Amount>>,
    recorded: u32,
    lay_offset: Amount,
    usdc_spent: Amount,
    redeemed_usdc: Amount,
    min: ExtremumIndex,
    max: Option<ExtremumIndex>,
}

impl Exposure {
    #[must_use]
    pub fn new(block_size: u32, track_max: bool) -> Self {
        Self {
            tilts: Vec::new(),
            recorded: 0,
            lay_offset: Decimal::ZERO,
            usdc_spent: Decimal::ZERO,
            redeemed_usdc: Decimal::ZERO,
            min: ExtremumIndex::new(HeapKind::Min, block_size),
            max: track_max.then(|| ExtremumIndex::new(HeapKind::Max, block_size)),
        }
    }

    /// Tilt on `outcome`, zero when never touched.
    #[must_use]
    pub fn tilt(&self, outcome: OutcomeId) -> Amount {
        self.tilts
            .get(outcome.index())
            .copied()
            .flatten()
            .unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn is_recorded(&self, outcome: OutcomeId) -> bool {
        matches!(self.tilts.get(outcome.index()), Some(Some(_)))
    }

    /// Number of outcomes with recorded tilt.
    #[must_use]
    pub const fn recorded_count(&self) -> u32 {
        self.recorded
    }

    /// Whether any of `outcome_count` outcomes was never touched.
    #[must_use]
    pub const fn has_unrecorded(&self, outcome_count: u32) -> bool {
        self.recorded < outcome_count
    }

    /// Outcomes with recorded tilt, in id order.
    pub fn recorded_tilts(&self) -> impl Iterator<Item = (OutcomeId, Amount)> + '_ {
        self.tilts.iter().enumerate().filter_map(|(i, tilt)| {
            tilt.map(|value| (OutcomeId::new(i as u32), value))
        })
    }

    #[must_use]
    pub const fn lay_offset(&self) -> Amount {
        self.lay_offset
    }

    #[must_use]
    pub const fn usdc_spent(&self) -> Amount {
        self.usdc_spent
    }

    #[must_use]
    pub const fn redeemed_usdc(&self) -> Amount {
        self.redeemed_usdc
    }

    /// Real capital currently committed.
    #[must_use]
    pub fn net_allocation(&self) -> Amount {
        self.usdc_spent - self.redeemed_usdc
    }

    #[must_use]
    pub const fn tracks_max(&self) -> bool {
        self.max.is_some()
    }

    /// Add `delta` to the tilt on `outcome` and maintain the indexes.
    pub fn update_tilt(&mut self, outcome: OutcomeId, delta: Amount) {
        if self.tilts.len() <= outcome.index() {
            self.tilts.resize(outcome.index() + 1, None);
        }
        let previous = self.tilts[outcome.index()];
        if previous.is_none() {
            self.recorded += 1;
        }
        let value = previous.unwrap_or(Decimal::ZERO) + delta;
        self.tilts[outcome.index()] = Some(value);

        self.min.record(outcome, value, &self.tilts);
        if let Some(max) = self.max.as_mut() {
            max.record(outcome, value, &self.tilts);
        }
    }

    pub(crate) fn adjust_lay_offset(&mut self, delta: Amount) {
        self.lay_offset += delta;
    }

    pub(crate) fn record_spent(&mut self, amount: Amount) {
        self.usdc_spent += amount;
    }

    pub(crate) fn record_redeemed(&mut self, amount: Amount) {
        self.redeemed_usdc += amount;
    }

    #[must_use]
    pub fn min_tilt(&self, reserve: bool) -> TiltExtremum {
        self.min.extremum(reserve)
    }

    /// `None` when best-case exposure is not tracked for this account.
    #[must_use]
    pub fn max_tilt(&self, reserve: bool) -> Option<TiltExtremum> {
        self.max.as_ref().map(|max| max.extremum(reserve))
    }

    /// Gap between the second smallest and the smallest tilt.
    #[must_use]
    pub fn min_tilt_delta(&self, reserve: bool) -> Amount {
        self.min.gap_to_second(&self.tilts, reserve)
    }

    /// Minimum tilt after a hypothetical `delta` on `outcome`.
    ///
    /// `reserve` describes the market after the change.
    #[must_use]
    pub fn projected_min(&self, outcome: OutcomeId, delta: Amount, reserve: bool) -> Amount {
        self.min
            .project(outcome, self.tilt(outcome) + delta, &self.tilts, reserve)
    }

    /// Maximum tilt after a hypothetical `delta` on `outcome`.
    #[must_use]
    pub fn projected_max(
        &self,
        outcome: OutcomeId,
        delta: Amount,
        reserve: bool,
    ) -> Option<Amount> {
        self.max.as_ref().map(|max| {
            max.project(outcome, self.tilt(outcome) + delta, &self.tilts, reserve)
        })
    }

    #[cfg(test)]
    pub(crate) fn indexes_consistent(&self) -> bool {
        self.min.is_consistent() && self.max.as_ref().map_or(true, ExtremumIndex::is_consistent)
    }
}
