//! Randomized cross-check of the block-indexed heaps against a linear scan.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tiltledger::domain::{Amount, OutcomeId};
use tiltledger::ledger::Exposure;

/// Tilts as a plain vector, `None` for untouched outcomes.
struct Linear {
    tilts: Vec<Option<Amount>>,
}

impl Linear {
    fn candidates(&self, reserve: bool) -> Vec<Amount> {
        let mut values: Vec<Amount> = self.tilts.iter().flatten().copied().collect();
        if reserve {
            values.push(Decimal::ZERO);
        }
        values.sort();
        values
    }

    fn min(&self, reserve: bool) -> Amount {
        self.candidates(reserve).first().copied().unwrap_or(Decimal::ZERO)
    }

    fn max(&self, reserve: bool) -> Amount {
        self.candidates(reserve).last().copied().unwrap_or(Decimal::ZERO)
    }

    fn min_gap(&self, reserve: bool) -> Amount {
        let mut values = self.candidates(reserve);
        values.dedup();
        if values.len() < 2 {
            Decimal::ZERO
        } else {
            values[1] - values[0]
        }
    }

    fn with(&self, outcome: usize, delta: Amount) -> Self {
        let mut tilts = self.tilts.clone();
        if tilts.len() <= outcome {
            tilts.resize(outcome + 1, None);
        }
        tilts[outcome] = Some(tilts[outcome].unwrap_or(Decimal::ZERO) + delta);
        Self { tilts }
    }
}

fn check(exposure: &Exposure, linear: &Linear, reserve: bool) {
    assert_eq!(exposure.min_tilt(reserve).value, linear.min(reserve));
    let max = exposure.max_tilt(reserve).expect("max tracked");
    assert_eq!(max.value, linear.max(reserve));
    assert_eq!(exposure.min_tilt_delta(reserve), linear.min_gap(reserve));

    if let Some(outcome) = exposure.min_tilt(reserve).outcome {
        assert_eq!(exposure.tilt(outcome), linear.min(reserve));
    }
}

fn run(seed: u64, block_size: u32, outcomes: u32, steps: usize) {
    run_with_spread(seed, block_size, outcomes, steps, 50);
}

fn run_with_spread(seed: u64, block_size: u32, outcomes: u32, steps: usize, spread: i64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut exposure = Exposure::new(block_size, true);
    let mut linear = Linear { tilts: Vec::new() };

    for _ in 0..steps {
        let outcome = rng.gen_range(0..outcomes);
        let delta = Decimal::from(rng.gen_range(-spread..=spread));

        // Projection must agree with applying the change.
        let projected = linear.with(outcome as usize, delta);
        for reserve in [false, true] {
            assert_eq!(
                exposure.projected_min(OutcomeId::new(outcome), delta, reserve),
                projected.min(reserve),
                "projected min, seed {seed}"
            );
            assert_eq!(
                exposure.projected_max(OutcomeId::new(outcome), delta, reserve),
                Some(projected.max(reserve)),
                "projected max, seed {seed}"
            );
        }

        exposure.update_tilt(OutcomeId::new(outcome), delta);
        linear = projected;
        check(&exposure, &linear, false);
        check(&exposure, &linear, true);
    }
}

#[test]
fn heaps_match_linear_scan_small_blocks() {
    for seed in 0..20 {
        run(seed, 2, 13, 200);
    }
}

#[test]
fn heaps_match_linear_scan_default_blocks() {
    for seed in 100..105 {
        run(seed, 16, 300, 1_000);
    }
}

#[test]
fn single_block_market() {
    run(7, 64, 5, 300);
}

#[test]
fn heaps_match_linear_scan_with_frequent_ties() {
    // Narrow deltas keep many outcomes tied at the minimum.
    for seed in 200..210 {
        run_with_spread(seed, 2, 24, 300, 3);
    }
}

#[test]
fn empty_exposure_reads_zero() {
    let exposure = Exposure::new(4, true);
    assert_eq!(exposure.min_tilt(false).value, Decimal::ZERO);
    assert_eq!(exposure.min_tilt(false).outcome, None);
    assert_eq!(exposure.min_tilt_delta(true), Decimal::ZERO);
}

#[test]
fn min_gap_skips_tied_minimum() {
    let mut exposure = Exposure::new(4, true);
    for (outcome, tilt) in [(0, -5), (1, -5), (2, -3)] {
        exposure.update_tilt(OutcomeId::new(outcome), Decimal::from(tilt));
    }
    assert_eq!(exposure.min_tilt(false).value, Decimal::from(-5));
    assert_eq!(exposure.min_tilt_delta(false), Decimal::from(2));
}
