//! Three-phase offset search.
//!
//! Each phase scans a range of integer millisecond offsets around the previous
//! phase's winner and keeps the best score:
//!
//! | Phase      | Range               | Step   | Tolerance | Score                  |
//! |------------|---------------------|--------|-----------|------------------------|
//! | Coarse     | -60000..=60000      | 500ms  | 0.5s      | matching pair count    |
//! | Fine       | coarse +/- 2000     | 10ms   | 0.2s      | sum of (tol - \|d\|)   |
//! | Ultra-fine | fine +/- 100        | 1ms    | 0.15s     | sum of (tol - \|d\|)   |
//!
//! For offset `t`, a reference marker `r` and candidate marker `c` differ by
//! `|c + t/1000 - r|`. Cost is O(|ref| * |cand|) per offset; marker counts are
//! in the tens to low hundreds.

use super::types::{PhaseResult, SearchResult};

/// Scan parameters of one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseParams {
    /// Offsets from `center - half_width_ms` to `center + half_width_ms`.
    pub half_width_ms: i32,
    /// Distance between scanned offsets.
    pub step_ms: usize,
    /// Pairs further apart than this (seconds) do not contribute.
    pub tolerance_secs: f64,
}

/// Coarse phase, centered on zero.
pub const COARSE_PHASE: PhaseParams = PhaseParams {
    half_width_ms: 60_000,
    step_ms: 500,
    tolerance_secs: 0.5,
};

/// Fine phase, centered on the coarse winner.
pub const FINE_PHASE: PhaseParams = PhaseParams {
    half_width_ms: 2_000,
    step_ms: 10,
    tolerance_secs: 0.2,
};

/// Ultra-fine phase, centered on the fine winner.
pub const ULTRA_FINE_PHASE: PhaseParams = PhaseParams {
    half_width_ms: 100,
    step_ms: 1,
    tolerance_secs: 0.15,
};

/// Run all three phases and return each phase's winner.
pub fn find_best_offset(reference: &[f64], candidate: &[f64]) -> SearchResult {
    let coarse = scan(0, &COARSE_PHASE, |offset_ms| {
        count_matches(reference, candidate, offset_ms, COARSE_PHASE.tolerance_secs)
    });
    let fine = scan(coarse.offset_ms, &FINE_PHASE, |offset_ms| {
        weighted_score(reference, candidate, offset_ms, FINE_PHASE.tolerance_secs)
    });
    let ultra_fine = scan(fine.offset_ms, &ULTRA_FINE_PHASE, |offset_ms| {
        weighted_score(reference, candidate, offset_ms, ULTRA_FINE_PHASE.tolerance_secs)
    });

    SearchResult {
        coarse,
        fine,
        ultra_fine,
    }
}

/// Scan one phase around `center`.
///
/// The center is kept with a zero score until some offset scores strictly
/// higher; ties keep the earliest offset in scan order.
fn scan<S, F>(center: i32, params: &PhaseParams, mut score_at: F) -> PhaseResult<S>
where
    S: PartialOrd + Default + Copy,
    F: FnMut(i32) -> S,
{
    let mut best = PhaseResult {
        offset_ms: center,
        score: S::default(),
    };

    let start = center - params.half_width_ms;
    let end = center + params.half_width_ms;
    for offset_ms in (start..=end).step_by(params.step_ms) {
        let score = score_at(offset_ms);
        if score > best.score {
            best = PhaseResult { offset_ms, score };
        }
    }

    best
}

/// Number of (reference, candidate) pairs within `tolerance_secs` at `offset_ms`.
pub fn count_matches(reference: &[f64], candidate: &[f64], offset_ms: i32, tolerance_secs: f64) -> u32 {
    let shift = offset_ms as f64 / 1000.0;
    let mut count = 0;
    for &r in reference {
        for &c in candidate {
            if ((c + shift) - r).abs() < tolerance_secs {
                count += 1;
            }
        }
    }
    count
}

/// Sum of `tolerance - |difference|` over pairs within `tolerance_secs`.
///
/// Tighter pairs weigh more, so this favors precise alignment over raw count.
pub fn weighted_score(reference: &[f64], candidate: &[f64], offset_ms: i32, tolerance_secs: f64) -> f64 {
    let shift = offset_ms as f64 / 1000.0;
    let mut score = 0.0;
    for &r in reference {
        for &c in candidate {
            let d = ((c + shift) - r).abs();
            if d < tolerance_secs {
                score += tolerance_secs - d;
            }
        }
    }
    score
}
