//! Alignment canonicalizer.
//!
//! Two different neighbors of the same primer can land on overlapping
//! reference sites; to deduplicate them, every hit is reduced to a canonical
//! reference start by semi-globally aligning the primer's search sequence
//! (query global, window free at both ends) against the extracted window.
//! The number of leading window-only columns is the canonical shift:
//! `canonical_start = window_start + shift`.
//!
//! Scoring is match 0, mismatch -1, linear gap -1, matching the convention
//! the dedup key is defined under. The aligner's DP matrices are reused
//! across hits, so each worker keeps one instance.

use bio::alignment::pairwise::Aligner;

fn unit_cost(a: u8, b: u8) -> i32 {
    if a == b {
        0
    } else {
        -1
    }
}

/// A reusable semi-global aligner.
pub struct CanonicalAligner {
    inner: Aligner<fn(u8, u8) -> i32>,
}

impl CanonicalAligner {
    /// `query_hint` and `window_hint` size the DP matrices up front.
    pub fn new(query_hint: usize, window_hint: usize) -> Self {
        Self {
            inner: Aligner::with_capacity(
                query_hint,
                window_hint,
                0,
                -1,
                unit_cost as fn(u8, u8) -> i32,
            ),
        }
    }

    /// Leading window-only columns of the optimal alignment of `search_seq`
    /// against `window`.
    pub fn canonical_shift(&mut self, search_seq: &[u8], window: &[u8]) -> usize {
        self.inner.semiglobal(search_seq, window).ystart
    }
}
