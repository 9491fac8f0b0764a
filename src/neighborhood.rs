//! k-mer neighborhood enumeration.
//!
//! A neighborhood is the set of strings within `distance` of a seed under
//! either Hamming (substitutions only) or edit distance (substitutions,
//! insertions, deletions). Enumeration is breadth-first over single edits,
//! deduplicated at generation time, and bounded by a cap: once the set is
//! full, the next novel candidate marks the result as truncated and the
//! expansion stops.
//!
//! The set is ordered (`BTreeSet`) so iteration, and therefore everything
//! downstream of a saturated hit budget, is deterministic across runs.

use std::collections::BTreeSet;

/// The DNA alphabet used for expansions.
pub const ALPHABET: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Result of a neighborhood enumeration.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    pub strings: BTreeSet<Vec<u8>>,
    /// True when the full neighborhood would exceed the cap.
    pub truncated: bool,
}

/// Enumerate all strings within `distance` of `seed`, capped at `cap`.
///
/// The seed itself is always a member, whatever the cap, so a cap of zero
/// degrades to a seed-only set. Under Hamming all members have the seed's
/// length; under edit distance lengths range over
/// `[len - distance, len + distance]` (never below 1).
pub fn neighbors(seed: &[u8], distance: usize, indels: bool, cap: usize) -> Neighborhood {
    let cap = cap.max(1);
    let mut strings: BTreeSet<Vec<u8>> = BTreeSet::new();
    strings.insert(seed.to_vec());
    let mut truncated = false;
    let mut frontier: Vec<Vec<u8>> = vec![seed.to_vec()];

    'expand: for _ in 0..distance {
        if frontier.is_empty() {
            break;
        }
        let mut next: Vec<Vec<u8>> = Vec::new();
        for s in &frontier {
            for v in single_edits(s, indels) {
                if strings.contains(&v) {
                    continue;
                }
                if strings.len() == cap {
                    truncated = true;
                    break 'expand;
                }
                next.push(v.clone());
                strings.insert(v);
            }
        }
        frontier = next;
    }

    Neighborhood { strings, truncated }
}

/// All strings one edit away from `s`.
fn single_edits(s: &[u8], indels: bool) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len() * 3 + if indels { s.len() * 5 + 4 } else { 0 });

    for i in 0..s.len() {
        for &b in ALPHABET.iter() {
            if b != s[i] {
                let mut v = s.to_vec();
                v[i] = b;
                out.push(v);
            }
        }
    }

    if indels {
        if s.len() > 1 {
            for i in 0..s.len() {
                let mut v = s.to_vec();
                v.remove(i);
                out.push(v);
            }
        }
        for i in 0..=s.len() {
            for &b in ALPHABET.iter() {
                let mut v = s.to_vec();
                v.insert(i, b);
                out.push(v);
            }
        }
    }

    out
}
