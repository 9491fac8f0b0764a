//! Reference text, FM-index, and coordinate mapping.
//!
//! All reference sequences are concatenated into a single text in which every
//! sequence is terminated by a `$` sentinel (so the text itself ends with one).
//! A suffix array, BWT, and FM-index over that text answer `locate` queries;
//! the per-sequence start offsets map global hits back to
//! (sequence, local offset).
//!
//! Queries are {A,C,G,T} strings, so a match can never span a sentinel and
//! therefore never crosses a sequence boundary. Context windows extracted
//! around a hit *can* reach into a neighbouring sequence, which is why
//! `extract` strips everything beyond the nearest sentinel on both sides.

use anyhow::{bail, Result};
use bio::alphabets::Alphabet;
use bio::data_structures::bwt::{bwt, less, Less, Occ, BWT};
use bio::data_structures::fmindex::{BackwardSearchResult, FMIndex, FMIndexable};
use bio::data_structures::suffix_array::{suffix_array, RawSuffixArray};

/// Sequence terminator inside the concatenated text.
pub const SENTINEL: u8 = b'$';

/// Occ checkpoint sampling rate.
const OCC_SAMPLING: u32 = 32;

/// A context window extracted around an index hit.
///
/// `start` is the global offset of `seq[0]`; the window never contains a
/// sentinel and never spans a sequence boundary.
#[derive(Debug, Clone)]
pub struct Window {
    pub seq: Vec<u8>,
    pub start: usize,
}

/// Read-only reference index, shareable across worker threads.
pub struct RefIndex {
    text: Vec<u8>,
    sa: RawSuffixArray,
    fm: FMIndex<BWT, Less, Occ>,
    names: Vec<String>,
    lens: Vec<usize>,
    /// Global offset of each sequence start in `text`.
    starts: Vec<usize>,
}

impl RefIndex {
    /// Build the index from (name, sequence) records.
    ///
    /// This is startup wiring, called once before any search runs; the search
    /// pipeline itself only consults the finished handle through
    /// `locate`/`extract`/`map_offset`.
    ///
    /// Sequences are uppercased and any base outside {A,C,G,T} becomes `N`;
    /// queries are ACGT-only so `N` stretches are simply unmatchable.
    pub fn from_records(records: Vec<(String, Vec<u8>)>) -> Result<Self> {
        if records.is_empty() {
            bail!("cannot build an index over zero sequences");
        }

        let total: usize = records.iter().map(|(_, s)| s.len() + 1).sum();
        let mut text = Vec::with_capacity(total);
        let mut names = Vec::with_capacity(records.len());
        let mut lens = Vec::with_capacity(records.len());
        let mut starts = Vec::with_capacity(records.len());

        for (name, seq) in records {
            if seq.is_empty() {
                bail!("reference sequence '{name}' is empty");
            }
            starts.push(text.len());
            for &b in &seq {
                text.push(match b.to_ascii_uppercase() {
                    c @ (b'A' | b'C' | b'G' | b'T') => c,
                    _ => b'N',
                });
            }
            text.push(SENTINEL);
            names.push(name);
            lens.push(seq.len());
        }

        let alphabet = Alphabet::new(b"$ACGNT");
        let sa = suffix_array(&text);
        let bwt = bwt(&text, &sa);
        let less = less(&bwt, &alphabet);
        let occ = Occ::new(&bwt, OCC_SAMPLING, &alphabet);
        let fm = FMIndex::new(bwt, less, occ);

        Ok(Self {
            text,
            sa,
            fm,
            names,
            lens,
            starts,
        })
    }

    pub fn num_seqs(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    pub fn seq_len(&self, i: usize) -> usize {
        self.lens[i]
    }

    /// Map a global text offset to (sequence index, local offset).
    pub fn map_offset(&self, global: usize) -> (usize, usize) {
        debug_assert!(global < self.text.len());
        let i = self.starts.partition_point(|&s| s <= global) - 1;
        (i, global - self.starts[i])
    }

    /// All global offsets where `query` occurs, ascending, at most `limit`.
    pub fn locate(&self, query: &[u8], limit: usize) -> Vec<usize> {
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        match self.fm.backward_search(query.iter()) {
            BackwardSearchResult::Complete(interval) => {
                let mut positions = interval.occ(&self.sa);
                positions.sort_unstable();
                positions.truncate(limit);
                positions
            }
            _ => Vec::new(),
        }
    }

    /// Extract the window `[o - pre, o + m + post)` around a hit at global
    /// offset `o` with match length `m`, clipped to the text and trimmed to
    /// the enclosing sequence: the pre-part keeps only what follows the last
    /// sentinel, the post-part only what precedes the first.
    pub fn extract(&self, o: usize, m: usize, pre: usize, post: usize) -> Window {
        let pre = pre.min(o);
        let post = post.min(self.text.len() - o - m);

        let pre_slice = &self.text[o - pre..o];
        let post_slice = &self.text[o + m..o + m + post];

        let pre_kept = match pre_slice.iter().rposition(|&b| b == SENTINEL) {
            Some(j) => &pre_slice[j + 1..],
            None => pre_slice,
        };
        let post_kept = match post_slice.iter().position(|&b| b == SENTINEL) {
            Some(j) => &post_slice[..j],
            None => post_slice,
        };

        let mut seq = Vec::with_capacity(pre_kept.len() + m + post_kept.len());
        seq.extend_from_slice(pre_kept);
        seq.extend_from_slice(&self.text[o..o + m]);
        seq.extend_from_slice(post_kept);

        Window {
            seq,
            start: o - pre_kept.len(),
        }
    }
}
