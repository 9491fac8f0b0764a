//! Per-primer search pipeline and the worker pool that drives it.
//!
//! For each candidate primer: perfect-match Tm, neighborhood enumeration of
//! the k-suffix anchor (both orientations), FM-index lookup of every neighbor
//! under a shared per-primer hit budget, context extraction, duplex scoring,
//! cut-temperature filtering, alignment canonicalization, and dedup into the
//! binding collector.
//!
//! Primers are independent and share only read-only state (index, thermo
//! model, config), so the pool hands primer ids to workers over a bounded
//! channel and reduces per-primer results after join. Results are merged in
//! primer-id order via a BTreeMap, so the outcome is identical no matter how
//! the workers were scheduled.

use anyhow::Result;
use bio::alphabets::dna;
use crossbeam_channel as chan;
use gxhash::{HashSet, HashSetExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use crate::{
    align::CanonicalAligner,
    bind::{Binding, BindingCollector},
    cfg::DesignCfg,
    io::Primer,
    neighborhood::neighbors,
    reference::RefIndex,
    thermo::ThermoModel,
};

/// Everything one primer contributed to the search.
#[derive(Debug)]
struct PrimerHits {
    bindings: Vec<Binding>,
    /// A neighborhood hit its cap; results are incomplete.
    neighborhood_truncated: bool,
    /// The per-primer hit budget was exhausted; results are incomplete.
    matches_saturated: bool,
}

/// Merged output of a search run.
pub struct SearchOutcome {
    pub collector: BindingCollector,
    /// Primer ids whose neighborhood was truncated.
    pub truncated_neighborhoods: Vec<u32>,
    /// Primer ids whose hit budget was exhausted.
    pub saturated_matches: Vec<u32>,
}

/// Run the full binding-site search over all primers.
pub fn run_search(
    primers: Arc<Vec<Primer>>,
    refidx: Arc<RefIndex>,
    thermo: Arc<ThermoModel>,
    cfg: Arc<DesignCfg>,
    threads: usize,
) -> Result<SearchOutcome> {
    let threads = threads.max(1);
    let (tx, rx) = chan::bounded::<u32>(primers.len().max(1));

    let mut worker_handles = Vec::with_capacity(threads);
    for _ in 0..threads {
        let rx = rx.clone();
        let primers = primers.clone();
        let refidx = refidx.clone();
        let thermo = thermo.clone();
        let cfg = cfg.clone();

        worker_handles.push(thread::spawn(move || -> Result<BTreeMap<u32, PrimerHits>> {
            let mut local: BTreeMap<u32, PrimerHits> = BTreeMap::new();
            let window_hint = cfg.search.kmer + 2 * (cfg.search.context() + 64);
            let mut aligner = CanonicalAligner::new(cfg.search.kmer, window_hint);

            while let Ok(id) = rx.recv() {
                let primer = &primers[id as usize];
                let hits = process_primer(primer, &refidx, &thermo, &cfg, &mut aligner)?;
                local.insert(id, hits);
            }
            Ok(local)
        }));
    }
    drop(rx);

    for id in 0..primers.len() as u32 {
        tx.send(id)
            .map_err(|e| anyhow::anyhow!("job channel send failed: {e}"))?;
    }
    drop(tx);

    let mut merged: BTreeMap<u32, PrimerHits> = BTreeMap::new();
    for h in worker_handles {
        let local = h
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))??;
        merged.extend(local);
    }

    // Reduce in primer-id order so both the collector contents and the
    // warning stream are deterministic.
    let mut collector = BindingCollector::new(refidx.num_seqs());
    let mut truncated_neighborhoods = Vec::new();
    let mut saturated_matches = Vec::new();

    for (id, hits) in merged {
        if hits.neighborhood_truncated {
            eprintln!(
                "Warning: neighborhood of primer '{}' exceeds {} candidates; only the first {} are searched, results are likely incomplete!",
                primers[id as usize].name, cfg.search.max_neighborhood, cfg.search.max_neighborhood
            );
            truncated_neighborhoods.push(id);
        }
        if hits.matches_saturated {
            eprintln!(
                "Warning: primer '{}' has more than {} matches; only the first {} are reported, results are likely incomplete!",
                primers[id as usize].name, cfg.search.max_locations, cfg.search.max_locations
            );
            saturated_matches.push(id);
        }
        for b in hits.bindings {
            collector.push(b);
        }
    }

    Ok(SearchOutcome {
        collector,
        truncated_neighborhoods,
        saturated_matches,
    })
}

/// Search one primer against the index.
fn process_primer(
    primer: &Primer,
    refidx: &RefIndex,
    thermo: &ThermoModel,
    cfg: &DesignCfg,
    aligner: &mut CanonicalAligner,
) -> Result<PrimerHits> {
    let plen = primer.seq.len();
    let forward_primer = primer.seq.clone();
    let reverse_primer = dna::revcomp(&forward_primer);

    let perfect_temp = thermo.perfect_tm(&forward_primer)?;

    // Anchor on the k-suffix; shorter primers anchor on the whole sequence.
    let k = cfg.search.kmer.min(plen);
    let koffset = plen - k;
    let anchor = &forward_primer[koffset..];
    let anchor_rc = dna::revcomp(anchor);

    let nb_fwd = neighbors(
        anchor,
        cfg.search.distance,
        cfg.search.indel,
        cfg.search.max_neighborhood,
    );
    let nb_rev = neighbors(
        &anchor_rc,
        cfg.search.distance,
        cfg.search.indel,
        cfg.search.max_neighborhood,
    );
    let neighborhood_truncated = nb_fwd.truncated || nb_rev.truncated;

    let mut bindings = Vec::new();
    let mut budget = cfg.search.max_locations;
    let context = cfg.search.context();

    for (on_forward, nb) in [(true, &nb_fwd), (false, &nb_rev)] {
        // Dedup key per orientation: (chromosome, canonical window position).
        let mut seen: HashSet<(u32, u32)> = HashSet::new();

        let (pre_ctx, post_ctx) = if on_forward {
            (context + koffset, context)
        } else {
            (context, context + koffset)
        };
        let (oligo, search_seq) = if on_forward {
            (&reverse_primer, anchor)
        } else {
            (&forward_primer, anchor_rc.as_slice())
        };

        for query in &nb.strings {
            if budget == 0 {
                break;
            }
            let m = query.len();
            for &o in &refidx.locate(query, budget) {
                budget -= 1;

                let window = refidx.extract(o, m, pre_ctx, post_ctx);
                let (chrom, _) = refidx.map_offset(o);
                let (_, window_local) = refidx.map_offset(window.start);

                let temp = thermo.duplex_tm(oligo, &window.seq)?;
                if temp <= cfg.scoring.cut_temp {
                    continue;
                }

                let shift = aligner.canonical_shift(search_seq, &window.seq);
                let canonical_local = window_local + shift;
                if !seen.insert((chrom as u32, canonical_local as u32)) {
                    continue;
                }

                // Site slice and final position per orientation. Forward hits
                // pull the start back by the k-offset; a hit whose primer head
                // would begin before the window (or whose full-length site
                // does not fit) cannot yield a valid binding and is dropped.
                let (pos, site_off) = if on_forward {
                    if shift < koffset {
                        continue;
                    }
                    (canonical_local - koffset, shift - koffset)
                } else {
                    (canonical_local, shift)
                };
                if site_off + plen > window.seq.len() {
                    continue;
                }
                let site =
                    String::from_utf8_lossy(&window.seq[site_off..site_off + plen]).into_owned();

                bindings.push(Binding {
                    chrom: chrom as u32,
                    pos: pos as u32,
                    on_forward,
                    temp,
                    perfect_temp,
                    primer_id: primer.id,
                    site,
                });
            }
        }
    }

    Ok(PrimerHits {
        bindings,
        neighborhood_truncated,
        matches_saturated: budget == 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amplicon::assemble;
    use crate::cfg::{ScoringCfg, SearchCfg, ThermoCfg};

    fn pseudo_dna(len: usize, seed: u64) -> Vec<u8> {
        let mut x = seed;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            x = x
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let b = match (x >> 62) & 3 {
                0 => b'A',
                1 => b'C',
                2 => b'G',
                _ => b'T',
            };
            out.push(b);
        }
        out
    }

    fn primer(id: u32, seq: &[u8]) -> Primer {
        Primer {
            id,
            name: format!("p{id}"),
            seq: seq.to_vec(),
        }
    }

    fn cfg_for(kmer: usize, distance: usize, indel: bool, cut_temp: f64) -> DesignCfg {
        DesignCfg {
            search: SearchCfg {
                kmer,
                distance,
                indel,
                ..SearchCfg::default()
            },
            scoring: ScoringCfg {
                cut_temp,
                ..ScoringCfg::default()
            },
            thermo: ThermoCfg::default(),
            prune_primers: false,
        }
    }

    fn search(
        records: Vec<(String, Vec<u8>)>,
        primers: Vec<Primer>,
        cfg: DesignCfg,
    ) -> SearchOutcome {
        let refidx = Arc::new(RefIndex::from_records(records).unwrap());
        let thermo = Arc::new(ThermoModel::new(&cfg.thermo));
        run_search(Arc::new(primers), refidx, thermo, Arc::new(cfg), 1).unwrap()
    }

    // A reference slice that never resembles the GC-heavy test primers.
    fn at_filler(len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| if i % 2 == 0 { b'A' } else { b'T' })
            .collect()
    }

    #[test]
    fn single_exact_match_forward_only() {
        // chr1 = AAAAA CCCCCGGGTT TTTTT, primer = the middle 10-mer
        // (not palindromic, so its reverse complement is absent)
        let refseq = b"AAAAACCCCCGGGTTTTTTT".to_vec();
        let out = search(
            vec![("chr1".to_string(), refseq)],
            vec![primer(0, b"CCCCCGGGTT")],
            cfg_for(10, 0, false, 30.0),
        );

        assert_eq!(out.collector.forward[0].len(), 1);
        assert!(out.collector.reverse[0].is_empty());

        let b = &out.collector.forward[0][0];
        assert_eq!(b.pos, 5);
        assert_eq!(b.site, "CCCCCGGGTT");
        assert!(b.temp > 30.0);
        assert!((b.temp - b.perfect_temp).abs() < 1e-9);
    }

    #[test]
    fn exact_primer_pair_yields_one_product() {
        // forward site at 0, reverse site (palindromic revcomp) further along
        let mut refseq = b"ACGTACGT".to_vec();
        refseq.extend(at_filler(100));
        let p2 = refseq.len();
        refseq.extend_from_slice(b"TTGGCCAA");
        refseq.extend(at_filler(20));

        let cfg = cfg_for(8, 0, false, 10.0);
        let out = search(
            vec![("chr1".to_string(), refseq)],
            vec![primer(0, b"ACGTACGT"), primer(1, b"TTGGCCAA")],
            cfg.clone(),
        );

        let prods = assemble(&out.collector, &[8, 8], &cfg.scoring);
        assert_eq!(prods.len(), 1);
        assert_eq!(prods[0].for_pos, 0);
        assert_eq!(prods[0].rev_pos, p2 as u32);
        assert_eq!(prods[0].length, p2 as u32 + 8);
        assert_eq!(prods[0].for_id, 0);
        assert_eq!(prods[0].rev_id, 1);
    }

    #[test]
    fn hamming_single_mismatch_needs_distance_one() {
        // site carries one substitution vs the primer
        let mut refseq = at_filler(30);
        refseq.extend_from_slice(b"CCCCCGGGGA");
        refseq.extend(at_filler(30));

        let with_d1 = search(
            vec![("chr1".to_string(), refseq.clone())],
            vec![primer(0, b"CCCCCGGGGG")],
            cfg_for(10, 1, false, 20.0),
        );
        assert_eq!(with_d1.collector.forward[0].len(), 1);
        assert_eq!(with_d1.collector.forward[0][0].pos, 30);
        assert_eq!(with_d1.collector.forward[0][0].site, "CCCCCGGGGA");
        assert!(with_d1.collector.forward[0][0].temp < with_d1.collector.forward[0][0].perfect_temp);

        let with_d0 = search(
            vec![("chr1".to_string(), refseq)],
            vec![primer(0, b"CCCCCGGGGG")],
            cfg_for(10, 0, false, 20.0),
        );
        assert_eq!(with_d0.collector.num_bindings(), 0);
    }

    #[test]
    fn indel_site_is_canonicalized_under_edit_distance() {
        // site lost one base vs the primer; found via a deletion neighbor
        let mut refseq = at_filler(30);
        refseq.extend_from_slice(b"CCCCCGGGG");
        refseq.extend(at_filler(30));

        let out = search(
            vec![("chr1".to_string(), refseq)],
            vec![primer(0, b"CCCCCGGGGG")],
            cfg_for(10, 1, true, 20.0),
        );

        assert_eq!(out.collector.forward[0].len(), 1);
        let b = &out.collector.forward[0][0];
        // canonical start after alignment, not a raw neighbor offset
        assert_eq!(b.pos, 30);
        assert_eq!(b.site.len(), 10);
    }

    #[test]
    fn overlapping_neighbors_dedup_to_one_binding() {
        // under distance 2, both CCCCCGGGGG and single-substitution neighbors
        // resolve this site to the same canonical start
        let mut refseq = at_filler(30);
        refseq.extend_from_slice(b"CCCCCGGGGA");
        refseq.extend(at_filler(30));

        let out = search(
            vec![("chr1".to_string(), refseq)],
            vec![primer(0, b"CCCCCGGGGG")],
            cfg_for(10, 2, false, 20.0),
        );

        assert_eq!(out.collector.forward[0].len(), 1);
    }

    #[test]
    fn match_cap_saturates_with_warning_flag() {
        // more copies of the site than the hit budget allows
        let mut refseq = Vec::new();
        for _ in 0..7 {
            refseq.extend_from_slice(b"CCCCCGGGGG");
            refseq.extend(at_filler(20));
        }

        let mut cfg = cfg_for(10, 0, false, 20.0);
        cfg.search.max_locations = 5;
        let out = search(
            vec![("chr1".to_string(), refseq.clone())],
            vec![primer(0, b"CCCCCGGGGG")],
            cfg,
        );
        assert_eq!(out.collector.forward[0].len(), 5);
        assert_eq!(out.saturated_matches, vec![0]);

        let mut cfg = cfg_for(10, 0, false, 20.0);
        cfg.search.max_locations = 100;
        let out = search(
            vec![("chr1".to_string(), refseq)],
            vec![primer(0, b"CCCCCGGGGG")],
            cfg,
        );
        assert_eq!(out.collector.forward[0].len(), 7);
        assert!(out.saturated_matches.is_empty());
    }

    #[test]
    fn neighborhood_cap_truncates_with_warning_flag() {
        let refseq = at_filler(60);
        let mut cfg = cfg_for(10, 1, false, 20.0);
        cfg.search.max_neighborhood = 4;
        let out = search(
            vec![("chr1".to_string(), refseq)],
            vec![primer(0, b"CCCCCGGGGG")],
            cfg,
        );
        assert_eq!(out.truncated_neighborhoods, vec![0]);
    }

    #[test]
    fn cut_temp_filters_bindings() {
        let mut refseq = at_filler(30);
        refseq.extend_from_slice(b"CCCCCGGGTT");
        refseq.extend(at_filler(30));

        let keep = search(
            vec![("chr1".to_string(), refseq.clone())],
            vec![primer(0, b"CCCCCGGGTT")],
            cfg_for(10, 0, false, 20.0),
        );
        assert_eq!(keep.collector.num_bindings(), 1);
        let temp = keep.collector.forward[0][0].temp;

        let cut = search(
            vec![("chr1".to_string(), refseq)],
            vec![primer(0, b"CCCCCGGGTT")],
            cfg_for(10, 0, false, temp + 1.0),
        );
        assert_eq!(cut.collector.num_bindings(), 0);
    }

    #[test]
    fn longer_primer_anchors_on_k_suffix_and_reports_full_site() {
        // 14-mer primer, k = 10: the anchor is the last 10 bases, the binding
        // position and site cover the whole primer
        let primer_seq = b"ACGGCCCCCGGGGG";
        let mut refseq = at_filler(25);
        refseq.extend_from_slice(primer_seq);
        refseq.extend(at_filler(25));

        let out = search(
            vec![("chr1".to_string(), refseq)],
            vec![primer(0, primer_seq)],
            cfg_for(10, 0, false, 20.0),
        );

        assert_eq!(out.collector.forward[0].len(), 1);
        let b = &out.collector.forward[0][0];
        assert_eq!(b.pos, 25);
        assert_eq!(b.site, String::from_utf8_lossy(primer_seq));
    }

    #[test]
    fn forward_hit_with_head_before_window_is_dropped() {
        // The anchor matches right at the start of the chromosome, so the
        // primer head has no reference to bind; no binding may be emitted.
        let mut refseq = b"CCCCCGGGGG".to_vec();
        refseq.extend(at_filler(30));

        let out = search(
            vec![("chr1".to_string(), refseq)],
            vec![primer(0, b"ACGTCCCCCGGGGG")],
            cfg_for(10, 0, false, 20.0),
        );
        assert!(out.collector.forward[0].is_empty());
    }

    #[test]
    fn reverse_site_clipped_at_sequence_end_is_dropped() {
        // The reverse anchor matches at the very end of the chromosome; the
        // full-length reverse site would run past it.
        let mut refseq = at_filler(30);
        refseq.extend_from_slice(&dna::revcomp(b"CCCCCGGGGG"));

        let out = search(
            vec![("chr1".to_string(), refseq.clone())],
            vec![primer(0, b"ACGTCCCCCGGGGG")],
            cfg_for(10, 0, false, 20.0),
        );
        assert!(out.collector.reverse[0].is_empty());

        // with the full-length reverse site available it is kept
        let mut refseq2 = at_filler(30);
        refseq2.extend_from_slice(&dna::revcomp(b"ACGTCCCCCGGGGG"));
        refseq2.extend(at_filler(10));
        let out = search(
            vec![("chr1".to_string(), refseq2)],
            vec![primer(0, b"ACGTCCCCCGGGGG")],
            cfg_for(10, 0, false, 20.0),
        );
        assert_eq!(out.collector.reverse[0].len(), 1);
        assert_eq!(out.collector.reverse[0][0].pos, 30);
    }

    #[test]
    fn multi_chromosome_hits_map_to_their_sequences() {
        let mut chr2 = at_filler(17);
        chr2.extend_from_slice(b"CCCCCGGGGG");
        chr2.extend(at_filler(9));

        let out = search(
            vec![
                ("chr1".to_string(), at_filler(40)),
                ("chr2".to_string(), chr2),
            ],
            vec![primer(0, b"CCCCCGGGGG")],
            cfg_for(10, 0, false, 20.0),
        );

        assert!(out.collector.forward[0].is_empty());
        assert_eq!(out.collector.forward[1].len(), 1);
        assert_eq!(out.collector.forward[1][0].pos, 17);
    }

    #[test]
    fn results_are_identical_across_thread_counts() {
        let mut refseq = pseudo_dna(4000, 42);
        refseq.extend_from_slice(b"GGGGGCCCCCGGGGGCCCCC");
        refseq.extend(pseudo_dna(4000, 43));

        let records = vec![("chr1".to_string(), refseq)];
        let primers = vec![
            primer(0, b"GGGGGCCCCCGGGGGCCCCC"),
            primer(1, b"ACGTACGTACGTACGTACGT"),
            primer(2, b"CCCCCGGGGGCCCCC"),
        ];
        let cfg = cfg_for(12, 1, true, 20.0);

        let refidx = Arc::new(RefIndex::from_records(records).unwrap());
        let thermo = Arc::new(ThermoModel::new(&cfg.thermo));
        let cfg = Arc::new(cfg);
        let primers = Arc::new(primers);

        let ranked: Vec<Vec<(u32, u32, bool, u32)>> = [1usize, 4]
            .iter()
            .map(|&t| {
                run_search(
                    primers.clone(),
                    refidx.clone(),
                    thermo.clone(),
                    cfg.clone(),
                    t,
                )
                .unwrap()
                .collector
                .ranked()
                .iter()
                .map(|b| (b.chrom, b.pos, b.on_forward, b.primer_id))
                .collect()
            })
            .collect();

        assert_eq!(ranked[0], ranked[1]);
        assert!(!ranked[0].is_empty());
    }

    #[test]
    fn stored_site_equals_reference_slice() {
        let refseq = pseudo_dna(2000, 7);
        let primer_seq = refseq[800..820].to_vec();
        let records = vec![("chr1".to_string(), refseq.clone())];

        let out = search(
            records,
            vec![primer(0, &primer_seq)],
            cfg_for(15, 1, true, 20.0),
        );

        assert!(!out.collector.forward[0].is_empty());
        for lists in [&out.collector.forward, &out.collector.reverse] {
            for b in &lists[0] {
                let lo = b.pos as usize;
                let expect = String::from_utf8_lossy(&refseq[lo..lo + primer_seq.len()]);
                assert_eq!(b.site, expect, "site mismatch at pos {}", b.pos);
            }
        }
    }
}
