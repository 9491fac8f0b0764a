//! PCR product assembly and penalty ranking.
//!
//! Products are formed per chromosome from every forward binding `f` and
//! reverse binding `r` with `r.pos > f.pos` and `r.pos - f.pos <
//! max_prod_size`. Both lists are position-sorted and paired with a
//! two-pointer range scan, so the cost is O(F + R + P) per chromosome rather
//! than the full cross product.

use std::cmp::Ordering;

use crate::bind::{Binding, BindingCollector};
use crate::cfg::ScoringCfg;

/// A candidate PCR amplicon.
#[derive(Debug, Clone)]
pub struct PcrProduct {
    pub chrom: u32,
    pub for_pos: u32,
    pub rev_pos: u32,
    pub for_id: u32,
    pub rev_id: u32,
    pub for_temp: f64,
    pub rev_temp: f64,
    /// rev_pos + |reverse primer| - for_pos
    pub length: u32,
    pub penalty: f64,
}

/// Composite product penalty.
///
/// Only a *shortfall* of the realized temperature below the perfect-match
/// temperature is penalized; a primer that overperforms contributes nothing.
fn penalty(f: &Binding, r: &Binding, length: u32, scoring: &ScoringCfg) -> f64 {
    let mut pen = ((f.perfect_temp - f.temp) * scoring.pen_tm_diff).max(0.0);
    pen += ((r.perfect_temp - r.temp) * scoring.pen_tm_diff).max(0.0);
    pen += (f.temp - r.temp).abs() * scoring.pen_tm_mismatch;
    pen += f64::from(length) * scoring.pen_length;
    pen
}

/// Pair forward and reverse bindings into products.
///
/// `primer_lens[id]` is the primer length used for the product length term.
pub fn assemble(
    collector: &BindingCollector,
    primer_lens: &[usize],
    scoring: &ScoringCfg,
) -> Vec<PcrProduct> {
    let mut products = Vec::new();

    for chrom in 0..collector.forward.len() {
        let mut fw: Vec<&Binding> = collector.forward[chrom].iter().collect();
        let mut rv: Vec<&Binding> = collector.reverse[chrom].iter().collect();
        fw.sort_by_key(|b| (b.pos, b.primer_id));
        rv.sort_by_key(|b| (b.pos, b.primer_id));

        let mut lo = 0usize;
        for f in &fw {
            while lo < rv.len() && rv[lo].pos <= f.pos {
                lo += 1;
            }
            for r in &rv[lo..] {
                if u64::from(r.pos - f.pos) >= u64::from(scoring.max_prod_size) {
                    break;
                }
                let length = r.pos + primer_lens[r.primer_id as usize] as u32 - f.pos;
                if length >= scoring.max_prod_size {
                    continue;
                }
                let pen = penalty(f, r, length, scoring);
                if scoring.cutoff_penalty >= 0.0 && pen >= scoring.cutoff_penalty {
                    continue;
                }
                products.push(PcrProduct {
                    chrom: chrom as u32,
                    for_pos: f.pos,
                    rev_pos: r.pos,
                    for_id: f.primer_id,
                    rev_id: r.primer_id,
                    for_temp: f.temp,
                    rev_temp: r.temp,
                    length,
                    penalty: pen,
                });
            }
        }
    }

    sort_products(&mut products);
    products
}

/// Sort by penalty ascending; ties break by coordinates and primer ids so the
/// order is total.
pub fn sort_products(products: &mut [PcrProduct]) {
    products.sort_by(|a, b| {
        a.penalty
            .partial_cmp(&b.penalty)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chrom.cmp(&b.chrom))
            .then_with(|| a.for_pos.cmp(&b.for_pos))
            .then_with(|| a.rev_pos.cmp(&b.rev_pos))
            .then_with(|| a.for_id.cmp(&b.for_id))
            .then_with(|| a.rev_id.cmp(&b.rev_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::BindingCollector;

    fn binding(chrom: u32, pos: u32, on_forward: bool, temp: f64, perfect: f64) -> Binding {
        Binding {
            chrom,
            pos,
            on_forward,
            temp,
            perfect_temp: perfect,
            primer_id: if on_forward { 0 } else { 1 },
            site: String::new(),
        }
    }

    fn scoring() -> ScoringCfg {
        ScoringCfg::default()
    }

    #[test]
    fn penalty_only_charges_tm_shortfall() {
        let s = scoring();
        let f = binding(0, 10, true, 60.0, 62.0); // 2 below perfect
        let r = binding(0, 100, false, 63.0, 61.0); // overperforms
        let len = 110;
        let pen = penalty(&f, &r, len, &s);
        let expected = 2.0 * s.pen_tm_diff + 3.0 * s.pen_tm_mismatch + 110.0 * s.pen_length;
        assert!((pen - expected).abs() < 1e-9);
    }

    #[test]
    fn pairing_respects_order_and_size() {
        let mut c = BindingCollector::new(1);
        c.push(binding(0, 100, true, 60.0, 60.0));
        c.push(binding(0, 50, false, 60.0, 60.0)); // behind the forward
        c.push(binding(0, 100, false, 60.0, 60.0)); // same position
        c.push(binding(0, 300, false, 60.0, 60.0)); // pairs
        c.push(binding(0, 20_000, false, 60.0, 60.0)); // too far

        let prods = assemble(&c, &[20, 20], &scoring());
        assert_eq!(prods.len(), 1);
        assert_eq!(prods[0].for_pos, 100);
        assert_eq!(prods[0].rev_pos, 300);
        assert_eq!(prods[0].length, 300 + 20 - 100);
    }

    #[test]
    fn length_includes_reverse_primer() {
        let mut c = BindingCollector::new(1);
        c.push(binding(0, 10, true, 60.0, 60.0));
        c.push(binding(0, 90, false, 60.0, 60.0));
        let prods = assemble(&c, &[18, 25], &scoring());
        assert_eq!(prods[0].length, 90 + 25 - 10);
    }

    #[test]
    fn product_spanning_cap_via_primer_length_is_dropped() {
        let mut s = scoring();
        s.max_prod_size = 100;
        let mut c = BindingCollector::new(1);
        c.push(binding(0, 0, true, 60.0, 60.0));
        c.push(binding(0, 90, false, 60.0, 60.0)); // 90 + 20 >= 100
        assert!(assemble(&c, &[20, 20], &s).is_empty());

        c.push(binding(0, 70, false, 60.0, 60.0)); // 70 + 20 < 100
        assert_eq!(assemble(&c, &[20, 20], &s).len(), 1);
    }

    #[test]
    fn cutoff_penalty_filters_products() {
        let mut s = scoring();
        let mut c = BindingCollector::new(1);
        c.push(binding(0, 0, true, 50.0, 60.0)); // 10 degrees short
        c.push(binding(0, 100, false, 60.0, 60.0));

        // negative cutoff keeps everything
        assert_eq!(assemble(&c, &[20, 20], &s).len(), 1);

        let pen = assemble(&c, &[20, 20], &s)[0].penalty;
        s.cutoff_penalty = pen / 2.0;
        assert!(assemble(&c, &[20, 20], &s).is_empty());

        s.cutoff_penalty = pen * 2.0;
        assert_eq!(assemble(&c, &[20, 20], &s).len(), 1);
    }

    #[test]
    fn products_are_ranked_by_penalty() {
        let mut c = BindingCollector::new(1);
        c.push(binding(0, 0, true, 60.0, 60.0));
        c.push(binding(0, 500, false, 60.0, 60.0)); // longer, larger penalty
        c.push(binding(0, 100, false, 60.0, 60.0));
        let prods = assemble(&c, &[20, 20], &scoring());
        assert_eq!(prods.len(), 2);
        assert!(prods[0].penalty <= prods[1].penalty);
        assert_eq!(prods[0].rev_pos, 100);
    }

    #[test]
    fn chromosomes_do_not_cross_pair() {
        let mut c = BindingCollector::new(2);
        c.push(binding(0, 0, true, 60.0, 60.0));
        c.push(binding(1, 100, false, 60.0, 60.0));
        assert!(assemble(&c, &[20, 20], &scoring()).is_empty());
    }
}
