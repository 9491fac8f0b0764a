//! Binding records, per-chromosome collection, and temperature ranking.

use std::cmp::Ordering;

/// A deduplicated primer binding site.
///
/// `pos` is the canonical start on the chromosome (0-based) and `site` is the
/// length-`|primer|` reference slice starting there; for reverse bindings the
/// primer anneals to the minus strand of that slice.
#[derive(Debug, Clone)]
pub struct Binding {
    pub chrom: u32,
    pub pos: u32,
    pub on_forward: bool,
    /// Realized duplex melting temperature at this site.
    pub temp: f64,
    /// Perfect-match melting temperature of the primer.
    pub perfect_temp: f64,
    pub primer_id: u32,
    pub site: String,
}

/// Per-chromosome, per-orientation accumulation of bindings.
#[derive(Debug, Clone)]
pub struct BindingCollector {
    pub forward: Vec<Vec<Binding>>,
    pub reverse: Vec<Vec<Binding>>,
}

impl BindingCollector {
    pub fn new(num_seqs: usize) -> Self {
        Self {
            forward: vec![Vec::new(); num_seqs],
            reverse: vec![Vec::new(); num_seqs],
        }
    }

    pub fn push(&mut self, b: Binding) {
        let lists = if b.on_forward {
            &mut self.forward
        } else {
            &mut self.reverse
        };
        lists[b.chrom as usize].push(b);
    }

    pub fn num_bindings(&self) -> usize {
        self.forward.iter().map(Vec::len).sum::<usize>()
            + self.reverse.iter().map(Vec::len).sum::<usize>()
    }

    /// All bindings ranked hottest-first.
    pub fn ranked(&self) -> Vec<Binding> {
        let mut all: Vec<Binding> = self
            .forward
            .iter()
            .chain(self.reverse.iter())
            .flatten()
            .cloned()
            .collect();
        sort_bindings(&mut all);
        all
    }
}

/// Sort by realized temperature descending; ties break by
/// (chrom, pos, primer, orientation) so the order is total.
pub fn sort_bindings(bindings: &mut [Binding]) {
    bindings.sort_by(|a, b| {
        b.temp
            .partial_cmp(&a.temp)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chrom.cmp(&b.chrom))
            .then_with(|| a.pos.cmp(&b.pos))
            .then_with(|| a.primer_id.cmp(&b.primer_id))
            .then_with(|| a.on_forward.cmp(&b.on_forward))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(chrom: u32, pos: u32, on_forward: bool, temp: f64, primer_id: u32) -> Binding {
        Binding {
            chrom,
            pos,
            on_forward,
            temp,
            perfect_temp: temp,
            primer_id,
            site: "ACGT".to_string(),
        }
    }

    #[test]
    fn ranked_is_hottest_first_with_total_tiebreak() {
        let mut c = BindingCollector::new(2);
        c.push(binding(1, 5, true, 50.0, 0));
        c.push(binding(0, 9, false, 61.0, 1));
        c.push(binding(0, 2, true, 50.0, 0));
        c.push(binding(1, 5, false, 50.0, 0));

        let ranked = c.ranked();
        let key: Vec<(u32, u32, bool)> = ranked
            .iter()
            .map(|b| (b.chrom, b.pos, b.on_forward))
            .collect();
        assert_eq!(
            key,
            vec![(0, 9, false), (0, 2, true), (1, 5, false), (1, 5, true)]
        );
    }

    #[test]
    fn push_routes_by_chromosome_and_orientation() {
        let mut c = BindingCollector::new(2);
        c.push(binding(0, 1, true, 50.0, 0));
        c.push(binding(1, 2, false, 51.0, 1));
        c.push(binding(0, 3, true, 52.0, 1));

        assert_eq!(c.forward[0].len(), 2);
        assert_eq!(c.reverse[1].len(), 1);
        assert_eq!(c.num_bindings(), 3);
    }
}
