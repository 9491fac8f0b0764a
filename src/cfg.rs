//! Configuration of `ampliseek`
//!
//! Most knobs are exposed on the CLI (`cli.rs`) and land here as strongly
//! typed config structs. The defaults below mirror the CLI defaults.

/// Global configuration for a design run.
///
/// Composed of:
/// - `search`: neighborhood enumeration and index lookup parameters
/// - `scoring`: binding filters and product penalty weights
/// - `thermo`: duplex melting temperature model parameters
#[derive(Debug, Clone, Default)]
pub struct DesignCfg {
    /// Approximate search parameters (k-mer anchor, neighborhood, caps).
    pub search: SearchCfg,
    /// Binding/product filters and penalty weights.
    pub scoring: ScoringCfg,
    /// Duplex melting temperature model parameters.
    pub thermo: ThermoCfg,
    /// Emit bindings only and skip amplicon assembly.
    pub prune_primers: bool,
}

/// Approximate search configuration.
///
/// Tuning notes:
/// - Larger `kmer` makes the anchor more specific (fewer index hits) but less
///   tolerant of variants near the 3' end.
/// - `distance` is the neighborhood radius; with `indel` the neighborhood also
///   contains insertions/deletions and the context windows widen accordingly.
/// - The caps bound worst-case work per primer; hitting either one means the
///   results are incomplete and a warning is emitted.
#[derive(Debug, Clone)]
pub struct SearchCfg {
    /// k-mer anchor length. The anchor is the k-suffix of the primer; primers
    /// shorter than `kmer` anchor on the whole primer.
    pub kmer: usize,
    /// Neighborhood radius (number of allowed differences from the anchor).
    pub distance: usize,
    /// Edit-distance neighborhoods (substitutions + indels) when `true`,
    /// Hamming (substitutions only) when `false`.
    pub indel: bool,
    /// Maximum neighborhood size per anchor orientation.
    pub max_neighborhood: usize,
    /// Maximum number of index hits processed per primer (both orientations
    /// share the budget).
    pub max_locations: usize,
}

impl Default for SearchCfg {
    fn default() -> Self {
        Self {
            kmer: 15,
            distance: 1,
            indel: true,
            max_neighborhood: 10_000,
            max_locations: 10_000,
        }
    }
}

impl SearchCfg {
    /// Context width added on each side of an index hit before the
    /// per-orientation k-offset. Edit-distance neighbors may start up to
    /// `distance` bases away from the reported hit, so the window widens.
    pub fn context(&self) -> usize {
        if self.indel {
            self.distance
        } else {
            0
        }
    }
}

/// Binding filters and product penalty weights.
#[derive(Debug, Clone)]
pub struct ScoringCfg {
    /// Minimum realized melting temperature for a binding to be retained
    /// (strict: a binding at exactly `cut_temp` is discarded).
    pub cut_temp: f64,
    /// Maximum amplicon length in bp.
    pub max_prod_size: u32,
    /// Maximum product penalty; negative keeps all products.
    pub cutoff_penalty: f64,
    /// Weight of the per-primer Tm shortfall (perfect minus realized).
    pub pen_tm_diff: f64,
    /// Weight of the forward/reverse realized Tm difference.
    pub pen_tm_mismatch: f64,
    /// Weight of the amplicon length.
    pub pen_length: f64,
}

impl Default for ScoringCfg {
    fn default() -> Self {
        Self {
            cut_temp: 45.0,
            max_prod_size: 15_000,
            cutoff_penalty: -1.0,
            pen_tm_diff: 0.6,
            pen_tm_mismatch: 0.4,
            pen_length: 0.001,
        }
    }
}

/// Duplex melting temperature model parameters.
///
/// Concentrations follow the usual PCR conventions: ions and dNTPs in mMol,
/// annealing oligos in nMol.
#[derive(Debug, Clone)]
pub struct ThermoCfg {
    /// Temperature for free-energy evaluation in Celsius (used to pick the
    /// most stable binding register).
    pub temp_c: f64,
    /// Concentration of monovalent cations in mMol.
    pub monovalent: f64,
    /// Concentration of divalent cations in mMol.
    pub divalent: f64,
    /// Concentration of annealing oligos in nMol.
    pub dna_conc: f64,
    /// Sum of all dNTPs in mMol.
    pub dntp: f64,
}

impl Default for ThermoCfg {
    fn default() -> Self {
        Self {
            temp_c: 37.0,
            monovalent: 50.0,
            divalent: 1.5,
            dna_conc: 50.0,
            dntp: 0.6,
        }
    }
}
