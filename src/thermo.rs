//! Duplex melting temperature model.
//!
//! Nearest-neighbor thermodynamics (SantaLucia 1998) with the monovalent-
//! equivalent salt correction (SantaLucia 2004). The model evaluates an oligo
//! against a genomic window: the oligo is reverse-complemented to recover the
//! template-side probe, the probe is slid ungapped along the window, the most
//! stable register (minimum free energy at the configured temperature) is
//! kept, and the duplex Tm is computed from the enthalpy/entropy sums of the
//! matched stacks.
//!
//! Mismatched positions contribute no stack, so a degraded site always melts
//! at or below the perfect-match temperature of the same primer.
//!
//! The model is a plain value: parameters and tables live in the handle, not
//! in process globals, so it can be shared read-only across worker threads.

use anyhow::{bail, Result};
use bio::alphabets::dna;

use crate::cfg::ThermoCfg;

/// Gas constant in cal/(K*mol).
const R_GAS: f64 = 1.9872;

/// 0 degrees Celsius in Kelvin.
pub const ABSOLUTE_ZERO: f64 = 273.15;

/// Duplex initiation enthalpy (kcal/mol) and entropy (cal/(K*mol)).
const INIT_DH: f64 = 0.2;
const INIT_DS: f64 = -5.7;

/// Nearest-neighbor stack parameters: enthalpy in kcal/mol, entropy in
/// cal/(K*mol). SantaLucia 1998 unified set; reverse-complement symmetric.
fn stack_params(a: u8, b: u8) -> Option<(f64, f64)> {
    match (a, b) {
        (b'A', b'A') | (b'T', b'T') => Some((-7.9, -22.2)),
        (b'A', b'T') => Some((-7.2, -20.4)),
        (b'T', b'A') => Some((-7.2, -21.3)),
        (b'C', b'A') | (b'T', b'G') => Some((-8.5, -22.7)),
        (b'G', b'T') | (b'A', b'C') => Some((-8.4, -22.4)),
        (b'C', b'T') | (b'A', b'G') => Some((-7.8, -21.0)),
        (b'G', b'A') | (b'T', b'C') => Some((-8.2, -22.2)),
        (b'C', b'G') => Some((-10.6, -27.2)),
        (b'G', b'C') => Some((-9.8, -24.4)),
        (b'C', b'C') | (b'G', b'G') => Some((-8.0, -19.9)),
        _ => None,
    }
}

/// Shared melting temperature oracle.
#[derive(Debug, Clone)]
pub struct ThermoModel {
    /// Free-energy evaluation temperature in Kelvin.
    eval_kelvin: f64,
    /// Annealing oligo concentration in Mol.
    oligo_molar: f64,
    /// Monovalent-equivalent cation concentration in Mol.
    na_equiv_molar: f64,
}

impl ThermoModel {
    pub fn new(cfg: &ThermoCfg) -> Self {
        // Divalent ions are chelated by dNTPs; only the excess contributes.
        let dv_free = (cfg.divalent - cfg.dntp).max(0.0);
        let na_equiv_mmol = cfg.monovalent + 120.0 * dv_free.sqrt();
        Self {
            eval_kelvin: cfg.temp_c + ABSOLUTE_ZERO,
            oligo_molar: cfg.dna_conc / 1e9,
            na_equiv_molar: na_equiv_mmol / 1000.0,
        }
    }

    /// Melting temperature (Celsius) of `oligo` hybridized to `window`.
    ///
    /// `window` is a plus-strand genomic slice and `oligo` is the strand
    /// expected to anneal to it, so `revcomp(oligo)` reconstructs the
    /// template-side sequence the window is compared against.
    pub fn duplex_tm(&self, oligo: &[u8], window: &[u8]) -> Result<f64> {
        if oligo.is_empty() || window.is_empty() {
            bail!("thermodynamic calculation failed: empty duplex input");
        }

        let probe = dna::revcomp(oligo);
        let (dh, ds) = self.best_register(&probe, window);
        Ok(self.tm_from_sums(dh, ds, probe.len()))
    }

    /// Perfect-match melting temperature of a primer (against its own
    /// reverse complement).
    pub fn perfect_tm(&self, primer: &[u8]) -> Result<f64> {
        let template = dna::revcomp(primer);
        self.duplex_tm(primer, &template)
    }

    /// Slide `probe` ungapped along `window` and return the enthalpy/entropy
    /// sums of the most stable register (minimum dG at `eval_kelvin`; ties go
    /// to the leftmost offset).
    fn best_register(&self, probe: &[u8], window: &[u8]) -> (f64, f64) {
        let p = probe.len() as isize;
        let w = window.len() as isize;

        let mut best = (0.0, 0.0);
        let mut best_dg = f64::INFINITY;

        for off in (1 - p)..w {
            let mut dh = 0.0;
            let mut ds = 0.0;
            let lo = 0.max(-off) as usize;
            let hi = (p.min(w - off)) as usize;
            if hi <= lo + 1 {
                continue;
            }
            for i in lo..hi - 1 {
                let j = (i as isize + off) as usize;
                if probe[i] == window[j] && probe[i + 1] == window[j + 1] {
                    if let Some((h, s)) = stack_params(probe[i], probe[i + 1]) {
                        dh += h;
                        ds += s;
                    }
                }
            }
            let dg = dh - self.eval_kelvin * ds / 1000.0;
            if dg < best_dg {
                best_dg = dg;
                best = (dh, ds);
            }
        }

        best
    }

    fn tm_from_sums(&self, stack_dh: f64, stack_ds: f64, duplex_len: usize) -> f64 {
        let dh = stack_dh + INIT_DH;
        let mut ds = stack_ds + INIT_DS;
        if self.na_equiv_molar > 0.0 {
            ds += 0.368 * (duplex_len.saturating_sub(1) as f64) * self.na_equiv_molar.ln();
        }
        1000.0 * dh / (ds + R_GAS * (self.oligo_molar / 4.0).ln()) - ABSOLUTE_ZERO
    }
}
