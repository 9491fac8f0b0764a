//! CLI definition for `ampliseek` primer binding-site search and amplicon
//! assembly.
//!
//! Here we:
//! - Declare CLI arguments (paths, search knobs, penalty weights, thermo
//!   parameters)
//! - Provide clap parsing via `build_cli()`
//!
//! Design notes:
//! - The real knobs live in `cfg.rs` as strongly typed config structs; the
//!   CLI mirrors their defaults.
//! - `genome` and the positional primer FASTA are *not* marked required so
//!   that `main` can print its own usage line and exit with the usage status
//!   instead of clap's.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// Build and parse the command-line interface, returning clap's `ArgMatches`.
pub fn build_cli() -> ArgMatches {
    let c = Command::new("ampliseek")
        .version(clap::crate_version!())
        .about("Search primer binding sites in a reference genome and assemble PCR amplicons.")
        // ----------------------------
        // Inputs / outputs
        // ----------------------------
        .arg(
            Arg::new("input")
                .help("Candidate primer FASTA")
                .long_help(
                    "FASTA (optionally gzipped) of candidate primers, one record per primer.\n\
\n\
Sequences must be over A/C/G/T. Every primer is searched in both orientations:\n\
the k-suffix anchor on the plus strand, and its reverse complement for minus-strand sites.",
                )
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("genome")
                .help("Reference genome FASTA (plain or gzipped)")
                .short('g')
                .long("genome")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("outfile")
                .help("Write the JSON result document here instead of stdout")
                .short('o')
                .long("outfile")
                .value_parser(value_parser!(PathBuf)),
        )
        // ----------------------------
        // Approximate search
        // ----------------------------
        .arg(
            Arg::new("kmer")
                .help("k-mer anchor size")
                .long_help(
                    "Length of the k-mer anchor taken from the primer's 3' end.\n\
\n\
Larger anchors are more specific (fewer index hits per neighbor) but tolerate fewer\n\
variants near the 3' end, where binding matters most for extension. Primers shorter\n\
than the anchor are searched whole.",
                )
                .short('k')
                .long("kmer")
                .default_value("15")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("distance")
                .help("Neighborhood distance")
                .long_help(
                    "Neighborhood radius around the anchor.\n\
\n\
With --hamming only substitutions count; otherwise insertions and deletions are\n\
also enumerated and the context window around each hit widens by the distance on\n\
both sides. Neighborhood size grows quickly: distance 2 on a 15-mer is already\n\
thousands of candidates.",
                )
                .short('d')
                .long("distance")
                .default_value("1")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("hamming")
                .help("Use Hamming neighborhoods instead of edit distance")
                .short('n')
                .long("hamming")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("maxNeighborhood")
                .help("Max. neighborhood size per primer orientation")
                .short('x')
                .long("maxNeighborhood")
                .default_value("10000")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("maxmatches")
                .help("Max. number of index matches per primer")
                .long_help(
                    "Budget of index hits processed per primer, shared across both orientations.\n\
\n\
When the budget is exhausted the primer's results are truncated and a warning is\n\
emitted; the surviving hits are the lexicographically-first neighbors' lowest\n\
reference offsets, so truncation is deterministic.",
                )
                .short('m')
                .long("maxmatches")
                .default_value("10000")
                .value_parser(value_parser!(usize)),
        )
        // ----------------------------
        // Scoring and penalties
        // ----------------------------
        .arg(
            Arg::new("cutTemp")
                .help("Min. primer melting temperature")
                .short('c')
                .long("cutTemp")
                .default_value("45.0")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("maxProdSize")
                .help("Max. PCR product size")
                .short('l')
                .long("maxProdSize")
                .default_value("15000")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("cutoffPenalty")
                .help("Max. penalty for products (-1 = keep all)")
                .long("cutoffPenalty")
                .default_value("-1.0")
                .allow_hyphen_values(true)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("penaltyTmDiff")
                .help("Weight for deviation of primer Tm below its perfect match")
                .long("penaltyTmDiff")
                .default_value("0.6")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("penaltyTmMismatch")
                .help("Weight for the Tm difference within a primer pair")
                .long("penaltyTmMismatch")
                .default_value("0.4")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("penaltyLength")
                .help("Weight for the amplicon length")
                .long("penaltyLength")
                .default_value("0.001")
                .value_parser(value_parser!(f64)),
        )
        // ----------------------------
        // Tm calculation
        // ----------------------------
        .arg(
            Arg::new("enttemp")
                .help("Temperature for entropy and enthalpy calculation in Celsius")
                .long("enttemp")
                .default_value("37.0")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("monovalent")
                .help("Concentration of monovalent ions in mMol")
                .long("monovalent")
                .default_value("50.0")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("divalent")
                .help("Concentration of divalent ions in mMol")
                .long("divalent")
                .default_value("1.5")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("dna")
                .help("Concentration of annealing(!) oligos in nMol")
                .long("dna")
                .default_value("50.0")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("dntp")
                .help("The sum of all dNTPs in mMol")
                .long("dntp")
                .default_value("0.6")
                .value_parser(value_parser!(f64)),
        )
        // ----------------------------
        // Mode / resources
        // ----------------------------
        .arg(
            Arg::new("pruneprimer")
                .help("Emit primer bindings only; skip amplicon assembly")
                .short('q')
                .long("pruneprimer")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("threads")
                .help("Number of worker threads (0 = all cores)")
                .short('t')
                .long("threads")
                .default_value("0")
                .value_parser(value_parser!(usize)),
        );

    c.get_matches()
}
