mod align;
mod amplicon;
mod bind;
mod cfg;
mod cli;
mod io;
mod neighborhood;
mod pipeline;
mod reference;
mod thermo;

use anyhow::Result;
use calm_io::stderrln;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cfg::{DesignCfg, ScoringCfg, SearchCfg, ThermoCfg};
use crate::thermo::ThermoModel;

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let args = cli::build_cli();

    // Missing inputs are a usage error, reported the classic way rather than
    // through clap, so the exit status is -1 and not clap's.
    let (Some(primer_path), Some(genome_path)) = (
        args.get_one::<PathBuf>("input"),
        args.get_one::<PathBuf>("genome"),
    ) else {
        stderrln!("Usage: ampliseek [OPTIONS] -g <ref.fa.gz> primers.fasta")?;
        stderrln!("Run with --help for the full option list.")?;
        return Ok(-1);
    };

    for (what, path) in [("primer file", primer_path), ("genome", genome_path)] {
        if !path.is_file() {
            stderrln!("Error: {} {} does not exist!", what, path.display())?;
            return Ok(1);
        }
    }

    let cfg = DesignCfg {
        search: SearchCfg {
            kmer: *args.get_one::<usize>("kmer").unwrap(),
            distance: *args.get_one::<usize>("distance").unwrap(),
            indel: !args.get_flag("hamming"),
            max_neighborhood: *args.get_one::<usize>("maxNeighborhood").unwrap(),
            max_locations: *args.get_one::<usize>("maxmatches").unwrap(),
        },
        scoring: ScoringCfg {
            cut_temp: *args.get_one::<f64>("cutTemp").unwrap(),
            max_prod_size: *args.get_one::<u32>("maxProdSize").unwrap(),
            cutoff_penalty: *args.get_one::<f64>("cutoffPenalty").unwrap(),
            pen_tm_diff: *args.get_one::<f64>("penaltyTmDiff").unwrap(),
            pen_tm_mismatch: *args.get_one::<f64>("penaltyTmMismatch").unwrap(),
            pen_length: *args.get_one::<f64>("penaltyLength").unwrap(),
        },
        thermo: ThermoCfg {
            temp_c: *args.get_one::<f64>("enttemp").unwrap(),
            monovalent: *args.get_one::<f64>("monovalent").unwrap(),
            divalent: *args.get_one::<f64>("divalent").unwrap(),
            dna_conc: *args.get_one::<f64>("dna").unwrap(),
            dntp: *args.get_one::<f64>("dntp").unwrap(),
        },
        prune_primers: args.get_flag("pruneprimer"),
    };

    let mut threads = *args.get_one::<usize>("threads").unwrap();
    if threads == 0 {
        threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
    }

    let primers = io::load_primers(primer_path)?;
    stderrln!("Loaded {} candidate primers", primers.len())?;

    let records = io::load_reference_records(genome_path)?;
    let refidx = reference::RefIndex::from_records(records)?;
    let total_bp: usize = (0..refidx.num_seqs()).map(|i| refidx.seq_len(i)).sum();
    stderrln!(
        "Indexed {} reference sequences ({} bp)",
        refidx.num_seqs(),
        total_bp
    )?;

    let thermo = ThermoModel::new(&cfg.thermo);

    let primer_lens: Vec<usize> = primers.iter().map(|p| p.seq.len()).collect();
    let primer_names: Vec<String> = primers.iter().map(|p| p.name.clone()).collect();
    let primer_out: Vec<io::PrimerOut> = primers
        .iter()
        .map(|p| io::PrimerOut {
            name: p.name.clone(),
            seq: String::from_utf8_lossy(&p.seq).into_owned(),
        })
        .collect();

    let refidx = Arc::new(refidx);
    let outcome = pipeline::run_search(
        Arc::new(primers),
        refidx.clone(),
        Arc::new(thermo),
        Arc::new(cfg.clone()),
        threads,
    )?;

    stderrln!("Found {} primer bindings", outcome.collector.num_bindings())?;
    let ranked = outcome.collector.ranked();

    let bindings: Vec<io::BindingOut> = ranked
        .iter()
        .map(|b| io::BindingOut {
            chrom: refidx.name(b.chrom as usize).to_string(),
            pos: b.pos,
            strand: if b.on_forward { '+' } else { '-' },
            primer: primer_names[b.primer_id as usize].clone(),
            temp: b.temp,
            perfect_temp: b.perfect_temp,
            seq: b.site.clone(),
        })
        .collect();

    let products: Vec<io::ProductOut> = if cfg.prune_primers {
        Vec::new()
    } else {
        let prods = amplicon::assemble(&outcome.collector, &primer_lens, &cfg.scoring);
        stderrln!("Assembled {} PCR products", prods.len())?;
        prods
            .iter()
            .map(|p| io::ProductOut {
                chrom: refidx.name(p.chrom as usize).to_string(),
                for_pos: p.for_pos,
                rev_pos: p.rev_pos,
                for_primer: primer_names[p.for_id as usize].clone(),
                rev_primer: primer_names[p.rev_id as usize].clone(),
                for_temp: p.for_temp,
                rev_temp: p.rev_temp,
                length: p.length,
                penalty: p.penalty,
            })
            .collect()
    };

    let report = io::RunReport {
        primers: primer_out,
        bindings,
        products,
    };
    io::write_report(args.get_one::<PathBuf>("outfile").map(|p| p.as_path()), &report)?;

    Ok(0)
}
