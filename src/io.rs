// reading fasta inputs and writing the result document

use anyhow::{bail, Result};
use bio::io::fasta;
use flate2::read::MultiGzDecoder;
use serde::Serialize;
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

/// A candidate primer as loaded from the input FASTA.
#[derive(Debug, Clone)]
pub struct Primer {
    pub id: u32,
    pub name: String,
    /// Uppercase sequence over {A,C,G,T}.
    pub seq: Vec<u8>,
}

/// Open a FASTA file, transparently decompressing gzipped inputs.
///
/// Compression is detected by sniffing the two-byte gzip magic rather than
/// trusting the file name, so `.fa`, `.fa.gz` and unconventionally named
/// inputs all work.
pub fn open_fasta_reader<P: AsRef<Path>>(
    path: P,
) -> Result<fasta::Reader<Box<dyn BufRead + Send>>> {
    let path = path.as_ref();
    let file =
        File::open(path).map_err(|e| anyhow::anyhow!("cannot open {}: {e}", path.display()))?;
    let mut raw = BufReader::new(file);

    let gzipped = matches!(raw.fill_buf(), Ok([0x1f, 0x8b, ..]));
    let stream: Box<dyn BufRead + Send> = if gzipped {
        Box::new(BufReader::new(MultiGzDecoder::new(raw)))
    } else {
        Box::new(raw)
    };

    Ok(fasta::Reader::from_bufread(stream))
}

/// Load candidate primers from a FASTA file.
///
/// Sequences are uppercased; anything outside {A,C,G,T} is a configuration
/// error since the neighborhood alphabet cannot represent it.
pub fn load_primers<P: AsRef<Path>>(path: P) -> Result<Vec<Primer>> {
    let reader = open_fasta_reader(&path)?;
    let mut primers = Vec::new();

    for rec in reader.records() {
        let rec = rec?;
        let seq = rec.seq().to_ascii_uppercase();
        if seq.is_empty() {
            bail!("primer '{}' has an empty sequence", rec.id());
        }
        if let Some(&bad) = seq.iter().find(|b| !matches!(b, b'A' | b'C' | b'G' | b'T')) {
            bail!(
                "primer '{}' contains invalid base '{}'",
                rec.id(),
                bad as char
            );
        }
        primers.push(Primer {
            id: primers.len() as u32,
            name: rec.id().to_string(),
            seq,
        });
    }

    Ok(primers)
}

/// Load reference sequences as (name, sequence) pairs.
pub fn load_reference_records<P: AsRef<Path>>(path: P) -> Result<Vec<(String, Vec<u8>)>> {
    let reader = open_fasta_reader(&path)?;
    let mut records = Vec::new();
    for rec in reader.records() {
        let rec = rec?;
        records.push((rec.id().to_string(), rec.seq().to_vec()));
    }
    if records.is_empty() {
        bail!("reference contains no sequences");
    }
    Ok(records)
}

// Result document. Bindings and products are pre-ranked by the caller.

#[derive(Debug, Serialize)]
pub struct PrimerOut {
    pub name: String,
    pub seq: String,
}

#[derive(Debug, Serialize)]
pub struct BindingOut {
    pub chrom: String,
    pub pos: u32,
    pub strand: char,
    pub primer: String,
    pub temp: f64,
    pub perfect_temp: f64,
    pub seq: String,
}

#[derive(Debug, Serialize)]
pub struct ProductOut {
    pub chrom: String,
    pub for_pos: u32,
    pub rev_pos: u32,
    pub for_primer: String,
    pub rev_primer: String,
    pub for_temp: f64,
    pub rev_temp: f64,
    pub length: u32,
    pub penalty: f64,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub primers: Vec<PrimerOut>,
    pub bindings: Vec<BindingOut>,
    pub products: Vec<ProductOut>,
}

/// Write the result document as JSON to `outfile`, or stdout when absent.
pub fn write_report(outfile: Option<&Path>, report: &RunReport) -> Result<()> {
    let mut sink: Box<dyn Write> = match outfile {
        Some(path) => {
            let f = File::create(path)
                .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", path.display()))?;
            Box::new(BufWriter::new(f))
        }
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    serde_json::to_writer_pretty(&mut sink, report)?;
    sink.write_all(b"\n")?;
    sink.flush()?;
    Ok(())
}
