//! RefGene flat-file parsing and transcript catalog assembly.

use std::collections::HashMap;
use std::path::Path;

use crate::chromosome::ChromosomeTable;
use crate::error::Error;
use crate::fasta::Fasta;
use crate::ncbi::GeneInfo;
use crate::strand::Strand;
use crate::textfile;
use crate::transcript::{Completeness, Transcript, build_regions, build_streams};

/// Transcript catalog keyed by transcript sn.
pub type TranscriptMap = HashMap<String, Transcript>;

fn parse_i64(field: &str, what: &str) -> Result<i64, Error> {
    field
        .parse()
        .map_err(|_| Error::Parse(format!("invalid {what} field: '{field}'")))
}

fn parse_boundary_list(field: &str, what: &str) -> Result<Vec<i64>, Error> {
    field
        .trim_matches(',')
        .split(',')
        .map(|s| parse_i64(s, what))
        .collect()
}

/// Parse one RefGene line into a transcript with its region model built.
///
/// Columns (UCSC refGene): 1 = name, 2 = chrom, 3 = strand,
/// 4..=7 = txStart/txEnd/cdsStart/cdsEnd (0-based half-open),
/// 9/10 = exon start/end lists, 12 = gene symbol, 13 = completeness tag.
pub fn parse_refgene_line(line: &str, flank: i64) -> Result<Transcript, Error> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 14 {
        return Err(Error::Parse(format!(
            "refgene line has {} fields, expected at least 14",
            fields.len()
        )));
    }

    let chrom = fields[2].strip_prefix("chr").unwrap_or(fields[2]).to_string();
    let strand = Strand::from_refgene(fields[3])?;
    let tx_start = parse_i64(fields[4], "txStart")?;
    let tx_end = parse_i64(fields[5], "txEnd")?;
    let cds_start = parse_i64(fields[6], "cdsStart")?;
    let cds_end = parse_i64(fields[7], "cdsEnd")?;

    // Exon boundaries arrive 0-based half-open; convert starts to 1-based.
    let mut exon_starts = parse_boundary_list(fields[9], "exonStarts")?;
    for start in &mut exon_starts {
        *start += 1;
    }
    let exon_ends = parse_boundary_list(fields[10], "exonEnds")?;
    if exon_starts.is_empty() || exon_starts.len() != exon_ends.len() {
        return Err(Error::Parse(format!(
            "mismatched exon boundary lists for {}: {} starts, {} ends",
            fields[1],
            exon_starts.len(),
            exon_ends.len()
        )));
    }

    let mut tx = Transcript::new(
        chrom,
        strand,
        fields[12].to_string(),
        fields[1].to_string(),
        tx_start + 1,
        tx_end,
        cds_start + 1,
        cds_end,
        exon_starts,
        exon_ends,
        Completeness::from_tag(fields[13]),
    );
    build_regions(&mut tx);
    build_streams(&mut tx, flank);
    Ok(tx)
}

/// Read RefGene catalog files into one list sorted by numerical position.
///
/// Blank lines and `#` comments are skipped, as are records on `M` (the
/// Ensembl-MT companion catalog supplies mitochondrial transcripts as `MT`)
/// and on scaffolds (chromosome names longer than two characters).
pub fn read_refgene_files(
    paths: &[impl AsRef<Path>],
    table: &ChromosomeTable,
    flank: i64,
) -> Result<Vec<Transcript>, Error> {
    let mut transcripts = Vec::new();
    for path in paths {
        for line in textfile::read_lines(path.as_ref())? {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tx = parse_refgene_line(line, flank)?;
            if tx.chrom == "M" || tx.chrom.len() > 2 {
                continue;
            }
            transcripts.push(tx);
        }
    }
    sort_by_numerical_span(&mut transcripts, table)?;
    Ok(transcripts)
}

/// Sort transcripts by numerical span, tie-broken by ascending end.
pub fn sort_by_numerical_span(
    transcripts: &mut Vec<Transcript>,
    table: &ChromosomeTable,
) -> Result<(), Error> {
    let mut keyed: Vec<((i64, i64), Transcript)> = std::mem::take(transcripts)
        .into_iter()
        .map(|tx| Ok((tx.numerical_span(table)?, tx)))
        .collect::<Result<_, Error>>()?;
    keyed.sort_by_key(|(span, _)| *span);
    *transcripts = keyed.into_iter().map(|(_, tx)| tx).collect();
    Ok(())
}

/// Index a transcript list by sn.
#[must_use]
pub fn to_sn_map(transcripts: Vec<Transcript>) -> TranscriptMap {
    transcripts
        .into_iter()
        .map(|tx| (tx.sn(), tx))
        .collect()
}

/// Group a transcript list by chromosome.
#[must_use]
pub fn to_chrom_map(transcripts: &[Transcript]) -> HashMap<String, Vec<&Transcript>> {
    let mut map: HashMap<String, Vec<&Transcript>> = HashMap::new();
    for tx in transcripts {
        map.entry(tx.chrom.clone()).or_default().push(tx);
    }
    map
}

/// Attach Entrez IDs and spliced mRNA sequences to every transcript.
pub fn set_entrez_and_sequences(
    transcripts: &mut [Transcript],
    gene_info: &GeneInfo,
    mrna: &Fasta,
) {
    for tx in transcripts.iter_mut() {
        tx.entrez_id = gene_info.entrez_id(&tx.gene);
        if let Some(seq) = mrna.get(&tx.sn()) {
            crate::transcript::attach_sequence(tx, seq.clone());
        }
    }
}
