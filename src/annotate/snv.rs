//! Point/indel annotation: region classification, splice proximity,
//! coding/protein change strings, and tiered resolution.

use std::io::Write;

use serde::Serialize;

use crate::chromosome::ChromosomeTable;
use crate::codon::{CodonTable, one_to_three};
use crate::error::Error;
use crate::index::GenomicIndex;
use crate::ncbi::UNKNOWN_ENTREZ_ID;
use crate::refgene::TranscriptMap;
use crate::transcript::{Completeness, Region, RegionKind, Transcript};
use crate::variant::{SnvKind, Variant};
use crate::vcf::GatkSnv;

use super::{BinMatch, bin_transcripts, merge_join, resolve_tiers, sort_by_span, stream_overlaps};

/// One transcript-level annotation of a point/indel variant.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnvAnnotation {
    pub gene: String,
    pub entrez_id: i64,
    pub transcript: String,
    pub exon: String,
    pub na_change: String,
    pub aa_change: String,
    pub region: String,
    pub function: String,
}

impl SnvAnnotation {
    fn for_transcript(tx: &Transcript) -> Self {
        Self {
            gene: tx.gene.clone(),
            entrez_id: tx.entrez_id,
            transcript: tx.transcript_id.clone(),
            ..Self::default()
        }
    }

    fn intergenic() -> Self {
        Self {
            entrez_id: UNKNOWN_ENTREZ_ID,
            region: "intergenic".to_string(),
            ..Self::default()
        }
    }

    /// Special annotations suppress the incomplete tier.
    fn is_special(&self) -> bool {
        self.region.contains("exon") || self.region.contains("splic")
    }
}

/// Position in the coding sequence of a genomic position inside a cds region:
/// the cumulative cds length before the region in transcript orientation,
/// plus the offset within it.
fn cds_position(tx: &Transcript, region: &Region, genomic_pos: i64) -> i64 {
    let mut upstream = 0;
    for r in tx.regions.iter().filter(|r| r.kind == RegionKind::Cds) {
        let before = if tx.strand.is_reverse() {
            r.start > region.end
        } else {
            r.end < region.start
        };
        if before {
            upstream += r.end - r.start + 1;
        }
    }
    if tx.strand.is_reverse() {
        upstream + (region.end - genomic_pos + 1)
    } else {
        upstream + (genomic_pos - region.start + 1)
    }
}

/// 1-based protein position of a coding-sequence position.
fn protein_position(cds_pos: i64) -> i64 {
    (cds_pos + 2) / 3
}

/// Amino acid of the codon covering a coding-sequence position, when the
/// stored coding sequence reaches that far.
fn codon_amino_acid(tx: &Transcript, cds_pos: i64) -> Option<u8> {
    let codon_start = ((cds_pos - 1) / 3 * 3) as usize;
    if codon_start + 3 > tx.cdna.len() {
        return None;
    }
    let codon = tx.cdna.substring(codon_start, Some(3));
    CodonTable::for_chrom(&tx.chrom).lookup(codon.as_bytes())
}

fn substitution_changes(anno: &mut SnvAnnotation, variant: &Variant, tx: &Transcript, region: &Region) {
    let cds_pos = cds_position(tx, region, variant.start);
    anno.na_change = format!(
        "c.{cds_pos}{}>{}",
        variant.ref_allele, variant.alt_allele
    );

    let codon_start = ((cds_pos - 1) / 3 * 3) as usize;
    let offset_in_codon = ((cds_pos - 1) % 3) as usize;
    if codon_start + 3 > tx.cdna.len() {
        return;
    }
    let ref_codon = tx.cdna.substring(codon_start, Some(3));
    let mut alt_codon = ref_codon.as_bytes().to_vec();
    let Some(alt_base) = variant.alt_allele.byte_at(0) else {
        return;
    };
    alt_codon[offset_in_codon] = alt_base;

    let table = CodonTable::for_chrom(&tx.chrom);
    let (Some(ref_aa), Some(alt_aa)) = (table.lookup(ref_codon.as_bytes()), table.lookup(&alt_codon))
    else {
        return;
    };
    let aa_pos = protein_position(cds_pos);
    anno.aa_change = format!("p.{}{}{}", one_to_three(ref_aa), aa_pos, one_to_three(alt_aa));
    anno.function = if ref_aa == alt_aa {
        "synonymous"
    } else if alt_aa == b'*' {
        "stopgain"
    } else if ref_aa == b'*' {
        "stoploss"
    } else {
        "missense"
    }
    .to_string();
}

fn insertion_changes(anno: &mut SnvAnnotation, variant: &Variant, tx: &Transcript, region: &Region) {
    let anchor = cds_position(tx, region, variant.start);
    let neighbor = if tx.strand.is_reverse() {
        anchor - 1
    } else {
        anchor + 1
    };
    let (lo, hi) = (anchor.min(neighbor), anchor.max(neighbor));
    anno.na_change = format!("c.{lo}_{hi}ins{}", variant.alt_allele);

    let frameshift = variant.alt_allele.len() % 3 != 0;
    anno.function = if frameshift {
        "frameshift_insertion"
    } else {
        "nonframeshift_insertion"
    }
    .to_string();

    let aa_pos = protein_position(lo.max(1));
    if frameshift {
        if let Some(aa) = codon_amino_acid(tx, lo.max(1)) {
            anno.aa_change = format!("p.{}{}fs", one_to_three(aa), aa_pos);
        }
    } else {
        anno.aa_change = format!("p.{}_{}ins", aa_pos, aa_pos + 1);
    }
}

fn deletion_changes(anno: &mut SnvAnnotation, variant: &Variant, tx: &Transcript, region: &Region) {
    // Clamp to the coding region; a junction-spanning deletion only removes
    // the coding bases inside it.
    let del_start = variant.start.max(region.start);
    let del_end = variant.end.min(region.end);
    let c1 = cds_position(tx, region, del_start);
    let c2 = cds_position(tx, region, del_end);
    let (lo, hi) = (c1.min(c2), c1.max(c2));

    anno.na_change = if lo == hi {
        let base = tx
            .cdna
            .byte_at((lo - 1) as usize)
            .map(|b| char::from(b).to_string())
            .unwrap_or_default();
        format!("c.{lo}del{base}")
    } else {
        format!("c.{lo}_{hi}del")
    };

    let frameshift = (hi - lo + 1) % 3 != 0;
    anno.function = if frameshift {
        "frameshift_deletion"
    } else {
        "nonframeshift_deletion"
    }
    .to_string();

    let (aa_lo, aa_hi) = (protein_position(lo), protein_position(hi));
    if frameshift {
        if let Some(aa) = codon_amino_acid(tx, lo) {
            anno.aa_change = format!("p.{}{}fs", one_to_three(aa), aa_lo);
        }
    } else if aa_lo == aa_hi {
        if let Some(aa) = codon_amino_acid(tx, lo) {
            anno.aa_change = format!("p.{}{}del", one_to_three(aa), aa_lo);
        }
    } else {
        anno.aa_change = format!("p.{}_{}del", aa_lo, aa_hi);
    }
}

/// Classify one point/indel variant against one non-unknown transcript.
fn classify(variant: &Variant, kind: SnvKind, tx: &Transcript, splicing_len: i64) -> SnvAnnotation {
    let mut anno = SnvAnnotation::for_transcript(tx);

    let overlapping: Vec<&Region> = tx
        .regions
        .iter()
        .filter(|r| r.overlaps(variant.start, variant.end))
        .collect();

    if let Some(cds) = overlapping.iter().copied().find(|r| r.kind == RegionKind::Cds) {
        anno.region = "exonic".to_string();
        anno.exon = format!("exon{}", cds.exon_order);
        match kind {
            SnvKind::Snp => substitution_changes(&mut anno, variant, tx, cds),
            SnvKind::Ins => insertion_changes(&mut anno, variant, tx, cds),
            SnvKind::Del => deletion_changes(&mut anno, variant, tx, cds),
        }
    } else if let Some(utr) = overlapping
        .iter()
        .copied()
        .find(|r| matches!(r.kind, RegionKind::Utr5 | RegionKind::Utr3))
    {
        anno.region = utr.kind.as_str().to_string();
        anno.exon = format!("exon{}", utr.exon_order);
    } else if let Some(intron) = overlapping.first().copied() {
        // Depth of the variant into the intron from its nearer junction.
        let depth = (variant.start - intron.start + 1).min(intron.end - variant.end + 1);
        anno.region = if depth <= splicing_len {
            "splicing".to_string()
        } else {
            "intron".to_string()
        };
    }
    anno
}

/// Annotate one variant against the candidate transcripts of its bin,
/// collecting the three completeness tiers before resolution.
fn annotate_gene(
    snv: &GatkSnv,
    transcripts: &[&Transcript],
    splicing_len: i64,
) -> Vec<SnvAnnotation> {
    let mut complete = Vec::new();
    let mut incomplete = Vec::new();
    let mut unknown = Vec::new();

    let kind = SnvKind::of(&snv.variant);
    for tx in transcripts {
        if !tx.overlaps_exon_span(&snv.variant) {
            continue;
        }
        if tx.completeness == Completeness::Unknown {
            let mut anno = SnvAnnotation::for_transcript(tx);
            anno.region = "unkCDS".to_string();
            unknown.push(anno);
        } else {
            let mut anno = classify(&snv.variant, kind, tx, splicing_len);
            if tx.is_complete() {
                complete.push(anno);
            } else {
                anno.function = "incmplCDS".to_string();
                incomplete.push(anno);
            }
        }
    }

    resolve_tiers(complete, incomplete, unknown, SnvAnnotation::is_special)
}

fn annotate_stream(snv: &GatkSnv, transcripts: &[&Transcript]) -> Vec<SnvAnnotation> {
    stream_overlaps(&snv.variant, transcripts)
        .into_iter()
        .map(|(tx, stream)| {
            let mut anno = SnvAnnotation::for_transcript(tx);
            anno.region = stream.kind.as_str().to_string();
            anno
        })
        .collect()
}

/// Annotations for one variant, walking the fallback chain:
/// gene tiers, then streams, then intergenic.
pub fn annotate_snv(
    snv: &GatkSnv,
    bin_match: BinMatch<'_>,
    catalog: &TranscriptMap,
    splicing_len: i64,
) -> Vec<SnvAnnotation> {
    let BinMatch::Overlap(bin) = bin_match else {
        return vec![SnvAnnotation::intergenic()];
    };
    let transcripts = bin_transcripts(bin, catalog);
    let mut annotations = annotate_gene(snv, &transcripts, splicing_len);
    if annotations.is_empty() {
        annotations = annotate_stream(snv, &transcripts);
    }
    if annotations.is_empty() {
        annotations = vec![SnvAnnotation::intergenic()];
    }
    annotations
}

#[derive(Serialize)]
struct OutputRecord<'a> {
    snv: &'a GatkSnv,
    annotations: &'a [SnvAnnotation],
}

/// Annotate a batch of point/indel variants, one JSON line per variant.
///
/// The input need not be pre-sorted; the engine sorts by numerical span
/// before the merge-join scan.
pub fn run_annotation<W: Write>(
    mut snvs: Vec<GatkSnv>,
    catalog: &TranscriptMap,
    index: &GenomicIndex,
    table: &ChromosomeTable,
    splicing_len: i64,
    writer: &mut W,
) -> Result<(), Error> {
    let spans = sort_by_span(&mut snvs, |snv| snv.variant.numerical_span(table))?;
    merge_join(&snvs, &spans, index, table, |snv, bin_match| {
        let annotations = annotate_snv(snv, bin_match, catalog, splicing_len);
        let record = OutputRecord {
            snv,
            annotations: &annotations,
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| Error::Validation(format!("failed to serialize annotation: {e}")))?;
        writeln!(writer, "{json}")?;
        Ok(())
    })
}
