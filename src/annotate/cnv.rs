//! CNV annotation: spanned-region classification, exon-range compression,
//! and tiered resolution.

use std::io::Write;

use serde::Serialize;

use crate::chromosome::ChromosomeTable;
use crate::error::Error;
use crate::index::GenomicIndex;
use crate::ncbi::UNKNOWN_ENTREZ_ID;
use crate::refgene::TranscriptMap;
use crate::transcript::{Completeness, RegionKind, Transcript};
use crate::variant::CnvKind;
use crate::vcf::XhmmCnv;

use super::{BinMatch, bin_transcripts, merge_join, resolve_tiers, sort_by_span, stream_overlaps};

/// One transcript-level annotation of a copy-number variant.
///
/// CNVs report which exons they span, not coding changes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CnvAnnotation {
    pub gene: String,
    pub entrez_id: i64,
    pub transcript: String,
    pub exon: String,
    pub region: String,
    pub function: String,
}

impl CnvAnnotation {
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

    fn is_special(&self) -> bool {
        self.region.contains("exon")
    }
}

/// Compress spanned exon orders: `.` for none, `exon.N` for one,
/// `exon.MIN_MAX` for several.
fn exon_label(orders: &[u32]) -> String {
    match orders {
        [] => ".".to_string(),
        [only] => format!("exon.{only}"),
        _ => {
            let min = orders.iter().min().copied().unwrap_or_default();
            let max = orders.iter().max().copied().unwrap_or_default();
            format!("exon.{min}_{max}")
        }
    }
}

/// Annotate one CNV against the candidate transcripts of its bin.
fn annotate_gene(cnv: &XhmmCnv, transcripts: &[&Transcript]) -> Vec<CnvAnnotation> {
    let mut complete = Vec::new();
    let mut incomplete = Vec::new();
    let mut unknown = Vec::new();

    let function = CnvKind::of(&cnv.variant).function();
    for tx in transcripts {
        if !tx.overlaps_exon_span(&cnv.variant) {
            continue;
        }
        let mut anno = CnvAnnotation::for_transcript(tx);
        anno.function = function.to_string();

        if tx.completeness == Completeness::Unknown {
            anno.region = "unkCDS".to_string();
            anno.exon = exon_label(&[]);
            unknown.push(anno);
            continue;
        }

        let mut spanned_exons: Vec<u32> = Vec::new();
        for region in tx
            .regions
            .iter()
            .filter(|r| r.overlaps(cnv.variant.start, cnv.variant.end))
        {
            anno.region = match region.kind {
                RegionKind::Cds => "exonic".to_string(),
                kind => kind.as_str().to_string(),
            };
            if region.kind == RegionKind::Cds && tx.is_complete() {
                spanned_exons.push(region.exon_order);
            }
        }
        anno.exon = exon_label(&spanned_exons);

        if tx.is_complete() {
            complete.push(anno);
        } else {
            anno.region = "incmplCDS".to_string();
            incomplete.push(anno);
        }
    }

    resolve_tiers(complete, incomplete, unknown, CnvAnnotation::is_special)
}

fn annotate_stream(cnv: &XhmmCnv, transcripts: &[&Transcript]) -> Vec<CnvAnnotation> {
    stream_overlaps(&cnv.variant, transcripts)
        .into_iter()
        .map(|(tx, stream)| {
            let mut anno = CnvAnnotation::for_transcript(tx);
            anno.region = stream.kind.as_str().to_string();
            anno.exon = exon_label(&[]);
            anno
        })
        .collect()
}

/// Annotations for one CNV, walking the fallback chain:
/// gene tiers, then streams, then intergenic.
pub fn annotate_cnv(
    cnv: &XhmmCnv,
    bin_match: BinMatch<'_>,
    catalog: &TranscriptMap,
) -> Vec<CnvAnnotation> {
    let BinMatch::Overlap(bin) = bin_match else {
        return vec![CnvAnnotation::intergenic()];
    };
    let transcripts = bin_transcripts(bin, catalog);
    let mut annotations = annotate_gene(cnv, &transcripts);
    if annotations.is_empty() {
        annotations = annotate_stream(cnv, &transcripts);
    }
    if annotations.is_empty() {
        annotations = vec![CnvAnnotation::intergenic()];
    }
    annotations
}

#[derive(Serialize)]
struct OutputRecord<'a> {
    cnv: &'a XhmmCnv,
    annotations: &'a [CnvAnnotation],
}

/// Annotate a batch of CNVs, one JSON line per input record.
///
/// The input need not be pre-sorted; the engine sorts by numerical span
/// before the merge-join scan.
pub fn run_annotation<W: Write>(
    mut cnvs: Vec<XhmmCnv>,
    catalog: &TranscriptMap,
    index: &GenomicIndex,
    table: &ChromosomeTable,
    writer: &mut W,
) -> Result<(), Error> {
    let spans = sort_by_span(&mut cnvs, |cnv| cnv.variant.numerical_span(table))?;
    merge_join(&cnvs, &spans, index, table, |cnv, bin_match| {
        let annotations = annotate_cnv(cnv, bin_match, catalog);
        let record = OutputRecord {
            cnv,
            annotations: &annotations,
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| Error::Validation(format!("failed to serialize annotation: {e}")))?;
        writeln!(writer, "{json}")?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::{Chromosome, ChromosomeTable};
    use crate::refgene::{parse_refgene_line, to_sn_map};
    use crate::sequence::Sequence;
    use crate::variant::Variant;
    use crate::vcf::XhmmInfo;

    fn table() -> ChromosomeTable {
        ChromosomeTable::new(vec![Chromosome {
            name: "1".to_string(),
            length: 10_000,
        }])
        .unwrap()
    }

    /// Forward-strand transcript, exons 101..190, 301..400, 501..600,
    /// CDS 151..560, completeness taken from the catalog tag.
    fn transcript(tag: &str) -> Transcript {
        let line = format!(
            "0\tNM_1.1\tchr1\t+\t100\t600\t150\t560\t0\t100,300,500,\t190,400,600,\t0\tGENE1\t{tag}\tcmpl\t0,"
        );
        parse_refgene_line(&line, 50).unwrap()
    }

    fn cnv(start: i64, end: i64, alt: &str) -> XhmmCnv {
        XhmmCnv {
            variant: Variant {
                chrom: "1".to_string(),
                start,
                end,
                ref_allele: Sequence::from("N"),
                alt_allele: Sequence::from(alt),
            },
            information: XhmmInfo::default(),
            other_info: Vec::new(),
        }
    }

    fn classify_one(tx: &Transcript, cnv: &XhmmCnv) -> CnvAnnotation {
        let annos = annotate_gene(cnv, &[tx]);
        assert_eq!(annos.len(), 1);
        annos.into_iter().next().unwrap()
    }

    #[test]
    fn single_exon_deletion() {
        let tx = transcript("cmpl");
        // Spans only the second exon's CDS piece.
        let anno = classify_one(&tx, &cnv(310, 350, "<DEL>"));
        assert_eq!(anno.region, "exonic");
        assert_eq!(anno.exon, "exon.2");
        assert_eq!(anno.function, "Deletion");
    }

    #[test]
    fn multi_exon_duplication_compresses_range() {
        let tx = transcript("cmpl");
        let anno = classify_one(&tx, &cnv(120, 550, "<DUP>"));
        assert_eq!(anno.exon, "exon.1_3");
        assert_eq!(anno.function, "Duplication");
        assert!(anno.is_special());
    }

    #[test]
    fn intron_only_cnv_has_no_exons() {
        let tx = transcript("cmpl");
        let anno = classify_one(&tx, &cnv(200, 290, "<DEL>"));
        assert_eq!(anno.region, "intron");
        assert_eq!(anno.exon, ".");
    }

    #[test]
    fn incomplete_transcript_reports_incmpl_region() {
        let tx = transcript("incmpl");
        let anno = classify_one(&tx, &cnv(310, 350, "<DEL>"));
        assert_eq!(anno.region, "incmplCDS");
        // Exons are only collected from complete transcripts.
        assert_eq!(anno.exon, ".");
    }

    #[test]
    fn unknown_transcript_reports_unkcds() {
        let tx = transcript("unk");
        let anno = classify_one(&tx, &cnv(310, 350, "<DEL>"));
        assert_eq!(anno.region, "unkCDS");
    }

    #[test]
    fn exonic_complete_tier_suppresses_incomplete() {
        let complete_tx = transcript("cmpl");
        let mut incomplete_tx = transcript("incmpl");
        incomplete_tx.transcript_id = "NM_2.1".to_string();

        let annos = annotate_gene(&cnv(310, 350, "<DEL>"), &[&complete_tx, &incomplete_tx]);
        assert_eq!(annos.len(), 1);
        assert_eq!(annos[0].transcript, "NM_1.1");

        // An intron-only CNV is not special, so both tiers report.
        let annos = annotate_gene(&cnv(200, 290, "<DEL>"), &[&complete_tx, &incomplete_tx]);
        assert_eq!(annos.len(), 2);
        assert_eq!(annos[1].region, "incmplCDS");
    }

    #[test]
    fn stream_and_intergenic_fallbacks() {
        let t = table();
        let tx = transcript("cmpl");
        let index = GenomicIndex::build(&t, 1000, std::slice::from_ref(&tx)).unwrap();
        let catalog = to_sn_map(vec![tx]);
        let bin = index.bins().first().unwrap();

        let downstream = cnv(620, 640, "<DEL>");
        let annos = annotate_cnv(&downstream, BinMatch::Overlap(bin), &catalog);
        assert_eq!(annos.len(), 1);
        assert_eq!(annos[0].region, "downstream");

        let nowhere = cnv(5000, 5100, "<DUP>");
        let annos = annotate_cnv(&nowhere, BinMatch::None, &catalog);
        assert_eq!(annos.len(), 1);
        assert_eq!(annos[0].region, "intergenic");
        assert!(annos[0].gene.is_empty());
    }

    #[test]
    fn run_annotation_writes_cnv_records() {
        let t = table();
        let tx = transcript("cmpl");
        let index = GenomicIndex::build(&t, 1000, std::slice::from_ref(&tx)).unwrap();
        let catalog = to_sn_map(vec![tx]);

        let cnvs = vec![cnv(310, 350, "<DEL>")];
        let mut out = Vec::new();
        run_annotation(cnvs, &catalog, &index, &t, &mut out).unwrap();

        let line = std::str::from_utf8(&out).unwrap().lines().next().unwrap();
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(record["cnv"]["variant"]["alt"], "<DEL>");
        assert_eq!(record["annotations"][0]["exon"], "exon.2");
        assert_eq!(record["annotations"][0]["function"], "Deletion");
    }

    #[test]
    fn exon_label_compression() {
        assert_eq!(exon_label(&[]), ".");
        assert_eq!(exon_label(&[3]), "exon.3");
        assert_eq!(exon_label(&[3, 1, 2]), "exon.1_3");
    }
}
