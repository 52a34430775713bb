//! Region-model construction: exon splitting, flanking streams,
//! and the sequence-derived completeness decision.

use crate::codon::CodonTable;
use crate::sequence::Sequence;

use super::types::{Completeness, Region, RegionKind, Transcript};

/// Split a transcript's exons into typed sub-regions.
///
/// Produces one intron region per inter-exon gap and, per exon, either a
/// single region (fully UTR or fully CDS) or up to three pieces in genomic
/// order when the exon straddles a CDS boundary. UTR kinds follow reading
/// direction: a piece genomically before the CDS is utr5 on the forward
/// strand and utr3 on the reverse strand, and vice versa after the CDS.
///
/// Transcripts tagged [`Completeness::Unknown`] have no reliable CDS
/// boundaries; splitting is skipped and only gross overlap is ever tested.
pub fn build_regions(tx: &mut Transcript) {
    if tx.completeness == Completeness::Unknown {
        return;
    }

    let exon_count = tx.exon_starts.len();
    let reverse = tx.strand.is_reverse();
    let (before_kind, after_kind) = if reverse {
        (RegionKind::Utr3, RegionKind::Utr5)
    } else {
        (RegionKind::Utr5, RegionKind::Utr3)
    };

    let mut regions = Vec::new();
    for i in 0..exon_count {
        if i > 0 {
            regions.push(Region {
                start: tx.exon_ends[i - 1] + 1,
                end: tx.exon_starts[i] - 1,
                kind: RegionKind::Intron,
                exon_order: 0,
            });
        }

        // Exon numbering counts from the 5' end of the transcript: ascending
        // on the forward strand, descending genomically on the reverse.
        let exon_order = if reverse {
            (exon_count - i) as u32
        } else {
            (i + 1) as u32
        };

        let (start, end) = (tx.exon_starts[i], tx.exon_ends[i]);
        if tx.cds_start > end {
            regions.push(Region {
                start,
                end,
                kind: before_kind,
                exon_order,
            });
        } else if tx.cds_end < start {
            regions.push(Region {
                start,
                end,
                kind: after_kind,
                exon_order,
            });
        } else if tx.cds_start <= start && end <= tx.cds_end {
            regions.push(Region {
                start,
                end,
                kind: RegionKind::Cds,
                exon_order,
            });
        } else {
            // Straddles one or both CDS boundaries.
            if start < tx.cds_start {
                regions.push(Region {
                    start,
                    end: tx.cds_start - 1,
                    kind: before_kind,
                    exon_order,
                });
            }
            regions.push(Region {
                start: start.max(tx.cds_start),
                end: end.min(tx.cds_end),
                kind: RegionKind::Cds,
                exon_order,
            });
            if end > tx.cds_end {
                regions.push(Region {
                    start: tx.cds_end + 1,
                    end,
                    kind: after_kind,
                    exon_order,
                });
            }
        }
    }

    regions.sort_by_key(|r| r.start);
    tx.regions = regions;
}

/// Attach the fixed-width flanking streams.
///
/// Both flanks are literally named upstream/downstream in genomic order,
/// independent of strand.
pub fn build_streams(tx: &mut Transcript, flank: i64) {
    tx.streams = vec![
        Region {
            start: tx.exon_start - flank,
            end: tx.exon_start - 1,
            kind: RegionKind::Upstream,
            exon_order: 0,
        },
        Region {
            start: tx.exon_end + 1,
            end: tx.exon_end + flank,
            kind: RegionKind::Downstream,
            exon_order: 0,
        },
    ];
}

/// Attach the transcript's genomic-span mRNA and derive the coding sequence.
///
/// The coding sequence is the concatenation of the cds-region substrings in
/// region order, reversed on the minus strand. Translation uses the
/// mitochondrial table iff the transcript is on `MT`. A protein containing a
/// stop symbol upgrades the transcript to complete; otherwise it is marked
/// incomplete and the partial protein discarded. Unknown transcripts never
/// receive a coding sequence.
pub fn attach_sequence(tx: &mut Transcript, mrna: Sequence) {
    if mrna.is_empty() {
        return;
    }
    tx.mrna = mrna;

    if tx.completeness != Completeness::Unknown {
        let parts: Vec<Sequence> = tx
            .regions
            .iter()
            .filter(|r| r.kind == RegionKind::Cds)
            .map(|r| {
                tx.mrna.substring(
                    (r.start - tx.exon_start) as usize,
                    Some((r.end - r.start + 1) as usize),
                )
            })
            .collect();
        let mut cdna = Sequence::concat(parts.iter());
        if tx.strand.is_reverse() {
            cdna = cdna.reversed();
        }
        tx.cdna = cdna;
    }

    if !tx.cdna.is_empty() {
        let protein = tx.cdna.translate(&CodonTable::for_chrom(&tx.chrom));
        if protein.is_complete() {
            tx.completeness = Completeness::Complete;
            tx.protein = protein;
        } else {
            tx.completeness = Completeness::Incomplete;
            tx.protein = Sequence::default();
        }
    }
}
