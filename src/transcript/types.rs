//! Transcript data model types.

use std::fmt;

use crate::chromosome::ChromosomeTable;
use crate::error::Error;
use crate::ncbi::UNKNOWN_ENTREZ_ID;
use crate::sequence::Sequence;
use crate::strand::Strand;
use crate::variant::Variant;

/// Kind of a transcript sub-region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Intron,
    Utr5,
    Utr3,
    Cds,
    Upstream,
    Downstream,
}

impl RegionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intron => "intron",
            Self::Utr5 => "utr5",
            Self::Utr3 => "utr3",
            Self::Cds => "cds",
            Self::Upstream => "upstream",
            Self::Downstream => "downstream",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed sub-interval of one transcript, 1-based inclusive.
///
/// `exon_order` is strand-aware exon numbering; introns and streams carry 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub start: i64,
    pub end: i64,
    pub kind: RegionKind,
    pub exon_order: u32,
}

impl Region {
    /// Overlap test against a 1-based inclusive interval.
    #[must_use]
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        start <= self.end && end >= self.start
    }
}

/// CDS completeness of a transcript.
///
/// `Unknown` means no reliable CDS boundaries exist: region splitting is
/// skipped and only gross overlap is tested. The sequence-derived upgrade
/// may decide between `Complete` and `Incomplete` once, but never
/// resurrects `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    Incomplete,
    Unknown,
}

impl Completeness {
    /// Parse a RefGene cdsStartStat tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "cmpl" => Self::Complete,
            "unk" | "none" => Self::Unknown,
            _ => Self::Incomplete,
        }
    }
}

/// One RefGene transcript record with its derived region model.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub chrom: String,
    pub strand: Strand,
    pub gene: String,
    pub entrez_id: i64,
    pub transcript_id: String,
    pub exon_start: i64,
    pub exon_end: i64,
    pub cds_start: i64,
    pub cds_end: i64,
    pub exon_starts: Vec<i64>,
    pub exon_ends: Vec<i64>,
    pub regions: Vec<Region>,
    pub streams: Vec<Region>,
    pub completeness: Completeness,
    pub mrna: Sequence,
    pub cdna: Sequence,
    pub protein: Sequence,
}

impl Transcript {
    #[must_use]
    pub fn new(
        chrom: String,
        strand: Strand,
        gene: String,
        transcript_id: String,
        exon_start: i64,
        exon_end: i64,
        cds_start: i64,
        cds_end: i64,
        exon_starts: Vec<i64>,
        exon_ends: Vec<i64>,
        completeness: Completeness,
    ) -> Self {
        Self {
            chrom,
            strand,
            gene,
            entrez_id: UNKNOWN_ENTREZ_ID,
            transcript_id,
            exon_start,
            exon_end,
            cds_start,
            cds_end,
            exon_starts,
            exon_ends,
            regions: Vec::new(),
            streams: Vec::new(),
            completeness,
            mrna: Sequence::default(),
            cdna: Sequence::default(),
            protein: Sequence::default(),
        }
    }

    /// Stable identifier: `transcript|chrom:exon_start:exon_end`.
    #[must_use]
    pub fn sn(&self) -> String {
        format!(
            "{}|{}:{}:{}",
            self.transcript_id, self.chrom, self.exon_start, self.exon_end
        )
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completeness == Completeness::Complete
    }

    /// Genome-wide span including both flanking streams.
    pub fn numerical_span(&self, table: &ChromosomeTable) -> Result<(i64, i64), Error> {
        table.numerical_span(&self.chrom, self.streams[0].start, self.streams[1].end)
    }

    /// Exon-span overlap test used to select candidate transcripts.
    #[must_use]
    pub fn overlaps_exon_span(&self, variant: &Variant) -> bool {
        variant.end >= self.exon_start && variant.start <= self.exon_end
    }
}
