//! Annotation engine: sorted merge-join against the genomic index and
//! tiered resolution of per-transcript annotations.

pub mod cnv;
pub mod snv;

use crate::chromosome::ChromosomeTable;
use crate::error::Error;
use crate::index::{GenomicIndex, GenomicIndexBin};
use crate::refgene::TranscriptMap;
use crate::transcript::{Region, Transcript};
use crate::variant::Variant;

/// Match outcome for one variant in the merge-join scan.
pub enum BinMatch<'a> {
    /// No index bin overlaps the variant: intergenic by construction.
    None,
    /// The first overlapping bin in index order.
    Overlap(&'a GenomicIndexBin),
}

/// Run the sorted merge-join of `items` against the index bins.
///
/// `spans` must be the numerical spans of `items`, and both `items` and the
/// index must be sorted ascending by numerical span (tie-broken by end);
/// the scan is strictly sequential and both cursors only advance. Items
/// sorting past the final bin still visit as [`BinMatch::None`] so that
/// every input produces exactly one output record.
pub fn merge_join<'a, T>(
    items: &[T],
    spans: &[(i64, i64)],
    index: &'a GenomicIndex,
    table: &ChromosomeTable,
    mut visit: impl FnMut(&T, BinMatch<'a>) -> Result<(), Error>,
) -> Result<(), Error> {
    debug_assert_eq!(items.len(), spans.len());
    let bins = index.bins();
    let bin_spans: Vec<(i64, i64)> = bins
        .iter()
        .map(|bin| bin.numerical_span(table))
        .collect::<Result<_, Error>>()?;

    let mut i = 0;
    let mut j = 0;
    while i < items.len() && j < bins.len() {
        let (item_start, item_end) = spans[i];
        let (bin_start, bin_end) = bin_spans[j];
        if item_start > bin_end {
            j += 1;
        } else if item_end < bin_start {
            visit(&items[i], BinMatch::None)?;
            i += 1;
        } else {
            visit(&items[i], BinMatch::Overlap(&bins[j]))?;
            i += 1;
        }
    }
    while i < items.len() {
        visit(&items[i], BinMatch::None)?;
        i += 1;
    }
    Ok(())
}

/// Sort items ascending by numerical span, tie-broken by end, and return
/// the spans aligned with the sorted items.
pub fn sort_by_span<T>(
    items: &mut Vec<T>,
    span_of: impl Fn(&T) -> Result<(i64, i64), Error>,
) -> Result<Vec<(i64, i64)>, Error> {
    let mut keyed: Vec<((i64, i64), T)> = std::mem::take(items)
        .into_iter()
        .map(|item| Ok((span_of(&item)?, item)))
        .collect::<Result<_, Error>>()?;
    keyed.sort_by_key(|(span, _)| *span);
    let mut spans = Vec::with_capacity(keyed.len());
    *items = keyed
        .into_iter()
        .map(|(span, item)| {
            spans.push(span);
            item
        })
        .collect();
    Ok(spans)
}

/// Resolve the candidate tiers into the emitted annotation set.
///
/// Complete-tier annotations are always emitted. Incomplete-tier ones are
/// appended only when nothing emitted so far is special; unknown-tier ones
/// only when the set is still empty.
pub(crate) fn resolve_tiers<A>(
    complete: Vec<A>,
    incomplete: Vec<A>,
    unknown: Vec<A>,
    is_special: impl Fn(&A) -> bool,
) -> Vec<A> {
    let mut annotations = complete;
    if !annotations.iter().any(&is_special) {
        annotations.extend(incomplete);
    }
    if annotations.is_empty() {
        annotations = unknown;
    }
    annotations
}

/// Look up a bin's transcripts in the catalog; unknown sns are skipped.
pub(crate) fn bin_transcripts<'a>(
    bin: &GenomicIndexBin,
    catalog: &'a TranscriptMap,
) -> Vec<&'a Transcript> {
    bin.transcript_sns
        .iter()
        .filter_map(|sn| catalog.get(sn))
        .collect()
}

/// First flanking stream of each transcript overlapping the variant.
pub(crate) fn stream_overlaps<'a>(
    variant: &Variant,
    transcripts: &[&'a Transcript],
) -> Vec<(&'a Transcript, &'a Region)> {
    let mut matches = Vec::new();
    for tx in transcripts {
        if let Some(stream) = tx
            .streams
            .iter()
            .find(|s| s.overlaps(variant.start, variant.end))
        {
            matches.push((*tx, stream));
        }
    }
    matches
}
