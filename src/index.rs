//! Genome-wide interval index over fixed-width chromosome bins.

use std::io::Write;
use std::path::Path;
use std::thread;

use crate::chromosome::ChromosomeTable;
use crate::error::Error;
use crate::textfile;
use crate::transcript::Transcript;

/// One fixed-width chromosome bin listing the transcripts overlapping it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicIndexBin {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub transcript_sns: Vec<String>,
}

impl GenomicIndexBin {
    /// Genome-wide numerical span of this bin.
    pub fn numerical_span(&self, table: &ChromosomeTable) -> Result<(i64, i64), Error> {
        table.numerical_span(&self.chrom, self.start, self.end)
    }
}

/// The genome-wide index: non-empty bins sorted by numerical position.
#[derive(Debug)]
pub struct GenomicIndex {
    bins: Vec<GenomicIndexBin>,
}

impl GenomicIndex {
    #[must_use]
    pub fn bins(&self) -> &[GenomicIndexBin] {
        &self.bins
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Build the index from a transcript catalog.
    ///
    /// Phase 1 partitions every configured chromosome into contiguous bins of
    /// `step` width (last bin truncated to the chromosome length). Phase 2
    /// back-fills each bin with the sns of the transcripts whose numerical
    /// span (streams included) overlaps it. The back-fill runs one worker
    /// thread per chromosome; partial results are merged in chromosome-table
    /// order, so the output is independent of scheduling.
    pub fn build(
        table: &ChromosomeTable,
        step: i64,
        transcripts: &[Transcript],
    ) -> Result<Self, Error> {
        let by_chrom = crate::refgene::to_chrom_map(transcripts);

        let per_chrom: Vec<Result<Vec<GenomicIndexBin>, Error>> = thread::scope(|scope| {
            let handles: Vec<_> = table
                .iter()
                .map(|chrom| {
                    let chrom_transcripts = by_chrom
                        .get(&chrom.name)
                        .map(|txs| txs.as_slice())
                        .unwrap_or(&[]);
                    scope.spawn(move || {
                        build_chromosome_bins(table, &chrom.name, chrom.length, step, chrom_transcripts)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(_) => Err(Error::Validation(
                        "index back-fill worker panicked".to_string(),
                    )),
                })
                .collect()
        });

        let mut bins = Vec::new();
        for chrom_bins in per_chrom {
            bins.extend(chrom_bins?);
        }
        Ok(Self { bins })
    }

    /// Write the index as tab-separated text: `chrom start end sn,sn,...`.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        for bin in &self.bins {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}",
                bin.chrom,
                bin.start,
                bin.end,
                bin.transcript_sns.join(",")
            )?;
        }
        Ok(())
    }

    /// Read an index file and restore the numerical-position sort order.
    pub fn read_file(path: &Path, table: &ChromosomeTable) -> Result<Self, Error> {
        let mut bins = Vec::new();
        for line in textfile::read_lines(path)? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 4 {
                return Err(Error::Parse(format!(
                    "index line has {} fields, expected 4: {line}",
                    fields.len()
                )));
            }
            let start = fields[1]
                .parse()
                .map_err(|_| Error::Parse(format!("invalid index start: '{}'", fields[1])))?;
            let end = fields[2]
                .parse()
                .map_err(|_| Error::Parse(format!("invalid index end: '{}'", fields[2])))?;
            bins.push(GenomicIndexBin {
                chrom: fields[0].to_string(),
                start,
                end,
                transcript_sns: fields[3].split(',').map(str::to_string).collect(),
            });
        }

        let mut keyed: Vec<((i64, i64), GenomicIndexBin)> = bins
            .into_iter()
            .map(|bin| Ok((bin.numerical_span(table)?, bin)))
            .collect::<Result<_, Error>>()?;
        keyed.sort_by_key(|(span, _)| *span);
        Ok(Self {
            bins: keyed.into_iter().map(|(_, bin)| bin).collect(),
        })
    }
}

/// Partition one chromosome and back-fill its bins. Empty bins are dropped.
fn build_chromosome_bins(
    table: &ChromosomeTable,
    chrom: &str,
    length: i64,
    step: i64,
    transcripts: &[&Transcript],
) -> Result<Vec<GenomicIndexBin>, Error> {
    let spans: Vec<(i64, i64)> = transcripts
        .iter()
        .map(|tx| tx.numerical_span(table))
        .collect::<Result<_, Error>>()?;

    let mut bins = Vec::new();
    let mut start = 1;
    while start <= length {
        let end = (start + step - 1).min(length);
        let (bin_pos_start, bin_pos_end) = table.numerical_span(chrom, start, end)?;
        let transcript_sns: Vec<String> = transcripts
            .iter()
            .zip(&spans)
            .filter(|(_, (tx_start, tx_end))| *tx_start <= bin_pos_end && *tx_end >= bin_pos_start)
            .map(|(tx, _)| tx.sn())
            .collect();
        if !transcript_sns.is_empty() {
            bins.push(GenomicIndexBin {
                chrom: chrom.to_string(),
                start,
                end,
                transcript_sns,
            });
        }
        start += step;
    }
    Ok(bins)
}
