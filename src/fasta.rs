//! Parser and writer for FASTA sequence files.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::error::Error;
use crate::sequence::Sequence;
use crate::textfile;

/// Sequence dictionary keyed by record identifier.
pub type Fasta = HashMap<String, Sequence>;

/// Read a (possibly gzipped) FASTA file into a keyed dictionary.
///
/// The identifier is the first whitespace-delimited token after `>`.
/// Sequence lines are concatenated verbatim.
pub fn read_fasta_file(path: &Path) -> Result<Fasta, Error> {
    let lines = textfile::read_lines(path)?;
    parse_fasta(&lines)
}

fn parse_fasta(lines: &[String]) -> Result<Fasta, Error> {
    let mut fasta = Fasta::new();
    let mut current_id: Option<String> = None;
    let mut current_seq = String::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            if let Some(id) = current_id.take() {
                fasta.insert(id, Sequence::new(std::mem::take(&mut current_seq)));
            }
            let id = header.split_whitespace().next().unwrap_or("");
            if id.is_empty() {
                return Err(Error::Parse(format!("empty FASTA header: >{header}")));
            }
            current_id = Some(id.to_string());
        } else if current_id.is_some() {
            current_seq.push_str(line);
        } else {
            return Err(Error::Parse(format!(
                "FASTA sequence data before first header: {line}"
            )));
        }
    }
    if let Some(id) = current_id {
        fasta.insert(id, Sequence::new(current_seq));
    }
    Ok(fasta)
}

/// Write `(id, sequence)` records as FASTA, one sequence line per record.
pub fn write_fasta_records<'a, W: Write>(
    writer: &mut W,
    records: impl IntoIterator<Item = (&'a str, &'a Sequence)>,
) -> Result<(), Error> {
    for (id, seq) in records {
        writeln!(writer, ">{id}")?;
        writeln!(writer, "{seq}")?;
    }
    Ok(())
}
