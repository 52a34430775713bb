//! Line-oriented text input with transparent gzip support.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::Error;

/// Open a text file, decompressing on the fly when the name ends in `.gz`.
pub fn open(path: &Path) -> Result<Box<dyn BufRead>, Error> {
    let file = File::open(path)?;
    let is_gz = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if is_gz {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read all lines of a (possibly gzipped) text file, trimming line endings.
pub fn read_lines(path: &Path) -> Result<Vec<String>, Error> {
    let reader = open(path)?;
    collect_lines(reader)
}

/// Collect trimmed lines from any reader.
pub fn collect_lines<R: Read>(reader: R) -> Result<Vec<String>, Error> {
    let buf = BufReader::new(reader);
    let mut lines = Vec::new();
    for line in buf.lines() {
        lines.push(line?.trim_end().to_string());
    }
    Ok(lines)
}
