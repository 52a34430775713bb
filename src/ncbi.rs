//! NCBI gene_info parsing: gene symbol to Entrez ID resolution.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Error;
use crate::textfile;

/// Entrez ID reported when a symbol cannot be resolved.
pub const UNKNOWN_ENTREZ_ID: i64 = -1;

/// Gene-symbol lookup table built from an NCBI gene_info file.
///
/// Lookup precedence: official symbol, then symbol-from-nomenclature,
/// then synonyms.
#[derive(Debug, Default)]
pub struct GeneInfo {
    symbol: HashMap<String, i64>,
    symbol_from_nomenclature: HashMap<String, i64>,
    synonyms: HashMap<String, i64>,
}

fn is_placeholder(field: &str) -> bool {
    field == "-" || field == "."
}

impl GeneInfo {
    /// Read a (possibly gzipped) gene_info file.
    ///
    /// Columns used: 1 = GeneID, 2 = Symbol, 4 = Synonyms (`|`-separated),
    /// 10 = Symbol_from_nomenclature_authority.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let mut info = Self::default();
        for line in textfile::read_lines(path)? {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 11 {
                return Err(Error::Parse(format!(
                    "gene_info line has {} fields, expected at least 11",
                    fields.len()
                )));
            }
            let entrez_id: i64 = fields[1].parse().map_err(|_| {
                Error::Parse(format!("invalid GeneID in gene_info: '{}'", fields[1]))
            })?;
            if !is_placeholder(fields[2]) {
                info.symbol.insert(fields[2].to_string(), entrez_id);
            }
            if !is_placeholder(fields[10]) {
                info.symbol_from_nomenclature
                    .insert(fields[10].to_string(), entrez_id);
            }
            for synonym in fields[4].split('|') {
                if !is_placeholder(synonym) && !synonym.is_empty() {
                    info.synonyms.insert(synonym.to_string(), entrez_id);
                }
            }
        }
        Ok(info)
    }

    /// Resolve a gene symbol, returning [`UNKNOWN_ENTREZ_ID`] when absent.
    #[must_use]
    pub fn entrez_id(&self, symbol: &str) -> i64 {
        if let Some(&id) = self.symbol.get(symbol) {
            return id;
        }
        if let Some(&id) = self.symbol_from_nomenclature.get(symbol) {
            return id;
        }
        if let Some(&id) = self.synonyms.get(symbol) {
            return id;
        }
        UNKNOWN_ENTREZ_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn gene_info_file(lines: &[&str]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        f
    }

    fn row(entrez: i64, symbol: &str, synonyms: &str, nomenclature: &str) -> String {
        format!(
            "9606\t{entrez}\t{symbol}\tLOC\t{synonyms}\tdb\t1\t-\tdesc\ttype\t{nomenclature}\tfull"
        )
    }

    #[test]
    fn lookup_precedence() {
        let f = gene_info_file(&[
            "#tax_id\tGeneID\tSymbol\t...",
            &row(7157, "TP53", "BCC7|LFS1", "TP53"),
            &row(672, "BRCA1", "BRCC1", "-"),
        ]);
        let info = GeneInfo::from_file(f.path()).unwrap();
        assert_eq!(info.entrez_id("TP53"), 7157);
        assert_eq!(info.entrez_id("LFS1"), 7157);
        assert_eq!(info.entrez_id("BRCC1"), 672);
        assert_eq!(info.entrez_id("NOPE"), UNKNOWN_ENTREZ_ID);
    }

    #[test]
    fn placeholders_are_not_indexed() {
        let f = gene_info_file(&[&row(11, "-", "-", ".")]);
        let info = GeneInfo::from_file(f.path()).unwrap();
        assert_eq!(info.entrez_id("-"), UNKNOWN_ENTREZ_ID);
        assert_eq!(info.entrez_id("."), UNKNOWN_ENTREZ_ID);
    }

    #[test]
    fn bad_gene_id_is_an_error() {
        let f = gene_info_file(&[&row(7157, "TP53", "-", "-").replace("7157", "x")]);
        assert!(GeneInfo::from_file(f.path()).is_err());
    }
}
