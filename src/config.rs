use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::chromosome::{Chromosome, ChromosomeTable};

/// Names of the database files inside the database directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbFiles {
    pub reference: String,
    pub ncbi_gene: String,
    pub refgene: String,
    pub ens_mt: String,
    pub mrna: String,
    pub refidx: String,
}

/// Tunable annotation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    /// Width of the upstream/downstream flank attached to each transcript.
    pub up_down_stream: i64,
    /// Width of one genomic index bin.
    pub refidx_step: i64,
    /// Distance from an intron/exon junction within which an intronic
    /// variant is reported as splice-affecting.
    pub splicing_len: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChromEntry {
    pub name: String,
    pub length: i64,
}

/// Annotator configuration loaded from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatorConfig {
    pub db_file: DbFiles,
    pub param: Params,
    pub chrom: Vec<ChromEntry>,
}

impl AnnotatorConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.param.up_down_stream <= 0 {
            bail!(
                "upDownStream must be positive, got {}",
                self.param.up_down_stream
            );
        }
        if self.param.refidx_step <= 0 {
            bail!("refidxStep must be positive, got {}", self.param.refidx_step);
        }
        if self.param.splicing_len < 0 {
            bail!(
                "splicingLen must not be negative, got {}",
                self.param.splicing_len
            );
        }
        // Chromosome constraints are checked by the table constructor.
        self.chromosome_table()?;
        Ok(())
    }

    /// Build the chromosome ordering table from the configured list.
    pub fn chromosome_table(&self) -> Result<ChromosomeTable> {
        let chromosomes = self
            .chrom
            .iter()
            .map(|c| Chromosome {
                name: c.name.clone(),
                length: c.length,
            })
            .collect();
        ChromosomeTable::new(chromosomes).context("invalid chromosome table in config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    const VALID: &str = r#"{
        "dbFile": {
            "reference": "hg19.fa",
            "ncbiGene": "gene_info.gz",
            "refgene": "refgene.txt",
            "ensMt": "ens_mt.txt",
            "mrna": "mrna.fa",
            "refidx": "refgene.idx"
        },
        "param": { "upDownStream": 3000, "refidxStep": 3000000, "splicingLen": 15 },
        "chrom": [
            { "name": "1", "length": 249250621 },
            { "name": "2", "length": 243199373 },
            { "name": "MT", "length": 16569 }
        ]
    }"#;

    #[test]
    fn valid_config() {
        let f = write_config(VALID);
        let config = AnnotatorConfig::from_file(f.path()).unwrap();
        assert_eq!(config.db_file.refidx, "refgene.idx");
        assert_eq!(config.param.splicing_len, 15);
        let table = config.chromosome_table().unwrap();
        assert_eq!(table.order_of("MT").unwrap(), 3);
        assert_eq!(table.scale(), 1_000_000_000);
    }

    #[test]
    fn rejects_non_positive_step() {
        let json = VALID.replace("3000000", "0");
        let f = write_config(&json);
        let err = AnnotatorConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("refidxStep"));
    }

    #[test]
    fn rejects_empty_chromosome_list() {
        let json = r#"{
            "dbFile": {
                "reference": "r", "ncbiGene": "n", "refgene": "g",
                "ensMt": "e", "mrna": "m", "refidx": "i"
            },
            "param": { "upDownStream": 3000, "refidxStep": 3000000, "splicingLen": 15 },
            "chrom": []
        }"#;
        let f = write_config(json);
        assert!(AnnotatorConfig::from_file(f.path()).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        let f = write_config("{ not json");
        assert!(AnnotatorConfig::from_file(f.path()).is_err());
    }
}
