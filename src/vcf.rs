//! VCF input shims: GATK-style SNV/indel records and XHMM CNV records.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::error::Error;
use crate::sequence::Sequence;
use crate::textfile;
use crate::variant::Variant;

/// Call-level metadata carried through from a GATK VCF record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GatkInfo {
    pub depth: i64,
    pub qual: f64,
    pub gatk_filter: String,
    pub genotype: f64,
    pub ratio: f64,
}

/// One normalized SNV/indel call with its source line.
#[derive(Debug, Clone, Serialize)]
pub struct GatkSnv {
    pub variant: Variant,
    pub information: GatkInfo,
    pub other_info: String,
}

/// Parse one GATK VCF data line into one record per ALT allele.
///
/// `*` (spanning-deletion) alleles are skipped. A missing or unparsable
/// QUAL, AF, DP or AD field degrades to `-1` rather than failing.
pub fn parse_gatk_line(line: &str) -> Result<Vec<GatkSnv>, Error> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 10 {
        return Err(Error::Parse(format!(
            "GATK VCF line has {} fields, expected at least 10",
            fields.len()
        )));
    }

    let chrom = fields[0].strip_prefix("chr").unwrap_or(fields[0]);
    let pos: i64 = fields[1]
        .parse()
        .map_err(|_| Error::Parse(format!("invalid POS field: '{}'", fields[1])))?;
    let ref_allele = fields[3];
    let alts: Vec<&str> = fields[4].split(',').collect();
    let qual: f64 = fields[5].parse().unwrap_or(-1.0);
    let gatk_filter = fields[6];
    let info_fields = fields[7];
    let format_keys: Vec<&str> = fields[fields.len() - 2].split(':').collect();
    let format_values: Vec<&str> = fields[fields.len() - 1].split(':').collect();

    let alt_count = alts.len();
    let mut genotypes = vec![-1.0_f64; alt_count];
    let mut ratios = vec![-1.0_f64; alt_count];
    let mut depth: i64 = -1;

    // Per-allele frequency from INFO AF.
    if let Some(af) = info_fields
        .split(';')
        .find_map(|info| info.strip_prefix("AF="))
    {
        for (i, value) in af.split(',').take(alt_count).enumerate() {
            if let Ok(parsed) = value.parse() {
                genotypes[i] = parsed;
            }
        }
    }

    // Depth and allele ratios from FORMAT DP/AD.
    for (key, value) in format_keys.iter().zip(&format_values) {
        match *key {
            "DP" => {
                if let Ok(parsed) = value.parse() {
                    depth = parsed;
                }
            }
            "AD" => {
                let counts: Vec<i64> = value
                    .split(',')
                    .map(|c| c.parse().unwrap_or(0))
                    .collect();
                let sum: i64 = counts.iter().sum();
                if sum > 0 {
                    for i in 0..alt_count {
                        if let Some(&count) = counts.get(i + 1) {
                            ratios[i] = count as f64 / sum as f64;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let mut records = Vec::with_capacity(alt_count);
    for (i, alt) in alts.iter().enumerate() {
        if *alt == "*" {
            continue;
        }
        let mut variant = Variant {
            chrom: chrom.to_string(),
            start: pos,
            end: 0,
            ref_allele: Sequence::from(ref_allele),
            alt_allele: Sequence::from(*alt),
        };
        variant.normalize();
        records.push(GatkSnv {
            variant,
            information: GatkInfo {
                depth,
                qual,
                gatk_filter: gatk_filter.to_string(),
                genotype: genotypes[i],
                ratio: ratios[i],
            },
            other_info: line.to_string(),
        });
    }
    Ok(records)
}

/// Read a (possibly gzipped) GATK VCF into normalized records, file order.
pub fn read_gatk_vcf(path: &Path) -> Result<Vec<GatkSnv>, Error> {
    let mut records = Vec::new();
    for line in textfile::read_lines(path)? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        records.extend(parse_gatk_line(line)?);
    }
    Ok(records)
}

/// Read-depth metadata carried through from an XHMM VCF record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct XhmmInfo {
    pub mean_read_depth: f64,
    pub mean_original_read_depth: f64,
}

/// One CNV call for one sample.
#[derive(Debug, Clone, Serialize)]
pub struct XhmmCnv {
    pub variant: Variant,
    pub information: XhmmInfo,
    pub other_info: Vec<String>,
}

/// Per-sample CNV lists keyed by sample name.
pub type CnvsBySample = HashMap<String, Vec<XhmmCnv>>;

fn parse_interval_id(id: &str) -> Result<(String, i64, i64), Error> {
    let (chrom, range) = id
        .split_once(':')
        .ok_or_else(|| Error::Parse(format!("invalid CNV interval ID: '{id}'")))?;
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| Error::Parse(format!("invalid CNV interval ID: '{id}'")))?;
    let start = start
        .parse()
        .map_err(|_| Error::Parse(format!("invalid CNV interval start: '{start}'")))?;
    let end = end
        .parse()
        .map_err(|_| Error::Parse(format!("invalid CNV interval end: '{end}'")))?;
    Ok((chrom.to_string(), start, end))
}

/// Parse one XHMM data line into per-sample CNV records.
///
/// The interval comes from the ID column (`chrom:start-end`); each sample's
/// GT indexes the symbolic ALT list, with `0` meaning diploid (no call).
fn parse_xhmm_line(samples: &[String], line: &str) -> Result<Vec<(String, XhmmCnv)>, Error> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 10 {
        return Err(Error::Parse(format!(
            "XHMM VCF line has {} fields, expected at least 10",
            fields.len()
        )));
    }
    let (chrom, start, end) = parse_interval_id(fields[2])?;
    let ref_allele = fields[3];
    let alts: Vec<&str> = fields[4].split(',').collect();
    let sample_columns = &fields[9..];

    let mut records = Vec::new();
    for (sample, column) in samples.iter().zip(sample_columns) {
        let values: Vec<&str> = column.split(':').collect();
        let genotype: usize = values[0].parse().unwrap_or(0);
        if genotype == 0 {
            continue;
        }
        let alt = alts.get(genotype - 1).ok_or_else(|| {
            Error::Parse(format!("GT {genotype} exceeds ALT list in: {line}"))
        })?;
        // Mean and mean-original read depth are the 3rd- and 1st-from-last
        // FORMAT values.
        let mean_read_depth = values
            .len()
            .checked_sub(3)
            .and_then(|i| values[i].parse().ok())
            .unwrap_or(-1.0);
        let mean_original_read_depth = values
            .last()
            .and_then(|v| v.parse().ok())
            .unwrap_or(-1.0);

        records.push((
            sample.clone(),
            XhmmCnv {
                variant: Variant {
                    chrom: chrom.clone(),
                    start,
                    end,
                    ref_allele: Sequence::from(ref_allele),
                    alt_allele: Sequence::from(*alt),
                },
                information: XhmmInfo {
                    mean_read_depth,
                    mean_original_read_depth,
                },
                other_info: sample_columns.iter().map(|s| s.to_string()).collect(),
            },
        ));
    }
    Ok(records)
}

/// Read a (possibly gzipped) XHMM VCF into per-sample CNV lists.
pub fn read_xhmm_vcf(path: &Path) -> Result<CnvsBySample, Error> {
    let mut by_sample = CnvsBySample::new();
    let mut samples: Vec<String> = Vec::new();
    for line in textfile::read_lines(path)? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            if line.starts_with("#CHROM") {
                // Sample names follow the nine fixed VCF columns.
                samples = line.split('\t').skip(9).map(str::to_string).collect();
            }
            continue;
        }
        if samples.is_empty() {
            return Err(Error::Parse(
                "XHMM VCF data line before #CHROM header".to_string(),
            ));
        }
        for (sample, record) in parse_xhmm_line(&samples, line)? {
            by_sample.entry(sample).or_default().push(record);
        }
    }
    Ok(by_sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::{CnvKind, SnvKind};

    #[test]
    fn gatk_single_alt() {
        let line = "chr1\t100\t.\tA\tT\t50.5\tPASS\tAC=1;AF=0.5\tGT:AD:DP\t0/1:10,8:18";
        let records = parse_gatk_line(line).unwrap();
        assert_eq!(records.len(), 1);
        let snv = &records[0];
        assert_eq!(snv.variant.chrom, "1");
        assert_eq!(snv.variant.start, 100);
        assert_eq!(snv.variant.ref_allele.as_str(), "A");
        assert_eq!(SnvKind::of(&snv.variant), SnvKind::Snp);
        assert_eq!(snv.information.depth, 18);
        assert_eq!(snv.information.qual, 50.5);
        assert_eq!(snv.information.gatk_filter, "PASS");
        assert_eq!(snv.information.genotype, 0.5);
        assert!((snv.information.ratio - 8.0 / 18.0).abs() < 1e-9);
        assert_eq!(snv.other_info, line);
    }

    #[test]
    fn gatk_multi_alt_normalizes_each() {
        let line = "1\t100\t.\tATG\tA,ATGTG\t10\tPASS\tAF=0.3,0.2\tGT:AD\t1/2:2,3,5";
        let records = parse_gatk_line(line).unwrap();
        assert_eq!(records.len(), 2);
        // First alt is a deletion of TG.
        assert_eq!(records[0].variant.start, 101);
        assert_eq!(records[0].variant.ref_allele.as_str(), "TG");
        assert_eq!(records[0].variant.alt_allele.as_str(), "-");
        assert_eq!(records[0].information.genotype, 0.3);
        assert!((records[0].information.ratio - 0.3).abs() < 1e-9);
        // Second alt is an insertion of TG.
        assert_eq!(SnvKind::of(&records[1].variant), SnvKind::Ins);
        assert_eq!(records[1].information.genotype, 0.2);
        assert!((records[1].information.ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn gatk_skips_spanning_deletion_allele() {
        let line = "1\t100\t.\tA\t*,T\t10\tPASS\tAF=0.3,0.2\tGT\t1/2";
        let records = parse_gatk_line(line).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].variant.alt_allele.as_str(), "T");
        assert_eq!(records[0].information.genotype, 0.2);
    }

    #[test]
    fn gatk_missing_metrics_degrade() {
        let line = "1\t100\t.\tA\tT\t.\t.\tDP=5\tGT\t0/1";
        let records = parse_gatk_line(line).unwrap();
        assert_eq!(records[0].information.qual, -1.0);
        assert_eq!(records[0].information.depth, -1);
        assert_eq!(records[0].information.genotype, -1.0);
        assert_eq!(records[0].information.ratio, -1.0);
    }

    #[test]
    fn gatk_rejects_malformed_pos() {
        let line = "1\txyz\t.\tA\tT\t10\tPASS\t.\tGT\t0/1";
        assert!(parse_gatk_line(line).is_err());
    }

    #[test]
    fn gatk_file_reading() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "##fileformat=VCFv4.2").unwrap();
        writeln!(f, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1").unwrap();
        writeln!(f, "chr2\t200\t.\tG\tC\t99\tPASS\tAF=1.0\tGT:DP\t1/1:30").unwrap();
        writeln!(f, "chrM\t5\t.\tA\tG\t99\tPASS\tAF=1.0\tGT:DP\t1/1:30").unwrap();
        let records = read_gatk_vcf(f.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].variant.chrom, "2");
        // Mitochondrial aliasing applied during normalization.
        assert_eq!(records[1].variant.chrom, "MT");
    }

    const XHMM_HEADER: &str =
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tSAMPLE_A\tSAMPLE_B";

    #[test]
    fn xhmm_per_sample_records() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "##fileformat=VCFv4.1").unwrap();
        writeln!(f, "{XHMM_HEADER}").unwrap();
        // SAMPLE_A carries a deletion; SAMPLE_B is diploid. The read-depth
        // values sit third-from-last and last in the FORMAT column.
        writeln!(
            f,
            "1\t1000\t1:1000-5000\tN\t<DEL>,<DUP>\t.\t.\tEND=5000\tGT:NDQ:RD:DQ:ORD\t1:90:-2.5:9:20.5\t0:0:0.1:99:30.2"
        )
        .unwrap();
        let by_sample = read_xhmm_vcf(f.path()).unwrap();
        assert_eq!(by_sample.len(), 1);
        let cnvs = &by_sample["SAMPLE_A"];
        assert_eq!(cnvs.len(), 1);
        let cnv = &cnvs[0];
        assert_eq!(cnv.variant.chrom, "1");
        assert_eq!(cnv.variant.start, 1000);
        assert_eq!(cnv.variant.end, 5000);
        assert_eq!(cnv.variant.alt_allele.as_str(), "<DEL>");
        assert_eq!(CnvKind::of(&cnv.variant), CnvKind::Del);
        assert_eq!(cnv.information.mean_read_depth, -2.5);
        assert_eq!(cnv.information.mean_original_read_depth, 20.5);
    }

    #[test]
    fn xhmm_gt_selects_alt() {
        let samples = vec!["S1".to_string()];
        let line = "1\t1000\t1:1000-2000\tN\t<DEL>,<DUP>\t.\t.\t.\tGT:RD:X:ORD\t2:1.5:x:7.0";
        let records = parse_xhmm_line(&samples, line).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1.variant.alt_allele.as_str(), "<DUP>");
    }

    #[test]
    fn xhmm_rejects_bad_interval() {
        let samples = vec!["S1".to_string()];
        let line = "1\t1000\tnot-an-interval\tN\t<DEL>\t.\t.\t.\tGT\t1";
        assert!(parse_xhmm_line(&samples, line).is_err());
    }

    #[test]
    fn xhmm_data_before_header_is_an_error() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "1\t1000\t1:1000-2000\tN\t<DEL>\t.\t.\t.\tGT\t1").unwrap();
        assert!(read_xhmm_vcf(f.path()).is_err());
    }
}
