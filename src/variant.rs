//! Variant model and coordinate normalization.

use serde::{Deserialize, Serialize};

use crate::chromosome::ChromosomeTable;
use crate::error::Error;
use crate::sequence::Sequence;

/// The placeholder spelling of an empty allele.
pub const EMPTY_ALLELE: &str = "-";

/// A called variant in 1-based inclusive coordinates.
///
/// After [`Variant::normalize`], `ref` and `alt` share no common prefix or
/// suffix, `"-"` denotes the empty allele, and `end` is consistent with
/// `start` and the reference allele length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    #[serde(rename = "ref")]
    pub ref_allele: Sequence,
    #[serde(rename = "alt")]
    pub alt_allele: Sequence,
}

fn allele_string(seq: &Sequence) -> String {
    if seq.as_str() == EMPTY_ALLELE {
        String::new()
    } else {
        seq.as_str().to_string()
    }
}

impl Variant {
    /// Stable identifier: `chrom:start:end:ref:alt`.
    #[must_use]
    pub fn sn(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.chrom, self.start, self.end, self.ref_allele, self.alt_allele
        )
    }

    /// Genome-wide numerical span of this variant.
    pub fn numerical_span(&self, table: &ChromosomeTable) -> Result<(i64, i64), Error> {
        table.numerical_span(&self.chrom, self.start, self.end)
    }

    /// Canonicalize to the minimal left-trimmed representation.
    ///
    /// Idempotent. Equal ref/alt pass through untouched apart from the
    /// mitochondrial chromosome aliasing.
    pub fn normalize(&mut self) {
        if self.chrom == "M" {
            self.chrom = "MT".to_string();
        }

        let mut ref_a = allele_string(&self.ref_allele);
        let mut alt_a = allele_string(&self.alt_allele);

        if !ref_a.is_empty() && !alt_a.is_empty() && ref_a != alt_a {
            if ref_a.starts_with(&alt_a) || ref_a.ends_with(&alt_a) {
                // Deletion: strip the shorter alt allele out of ref.
                if ref_a.starts_with(&alt_a) {
                    self.start += alt_a.len() as i64;
                    ref_a.drain(..alt_a.len());
                } else {
                    ref_a.truncate(ref_a.len() - alt_a.len());
                }
                alt_a.clear();
            } else if alt_a.starts_with(&ref_a) || alt_a.ends_with(&ref_a) {
                // Insertion: strip the shorter ref allele out of alt.
                if alt_a.starts_with(&ref_a) {
                    self.start += ref_a.len() as i64;
                    alt_a.drain(..ref_a.len());
                } else {
                    alt_a.truncate(alt_a.len() - ref_a.len());
                }
                ref_a.clear();
            } else {
                // Substitution / delins: trim the common suffix, then the
                // common prefix of the remainders.
                let suffix = {
                    let (rb, ab) = (ref_a.as_bytes(), alt_a.as_bytes());
                    let mut n = 0;
                    while n < rb.len()
                        && n < ab.len()
                        && rb[rb.len() - 1 - n] == ab[ab.len() - 1 - n]
                    {
                        n += 1;
                    }
                    n
                };
                ref_a.truncate(ref_a.len() - suffix);
                alt_a.truncate(alt_a.len() - suffix);

                let prefix = {
                    let (rb, ab) = (ref_a.as_bytes(), alt_a.as_bytes());
                    let mut n = 0;
                    while n < rb.len() && n < ab.len() && rb[n] == ab[n] {
                        n += 1;
                    }
                    n
                };
                ref_a.drain(..prefix);
                alt_a.drain(..prefix);
                if prefix > 0 && ref_a.is_empty() {
                    // Keep start on the base preceding the insertion.
                    self.start += prefix as i64 - 1;
                } else {
                    self.start += prefix as i64;
                }
            }
        }

        if ref_a.is_empty() {
            self.end = self.start;
            self.ref_allele = Sequence::from(EMPTY_ALLELE);
        } else {
            self.end = self.start + ref_a.len() as i64 - 1;
            self.ref_allele = Sequence::new(ref_a);
        }
        self.alt_allele = if alt_a.is_empty() {
            Sequence::from(EMPTY_ALLELE)
        } else {
            Sequence::new(alt_a)
        };
    }
}

/// Category of a normalized point/indel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnvKind {
    Snp,
    Ins,
    Del,
}

impl SnvKind {
    /// Derive the category from which allele carries the `-` placeholder.
    #[must_use]
    pub fn of(variant: &Variant) -> Self {
        if variant.ref_allele.as_str() == EMPTY_ALLELE {
            Self::Ins
        } else if variant.alt_allele.as_str() == EMPTY_ALLELE {
            Self::Del
        } else {
            Self::Snp
        }
    }
}

/// Category of a copy-number variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CnvKind {
    Del,
    Dup,
}

impl CnvKind {
    /// Derive the category from a symbolic ALT allele (`<DEL>`/`<DUP>`).
    #[must_use]
    pub fn of(variant: &Variant) -> Self {
        let symbol = variant
            .alt_allele
            .as_str()
            .trim_matches(|c| c == '<' || c == '>');
        if symbol == "DEL" { Self::Del } else { Self::Dup }
    }

    #[must_use]
    pub fn function(self) -> &'static str {
        match self {
            Self::Del => "Deletion",
            Self::Dup => "Duplication",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::{Chromosome, ChromosomeTable};

    fn variant(chrom: &str, start: i64, ref_a: &str, alt_a: &str) -> Variant {
        Variant {
            chrom: chrom.to_string(),
            start,
            end: 0,
            ref_allele: Sequence::from(ref_a),
            alt_allele: Sequence::from(alt_a),
        }
    }

    #[test]
    fn noop_variant_passes_through() {
        let mut v = variant("1", 100, "A", "A");
        v.end = 100;
        let before = v.clone();
        v.normalize();
        assert_eq!(v, before);
    }

    #[test]
    fn single_base_substitution_unchanged() {
        let mut v = variant("1", 100, "A", "T");
        v.normalize();
        assert_eq!(v.start, 100);
        assert_eq!(v.end, 100);
        assert_eq!(v.ref_allele.as_str(), "A");
        assert_eq!(v.alt_allele.as_str(), "T");
        assert_eq!(SnvKind::of(&v), SnvKind::Snp);
    }

    #[test]
    fn mitochondrial_aliasing() {
        let mut v = variant("M", 5, "A", "T");
        v.normalize();
        assert_eq!(v.chrom, "MT");
    }

    #[test]
    fn deletion_with_prefix_alt() {
        // ref=ATG alt=A: alt is a prefix of ref
        let mut v = variant("1", 100, "ATG", "A");
        v.normalize();
        assert_eq!(v.start, 101);
        assert_eq!(v.end, 102);
        assert_eq!(v.ref_allele.as_str(), "TG");
        assert_eq!(v.alt_allele.as_str(), "-");
        assert_eq!(SnvKind::of(&v), SnvKind::Del);
    }

    #[test]
    fn deletion_with_suffix_alt() {
        let mut v = variant("1", 100, "TACG", "CG");
        v.normalize();
        assert_eq!(v.start, 100);
        assert_eq!(v.end, 101);
        assert_eq!(v.ref_allele.as_str(), "TA");
        assert_eq!(v.alt_allele.as_str(), "-");
    }

    #[test]
    fn insertion_with_prefix_ref() {
        let mut v = variant("1", 50, "A", "AT");
        v.normalize();
        assert_eq!(v.ref_allele.as_str(), "-");
        assert_eq!(v.alt_allele.as_str(), "T");
        assert_eq!(v.start, 51);
        assert_eq!(v.end, 51);
        assert_eq!(SnvKind::of(&v), SnvKind::Ins);
    }

    #[test]
    fn delins_trims_suffix_then_prefix() {
        // CAG -> CTG: shared C prefix and G suffix leave a T>A... substitution
        let mut v = variant("1", 200, "CAG", "CTG");
        v.normalize();
        assert_eq!(v.start, 201);
        assert_eq!(v.end, 201);
        assert_eq!(v.ref_allele.as_str(), "A");
        assert_eq!(v.alt_allele.as_str(), "T");
    }

    #[test]
    fn delins_insertion_keeps_anchor_base() {
        // CAG -> CATG: after trimming, pure insertion of T; start stays on
        // the base preceding the inserted sequence.
        let mut v = variant("1", 200, "CAG", "CATG");
        v.normalize();
        assert_eq!(v.ref_allele.as_str(), "-");
        assert_eq!(v.alt_allele.as_str(), "T");
        assert_eq!(v.start, 201);
        assert_eq!(v.end, 201);
    }

    #[test]
    fn normalization_is_idempotent() {
        let cases = [
            ("1", 100, "ATG", "A"),
            ("1", 50, "A", "AT"),
            ("1", 200, "CAG", "CTG"),
            ("M", 7, "G", "C"),
            ("1", 10, "TTT", "T"),
        ];
        for (chrom, start, ref_a, alt_a) in cases {
            let mut v = variant(chrom, start, ref_a, alt_a);
            v.normalize();
            let once = v.clone();
            v.normalize();
            assert_eq!(v, once, "re-normalizing {ref_a}>{alt_a} changed fields");
        }
    }

    #[test]
    fn normalized_alleles_share_no_affix() {
        let cases = [
            ("GATTACA", "GATCA"),
            ("CCCT", "CCT"),
            ("ATGCA", "AGGCA"),
            ("TA", "TAAA"),
        ];
        for (ref_a, alt_a) in cases {
            let mut v = variant("1", 500, ref_a, alt_a);
            v.normalize();
            let (r, a) = (v.ref_allele.as_str(), v.alt_allele.as_str());
            if r != EMPTY_ALLELE && a != EMPTY_ALLELE {
                assert!(r.as_bytes()[0] != a.as_bytes()[0], "{ref_a}>{alt_a}: {r}>{a}");
                assert!(
                    r.as_bytes()[r.len() - 1] != a.as_bytes()[a.len() - 1],
                    "{ref_a}>{alt_a}: {r}>{a}"
                );
            }
        }
    }

    #[test]
    fn coordinate_invariant_holds() {
        for (ref_a, alt_a) in [("A", "T"), ("ATG", "A"), ("GATTACA", "GATCA"), ("A", "ATTT")] {
            let mut v = variant("1", 300, ref_a, alt_a);
            v.normalize();
            if v.ref_allele.as_str() != EMPTY_ALLELE {
                assert_eq!(v.end - v.start + 1, v.ref_allele.len() as i64);
            } else {
                assert_eq!(v.end, v.start);
            }
        }
    }

    #[test]
    fn numerical_span_uses_chromosome_order() {
        let table = ChromosomeTable::new(vec![
            Chromosome {
                name: "1".to_string(),
                length: 1000,
            },
            Chromosome {
                name: "2".to_string(),
                length: 1000,
            },
        ])
        .unwrap();
        let mut a = variant("1", 999, "A", "T");
        a.normalize();
        let mut b = variant("2", 1, "A", "T");
        b.normalize();
        let (a_start, _) = a.numerical_span(&table).unwrap();
        let (b_start, _) = b.numerical_span(&table).unwrap();
        assert!(a_start < b_start);
        assert!(variant("7", 1, "A", "T").numerical_span(&table).is_err());
    }

    #[test]
    fn cnv_kind_from_symbolic_alt() {
        let del = variant("1", 100, "N", "<DEL>");
        let dup = variant("1", 100, "N", "<DUP>");
        assert_eq!(CnvKind::of(&del), CnvKind::Del);
        assert_eq!(CnvKind::of(&dup), CnvKind::Dup);
        assert_eq!(CnvKind::of(&del).function(), "Deletion");
        assert_eq!(CnvKind::of(&dup).function(), "Duplication");
    }

    #[test]
    fn sn_format() {
        let mut v = variant("1", 100, "ATG", "A");
        v.normalize();
        assert_eq!(v.sn(), "1:101:102:TG:-");
    }
}
