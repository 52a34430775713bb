//! Chromosome table: ordering, lengths, and numerical-position encoding.

use std::collections::HashMap;

use crate::error::Error;

/// One configured chromosome.
#[derive(Debug, Clone)]
pub struct Chromosome {
    pub name: String,
    pub length: i64,
}

/// Ordered chromosome table driving the genome-wide total order.
///
/// Every genomic coordinate is encoded as a single numerical position
/// `order * scale + offset`, where `order` is the 1-based position of the
/// chromosome in the configured table and `scale` is the smallest power of
/// 1000 that is at least the longest chromosome length. Positions on
/// different chromosomes therefore never collide or interleave.
#[derive(Debug, Clone)]
pub struct ChromosomeTable {
    chromosomes: Vec<Chromosome>,
    by_name: HashMap<String, usize>,
    scale: i64,
}

impl ChromosomeTable {
    pub fn new(chromosomes: Vec<Chromosome>) -> Result<Self, Error> {
        if chromosomes.is_empty() {
            return Err(Error::Validation(
                "chromosome table must not be empty".to_string(),
            ));
        }
        let mut by_name = HashMap::with_capacity(chromosomes.len());
        let mut max_length: i64 = 0;
        for (index, chrom) in chromosomes.iter().enumerate() {
            if chrom.name.is_empty() {
                return Err(Error::Validation(format!(
                    "chromosome at position {index} has an empty name"
                )));
            }
            if chrom.length <= 0 {
                return Err(Error::Validation(format!(
                    "chromosome {} has non-positive length {}",
                    chrom.name, chrom.length
                )));
            }
            if by_name.insert(chrom.name.clone(), index).is_some() {
                return Err(Error::Validation(format!(
                    "duplicate chromosome name: {}",
                    chrom.name
                )));
            }
            max_length = max_length.max(chrom.length);
        }

        // Smallest power of 1000 covering the longest chromosome.
        let mut scale: i64 = 1000;
        while scale < max_length {
            scale *= 1000;
        }

        Ok(Self {
            chromosomes,
            by_name,
            scale,
        })
    }

    #[must_use]
    pub fn scale(&self) -> i64 {
        self.scale
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chromosome> {
        self.chromosomes.iter()
    }

    /// 1-based order of a chromosome in the configured table.
    pub fn order_of(&self, name: &str) -> Result<i64, Error> {
        self.by_name
            .get(name)
            .map(|&i| i as i64 + 1)
            .ok_or_else(|| Error::UnknownChromosome(name.to_string()))
    }

    pub fn length_of(&self, name: &str) -> Result<i64, Error> {
        self.by_name
            .get(name)
            .map(|&i| self.chromosomes[i].length)
            .ok_or_else(|| Error::UnknownChromosome(name.to_string()))
    }

    /// Encode a 1-based chromosome offset as a genome-wide position.
    pub fn numerical_position(&self, name: &str, offset: i64) -> Result<i64, Error> {
        Ok(self.order_of(name)? * self.scale + offset)
    }

    /// Encode a 1-based inclusive interval as a genome-wide span.
    pub fn numerical_span(&self, name: &str, start: i64, end: i64) -> Result<(i64, i64), Error> {
        let order = self.order_of(name)?;
        Ok((order * self.scale + start, order * self.scale + end))
    }
}
