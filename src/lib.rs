//! varanno: offline batch annotation of SNV/indel and CNV calls against
//! RefGene transcript models.

pub mod error;

pub mod annotate;
pub mod chromosome;
pub mod cli;
pub mod codon;
pub mod config;
pub mod fasta;
pub mod index;
pub mod ncbi;
pub mod refgene;
pub mod sequence;
pub mod strand;
pub mod textfile;
pub mod transcript;
pub mod variant;
pub mod vcf;
