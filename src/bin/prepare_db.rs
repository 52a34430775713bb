use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;

use varanno::cli;
use varanno::config::AnnotatorConfig;
use varanno::error::Error;
use varanno::fasta;
use varanno::index::GenomicIndex;
use varanno::refgene;

#[derive(Parser)]
#[command(
    name = "prepare_db",
    about = "Build the varanno database files (spliced mRNA FASTA and genomic index)"
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Database directory holding the inputs and receiving the outputs
    #[arg(short = 'd', long = "db", default_value = "./database")]
    db: PathBuf,
}

fn join_task<T>(handle: thread::ScopedJoinHandle<'_, Result<T, Error>>) -> Result<T> {
    match handle.join() {
        Ok(result) => result.map_err(anyhow::Error::from),
        Err(_) => bail!("worker thread panicked"),
    }
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli_args = Cli::parse();

    cli::banner("Prepare Database");

    // ── Configuration ────────────────────────────────────
    cli::section("Configuration");

    let config = AnnotatorConfig::from_file(&cli_args.config)?;
    let table = config.chromosome_table()?;

    cli::kv("Config", &cli_args.config.display().to_string());
    cli::kv("Database", &cli_args.db.display().to_string());
    cli::kv("Chromosomes", &config.chrom.len().to_string());
    cli::kv("Flank width", &config.param.up_down_stream.to_string());
    cli::kv("Bin width", &config.param.refidx_step.to_string());

    eprintln!();

    // ── Inputs ───────────────────────────────────────────
    cli::section("Inputs");

    let reference_path = cli_args.db.join(&config.db_file.reference);
    let refgene_paths = [
        cli_args.db.join(&config.db_file.refgene),
        cli_args.db.join(&config.db_file.ens_mt),
    ];

    // The reference FASTA and the transcript catalogs are independent reads;
    // each worker yields one immutable value joined before use.
    let (reference, transcripts) = thread::scope(|scope| {
        let reference_handle = scope.spawn(|| fasta::read_fasta_file(&reference_path));
        let transcripts_handle = scope.spawn(|| {
            refgene::read_refgene_files(&refgene_paths, &table, config.param.up_down_stream)
        });
        (join_task(reference_handle), join_task(transcripts_handle))
    });
    let reference =
        reference.with_context(|| format!("failed to read {}", reference_path.display()))?;
    let transcripts = transcripts.context("failed to read transcript catalogs")?;

    cli::kv("Reference", &format!("{} sequences", reference.len()));
    cli::kv("Transcripts", &transcripts.len().to_string());

    eprintln!();

    // ── Spliced mRNA ─────────────────────────────────────
    cli::section("Spliced mRNA");

    let mrna_path = cli_args.db.join(&config.db_file.mrna);
    let mrna_file = File::create(&mrna_path)
        .with_context(|| format!("failed to create {}", mrna_path.display()))?;
    let mut mrna_writer = BufWriter::new(mrna_file);

    let mut written: u64 = 0;
    let mut skipped: u64 = 0;
    for tx in &transcripts {
        let Some(chrom_seq) = reference.get(&tx.chrom) else {
            skipped += 1;
            continue;
        };
        let mrna = chrom_seq.substring(
            (tx.exon_start - 1) as usize,
            Some((tx.exon_end - tx.exon_start + 1) as usize),
        );
        let sn = tx.sn();
        fasta::write_fasta_records(&mut mrna_writer, [(sn.as_str(), &mrna)])?;
        written += 1;
    }
    mrna_writer.flush()?;

    cli::kv("Written", &written.to_string());
    if skipped > 0 {
        cli::warning(&format!("{skipped} transcripts on absent reference sequences"));
    }
    cli::success(&mrna_path.display().to_string());

    eprintln!();

    // ── Genomic Index ────────────────────────────────────
    cli::section("Genomic Index");

    let index = GenomicIndex::build(&table, config.param.refidx_step, &transcripts)?;
    let refidx_path = cli_args.db.join(&config.db_file.refidx);
    let refidx_file = File::create(&refidx_path)
        .with_context(|| format!("failed to create {}", refidx_path.display()))?;
    let mut refidx_writer = BufWriter::new(refidx_file);
    index.write(&mut refidx_writer)?;
    refidx_writer.flush()?;

    cli::kv("Bins", &index.len().to_string());
    cli::success(&refidx_path.display().to_string());

    // ── Summary ──────────────────────────────────────────
    cli::print_summary(start);
    Ok(())
}
