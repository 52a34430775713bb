use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use varanno::annotate::{cnv, snv};
use varanno::chromosome::ChromosomeTable;
use varanno::cli;
use varanno::config::AnnotatorConfig;
use varanno::error::Error;
use varanno::fasta::{self, Fasta};
use varanno::index::GenomicIndex;
use varanno::ncbi::GeneInfo;
use varanno::refgene;
use varanno::transcript::Transcript;
use varanno::vcf;

#[derive(Parser)]
#[command(
    name = "annotate",
    about = "Annotate variant calls against a prepared varanno database"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Annotate a GATK-style SNV/indel VCF
    Snv(AnnotateArgs),
    /// Annotate an XHMM CNV VCF, one output file per sample
    Cnv(AnnotateArgs),
}

#[derive(Args)]
struct AnnotateArgs {
    /// Input VCF file (plain or gzipped)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output path; CNV runs write `<out>.<sample>.json`
    #[arg(short = 'o', long = "out")]
    out: PathBuf,

    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Database directory
    #[arg(short = 'd', long = "db", default_value = "./database")]
    db: PathBuf,

    /// Override the configured splice-window width
    #[arg(short = 's', long = "splicing-len")]
    splicing_len: Option<i64>,
}

fn join_task<T>(handle: thread::ScopedJoinHandle<'_, Result<T, Error>>) -> Result<T> {
    match handle.join() {
        Ok(result) => result.map_err(anyhow::Error::from),
        Err(_) => bail!("worker thread panicked"),
    }
}

/// Load the shared database inputs concurrently: gene table, transcript
/// catalogs, the genomic index, and (for SNV runs) the spliced mRNA FASTA.
fn load_database(
    args: &AnnotateArgs,
    config: &AnnotatorConfig,
    table: &ChromosomeTable,
    with_mrna: bool,
) -> Result<(Vec<Transcript>, GenomicIndex)> {
    let gene_info_path = args.db.join(&config.db_file.ncbi_gene);
    let refgene_paths = [
        args.db.join(&config.db_file.refgene),
        args.db.join(&config.db_file.ens_mt),
    ];
    let mrna_path = args.db.join(&config.db_file.mrna);
    let refidx_path = args.db.join(&config.db_file.refidx);

    let (gene_info, transcripts, index, mrna) = thread::scope(|scope| {
        let gene_info_handle = scope.spawn(|| GeneInfo::from_file(&gene_info_path));
        let transcripts_handle = scope.spawn(|| {
            refgene::read_refgene_files(&refgene_paths, table, config.param.up_down_stream)
        });
        let index_handle = scope.spawn(|| GenomicIndex::read_file(&refidx_path, table));
        let mrna_handle = scope.spawn(move || {
            if with_mrna {
                fasta::read_fasta_file(&mrna_path)
            } else {
                Ok(Fasta::new())
            }
        });
        (
            join_task(gene_info_handle),
            join_task(transcripts_handle),
            join_task(index_handle),
            join_task(mrna_handle),
        )
    });

    let gene_info = gene_info.context("failed to read gene_info")?;
    let mut transcripts = transcripts.context("failed to read transcript catalogs")?;
    let index = index.context("failed to read genomic index")?;
    let mrna = mrna.context("failed to read spliced mRNA")?;

    refgene::set_entrez_and_sequences(&mut transcripts, &gene_info, &mrna);
    Ok((transcripts, index))
}

fn run_snv(args: &AnnotateArgs) -> Result<()> {
    let config = AnnotatorConfig::from_file(&args.config)?;
    let table = config.chromosome_table()?;
    let splicing_len = args.splicing_len.unwrap_or(config.param.splicing_len);

    cli::section("Database");
    let (transcripts, index) = load_database(args, &config, &table, true)?;
    let complete = transcripts.iter().filter(|tx| tx.is_complete()).count();
    cli::kv("Transcripts", &transcripts.len().to_string());
    cli::kv("Complete", &complete.to_string());
    cli::kv("Index bins", &index.len().to_string());
    cli::kv("Splice window", &splicing_len.to_string());
    eprintln!();

    cli::section("Annotation");
    let snvs = vcf::read_gatk_vcf(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    cli::kv("Variants", &snvs.len().to_string());

    let catalog = refgene::to_sn_map(transcripts);
    let out_file = File::create(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let mut writer = BufWriter::new(out_file);
    snv::run_annotation(snvs, &catalog, &index, &table, splicing_len, &mut writer)?;
    writer.flush()?;

    cli::success(&args.out.display().to_string());
    Ok(())
}

fn run_cnv(args: &AnnotateArgs) -> Result<()> {
    let config = AnnotatorConfig::from_file(&args.config)?;
    let table = config.chromosome_table()?;

    cli::section("Database");
    let (transcripts, index) = load_database(args, &config, &table, false)?;
    cli::kv("Transcripts", &transcripts.len().to_string());
    cli::kv("Index bins", &index.len().to_string());
    eprintln!();

    cli::section("Annotation");
    let by_sample = vcf::read_xhmm_vcf(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    cli::kv("Samples", &by_sample.len().to_string());

    let catalog = refgene::to_sn_map(transcripts);
    let mut samples: Vec<_> = by_sample.into_iter().collect();
    samples.sort_by(|(a, _), (b, _)| a.cmp(b));
    for (sample, cnvs) in samples {
        let out_path = PathBuf::from(format!("{}.{sample}.json", args.out.display()));
        let out_file = File::create(&out_path)
            .with_context(|| format!("failed to create {}", out_path.display()))?;
        let mut writer = BufWriter::new(out_file);
        cnv::run_annotation(cnvs, &catalog, &index, &table, &mut writer)?;
        writer.flush()?;
        cli::success(&out_path.display().to_string());
    }
    Ok(())
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli_args = Cli::parse();

    match &cli_args.command {
        Command::Snv(args) => {
            cli::banner("Annotate SNV/indel");
            run_snv(args)?;
        }
        Command::Cnv(args) => {
            cli::banner("Annotate CNV");
            run_cnv(args)?;
        }
    }

    cli::print_summary(start);
    Ok(())
}
