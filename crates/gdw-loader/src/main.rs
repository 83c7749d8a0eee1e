//! GDW Loader - gene annotation ingestion tool

use anyhow::{Context, Result};
use clap::Parser;
use gdw_common::logging::{init_logging, LogConfig, LogLevel};
use gdw_common::types::{Strand, Taxon};
use gdw_loader::goldenpath::{GoldenPathEngine, PgAlignmentStore, SearchConfig};
use gdw_loader::ingest::ncbi_gene::{NcbiGeneConfig, NcbiGenePipeline, PgGeneStore};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gdw-loader")]
#[command(author, version, about = "Genomic data warehouse loading tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Ingest NCBI Gene annotation files
    LoadGenes {
        /// Path to gene_info (gzip or plain)
        #[arg(long)]
        gene_info: PathBuf,

        /// Path to gene2accession (gzip or plain)
        #[arg(long)]
        gene2accession: PathBuf,

        /// Path to gene_history
        #[arg(long)]
        gene_history: Option<PathBuf>,

        /// Path to gene2ensembl
        #[arg(long)]
        gene2ensembl: Option<PathBuf>,

        /// NCBI taxonomy IDs to retain (repeatable); empty keeps everything
        #[arg(long = "taxon")]
        taxa: Vec<i32>,

        /// Resume the gene2accession stream at this gene ID
        #[arg(long)]
        start_gene_id: Option<String>,
    },

    /// Find the gene nearest to a genomic interval
    ClosestGene {
        /// Chromosome (e.g., "chr19")
        #[arg(long)]
        chromosome: String,

        #[arg(long)]
        start: i64,

        #[arg(long)]
        end: i64,

        /// Restrict to one strand ('+' or '-'); both when omitted
        #[arg(long)]
        strand: Option<String>,

        /// Full width of the search window
        #[arg(long, default_value_t = 100_000)]
        window: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::new()
        .with_level(log_level)
        .with_log_file_prefix("gdw-loader");
    let log_config = LogConfig::from_env().unwrap_or(log_config);
    init_logging(&log_config)?;

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Command::LoadGenes {
            gene_info,
            gene2accession,
            gene_history,
            gene2ensembl,
            taxa,
            start_gene_id,
        } => {
            info!("Ingesting NCBI Gene data");

            let mut config = NcbiGeneConfig::new(gene_info, gene2accession).with_taxa(
                taxa.into_iter()
                    .map(|id| Taxon::new(id.to_string(), Some(id)))
                    .collect(),
            );
            if let Some(path) = gene_history {
                config = config.with_gene_history(path);
            }
            if let Some(path) = gene2ensembl {
                config = config.with_gene2ensembl(path);
            }
            if let Some(gene_id) = start_gene_id {
                config = config.with_start_gene_id(gene_id);
            }

            let store = Arc::new(PgGeneStore::new(db));
            let pipeline = NcbiGenePipeline::new(config, store);
            let result = pipeline.run().await?;
            info!("{}", result.summary());
        },
        Command::ClosestGene {
            chromosome,
            start,
            end,
            strand,
            window,
        } => {
            let strand = strand.as_deref().map(Strand::from_token);
            let config = SearchConfig::new().with_max_window(window);
            let mut engine = GoldenPathEngine::new(PgAlignmentStore::new(db));

            match engine
                .find_closest_gene(&chromosome, start, end, strand, &config)
                .await?
            {
                Some(transcript) => info!(
                    transcript = %transcript.name,
                    gene_symbol = transcript.gene_symbol.as_deref().unwrap_or("-"),
                    tx_start = transcript.tx_start,
                    tx_end = transcript.tx_end,
                    "Closest gene found"
                ),
                None => info!("No gene within the search window"),
            }
        },
    }

    info!("Done");
    Ok(())
}
