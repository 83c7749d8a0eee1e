//! GDW Loader Library
//!
//! Core data-loading layer of the genomic data warehouse:
//!
//! - **ingest::ncbi_gene**: the producer/consumer NCBI Gene ingestion
//!   pipeline (gene_info, gene_history, gene2ensembl, gene2accession →
//!   normalized gene/transcript graphs → Postgres)
//! - **goldenpath**: the GoldenPath location reconciliation engine
//!   (exon-overlap scoring and nearest-gene search over UCSC-style
//!   alignment tables)
//!
//! # Example
//!
//! ```no_run
//! use gdw_loader::ingest::ncbi_gene::{NcbiGeneConfig, NcbiGenePipeline};
//!
//! # async fn run(store: std::sync::Arc<dyn gdw_loader::ingest::ncbi_gene::GeneStore>) -> anyhow::Result<()> {
//! let config = NcbiGeneConfig::new("gene_info.gz", "gene2accession.gz");
//! let pipeline = NcbiGenePipeline::new(config, store);
//! let result = pipeline.run().await?;
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

pub mod goldenpath;
pub mod ingest;
