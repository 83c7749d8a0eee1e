//! NCBI Gene annotation feed ingestion
//!
//! Producer/consumer pipeline turning the NCBI Gene bulk-download files into
//! persisted gene/transcript graphs:
//!
//! - **models**: record types and the persistence-ready gene graph
//! - **gene_info / history / ensembl**: bounded parsers held in memory
//! - **gene2accession**: streaming parser grouping pre-sorted rows into
//!   per-gene batches on a bounded channel
//! - **generator**: orchestrates the parsers with the required sequencing
//! - **convert**: batch → gene graph conversion
//! - **loader**: persistence through the [`GeneStore`] collaborator
//! - **pipeline**: wires the stages together
//! - **storage**: the `GeneStore` trait and its Postgres implementation

pub mod config;
pub mod convert;
pub mod ensembl;
pub mod gene2accession;
pub mod gene_info;
pub mod generator;
pub mod history;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use config::NcbiGeneConfig;
pub use convert::{ConverterConfig, GeneConverter};
pub use generator::DomainObjectGenerator;
pub use loader::GeneLoader;
pub use models::{AccessionRecord, Gene, GeneBatch, GeneInfoRecord, TranscriptProduct};
pub use pipeline::{NcbiGenePipeline, PipelineResult};
pub use storage::{GeneStore, PgGeneStore, StorageStats};
