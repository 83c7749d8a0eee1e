//! Data ingestion pipelines
//!
//! - **common**: shared helpers (transparent gzip line sources)
//! - **ncbi_gene**: NCBI Gene annotation feed ingestion

pub mod common;
pub mod ncbi_gene;

pub use ncbi_gene::{NcbiGeneConfig, NcbiGenePipeline, PipelineResult};
