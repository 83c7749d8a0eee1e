//! NCBI Gene ingestion configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use gdw_common::types::Taxon;

/// Default bounded-channel capacity between pipeline stages
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Configuration for an NCBI Gene ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NcbiGeneConfig {
    /// Path to `gene_info` (gzip or plain)
    pub gene_info_path: PathBuf,
    /// Path to `gene2accession` (gzip or plain)
    pub gene2accession_path: PathBuf,
    /// Path to `gene_history`; None skips history enrichment
    pub gene_history_path: Option<PathBuf>,
    /// Path to `gene2ensembl`; None skips Ensembl enrichment
    pub gene2ensembl_path: Option<PathBuf>,
    /// Taxa to retain; empty keeps every organism in the feed
    pub taxa: Vec<Taxon>,
    /// Resume point for restartable ingestion of a partial gene2accession
    pub start_gene_id: Option<String>,
    /// Capacity of the two bounded channels between stages
    pub queue_capacity: usize,
}

impl NcbiGeneConfig {
    /// Create a configuration for the two mandatory input files
    pub fn new(gene_info: impl Into<PathBuf>, gene2accession: impl Into<PathBuf>) -> Self {
        Self {
            gene_info_path: gene_info.into(),
            gene2accession_path: gene2accession.into(),
            gene_history_path: None,
            gene2ensembl_path: None,
            taxa: Vec::new(),
            start_gene_id: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Set the gene_history file
    pub fn with_gene_history(mut self, path: impl Into<PathBuf>) -> Self {
        self.gene_history_path = Some(path.into());
        self
    }

    /// Set the gene2ensembl file
    pub fn with_gene2ensembl(mut self, path: impl Into<PathBuf>) -> Self {
        self.gene2ensembl_path = Some(path.into());
        self
    }

    /// Restrict ingestion to the given taxa
    pub fn with_taxa(mut self, taxa: Vec<Taxon>) -> Self {
        self.taxa = taxa;
        self
    }

    /// Resume the gene2accession stream at the given gene ID
    pub fn with_start_gene_id(mut self, gene_id: impl Into<String>) -> Self {
        self.start_gene_id = Some(gene_id.into());
        self
    }

    /// Override the inter-stage channel capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}
