//! NCBI Gene ingestion pipeline
//!
//! Wires the three stages together: generator → bounded channel → converter
//! → bounded channel → loader (on the caller's task). End-of-stream is the
//! upstream channel closing, and one shared [`CancellationToken`] lets a
//! failure in any stage shut down all of them deterministically.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::config::NcbiGeneConfig;
use super::convert::{ConverterConfig, GeneConverter};
use super::gene2accession::AccessionParseStats;
use super::generator::DomainObjectGenerator;
use super::loader::GeneLoader;
use super::storage::GeneStore;

/// NCBI Gene ingestion pipeline
pub struct NcbiGenePipeline {
    config: NcbiGeneConfig,
    converter_config: ConverterConfig,
    store: Arc<dyn GeneStore>,
}

impl NcbiGenePipeline {
    /// Create a pipeline over the given store
    pub fn new(config: NcbiGeneConfig, store: Arc<dyn GeneStore>) -> Self {
        Self {
            config,
            converter_config: ConverterConfig::default(),
            store,
        }
    }

    /// Override the converter's external-database labels
    pub fn with_converter_config(mut self, converter_config: ConverterConfig) -> Self {
        self.converter_config = converter_config;
        self
    }

    /// Run the full pipeline to completion.
    ///
    /// Steps:
    /// 1. Generator parses the bounded files, then streams gene2accession
    /// 2. Converter assembles gene graphs, dropping productless genes
    /// 3. Loader persists every gene on this task
    /// 4. Taxa that produced genes are flagged usable
    pub async fn run(&self) -> Result<PipelineResult> {
        info!("Starting NCBI Gene ingestion pipeline");

        let cancel = CancellationToken::new();
        let (batch_tx, batch_rx) = mpsc::channel(self.config.queue_capacity);
        let (gene_tx, gene_rx) = mpsc::channel(self.config.queue_capacity);

        let generator = DomainObjectGenerator::new(self.config.clone());
        let generator_handle = tokio::spawn(generator.run(batch_tx, cancel.clone()));

        let converter = GeneConverter::new(self.converter_config.clone());
        let converter_handle = tokio::spawn(converter.run(batch_rx, gene_tx, cancel.clone()));

        let loader = GeneLoader::new(self.store.clone());
        let load_result = loader.run(gene_rx, cancel.clone()).await;

        // Reap both stage tasks before deciding the outcome; a loader
        // failure has already cancelled them.
        let generator_result = generator_handle
            .await
            .context("Generator task panicked")?;
        let converter_result = converter_handle
            .await
            .context("Converter task panicked")?;

        let load_stats = load_result.context("Gene load failed")?;
        let report = generator_result.context("Domain object generation failed")?;
        let convert_stats = converter_result.context("Gene conversion failed")?;

        // Only a fully successful run may flag taxa.
        let taxa_flagged = loader.flag_usable_taxa(&load_stats.taxon_ids).await?;

        let result = PipelineResult {
            batches: report.accession_stats.batches_emitted
                + report.accession_stats.empty_batches_emitted,
            accession_stats: report.accession_stats,
            per_taxon_counts: report.per_taxon_counts,
            converted: convert_stats.converted,
            dropped_empty: convert_stats.dropped_empty,
            persisted: load_stats.persisted,
            taxa_flagged,
        };

        info!(
            batches = result.batches,
            converted = result.converted,
            dropped_empty = result.dropped_empty,
            persisted = result.persisted,
            taxa_flagged = result.taxa_flagged,
            "NCBI Gene ingestion completed successfully"
        );

        Ok(result)
    }
}

/// Result of running the pipeline
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Gene batches emitted by the generator (with and without accessions)
    pub batches: usize,
    /// Counters from the gene2accession stream
    pub accession_stats: AccessionParseStats,
    /// Gene rows observed per taxon during gene_info parsing
    pub per_taxon_counts: HashMap<i32, usize>,
    /// Genes emitted by the converter
    pub converted: usize,
    /// Genes dropped for having no transcript products
    pub dropped_empty: usize,
    /// Genes persisted
    pub persisted: usize,
    /// Taxa flagged as having usable gene data
    pub taxa_flagged: usize,
}

impl PipelineResult {
    /// Get a summary message
    pub fn summary(&self) -> String {
        format!(
            "Ingested {} gene batches: {} genes persisted, {} dropped without products, {} taxa flagged",
            self.batches, self.persisted, self.dropped_empty, self.taxa_flagged
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_result_summary() {
        let result = PipelineResult {
            batches: 10,
            accession_stats: AccessionParseStats::default(),
            per_taxon_counts: HashMap::new(),
            converted: 8,
            dropped_empty: 2,
            persisted: 8,
            taxa_flagged: 1,
        };

        let summary = result.summary();
        assert!(summary.contains("10 gene batches"));
        assert!(summary.contains("8 genes persisted"));
        assert!(summary.contains("2 dropped"));
    }
}
