//! Gene loader stage
//!
//! Drains converted genes on the caller's task and persists each one through
//! the [`GeneStore`](super::storage::GeneStore) collaborator. A single failed
//! persist cancels the whole pipeline and re-raises; there is no skip-and-
//! continue for persistence errors at this layer.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use gdw_common::GdwError;

use super::models::Gene;
use super::storage::GeneStore;

/// Progress is logged every this many genes...
const PROGRESS_GENE_INTERVAL: usize = 1000;
/// ...or after this much wall time, whichever comes first
const PROGRESS_TIME_INTERVAL: Duration = Duration::from_secs(30);

/// Counters reported after a load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Genes persisted
    pub persisted: usize,
    /// Distinct taxa that produced at least one persisted gene, ascending
    pub taxon_ids: Vec<i32>,
}

/// Loader stage of the ingestion pipeline
pub struct GeneLoader {
    store: Arc<dyn GeneStore>,
}

impl GeneLoader {
    pub fn new(store: Arc<dyn GeneStore>) -> Self {
        Self { store }
    }

    /// Drain `rx` until the converter closes it, persisting every gene.
    ///
    /// On a persistence failure the shared token is cancelled so the
    /// converter and the file parser shut down deterministically, then the
    /// error is re-raised.
    pub async fn run(
        &self,
        mut rx: mpsc::Receiver<Gene>,
        cancel: CancellationToken,
    ) -> Result<LoadStats> {
        let mut persisted = 0usize;
        let mut seen_taxa = BTreeSet::new();
        let started = Instant::now();
        let mut last_report = Instant::now();

        loop {
            let gene = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(GdwError::Cancelled("gene loader".to_string()).into());
                },
                gene = rx.recv() => match gene {
                    Some(gene) => gene,
                    None => break,
                },
            };

            if let Err(e) = self.store.find_or_create(&gene).await {
                cancel.cancel();
                return Err(e).with_context(|| {
                    format!(
                        "Failed to persist gene {} (taxon {})",
                        gene.ncbi_gene_id, gene.taxon_id
                    )
                });
            }

            seen_taxa.insert(gene.taxon_id);
            persisted += 1;

            if persisted % PROGRESS_GENE_INTERVAL == 0
                || last_report.elapsed() >= PROGRESS_TIME_INTERVAL
            {
                info!(
                    genes = persisted,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Gene load progress"
                );
                last_report = Instant::now();
            }
        }

        info!(
            genes = persisted,
            taxa = seen_taxa.len(),
            elapsed_secs = started.elapsed().as_secs(),
            "Gene load complete"
        );

        Ok(LoadStats {
            persisted,
            taxon_ids: seen_taxa.into_iter().collect(),
        })
    }

    /// Flag taxa that produced genes as having usable gene data.
    ///
    /// Runs after the queue has drained and every upstream stage has
    /// completed cleanly. Zero taxa is a caller error surfaced by the store.
    pub async fn flag_usable_taxa(&self, taxon_ids: &[i32]) -> Result<usize> {
        self.store
            .mark_taxa_usable(taxon_ids)
            .await
            .context("Failed to flag taxa with usable gene data")
    }
}
