//! Gene batch → persistence-ready graph conversion
//!
//! Consumes sealed [`GeneBatch`]es from the generator's channel and emits
//! [`Gene`] graphs for the loader. A gene whose batch yields zero transcript
//! products is a valid parse result but is dropped here, so identifier-only
//! noise entries never reach the store.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use gdw_common::types::{PhysicalLocation, Strand};
use gdw_common::GdwError;

use crate::goldenpath::bin_from_range;

use super::models::{Gene, GeneBatch, TranscriptProduct};

/// Labels for the external databases transcript accessions belong to.
///
/// Owned by the pipeline run that constructs the converter; there is no
/// process-wide descriptor shared between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    pub genbank_label: String,
    pub ensembl_label: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            genbank_label: "Genbank".to_string(),
            ensembl_label: "Ensembl".to_string(),
        }
    }
}

/// Counters reported after the converter drains its input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    /// Genes emitted downstream
    pub converted: usize,
    /// Genes dropped for having no transcript products
    pub dropped_empty: usize,
}

/// Converter stage of the ingestion pipeline
pub struct GeneConverter {
    config: ConverterConfig,
}

impl GeneConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Drain `rx` until the generator closes it, emitting converted genes
    /// onto `tx`. Cancellation is observed at both channel operations.
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<GeneBatch>,
        tx: mpsc::Sender<Gene>,
        cancel: CancellationToken,
    ) -> Result<ConvertStats> {
        let mut stats = ConvertStats::default();

        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(GdwError::Cancelled("gene converter".to_string()).into());
                },
                batch = rx.recv() => match batch {
                    Some(batch) => batch,
                    None => break,
                },
            };

            match self.convert(batch) {
                Some(gene) => {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(GdwError::Cancelled("gene converter".to_string()).into());
                        },
                        sent = tx.send(gene) => {
                            if sent.is_err() {
                                anyhow::bail!("converted gene channel closed before conversion completed");
                            }
                        },
                    }
                    stats.converted += 1;
                },
                None => stats.dropped_empty += 1,
            }
        }

        debug!(
            converted = stats.converted,
            dropped_empty = stats.dropped_empty,
            "Gene conversion complete"
        );
        Ok(stats)
    }

    /// Convert one batch; None when the gene has no transcript products.
    pub fn convert(&self, batch: GeneBatch) -> Option<Gene> {
        let info = batch.info;

        // History chain wins over the plain discontinued ID; the two are
        // never combined.
        let previous_ncbi_gene_id = match &info.history {
            Some(history) if !history.is_empty() => Some(history.joined()),
            _ => info.discontinued_id.clone(),
        };

        let location = info
            .chromosome
            .as_ref()
            .map(|chromosome| PhysicalLocation::chromosome_only(chromosome.clone(), Strand::Unknown));

        let mut products = Vec::new();
        for accession in &batch.accessions {
            let rna = match &accession.rna_accession {
                Some(rna) => rna,
                None => continue,
            };

            let external_database = if rna.starts_with("ENS") {
                self.config.ensembl_label.clone()
            } else {
                self.config.genbank_label.clone()
            };

            // Strand and bin come from the genomic accession's coordinates,
            // not from anything RNA-level.
            let product_location = match (
                accession.genomic_accession.as_ref(),
                accession.genomic_start,
                accession.genomic_end,
            ) {
                (Some(genomic), Some(start), Some(end)) if end >= start => {
                    Some(PhysicalLocation {
                        chromosome: genomic.clone(),
                        strand: accession.orientation,
                        nucleotide: Some(start),
                        nucleotide_length: Some(end - start),
                        bin: bin_from_range(start, end.max(start + 1)).ok(),
                    })
                },
                _ => None,
            };

            products.push(TranscriptProduct {
                gene_ncbi_id: info.gene_id.clone(),
                accession: rna.clone(),
                accession_version: accession.rna_version.clone(),
                external_database,
                location: product_location,
            });
        }

        if products.is_empty() {
            debug!(gene_id = %info.gene_id, symbol = %info.symbol, "Dropping gene with no transcript products");
            return None;
        }

        Some(Gene {
            ncbi_gene_id: info.gene_id,
            taxon_id: info.taxon_id,
            official_symbol: info.symbol,
            official_name: info.authority_full_name.or(info.description.clone()),
            description: info.description,
            previous_ncbi_gene_id,
            ensembl_id: info.ensembl_id,
            location,
            aliases: info.synonyms,
            accessions: info.xrefs,
            products,
        })
    }
}

impl Default for GeneConverter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ncbi_gene::models::tests::{sample_accession, sample_info};
    use crate::ingest::ncbi_gene::models::{GeneBatch, GeneHistory};

    #[test]
    fn test_empty_batch_dropped() {
        let converter = GeneConverter::default();
        let batch = GeneBatch::new(sample_info("1"));
        assert!(converter.convert(batch).is_none());
    }

    #[test]
    fn test_accession_without_rna_yields_no_product() {
        let converter = GeneConverter::default();
        let mut batch = GeneBatch::new(sample_info("1"));
        let mut accession = sample_accession("1");
        accession.rna_accession = None;
        accession.rna_version = None;
        batch.push(accession);

        assert!(converter.convert(batch).is_none());
    }

    #[test]
    fn test_product_location_from_genomic_coordinates() {
        let converter = GeneConverter::default();
        let mut batch = GeneBatch::new(sample_info("1"));
        batch.push(sample_accession("1"));

        let gene = converter.convert(batch).unwrap();
        assert_eq!(gene.products.len(), 1);

        let product = &gene.products[0];
        assert_eq!(product.accession, "NM_130786");
        assert_eq!(product.external_database, "Genbank");

        let location = product.location.as_ref().unwrap();
        assert_eq!(location.chromosome, "NC_000019");
        assert_eq!(location.nucleotide, Some(58345178));
        assert_eq!(location.nucleotide_length, Some(58353492 - 58345178));
        assert_eq!(location.strand, gdw_common::types::Strand::Negative);
        assert!(location.bin.is_some());
    }

    #[test]
    fn test_history_chain_wins_over_discontinued_id() {
        let converter = GeneConverter::default();
        let mut info = sample_info("1");
        info.history = Some(GeneHistory {
            previous_ids: vec!["100".to_string(), "200".to_string()],
        });
        info.discontinued_id = Some("999".to_string());
        let mut batch = GeneBatch::new(info);
        batch.push(sample_accession("1"));

        let gene = converter.convert(batch).unwrap();
        assert_eq!(gene.previous_ncbi_gene_id.as_deref(), Some("100,200"));
    }

    #[test]
    fn test_discontinued_id_fallback() {
        let converter = GeneConverter::default();
        let mut info = sample_info("1");
        info.discontinued_id = Some("999".to_string());
        let mut batch = GeneBatch::new(info);
        batch.push(sample_accession("1"));

        let gene = converter.convert(batch).unwrap();
        assert_eq!(gene.previous_ncbi_gene_id.as_deref(), Some("999"));
    }

    #[test]
    fn test_ensembl_accession_gets_ensembl_label() {
        let converter = GeneConverter::default();
        let mut batch = GeneBatch::new(sample_info("1"));
        let mut accession = sample_accession("1");
        accession.rna_accession = Some("ENST00000263100".to_string());
        batch.push(accession);

        let gene = converter.convert(batch).unwrap();
        assert_eq!(gene.products[0].external_database, "Ensembl");
    }

    #[test]
    fn test_gene_attributes_copied() {
        let converter = GeneConverter::default();
        let mut batch = GeneBatch::new(sample_info("1"));
        batch.push(sample_accession("1"));

        let gene = converter.convert(batch).unwrap();
        assert_eq!(gene.ncbi_gene_id, "1");
        assert_eq!(gene.taxon_id, 9606);
        assert_eq!(gene.official_symbol, "A1BG");
        assert_eq!(gene.aliases, vec!["A1B"]);
        assert_eq!(gene.location.as_ref().unwrap().chromosome, "19");
    }

    #[tokio::test]
    async fn test_run_drains_until_channel_closes() {
        let (batch_tx, batch_rx) = mpsc::channel(8);
        let (gene_tx, mut gene_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let mut with_product = GeneBatch::new(sample_info("1"));
        with_product.push(sample_accession("1"));
        let empty = GeneBatch::new(sample_info("2"));

        batch_tx.send(with_product).await.unwrap();
        batch_tx.send(empty).await.unwrap();
        drop(batch_tx);

        let converter = GeneConverter::default();
        let stats = converter.run(batch_rx, gene_tx, cancel).await.unwrap();

        assert_eq!(stats.converted, 1);
        assert_eq!(stats.dropped_empty, 1);

        let gene = gene_rx.recv().await.unwrap();
        assert_eq!(gene.ncbi_gene_id, "1");
        assert!(gene_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let (_batch_tx, batch_rx) = mpsc::channel::<GeneBatch>(8);
        let (gene_tx, _gene_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let converter = GeneConverter::default();
        let result = converter.run(batch_rx, gene_tx, cancel).await;
        assert!(result.is_err());
    }
}
