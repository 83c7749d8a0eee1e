//! Domain object generator
//!
//! Orchestrates the four NCBI Gene parsers with a strict sequencing
//! invariant: the small, fully bounded files (`gene_history`,
//! `gene2ensembl`) are parsed to completion and held in memory first, then
//! `gene_info` is parsed, enriched from them and fully materialized as a
//! gene-ID-keyed map. Only then does the huge `gene2accession` stream start
//! on a blocking task, emitting batches while the caller is already draining
//! the channel. The ordering is load-bearing: every gene-info record must be
//! enriched before any downstream stage can see it, and the accession parser
//! filters and evicts against the completed map.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ingest::common::open_lines;

use super::config::NcbiGeneConfig;
use super::ensembl::GeneEnsemblParser;
use super::gene2accession::{AccessionParseStats, GeneAccessionParser};
use super::gene_info::{GeneInfoData, GeneInfoParser};
use super::history::GeneHistoryParser;
use super::models::{GeneBatch, GeneInfoRecord};

/// Outcome of a generator run
#[derive(Debug, Clone, Default)]
pub struct GeneratorReport {
    /// Gene rows observed per taxon during gene_info parsing
    pub per_taxon_counts: HashMap<i32, usize>,
    /// Requested taxa that actually had gene_info rows
    pub gene_bearing_taxa: Vec<i32>,
    /// Counters from the gene2accession stream
    pub accession_stats: AccessionParseStats,
}

/// Orchestrator for the parsing half of the ingestion pipeline
pub struct DomainObjectGenerator {
    config: NcbiGeneConfig,
}

struct PreparedGenes {
    config: NcbiGeneConfig,
    genes: HashMap<String, GeneInfoRecord>,
    per_taxon_counts: HashMap<i32, usize>,
    gene_bearing_taxa: Vec<i32>,
}

impl DomainObjectGenerator {
    pub fn new(config: NcbiGeneConfig) -> Self {
        Self { config }
    }

    /// Run the generator, emitting gene batches onto `tx`.
    ///
    /// Completion is signalled by dropping `tx` (the channel closes); there
    /// is no separate done flag for consumers to poll.
    pub async fn run(
        self,
        tx: mpsc::Sender<GeneBatch>,
        cancel: CancellationToken,
    ) -> Result<GeneratorReport> {
        let config = self.config;

        info!("Phase 1: Parsing bounded files (gene_history, gene2ensembl, gene_info)");
        let prepared = tokio::task::spawn_blocking(move || prepare(config))
            .await
            .context("Gene map preparation task panicked")??;

        info!(
            genes = prepared.genes.len(),
            taxa = prepared.per_taxon_counts.len(),
            "Phase 2: Streaming gene2accession"
        );

        let per_taxon_counts = prepared.per_taxon_counts.clone();
        let gene_bearing_taxa = prepared.gene_bearing_taxa.clone();

        let accession_stats = tokio::task::spawn_blocking(move || {
            let reader = open_lines(&prepared.config.gene2accession_path)?;
            let mut parser = GeneAccessionParser::new(cancel);
            if let Some(gene_id) = &prepared.config.start_gene_id {
                parser = parser.with_start_gene_id(gene_id.clone());
            }
            parser.parse(reader, prepared.genes, &tx)
        })
        .await
        .context("gene2accession parse task panicked")??;

        Ok(GeneratorReport {
            per_taxon_counts,
            gene_bearing_taxa,
            accession_stats,
        })
    }
}

/// Parse history, ensembl and gene_info, then enrich the gene map.
fn prepare(config: NcbiGeneConfig) -> Result<PreparedGenes> {
    let history = match &config.gene_history_path {
        Some(path) => {
            let reader = open_lines(path)?;
            Some(
                GeneHistoryParser::new()
                    .parse(reader)
                    .context("Failed to parse gene_history")?,
            )
        },
        None => None,
    };

    let ensembl = match &config.gene2ensembl_path {
        Some(path) => {
            let reader = open_lines(path)?;
            GeneEnsemblParser::new()
                .parse(reader)
                .context("Failed to parse gene2ensembl")?
        },
        None => HashMap::new(),
    };

    let filter = taxon_filter(&config);
    let info_parser = match filter {
        Some(taxa) => GeneInfoParser::with_taxon_filter(taxa),
        None => GeneInfoParser::new(),
    };

    let reader = open_lines(&config.gene_info_path)?;
    let GeneInfoData {
        mut genes,
        per_taxon_counts,
    } = info_parser
        .parse(reader)
        .context("Failed to parse gene_info")?;

    // Enrichment happens before any record can be handed downstream. A gene
    // gets either its history chain or the symbol-indexed discontinued ID,
    // never both.
    for record in genes.values_mut() {
        if let Some(history) = &history {
            match history.history_for(&record.gene_id) {
                Some(chain) => record.history = Some(chain.clone()),
                None => {
                    if let Some(id) = history.discontinued_id_for(record.taxon_id, &record.symbol)
                    {
                        record.discontinued_id = Some(id.clone());
                    }
                },
            }
        }
        if let Some(ensembl_id) = ensembl.get(&record.gene_id) {
            record.ensembl_id = Some(ensembl_id.clone());
        }
    }

    // A requested taxon with zero observed gene rows is not gene-bearing,
    // even though it was in the filter set.
    let gene_bearing_taxa: Vec<i32> = if config.taxa.is_empty() {
        let mut taxa: Vec<i32> = per_taxon_counts.keys().copied().collect();
        taxa.sort_unstable();
        taxa
    } else {
        let mut taxa: Vec<i32> = config
            .taxa
            .iter()
            .flat_map(|t| t.ncbi_ids())
            .filter(|id| per_taxon_counts.get(id).is_some_and(|count| *count > 0))
            .collect();
        taxa.sort_unstable();
        taxa.dedup();
        taxa
    };

    Ok(PreparedGenes {
        config,
        genes,
        per_taxon_counts,
        gene_bearing_taxa,
    })
}

/// Build the taxon filter set from the configured taxa.
///
/// A taxon without any NCBI ID cannot be matched against the feed; if no
/// requested taxon has one, filtering is disabled entirely rather than
/// silently dropping the whole feed.
fn taxon_filter(config: &NcbiGeneConfig) -> Option<HashSet<i32>> {
    if config.taxa.is_empty() {
        return None;
    }

    let mut filter = HashSet::new();
    for taxon in &config.taxa {
        let ids = taxon.ncbi_ids();
        if ids.is_empty() {
            warn!(
                taxon = %taxon.scientific_name,
                "Taxon has no NCBI ID; cannot filter the feed for its genes"
            );
        }
        filter.extend(ids);
    }

    if filter.is_empty() {
        warn!("No requested taxon has an NCBI ID; taxon filtering disabled");
        None
    } else {
        Some(filter)
    }
}
