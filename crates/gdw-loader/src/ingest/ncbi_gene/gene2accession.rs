//! `gene2accession` streaming parser
//!
//! The gene2accession file runs to hundreds of millions of rows, so it is
//! never materialized: rows are streamed, grouped by gene ID and emitted as
//! sealed [`GeneBatch`]es onto a bounded channel. A slow consumer therefore
//! stalls this parser instead of growing memory.
//!
//! Rows are pre-sorted by gene ID in the source file; a batch is sealed the
//! moment a row with a different gene ID appears. Sealing also evicts the
//! gene's entry from the gene-info map, keeping the map shrinking as the
//! file advances. At end of stream, every gene-info entry that never matched
//! an accession row is emitted as a single empty batch, so each retained
//! gene reaches the consumer exactly once.
//!
//! # File Format
//! At least 13 tab-delimited columns:
//! `tax_id  GeneID  status  RNA_nucleotide_accession.version  RNA_nucleotide_gi
//!  protein_accession.version  protein_gi  genomic_nucleotide_accession.version
//!  genomic_nucleotide_gi  start_position  end_position  orientation  assembly`

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::io::BufRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use gdw_common::types::Strand;
use gdw_common::GdwError;

use super::models::{split_versioned, AccessionRecord, GeneBatch, GeneInfoRecord};

/// Assembly-note marker for rows mapped onto an alternate assembly; these
/// duplicate the primary-assembly rows and are dropped.
const ALTERNATE_ASSEMBLY: &str = "Alternate";

/// Counters reported after a parse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessionParseStats {
    /// Physical data lines read
    pub lines: usize,
    /// Accession rows appended to a batch
    pub appended: usize,
    /// Rows dropped for being on an alternate assembly
    pub skipped_alt_assembly: usize,
    /// Rows whose gene ID was not in the (taxon-filtered) gene-info map
    pub skipped_unknown_gene: usize,
    /// Rows dropped before the configured resume point was reached
    pub skipped_before_resume: usize,
    /// Batches emitted from accession rows
    pub batches_emitted: usize,
    /// Empty batches emitted for genes with zero accession rows
    pub empty_batches_emitted: usize,
}

/// Streaming parser for the `gene2accession` file
pub struct GeneAccessionParser {
    /// Resume point: rows are dropped until a row's gene ID matches exactly
    start_gene_id: Option<String>,
    cancel: CancellationToken,
}

impl GeneAccessionParser {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            start_gene_id: None,
            cancel,
        }
    }

    /// Resume a partial ingestion at the given gene ID
    pub fn with_start_gene_id(mut self, gene_id: impl Into<String>) -> Self {
        self.start_gene_id = Some(gene_id.into());
        self
    }

    /// Parse the stream, consuming the gene-info map.
    ///
    /// Runs on a blocking thread; `blocking_send` provides the backpressure.
    /// A closed output channel means the consumer went away, which is an
    /// error here unless cancellation was requested.
    pub fn parse<R: BufRead>(
        &self,
        reader: R,
        mut genes: HashMap<String, GeneInfoRecord>,
        tx: &mpsc::Sender<GeneBatch>,
    ) -> Result<AccessionParseStats> {
        let mut stats = AccessionParseStats::default();
        let mut current: Option<GeneBatch> = None;
        let mut last_gene_id: Option<String> = None;
        let mut seeking = self.start_gene_id.clone();
        let mut line_num = 0;

        if let Some(target) = &seeking {
            info!(start_gene_id = %target, "Resuming gene2accession parse");
        }

        for line in reader.lines() {
            line_num += 1;
            let line = line
                .with_context(|| format!("Failed to read gene2accession line {}", line_num))?;

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            stats.lines += 1;

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 13 {
                bail!(
                    "gene2accession line {}: expected at least 13 fields, got {}",
                    line_num,
                    fields.len()
                );
            }

            if fields[12].starts_with(ALTERNATE_ASSEMBLY) {
                stats.skipped_alt_assembly += 1;
                continue;
            }

            let gene_id = fields[1];
            // Gene IDs are numeric; a non-numeric value means the file is
            // corrupt, not that the row is skippable.
            gene_id.parse::<i64>().with_context(|| {
                format!("gene2accession line {}: invalid GeneID: {}", line_num, gene_id)
            })?;

            if let Some(target) = &seeking {
                if gene_id != target {
                    stats.skipped_before_resume += 1;
                    continue;
                }
                seeking = None;
            }

            if last_gene_id.as_deref() != Some(gene_id) {
                // Gene boundary: seal the open batch and open the next one.
                if let Some(batch) = current.take() {
                    stats.batches_emitted += 1;
                    self.send(tx, batch)?;
                }
                // Removing the entry both hands us ownership for the new
                // batch and evicts it from the map.
                current = genes.remove(gene_id).map(GeneBatch::new);
                last_gene_id = Some(gene_id.to_string());
            }

            match current.as_mut() {
                Some(batch) => {
                    batch.push(parse_accession(&fields, line_num)?);
                    stats.appended += 1;
                },
                None => {
                    stats.skipped_unknown_gene += 1;
                },
            }
        }

        // End of stream: flush the open batch, then every gene that never
        // had an accession row.
        if let Some(batch) = current.take() {
            stats.batches_emitted += 1;
            self.send(tx, batch)?;
        }

        for (_, info) in genes.drain() {
            stats.empty_batches_emitted += 1;
            self.send(tx, GeneBatch::new(info))?;
        }

        debug!(
            lines = stats.lines,
            batches = stats.batches_emitted,
            empty_batches = stats.empty_batches_emitted,
            skipped_unknown_gene = stats.skipped_unknown_gene,
            "gene2accession parse complete"
        );

        Ok(stats)
    }

    /// Push a sealed batch, blocking for backpressure.
    fn send(&self, tx: &mpsc::Sender<GeneBatch>, batch: GeneBatch) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(GdwError::Cancelled("gene2accession parser".to_string()).into());
        }
        tx.blocking_send(batch).map_err(|_| {
            if self.cancel.is_cancelled() {
                anyhow::Error::from(GdwError::Cancelled("gene2accession parser".to_string()))
            } else {
                anyhow::anyhow!("gene batch channel closed before parse completed")
            }
        })
    }
}

/// Parse one accepted row into an [`AccessionRecord`]
fn parse_accession(fields: &[&str], line_num: usize) -> Result<AccessionRecord> {
    let (rna_accession, rna_version) = split_pair(fields[3], "RNA", line_num)?;
    let (protein_accession, protein_version) = split_pair(fields[5], "protein", line_num)?;
    let (genomic_accession, genomic_version) = split_pair(fields[7], "genomic", line_num)?;

    let taxon_id: i32 = fields[0].parse().with_context(|| {
        format!("gene2accession line {}: invalid tax_id: {}", line_num, fields[0])
    })?;

    Ok(AccessionRecord {
        gene_id: fields[1].to_string(),
        taxon_id,
        status: opt(fields[2]).map(str::to_string),
        rna_accession,
        rna_version,
        protein_accession,
        protein_version,
        genomic_accession,
        genomic_version,
        genomic_start: parse_position(fields[9], line_num, "start")?,
        genomic_end: parse_position(fields[10], line_num, "end")?,
        orientation: Strand::from_token(fields[11]),
    })
}

fn split_pair(
    token: &str,
    what: &str,
    line_num: usize,
) -> Result<(Option<String>, Option<String>)> {
    match split_versioned(token)
        .with_context(|| format!("gene2accession line {}: bad {} accession", line_num, what))?
    {
        Some((accession, version)) => Ok((Some(accession), version)),
        None => Ok((None, None)),
    }
}

fn parse_position(field: &str, line_num: usize, what: &str) -> Result<Option<i64>> {
    match opt(field) {
        None => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .with_context(|| {
                format!("gene2accession line {}: invalid {} position: {}", line_num, what, value)
            }),
    }
}

fn opt(field: &str) -> Option<&str> {
    match field {
        "" | "-" => None,
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ncbi_gene::models::tests::sample_info;

    fn row(gene_id: &str, rna: &str) -> String {
        format!(
            "9606\t{}\tREVIEWED\t{}\t1234\tNP_000001.1\t5678\tNC_000019.10\t9012\t100\t500\t+\tReference GRCh38.p14 Primary Assembly",
            gene_id, rna
        )
    }

    fn alt_row(gene_id: &str) -> String {
        format!(
            "9606\t{}\tREVIEWED\tNM_000002.1\t1234\t-\t-\tNT_187513.1\t9012\t100\t500\t+\tAlternate CHM1_1.1",
            gene_id
        )
    }

    /// Run the parser over in-memory content and collect everything emitted
    fn run_parser(
        content: &str,
        genes: HashMap<String, GeneInfoRecord>,
        start_gene_id: Option<&str>,
    ) -> (AccessionParseStats, Vec<GeneBatch>) {
        let cancel = CancellationToken::new();
        let mut parser = GeneAccessionParser::new(cancel);
        if let Some(id) = start_gene_id {
            parser = parser.with_start_gene_id(id);
        }

        // Capacity exceeds what any test emits, so blocking_send never parks.
        let (tx, mut rx) = mpsc::channel(64);
        let stats = parser.parse(content.as_bytes(), genes, &tx).unwrap();
        drop(tx);

        let mut batches = Vec::new();
        while let Ok(batch) = rx.try_recv() {
            batches.push(batch);
        }
        (stats, batches)
    }

    fn gene_map(ids: &[&str]) -> HashMap<String, GeneInfoRecord> {
        ids.iter()
            .map(|id| (id.to_string(), sample_info(id)))
            .collect()
    }

    #[test]
    fn test_batch_sealed_on_gene_change() {
        let content = format!(
            "{}\n{}\n{}\n",
            row("100", "NM_000100.1"),
            row("100", "NM_000101.1"),
            row("200", "NM_000200.1")
        );
        let (stats, batches) = run_parser(&content, gene_map(&["100", "200"]), None);

        assert_eq!(stats.batches_emitted, 2);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].gene_id(), "100");
        assert_eq!(batches[0].accessions.len(), 2);
        assert_eq!(batches[1].gene_id(), "200");
        assert_eq!(batches[1].accessions.len(), 1);
    }

    #[test]
    fn test_first_batch_emitted_before_second_row_group_completes() {
        // With a capacity-1 channel, the parser can only progress past the
        // "200" row if the "100" batch was pushed the moment "200" appeared.
        let content = format!("{}\n{}\n", row("100", "NM_000100.1"), row("200", "NM_000200.1"));
        let cancel = CancellationToken::new();
        let parser = GeneAccessionParser::new(cancel);
        let (tx, mut rx) = mpsc::channel(1);

        let handle = std::thread::spawn(move || {
            let mut received = Vec::new();
            while let Some(batch) = rx.blocking_recv() {
                received.push(batch);
            }
            received
        });

        let stats = parser
            .parse(content.as_bytes(), gene_map(&["100", "200"]), &tx)
            .unwrap();
        drop(tx);

        let received = handle.join().unwrap();
        assert_eq!(stats.batches_emitted, 2);
        assert_eq!(received[0].gene_id(), "100");
        assert_eq!(received[1].gene_id(), "200");
    }

    #[test]
    fn test_gene_without_accessions_emitted_empty() {
        let content = format!("{}\n", row("100", "NM_000100.1"));
        let (stats, batches) = run_parser(&content, gene_map(&["100", "999"]), None);

        assert_eq!(stats.batches_emitted, 1);
        assert_eq!(stats.empty_batches_emitted, 1);

        let empty = batches.iter().find(|b| b.gene_id() == "999").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_every_gene_emitted_exactly_once() {
        let content = format!(
            "{}\n{}\n{}\n",
            row("100", "NM_000100.1"),
            row("300", "NM_000300.1"),
            row("300", "NM_000301.1")
        );
        let (_, batches) = run_parser(&content, gene_map(&["100", "200", "300"]), None);

        let mut ids: Vec<&str> = batches.iter().map(|b| b.gene_id()).collect();
        ids.sort();
        assert_eq!(ids, vec!["100", "200", "300"]);
    }

    #[test]
    fn test_unknown_gene_rows_dropped_but_counted() {
        let content = format!("{}\n{}\n", row("100", "NM_000100.1"), row("555", "NM_000555.1"));
        let (stats, batches) = run_parser(&content, gene_map(&["100"]), None);

        assert_eq!(stats.skipped_unknown_gene, 1);
        assert_eq!(stats.lines, 2);
        assert_eq!(batches.len(), 1);
    }

    #[test]
    fn test_alternate_assembly_rows_dropped() {
        let content = format!("{}\n{}\n", alt_row("100"), row("100", "NM_000100.1"));
        let (stats, batches) = run_parser(&content, gene_map(&["100"]), None);

        assert_eq!(stats.skipped_alt_assembly, 1);
        assert_eq!(batches[0].accessions.len(), 1);
        assert_eq!(
            batches[0].accessions[0].rna_accession.as_deref(),
            Some("NM_000100")
        );
    }

    #[test]
    fn test_resume_from_gene_id() {
        let content = format!(
            "{}\n{}\n{}\n",
            row("100", "NM_000100.1"),
            row("200", "NM_000200.1"),
            row("300", "NM_000300.1")
        );
        let (stats, batches) =
            run_parser(&content, gene_map(&["200", "300"]), Some("200"));

        assert_eq!(stats.skipped_before_resume, 1);
        assert_eq!(stats.batches_emitted, 2);
        assert_eq!(batches[0].gene_id(), "200");
    }

    #[test]
    fn test_short_line_is_fatal() {
        let cancel = CancellationToken::new();
        let parser = GeneAccessionParser::new(cancel);
        let (tx, _rx) = mpsc::channel(4);

        let result = parser.parse("9606\t1\tREVIEWED\n".as_bytes(), gene_map(&["1"]), &tx);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_numeric_gene_id_is_fatal() {
        let cancel = CancellationToken::new();
        let parser = GeneAccessionParser::new(cancel);
        let (tx, _rx) = mpsc::channel(4);

        let bad = row("abc", "NM_1.1");
        let result = parser.parse(bad.as_bytes(), gene_map(&[]), &tx);
        assert!(result.is_err());
    }

    #[test]
    fn test_double_dot_accession_is_fatal() {
        let cancel = CancellationToken::new();
        let parser = GeneAccessionParser::new(cancel);
        let (tx, _rx) = mpsc::channel(4);

        let bad = row("100", "NM_000100.1.2");
        let result = parser.parse(bad.as_bytes(), gene_map(&["100"]), &tx);
        assert!(result.is_err());
    }

    #[test]
    fn test_accession_version_split() {
        let content = format!("{}\n", row("100", "NM_000100.7"));
        let (_, batches) = run_parser(&content, gene_map(&["100"]), None);

        let acc = &batches[0].accessions[0];
        assert_eq!(acc.rna_accession.as_deref(), Some("NM_000100"));
        assert_eq!(acc.rna_version.as_deref(), Some("7"));
        assert_eq!(acc.genomic_start, Some(100));
        assert_eq!(acc.genomic_end, Some(500));
        assert_eq!(acc.orientation, Strand::Positive);
    }
}
