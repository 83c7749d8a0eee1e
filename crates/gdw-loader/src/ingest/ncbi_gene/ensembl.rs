//! `gene2ensembl` file parser
//!
//! Maps NCBI gene IDs to Ensembl gene identifiers, 1:1. The file repeats the
//! gene-level mapping on every transcript row, so later rows simply overwrite
//! with the same value.
//!
//! # File Format
//! Up to 7 tab-delimited columns:
//! `tax_id  GeneID  Ensembl_gene_identifier  RNA_nucleotide_accession.version
//!  Ensembl_rna_identifier  protein_accession.version  Ensembl_protein_identifier`

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::io::BufRead;
use tracing::debug;

/// Hard upper bound on field count, as a drift check
const MAX_FIELDS: usize = 7;

/// Parser for the `gene2ensembl` file
pub struct GeneEnsemblParser;

impl GeneEnsemblParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse the whole file into a gene ID → Ensembl gene ID map
    pub fn parse<R: BufRead>(&self, reader: R) -> Result<HashMap<String, String>> {
        let mut map = HashMap::new();
        let mut line_num = 0;

        for line in reader.lines() {
            line_num += 1;
            let line =
                line.with_context(|| format!("Failed to read gene2ensembl line {}", line_num))?;

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 3 || fields.len() > MAX_FIELDS {
                bail!(
                    "gene2ensembl line {}: expected 3 to {} fields, got {}",
                    line_num,
                    MAX_FIELDS,
                    fields.len()
                );
            }

            let gene_id = fields[1];
            if gene_id.is_empty() || gene_id == "-" {
                continue;
            }

            let ensembl_id = fields[2];
            if ensembl_id.is_empty() || ensembl_id == "-" {
                continue;
            }

            map.insert(gene_id.to_string(), ensembl_id.to_string());
        }

        debug!(mappings = map.len(), "Parsed gene2ensembl");
        Ok(map)
    }
}

impl Default for GeneEnsemblParser {
    fn default() -> Self {
        Self::new()
    }
}
