//! `gene_info` file parser
//!
//! Parses the tab-delimited NCBI `gene_info` file into a gene-ID-keyed map,
//! optionally filtered to a taxon set before any other processing so memory
//! stays bounded by the requested organisms.
//!
//! # File Format
//! 16 nominal columns; 13 through 16 are accepted to survive trailing-field
//! growth, and only the first 13 are used:
//! `tax_id  GeneID  Symbol  LocusTag  Synonyms  dbXrefs  chromosome
//!  map_location  description  type_of_gene  Symbol_from_nomenclature_authority
//!  Full_name_from_nomenclature_authority  Nomenclature_status  ...`

use anyhow::{bail, Context, Result};
use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use tracing::debug;

use super::models::{GeneInfoRecord, GeneType, GeneXref, NomenclatureStatus};

/// Databases whose accessions themselves contain a colon
/// (e.g., `HGNC:HGNC:5`); the trailing parts are reassembled.
const COLON_ACCESSION_DATABASES: [&str; 2] = ["HGNC", "MGI"];

/// Cross-reference source that is dropped rather than parsed
const ALLIANCE_GENOME: &str = "AllianceGenome";

/// Result of parsing a `gene_info` file
#[derive(Debug, Default)]
pub struct GeneInfoData {
    /// Retained gene records, keyed by gene ID
    pub genes: HashMap<String, GeneInfoRecord>,
    /// Number of gene rows observed per taxon (before any accession matching)
    pub per_taxon_counts: HashMap<i32, usize>,
}

/// Parser for the `gene_info` file
pub struct GeneInfoParser {
    /// Retain only rows whose taxon is in this set (None keeps everything)
    taxon_filter: Option<HashSet<i32>>,
}

impl GeneInfoParser {
    /// Create an unfiltered parser
    pub fn new() -> Self {
        Self { taxon_filter: None }
    }

    /// Create a parser keeping only the given taxa
    pub fn with_taxon_filter(taxa: HashSet<i32>) -> Self {
        Self {
            taxon_filter: Some(taxa),
        }
    }

    /// Parse the whole file into a gene map plus per-taxon row counts
    pub fn parse<R: BufRead>(&self, reader: R) -> Result<GeneInfoData> {
        let mut data = GeneInfoData::default();
        let mut line_num = 0;

        for line in reader.lines() {
            line_num += 1;
            let line = line.with_context(|| format!("Failed to read gene_info line {}", line_num))?;

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(record) = self.parse_line(&line, line_num)? {
                *data.per_taxon_counts.entry(record.taxon_id).or_insert(0) += 1;
                data.genes.insert(record.gene_id.clone(), record);
            }
        }

        debug!(
            genes = data.genes.len(),
            taxa = data.per_taxon_counts.len(),
            "Parsed gene_info"
        );
        Ok(data)
    }

    /// Parse a single line; returns None when the row is filtered out
    pub fn parse_line(&self, line: &str, line_num: usize) -> Result<Option<GeneInfoRecord>> {
        // Split preserving empty tokens: optional columns hold "-" but format
        // drift has produced genuinely empty trailing fields before.
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() < 13 || fields.len() > 16 {
            bail!(
                "gene_info line {}: expected 13 to 16 fields, got {}",
                line_num,
                fields.len()
            );
        }

        let taxon_id: i32 = fields[0]
            .parse()
            .with_context(|| format!("gene_info line {}: invalid tax_id: {}", line_num, fields[0]))?;

        // Taxon filter applies before anything else is parsed
        if let Some(filter) = &self.taxon_filter {
            if !filter.contains(&taxon_id) {
                return Ok(None);
            }
        }

        let gene_id = fields[1].to_string();
        if gene_id.is_empty() || gene_id == "-" {
            bail!("gene_info line {}: missing GeneID", line_num);
        }

        let synonyms = match opt(fields[4]) {
            Some(s) => s.split('|').map(|t| t.to_string()).collect(),
            None => Vec::new(),
        };

        let xrefs = parse_xrefs(fields[5], line_num)?;

        Ok(Some(GeneInfoRecord {
            taxon_id,
            gene_id,
            symbol: fields[2].to_string(),
            locus_tag: opt(fields[3]).map(str::to_string),
            synonyms,
            xrefs,
            chromosome: opt(fields[6]).map(str::to_string),
            map_location: opt(fields[7]).map(str::to_string),
            description: opt(fields[8]).map(str::to_string),
            gene_type: GeneType::from_token(fields[9]),
            authority_symbol: opt(fields[10]).map(str::to_string),
            authority_full_name: opt(fields[11]).map(str::to_string),
            nomenclature_status: NomenclatureStatus::from_token(fields[12]),
            discontinued_id: None,
            history: None,
            ensembl_id: None,
        }))
    }
}

impl Default for GeneInfoParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Map "-" and empty tokens to None
fn opt(field: &str) -> Option<&str> {
    match field {
        "" | "-" => None,
        other => Some(other),
    }
}

/// Parse the pipe-delimited `dbXrefs` column.
///
/// Values are `db:accession` pairs. HGNC and MGI embed the database name in
/// the accession (`HGNC:HGNC:5`), so three-part values from those databases
/// are reassembled; `AllianceGenome:*` triples are dropped. Any other value
/// with three or more parts is an unknown format and fails the parse.
fn parse_xrefs(field: &str, line_num: usize) -> Result<Vec<GeneXref>> {
    let mut xrefs = Vec::new();

    let field = match opt(field) {
        Some(f) => f,
        None => return Ok(xrefs),
    };

    for value in field.split('|') {
        let parts: Vec<&str> = value.split(':').collect();
        match parts.len() {
            2 => xrefs.push(GeneXref::new(parts[0], parts[1])),
            3 if COLON_ACCESSION_DATABASES.contains(&parts[0]) => {
                xrefs.push(GeneXref::new(parts[0], format!("{}:{}", parts[1], parts[2])));
            },
            3 if parts[0] == ALLIANCE_GENOME => {
                // Not a supported cross-reference source
            },
            _ => bail!(
                "gene_info line {}: unrecognized dbXrefs value '{}'",
                line_num,
                value
            ),
        }
    }

    Ok(xrefs)
}
