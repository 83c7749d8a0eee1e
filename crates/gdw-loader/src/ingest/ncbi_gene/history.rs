//! `gene_history` file parser
//!
//! Builds two indexes from the discontinued/renamed-gene-ID file:
//!
//! - per current gene ID, the chain of previous IDs merged into it across
//!   file versions (a gene renamed A→B→C yields chain `[A, B]` keyed by `C`)
//! - per taxon, a symbol → discontinued-ID index for gene_info records that
//!   never appear in `gene2accession`
//!
//! # File Format
//! 5 tab-delimited columns:
//! `tax_id  GeneID  Discontinued_GeneID  Discontinued_Symbol  Discontinue_Date`
//!
//! `GeneID` is `-` for IDs that were discontinued without a successor.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::BufRead;
use tracing::debug;

use super::models::GeneHistory;

/// Parsed `gene_history` data
#[derive(Debug, Default)]
pub struct GeneHistoryData {
    /// Current gene ID → chain of previous IDs
    chains: HashMap<String, GeneHistory>,
    /// Taxon → (discontinued symbol → discontinued gene ID)
    discontinued_by_symbol: HashMap<i32, HashMap<String, String>>,
}

impl GeneHistoryData {
    /// History chain for a current gene ID, if any of its predecessors were
    /// recorded
    pub fn history_for(&self, gene_id: &str) -> Option<&GeneHistory> {
        self.chains.get(gene_id)
    }

    /// Discontinued gene ID previously carrying this symbol in this taxon
    pub fn discontinued_id_for(&self, taxon_id: i32, symbol: &str) -> Option<&String> {
        self.discontinued_by_symbol
            .get(&taxon_id)
            .and_then(|by_symbol| by_symbol.get(symbol))
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }
}

/// Parser for the `gene_history` file
pub struct GeneHistoryParser;

impl GeneHistoryParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse the whole file
    pub fn parse<R: BufRead>(&self, reader: R) -> Result<GeneHistoryData> {
        let mut data = GeneHistoryData::default();
        let mut line_num = 0;

        for line in reader.lines() {
            line_num += 1;
            let line =
                line.with_context(|| format!("Failed to read gene_history line {}", line_num))?;

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            self.parse_line(&line, line_num, &mut data)?;
        }

        debug!(chains = data.chain_count(), "Parsed gene_history");
        Ok(data)
    }

    /// Apply a single line to the indexes. Short lines (missing the trailing
    /// date) are tolerated; fewer than four fields is a format error.
    pub fn parse_line(&self, line: &str, line_num: usize, data: &mut GeneHistoryData) -> Result<()> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() < 4 {
            anyhow::bail!(
                "gene_history line {}: expected at least 4 fields, got {}",
                line_num,
                fields.len()
            );
        }

        let taxon_id: i32 = fields[0].parse().with_context(|| {
            format!("gene_history line {}: invalid tax_id: {}", line_num, fields[0])
        })?;

        let current_id = fields[1];
        let discontinued_id = fields[2];
        let discontinued_symbol = fields[3];

        // The symbol index is updated for every row, successor or not.
        if !discontinued_symbol.is_empty() && discontinued_symbol != "-" {
            data.discontinued_by_symbol
                .entry(taxon_id)
                .or_default()
                .insert(discontinued_symbol.to_string(), discontinued_id.to_string());
        }

        // Rows without a current ID are history-only.
        if current_id.is_empty() || current_id == "-" {
            return Ok(());
        }

        // A chain keyed by the old ID means that ID was itself a rename
        // target before: extend it and re-key to the new current ID.
        match data.chains.remove(discontinued_id) {
            Some(mut chain) => {
                chain.push(discontinued_id);
                data.chains.insert(current_id.to_string(), chain);
            },
            None => {
                data.chains
                    .insert(current_id.to_string(), GeneHistory::new(discontinued_id));
            },
        }

        Ok(())
    }
}

impl Default for GeneHistoryParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> GeneHistoryData {
        GeneHistoryParser::new().parse(content.as_bytes()).unwrap()
    }

    #[test]
    fn test_simple_rename() {
        let data = parse("9606\t200\t100\tOLD1\t20100101\n");

        let chain = data.history_for("200").unwrap();
        assert_eq!(chain.previous_ids, vec!["100"]);
        assert!(data.history_for("100").is_none());
    }

    #[test]
    fn test_rename_chain_rekeyed() {
        // 100 -> 200 in one file version, 200 -> 300 in a later one
        let data = parse("9606\t200\t100\tOLD1\t20100101\n9606\t300\t200\tOLD2\t20150101\n");

        let chain = data.history_for("300").unwrap();
        assert_eq!(chain.previous_ids, vec!["100", "200"]);
        assert!(data.history_for("200").is_none());
    }

    #[test]
    fn test_history_only_row() {
        let data = parse("9606\t-\t100\tDEADGENE\t20100101\n");

        assert_eq!(data.chain_count(), 0);
        assert_eq!(
            data.discontinued_id_for(9606, "DEADGENE"),
            Some(&"100".to_string())
        );
    }

    #[test]
    fn test_symbol_index_updated_unconditionally() {
        let data = parse("9606\t200\t100\tOLD1\t20100101\n");

        // Row had a successor, symbol index still gets the entry
        assert_eq!(data.discontinued_id_for(9606, "OLD1"), Some(&"100".to_string()));
        assert_eq!(data.discontinued_id_for(10090, "OLD1"), None);
    }

    #[test]
    fn test_short_line_without_date_tolerated() {
        let data = parse("9606\t200\t100\tOLD1\n");
        assert!(data.history_for("200").is_some());
    }

    #[test]
    fn test_too_few_fields_is_fatal() {
        let result = GeneHistoryParser::new().parse("9606\t200\t100\n".as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_taxon_is_fatal() {
        let result = GeneHistoryParser::new().parse("not-a-taxon\t200\t100\tOLD1\tx\n".as_bytes());
        assert!(result.is_err());
    }
}
