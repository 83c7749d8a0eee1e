//! GoldenPath data models
//!
//! Value types for the location reconciliation engine: transcript candidates
//! read from the external alignment database, the associations the engine
//! computes, and the search configuration. Alignment block lists use the
//! UCSC comma-encoded integer-array format (`"100,200,300,"`).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use gdw_common::types::Strand;

/// Method for computing the distance from an alignment to a gene's 3′ end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreePrimeMethod {
    /// Distance from the alignment's center to the 3′ boundary, floored at 0
    Middle,
    /// Distance from the alignment's outer edge to the 3′ boundary
    Right,
}

impl std::str::FromStr for ThreePrimeMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "middle" => Ok(ThreePrimeMethod::Middle),
            "right" => Ok(ThreePrimeMethod::Right),
            "left" => bail!("the 'left' 3' distance method is not supported"),
            other => bail!("unknown 3' distance method: {}", other),
        }
    }
}

/// Alignment track a transcript candidate was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    RefSeq,
    KnownGene,
    Mrna,
    Est,
}

/// A transcript (or blocked mRNA/EST alignment) read from the external
/// alignment database. Never created or mutated by this engine, only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptAlignment {
    /// Transcript or alignment accession (e.g., "NM_130786", "BC032834")
    pub name: String,
    /// Gene symbol, where the track provides one
    pub gene_symbol: Option<String>,
    pub chromosome: String,
    pub strand: Strand,
    /// Transcript start on the chromosome
    pub tx_start: i64,
    /// Transcript end on the chromosome
    pub tx_end: i64,
    /// Exon (or alignment block) starts
    pub exon_starts: Vec<i64>,
    /// Exon (or alignment block) ends
    pub exon_ends: Vec<i64>,
    pub track: Track,
}

impl TranscriptAlignment {
    /// Gap in bases between this transcript and `[start, end)`; zero when
    /// the intervals overlap.
    pub fn gap_to(&self, start: i64, end: i64) -> i64 {
        if self.tx_end <= start {
            start - self.tx_end
        } else if self.tx_start >= end {
            self.tx_start - end
        } else {
            0
        }
    }

    /// The 3′ boundary of the transcript, strand-aware. An unknown strand is
    /// treated as positive.
    pub fn three_prime_boundary(&self) -> i64 {
        match self.strand {
            Strand::Negative => self.tx_start,
            _ => self.tx_end,
        }
    }
}

/// The result of reconciling one alignment against one candidate transcript.
/// Created fresh per query; not persisted by this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneLocationAssociation {
    pub transcript: TranscriptAlignment,
    /// Bases of the query's block structure falling inside annotated exons
    pub overlap_bases: i64,
    /// Overlap relative to the total aligned bases of the query
    pub overlap_fraction: f64,
    /// Distance to the transcript's 3′ boundary, per `method`
    pub three_prime_distance: i64,
    pub method: ThreePrimeMethod,
}

/// Configuration for association searches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Query the RefSeq track
    pub use_refseq: bool,
    /// Query the UCSC Known Gene track
    pub use_known_gene: bool,
    /// Escalate weak exon overlap to mRNA alignments
    pub use_mrnas: bool,
    /// Escalate still-weak exon overlap to EST alignments
    pub use_ests: bool,
    /// Associations with exactly zero exon overlap are discarded when this
    /// is positive
    pub minimum_overlap_fraction: f64,
    /// Full width of the nearest-gene search window
    pub max_window: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            use_refseq: true,
            use_known_gene: true,
            use_mrnas: false,
            use_ests: false,
            minimum_overlap_fraction: 0.0,
            max_window: 100_000,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mrnas(mut self) -> Self {
        self.use_mrnas = true;
        self
    }

    pub fn with_ests(mut self) -> Self {
        self.use_ests = true;
        self
    }

    pub fn with_minimum_overlap_fraction(mut self, fraction: f64) -> Self {
        self.minimum_overlap_fraction = fraction;
        self
    }

    pub fn with_max_window(mut self, window: i64) -> Self {
        self.max_window = window;
        self
    }
}

/// Parse a UCSC comma-encoded integer list (`"100,200,300,"`).
///
/// A trailing comma is standard in the dumps and tolerated.
pub fn parse_comma_list(value: &str) -> Result<Vec<i64>> {
    value
        .split(',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .trim()
                .parse::<i64>()
                .with_context(|| format!("invalid integer in comma list: '{}'", token))
        })
        .collect()
}

/// Format integers back into the comma-encoded form, trailing comma included.
pub fn format_comma_list(values: &[i64]) -> String {
    let mut out = String::new();
    for value in values {
        out.push_str(&value.to_string());
        out.push(',');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_prime_method_from_str() {
        assert_eq!("middle".parse::<ThreePrimeMethod>().unwrap(), ThreePrimeMethod::Middle);
        assert_eq!("RIGHT".parse::<ThreePrimeMethod>().unwrap(), ThreePrimeMethod::Right);
        assert!("left".parse::<ThreePrimeMethod>().is_err());
        assert!("sideways".parse::<ThreePrimeMethod>().is_err());
    }

    #[test]
    fn test_parse_comma_list() {
        assert_eq!(parse_comma_list("100,200,300,").unwrap(), vec![100, 200, 300]);
        assert_eq!(parse_comma_list("100").unwrap(), vec![100]);
        assert!(parse_comma_list("").unwrap().is_empty());
        assert!(parse_comma_list("100,abc,").is_err());
    }

    #[test]
    fn test_format_comma_list_round_trip() {
        let values = vec![100, 200, 300];
        let encoded = format_comma_list(&values);
        assert_eq!(encoded, "100,200,300,");
        assert_eq!(parse_comma_list(&encoded).unwrap(), values);
    }

    fn transcript(tx_start: i64, tx_end: i64, strand: Strand) -> TranscriptAlignment {
        TranscriptAlignment {
            name: "NM_000001".to_string(),
            gene_symbol: Some("TEST1".to_string()),
            chromosome: "chr1".to_string(),
            strand,
            tx_start,
            tx_end,
            exon_starts: vec![tx_start],
            exon_ends: vec![tx_end],
            track: Track::RefSeq,
        }
    }

    #[test]
    fn test_gap_to() {
        let t = transcript(1000, 2000, Strand::Positive);
        assert_eq!(t.gap_to(2500, 3000), 500);
        assert_eq!(t.gap_to(0, 500), 500);
        assert_eq!(t.gap_to(1500, 1600), 0);
        assert_eq!(t.gap_to(500, 1500), 0);
    }

    #[test]
    fn test_three_prime_boundary_strand_aware() {
        assert_eq!(transcript(1000, 2000, Strand::Positive).three_prime_boundary(), 2000);
        assert_eq!(transcript(1000, 2000, Strand::Negative).three_prime_boundary(), 1000);
        assert_eq!(transcript(1000, 2000, Strand::Unknown).three_prime_boundary(), 2000);
    }

    #[test]
    fn test_search_config_defaults() {
        let config = SearchConfig::default();
        assert!(config.use_refseq);
        assert!(config.use_known_gene);
        assert!(!config.use_mrnas);
        assert!(!config.use_ests);
        assert_eq!(config.minimum_overlap_fraction, 0.0);
    }
}
