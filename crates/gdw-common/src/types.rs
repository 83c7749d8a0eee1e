//! Common domain types shared across GDW crates

use serde::{Deserialize, Serialize};

/// Strand orientation for genomic features.
///
/// NCBI and GoldenPath files encode orientation as `+`, `-` or `?`; anything
/// unrecognized maps to `Unknown` rather than failing the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Strand {
    Positive,
    Negative,
    #[default]
    Unknown,
}

impl Strand {
    /// Parse strand from a file token ('+', '-', anything else is unknown).
    pub fn from_token(s: &str) -> Self {
        match s {
            "+" => Strand::Positive,
            "-" => Strand::Negative,
            _ => Strand::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Positive => "+",
            Strand::Negative => "-",
            Strand::Unknown => "?",
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A supported taxon supplied by the caller as the ingestion filter.
///
/// `ncbi_id` is the primary NCBI taxonomy ID; `secondary_ncbi_id` covers
/// reclassified organisms that appear in the feeds under an older ID.
/// A taxon without any NCBI ID cannot be filtered on (the pipeline logs a
/// warning and keeps all of its genes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    /// Scientific name (e.g., "Homo sapiens")
    pub scientific_name: String,
    /// Primary NCBI taxonomy ID (e.g., 9606)
    pub ncbi_id: Option<i32>,
    /// Secondary NCBI taxonomy ID for reclassified organisms
    pub secondary_ncbi_id: Option<i32>,
}

impl Taxon {
    pub fn new(scientific_name: impl Into<String>, ncbi_id: Option<i32>) -> Self {
        Self {
            scientific_name: scientific_name.into(),
            ncbi_id,
            secondary_ncbi_id: None,
        }
    }

    /// Set the secondary NCBI ID
    pub fn with_secondary_ncbi_id(mut self, id: i32) -> Self {
        self.secondary_ncbi_id = Some(id);
        self
    }

    /// All NCBI IDs this taxon answers to
    pub fn ncbi_ids(&self) -> Vec<i32> {
        self.ncbi_id
            .into_iter()
            .chain(self.secondary_ncbi_id)
            .collect()
    }
}

/// A physical location on a genome assembly.
///
/// Gene-level locations carry chromosome and strand only; transcript-product
/// locations additionally carry a nucleotide start, a length and the UCSC
/// spatial-index bin of the covered interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalLocation {
    /// Chromosome label (e.g., "19", "X", "MT")
    pub chromosome: String,
    pub strand: Strand,
    /// Start position on the chromosome, when known
    pub nucleotide: Option<i64>,
    /// Covered length in bases, when known
    pub nucleotide_length: Option<i64>,
    /// UCSC bin of `[nucleotide, nucleotide + nucleotide_length)`, when known
    pub bin: Option<i32>,
}

impl PhysicalLocation {
    /// Chromosome + strand only (gene-level location)
    pub fn chromosome_only(chromosome: impl Into<String>, strand: Strand) -> Self {
        Self {
            chromosome: chromosome.into(),
            strand,
            nucleotide: None,
            nucleotide_length: None,
            bin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_from_token() {
        assert_eq!(Strand::from_token("+"), Strand::Positive);
        assert_eq!(Strand::from_token("-"), Strand::Negative);
        assert_eq!(Strand::from_token("?"), Strand::Unknown);
        assert_eq!(Strand::from_token(""), Strand::Unknown);
    }

    #[test]
    fn test_taxon_ncbi_ids() {
        let taxon = Taxon::new("Homo sapiens", Some(9606));
        assert_eq!(taxon.ncbi_ids(), vec![9606]);

        let taxon = Taxon::new("Rattus norvegicus", Some(10116)).with_secondary_ncbi_id(10118);
        assert_eq!(taxon.ncbi_ids(), vec![10116, 10118]);

        let taxon = Taxon::new("Unplaced", None);
        assert!(taxon.ncbi_ids().is_empty());
    }

    #[test]
    fn test_chromosome_only_location() {
        let loc = PhysicalLocation::chromosome_only("19", Strand::Positive);
        assert_eq!(loc.chromosome, "19");
        assert!(loc.nucleotide.is_none());
        assert!(loc.bin.is_none());
    }
}
