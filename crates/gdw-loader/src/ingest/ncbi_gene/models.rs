//! NCBI Gene data models
//!
//! Record types for the four NCBI Gene bulk-download files (`gene_info`,
//! `gene2accession`, `gene_history`, `gene2ensembl`) and the persistence-ready
//! gene/transcript graph the converter assembles from them.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use gdw_common::types::{PhysicalLocation, Strand};

/// Nomenclature status of a gene symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NomenclatureStatus {
    /// Symbol assigned by the nomenclature authority ("O")
    Official,
    /// Provisional symbol
    Interim,
    /// No status recorded ("-")
    #[default]
    Unknown,
}

impl NomenclatureStatus {
    /// Map the `Nomenclature_status` column value.
    ///
    /// `-` means no status; the authority marker `O` means official;
    /// everything else is treated as interim.
    pub fn from_token(s: &str) -> Self {
        match s {
            "-" | "" => NomenclatureStatus::Unknown,
            "O" => NomenclatureStatus::Official,
            _ => NomenclatureStatus::Interim,
        }
    }
}

/// Gene type from the `type_of_gene` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GeneType {
    ProteinCoding,
    Pseudo,
    RRna,
    TRna,
    NcRna,
    ScRna,
    SnRna,
    SnoRna,
    MiscRna,
    BiologicalRegion,
    Other,
    #[default]
    Unknown,
}

impl GeneType {
    /// Map the `type_of_gene` column value. NCBI grows this vocabulary over
    /// time, so unrecognized values map to `Unknown` instead of failing.
    pub fn from_token(s: &str) -> Self {
        match s {
            "protein-coding" => GeneType::ProteinCoding,
            "pseudo" => GeneType::Pseudo,
            "rRNA" => GeneType::RRna,
            "tRNA" => GeneType::TRna,
            "ncRNA" => GeneType::NcRna,
            "scRNA" => GeneType::ScRna,
            "snRNA" => GeneType::SnRna,
            "snoRNA" => GeneType::SnoRna,
            "miscRNA" => GeneType::MiscRna,
            "biological-region" => GeneType::BiologicalRegion,
            "other" => GeneType::Other,
            _ => GeneType::Unknown,
        }
    }
}

/// External cross-reference from the pipe-delimited `dbXrefs` column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneXref {
    /// External database name (e.g., "HGNC", "MIM", "Ensembl")
    pub database: String,
    /// Accession within that database (e.g., "HGNC:5")
    pub accession: String,
}

impl GeneXref {
    pub fn new(database: impl Into<String>, accession: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            accession: accession.into(),
        }
    }
}

/// The chain of previous NCBI gene IDs that were merged into a current ID
/// over successive `gene_history` file versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneHistory {
    /// Discontinued IDs, oldest first
    pub previous_ids: Vec<String>,
}

impl GeneHistory {
    pub fn new(discontinued_id: impl Into<String>) -> Self {
        Self {
            previous_ids: vec![discontinued_id.into()],
        }
    }

    /// Record one more discontinued ID at the end of the chain
    pub fn push(&mut self, discontinued_id: impl Into<String>) {
        self.previous_ids.push(discontinued_id.into());
    }

    pub fn is_empty(&self) -> bool {
        self.previous_ids.is_empty()
    }

    /// Comma-joined representation used on the persisted gene
    pub fn joined(&self) -> String {
        self.previous_ids.join(",")
    }
}

/// One row of the `gene_info` file: the external identity of a gene.
///
/// Created by the gene-info parser, then enriched by the generator with
/// history, discontinued-ID and Ensembl data before any downstream stage
/// sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneInfoRecord {
    /// NCBI taxonomy ID
    pub taxon_id: i32,
    /// NCBI gene ID (numeric in practice, kept as a string identity)
    pub gene_id: String,
    /// Default symbol
    pub symbol: String,
    pub locus_tag: Option<String>,
    /// Pipe-delimited synonyms, split
    pub synonyms: Vec<String>,
    /// External cross-references
    pub xrefs: Vec<GeneXref>,
    /// Chromosome label (e.g., "19", "X")
    pub chromosome: Option<String>,
    pub map_location: Option<String>,
    pub description: Option<String>,
    pub gene_type: GeneType,
    /// Symbol assigned by the nomenclature authority, if any
    pub authority_symbol: Option<String>,
    /// Full name assigned by the nomenclature authority, if any
    pub authority_full_name: Option<String>,
    pub nomenclature_status: NomenclatureStatus,
    /// Discontinued gene ID looked up by symbol, attached by the generator
    pub discontinued_id: Option<String>,
    /// History chain for this gene ID, attached by the generator
    pub history: Option<GeneHistory>,
    /// Ensembl gene ID, attached by the generator
    pub ensembl_id: Option<String>,
}

/// One row of the `gene2accession` file: a transcript/protein accession
/// belonging to a gene. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessionRecord {
    pub gene_id: String,
    pub taxon_id: i32,
    pub status: Option<String>,
    pub rna_accession: Option<String>,
    pub rna_version: Option<String>,
    pub protein_accession: Option<String>,
    pub protein_version: Option<String>,
    pub genomic_accession: Option<String>,
    pub genomic_version: Option<String>,
    /// Start position on the genomic accession
    pub genomic_start: Option<i64>,
    /// End position on the genomic accession
    pub genomic_end: Option<i64>,
    pub orientation: Strand,
}

/// Split an `accession.version` token into base and optional version.
///
/// `-` (or blank) yields `None`. Exactly one `.` separates accession and
/// version; the data is assumed never to contain a second dot, so three or
/// more tokens is a hard failure rather than a guess.
pub fn split_versioned(token: &str) -> Result<Option<(String, Option<String>)>> {
    if token.is_empty() || token == "-" {
        return Ok(None);
    }
    let parts: Vec<&str> = token.split('.').collect();
    match parts.len() {
        1 => Ok(Some((parts[0].to_string(), None))),
        2 => Ok(Some((parts[0].to_string(), Some(parts[1].to_string())))),
        n => bail!(
            "Unsupported accession format '{}': expected at most one '.', found {} segments",
            token,
            n
        ),
    }
}

/// A gene's accumulated accessions: one `GeneInfoRecord` plus the ordered
/// `gene2accession` rows sharing its gene ID.
///
/// Sealed and emitted when the accession stream moves on to the next gene
/// ID (or at end of stream); genes with zero accession rows are emitted as
/// empty batches so every retained gene is represented exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneBatch {
    pub info: GeneInfoRecord,
    pub accessions: Vec<AccessionRecord>,
}

impl GeneBatch {
    pub fn new(info: GeneInfoRecord) -> Self {
        Self {
            info,
            accessions: Vec::new(),
        }
    }

    pub fn push(&mut self, accession: AccessionRecord) {
        self.accessions.push(accession);
    }

    pub fn gene_id(&self) -> &str {
        &self.info.gene_id
    }

    pub fn is_empty(&self) -> bool {
        self.accessions.is_empty()
    }
}

/// A persistence-ready gene assembled by the converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    pub ncbi_gene_id: String,
    pub taxon_id: i32,
    pub official_symbol: String,
    pub official_name: Option<String>,
    pub description: Option<String>,
    /// Comma-joined previous gene IDs from the history chain, or the plain
    /// discontinued ID when no chain exists (never both sources)
    pub previous_ncbi_gene_id: Option<String>,
    pub ensembl_id: Option<String>,
    /// Chromosome + strand only; coordinates live on the products
    pub location: Option<PhysicalLocation>,
    pub aliases: Vec<String>,
    pub accessions: Vec<GeneXref>,
    pub products: Vec<TranscriptProduct>,
}

/// A transcript product of a gene, carrying its own physical location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptProduct {
    /// NCBI gene ID of the owning gene
    pub gene_ncbi_id: String,
    /// Source RNA accession (e.g., "NM_130786")
    pub accession: String,
    pub accession_version: Option<String>,
    /// External database the accession belongs to (GenBank or Ensembl)
    pub external_database: String,
    /// Location derived from the genomic accession's coordinates
    pub location: Option<PhysicalLocation>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn test_nomenclature_status_from_token() {
        assert_eq!(NomenclatureStatus::from_token("-"), NomenclatureStatus::Unknown);
        assert_eq!(NomenclatureStatus::from_token(""), NomenclatureStatus::Unknown);
        assert_eq!(NomenclatureStatus::from_token("O"), NomenclatureStatus::Official);
        assert_eq!(NomenclatureStatus::from_token("I"), NomenclatureStatus::Interim);
    }

    #[test]
    fn test_gene_type_from_token() {
        assert_eq!(GeneType::from_token("protein-coding"), GeneType::ProteinCoding);
        assert_eq!(GeneType::from_token("snoRNA"), GeneType::SnoRna);
        assert_eq!(GeneType::from_token("something-new"), GeneType::Unknown);
    }

    #[test]
    fn test_split_versioned_with_version() {
        let result = split_versioned("NM_130786.4").unwrap();
        assert_eq!(result, Some(("NM_130786".to_string(), Some("4".to_string()))));
    }

    #[test]
    fn test_split_versioned_without_version() {
        let result = split_versioned("NM_130786").unwrap();
        assert_eq!(result, Some(("NM_130786".to_string(), None)));
    }

    #[test]
    fn test_split_versioned_absent() {
        assert_eq!(split_versioned("-").unwrap(), None);
        assert_eq!(split_versioned("").unwrap(), None);
    }

    #[test]
    fn test_split_versioned_two_dots_fails() {
        assert!(split_versioned("NM_130786.4.1").is_err());
        assert!(split_versioned("a.b.c.d").is_err());
    }

    #[test]
    fn test_gene_history_chain() {
        let mut history = GeneHistory::new("100");
        history.push("200");
        assert_eq!(history.joined(), "100,200");
        assert!(!history.is_empty());
    }

    #[test]
    fn test_gene_batch_accumulates() {
        let info = sample_info("1");
        let mut batch = GeneBatch::new(info);
        assert!(batch.is_empty());
        assert_eq!(batch.gene_id(), "1");

        batch.push(sample_accession("1"));
        batch.push(sample_accession("1"));
        assert_eq!(batch.accessions.len(), 2);
    }

    pub(crate) fn sample_info(gene_id: &str) -> GeneInfoRecord {
        GeneInfoRecord {
            taxon_id: 9606,
            gene_id: gene_id.to_string(),
            symbol: "A1BG".to_string(),
            locus_tag: None,
            synonyms: vec!["A1B".to_string()],
            xrefs: vec![GeneXref::new("MIM", "138670")],
            chromosome: Some("19".to_string()),
            map_location: Some("19q13.43".to_string()),
            description: Some("alpha-1-B glycoprotein".to_string()),
            gene_type: GeneType::ProteinCoding,
            authority_symbol: Some("A1BG".to_string()),
            authority_full_name: Some("alpha-1-B glycoprotein".to_string()),
            nomenclature_status: NomenclatureStatus::Official,
            discontinued_id: None,
            history: None,
            ensembl_id: None,
        }
    }

    pub(crate) fn sample_accession(gene_id: &str) -> AccessionRecord {
        AccessionRecord {
            gene_id: gene_id.to_string(),
            taxon_id: 9606,
            status: Some("REVIEWED".to_string()),
            rna_accession: Some("NM_130786".to_string()),
            rna_version: Some("4".to_string()),
            protein_accession: Some("NP_570602".to_string()),
            protein_version: Some("2".to_string()),
            genomic_accession: Some("NC_000019".to_string()),
            genomic_version: Some("10".to_string()),
            genomic_start: Some(58345178),
            genomic_end: Some(58353492),
            orientation: Strand::Negative,
        }
    }
}
