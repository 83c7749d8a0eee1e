//! Persistence collaborator for the gene ingestion pipeline
//!
//! The pipeline treats persistence as an external collaborator behind the
//! [`GeneStore`] trait: an idempotent upsert keyed by taxon + NCBI gene ID,
//! plus the taxon usability flag update. [`PgGeneStore`] is the Postgres
//! implementation; tests substitute an in-memory store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::Gene;

/// Statistics from a batched persist
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    /// Total genes attempted
    pub total: usize,
    /// New genes created
    pub stored: usize,
    /// Existing genes updated
    pub updated: usize,
}

/// Persistence contract consumed by the loader stage.
///
/// The business key is (taxon, NCBI gene ID); the exact surrogate-key
/// semantics are owned by the implementation, not the pipeline.
#[async_trait]
pub trait GeneStore: Send + Sync {
    /// Idempotently upsert one gene and its product graph; returns the
    /// persistent form of the gene.
    async fn find_or_create(&self, gene: &Gene) -> Result<Gene>;

    /// Whether the gene has not been persisted yet
    async fn is_transient(&self, gene: &Gene) -> Result<bool>;

    /// Batched upsert
    async fn persist(&self, genes: &[Gene]) -> Result<StorageStats>;

    /// Flag taxa as having usable gene data. Calling this with zero taxa is
    /// a caller error, not a no-op.
    async fn mark_taxa_usable(&self, taxon_ids: &[i32]) -> Result<usize>;
}

/// Postgres-backed gene store
pub struct PgGeneStore {
    db: PgPool,
}

impl PgGeneStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Upsert one gene inside a transaction.
    ///
    /// Returns true when the gene was newly created.
    async fn upsert_gene(&self, gene: &Gene) -> Result<bool> {
        let mut tx = self.db.begin().await.context("Failed to begin transaction")?;

        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM genes WHERE taxon_id = $1 AND ncbi_gene_id = $2",
        )
        .bind(gene.taxon_id)
        .bind(&gene.ncbi_gene_id)
        .fetch_optional(&mut *tx)
        .await?;

        let is_new = existing.is_none();

        let gene_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO genes (
                id, taxon_id, ncbi_gene_id, official_symbol, official_name,
                description, previous_ncbi_gene_id, ensembl_id, chromosome, strand
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (taxon_id, ncbi_gene_id) DO UPDATE SET
                official_symbol = EXCLUDED.official_symbol,
                official_name = EXCLUDED.official_name,
                description = EXCLUDED.description,
                previous_ncbi_gene_id = EXCLUDED.previous_ncbi_gene_id,
                ensembl_id = EXCLUDED.ensembl_id,
                chromosome = EXCLUDED.chromosome,
                strand = EXCLUDED.strand,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(gene.taxon_id)
        .bind(&gene.ncbi_gene_id)
        .bind(&gene.official_symbol)
        .bind(&gene.official_name)
        .bind(&gene.description)
        .bind(&gene.previous_ncbi_gene_id)
        .bind(&gene.ensembl_id)
        .bind(gene.location.as_ref().map(|l| l.chromosome.as_str()))
        .bind(gene.location.as_ref().map(|l| l.strand.as_str()))
        .fetch_one(&mut *tx)
        .await
        .context("Failed to upsert gene")?;

        // Aliases, cross-references and products are replaced wholesale so
        // entries dropped upstream disappear here too.
        sqlx::query("DELETE FROM gene_aliases WHERE gene_id = $1")
            .bind(gene_id)
            .execute(&mut *tx)
            .await?;
        for alias in &gene.aliases {
            sqlx::query("INSERT INTO gene_aliases (gene_id, alias) VALUES ($1, $2)")
                .bind(gene_id)
                .bind(alias)
                .execute(&mut *tx)
                .await
                .context("Failed to insert gene alias")?;
        }

        sqlx::query("DELETE FROM gene_xrefs WHERE gene_id = $1")
            .bind(gene_id)
            .execute(&mut *tx)
            .await?;
        for xref in &gene.accessions {
            sqlx::query(
                "INSERT INTO gene_xrefs (gene_id, database_name, accession) VALUES ($1, $2, $3)",
            )
            .bind(gene_id)
            .bind(&xref.database)
            .bind(&xref.accession)
            .execute(&mut *tx)
            .await
            .context("Failed to insert gene cross-reference")?;
        }

        sqlx::query("DELETE FROM transcript_products WHERE gene_id = $1")
            .bind(gene_id)
            .execute(&mut *tx)
            .await?;
        for product in &gene.products {
            sqlx::query(
                r#"
                INSERT INTO transcript_products (
                    id, gene_id, accession, accession_version, external_database,
                    genomic_accession, strand, nucleotide, nucleotide_length, bin
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(gene_id)
            .bind(&product.accession)
            .bind(&product.accession_version)
            .bind(&product.external_database)
            .bind(product.location.as_ref().map(|l| l.chromosome.as_str()))
            .bind(product.location.as_ref().map(|l| l.strand.as_str()))
            .bind(product.location.as_ref().and_then(|l| l.nucleotide))
            .bind(product.location.as_ref().and_then(|l| l.nucleotide_length))
            .bind(product.location.as_ref().and_then(|l| l.bin))
            .execute(&mut *tx)
            .await
            .context("Failed to insert transcript product")?;
        }

        tx.commit().await.context("Failed to commit transaction")?;

        debug!(
            ncbi_gene_id = %gene.ncbi_gene_id,
            products = gene.products.len(),
            is_new = is_new,
            "Upserted gene"
        );
        Ok(is_new)
    }
}

#[async_trait]
impl GeneStore for PgGeneStore {
    async fn find_or_create(&self, gene: &Gene) -> Result<Gene> {
        self.upsert_gene(gene).await?;
        Ok(gene.clone())
    }

    async fn is_transient(&self, gene: &Gene) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM genes WHERE taxon_id = $1 AND ncbi_gene_id = $2)",
        )
        .bind(gene.taxon_id)
        .bind(&gene.ncbi_gene_id)
        .fetch_one(&self.db)
        .await?;

        Ok(!exists)
    }

    async fn persist(&self, genes: &[Gene]) -> Result<StorageStats> {
        let mut stats = StorageStats {
            total: genes.len(),
            ..Default::default()
        };

        for gene in genes {
            if self.upsert_gene(gene).await? {
                stats.stored += 1;
            } else {
                stats.updated += 1;
            }
        }

        info!(
            total = stats.total,
            stored = stats.stored,
            updated = stats.updated,
            "Persisted gene batch"
        );
        Ok(stats)
    }

    async fn mark_taxa_usable(&self, taxon_ids: &[i32]) -> Result<usize> {
        anyhow::ensure!(
            !taxon_ids.is_empty(),
            "mark_taxa_usable called with zero taxa"
        );

        let result = sqlx::query(
            "UPDATE taxa SET genes_usable = TRUE, updated_at = NOW() WHERE ncbi_id = ANY($1)",
        )
        .bind(taxon_ids)
        .execute(&self.db)
        .await
        .context("Failed to update taxon usability flags")?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store used by pipeline unit tests
    #[derive(Default)]
    pub(crate) struct MockGeneStore {
        pub genes: Mutex<Vec<Gene>>,
        pub usable: Mutex<Vec<i32>>,
        fail_persist: bool,
    }

    impl MockGeneStore {
        pub fn failing() -> Self {
            Self {
                fail_persist: true,
                ..Default::default()
            }
        }

        pub fn persisted_gene_ids(&self) -> Vec<String> {
            let mut ids: Vec<String> = self
                .genes
                .lock()
                .unwrap()
                .iter()
                .map(|g| g.ncbi_gene_id.clone())
                .collect();
            ids.sort();
            ids
        }

        pub fn usable_taxa(&self) -> Vec<i32> {
            let mut taxa = self.usable.lock().unwrap().clone();
            taxa.sort_unstable();
            taxa
        }
    }

    #[async_trait]
    impl GeneStore for MockGeneStore {
        async fn find_or_create(&self, gene: &Gene) -> Result<Gene> {
            anyhow::ensure!(!self.fail_persist, "injected persistence failure");
            let mut genes = self.genes.lock().unwrap();
            if let Some(existing) = genes
                .iter_mut()
                .find(|g| g.taxon_id == gene.taxon_id && g.ncbi_gene_id == gene.ncbi_gene_id)
            {
                *existing = gene.clone();
            } else {
                genes.push(gene.clone());
            }
            Ok(gene.clone())
        }

        async fn is_transient(&self, gene: &Gene) -> Result<bool> {
            let genes = self.genes.lock().unwrap();
            Ok(!genes
                .iter()
                .any(|g| g.taxon_id == gene.taxon_id && g.ncbi_gene_id == gene.ncbi_gene_id))
        }

        async fn persist(&self, genes: &[Gene]) -> Result<StorageStats> {
            let mut stats = StorageStats {
                total: genes.len(),
                ..Default::default()
            };
            for gene in genes {
                if self.is_transient(gene).await? {
                    stats.stored += 1;
                } else {
                    stats.updated += 1;
                }
                self.find_or_create(gene).await?;
            }
            Ok(stats)
        }

        async fn mark_taxa_usable(&self, taxon_ids: &[i32]) -> Result<usize> {
            anyhow::ensure!(
                !taxon_ids.is_empty(),
                "mark_taxa_usable called with zero taxa"
            );
            let mut usable = self.usable.lock().unwrap();
            usable.extend_from_slice(taxon_ids);
            Ok(taxon_ids.len())
        }
    }

    #[tokio::test]
    async fn test_mock_store_upsert_is_idempotent() {
        use crate::ingest::ncbi_gene::convert::GeneConverter;
        use crate::ingest::ncbi_gene::models::tests::{sample_accession, sample_info};
        use crate::ingest::ncbi_gene::models::GeneBatch;

        let store = MockGeneStore::default();
        let mut batch = GeneBatch::new(sample_info("1"));
        batch.push(sample_accession("1"));
        let gene = GeneConverter::default().convert(batch).unwrap();

        assert!(store.is_transient(&gene).await.unwrap());
        store.find_or_create(&gene).await.unwrap();
        assert!(!store.is_transient(&gene).await.unwrap());
        store.find_or_create(&gene).await.unwrap();
        assert_eq!(store.genes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_taxa_usable_rejects_empty() {
        let store = MockGeneStore::default();
        assert!(store.mark_taxa_usable(&[]).await.is_err());
        assert!(store.mark_taxa_usable(&[9606]).await.is_ok());
    }
}
