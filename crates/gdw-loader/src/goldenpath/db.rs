//! Access to the external GoldenPath alignment database
//!
//! The schema (`refFlat`, `knownGene`, `kgXref`, `all_mrna`, `all_est`) is a
//! fixed external contract owned by the genome-browser distribution, not by
//! this crate; queries select columns positionally from it. All range
//! queries prune with the UCSC `bin` column and apply the four-way interval
//! overlap test (contains, contained-by, overlaps-left, overlaps-right).

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use gdw_common::types::Strand;

use super::bin::overlapping_bins;
use super::models::{parse_comma_list, Track, TranscriptAlignment};

/// Read-only source of transcript and alignment candidates.
///
/// One method per track so a missing track on a given genome assembly can
/// be degraded independently by the caller.
#[async_trait]
pub trait AlignmentStore: Send + Sync {
    /// RefSeq transcripts overlapping `[start, end)`
    async fn refseq_transcripts(
        &self,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
    ) -> Result<Vec<TranscriptAlignment>>;

    /// UCSC Known Gene transcripts overlapping `[start, end)`
    async fn known_gene_transcripts(
        &self,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
    ) -> Result<Vec<TranscriptAlignment>>;

    /// mRNA alignments overlapping `[start, end)`
    async fn mrna_alignments(
        &self,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
    ) -> Result<Vec<TranscriptAlignment>>;

    /// EST alignments overlapping `[start, end)`
    async fn est_alignments(
        &self,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
    ) -> Result<Vec<TranscriptAlignment>>;
}

/// Postgres-backed GoldenPath store
pub struct PgAlignmentStore {
    db: PgPool,
}

impl PgAlignmentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Shared overlap clause: bin pruning plus the four-way interval test.
    /// `$5` carries the optional strand filter.
    const RANGE_CLAUSE: &'static str = r#"
        "chrom" = $1
        AND "bin" = ANY($2)
        AND (("txStart" >= $3 AND "txEnd" <= $4)
          OR ("txStart" <= $3 AND "txEnd" >= $4)
          OR ("txStart" <= $3 AND "txEnd" >= $3)
          OR ("txStart" <= $4 AND "txEnd" >= $4))
        AND ($5::text IS NULL OR "strand" = $5)
    "#;

    async fn fetch_gene_track(
        &self,
        sql: &str,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
        track: Track,
    ) -> Result<Vec<TranscriptAlignment>> {
        let bins = overlapping_bins(start, end.max(start + 1))?;
        let rows = sqlx::query(sql)
            .bind(chromosome)
            .bind(&bins)
            .bind(start)
            .bind(end)
            .bind(strand.map(|s| s.as_str().to_string()))
            .fetch_all(&self.db)
            .await
            .with_context(|| format!("GoldenPath {:?} query failed", track))?;

        rows.into_iter()
            .map(|row| gene_row_to_transcript(row, track, chromosome))
            .collect()
    }

    async fn fetch_psl_track(
        &self,
        table: &str,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
        track: Track,
    ) -> Result<Vec<TranscriptAlignment>> {
        let bins = overlapping_bins(start, end.max(start + 1))?;
        let sql = format!(
            r#"
            SELECT "qName", "strand", "tStart", "tEnd", "blockSizes", "tStarts"
            FROM "{}"
            WHERE "tName" = $1
              AND "bin" = ANY($2)
              AND (("tStart" >= $3 AND "tEnd" <= $4)
                OR ("tStart" <= $3 AND "tEnd" >= $4)
                OR ("tStart" <= $3 AND "tEnd" >= $3)
                OR ("tStart" <= $4 AND "tEnd" >= $4))
              AND ($5::text IS NULL OR "strand" = $5)
            "#,
            table
        );

        let rows = sqlx::query(&sql)
            .bind(chromosome)
            .bind(&bins)
            .bind(start)
            .bind(end)
            .bind(strand.map(|s| s.as_str().to_string()))
            .fetch_all(&self.db)
            .await
            .with_context(|| format!("GoldenPath {:?} query failed", track))?;

        rows.into_iter()
            .map(|row| psl_row_to_transcript(row, track, chromosome))
            .collect()
    }
}

#[async_trait]
impl AlignmentStore for PgAlignmentStore {
    async fn refseq_transcripts(
        &self,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
    ) -> Result<Vec<TranscriptAlignment>> {
        let sql = format!(
            r#"
            SELECT "geneName", "name", "strand", "txStart", "txEnd", "exonStarts", "exonEnds"
            FROM "refFlat"
            WHERE {}
            "#,
            Self::RANGE_CLAUSE
        );
        self.fetch_gene_track(&sql, chromosome, start, end, strand, Track::RefSeq)
            .await
    }

    async fn known_gene_transcripts(
        &self,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
    ) -> Result<Vec<TranscriptAlignment>> {
        // Known Gene carries no symbol of its own; kgXref supplies it.
        let sql = format!(
            r#"
            SELECT "kgXref"."geneSymbol", "knownGene"."name", "strand", "txStart", "txEnd",
                   "exonStarts", "exonEnds"
            FROM "knownGene"
            LEFT JOIN "kgXref" ON "kgXref"."kgID" = "knownGene"."name"
            WHERE {}
            "#,
            Self::RANGE_CLAUSE
        );
        self.fetch_gene_track(&sql, chromosome, start, end, strand, Track::KnownGene)
            .await
    }

    async fn mrna_alignments(
        &self,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
    ) -> Result<Vec<TranscriptAlignment>> {
        self.fetch_psl_track("all_mrna", chromosome, start, end, strand, Track::Mrna)
            .await
    }

    async fn est_alignments(
        &self,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
    ) -> Result<Vec<TranscriptAlignment>> {
        self.fetch_psl_track("all_est", chromosome, start, end, strand, Track::Est)
            .await
    }
}

/// Convert a refFlat/knownGene row (positional columns) into a candidate
fn gene_row_to_transcript(
    row: PgRow,
    track: Track,
    chromosome: &str,
) -> Result<TranscriptAlignment> {
    let gene_symbol: Option<String> = row.try_get(0)?;
    let name: String = row.try_get(1)?;
    let strand: String = row.try_get(2)?;
    let tx_start: i64 = row.try_get(3)?;
    let tx_end: i64 = row.try_get(4)?;
    let exon_starts: String = row.try_get(5)?;
    let exon_ends: String = row.try_get(6)?;

    Ok(TranscriptAlignment {
        name,
        gene_symbol,
        chromosome: chromosome.to_string(),
        strand: Strand::from_token(&strand),
        tx_start,
        tx_end,
        exon_starts: parse_comma_list(&exon_starts)?,
        exon_ends: parse_comma_list(&exon_ends)?,
        track,
    })
}

/// Convert a PSL-format row into a candidate; alignment blocks stand in for
/// exons.
fn psl_row_to_transcript(
    row: PgRow,
    track: Track,
    chromosome: &str,
) -> Result<TranscriptAlignment> {
    let name: String = row.try_get(0)?;
    let strand: String = row.try_get(1)?;
    let t_start: i64 = row.try_get(2)?;
    let t_end: i64 = row.try_get(3)?;
    let block_sizes: String = row.try_get(4)?;
    let t_starts: String = row.try_get(5)?;

    let sizes = parse_comma_list(&block_sizes)?;
    let starts = parse_comma_list(&t_starts)?;
    anyhow::ensure!(
        sizes.len() == starts.len(),
        "PSL row for '{}' has {} block sizes but {} block starts",
        name,
        sizes.len(),
        starts.len()
    );

    let ends = starts
        .iter()
        .zip(&sizes)
        .map(|(start, size)| start + size)
        .collect();

    Ok(TranscriptAlignment {
        name,
        gene_symbol: None,
        chromosome: chromosome.to_string(),
        strand: Strand::from_token(&strand),
        tx_start: t_start,
        tx_end: t_end,
        exon_starts: starts,
        exon_ends: ends,
        track,
    })
}
