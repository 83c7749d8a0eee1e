//! GoldenPath location reconciliation engine
//!
//! State-free query service over the external alignment database. Given an
//! alignment's block structure, [`find_associations`] scores every
//! overlapping RefSeq/Known Gene transcript by exon overlap and 3′ distance,
//! escalating weak overlaps through mRNA and EST evidence tiers;
//! [`find_closest_gene`] widens the search window stepwise when nothing
//! overlaps at all.
//!
//! Track queries degrade rather than fail: a genome assembly missing a
//! track (no EST table, say) yields an empty tier, not an aborted search.
//!
//! [`find_associations`]: GoldenPathEngine::find_associations
//! [`find_closest_gene`]: GoldenPathEngine::find_closest_gene

use anyhow::{ensure, Result};
use tracing::{debug, warn};

use gdw_common::types::Strand;

use super::cache::LruCache;
use super::db::AlignmentStore;
use super::models::{
    GeneLocationAssociation, SearchConfig, ThreePrimeMethod, Track, TranscriptAlignment,
};

/// Exon-overlap fraction below which the mRNA/EST recheck kicks in
const RECHECK_THRESHOLD: f64 = 0.9;

/// Maximum window-expansion rounds in the nearest-gene search
const NEAREST_GENE_ROUNDS: i64 = 5;

/// Entries held in the mRNA/EST window cache
const REGION_CACHE_CAPACITY: usize = 2000;

/// Cache key for one window query against one track
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegionKey {
    track: Track,
    chromosome: String,
    start: i64,
    end: i64,
    strand: Option<Strand>,
}

/// GoldenPath location reconciliation engine.
///
/// Holds a per-instance window cache; one instance serves one caller at a
/// time.
pub struct GoldenPathEngine<S: AlignmentStore> {
    store: S,
    region_cache: LruCache<RegionKey, Vec<TranscriptAlignment>>,
}

impl<S: AlignmentStore> GoldenPathEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            region_cache: LruCache::new(REGION_CACHE_CAPACITY),
        }
    }

    /// The underlying alignment store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconcile an alignment against annotated transcripts.
    ///
    /// `block_starts`/`block_sizes` describe the alignment's blocks in
    /// chromosome coordinates. Strand `None` searches both strands.
    #[allow(clippy::too_many_arguments)]
    pub async fn find_associations(
        &mut self,
        chromosome: &str,
        start: i64,
        end: i64,
        block_starts: &[i64],
        block_sizes: &[i64],
        strand: Option<Strand>,
        method: ThreePrimeMethod,
        config: &SearchConfig,
    ) -> Result<Vec<GeneLocationAssociation>> {
        ensure!(
            end >= start,
            "query end {} precedes query start {} on {}",
            end,
            start,
            chromosome
        );
        ensure!(
            block_starts.len() == block_sizes.len(),
            "alignment has {} block starts but {} block sizes",
            block_starts.len(),
            block_sizes.len()
        );

        let total_aligned: i64 = block_sizes.iter().sum();

        let mut candidates = Vec::new();
        if config.use_refseq {
            candidates.extend(
                self.query_track(Track::RefSeq, chromosome, start, end, strand)
                    .await,
            );
        }
        if config.use_known_gene {
            candidates.extend(
                self.query_track(Track::KnownGene, chromosome, start, end, strand)
                    .await,
            );
        }

        let mut associations = Vec::new();
        for transcript in candidates {
            let mut overlap = exon_overlap(
                block_starts,
                block_sizes,
                &transcript.exon_starts,
                &transcript.exon_ends,
            );
            let mut fraction = overlap_fraction(overlap, total_aligned);

            // Weak overlap against canonical exons: escalate through the
            // mRNA tier, then the EST tier, adopting a recomputed value only
            // when it strictly improves.
            if fraction < RECHECK_THRESHOLD && config.use_mrnas {
                let rechecked = self
                    .recheck_overlap(Track::Mrna, chromosome, start, end, strand, block_starts, block_sizes)
                    .await;
                if rechecked > overlap {
                    overlap = rechecked;
                    fraction = overlap_fraction(overlap, total_aligned);
                }

                if fraction < RECHECK_THRESHOLD && config.use_ests {
                    let rechecked = self
                        .recheck_overlap(Track::Est, chromosome, start, end, strand, block_starts, block_sizes)
                        .await;
                    if rechecked > overlap {
                        overlap = rechecked;
                        fraction = overlap_fraction(overlap, total_aligned);
                    }
                }
            }

            if config.minimum_overlap_fraction > 0.0 && overlap == 0 {
                debug!(
                    transcript = %transcript.name,
                    "Discarding association with zero exon overlap"
                );
                continue;
            }

            let distance = three_prime_distance(&transcript, start, end, method);
            associations.push(GeneLocationAssociation {
                transcript,
                overlap_bases: overlap,
                overlap_fraction: fraction,
                three_prime_distance: distance,
                method,
            });
        }

        Ok(associations)
    }

    /// Find the nearest gene when nothing overlaps the query window.
    ///
    /// Expands the window symmetrically by `max_window / 5` per round, up to
    /// five rounds, re-querying RefSeq and Known Gene each round and
    /// returning the transcript with the smallest gap to `[start, end)`.
    /// `None` when the full window holds no gene.
    pub async fn find_closest_gene(
        &mut self,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
        config: &SearchConfig,
    ) -> Result<Option<TranscriptAlignment>> {
        ensure!(
            end >= start,
            "query end {} precedes query start {} on {}",
            end,
            start,
            chromosome
        );

        let step = (config.max_window / NEAREST_GENE_ROUNDS).max(1);

        for round in 0..=NEAREST_GENE_ROUNDS {
            let window_start = (start - round * step).max(0);
            let window_end = end + round * step;

            let mut candidates = self
                .query_track(Track::RefSeq, chromosome, window_start, window_end, strand)
                .await;
            candidates.extend(
                self.query_track(Track::KnownGene, chromosome, window_start, window_end, strand)
                    .await,
            );

            if !candidates.is_empty() {
                debug!(
                    round = round,
                    candidates = candidates.len(),
                    "Nearest-gene search found candidates"
                );
                return Ok(candidates.into_iter().min_by_key(|t| t.gap_to(start, end)));
            }
        }

        Ok(None)
    }

    /// Best overlap of the query blocks against any alignment in the given
    /// tier, using the window cache.
    async fn recheck_overlap(
        &mut self,
        track: Track,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
        block_starts: &[i64],
        block_sizes: &[i64],
    ) -> i64 {
        let alignments = self
            .cached_window_query(track, chromosome, start, end, strand)
            .await;

        alignments
            .iter()
            .map(|a| exon_overlap(block_starts, block_sizes, &a.exon_starts, &a.exon_ends))
            .max()
            .unwrap_or(0)
    }

    /// Window query memoized on chromosome + window + strand
    async fn cached_window_query(
        &mut self,
        track: Track,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
    ) -> Vec<TranscriptAlignment> {
        let key = RegionKey {
            track,
            chromosome: chromosome.to_string(),
            start,
            end,
            strand,
        };

        if let Some(hit) = self.region_cache.get(&key) {
            return hit.clone();
        }

        let results = self
            .query_track(track, chromosome, start, end, strand)
            .await;
        self.region_cache.insert(key, results.clone());
        results
    }

    /// Query one track, degrading SQL failures to an empty tier
    async fn query_track(
        &self,
        track: Track,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Option<Strand>,
    ) -> Vec<TranscriptAlignment> {
        let result = match track {
            Track::RefSeq => self.store.refseq_transcripts(chromosome, start, end, strand).await,
            Track::KnownGene => {
                self.store
                    .known_gene_transcripts(chromosome, start, end, strand)
                    .await
            },
            Track::Mrna => self.store.mrna_alignments(chromosome, start, end, strand).await,
            Track::Est => self.store.est_alignments(chromosome, start, end, strand).await,
        };

        match result {
            Ok(alignments) => alignments,
            Err(e) => {
                warn!(
                    track = ?track,
                    chromosome = chromosome,
                    error = %e,
                    "GoldenPath track query failed; treating tier as empty"
                );
                Vec::new()
            },
        }
    }
}

/// Bases of the query blocks falling inside the candidate's exons
fn exon_overlap(
    block_starts: &[i64],
    block_sizes: &[i64],
    exon_starts: &[i64],
    exon_ends: &[i64],
) -> i64 {
    let mut total = 0;
    for (block_start, block_size) in block_starts.iter().zip(block_sizes) {
        let block_end = block_start + block_size;
        for (exon_start, exon_end) in exon_starts.iter().zip(exon_ends) {
            let overlap = block_end.min(*exon_end) - block_start.max(exon_start);
            if overlap > 0 {
                total += overlap;
            }
        }
    }
    total
}

fn overlap_fraction(overlap: i64, total_aligned: i64) -> f64 {
    if total_aligned > 0 {
        overlap as f64 / total_aligned as f64
    } else {
        0.0
    }
}

/// Distance from the alignment to the transcript's 3′ boundary.
///
/// MIDDLE measures from the alignment's center and floors at 0; RIGHT
/// measures from the alignment's outer edge and keeps its sign.
fn three_prime_distance(
    transcript: &TranscriptAlignment,
    start: i64,
    end: i64,
    method: ThreePrimeMethod,
) -> i64 {
    match (method, transcript.strand) {
        (ThreePrimeMethod::Middle, Strand::Negative) => {
            let center = (start + end) / 2;
            (center - transcript.tx_start).max(0)
        },
        (ThreePrimeMethod::Middle, _) => {
            let center = (start + end) / 2;
            (transcript.tx_end - center).max(0)
        },
        (ThreePrimeMethod::Right, Strand::Negative) => start - transcript.tx_start,
        (ThreePrimeMethod::Right, _) => transcript.tx_end - end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_exon_overlap_full_containment() {
        // One 100-base block entirely inside one exon
        let overlap = exon_overlap(&[1000], &[100], &[500], &[2000]);
        assert_eq!(overlap, 100);
    }

    #[test]
    fn test_exon_overlap_partial() {
        // Block [1000, 1100) against exon [1050, 2000)
        let overlap = exon_overlap(&[1000], &[100], &[1050], &[2000]);
        assert_eq!(overlap, 50);
    }

    #[test]
    fn test_exon_overlap_disjoint() {
        let overlap = exon_overlap(&[1000], &[100], &[5000], &[6000]);
        assert_eq!(overlap, 0);
    }

    #[test]
    fn test_exon_overlap_multi_block_multi_exon() {
        // Two blocks matching two exons exactly, intron in between
        let overlap = exon_overlap(
            &[1000, 3000],
            &[200, 300],
            &[1000, 3000],
            &[1200, 3300],
        );
        assert_eq!(overlap, 500);
    }

    #[test]
    fn test_three_prime_distance_middle_positive() {
        let t = transcript(1000, 2000, Strand::Positive);
        // center of [1400, 1600) is 1500; 3' boundary is 2000
        assert_eq!(three_prime_distance(&t, 1400, 1600, ThreePrimeMethod::Middle), 500);
    }

    #[test]
    fn test_three_prime_distance_middle_negative_strand() {
        let t = transcript(1000, 2000, Strand::Negative);
        // 3' boundary of a negative-strand gene is tx_start
        assert_eq!(three_prime_distance(&t, 1400, 1600, ThreePrimeMethod::Middle), 500);
    }

    #[test]
    fn test_three_prime_distance_middle_floored_at_zero() {
        let t = transcript(1000, 2000, Strand::Positive);
        // Alignment center past the 3' boundary
        assert_eq!(three_prime_distance(&t, 2500, 2700, ThreePrimeMethod::Middle), 0);
    }

    #[test]
    fn test_three_prime_distance_right_keeps_sign() {
        let t = transcript(1000, 2000, Strand::Positive);
        assert_eq!(three_prime_distance(&t, 1400, 1600, ThreePrimeMethod::Right), 400);
        // Alignment extends past the boundary: negative
        assert_eq!(three_prime_distance(&t, 1400, 2200, ThreePrimeMethod::Right), -200);
    }

    #[test]
    fn test_overlap_fraction() {
        assert_eq!(overlap_fraction(50, 100), 0.5);
        assert_eq!(overlap_fraction(0, 0), 0.0);
    }
}
