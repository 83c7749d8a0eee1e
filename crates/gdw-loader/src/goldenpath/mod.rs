//! GoldenPath genomic-location reconciliation
//!
//! Read-mostly query service mapping sequence alignments to annotated genes
//! through the external GoldenPath alignment database:
//!
//! - **bin**: the UCSC spatial binning scheme
//! - **models**: candidates, associations and search configuration
//! - **cache**: bounded LRU for evidence-tier window lookups
//! - **db**: the [`AlignmentStore`] trait and its Postgres implementation
//! - **engine**: exon-overlap scoring and nearest-gene search

pub mod bin;
pub mod cache;
pub mod db;
pub mod engine;
pub mod models;

pub use bin::{bin_from_range, overlapping_bins};
pub use db::{AlignmentStore, PgAlignmentStore};
pub use engine::GoldenPathEngine;
pub use models::{
    GeneLocationAssociation, SearchConfig, ThreePrimeMethod, Track, TranscriptAlignment,
};
