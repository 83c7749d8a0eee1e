//! UCSC genome-browser binning scheme
//!
//! GoldenPath tables carry a `bin` column that assigns every feature to the
//! smallest bin fully containing its interval, letting range queries prune
//! with an index instead of scanning a whole chromosome. The scheme has five
//! levels: 128 kb leaf bins, then 1 Mb, 8 Mb, 64 Mb and one 512 Mb root bin.
//!
//! Intervals are half-open, zero-based: `[start, end)`.

use anyhow::{ensure, Result};

/// Per-level bin number offsets, finest level first
const BIN_OFFSETS: [i64; 5] = [512 + 64 + 8 + 1, 64 + 8 + 1, 8 + 1, 1, 0];

/// log2 of the finest bin size (128 kb)
const BIN_FIRST_SHIFT: u32 = 17;

/// log2 of the fan-out between levels
const BIN_NEXT_SHIFT: u32 = 3;

/// Compute the smallest bin fully containing `[start, end)`.
pub fn bin_from_range(start: i64, end: i64) -> Result<i32> {
    ensure!(start >= 0, "bin range start must be non-negative, got {}", start);
    ensure!(
        end > start,
        "bin range must be non-empty, got [{}, {})",
        start,
        end
    );

    let mut start_bin = start >> BIN_FIRST_SHIFT;
    let mut end_bin = (end - 1) >> BIN_FIRST_SHIFT;

    for offset in BIN_OFFSETS {
        if start_bin == end_bin {
            return Ok((offset + start_bin) as i32);
        }
        start_bin >>= BIN_NEXT_SHIFT;
        end_bin >>= BIN_NEXT_SHIFT;
    }

    anyhow::bail!(
        "interval [{}, {}) exceeds the range covered by the binning scheme",
        start,
        end
    )
}

/// All bins a feature overlapping `[start, end)` could live in.
///
/// Used to build the `bin IN (...)` pruning clause of range queries.
pub fn overlapping_bins(start: i64, end: i64) -> Result<Vec<i32>> {
    ensure!(start >= 0, "bin range start must be non-negative, got {}", start);
    ensure!(
        end > start,
        "bin range must be non-empty, got [{}, {})",
        start,
        end
    );

    let mut bins = Vec::new();
    let mut start_bin = start >> BIN_FIRST_SHIFT;
    let mut end_bin = (end - 1) >> BIN_FIRST_SHIFT;

    for offset in BIN_OFFSETS {
        for bin in start_bin..=end_bin {
            bins.push((offset + bin) as i32);
        }
        start_bin >>= BIN_NEXT_SHIFT;
        end_bin >>= BIN_NEXT_SHIFT;
    }

    Ok(bins)
}
