//! Shared ingestion helpers

pub mod line_source;

pub use line_source::open_lines;
