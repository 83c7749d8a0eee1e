//! GDW Common Library
//!
//! Shared types, error handling and logging setup for the GDW workspace.
//!
//! - **Error Handling**: the `GdwError` enum and `Result` alias
//! - **Logging**: tracing subscriber configuration
//! - **Types**: domain types shared between the ingestion pipeline and the
//!   GoldenPath location engine (strand, taxon, physical location)

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{GdwError, Result};
