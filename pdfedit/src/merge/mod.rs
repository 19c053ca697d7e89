//! PDF merging and splitting.
//!
//! This module provides:
//! - Concatenation of several documents, each with an optional page range
//! - Per-file bookmarks in the merged document
//! - Metadata management
//! - Splitting one document into parts by page, by chunk size or by ranges
//!
//! # Examples
//!
//! ```no_run
//! use pdfedit::merge::{MergeInput, MergeOptions, Merger};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let inputs = vec![MergeInput::new("a.pdf"), MergeInput::new("b.pdf")];
//! let result = Merger::new().merge(&inputs, &MergeOptions::default()).await?;
//! println!("Merged {} pages", result.statistics.total_pages);
//! # Ok(())
//! # }
//! ```

pub mod bookmarks;
pub mod merger;
pub mod metadata;
pub mod split;

pub use bookmarks::{BookmarkEntry, BookmarkManager};
pub use merger::{MergeInput, MergeOptions, MergeResult, MergeStatistics, Merger};
pub use metadata::MetadataManager;
pub use split::{SplitMode, SplitPart, SplitReport, Splitter};

use crate::error::Result;
use lopdf::Document;

/// Merge the given inputs with a default [`Merger`].
///
/// # Errors
///
/// Returns an error if any merge step fails.
pub async fn merge_pdfs(
    inputs: &[MergeInput],
    options: &MergeOptions,
) -> Result<(Document, MergeStatistics)> {
    let result = Merger::new().merge(inputs, options).await?;
    Ok((result.document, result.statistics))
}
