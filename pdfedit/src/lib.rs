//! pdfedit - Edit the page structure of PDF files and save them safely.
//!
//! This library is the document mutation and persistence layer of a PDF
//! editor. It supports:
//!
//! - Page deletion, insertion, rotation, reordering and extraction
//! - Page range strings such as `1-3,5,8-`
//! - Merging and splitting documents
//! - Undo and redo over an open document
//! - Crash-safe saving: temp file, backup, atomic replace, retries and
//!   rollback
//!
//! # Examples
//!
//! ## Editing a File
//!
//! ```no_run
//! use pdfedit::{Edit, EditorConfig, PageRange, PdfManager};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut manager = PdfManager::new(EditorConfig::default());
//! let page_count = manager.open(Path::new("report.pdf")).await?;
//!
//! let pages = PageRange::parse("2-3")?.to_indices(page_count)?;
//! manager.apply(Edit::DeletePages { pages }).await?;
//!
//! let report = manager.save().await?;
//! println!("Wrote {} bytes", report.bytes_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Merging
//!
//! ```no_run
//! use pdfedit::merge::{self, MergeInput, MergeOptions};
//! use pdfedit::io::PdfWriter;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let inputs = vec![
//!     "cover.pdf".parse::<MergeInput>()?,
//!     "body.pdf:2-".parse::<MergeInput>()?,
//! ];
//! let options = MergeOptions {
//!     bookmarks: true,
//!     ..Default::default()
//! };
//!
//! let (document, stats) = merge::merge_pdfs(&inputs, &options).await?;
//! PdfWriter::new().save(&document, Path::new("book.pdf")).await?;
//! println!("Created {} page document", stats.total_pages);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod io;
pub mod manager;
pub mod merge;
pub mod output;
pub mod pages;
pub mod range;
pub mod text;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use config::{EditorConfig, RetryPolicy, SaveOptions};
pub use error::{PdfEditError, Result};
pub use manager::{Edit, PdfManager};
pub use range::PageRange;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
