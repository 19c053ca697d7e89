//! I/O operations for pdfedit.
//!
//! This module handles all file I/O operations including:
//! - Loading PDF documents from disk or memory
//! - Unlocking encrypted documents
//! - Concurrent batch loading
//! - Saving through the safe-save protocol (temp file, backup, atomic
//!   rename, bounded retries and rollback)
//!
//! # Examples
//!
//! ```no_run
//! use pdfedit::io::{PdfReader, PdfWriter};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let doc = reader.load(&PathBuf::from("input.pdf")).await?;
//!
//! let writer = PdfWriter::new();
//! writer.save(&doc.document, &PathBuf::from("output.pdf")).await?;
//! # Ok(())
//! # }
//! ```

pub mod reader;
pub mod writer;

pub use reader::{LoadResult, LoadStatistics, LoadedPdf, PdfReader};
pub use writer::{PdfWriter, SaveReport};

use crate::error::Result;
use lopdf::Document;
use std::path::Path;

/// Load a PDF document from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid PDF.
pub async fn load_pdf(path: &Path) -> Result<Document> {
    let loaded = PdfReader::new().load(path).await?;
    Ok(loaded.document)
}

/// Save a PDF document with the default safe-save options.
///
/// # Errors
///
/// Returns an error if the file cannot be written. An existing file at
/// `path` is left intact in that case.
pub async fn save_pdf(doc: &Document, path: &Path) -> Result<SaveReport> {
    PdfWriter::new().save(doc, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::tests::create_multi_page_pdf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("roundtrip.pdf");

        save_pdf(&create_multi_page_pdf(3), &path).await.unwrap();
        let doc = load_pdf(&path).await.unwrap();

        assert_eq!(doc.get_pages().len(), 3);
    }
}
