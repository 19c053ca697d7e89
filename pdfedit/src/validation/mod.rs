//! Document inspection and output checks.
//!
//! This module answers two questions before any file is touched:
//! - What is in a PDF (pages, version, encryption, size, metadata)
//! - Whether an output path may be written for a given set of inputs
//!
//! # Examples
//!
//! ```no_run
//! use pdfedit::validation::Validator;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let info = Validator::new().inspect(&PathBuf::from("test.pdf")).await?;
//! println!("PDF has {} pages", info.page_count);
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{Metadata, OverwriteMode};
use crate::error::{PdfEditError, Result};
use crate::io::PdfReader;
use crate::merge::{BookmarkManager, MetadataManager};
use crate::pages::tree;
use crate::utils::format_file_size;

/// What a PDF file contains.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    /// Path to the inspected file.
    pub path: PathBuf,

    /// Number of pages in the PDF.
    pub page_count: usize,

    /// PDF version (major, minor).
    pub version: Option<(u8, u8)>,

    /// Size of the file in bytes.
    pub file_size: u64,

    /// Whether the PDF is encrypted.
    pub is_encrypted: bool,

    /// Number of objects in the PDF.
    pub object_count: usize,

    /// First page dimensions (width, height) in points, if available.
    pub page_dimensions: Option<(f32, f32)>,

    /// Info dictionary entries.
    pub metadata: Metadata,

    /// Whether the document has an outline.
    pub has_bookmarks: bool,
}

impl DocumentInfo {
    /// Describe an already loaded document.
    pub fn from_document(
        path: PathBuf,
        doc: &Document,
        file_size: u64,
        is_encrypted: bool,
    ) -> Self {
        let page_ids = tree::page_ids(doc);

        let version = doc.version.split_once('.').map(|(major, minor)| {
            (
                major.parse::<u8>().unwrap_or_default(),
                minor.parse::<u8>().unwrap_or_default(),
            )
        });

        let page_dimensions = page_ids
            .first()
            .and_then(|id| tree::media_box(doc, *id))
            .map(|[x0, y0, x1, y1]| ((x1 - x0).abs(), (y1 - y0).abs()));

        Self {
            path,
            page_count: page_ids.len(),
            version,
            file_size,
            is_encrypted,
            object_count: doc.objects.len(),
            page_dimensions,
            metadata: MetadataManager::new().get_metadata(doc),
            has_bookmarks: BookmarkManager::new().has_bookmarks(doc),
        }
    }

    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Summary of inspecting several files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionSummary {
    /// Files that could be read.
    pub results: Vec<DocumentInfo>,

    /// Number of files that could not be read.
    pub files_failed: usize,

    /// Total pages across all readable files.
    pub total_pages: usize,

    /// Total size of all readable files.
    pub total_size: u64,
}

impl InspectionSummary {
    fn from_results(results: Vec<DocumentInfo>, files_failed: usize) -> Self {
        let total_pages = results.iter().map(|r| r.page_count).sum();
        let total_size = results.iter().map(|r| r.file_size).sum();

        Self {
            results,
            files_failed,
            total_pages,
            total_size,
        }
    }

    /// Format total size as human-readable string.
    pub fn format_total_size(&self) -> String {
        format_file_size(self.total_size)
    }
}

/// Inspects input files and checks output paths.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// Reject documents without pages.
    strict: bool,

    /// Password for encrypted inputs.
    password: Option<String>,
}

impl Validator {
    /// Create a validator that reports page-less documents instead of
    /// rejecting them.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator that rejects documents without pages.
    pub fn strict() -> Self {
        Self {
            strict: true,
            password: None,
        }
    }

    /// Unlock encrypted inputs with `password`.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    fn reader(&self) -> PdfReader {
        let reader = if self.strict {
            PdfReader::new()
        } else {
            PdfReader::without_verification()
        };
        match &self.password {
            Some(password) => reader.with_password(password.clone()),
            None => reader,
        }
    }

    /// Read a PDF and describe it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file doesn't exist or is not a regular file
    /// - The file is empty or not a valid PDF
    /// - The PDF is encrypted and cannot be unlocked
    /// - The validator is strict and the PDF has no pages
    pub async fn inspect(&self, path: &Path) -> Result<DocumentInfo> {
        if let Ok(metadata) = tokio::fs::metadata(path).await
            && metadata.is_file()
            && metadata.len() == 0
        {
            return Err(PdfEditError::corrupted_pdf(
                path.to_path_buf(),
                "File is empty",
            ));
        }

        let loaded = self.reader().load(path).await?;

        Ok(DocumentInfo::from_document(
            loaded.path,
            &loaded.document,
            loaded.file_size,
            loaded.encrypted,
        ))
    }

    /// Inspect several files in order.
    ///
    /// # Errors
    ///
    /// Returns the first failure unless `continue_on_error` is set, and
    /// [`PdfEditError::NoFilesToMerge`] if no file could be read.
    pub async fn inspect_all(
        &self,
        paths: &[PathBuf],
        continue_on_error: bool,
    ) -> Result<InspectionSummary> {
        let mut results = Vec::with_capacity(paths.len());
        let mut failed = 0;

        for path in paths {
            match self.inspect(path).await {
                Ok(info) => results.push(info),
                Err(e) if continue_on_error => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if results.is_empty() {
            return Err(PdfEditError::NoFilesToMerge);
        }

        Ok(InspectionSummary::from_results(results, failed))
    }

    /// Check that `output` may be written.
    ///
    /// `Prompt` passes when the file exists; asking is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `output` is one of `inputs`
    /// - `output` is a directory
    /// - `output` exists and the mode is `NoClobber`
    /// - The output directory doesn't exist or is read-only
    pub async fn validate_output(
        &self,
        output: &Path,
        inputs: &[PathBuf],
        mode: OverwriteMode,
    ) -> Result<()> {
        if inputs.iter().any(|input| same_file(input, output)) {
            return Err(PdfEditError::invalid_config(format!(
                "Output {} is also an input",
                output.display()
            )));
        }

        if let Ok(metadata) = tokio::fs::metadata(output).await {
            if metadata.is_dir() {
                return Err(PdfEditError::not_a_file(output.to_path_buf()));
            }
            if mode == OverwriteMode::NoClobber {
                return Err(PdfEditError::output_exists(output.to_path_buf()));
            }
        }

        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let metadata = tokio::fs::metadata(parent).await.map_err(|_| {
            PdfEditError::invalid_config(format!(
                "Output directory does not exist: {}",
                parent.display()
            ))
        })?;

        if !metadata.is_dir() {
            return Err(PdfEditError::invalid_config(format!(
                "Output directory is not a directory: {}",
                parent.display()
            )));
        }

        if metadata.permissions().readonly() {
            return Err(PdfEditError::invalid_config(format!(
                "Output directory is not writable: {}",
                parent.display()
            )));
        }

        Ok(())
    }
}

/// Whether two paths name the same file.
///
/// Paths are compared after canonicalization, so `./doc.pdf` and `doc.pdf`
/// match. Paths that cannot be canonicalized are compared as written.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
