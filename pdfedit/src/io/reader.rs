//! PDF reading and loading operations.
//!
//! This module provides PDF loading with support for:
//! - Existence and type checks with path-carrying errors
//! - Encrypted documents unlocked with a password
//! - Bounded-concurrency batch loading that keeps input order
//! - Load statistics for batches
//!
//! # Examples
//!
//! ```no_run
//! use pdfedit::io::reader::PdfReader;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
//! let (results, stats) = reader.load_all(&paths, 4).await;
//! println!("{} of {} loaded", stats.success_count, results.len());
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{PdfEditError, Result};
use crate::utils::format_file_size;

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The PDF document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to load the document.
    pub load_time: Duration,

    /// File size in bytes.
    pub file_size: u64,

    /// Whether the file was encrypted and had to be unlocked.
    pub encrypted: bool,
}

impl LoadedPdf {
    fn new(unlocked: Unlocked, path: PathBuf, load_time: Duration, file_size: u64) -> Self {
        let page_count = unlocked.document.get_pages().len();

        Self {
            document: unlocked.document,
            path,
            page_count,
            load_time,
            file_size,
            encrypted: unlocked.encrypted,
        }
    }
}

/// A parsed document after password handling.
struct Unlocked {
    document: Document,
    encrypted: bool,
}

/// Result of a load operation (success or failure).
pub type LoadResult = Result<LoadedPdf>;

/// Statistics for a batch load operation.
#[derive(Debug, Clone)]
pub struct LoadStatistics {
    /// Number of PDFs successfully loaded.
    pub success_count: usize,

    /// Number of PDFs that failed to load.
    pub failure_count: usize,

    /// Total time taken for all loads.
    pub total_time: Duration,

    /// Average time per successful load.
    pub average_time: Duration,

    /// Total size of successfully loaded files.
    pub total_size: u64,

    /// Total number of pages loaded.
    pub total_pages: usize,
}

impl LoadStatistics {
    fn from_results(results: &[LoadResult], total_time: Duration) -> Self {
        let mut success_count = 0;
        let mut failure_count = 0;
        let mut total_size = 0;
        let mut total_pages = 0;
        let mut total_load_time = Duration::ZERO;

        for result in results {
            match result {
                Ok(loaded) => {
                    success_count += 1;
                    total_size += loaded.file_size;
                    total_pages += loaded.page_count;
                    total_load_time += loaded.load_time;
                }
                Err(_) => failure_count += 1,
            }
        }

        let average_time = if success_count > 0 {
            total_load_time / success_count as u32
        } else {
            Duration::ZERO
        };

        Self {
            success_count,
            failure_count,
            total_time,
            average_time,
            total_size,
            total_pages,
        }
    }

    /// Format total size as human-readable string.
    pub fn format_total_size(&self) -> String {
        format_file_size(self.total_size)
    }
}

/// PDF reader with configurable loading behavior.
#[derive(Debug, Clone)]
pub struct PdfReader {
    /// Whether to reject documents without pages.
    verify: bool,

    /// Password used to unlock encrypted documents.
    password: Option<String>,
}

impl PdfReader {
    /// Create a new PDF reader with default settings.
    pub fn new() -> Self {
        Self {
            verify: true,
            password: None,
        }
    }

    /// Create a reader that accepts documents without pages.
    ///
    /// Repair uses this to open files whose page tree is broken.
    pub fn without_verification() -> Self {
        Self {
            verify: false,
            password: None,
        }
    }

    /// Use `password` when a loaded document turns out to be encrypted.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Load a single PDF document.
    ///
    /// Parsing happens on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path does not exist or is not a regular file
    /// - The file is not a valid PDF
    /// - The PDF is encrypted and no (or a wrong) password was given
    /// - Verification is on and the PDF has no pages
    pub async fn load(&self, path: &Path) -> Result<LoadedPdf> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PdfEditError::file_not_found(path.to_path_buf())
            } else {
                PdfEditError::FileNotAccessible {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        if !metadata.is_file() {
            return Err(PdfEditError::not_a_file(path.to_path_buf()));
        }

        let path_buf = path.to_path_buf();
        let reader = self.clone();
        let start = Instant::now();

        let unlocked = tokio::task::spawn_blocking(move || {
            let doc = Document::load(&path_buf).map_err(|e| load_error(&path_buf, e))?;
            reader.finish(doc, &path_buf)
        })
        .await
        .map_err(|e| PdfEditError::other(format!("Load task failed: {e}")))??;

        let load_time = start.elapsed();
        tracing::debug!(path = %path.display(), ?load_time, "loaded PDF");

        Ok(LoadedPdf::new(
            unlocked,
            path.to_path_buf(),
            load_time,
            metadata.len(),
        ))
    }

    /// Load a PDF from memory.
    ///
    /// `label` names the document in error messages.
    pub fn load_bytes(&self, bytes: &[u8], label: impl AsRef<Path>) -> Result<LoadedPdf> {
        let label = label.as_ref().to_path_buf();
        let start = Instant::now();

        let doc = Document::load_mem(bytes).map_err(|e| load_error(&label, e))?;
        let unlocked = self.finish(doc, &label)?;

        Ok(LoadedPdf::new(
            unlocked,
            label,
            start.elapsed(),
            bytes.len() as u64,
        ))
    }

    /// Unlock and verify a freshly parsed document.
    fn finish(&self, mut doc: Document, path: &Path) -> Result<Unlocked> {
        let encrypted = doc.is_encrypted();
        if encrypted {
            let password = self.password.as_deref().unwrap_or("");
            if doc.decrypt(password).is_err() {
                return Err(match self.password {
                    Some(_) => PdfEditError::WrongPassword {
                        path: path.to_path_buf(),
                    },
                    None => PdfEditError::encrypted_pdf(path.to_path_buf()),
                });
            }
            tracing::debug!(path = %path.display(), "decrypted PDF");
        }

        if self.verify && doc.get_pages().is_empty() {
            return Err(PdfEditError::corrupted_pdf(
                path.to_path_buf(),
                "PDF has no pages",
            ));
        }

        Ok(Unlocked {
            document: doc,
            encrypted,
        })
    }

    /// Load multiple PDF documents sequentially, in the order provided.
    pub async fn load_sequential(&self, paths: &[PathBuf]) -> Vec<LoadResult> {
        let mut results = Vec::with_capacity(paths.len());

        for path in paths {
            results.push(self.load(path).await);
        }

        results
    }

    /// Load multiple PDF documents concurrently.
    ///
    /// At most `workers` documents are parsed at once. Results come back in
    /// the same order as `paths`.
    pub async fn load_parallel(&self, paths: &[PathBuf], workers: usize) -> Vec<LoadResult> {
        use futures::stream::{self, StreamExt};

        let workers = workers.max(1);

        let tasks = paths.iter().enumerate().map(|(idx, path)| {
            let path = path.clone();
            let reader = self.clone();
            async move { (idx, reader.load(&path).await) }
        });

        let mut indexed_results: Vec<(usize, LoadResult)> = stream::iter(tasks)
            .buffer_unordered(workers)
            .collect::<Vec<_>>()
            .await;

        indexed_results.sort_by_key(|(idx, _)| *idx);
        indexed_results.into_iter().map(|(_, result)| result).collect()
    }

    /// Load all PDFs, choosing sequential or concurrent loading by batch size.
    ///
    /// Returns the per-file results in input order and aggregate statistics.
    pub async fn load_all(
        &self,
        paths: &[PathBuf],
        max_workers: usize,
    ) -> (Vec<LoadResult>, LoadStatistics) {
        let start = Instant::now();

        let results = if paths.len() <= 3 {
            self.load_sequential(paths).await
        } else {
            self.load_parallel(paths, max_workers).await
        };

        let stats = LoadStatistics::from_results(&results, start.elapsed());
        tracing::debug!(
            loaded = stats.success_count,
            failed = stats.failure_count,
            "batch load finished"
        );

        (results, stats)
    }
}

impl Default for PdfReader {
    fn default() -> Self {
        Self::new()
    }
}

fn load_error(path: &Path, err: lopdf::Error) -> PdfEditError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("encrypt") || lower.contains("password") {
        PdfEditError::encrypted_pdf(path.to_path_buf())
    } else {
        PdfEditError::failed_to_load_pdf(path.to_path_buf(), message)
    }
}
