//! Error types for pdfedit.
//!
//! This module defines all error types that can occur while opening, editing
//! and saving PDF documents. Errors carry the path involved and, where there
//! is one, the underlying I/O error as their source.
//!
//! # Error Categories
//!
//! - **I/O Errors**: File not found, permission denied, etc.
//! - **PDF Errors**: Invalid PDF structure, corrupted or encrypted files
//! - **Page Selection Errors**: Bad page range strings, out-of-bounds pages
//! - **Persistence Errors**: Temp file, backup, replace and rollback failures
//! - **Editor Errors**: No open document, empty undo history

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pdfedit operations.
pub type Result<T> = std::result::Result<T, PdfEditError>;

/// Main error type for pdfedit operations.
#[derive(Debug, Error)]
pub enum PdfEditError {
    /// Input file was not found.
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Input file is not accessible (permission denied, etc.).
    #[error("Cannot access file: {}\n  Reason: {source}", .path.display())]
    FileNotAccessible {
        /// Path to the inaccessible file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Path exists but is not a regular file.
    #[error("Not a file: {}", .path.display())]
    NotAFile {
        /// Path that is not a file.
        path: PathBuf,
    },

    /// Failed to load PDF file.
    #[error("Failed to load PDF: {}\n  Reason: {reason}", .path.display())]
    FailedToLoadPdf {
        /// Path to the PDF file.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// PDF file is corrupted or has invalid structure.
    #[error("Corrupted or invalid PDF: {}\n  Details: {details}", .path.display())]
    CorruptedPdf {
        /// Path to the corrupted PDF.
        path: PathBuf,
        /// Details about the corruption.
        details: String,
    },

    /// PDF file is encrypted and no usable password was supplied.
    #[error(
        "PDF is encrypted: {}\n  Hint: pass the document password with --password",
        .path.display()
    )]
    EncryptedPdf {
        /// Path to the encrypted PDF.
        path: PathBuf,
    },

    /// The supplied password did not unlock the document.
    #[error("Incorrect password for PDF: {}", .path.display())]
    WrongPassword {
        /// Path to the encrypted PDF.
        path: PathBuf,
    },

    /// Page range string could not be parsed.
    #[error("Invalid page range '{spec}': {reason}")]
    InvalidPageSpec {
        /// The range string as given.
        spec: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Page range refers to pages the document does not have.
    #[error(
        "Page range '{range}' is out of bounds\n  \
         Document has {total_pages} page(s). Page numbers must be between 1 and {total_pages}"
    )]
    InvalidPageRange {
        /// Requested page range.
        range: String,
        /// Total pages in the document.
        total_pages: usize,
    },

    /// A zero-based page index is out of bounds.
    #[error("Page index {index} is out of bounds (document has {total_pages} page(s))")]
    PageOutOfBounds {
        /// The offending zero-based index.
        index: usize,
        /// Total pages in the document.
        total_pages: usize,
    },

    /// An edit would leave the document without pages.
    #[error("Cannot remove all {total_pages} page(s): a PDF must keep at least one page")]
    WouldRemoveAllPages {
        /// Total pages in the document.
        total_pages: usize,
    },

    /// No input files were provided for merging.
    #[error("No input files specified for merging")]
    NoFilesToMerge,

    /// Output file already exists and overwrite is not allowed.
    #[error(
        "Output file already exists: {}\n  \
         Use --force to overwrite or choose a different output path",
        .path.display()
    )]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// Failed to create output or temporary file.
    #[error("Failed to create output file: {}\n  Reason: {source}", .path.display())]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to write to output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", .path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to back up the existing target before replacing it.
    #[error("Failed to back up {} before saving\n  Reason: {source}", .path.display())]
    BackupFailed {
        /// File that was being backed up.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Restoring the backup after a failed save did not succeed.
    #[error(
        "Failed to restore {} from backup {}\n  Reason: {source}",
        .path.display(),
        .backup.display()
    )]
    RollbackFailed {
        /// Target that should have been restored.
        path: PathBuf,
        /// Backup copy that is still on disk.
        backup: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The freshly written file did not re-open as the expected document.
    #[error("Verification of written PDF failed: {}\n  Details: {details}", .path.display())]
    VerificationFailed {
        /// Path of the file that failed verification.
        path: PathBuf,
        /// What did not match.
        details: String,
    },

    /// A transient error persisted through every retry.
    #[error(
        "Gave up on {} after {attempts} attempt(s)\n  Last error: {source}",
        .path.display()
    )]
    RetriesExhausted {
        /// Path being written.
        path: PathBuf,
        /// Number of attempts made.
        attempts: u32,
        /// The last error seen.
        #[source]
        source: io::Error,
    },

    /// An operation needed an open document.
    #[error("No document is open")]
    NoDocumentOpen,

    /// Undo was requested with an empty history.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Redo was requested with nothing undone.
    #[error("Nothing to redo")]
    NothingToRedo,

    /// The document has no backing file path yet.
    #[error("Document has no file path; use save-as")]
    NoPath,

    /// A page tree operation failed.
    #[error("Page operation failed: {reason}")]
    PageTree {
        /// Description of what went wrong.
        reason: String,
    },

    /// Merge operation failed.
    #[error("Merge operation failed: {reason}")]
    MergeFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// Split operation failed.
    #[error("Split operation failed: {reason}")]
    SplitFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// Bookmark operation failed.
    #[error("Failed to create bookmarks: {reason}")]
    BookmarkFailed {
        /// Details about the failure.
        reason: String,
    },

    /// Metadata operation failed.
    #[error("Failed to set metadata: {reason}")]
    MetadataFailed {
        /// Details about the failure.
        reason: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// User cancelled the operation.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<lopdf::Error> for PdfEditError {
    fn from(err: lopdf::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl PdfEditError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: PathBuf) -> Self {
        Self::NotAFile { path }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            path,
            reason: reason.into(),
        }
    }

    /// Create a CorruptedPdf error.
    pub fn corrupted_pdf(path: PathBuf, details: impl Into<String>) -> Self {
        Self::CorruptedPdf {
            path,
            details: details.into(),
        }
    }

    /// Create an EncryptedPdf error.
    pub fn encrypted_pdf(path: PathBuf) -> Self {
        Self::EncryptedPdf { path }
    }

    /// Create an InvalidPageSpec error.
    pub fn invalid_page_spec(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPageSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidPageRange error.
    pub fn invalid_page_range(range: impl Into<String>, total_pages: usize) -> Self {
        Self::InvalidPageRange {
            range: range.into(),
            total_pages,
        }
    }

    /// Create a PageOutOfBounds error.
    pub fn page_out_of_bounds(index: usize, total_pages: usize) -> Self {
        Self::PageOutOfBounds { index, total_pages }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: PathBuf) -> Self {
        Self::OutputExists { path }
    }

    /// Create a PageTree error.
    pub fn page_tree(reason: impl Into<String>) -> Self {
        Self::PageTree {
            reason: reason.into(),
        }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }

    /// Create a SplitFailed error.
    pub fn split_failed(reason: impl Into<String>) -> Self {
        Self::SplitFailed {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (operation can continue).
    ///
    /// Returns true for per-input errors a continue-on-error merge may skip.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FailedToLoadPdf { .. }
                | Self::CorruptedPdf { .. }
                | Self::EncryptedPdf { .. }
                | Self::WrongPassword { .. }
                | Self::InvalidPageRange { .. }
                | Self::BookmarkFailed { .. }
        )
    }

    /// Check if this error should stop all processing immediately.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoFilesToMerge
                | Self::FailedToCreateOutput { .. }
                | Self::FailedToWrite { .. }
                | Self::RollbackFailed { .. }
                | Self::Cancelled
        )
    }

    /// Check if the wrapped I/O error is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::FileNotAccessible { source, .. }
            | Self::FailedToCreateOutput { source, .. }
            | Self::FailedToWrite { source, .. }
            | Self::BackupFailed { source, .. }
            | Self::Io { source } => is_transient_io(source),
            _ => false,
        }
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } => 2,
            Self::FileNotAccessible { .. } => 2,
            Self::NotAFile { .. } => 2,
            Self::FailedToLoadPdf { .. } => 3,
            Self::CorruptedPdf { .. } => 3,
            Self::EncryptedPdf { .. } => 3,
            Self::WrongPassword { .. } => 3,
            Self::InvalidPageSpec { .. } => 1,
            Self::InvalidPageRange { .. } => 1,
            Self::PageOutOfBounds { .. } => 1,
            Self::WouldRemoveAllPages { .. } => 1,
            Self::NoFilesToMerge => 1,
            Self::OutputExists { .. } => 4,
            Self::FailedToCreateOutput { .. } => 5,
            Self::FailedToWrite { .. } => 5,
            Self::BackupFailed { .. } => 5,
            Self::RollbackFailed { .. } => 5,
            Self::VerificationFailed { .. } => 5,
            Self::RetriesExhausted { .. } => 5,
            Self::NoDocumentOpen => 1,
            Self::NothingToUndo => 1,
            Self::NothingToRedo => 1,
            Self::NoPath => 1,
            Self::PageTree { .. } => 6,
            Self::MergeFailed { .. } => 6,
            Self::SplitFailed { .. } => 6,
            Self::BookmarkFailed { .. } => 6,
            Self::MetadataFailed { .. } => 6,
            Self::InvalidConfig { .. } => 1,
            Self::Cancelled => 130, // Standard exit code for SIGINT
            Self::Io { .. } => 5,
            Self::Other { .. } => 1,
        }
    }
}

/// Whether an I/O error looks like a temporary lock held by another process.
///
/// Windows reports sharing violations (another process has the file open)
/// as raw OS errors 32 and 33, which surface as `PermissionDenied` or
/// `Uncategorized` depending on the toolchain.
pub fn is_transient_io(err: &io::Error) -> bool {
    if matches!(err.raw_os_error(), Some(32) | Some(33)) && cfg!(windows) {
        return true;
    }

    matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied
            | io::ErrorKind::ResourceBusy
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
    )
}
