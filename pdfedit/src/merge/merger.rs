//! Core PDF merging implementation.
//!
//! Inputs are loaded concurrently, then concatenated in input order. Each
//! input may select a subset of its pages with a [`PageRange`].

use lopdf::Document;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::config::{CompressionLevel, Metadata, Rotation};
use crate::error::{PdfEditError, Result};
use crate::io::{LoadedPdf, PdfReader};
use crate::merge::bookmarks::{BookmarkEntry, BookmarkManager};
use crate::merge::metadata::MetadataManager;
use crate::pages::PageEditor;
use crate::range::PageRange;
use crate::utils::format_file_size;

/// One input of a merge: a file and the pages to take from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeInput {
    /// Path of the input PDF.
    pub path: PathBuf,

    /// Pages to take; `None` takes every page.
    pub range: Option<PageRange>,
}

impl MergeInput {
    /// Take every page of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            range: None,
        }
    }

    /// Take only the pages selected by `range`.
    pub fn with_range(mut self, range: PageRange) -> Self {
        self.range = Some(range);
        self
    }
}

impl FromStr for MergeInput {
    type Err = PdfEditError;

    /// Parse `path` or `path:range`, e.g. `report.pdf:1-3,7`.
    ///
    /// The part after the last `:` is only treated as a range if it parses
    /// as one, so Windows drive letters stay part of the path.
    fn from_str(s: &str) -> Result<Self> {
        if let Some((path, range)) = s.rsplit_once(':')
            && !path.is_empty()
            && let Ok(range) = PageRange::parse(range)
        {
            return Ok(Self::new(path).with_range(range));
        }
        Ok(Self::new(s))
    }
}

impl fmt::Display for MergeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{}:{range}", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// Options for a merge.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Skip inputs that fail to load instead of aborting.
    pub continue_on_error: bool,

    /// Number of inputs loaded at once (None = auto-detect CPU count).
    pub jobs: Option<usize>,

    /// Rotation applied to every merged page.
    pub rotation: Option<Rotation>,

    /// Add one bookmark per input file.
    pub bookmarks: bool,

    /// Metadata for the merged document.
    pub metadata: Metadata,

    /// Compression applied to the merged document.
    pub compression: CompressionLevel,

    /// Password for encrypted inputs.
    pub password: Option<String>,
}

impl MergeOptions {
    /// Get the effective number of parallel jobs.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

/// Statistics about a merge operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStatistics {
    /// Number of PDFs successfully merged.
    pub files_merged: usize,

    /// Number of inputs skipped because of errors.
    pub files_skipped: usize,

    /// Total number of pages in merged document.
    pub total_pages: usize,

    /// Total time taken for merge.
    pub merge_time: Duration,

    /// Time taken to load all PDFs.
    pub load_time: Duration,

    /// Total size of input files.
    pub input_size: u64,

    /// Number of bookmarks added.
    pub bookmarks_added: usize,

    /// Whether compression was applied.
    pub compressed: bool,
}

impl MergeStatistics {
    /// Format input size as human-readable string.
    pub fn format_input_size(&self) -> String {
        format_file_size(self.input_size)
    }
}

/// Result of a merge operation.
#[derive(Debug)]
pub struct MergeResult {
    /// The merged PDF document.
    pub document: Document,

    /// Statistics about the merge.
    pub statistics: MergeStatistics,

    /// Paths of files that were merged.
    pub merged_files: Vec<PathBuf>,

    /// Paths of inputs that were skipped.
    pub skipped_files: Vec<PathBuf>,
}

/// Pages taken from one loaded input.
struct Selection {
    loaded: LoadedPdf,
    indices: Vec<usize>,
}

/// PDF merger that combines multiple documents.
#[derive(Debug, Default, Clone)]
pub struct Merger {
    page_editor: PageEditor,
    bookmark_manager: BookmarkManager,
    metadata_manager: MetadataManager,
}

impl Merger {
    /// Create a new merger with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the given inputs, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `inputs` is empty, or every input was skipped
    /// - An input fails to load or its range does not fit, and
    ///   `continue_on_error` is off
    /// - Assembling the page tree fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfedit::merge::{MergeInput, MergeOptions, Merger};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let inputs = vec![
    ///     MergeInput::new("cover.pdf"),
    ///     "report.pdf:2-".parse::<MergeInput>()?,
    /// ];
    /// let result = Merger::new().merge(&inputs, &MergeOptions::default()).await?;
    /// println!("{} pages", result.statistics.total_pages);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn merge(&self, inputs: &[MergeInput], options: &MergeOptions) -> Result<MergeResult> {
        if inputs.is_empty() {
            return Err(PdfEditError::NoFilesToMerge);
        }

        let merge_start = Instant::now();

        let mut reader = PdfReader::new();
        if let Some(password) = &options.password {
            reader = reader.with_password(password.clone());
        }

        let paths: Vec<PathBuf> = inputs.iter().map(|i| i.path.clone()).collect();
        let load_start = Instant::now();
        let (load_results, _) = reader.load_all(&paths, options.effective_jobs()).await;
        let load_time = load_start.elapsed();

        let mut selections = Vec::with_capacity(inputs.len());
        let mut skipped_files = Vec::new();

        for (input, result) in inputs.iter().zip(load_results) {
            let selected = result.and_then(|loaded| {
                let indices = match &input.range {
                    Some(range) => range.to_indices(loaded.page_count)?,
                    None => (0..loaded.page_count).collect(),
                };
                Ok(Selection { loaded, indices })
            });

            match selected {
                Ok(selection) => selections.push(selection),
                Err(e) if options.continue_on_error && !e.is_fatal() => {
                    tracing::warn!(path = %input.path.display(), error = %e, "skipping input");
                    skipped_files.push(input.path.clone());
                }
                Err(e) => return Err(e),
            }
        }

        if selections.is_empty() {
            return Err(PdfEditError::NoFilesToMerge);
        }

        let (document, bookmarks_added) = self.assemble(&selections, options)?;

        let statistics = MergeStatistics {
            files_merged: selections.len(),
            files_skipped: skipped_files.len(),
            total_pages: document.get_pages().len(),
            merge_time: merge_start.elapsed(),
            load_time,
            input_size: selections.iter().map(|s| s.loaded.file_size).sum(),
            bookmarks_added,
            compressed: options.compression != CompressionLevel::None,
        };

        tracing::debug!(
            files = statistics.files_merged,
            pages = statistics.total_pages,
            "merged documents"
        );

        Ok(MergeResult {
            document,
            statistics,
            merged_files: selections.into_iter().map(|s| s.loaded.path).collect(),
            skipped_files,
        })
    }

    /// Concatenate the selected pages into one document.
    fn assemble(&self, selections: &[Selection], options: &MergeOptions) -> Result<(Document, usize)> {
        let Some((first, rest)) = selections.split_first() else {
            return Err(PdfEditError::NoFilesToMerge);
        };

        let mut merged = self
            .page_editor
            .extract_pages(&first.loaded.document, &first.indices)
            .map_err(|e| merge_error(&first.loaded.path, e))?;
        let mut bookmarks = vec![BookmarkEntry::for_file(&first.loaded.path, 0)];

        for selection in rest {
            let at = self.page_editor.page_count(&merged);
            self.page_editor
                .import_pages(&mut merged, &selection.loaded.document, &selection.indices, at)
                .map_err(|e| merge_error(&selection.loaded.path, e))?;
            bookmarks.push(BookmarkEntry::for_file(&selection.loaded.path, at));
        }

        if let Some(rotation) = options.rotation {
            self.page_editor.rotate_all_pages(&mut merged, rotation)?;
        }

        let bookmarks_added = if options.bookmarks {
            self.bookmark_manager.add_bookmarks(&mut merged, &bookmarks)?
        } else {
            0
        };

        self.metadata_manager
            .set_metadata(&mut merged, &options.metadata)?;

        match options.compression {
            CompressionLevel::None => {}
            CompressionLevel::Standard => merged.compress(),
            CompressionLevel::Maximum => {
                merged.prune_objects();
                merged.compress();
            }
        }

        Ok((merged, bookmarks_added))
    }
}

fn merge_error(path: &Path, err: PdfEditError) -> PdfEditError {
    PdfEditError::merge_failed(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::tests::create_multi_page_pdf;
    use tempfile::TempDir;

    fn create_test_pdf(dir: &TempDir, name: &str, pages: usize) -> PathBuf {
        let path = dir.path().join(name);
        create_multi_page_pdf(pages).save(&path).unwrap();
        path
    }

    fn page_text(doc: &Document, index: usize) -> String {
        doc.extract_text(&[index as u32 + 1]).unwrap()
    }

    #[tokio::test]
    async fn test_merge_two_pdfs() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = vec![
            MergeInput::new(create_test_pdf(&temp_dir, "a.pdf", 2)),
            MergeInput::new(create_test_pdf(&temp_dir, "b.pdf", 3)),
        ];

        let result = Merger::new()
            .merge(&inputs, &MergeOptions::default())
            .await
            .unwrap();

        assert_eq!(result.statistics.files_merged, 2);
        assert_eq!(result.statistics.total_pages, 5);
        assert!(page_text(&result.document, 1).contains("Page 2"));
        assert!(page_text(&result.document, 2).contains("Page 1"));
        assert!(page_text(&result.document, 4).contains("Page 3"));
    }

    #[tokio::test]
    async fn test_merge_with_ranges() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = vec![
            MergeInput::new(create_test_pdf(&temp_dir, "a.pdf", 4))
                .with_range(PageRange::parse("4,1").unwrap()),
            MergeInput::new(create_test_pdf(&temp_dir, "b.pdf", 3))
                .with_range(PageRange::parse("2-").unwrap()),
        ];

        let result = Merger::new()
            .merge(&inputs, &MergeOptions::default())
            .await
            .unwrap();

        let doc = &result.document;
        assert_eq!(result.statistics.total_pages, 4);
        assert!(page_text(doc, 0).contains("Page 1"));
        assert!(page_text(doc, 1).contains("Page 4"));
        assert!(page_text(doc, 2).contains("Page 2"));
        assert!(page_text(doc, 3).contains("Page 3"));
    }

    #[tokio::test]
    async fn test_merge_bookmarks_point_at_each_file() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = vec![
            MergeInput::new(create_test_pdf(&temp_dir, "first.pdf", 3)),
            MergeInput::new(create_test_pdf(&temp_dir, "second.pdf", 1)),
        ];
        let options = MergeOptions {
            bookmarks: true,
            ..Default::default()
        };

        let result = Merger::new().merge(&inputs, &options).await.unwrap();

        assert_eq!(result.statistics.bookmarks_added, 2);
        assert_eq!(
            BookmarkManager::new().titles(&result.document),
            vec!["first", "second"]
        );
    }

    #[tokio::test]
    async fn test_merge_continue_on_error() {
        let temp_dir = TempDir::new().unwrap();
        let broken = temp_dir.path().join("broken.pdf");
        std::fs::write(&broken, b"garbage").unwrap();
        let inputs = vec![
            MergeInput::new(create_test_pdf(&temp_dir, "good.pdf", 2)),
            MergeInput::new(broken.clone()),
        ];

        let strict = Merger::new().merge(&inputs, &MergeOptions::default()).await;
        assert!(strict.is_err());

        let options = MergeOptions {
            continue_on_error: true,
            ..Default::default()
        };
        let result = Merger::new().merge(&inputs, &options).await.unwrap();
        assert_eq!(result.statistics.files_skipped, 1);
        assert_eq!(result.skipped_files, vec![broken]);
        assert_eq!(result.statistics.total_pages, 2);
    }

    #[tokio::test]
    async fn test_merge_range_out_of_bounds() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = vec![
            MergeInput::new(create_test_pdf(&temp_dir, "a.pdf", 2))
                .with_range(PageRange::parse("3").unwrap()),
        ];

        let err = Merger::new()
            .merge(&inputs, &MergeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PdfEditError::InvalidPageRange { .. }));
    }

    #[tokio::test]
    async fn test_merge_rotation_and_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = vec![MergeInput::new(create_test_pdf(&temp_dir, "a.pdf", 2))];
        let options = MergeOptions {
            rotation: Some(Rotation::Clockwise90),
            metadata: Metadata::new(Some("Merged".into()), None, None, None),
            compression: CompressionLevel::None,
            ..Default::default()
        };

        let result = Merger::new().merge(&inputs, &options).await.unwrap();

        let info = PageEditor::new().page_info(&result.document);
        assert!(info.iter().all(|p| p.rotation == 90));
        assert_eq!(
            MetadataManager::new().get_metadata(&result.document).title.as_deref(),
            Some("Merged")
        );
        assert!(!result.statistics.compressed);
    }

    #[tokio::test]
    async fn test_merge_no_inputs() {
        let err = Merger::new()
            .merge(&[], &MergeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PdfEditError::NoFilesToMerge));
    }

    #[test]
    fn test_merge_input_from_str() {
        let input: MergeInput = "report.pdf:1-3,7".parse().unwrap();
        assert_eq!(input.path, PathBuf::from("report.pdf"));
        assert_eq!(input.range.unwrap().to_string(), "1-3,7");

        let plain: MergeInput = "notes.pdf".parse().unwrap();
        assert!(plain.range.is_none());

        let drive: MergeInput = r"C:\docs\a.pdf".parse().unwrap();
        assert_eq!(drive.path, PathBuf::from(r"C:\docs\a.pdf"));
        assert!(drive.range.is_none());
    }

    #[test]
    fn test_merge_statistics() {
        let stats = MergeStatistics {
            files_merged: 3,
            files_skipped: 0,
            total_pages: 15,
            merge_time: Duration::from_secs(2),
            load_time: Duration::from_secs(1),
            input_size: 1024 * 1024,
            bookmarks_added: 3,
            compressed: true,
        };

        assert_eq!(stats.format_input_size(), "1.00 MB");
    }
}
