//! Splitting one PDF into several.
//!
//! Every part is written through the safe-save protocol, named after the
//! source file and the 1-based pages it holds: `report_3.pdf` for a single
//! page, `report_4-6.pdf` for a span.

use lopdf::Document;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::SaveOptions;
use crate::error::{PdfEditError, Result};
use crate::io::{PdfReader, PdfWriter};
use crate::pages::PageEditor;
use crate::range::PageRange;

/// How to cut a document into parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitMode {
    /// One part per page.
    EachPage,
    /// Consecutive chunks of `n` pages; the last one may be shorter.
    EveryN(usize),
    /// One part per comma-separated item of the range, in input order.
    Ranges(PageRange),
}

/// One written part.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPart {
    /// Where the part was written.
    pub path: PathBuf,

    /// Zero-based source page indices the part holds.
    pub pages: Vec<usize>,

    /// Size of the written file in bytes.
    pub bytes_written: u64,
}

/// Outcome of a split.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitReport {
    /// Page count of the source document.
    pub source_pages: usize,

    /// Parts in the order they were written.
    pub parts: Vec<SplitPart>,

    /// Wall time of the whole split.
    pub duration: Duration,
}

impl SplitReport {
    /// Total bytes written across all parts.
    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(|p| p.bytes_written).sum()
    }
}

/// Splits documents into parts.
#[derive(Debug, Clone)]
pub struct Splitter {
    writer: PdfWriter,
    page_editor: PageEditor,
    overwrite: bool,
}

impl Splitter {
    /// Create a splitter that refuses to overwrite existing files.
    pub fn new() -> Self {
        Self {
            writer: PdfWriter::with_options(SaveOptions::fresh_output()),
            page_editor: PageEditor::new(),
            overwrite: false,
        }
    }

    /// Save parts with `options`.
    pub fn with_save_options(mut self, options: SaveOptions) -> Self {
        self.writer = PdfWriter::with_options(options);
        self
    }

    /// Allow replacing existing part files.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Work out the page groups for a document of `page_count` pages.
    ///
    /// # Errors
    ///
    /// Returns an error for `EveryN(0)`, for ranges outside the document,
    /// and for ranges that list the same group twice.
    pub fn plan(&self, page_count: usize, mode: &SplitMode) -> Result<Vec<Vec<usize>>> {
        let groups: Vec<Vec<usize>> = match mode {
            SplitMode::EachPage => (0..page_count).map(|i| vec![i]).collect(),
            SplitMode::EveryN(0) => {
                return Err(PdfEditError::split_failed(
                    "chunk size must be at least 1",
                ));
            }
            SplitMode::EveryN(n) => (0..page_count)
                .collect::<Vec<_>>()
                .chunks(*n)
                .map(|chunk| chunk.to_vec())
                .collect(),
            SplitMode::Ranges(range) => range.groups(page_count)?,
        };

        let mut seen = HashSet::new();
        for group in &groups {
            if !seen.insert(group) {
                return Err(PdfEditError::split_failed(format!(
                    "pages {} are listed more than once",
                    part_label(group)
                )));
            }
        }

        Ok(groups)
    }

    /// Split a file into `out_dir`, naming parts after the file's stem.
    pub async fn split_file(
        &self,
        input: &Path,
        out_dir: &Path,
        mode: &SplitMode,
    ) -> Result<SplitReport> {
        let loaded = PdfReader::new().load(input).await?;
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("part");
        self.split(&loaded.document, stem, out_dir, mode).await
    }

    /// Split an in-memory document into `out_dir`.
    ///
    /// All part names are checked before anything is written, so an
    /// existing file aborts the split without leaving partial output.
    pub async fn split(
        &self,
        doc: &Document,
        stem: &str,
        out_dir: &Path,
        mode: &SplitMode,
    ) -> Result<SplitReport> {
        let start = Instant::now();
        let source_pages = self.page_editor.page_count(doc);
        let groups = self.plan(source_pages, mode)?;

        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| PdfEditError::FailedToCreateOutput {
                path: out_dir.to_path_buf(),
                source: e,
            })?;

        let targets: Vec<PathBuf> = groups
            .iter()
            .map(|group| out_dir.join(part_file_name(stem, group)))
            .collect();

        if !self.overwrite {
            for target in &targets {
                if self.writer.exists(target).await {
                    return Err(PdfEditError::output_exists(target.clone()));
                }
            }
        }

        let mut parts = Vec::with_capacity(groups.len());
        for (group, target) in groups.into_iter().zip(targets) {
            let part = self.page_editor.extract_pages(doc, &group)?;
            let report = self.writer.save(&part, &target).await?;
            tracing::debug!(path = %target.display(), pages = group.len(), "wrote part");
            parts.push(SplitPart {
                path: target,
                pages: group,
                bytes_written: report.bytes_written,
            });
        }

        Ok(SplitReport {
            source_pages,
            parts,
            duration: start.elapsed(),
        })
    }
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new()
    }
}

/// `<stem>_<n>.pdf` or `<stem>_<first>-<last>.pdf`, 1-based.
pub fn part_file_name(stem: &str, pages: &[usize]) -> String {
    format!("{stem}_{}.pdf", part_label(pages))
}

fn part_label(pages: &[usize]) -> String {
    match (pages.first(), pages.last()) {
        (Some(first), Some(last)) if first != last => format!("{}-{}", first + 1, last + 1),
        (Some(first), _) => format!("{}", first + 1),
        _ => String::from("empty"),
    }
}
