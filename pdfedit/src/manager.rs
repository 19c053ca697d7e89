//! The PDF manager: one open document, edits, history and saving.
//!
//! A front-end talks to the core through [`PdfManager`]. It opens a file,
//! lists its pages, applies [`Edit`]s and saves the result back through the
//! safe-save protocol.
//!
//! Edits are transactional. The state before an edit is kept on the undo
//! history, and a failing edit leaves the document exactly as it was.
//!
//! # Examples
//!
//! ```no_run
//! use pdfedit::manager::{Edit, PdfManager};
//! use pdfedit::config::{EditorConfig, Rotation};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut manager = PdfManager::new(EditorConfig::default());
//! manager.open(Path::new("scan.pdf")).await?;
//! manager
//!     .apply(Edit::RotatePages {
//!         pages: vec![0, 2],
//!         rotation: Rotation::Clockwise90,
//!     })
//!     .await?;
//! manager.save().await?;
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::config::{EditorConfig, Metadata, Rotation};
use crate::error::{PdfEditError, Result};
use crate::io::{PdfReader, PdfWriter, SaveReport};
use crate::merge::MetadataManager;
use crate::pages::{PageEditor, PageInfo, PageSize, tree};
use crate::range::PageRange;
use crate::text;

/// A structural change to the open document.
///
/// Page indices are zero-based.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Remove the given pages. At least one page must remain.
    DeletePages {
        /// Pages to remove.
        pages: Vec<usize>,
    },
    /// Rotate the given pages relative to their current rotation.
    RotatePages {
        /// Pages to rotate.
        pages: Vec<usize>,
        /// Quarter turns to add.
        rotation: Rotation,
    },
    /// Set an absolute rotation on the given pages.
    SetRotation {
        /// Pages to change.
        pages: Vec<usize>,
        /// Multiple of 90.
        degrees: i64,
    },
    /// Insert an empty page before `at`; `at == page_count` appends.
    InsertBlank {
        /// Insert position.
        at: usize,
        /// Size of the new page.
        size: PageSize,
    },
    /// Copy pages from another file before `at`.
    InsertFrom {
        /// Source file.
        path: PathBuf,
        /// Pages of the source to copy; all pages if `None`.
        range: Option<PageRange>,
        /// Insert position.
        at: usize,
    },
    /// Move one page to a new position.
    MovePage {
        /// Current index.
        from: usize,
        /// Index after the move.
        to: usize,
    },
    /// Put pages in a new order; `order[i]` is the old index of new page `i`.
    Reorder {
        /// A permutation of all page indices.
        order: Vec<usize>,
    },
    /// Update the document information dictionary.
    SetMetadata(Metadata),
}

impl Edit {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeletePages { .. } => "delete-pages",
            Self::RotatePages { .. } => "rotate-pages",
            Self::SetRotation { .. } => "set-rotation",
            Self::InsertBlank { .. } => "insert-blank",
            Self::InsertFrom { .. } => "insert-from",
            Self::MovePage { .. } => "move-page",
            Self::Reorder { .. } => "reorder",
            Self::SetMetadata(_) => "set-metadata",
        }
    }
}

/// What [`PdfManager::repair`] changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    /// Page tree entries that pointed nowhere.
    pub dangling_kids_removed: usize,

    /// Unreachable objects dropped.
    pub objects_pruned: usize,

    /// Page count after the repair.
    pub page_count: usize,
}

/// A document state on the history, tagged so that saved states can be
/// recognized after undo and redo.
#[derive(Debug, Clone)]
struct Revision {
    document: Document,
    id: u64,
}

#[derive(Debug)]
struct OpenDocument {
    current: Revision,
    path: Option<PathBuf>,
    saved_id: Option<u64>,
    undo: VecDeque<Revision>,
    redo: Vec<Revision>,
    next_id: u64,
}

impl OpenDocument {
    fn new(document: Document, path: Option<PathBuf>, saved: bool) -> Self {
        Self {
            current: Revision { document, id: 0 },
            saved_id: saved.then_some(0),
            path,
            undo: VecDeque::new(),
            redo: Vec::new(),
            next_id: 1,
        }
    }

    fn is_modified(&self) -> bool {
        self.saved_id != Some(self.current.id)
    }

    /// Record `previous` as the state before the current one.
    fn commit(&mut self, previous: Document, history_limit: usize) {
        let id = self.next_id;
        self.next_id += 1;

        let prior_id = std::mem::replace(&mut self.current.id, id);
        if history_limit > 0 {
            self.undo.push_back(Revision {
                document: previous,
                id: prior_id,
            });
            while self.undo.len() > history_limit {
                self.undo.pop_front();
            }
        }
        self.redo.clear();
    }
}

/// Coordinates open, edit and save on a single PDF document.
#[derive(Debug)]
pub struct PdfManager {
    config: EditorConfig,
    page_editor: PageEditor,
    metadata_manager: MetadataManager,
    open: Option<OpenDocument>,
}

impl PdfManager {
    /// Create a manager with no open document.
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            page_editor: PageEditor::new(),
            metadata_manager: MetadataManager::new(),
            open: None,
        }
    }

    /// The manager's configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    fn reader(&self, verify: bool) -> PdfReader {
        let reader = if verify {
            PdfReader::new()
        } else {
            PdfReader::without_verification()
        };
        match &self.config.password {
            Some(password) => reader.with_password(password.clone()),
            None => reader,
        }
    }

    fn writer(&self) -> PdfWriter {
        PdfWriter::with_options(self.config.save.clone())
    }

    /// Open `path`, replacing any open document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or has no pages. The
    /// previously open document stays open in that case.
    pub async fn open(&mut self, path: &Path) -> Result<usize> {
        let reader = self.reader(true);
        self.open_with(path, reader).await
    }

    /// Open an encrypted file with `password`.
    pub async fn open_with_password(&mut self, path: &Path, password: &str) -> Result<usize> {
        let reader = self.reader(true).with_password(password);
        self.open_with(path, reader).await
    }

    /// Open a file without requiring pages, for [`repair`](Self::repair).
    pub async fn open_unverified(&mut self, path: &Path) -> Result<usize> {
        let reader = self.reader(false);
        self.open_with(path, reader).await
    }

    async fn open_with(&mut self, path: &Path, reader: PdfReader) -> Result<usize> {
        let loaded = reader.load(path).await?;
        let page_count = loaded.page_count;

        self.close();
        self.open = Some(OpenDocument::new(loaded.document, Some(loaded.path), true));

        tracing::debug!(path = %path.display(), page_count, "opened document");
        Ok(page_count)
    }

    /// Take ownership of an in-memory document.
    ///
    /// Without a `path` the document can only be written with
    /// [`save_as`](Self::save_as). It starts out modified.
    pub fn open_document(&mut self, document: Document, path: Option<PathBuf>) {
        self.close();
        self.open = Some(OpenDocument::new(document, path, false));
    }

    /// Close the open document, discarding unsaved changes.
    ///
    /// Returns `true` if unsaved changes were discarded.
    pub fn close(&mut self) -> bool {
        let Some(open) = self.open.take() else {
            return false;
        };

        let discarded = open.is_modified();
        if discarded {
            tracing::warn!(
                path = ?open.path,
                "closing document with unsaved changes"
            );
        }
        discarded
    }

    /// Whether a document is open.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Whether the open document differs from what was last loaded or saved.
    pub fn is_modified(&self) -> bool {
        self.open.as_ref().is_some_and(OpenDocument::is_modified)
    }

    /// Path the document is saved to.
    pub fn path(&self) -> Option<&Path> {
        self.open.as_ref().and_then(|o| o.path.as_deref())
    }

    /// The open document.
    pub fn document(&self) -> Result<&Document> {
        Ok(&self.state()?.current.document)
    }

    fn state(&self) -> Result<&OpenDocument> {
        self.open.as_ref().ok_or(PdfEditError::NoDocumentOpen)
    }

    fn state_mut(&mut self) -> Result<&mut OpenDocument> {
        self.open.as_mut().ok_or(PdfEditError::NoDocumentOpen)
    }

    /// Number of pages in the open document.
    pub fn page_count(&self) -> Result<usize> {
        Ok(self.page_editor.page_count(self.document()?))
    }

    /// List the pages of the open document.
    pub fn pages(&self) -> Result<Vec<PageInfo>> {
        Ok(self.page_editor.page_info(self.document()?))
    }

    /// Extracted text of one page.
    pub fn page_text(&self, index: usize) -> Result<String> {
        text::page_text(self.document()?, index)
    }

    /// Number of edits that can be undone.
    pub fn undo_depth(&self) -> usize {
        self.open.as_ref().map_or(0, |o| o.undo.len())
    }

    /// Number of undone edits that can be redone.
    pub fn redo_depth(&self) -> usize {
        self.open.as_ref().map_or(0, |o| o.redo.len())
    }

    /// Apply an edit to the open document.
    ///
    /// # Errors
    ///
    /// Returns the edit's error, with the document unchanged.
    pub async fn apply(&mut self, edit: Edit) -> Result<()> {
        self.state()?;
        let source = match &edit {
            Edit::InsertFrom { path, .. } => Some(self.reader(true).load(path).await?.document),
            _ => None,
        };

        let editor = self.page_editor;
        let metadata_manager = self.metadata_manager;
        let history_limit = self.config.history_limit;
        let open = self.state_mut()?;

        let previous = open.current.document.clone();
        let doc = &mut open.current.document;

        let outcome = match &edit {
            Edit::DeletePages { pages } => editor.delete_pages(doc, pages),
            Edit::RotatePages { pages, rotation } => editor.rotate_pages(doc, pages, *rotation),
            Edit::SetRotation { pages, degrees } => editor.set_rotation(doc, pages, *degrees),
            Edit::InsertBlank { at, size } => {
                editor.insert_blank_page(doc, *at, *size).map(|_| ())
            }
            Edit::InsertFrom { range, at, .. } => match &source {
                Some(source) => {
                    let count = editor.page_count(source);
                    let indices = match range {
                        Some(range) => range.to_indices(count),
                        None => Ok((0..count).collect()),
                    };
                    indices.and_then(|indices| {
                        editor.import_pages(doc, source, &indices, *at).map(|_| ())
                    })
                }
                None => Err(PdfEditError::other("source document was not loaded")),
            },
            Edit::MovePage { from, to } => editor.move_page(doc, *from, *to),
            Edit::Reorder { order } => editor.reorder(doc, order),
            Edit::SetMetadata(metadata) => metadata_manager.set_metadata(doc, metadata),
        };

        match outcome {
            Ok(()) => {
                open.commit(previous, history_limit);
                tracing::debug!(edit = edit.name(), "applied edit");
                Ok(())
            }
            Err(e) => {
                open.current.document = previous;
                tracing::debug!(edit = edit.name(), error = %e, "edit failed, document restored");
                Err(e)
            }
        }
    }

    /// Revert the most recent edit.
    pub fn undo(&mut self) -> Result<()> {
        let open = self.state_mut()?;
        let previous = open.undo.pop_back().ok_or(PdfEditError::NothingToUndo)?;
        let current = std::mem::replace(&mut open.current, previous);
        open.redo.push(current);
        Ok(())
    }

    /// Re-apply the most recently undone edit.
    pub fn redo(&mut self) -> Result<()> {
        let open = self.state_mut()?;
        let next = open.redo.pop().ok_or(PdfEditError::NothingToRedo)?;
        let current = std::mem::replace(&mut open.current, next);
        open.undo.push_back(current);
        Ok(())
    }

    /// Save to the document's path through the safe-save protocol.
    ///
    /// # Errors
    ///
    /// Returns [`PdfEditError::NoPath`] for documents opened from memory,
    /// or the save error. The file on disk is intact after a failure.
    pub async fn save(&mut self) -> Result<SaveReport> {
        let path = self
            .state()?
            .path
            .clone()
            .ok_or(PdfEditError::NoPath)?;
        self.save_to(&path).await
    }

    /// Save to `path` and make it the document's path.
    pub async fn save_as(&mut self, path: &Path) -> Result<SaveReport> {
        let report = self.save_to(path).await?;
        self.state_mut()?.path = Some(path.to_path_buf());
        Ok(report)
    }

    async fn save_to(&mut self, path: &Path) -> Result<SaveReport> {
        let writer = self.writer();
        let (report, id) = {
            let open = self.state()?;
            (
                writer.save(&open.current.document, path).await?,
                open.current.id,
            )
        };
        self.state_mut()?.saved_id = Some(id);
        Ok(report)
    }

    /// Write the selected pages to a new file.
    ///
    /// The open document is not changed.
    pub async fn extract_to(&self, range: &PageRange, path: &Path) -> Result<SaveReport> {
        let doc = self.document()?;
        let indices = range.to_indices(self.page_editor.page_count(doc))?;
        let part = self.page_editor.extract_pages(doc, &indices)?;
        self.writer().save(&part, path).await
    }

    /// Rebuild the page tree and drop unreachable objects.
    ///
    /// Dangling kids are removed, nested page nodes are flattened into the
    /// root with `Count` fixed, and objects are pruned and renumbered. The
    /// repair is an edit: it can be undone.
    pub fn repair(&mut self) -> Result<RepairReport> {
        let history_limit = self.config.history_limit;
        let open = self.state_mut()?;
        let previous = open.current.document.clone();

        match repair_document(&mut open.current.document) {
            Ok(report) => {
                open.commit(previous, history_limit);
                tracing::debug!(
                    dangling = report.dangling_kids_removed,
                    pruned = report.objects_pruned,
                    "repaired document"
                );
                Ok(report)
            }
            Err(e) => {
                open.current.document = previous;
                Err(e)
            }
        }
    }
}

impl Default for PdfManager {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

fn repair_document(doc: &mut Document) -> Result<RepairReport> {
    let dangling_kids_removed = tree::drop_dangling_kids(doc)?;
    let page_ids = tree::page_ids(doc);
    tree::rebuild(doc, &page_ids)?;

    let objects_pruned = doc.prune_objects().len();
    doc.renumber_objects();

    Ok(RepairReport {
        dangling_kids_removed,
        objects_pruned,
        page_count: doc.get_pages().len(),
    })
}
