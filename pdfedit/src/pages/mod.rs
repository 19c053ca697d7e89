//! Page-level edits.
//!
//! This module handles structural page operations on an in-memory
//! [`lopdf::Document`]:
//! - Deleting, moving and reordering pages
//! - Rotating pages
//! - Inserting blank pages and pages copied from another document
//! - Extracting a subset of pages into a new document
//!
//! All page positions are zero-based indices. Every operation validates its
//! indices before touching the document, so a failed call leaves the
//! document unchanged.

pub mod tree;

use std::collections::HashSet;
use std::str::FromStr;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};

use crate::config::{Rotation, normalize_rotation};
use crate::error::{PdfEditError, Result};
use crate::utils::copy_references;

/// Size of a newly inserted page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// ISO A4 portrait, 595 x 842 points.
    #[default]
    A4,
    /// US Letter portrait, 612 x 792 points.
    Letter,
    /// Same media box as the page the blank page is inserted next to.
    MatchNeighbor,
    /// Explicit width and height in points.
    Custom {
        /// Width in points.
        width: f32,
        /// Height in points.
        height: f32,
    },
}

impl PageSize {
    /// Width and height in points for the fixed sizes.
    pub fn dimensions(&self) -> Option<(f32, f32)> {
        match *self {
            Self::A4 => Some((595.0, 842.0)),
            Self::Letter => Some((612.0, 792.0)),
            Self::MatchNeighbor => None,
            Self::Custom { width, height } => Some((width, height)),
        }
    }
}

impl FromStr for PageSize {
    type Err = PdfEditError;

    /// Parse `a4`, `letter`, `match` or `<width>x<height>` in points.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "a4" => Ok(Self::A4),
            "letter" => Ok(Self::Letter),
            "match" => Ok(Self::MatchNeighbor),
            other => {
                let invalid = || {
                    PdfEditError::invalid_config(format!(
                        "Invalid page size: {s}. Use a4, letter, match or WIDTHxHEIGHT"
                    ))
                };
                let (width, height) = other.split_once('x').ok_or_else(invalid)?;
                let width: f32 = width.trim().parse().map_err(|_| invalid())?;
                let height: f32 = height.trim().parse().map_err(|_| invalid())?;
                let usable = |v: f32| v.is_finite() && v > 0.0;
                if !(usable(width) && usable(height)) {
                    return Err(invalid());
                }
                Ok(Self::Custom { width, height })
            }
        }
    }
}

/// Summary of one page, as listed to a front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Zero-based position in the document.
    pub index: usize,
    /// Object number of the page dictionary.
    pub object_id: u32,
    /// Media box width in points.
    pub width: f32,
    /// Media box height in points.
    pub height: f32,
    /// Effective `/Rotate` value.
    pub rotation: i64,
}

/// Page editor for structural page operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageEditor;

impl PageEditor {
    /// Create a new page editor.
    pub fn new() -> Self {
        Self
    }

    /// Get the number of pages in a document.
    pub fn page_count(&self, doc: &Document) -> usize {
        doc.get_pages().len()
    }

    /// List every page with its size and rotation.
    pub fn page_info(&self, doc: &Document) -> Vec<PageInfo> {
        tree::page_ids(doc)
            .into_iter()
            .enumerate()
            .map(|(index, page_id)| {
                let (width, height) = tree::media_box(doc, page_id)
                    .map(|[x0, y0, x1, y1]| ((x1 - x0).abs(), (y1 - y0).abs()))
                    .unwrap_or((0.0, 0.0));
                PageInfo {
                    index,
                    object_id: page_id.0,
                    width,
                    height,
                    rotation: normalize_rotation(tree::rotation(doc, page_id)),
                }
            })
            .collect()
    }

    /// Delete the pages at the given indices.
    ///
    /// # Errors
    ///
    /// Returns an error if an index is out of bounds or if the call would
    /// delete every page.
    pub fn delete_pages(&self, doc: &mut Document, indices: &[usize]) -> Result<()> {
        let ids = tree::page_ids(doc);
        check_indices(indices, ids.len())?;

        let doomed: HashSet<usize> = indices.iter().copied().collect();
        if doomed.len() >= ids.len() {
            return Err(PdfEditError::WouldRemoveAllPages {
                total_pages: ids.len(),
            });
        }

        let kept: Vec<ObjectId> = ids
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !doomed.contains(i))
            .map(|(_, id)| id)
            .collect();

        tree::rebuild(doc, &kept)?;
        tracing::debug!(deleted = doomed.len(), remaining = kept.len(), "deleted pages");
        Ok(())
    }

    /// Rotate the pages at the given indices, relative to their current rotation.
    pub fn rotate_pages(
        &self,
        doc: &mut Document,
        indices: &[usize],
        rotation: Rotation,
    ) -> Result<()> {
        let ids = tree::page_ids(doc);
        check_indices(indices, ids.len())?;

        for &index in indices {
            let page_id = ids[index];
            let current = tree::rotation(doc, page_id);
            self.rotate_page(doc, page_id, rotation.apply_to(current))?;
        }

        tracing::debug!(pages = indices.len(), degrees = rotation.as_degrees(), "rotated pages");
        Ok(())
    }

    /// Rotate every page in the document.
    pub fn rotate_all_pages(&self, doc: &mut Document, rotation: Rotation) -> Result<()> {
        let all: Vec<usize> = (0..self.page_count(doc)).collect();
        self.rotate_pages(doc, &all, rotation)
    }

    /// Set an absolute rotation on the pages at the given indices.
    ///
    /// # Errors
    ///
    /// Returns an error if `degrees` is not a multiple of 90.
    pub fn set_rotation(&self, doc: &mut Document, indices: &[usize], degrees: i64) -> Result<()> {
        if degrees % 90 != 0 {
            return Err(PdfEditError::invalid_config(format!(
                "Invalid rotation: {degrees}. Must be a multiple of 90"
            )));
        }

        let ids = tree::page_ids(doc);
        check_indices(indices, ids.len())?;

        for &index in indices {
            self.rotate_page(doc, ids[index], normalize_rotation(degrees))?;
        }
        Ok(())
    }

    fn rotate_page(&self, doc: &mut Document, page_id: ObjectId, degrees: i64) -> Result<()> {
        tree::page_dict_mut(doc, page_id)?.set("Rotate", Object::Integer(degrees));
        Ok(())
    }

    /// Insert a blank page so that it ends up at index `at`.
    ///
    /// `at == page_count` appends. Returns the new page's object id.
    pub fn insert_blank_page(
        &self,
        doc: &mut Document,
        at: usize,
        size: PageSize,
    ) -> Result<ObjectId> {
        let mut ids = tree::page_ids(doc);
        if at > ids.len() {
            return Err(PdfEditError::page_out_of_bounds(at, ids.len()));
        }

        let media_box = match size.dimensions() {
            Some((width, height)) => [0.0, 0.0, width, height],
            None => {
                let neighbor = ids.get(at).or_else(|| ids.last()).copied();
                neighbor
                    .and_then(|id| tree::media_box(doc, id))
                    .unwrap_or([0.0, 0.0, 595.0, 842.0])
            }
        };

        let pages_id = tree::root_pages_id(doc)?;
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(media_box.iter().map(|v| Object::Real(*v)).collect()),
        );
        page.set("Resources", Object::Dictionary(Dictionary::new()));
        page.set("Rotate", Object::Integer(0));

        let page_id = doc.add_object(page);
        ids.insert(at, page_id);
        tree::rebuild(doc, &ids)?;

        tracing::debug!(at, "inserted blank page");
        Ok(page_id)
    }

    /// Copy pages from `source` into `doc`, starting at index `at`.
    ///
    /// The source is not modified. Every object the copied pages reference
    /// (content streams, fonts, images, annotations) is copied along with
    /// them under fresh object numbers.
    pub fn import_pages(
        &self,
        doc: &mut Document,
        source: &Document,
        indices: &[usize],
        at: usize,
    ) -> Result<Vec<ObjectId>> {
        let mut ids = tree::page_ids(doc);
        if at > ids.len() {
            return Err(PdfEditError::page_out_of_bounds(at, ids.len()));
        }

        let mut source = source.clone();
        let source_ids = tree::page_ids(&source);
        check_indices(indices, source_ids.len())?;

        // Materialize inherited attributes before the source tree is left behind.
        tree::rebuild(&mut source, &source_ids)?;
        source.renumber_objects_with(doc.max_id + 1);

        let renumbered = tree::page_ids(&source);
        let pages_id = tree::root_pages_id(doc)?;
        doc.max_id = doc.max_id.max(source.max_id);
        let mut imported = Vec::with_capacity(indices.len());

        for &index in indices {
            let page_id = renumbered[index];
            let mut page = source
                .get_dictionary(page_id)
                .map_err(|e| PdfEditError::page_tree(format!("Failed to get page: {e}")))?
                .clone();

            // The source Parent would drag the whole source tree along.
            page.set("Parent", Object::Reference(pages_id));

            // Same source page imported twice: the copy gets its own id.
            let target_id = if doc.objects.contains_key(&page_id) {
                doc.new_object_id()
            } else {
                page_id
            };
            let page_obj = Object::Dictionary(page);
            doc.objects.insert(target_id, page_obj.clone());
            copy_references(doc, &source, &page_obj);
            imported.push(target_id);
        }

        for (offset, &page_id) in imported.iter().enumerate() {
            ids.insert(at + offset, page_id);
        }
        tree::rebuild(doc, &ids)?;

        tracing::debug!(count = imported.len(), at, "imported pages");
        Ok(imported)
    }

    /// Move the page at `from` so that it ends up at index `to`.
    pub fn move_page(&self, doc: &mut Document, from: usize, to: usize) -> Result<()> {
        let mut ids = tree::page_ids(doc);
        check_indices(&[from, to], ids.len())?;

        if from == to {
            return Ok(());
        }

        let page = ids.remove(from);
        ids.insert(to, page);
        tree::rebuild(doc, &ids)
    }

    /// Reorder pages: `order[i]` is the current index of the page that
    /// should end up at position `i`.
    ///
    /// # Errors
    ///
    /// Returns an error unless `order` is a permutation of `0..page_count`.
    pub fn reorder(&self, doc: &mut Document, order: &[usize]) -> Result<()> {
        let ids = tree::page_ids(doc);
        check_indices(order, ids.len())?;

        let unique: HashSet<usize> = order.iter().copied().collect();
        if order.len() != ids.len() || unique.len() != ids.len() {
            return Err(PdfEditError::page_tree(format!(
                "Page order must list each of the {} page(s) exactly once",
                ids.len()
            )));
        }

        let reordered: Vec<ObjectId> = order.iter().map(|&i| ids[i]).collect();
        tree::rebuild(doc, &reordered)
    }

    /// Extract specific pages into a new document.
    ///
    /// The result keeps the source's metadata but drops its outline, since
    /// bookmarks may point at pages that were not extracted. Unreachable
    /// objects are pruned.
    pub fn extract_pages(&self, doc: &Document, indices: &[usize]) -> Result<Document> {
        let ids = tree::page_ids(doc);
        if indices.is_empty() {
            return Err(PdfEditError::page_tree("No pages selected for extraction"));
        }
        check_indices(indices, ids.len())?;

        let mut new_doc = doc.clone();
        let selected: Vec<ObjectId> = indices.iter().map(|&i| ids[i]).collect();
        tree::rebuild(&mut new_doc, &selected)?;

        if let Ok(catalog) = new_doc.catalog_mut() {
            catalog.remove(b"Outlines");
        }
        new_doc.prune_objects();

        Ok(new_doc)
    }
}

/// Ensure every index is below `page_count`.
fn check_indices(indices: &[usize], page_count: usize) -> Result<()> {
    match indices.iter().find(|&&i| i >= page_count) {
        Some(&index) => Err(PdfEditError::page_out_of_bounds(index, page_count)),
        None => Ok(()),
    }
}
