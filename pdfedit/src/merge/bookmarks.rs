//! Bookmark (outline) management for PDFs.
//!
//! Merged documents get one top-level bookmark per input file, pointing at
//! the first page that file contributed.

use crate::error::{PdfEditError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::path::Path;

use crate::pages::tree;

/// A bookmark to create: title and zero-based target page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkEntry {
    /// Text shown in the viewer's outline panel.
    pub title: String,

    /// Zero-based index of the destination page.
    pub page_index: usize,
}

impl BookmarkEntry {
    /// Bookmark titled after a file's name.
    pub fn for_file(path: &Path, page_index: usize) -> Self {
        let title = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
            .to_string();
        Self { title, page_index }
    }
}

/// Manager for PDF bookmarks (outlines).
#[derive(Debug, Default, Clone, Copy)]
pub struct BookmarkManager;

impl BookmarkManager {
    /// Create a new bookmark manager.
    pub fn new() -> Self {
        Self
    }

    /// Replace the document outline with a flat list of bookmarks.
    ///
    /// Returns the number of bookmarks created.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry points past the last page or the
    /// catalog cannot be updated.
    pub fn add_bookmarks(&self, doc: &mut Document, entries: &[BookmarkEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let pages = tree::page_ids(doc);
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let page_id = pages.get(entry.page_index).copied().ok_or_else(|| {
                PdfEditError::BookmarkFailed {
                    reason: format!(
                        "'{}' points at page {} but the document has {} page(s)",
                        entry.title,
                        entry.page_index + 1,
                        pages.len()
                    ),
                }
            })?;
            items.push((entry.title.as_str(), page_id));
        }

        self.create_outline_structure(doc, &items)?;
        Ok(items.len())
    }

    /// Create the PDF outline structure.
    fn create_outline_structure(&self, doc: &mut Document, items: &[(&str, ObjectId)]) -> Result<()> {
        let outline_id = doc.new_object_id();

        let mut item_ids = Vec::with_capacity(items.len());
        for &(title, page_id) in items {
            let item_id = doc.new_object_id();
            item_ids.push(item_id);

            // [page /XYZ null null null]: keep the viewer's current zoom.
            let dest = vec![
                Object::Reference(page_id),
                Object::Name(b"XYZ".to_vec()),
                Object::Null,
                Object::Null,
                Object::Null,
            ];

            let mut item_dict = Dictionary::new();
            item_dict.set(
                "Title",
                Object::String(title.as_bytes().to_vec(), StringFormat::Literal),
            );
            item_dict.set("Parent", Object::Reference(outline_id));
            item_dict.set("Dest", Object::Array(dest));

            doc.objects.insert(item_id, Object::Dictionary(item_dict));
        }

        for (i, &item_id) in item_ids.iter().enumerate() {
            if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(item_id) {
                if i > 0 {
                    dict.set("Prev", Object::Reference(item_ids[i - 1]));
                }
                if let Some(&next) = item_ids.get(i + 1) {
                    dict.set("Next", Object::Reference(next));
                }
            }
        }

        let mut outline_dict = Dictionary::new();
        outline_dict.set("Type", Object::Name(b"Outlines".to_vec()));
        outline_dict.set("Count", Object::Integer(item_ids.len() as i64));
        if let (Some(&first), Some(&last)) = (item_ids.first(), item_ids.last()) {
            outline_dict.set("First", Object::Reference(first));
            outline_dict.set("Last", Object::Reference(last));
        }

        doc.objects
            .insert(outline_id, Object::Dictionary(outline_dict));

        let catalog = doc
            .catalog_mut()
            .map_err(|e| PdfEditError::BookmarkFailed {
                reason: format!("Failed to get catalog: {e}"),
            })?;
        catalog.set("Outlines", Object::Reference(outline_id));

        Ok(())
    }

    /// Titles of the top-level bookmarks, in order.
    pub fn titles(&self, doc: &Document) -> Vec<String> {
        let first = doc
            .catalog()
            .and_then(|c| c.get(b"Outlines"))
            .and_then(|o| o.as_reference())
            .and_then(|id| doc.get_dictionary(id))
            .and_then(|d| d.get(b"First"))
            .and_then(|f| f.as_reference());

        let mut titles = Vec::new();
        let mut next = first.ok();
        while let Some(id) = next {
            let Ok(item) = doc.get_dictionary(id) else {
                break;
            };
            if let Ok(Object::String(bytes, _)) = item.get(b"Title") {
                titles.push(String::from_utf8_lossy(bytes).into_owned());
            }
            next = item.get(b"Next").and_then(|n| n.as_reference()).ok();
            if titles.len() > doc.objects.len() {
                break;
            }
        }
        titles
    }

    /// Check if a document has bookmarks.
    pub fn has_bookmarks(&self, doc: &Document) -> bool {
        doc.catalog()
            .map(|catalog| catalog.has(b"Outlines"))
            .unwrap_or(false)
    }

    /// Remove all bookmarks from a document.
    pub fn remove_bookmarks(&self, doc: &mut Document) {
        if let Ok(catalog) = doc.catalog_mut() {
            catalog.remove(b"Outlines");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::tests::create_multi_page_pdf;

    fn entry(title: &str, page_index: usize) -> BookmarkEntry {
        BookmarkEntry {
            title: title.to_string(),
            page_index,
        }
    }

    #[test]
    fn test_add_bookmarks_empty() {
        let mut doc = create_multi_page_pdf(5);
        let manager = BookmarkManager::new();

        assert_eq!(manager.add_bookmarks(&mut doc, &[]).unwrap(), 0);
        assert!(!manager.has_bookmarks(&doc));
    }

    #[test]
    fn test_add_bookmarks_points_at_pages() {
        let mut doc = create_multi_page_pdf(10);
        let manager = BookmarkManager::new();

        let count = manager
            .add_bookmarks(&mut doc, &[entry("intro", 0), entry("appendix", 7)])
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(manager.titles(&doc), vec!["intro", "appendix"]);
    }

    #[test]
    fn test_add_bookmarks_out_of_range() {
        let mut doc = create_multi_page_pdf(2);
        let err = BookmarkManager::new()
            .add_bookmarks(&mut doc, &[entry("late", 2)])
            .unwrap_err();
        assert!(matches!(err, PdfEditError::BookmarkFailed { .. }));
    }

    #[test]
    fn test_entry_for_file_uses_stem() {
        let entry = BookmarkEntry::for_file(Path::new("/tmp/chapter-1.pdf"), 4);
        assert_eq!(entry.title, "chapter-1");
        assert_eq!(entry.page_index, 4);
    }

    #[test]
    fn test_remove_bookmarks() {
        let mut doc = create_multi_page_pdf(3);
        let manager = BookmarkManager::new();

        manager.add_bookmarks(&mut doc, &[entry("a", 0)]).unwrap();
        assert!(manager.has_bookmarks(&doc));

        manager.remove_bookmarks(&mut doc);
        assert!(!manager.has_bookmarks(&doc));
        assert!(manager.titles(&doc).is_empty());
    }
}
