//! Page range strings.
//!
//! Users select pages with strings such as `"1-3,5,7-9"`. Page numbers in
//! the string are 1-based, as they appear in a viewer; everything the
//! library does with the result is 0-based.
//!
//! Supported items, separated by commas:
//! - `"5"` - a single page
//! - `"2-4"` - an inclusive range
//! - `"7-"` - page 7 through the last page
//! - `"-3"` - the first page through page 3
//!
//! Whitespace is ignored and empty items (`"1,,3"`, a trailing comma) are
//! skipped.
//!
//! # Examples
//!
//! ```
//! use pdfedit::range::PageRange;
//!
//! let range = PageRange::parse("1-3,5,7-").unwrap();
//! assert_eq!(range.to_indices(8).unwrap(), vec![0, 1, 2, 4, 6, 7]);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{PdfEditError, Result};

/// A parsed page range specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    items: Vec<PageRangeItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageRangeItem {
    Single(u32),
    /// Inclusive on both ends. `None` on the right means "to the last page".
    Span(u32, Option<u32>),
}

impl PageRangeItem {
    /// Resolve to an inclusive 1-based span for a document of `page_count` pages.
    fn bounds(&self, page_count: u32) -> (u32, u32) {
        match *self {
            Self::Single(p) => (p, p),
            Self::Span(start, end) => (start, end.unwrap_or(page_count)),
        }
    }

    fn contains(&self, page: u32) -> bool {
        match *self {
            Self::Single(p) => p == page,
            Self::Span(start, None) => page >= start,
            Self::Span(start, Some(end)) => page >= start && page <= end,
        }
    }
}

impl fmt::Display for PageRangeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(p) => write!(f, "{p}"),
            Self::Span(start, Some(end)) => write!(f, "{start}-{end}"),
            Self::Span(start, None) => write!(f, "{start}-"),
        }
    }
}

impl PageRange {
    /// Parse a page range string.
    ///
    /// # Errors
    ///
    /// Returns [`PdfEditError::InvalidPageSpec`] if the string has no items,
    /// contains a non-numeric token or page `0`, an item with more than one
    /// dash, a bare dash, or a range whose start is after its end.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut items = Vec::new();

        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            items.push(parse_item(spec, part)?);
        }

        if items.is_empty() {
            return Err(PdfEditError::invalid_page_spec(
                spec,
                "page range cannot be empty",
            ));
        }

        Ok(Self { items })
    }

    /// A range selecting every page.
    pub fn all() -> Self {
        Self {
            items: vec![PageRangeItem::Span(1, None)],
        }
    }

    /// Check if a 1-based page number is selected.
    pub fn contains(&self, page: u32) -> bool {
        self.items.iter().any(|item| item.contains(page))
    }

    /// Selected 1-based page numbers up to `max_pages`, sorted and deduplicated.
    ///
    /// Pages beyond `max_pages` are silently dropped; use
    /// [`to_indices`](Self::to_indices) for bounds checking.
    pub fn to_pages(&self, max_pages: u32) -> Vec<u32> {
        (1..=max_pages).filter(|p| self.contains(*p)).collect()
    }

    /// Resolve the range against a document of `page_count` pages.
    ///
    /// Returns zero-based page indices, sorted ascending with duplicates
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`PdfEditError::InvalidPageRange`] if any item refers to a
    /// page past the end of the document, or if the document is empty.
    pub fn to_indices(&self, page_count: usize) -> Result<Vec<usize>> {
        let mut indices: Vec<usize> = self
            .groups(page_count)?
            .into_iter()
            .flatten()
            .collect();
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }

    /// Resolve each comma-separated item separately, in input order.
    ///
    /// Split-by-ranges writes one output file per group.
    pub fn groups(&self, page_count: usize) -> Result<Vec<Vec<usize>>> {
        let max = u32::try_from(page_count)
            .map_err(|_| PdfEditError::invalid_page_range(self.to_string(), page_count))?;

        self.items
            .iter()
            .map(|item| {
                let (start, end) = item.bounds(max);
                if max == 0 || end > max || start > end {
                    return Err(PdfEditError::invalid_page_range(
                        item.to_string(),
                        page_count,
                    ));
                }
                Ok((start..=end).map(|p| p as usize - 1).collect())
            })
            .collect()
    }

    /// Whether every item is a closed range or single page.
    pub fn is_bounded(&self) -> bool {
        self.items
            .iter()
            .all(|item| !matches!(item, PageRangeItem::Span(_, None)))
    }
}

fn parse_item(spec: &str, part: &str) -> Result<PageRangeItem> {
    let parse_page = |token: &str| -> Result<u32> {
        let token = token.trim();
        let page: u32 = token.parse().map_err(|_| {
            PdfEditError::invalid_page_spec(spec, format!("invalid page number '{token}'"))
        })?;
        if page == 0 {
            return Err(PdfEditError::invalid_page_spec(
                spec,
                "page numbers start at 1",
            ));
        }
        Ok(page)
    };

    let Some((left, right)) = part.split_once('-') else {
        return parse_page(part).map(PageRangeItem::Single);
    };

    if right.contains('-') {
        return Err(PdfEditError::invalid_page_spec(
            spec,
            format!("'{part}' has more than one '-'"),
        ));
    }

    let (left, right) = (left.trim(), right.trim());
    match (left.is_empty(), right.is_empty()) {
        (true, true) => Err(PdfEditError::invalid_page_spec(
            spec,
            "'-' needs a page number on at least one side",
        )),
        (true, false) => Ok(PageRangeItem::Span(1, Some(parse_page(right)?))),
        (false, true) => Ok(PageRangeItem::Span(parse_page(left)?, None)),
        (false, false) => {
            let start = parse_page(left)?;
            let end = parse_page(right)?;
            if start > end {
                return Err(PdfEditError::invalid_page_spec(
                    spec,
                    format!("range {start}-{end} ends before it starts"),
                ));
            }
            Ok(PageRangeItem::Span(start, Some(end)))
        }
    }
}

impl FromStr for PageRange {
    type Err = PdfEditError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// Parse `spec` and resolve it against a document of `page_count` pages.
///
/// Shorthand for `PageRange::parse(spec)?.to_indices(page_count)`.
pub fn parse_page_range(spec: &str, page_count: usize) -> Result<Vec<usize>> {
    PageRange::parse(spec)?.to_indices(page_count)
}
