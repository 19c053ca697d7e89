//! PDF metadata management.
//!
//! This module handles the document Info dictionary:
//! - Title, Author, Subject, Keywords
//! - Producer
//! - Modification date

use crate::config::Metadata;
use crate::error::{PdfEditError, Result};
use lopdf::{Dictionary, Document, Object, StringFormat};
use std::time::{SystemTime, UNIX_EPOCH};

/// Manager for PDF metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataManager;

impl MetadataManager {
    /// Create a new metadata manager.
    pub fn new() -> Self {
        Self
    }

    /// Set metadata on a document.
    ///
    /// Only fields present in `metadata` are written; the rest of the Info
    /// dictionary is kept. `Producer` and `ModDate` are always refreshed.
    ///
    /// # Errors
    ///
    /// Returns an error if the Info entry exists but is not a dictionary.
    pub fn set_metadata(&self, doc: &mut Document, metadata: &Metadata) -> Result<()> {
        if metadata.is_empty() {
            return Ok(());
        }

        let info_dict = info_dict_mut(doc)?;

        let fields = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Keywords", &metadata.keywords),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                info_dict.set(key, text_string(value));
            }
        }

        info_dict.set("Producer", text_string(concat!("pdfedit ", env!("CARGO_PKG_VERSION"))));
        info_dict.set("ModDate", text_string(&format_pdf_date(SystemTime::now())));

        Ok(())
    }

    /// Get metadata from a document.
    pub fn get_metadata(&self, doc: &Document) -> Metadata {
        let Some(info_dict) = info_dict(doc) else {
            return Metadata::default();
        };

        Metadata::new(
            get_string_field(info_dict, b"Title"),
            get_string_field(info_dict, b"Author"),
            get_string_field(info_dict, b"Subject"),
            get_string_field(info_dict, b"Keywords"),
        )
    }

    /// Producer string recorded in the document, if any.
    pub fn producer(&self, doc: &Document) -> Option<String> {
        info_dict(doc).and_then(|d| get_string_field(d, b"Producer"))
    }

    /// Check if a document has metadata.
    pub fn has_metadata(&self, doc: &Document) -> bool {
        doc.trailer.has(b"Info")
    }
}

fn info_dict(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Info dictionary, created and linked from the trailer if missing.
fn info_dict_mut(doc: &mut Document) -> Result<&mut Dictionary> {
    let info_id = match doc.trailer.get(b"Info").and_then(|i| i.as_reference()) {
        Ok(id) if doc.objects.contains_key(&id) => id,
        _ => {
            let id = doc.add_object(Dictionary::new());
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };

    match doc.get_object_mut(info_id) {
        Ok(Object::Dictionary(dict)) => Ok(dict),
        _ => Err(PdfEditError::MetadataFailed {
            reason: "Info entry is not a dictionary".to_string(),
        }),
    }
}

fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        // Non-ASCII text strings are UTF-16BE with a byte order mark.
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, or byte string).
fn get_string_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let Ok(Object::String(bytes, _)) = dict.get(key) else {
        return None;
    };

    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).ok()
    } else {
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Format a SystemTime as a PDF date string in UTC: `D:YYYYMMDDHHmmSSZ`.
fn format_pdf_date(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let days = (secs / 86_400) as i64;
    let time_of_day = secs % 86_400;
    let (year, month, day) = civil_from_days(days);

    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}Z",
        year,
        month,
        day,
        time_of_day / 3_600,
        (time_of_day % 3_600) / 60,
        time_of_day % 60
    )
}

/// Proleptic Gregorian date for a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::tests::create_multi_page_pdf;
    use rstest::rstest;
    use std::time::Duration;

    #[test]
    fn test_set_and_get_metadata() {
        let mut doc = create_multi_page_pdf(1);
        let manager = MetadataManager::new();

        let metadata = Metadata::new(
            Some("Test Title".to_string()),
            Some("Test Author".to_string()),
            Some("Test Subject".to_string()),
            Some("test, keywords".to_string()),
        );

        manager.set_metadata(&mut doc, &metadata).unwrap();

        assert!(manager.has_metadata(&doc));
        assert_eq!(manager.get_metadata(&doc), metadata);
        assert!(manager.producer(&doc).unwrap().starts_with("pdfedit"));
    }

    #[test]
    fn test_set_empty_metadata_is_noop() {
        let mut doc = create_multi_page_pdf(1);
        let manager = MetadataManager::new();

        manager.set_metadata(&mut doc, &Metadata::default()).unwrap();
        assert!(!manager.has_metadata(&doc));
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let mut doc = create_multi_page_pdf(1);
        let manager = MetadataManager::new();

        let first = Metadata::new(Some("Title".into()), Some("Author".into()), None, None);
        manager.set_metadata(&mut doc, &first).unwrap();
        let second = Metadata::new(Some("New Title".into()), None, None, None);
        manager.set_metadata(&mut doc, &second).unwrap();

        let retrieved = manager.get_metadata(&doc);
        assert_eq!(retrieved.title.as_deref(), Some("New Title"));
        assert_eq!(retrieved.author.as_deref(), Some("Author"));
    }

    #[test]
    fn test_non_ascii_title() {
        let mut doc = create_multi_page_pdf(1);
        let manager = MetadataManager::new();

        let metadata = Metadata::new(Some("Über Café".into()), None, None, None);
        manager.set_metadata(&mut doc, &metadata).unwrap();

        assert_eq!(manager.get_metadata(&doc).title.as_deref(), Some("Über Café"));
    }

    #[rstest]
    #[case(0, "D:19700101000000Z")]
    #[case(951_782_400, "D:20000229000000Z")]
    #[case(1_700_000_000, "D:20231114221320Z")]
    fn test_format_pdf_date(#[case] secs: u64, #[case] expected: &str) {
        let time = UNIX_EPOCH + Duration::from_secs(secs);
        assert_eq!(format_pdf_date(time), expected);
    }
}
