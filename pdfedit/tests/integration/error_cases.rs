//! Integration tests for error handling and edge cases.

use pdfedit::config::OverwriteMode;
use pdfedit::error::PdfEditError;
use pdfedit::io::PdfReader;
use pdfedit::manager::{Edit, PdfManager};
use pdfedit::range::{PageRange, parse_page_range};
use pdfedit::validation::Validator;
use rstest::rstest;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::common::write_pdf;

#[tokio::test]
async fn test_error_nonexistent_input() {
    let mut manager = PdfManager::default();
    let err = manager
        .open(&PathBuf::from("/nonexistent/file.pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, PdfEditError::FileNotFound { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(!manager.is_open());
}

#[tokio::test]
async fn test_error_not_a_pdf() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notes.pdf");
    std::fs::write(&path, b"just some text").unwrap();

    let err = PdfReader::new().load(&path).await.unwrap_err();
    assert!(matches!(err, PdfEditError::FailedToLoadPdf { .. }));
}

#[tokio::test]
async fn test_error_directory_input() {
    let temp_dir = TempDir::new().unwrap();
    let err = PdfReader::new().load(temp_dir.path()).await.unwrap_err();
    assert!(matches!(err, PdfEditError::NotAFile { .. }));
}

#[rstest]
#[case("")]
#[case(" , ")]
#[case("0")]
#[case("3-1")]
#[case("1-2-3")]
#[case("-")]
#[case("one")]
fn test_error_bad_range_syntax(#[case] spec: &str) {
    let err = PageRange::parse(spec).unwrap_err();
    assert!(matches!(err, PdfEditError::InvalidPageSpec { .. }), "{spec:?}");
}

#[test]
fn test_error_range_beyond_document() {
    let err = parse_page_range("2-9", 4).unwrap_err();
    assert!(matches!(
        err,
        PdfEditError::InvalidPageRange { total_pages: 4, .. }
    ));
}

#[tokio::test]
async fn test_error_delete_every_page() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_pdf(temp_dir.path(), "doc.pdf", "Page", 3);
    let original = std::fs::read(&path).unwrap();

    let mut manager = PdfManager::default();
    manager.open(&path).await.unwrap();
    let everything = parse_page_range("1-", 3).unwrap();
    let err = manager
        .apply(Edit::DeletePages { pages: everything })
        .await
        .unwrap_err();

    assert!(matches!(err, PdfEditError::WouldRemoveAllPages { .. }));
    assert_eq!(manager.page_count().unwrap(), 3);
    assert!(!manager.is_modified());
    assert_eq!(std::fs::read(&path).unwrap(), original);
}

#[tokio::test]
async fn test_error_editor_state() {
    let mut manager = PdfManager::default();

    assert!(matches!(
        manager.apply(Edit::MovePage { from: 0, to: 1 }).await,
        Err(PdfEditError::NoDocumentOpen)
    ));
    assert!(matches!(manager.undo(), Err(PdfEditError::NoDocumentOpen)));
    assert!(matches!(manager.save().await, Err(PdfEditError::NoDocumentOpen)));
    assert!(matches!(manager.repair(), Err(PdfEditError::NoDocumentOpen)));
}

#[tokio::test]
async fn test_error_output_is_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_pdf(temp_dir.path(), "doc.pdf", "Page", 1);
    let spelled_differently = temp_dir.path().join(".").join("doc.pdf");

    let err = Validator::new()
        .validate_output(&spelled_differently, &[input], OverwriteMode::Force)
        .await
        .unwrap_err();

    assert!(matches!(err, PdfEditError::InvalidConfig { .. }));
}

#[test]
fn test_exit_codes_separate_error_classes() {
    let not_found = PdfEditError::file_not_found(PathBuf::from("a.pdf"));
    let bad_range = PdfEditError::invalid_page_spec("x", "not a number");
    let exists = PdfEditError::output_exists(PathBuf::from("b.pdf"));

    assert_ne!(not_found.exit_code(), bad_range.exit_code());
    assert_ne!(bad_range.exit_code(), exists.exit_code());
    assert_eq!(PdfEditError::Cancelled.exit_code(), 130);
}
