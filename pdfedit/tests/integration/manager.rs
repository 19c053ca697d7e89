//! End-to-end editing sessions through the PDF manager.

use lopdf::Document;
use pdfedit::config::{EditorConfig, Metadata, Rotation, SaveOptions};
use pdfedit::error::PdfEditError;
use pdfedit::manager::{Edit, PdfManager};
use pdfedit::merge::MetadataManager;
use pdfedit::pages::PageSize;
use pdfedit::range::PageRange;
use pdfedit::utils::backup_path;
use tempfile::TempDir;

use crate::common::{leftover_temp_files, page_texts, write_pdf};

#[tokio::test]
async fn test_edit_session_saves_in_place() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_pdf(temp_dir.path(), "report.pdf", "Report", 5);
    let appendix = write_pdf(temp_dir.path(), "appendix.pdf", "Appendix", 2);

    let mut manager = PdfManager::default();
    let page_count = manager.open(&path).await.unwrap();
    assert_eq!(page_count, 5);

    let doomed = PageRange::parse("2,4").unwrap().to_indices(page_count).unwrap();
    manager
        .apply(Edit::DeletePages { pages: doomed })
        .await
        .unwrap();
    manager
        .apply(Edit::RotatePages {
            pages: vec![0],
            rotation: Rotation::Clockwise90,
        })
        .await
        .unwrap();
    manager
        .apply(Edit::InsertFrom {
            path: appendix,
            range: None,
            at: 3,
        })
        .await
        .unwrap();
    manager
        .apply(Edit::MovePage { from: 2, to: 0 })
        .await
        .unwrap();
    assert!(manager.is_modified());

    manager.save().await.unwrap();
    assert!(!manager.is_modified());

    assert_eq!(
        page_texts(&path),
        vec!["Report 5", "Report 1", "Report 3", "Appendix 1", "Appendix 2"]
    );
    let saved = Document::load(&path).unwrap();
    let pages = saved.get_pages();
    let first_report_page = saved.get_dictionary(pages[&2]).unwrap();
    assert_eq!(first_report_page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);

    assert!(!backup_path(&path).exists());
    assert!(leftover_temp_files(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_save_as_leaves_original_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_pdf(temp_dir.path(), "in.pdf", "Page", 3);
    let copy = temp_dir.path().join("copy.pdf");
    let original = std::fs::read(&path).unwrap();

    let mut manager = PdfManager::default();
    manager.open(&path).await.unwrap();
    manager
        .apply(Edit::InsertBlank {
            at: 3,
            size: PageSize::MatchNeighbor,
        })
        .await
        .unwrap();
    manager.save_as(&copy).await.unwrap();

    assert_eq!(manager.path(), Some(copy.as_path()));
    assert_eq!(std::fs::read(&path).unwrap(), original);
    assert_eq!(Document::load(&copy).unwrap().get_pages().len(), 4);
}

#[tokio::test]
async fn test_undo_after_save_marks_modified() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_pdf(temp_dir.path(), "doc.pdf", "Page", 2);

    let mut manager = PdfManager::default();
    manager.open(&path).await.unwrap();
    manager
        .apply(Edit::Reorder { order: vec![1, 0] })
        .await
        .unwrap();
    manager.save().await.unwrap();

    manager.undo().unwrap();
    assert!(manager.is_modified());
    assert!(manager.close());
    assert!(!manager.is_open());

    assert_eq!(page_texts(&path), vec!["Page 2", "Page 1"]);
}

#[tokio::test]
async fn test_keep_backup_holds_previous_version() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_pdf(temp_dir.path(), "doc.pdf", "Page", 2);
    let original = std::fs::read(&path).unwrap();

    let mut manager = PdfManager::new(EditorConfig {
        save: SaveOptions {
            keep_backup: true,
            ..Default::default()
        },
        ..Default::default()
    });
    manager.open(&path).await.unwrap();
    manager
        .apply(Edit::SetMetadata(Metadata::new(
            Some("  Quarterly  ".into()),
            Some("Finance".into()),
            None,
            None,
        )))
        .await
        .unwrap();

    let report = manager.save().await.unwrap();

    assert_eq!(report.backup.as_deref(), Some(backup_path(&path).as_path()));
    assert_eq!(std::fs::read(backup_path(&path)).unwrap(), original);

    let saved = Document::load(&path).unwrap();
    let metadata = MetadataManager::new().get_metadata(&saved);
    assert_eq!(metadata.title.as_deref(), Some("Quarterly"));
    assert_eq!(metadata.author.as_deref(), Some("Finance"));
}

#[tokio::test]
async fn test_extract_to_new_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_pdf(temp_dir.path(), "doc.pdf", "Page", 6);
    let out = temp_dir.path().join("excerpt.pdf");

    let mut manager = PdfManager::default();
    manager.open(&path).await.unwrap();
    manager
        .extract_to(&PageRange::parse("5-,1").unwrap(), &out)
        .await
        .unwrap();

    assert_eq!(page_texts(&out), vec!["Page 1", "Page 5", "Page 6"]);
    assert!(!manager.is_modified());
}

#[tokio::test]
async fn test_failed_edit_does_not_count_as_change() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_pdf(temp_dir.path(), "doc.pdf", "Page", 2);

    let mut manager = PdfManager::default();
    manager.open(&path).await.unwrap();

    let err = manager
        .apply(Edit::MovePage { from: 0, to: 9 })
        .await
        .unwrap_err();
    assert!(matches!(err, PdfEditError::PageOutOfBounds { .. }));

    let err = manager
        .apply(Edit::InsertFrom {
            path: temp_dir.path().join("missing.pdf"),
            range: None,
            at: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PdfEditError::FileNotFound { .. }));

    assert!(!manager.is_modified());
    assert!(matches!(manager.undo(), Err(PdfEditError::NothingToUndo)));
}
