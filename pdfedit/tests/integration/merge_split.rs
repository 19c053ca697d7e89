//! Integration tests for merging and splitting.

use lopdf::Document;
use pdfedit::config::{Metadata, Rotation};
use pdfedit::io::PdfWriter;
use pdfedit::merge::{
    BookmarkManager, MergeInput, MergeOptions, MetadataManager, SplitMode, Splitter, merge_pdfs,
};
use pdfedit::range::PageRange;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::common::{document_texts, page_texts, write_pdf};

#[tokio::test]
async fn test_merge_with_ranges_bookmarks_and_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let intro = write_pdf(temp_dir.path(), "intro.pdf", "Intro", 2);
    let body = write_pdf(temp_dir.path(), "body.pdf", "Body", 5);
    let output = temp_dir.path().join("book.pdf");

    let inputs = vec![
        MergeInput::new(&intro),
        format!("{}:4-,1", body.display()).parse().unwrap(),
    ];
    let options = MergeOptions {
        bookmarks: true,
        metadata: Metadata::new(Some("Book".into()), None, None, None),
        jobs: Some(2),
        ..Default::default()
    };

    let (document, stats) = merge_pdfs(&inputs, &options).await.unwrap();
    assert_eq!(stats.files_merged, 2);
    assert_eq!(stats.total_pages, 5);
    assert_eq!(stats.bookmarks_added, 2);

    PdfWriter::new().save(&document, &output).await.unwrap();

    assert_eq!(
        page_texts(&output),
        vec!["Intro 1", "Intro 2", "Body 1", "Body 4", "Body 5"]
    );
    let saved = Document::load(&output).unwrap();
    assert_eq!(BookmarkManager::new().titles(&saved), vec!["intro", "body"]);
    assert_eq!(
        MetadataManager::new().get_metadata(&saved).title.as_deref(),
        Some("Book")
    );
}

#[tokio::test]
async fn test_merge_continue_on_error_skips_bad_input() {
    let temp_dir = TempDir::new().unwrap();
    let good = write_pdf(temp_dir.path(), "good.pdf", "Good", 1);
    let broken = temp_dir.path().join("broken.pdf");
    std::fs::write(&broken, b"%PDF-1.4\nthis is not a pdf").unwrap();

    let inputs = vec![
        MergeInput::new(&broken),
        MergeInput::new(&good),
        MergeInput::new(temp_dir.path().join("missing.pdf")),
    ];
    let options = MergeOptions {
        continue_on_error: true,
        rotation: Some(Rotation::Rotate180),
        ..Default::default()
    };

    let (document, stats) = merge_pdfs(&inputs, &options).await.unwrap();

    assert_eq!(stats.files_merged, 1);
    assert_eq!(stats.files_skipped, 2);
    assert_eq!(document_texts(&document), vec!["Good 1"]);

    let strict = MergeOptions::default();
    assert!(merge_pdfs(&inputs, &strict).await.is_err());
}

#[tokio::test]
async fn test_split_then_merge_restores_page_order() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_pdf(temp_dir.path(), "scan.pdf", "Scan", 7);
    let parts_dir = temp_dir.path().join("parts");

    let report = Splitter::new()
        .split_file(&source, &parts_dir, &SplitMode::EveryN(3))
        .await
        .unwrap();

    let names: Vec<PathBuf> = report.parts.iter().map(|p| p.path.clone()).collect();
    assert_eq!(
        names,
        vec![
            parts_dir.join("scan_1-3.pdf"),
            parts_dir.join("scan_4-6.pdf"),
            parts_dir.join("scan_7.pdf"),
        ]
    );
    assert_eq!(page_texts(&names[2]), vec!["Scan 7"]);

    let inputs: Vec<MergeInput> = names.iter().map(MergeInput::new).collect();
    let (merged, _) = merge_pdfs(&inputs, &MergeOptions::default())
        .await
        .unwrap();

    assert_eq!(document_texts(&merged), page_texts(&source));
}

#[tokio::test]
async fn test_split_by_ranges_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_pdf(temp_dir.path(), "doc.pdf", "Page", 4);
    let ranges = SplitMode::Ranges(PageRange::parse("3-4, 1").unwrap());

    let splitter = Splitter::new();
    splitter
        .split_file(&source, temp_dir.path(), &ranges)
        .await
        .unwrap();

    // Second run collides with the first one's output
    assert!(
        splitter
            .split_file(&source, temp_dir.path(), &ranges)
            .await
            .is_err()
    );

    let report = Splitter::new()
        .overwrite(true)
        .split_file(&source, temp_dir.path(), &ranges)
        .await
        .unwrap();
    assert_eq!(report.parts.len(), 2);
    assert_eq!(
        page_texts(&temp_dir.path().join("doc_3-4.pdf")),
        vec!["Page 3", "Page 4"]
    );
    assert_eq!(page_texts(&temp_dir.path().join("doc_1.pdf")), vec!["Page 1"]);
}
