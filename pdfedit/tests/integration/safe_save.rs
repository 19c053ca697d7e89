//! Integration tests for the safe-save protocol.

use pdfedit::config::{CompressionLevel, RetryPolicy, SaveOptions};
use pdfedit::error::PdfEditError;
use pdfedit::io::{PdfReader, PdfWriter, save_pdf};
use pdfedit::utils::backup_path;
use serial_test::serial;
use std::time::Duration;
use tempfile::TempDir;

use crate::common::{leftover_temp_files, page_texts, sample_pdf, temp_output_path, write_pdf};

#[tokio::test]
async fn test_save_replaces_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let target = write_pdf(temp_dir.path(), "doc.pdf", "Old", 1);

    let report = save_pdf(&sample_pdf("New", 3), &target).await.unwrap();

    assert_eq!(report.path, target);
    assert_eq!(report.attempts, 1);
    assert!(report.verified);
    assert_eq!(report.bytes_written, std::fs::metadata(&target).unwrap().len());
    assert_eq!(page_texts(&target), vec!["New 1", "New 2", "New 3"]);
    assert!(!backup_path(&target).exists());
    assert!(leftover_temp_files(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_save_to_temp_output_path() {
    let output = temp_output_path();

    PdfWriter::new()
        .save(&sample_pdf("Page", 2), &output)
        .await
        .unwrap();

    let loaded = PdfReader::new().load(&output).await.unwrap();
    assert_eq!(loaded.page_count, 2);
}

#[tokio::test]
async fn test_every_save_mode_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let modes = [
        SaveOptions::default(),
        SaveOptions {
            atomic: false,
            ..Default::default()
        },
        SaveOptions {
            compression: CompressionLevel::None,
            compact: false,
            verify: false,
            ..Default::default()
        },
        SaveOptions {
            compression: CompressionLevel::Maximum,
            retry: RetryPolicy::no_retry(),
            ..Default::default()
        },
    ];

    for (i, options) in modes.into_iter().enumerate() {
        let target = write_pdf(temp_dir.path(), &format!("doc{i}.pdf"), "Old", 1);
        PdfWriter::with_options(options)
            .save(&sample_pdf("Fresh", 2), &target)
            .await
            .unwrap();
        assert_eq!(page_texts(&target), vec!["Fresh 1", "Fresh 2"]);
    }

    assert!(leftover_temp_files(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_save_into_missing_directory_fails_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("missing").join("doc.pdf");

    let err = save_pdf(&sample_pdf("Page", 1), &target)
        .await
        .unwrap_err();

    assert!(matches!(err, PdfEditError::InvalidConfig { .. }));
    assert!(!target.exists());
}

#[tokio::test]
async fn test_invalid_retry_policy_is_rejected_before_writing() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("doc.pdf");
    let options = SaveOptions {
        retry: RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(1),
            ..Default::default()
        },
        ..Default::default()
    };

    let err = PdfWriter::with_options(options)
        .save(&sample_pdf("Page", 1), &target)
        .await
        .unwrap_err();

    assert!(matches!(err, PdfEditError::InvalidConfig { .. }));
    assert!(!target.exists());
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_read_only_directory_keeps_original() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let locked = temp_dir.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    let target = write_pdf(&locked, "doc.pdf", "Old", 2);
    let original = std::fs::read(&target).unwrap();

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();
    let result = save_pdf(&sample_pdf("New", 1), &target).await;
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    assert!(result.is_err());
    assert_eq!(std::fs::read(&target).unwrap(), original);
    assert!(leftover_temp_files(&locked).is_empty());
    assert!(!backup_path(&target).exists());
}

#[tokio::test]
async fn test_saving_over_a_directory_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("dir.pdf");
    std::fs::create_dir(&target).unwrap();

    let err = save_pdf(&sample_pdf("Page", 1), &target)
        .await
        .unwrap_err();

    assert!(matches!(err, PdfEditError::NotAFile { .. }));
    assert!(target.is_dir());
}
