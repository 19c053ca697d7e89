//! User-facing output.
//!
//! This module handles:
//! - Formatted status messages in quiet and verbose modes
//! - Summaries of saves, merges, splits and document inspections
//!
//! # Examples
//!
//! ```no_run
//! use pdfedit::output::OutputFormatter;
//!
//! let formatter = OutputFormatter::new(false, true);
//! formatter.info("Rotating pages");
//! formatter.success("Saved document.pdf");
//! ```

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter};

use crate::io::SaveReport;
use crate::merge::{MergeStatistics, SplitReport};
use crate::pages::PageInfo;
use crate::validation::DocumentInfo;

/// Display the outcome of a save.
pub fn display_save_report(formatter: &OutputFormatter, report: &SaveReport) {
    formatter.success(&format!(
        "Saved {} ({})",
        report.path.display(),
        report.format_file_size()
    ));

    if report.attempts > 1 {
        formatter.debug(&format!("Needed {} attempts", report.attempts));
    }
    if let Some(backup) = &report.backup {
        formatter.info(&format!("Backup kept at {}", backup.display()));
    }
    formatter.detail("Verified", if report.verified { "yes" } else { "no" });
    formatter.detail("Time", &format!("{:.2}s", report.duration.as_secs_f64()));
}

/// Display merge statistics.
pub fn display_merge_statistics(formatter: &OutputFormatter, stats: &MergeStatistics) {
    if stats.files_skipped > 0 {
        formatter.warning(&format!("Skipped {} file(s)", stats.files_skipped));
    }

    formatter.info(&format!(
        "Merged {} file(s) into {} pages ({} read)",
        stats.files_merged,
        stats.total_pages,
        stats.format_input_size()
    ));
    formatter.detail("Bookmarks", &stats.bookmarks_added.to_string());
    formatter.detail("Compressed", if stats.compressed { "yes" } else { "no" });
    formatter.detail(
        "Load time",
        &format!("{:.2}s", stats.load_time.as_secs_f64()),
    );
}

/// Display the parts written by a split.
pub fn display_split_report(formatter: &OutputFormatter, report: &SplitReport) {
    for (i, part) in report.parts.iter().enumerate() {
        formatter.list_item(
            i + 1,
            &format!("{} ({} pages)", part.path.display(), part.pages.len()),
        );
    }
    formatter.success(&format!(
        "Split {} pages into {} file(s)",
        report.source_pages,
        report.parts.len()
    ));
}

/// Display what a document contains.
pub fn display_document_info(formatter: &OutputFormatter, info: &DocumentInfo) {
    formatter.section(&info.path.display().to_string());
    formatter.field("Pages", &info.page_count.to_string());
    if let Some((major, minor)) = info.version {
        formatter.field("Version", &format!("{major}.{minor}"));
    }
    formatter.field("Size", &info.format_file_size());
    formatter.field("Encrypted", if info.is_encrypted { "yes" } else { "no" });
    if let Some((width, height)) = info.page_dimensions {
        formatter.field("Page size", &format!("{width:.0} x {height:.0} pt"));
    }

    let metadata = &info.metadata;
    for (label, value) in [
        ("Title", &metadata.title),
        ("Author", &metadata.author),
        ("Subject", &metadata.subject),
        ("Keywords", &metadata.keywords),
    ] {
        if let Some(value) = value {
            formatter.field(label, value);
        }
    }

    formatter.detail("Objects", &info.object_count.to_string());
    formatter.detail("Bookmarks", if info.has_bookmarks { "yes" } else { "no" });
}

/// Display one row per page.
pub fn display_page_list(formatter: &OutputFormatter, pages: &[PageInfo]) {
    for page in pages {
        formatter.table_row(&[
            &format!("{:>4}", page.index + 1),
            &format!("{:>7.1} x {:<7.1}", page.width, page.height),
            &format!("{:>3}°", page.rotation),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Metadata;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_display_helpers_in_quiet_mode() {
        let formatter = OutputFormatter::quiet();

        display_save_report(
            &formatter,
            &SaveReport {
                path: PathBuf::from("out.pdf"),
                bytes_written: 2048,
                attempts: 2,
                backup: Some(PathBuf::from("out.pdf.bak")),
                verified: true,
                duration: Duration::from_millis(15),
            },
        );

        display_document_info(
            &formatter,
            &DocumentInfo {
                path: PathBuf::from("in.pdf"),
                page_count: 2,
                version: Some((1, 7)),
                file_size: 1024,
                is_encrypted: false,
                object_count: 9,
                page_dimensions: Some((612.0, 792.0)),
                metadata: Metadata {
                    title: Some(String::from("Report")),
                    ..Default::default()
                },
                has_bookmarks: false,
            },
        );

        display_page_list(
            &formatter,
            &[PageInfo {
                index: 0,
                object_id: 3,
                width: 612.0,
                height: 792.0,
                rotation: 90,
            }],
        );
    }
}
