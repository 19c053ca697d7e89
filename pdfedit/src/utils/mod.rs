//! Utilities for path collection, object copying and size formatting.

use crate::{Result, error::PdfEditError};
use lopdf::{Document, Object};
use std::path::{Path, PathBuf};

/// Expand multiple glob patterns into filesystem paths.
///
/// Accepts anything iterable with items that convert to `&str`, e.g.:
/// `&[&str]`, `Vec<String>`, or `Vec<&str>`. A pattern without glob
/// metacharacters that matches nothing is kept as a literal path, so the
/// caller reports "file not found" instead of silently dropping it.
///
/// Errors:
/// - Propagates `glob` parse errors.
/// - Propagates filesystem errors from glob iterator.
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns.into_iter() {
        let pattern = pattern.as_ref();
        let mut paths = collect_paths_for_pattern(pattern)?;
        if paths.is_empty() && !is_glob(pattern) {
            paths.push(PathBuf::from(pattern));
        }
        resolved_paths.extend(paths);
    }

    Ok(resolved_paths)
}

/// Expand a single glob pattern into filesystem paths, sorted.
fn collect_paths_for_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut resolved_paths = Vec::new();

    let paths = glob::glob(pattern).map_err(|err| PdfEditError::invalid_config(err.to_string()))?;

    for entry in paths {
        let path = entry.map_err(|err| PdfEditError::other(err.to_string()))?;
        resolved_paths.push(path);
    }

    Ok(resolved_paths)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Copy object references from one PDF document to another.
///
/// If `obj` is a reference, this walks the structure recursively and inserts
/// missing referenced objects into the `target` document. Objects already
/// present in `target` are not followed.
pub fn copy_references(target: &mut Document, source: &Document, obj: &Object) {
    match obj {
        Object::Reference(ref_id) => {
            if !target.objects.contains_key(ref_id)
                && let Ok(referenced_obj) = source.get_object(*ref_id)
            {
                target.objects.insert(*ref_id, referenced_obj.clone());
                copy_references(target, source, referenced_obj);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                copy_references(target, source, value);
            }
        }
        Object::Array(arr) => {
            for item in arr {
                copy_references(target, source, item);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                copy_references(target, source, value);
            }
        }
        _ => {}
    }
}

/// Preferred path of the backup copy kept next to `path` during a save.
///
/// `report.pdf` becomes `report.pdf.bak`. A save that finds this name taken
/// picks a unique one instead.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use tempfile::TempDir;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(100), "100 bytes");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_file_size(1536 * 1024), "1.50 MB");
        assert_eq!(format_file_size(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/tmp/docs/report.pdf")),
            PathBuf::from("/tmp/docs/report.pdf.bak")
        );
        assert_eq!(backup_path(Path::new("a.pdf")), PathBuf::from("a.pdf.bak"));
    }

    #[test]
    fn test_collect_paths_sorted_and_literal_fallback() {
        let dir = TempDir::new().unwrap();
        for name in ["b.pdf", "a.pdf", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let pattern = format!("{}/*.pdf", dir.path().display());
        let missing = dir.path().join("missing.pdf").display().to_string();
        let paths = collect_paths_for_patterns([pattern.as_str(), missing.as_str()]).unwrap();

        assert_eq!(
            paths,
            vec![
                dir.path().join("a.pdf"),
                dir.path().join("b.pdf"),
                dir.path().join("missing.pdf"),
            ]
        );
    }

    #[test]
    fn test_collect_paths_bad_pattern() {
        assert!(collect_paths_for_patterns(["[unclosed"]).is_err());
    }

    #[test]
    fn test_copy_references_follows_nested_objects() {
        let mut source = Document::with_version("1.5");
        let leaf = source.add_object(dictionary! { "Kind" => "Leaf" });
        let middle = source.add_object(dictionary! { "Child" => vec![leaf.into()] });
        let root = Object::Dictionary(dictionary! { "Next" => middle });

        let mut target = Document::with_version("1.5");
        copy_references(&mut target, &source, &root);

        assert!(target.objects.contains_key(&middle));
        assert!(target.objects.contains_key(&leaf));
    }
}
