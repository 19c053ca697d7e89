//! PDF writing with the safe-save protocol.
//!
//! A save never truncates the file it replaces. The document is written to a
//! temp file next to the target, synced, optionally re-parsed, and only then
//! renamed over the target. An existing target is copied to `<name>.bak`
//! first (or a unique `<name>.<random>.bak` if that name is taken), and
//! restored from there if the replacement goes wrong.
//!
//! Renames that fail with errors another process typically causes (a viewer
//! holding the file open, an antivirus scan) are retried with exponential
//! backoff, as configured by [`RetryPolicy`].
//!
//! # Examples
//!
//! ```no_run
//! use pdfedit::io::writer::PdfWriter;
//! use lopdf::Document;
//! use std::path::Path;
//!
//! # async fn example(doc: Document) -> Result<(), Box<dyn std::error::Error>> {
//! let writer = PdfWriter::new();
//! let report = writer.save(&doc, Path::new("output.pdf")).await?;
//! println!("Wrote {} in {:?}", report.format_file_size(), report.duration);
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::{NamedTempFile, PersistError};
use tokio::task;

use crate::config::{CompressionLevel, RetryPolicy, SaveOptions};
use crate::error::{PdfEditError, Result, is_transient_io};
use crate::utils::{backup_path, format_file_size};

/// Outcome of a successful save.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    /// Path that now holds the document.
    pub path: PathBuf,

    /// Size of the written file in bytes.
    pub bytes_written: u64,

    /// Attempts needed to put the file in place.
    pub attempts: u32,

    /// Backup left on disk, if `keep_backup` was set.
    pub backup: Option<PathBuf>,

    /// Whether the written copy was re-parsed before committing.
    pub verified: bool,

    /// Wall time of the whole save.
    pub duration: Duration,
}

impl SaveReport {
    /// Format the written size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.bytes_written)
    }
}

/// PDF writer implementing the safe-save protocol.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: SaveOptions,
}

impl PdfWriter {
    /// Create a new PDF writer with default options.
    pub fn new() -> Self {
        Self {
            options: SaveOptions::default(),
        }
    }

    /// Create a writer with custom options.
    pub fn with_options(options: SaveOptions) -> Self {
        Self { options }
    }

    /// Create a writer that writes straight into the target.
    ///
    /// The backup is still taken, so a failed write can be rolled back.
    pub fn non_atomic() -> Self {
        Self {
            options: SaveOptions {
                atomic: false,
                ..Default::default()
            },
        }
    }

    /// The options this writer saves with.
    pub fn options(&self) -> &SaveOptions {
        &self.options
    }

    /// Save a PDF document to `path`.
    ///
    /// `doc` itself is not modified; compression and compaction are applied
    /// to the copy that gets written.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The options are invalid or the output directory is unusable
    /// - The temp file cannot be created or written
    /// - The written copy fails verification
    /// - The existing target cannot be backed up
    /// - The target cannot be replaced, even after retries
    ///
    /// If the target existed, it is intact when an error is returned.
    pub async fn save(&self, doc: &Document, path: &Path) -> Result<SaveReport> {
        self.options.validate()?;
        self.can_write(path).await?;

        let path_buf = path.to_path_buf();
        let options = self.options.clone();
        let doc_clone = doc.clone();

        task::spawn_blocking(move || save_blocking(doc_clone, &path_buf, &options))
            .await
            .map_err(|e| PdfEditError::other(format!("Write task failed: {e}")))?
    }

    /// Check if a file can be written to the given path.
    ///
    /// Performs pre-flight checks without actually writing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory doesn't exist
    /// - Parent directory is not writable
    /// - The path itself is a directory
    pub async fn can_write(&self, path: &Path) -> Result<()> {
        let parent = parent_dir(path);

        let metadata = tokio::fs::metadata(parent).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PdfEditError::invalid_config(format!(
                    "Output directory does not exist: {}",
                    parent.display()
                ))
            } else {
                PdfEditError::FileNotAccessible {
                    path: parent.to_path_buf(),
                    source: e,
                }
            }
        })?;

        if metadata.permissions().readonly() {
            return Err(PdfEditError::invalid_config(format!(
                "Output directory is not writable: {}",
                parent.display()
            )));
        }

        if tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(PdfEditError::not_a_file(path.to_path_buf()));
        }

        Ok(())
    }

    /// Check if output file exists.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    /// Remove a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn remove_if_exists(&self, path: &Path) -> Result<()> {
        if self.exists(path).await {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| PdfEditError::FailedToWrite {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }
}

/// Run the whole protocol on the current thread.
fn save_blocking(doc: Document, target: &Path, options: &SaveOptions) -> Result<SaveReport> {
    save_blocking_with(doc, target, options, |temp, target| {
        temp.persist(target).map(|_| ())
    })
}

/// The protocol with the final rename step supplied by the caller.
fn save_blocking_with<F>(
    mut doc: Document,
    target: &Path,
    options: &SaveOptions,
    mut replace: F,
) -> Result<SaveReport>
where
    F: FnMut(NamedTempFile, &Path) -> std::result::Result<(), PersistError>,
{
    let start = Instant::now();

    prepare(&mut doc, options);
    let expected_pages = doc.get_pages().len();
    let existed = target.exists();

    let (bytes_written, attempts, backup) = if options.atomic {
        save_atomic(&mut doc, target, options, expected_pages, existed, &mut replace)?
    } else {
        save_direct(&mut doc, target, options, expected_pages, existed)?
    };

    sync_parent(target);
    let backup = finish_backup(backup, options);

    let report = SaveReport {
        path: target.to_path_buf(),
        bytes_written,
        attempts,
        backup,
        verified: options.verify,
        duration: start.elapsed(),
    };

    tracing::info!(
        path = %target.display(),
        bytes = report.bytes_written,
        attempts = report.attempts,
        "saved PDF"
    );

    Ok(report)
}

type Committed = (u64, u32, Option<PathBuf>);

fn save_atomic<F>(
    doc: &mut Document,
    target: &Path,
    options: &SaveOptions,
    expected_pages: usize,
    existed: bool,
    replace: &mut F,
) -> Result<Committed>
where
    F: FnMut(NamedTempFile, &Path) -> std::result::Result<(), PersistError>,
{
    let dir = parent_dir(target);
    let mut temp = tempfile::Builder::new()
        .prefix(".pdfedit-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| PdfEditError::FailedToCreateOutput {
            path: dir.to_path_buf(),
            source: e,
        })?;
    tracing::debug!(temp = %temp.path().display(), "writing temp file");

    let temp_path = temp.path().to_path_buf();
    let bytes_written = write_document(doc, temp.as_file_mut(), &temp_path, options.buffer_size)?;

    if options.verify {
        verify_file(&temp_path, expected_pages)?;
    }

    let backup = take_backup(target, &options.retry, options.backup)?;

    match persist_with_retry(temp, target, &options.retry, replace) {
        Ok(attempts) => Ok((bytes_written, attempts, backup)),
        Err(err) => {
            rollback(target, backup.as_deref(), existed)?;
            Err(err)
        }
    }
}

fn save_direct(
    doc: &mut Document,
    target: &Path,
    options: &SaveOptions,
    expected_pages: usize,
    existed: bool,
) -> Result<Committed> {
    // Writing in place truncates the target, so it is backed up regardless.
    let backup = take_backup(target, &options.retry, options.backup || existed)?;

    let written: Result<(u64, u32)> = (|| {
        let (mut file, attempts) =
            retry_io(&options.retry, target, "create", || File::create(target)).map_err(
                |failure| {
                    failure.into_error(target, |path, source| {
                        PdfEditError::FailedToCreateOutput { path, source }
                    })
                },
            )?;
        let bytes = write_document(doc, &mut file, target, options.buffer_size)?;
        drop(file);

        if options.verify {
            verify_file(target, expected_pages)?;
        }
        Ok((bytes, attempts))
    })();

    match written {
        Ok((bytes, attempts)) => Ok((bytes, attempts, backup)),
        Err(err) => {
            rollback(target, backup.as_deref(), existed)?;
            Err(err)
        }
    }
}

/// Apply compression and compaction to the copy about to be written.
fn prepare(doc: &mut Document, options: &SaveOptions) {
    match options.compression {
        CompressionLevel::None => {}
        CompressionLevel::Standard => doc.compress(),
        CompressionLevel::Maximum => {
            doc.prune_objects();
            doc.compress();
        }
    }

    if options.compact {
        doc.prune_objects();
        doc.renumber_objects();
    }
}

/// Serialize `doc` into `file`, flush and fsync. Returns the file size.
fn write_document(
    doc: &mut Document,
    file: &mut File,
    path: &Path,
    buffer_size: usize,
) -> Result<u64> {
    let write_err = |source: io::Error| PdfEditError::FailedToWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::with_capacity(buffer_size, &mut *file);
    doc.save_to(&mut writer)
        .map_err(|e| write_err(io::Error::other(e)))?;
    writer.flush().map_err(write_err)?;
    drop(writer);

    file.sync_all().map_err(write_err)?;
    Ok(file.metadata().map(|m| m.len()).unwrap_or(0))
}

/// Re-parse a written file and check it has the expected number of pages.
fn verify_file(path: &Path, expected_pages: usize) -> Result<()> {
    let doc = Document::load(path).map_err(|e| PdfEditError::VerificationFailed {
        path: path.to_path_buf(),
        details: format!("written file does not parse: {e}"),
    })?;

    let pages = doc.get_pages().len();
    if pages != expected_pages {
        return Err(PdfEditError::VerificationFailed {
            path: path.to_path_buf(),
            details: format!("expected {expected_pages} page(s), found {pages}"),
        });
    }

    tracing::debug!(path = %path.display(), pages, "verified written file");
    Ok(())
}

/// Copy an existing target to a backup file this save owns.
fn take_backup(target: &Path, retry: &RetryPolicy, enabled: bool) -> Result<Option<PathBuf>> {
    if !enabled || !target.is_file() {
        return Ok(None);
    }

    let backup_err = |source| PdfEditError::BackupFailed {
        path: target.to_path_buf(),
        source,
    };
    let backup = reserve_backup(target).map_err(backup_err)?;

    let copied = retry_io(retry, target, "backup", || fs::copy(target, &backup));
    if let Err(failure) = copied {
        discard(&backup, "backup");
        return Err(failure.into_error(target, |path, source| PdfEditError::BackupFailed {
            path,
            source,
        }));
    }

    tracing::debug!(backup = %backup.display(), "backed up existing file");
    Ok(Some(backup))
}

/// Create an empty file to hold the backup without clobbering anything.
///
/// `<name>.bak` is used when it is free. Otherwise a unique
/// `<name>.<random>.bak` is created next to it.
fn reserve_backup(target: &Path) -> io::Result<PathBuf> {
    let preferred = backup_path(target);
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&preferred)
    {
        Ok(_) => return Ok(preferred),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(e) => return Err(e),
    }

    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (_, path) = tempfile::Builder::new()
        .prefix(&format!("{name}."))
        .suffix(".bak")
        .tempfile_in(parent_dir(target))?
        .keep()
        .map_err(|e| e.error)?;

    tracing::debug!(
        taken = %preferred.display(),
        backup = %path.display(),
        "backup name in use, using a unique one"
    );
    Ok(path)
}

/// Remove a file left behind by a failed step, logging if that fails too.
fn discard(path: &Path, what: &str) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::debug!(path = %path.display(), what, error = %e, "could not remove file");
    }
}

/// Drop the backup after a successful save, unless it should be kept.
fn finish_backup(backup: Option<PathBuf>, options: &SaveOptions) -> Option<PathBuf> {
    let backup = backup?;

    if options.keep_backup {
        return Some(backup);
    }

    if let Err(e) = fs::remove_file(&backup) {
        tracing::warn!(backup = %backup.display(), error = %e, "could not remove backup");
    }
    None
}

/// Put the target back the way it was before the save started.
///
/// With a backup, a target that no longer matches it is restored from it.
/// Without one, a target the save created itself is removed.
fn rollback(target: &Path, backup: Option<&Path>, existed: bool) -> Result<()> {
    let Some(backup) = backup else {
        if !existed {
            discard(target, "partial output");
        }
        return Ok(());
    };

    if same_contents(target, backup) {
        discard(backup, "backup");
        return Ok(());
    }

    tracing::warn!(
        path = %target.display(),
        backup = %backup.display(),
        "save failed, restoring from backup"
    );

    fs::rename(backup, target)
        .or_else(|_| fs::copy(backup, target).map(|_| ()))
        .map_err(|source| PdfEditError::RollbackFailed {
            path: target.to_path_buf(),
            backup: backup.to_path_buf(),
            source,
        })
}

fn same_contents(a: &Path, b: &Path) -> bool {
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(ma), Ok(mb)) if ma.len() == mb.len() => {}
        _ => return false,
    }
    match (fs::read(a), fs::read(b)) {
        (Ok(da), Ok(db)) => da == db,
        _ => false,
    }
}

/// Rename the temp file over the target, retrying transient failures.
///
/// Returns the number of attempts made.
fn persist_with_retry<F>(
    mut temp: NamedTempFile,
    target: &Path,
    policy: &RetryPolicy,
    replace: &mut F,
) -> Result<u32>
where
    F: FnMut(NamedTempFile, &Path) -> std::result::Result<(), PersistError>,
{
    let mut attempt = 1;

    loop {
        match replace(temp, target) {
            Ok(()) => return Ok(attempt),
            Err(PersistError { error, file }) => {
                if is_transient_io(&error) && attempt < policy.max_attempts {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        path = %target.display(),
                        attempt,
                        ?delay,
                        error = %error,
                        "replacing file failed, retrying"
                    );
                    std::thread::sleep(delay);
                    temp = file;
                    attempt += 1;
                } else {
                    let failure = RetryFailure {
                        error,
                        attempts: attempt,
                    };
                    return Err(failure.into_error(target, |path, source| {
                        PdfEditError::FailedToWrite { path, source }
                    }));
                }
            }
        }
    }
}

/// Last error of a retried operation.
struct RetryFailure {
    error: io::Error,
    attempts: u32,
}

impl RetryFailure {
    fn into_error(
        self,
        path: &Path,
        wrap: impl FnOnce(PathBuf, io::Error) -> PdfEditError,
    ) -> PdfEditError {
        if self.attempts > 1 && is_transient_io(&self.error) {
            PdfEditError::RetriesExhausted {
                path: path.to_path_buf(),
                attempts: self.attempts,
                source: self.error,
            }
        } else {
            wrap(path.to_path_buf(), self.error)
        }
    }
}

fn retry_io<T>(
    policy: &RetryPolicy,
    path: &Path,
    step: &str,
    mut op: impl FnMut() -> io::Result<T>,
) -> std::result::Result<(T, u32), RetryFailure> {
    let mut attempt = 1;

    loop {
        match op() {
            Ok(value) => return Ok((value, attempt)),
            Err(error) if is_transient_io(&error) && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    path = %path.display(),
                    step,
                    attempt,
                    ?delay,
                    error = %error,
                    "file operation failed, retrying"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(error) => {
                return Err(RetryFailure {
                    error,
                    attempts: attempt,
                });
            }
        }
    }
}

/// Directory a path lives in; `.` for bare file names.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Make the rename durable.
#[cfg(unix)]
fn sync_parent(target: &Path) {
    let dir = parent_dir(target);
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "could not sync directory");
    }
}

#[cfg(not(unix))]
fn sync_parent(_target: &Path) {}
