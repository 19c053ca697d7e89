//! pdfedit - Edit the page structure of PDF files and save them safely.
//!
//! Command line front-end over the `pdfedit` library.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalArgs};
use pdfedit::config::{
    CompressionLevel, EditorConfig, Metadata, OverwriteMode, RetryPolicy, Rotation, SaveOptions,
};
use pdfedit::error::PdfEditError;
use pdfedit::io::{PdfReader, PdfWriter, SaveReport};
use pdfedit::manager::{Edit, PdfManager, RepairReport};
use pdfedit::merge::{MergeInput, MergeOptions, MergeStatistics, Merger, SplitMode, Splitter};
use pdfedit::output::{
    OutputFormatter, display_document_info, display_merge_statistics, display_page_list,
    display_save_report, display_split_report,
};
use pdfedit::pages::PageSize;
use pdfedit::range::PageRange;
use pdfedit::text;
use pdfedit::utils::collect_paths_for_patterns;
use pdfedit::validation::{Validator, same_file};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        process::exit(exit_code(&err));
    }
}

/// Send library logs to stderr. `RUST_LOG` overrides the level.
fn init_tracing(global: &GlobalArgs) {
    let default_level = if global.verbose { "pdfedit=debug,warn" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Exit code of the first library error in the chain, or 1.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PdfEditError>())
        .map_or(1, PdfEditError::exit_code)
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::new(cli.global);
    tracing::debug!(command = ?cli.command, "running command");

    match cli.command {
        Command::Info {
            files,
            continue_on_error,
        } => app.info(&files, continue_on_error).await,

        Command::Pages { file } => {
            let manager = app.open(&file).await?;
            let pages = manager.pages()?;
            if app.global.json {
                app.emit(&pages)
            } else {
                display_page_list(&app.formatter, &pages);
                Ok(())
            }
        }

        Command::Text { file, pages } => {
            let manager = app.open(&file).await?;
            let range = pages.as_deref().map(PageRange::parse).transpose()?;
            let texts = text::extract_text(manager.document()?, range.as_ref())?;
            if app.global.json {
                return app.emit(&texts);
            }
            for page in &texts {
                if texts.len() > 1 {
                    app.formatter.section(&format!("--- Page {} ---", page.index + 1));
                }
                app.formatter.raw(page.text.trim_end());
            }
            Ok(())
        }

        Command::Delete {
            file,
            pages,
            output,
        } => {
            let mut manager = app.open(&file).await?;
            let pages = PageRange::parse(&pages)?.to_indices(manager.page_count()?)?;
            app.formatter
                .info(&format!("Deleting {} page(s)", pages.len()));
            manager.apply(Edit::DeletePages { pages }).await?;
            app.finish_edit(&mut manager, &file, output.output.as_deref())
                .await
        }

        Command::Rotate {
            file,
            degrees,
            pages,
            absolute,
            output,
        } => {
            let mut manager = app.open(&file).await?;
            let page_count = manager.page_count()?;
            let pages = match pages {
                Some(pages) => PageRange::parse(&pages)?.to_indices(page_count)?,
                None => (0..page_count).collect(),
            };
            let edit = if absolute {
                Edit::SetRotation { pages, degrees }
            } else {
                Edit::RotatePages {
                    pages,
                    rotation: Rotation::from_degrees(degrees)?,
                }
            };
            manager.apply(edit).await?;
            app.finish_edit(&mut manager, &file, output.output.as_deref())
                .await
        }

        Command::InsertBlank {
            file,
            at,
            size,
            output,
        } => {
            let mut manager = app.open(&file).await?;
            let at = insert_index(at, manager.page_count()?)?;
            let size = PageSize::from_str(&size)?;
            manager.apply(Edit::InsertBlank { at, size }).await?;
            app.finish_edit(&mut manager, &file, output.output.as_deref())
                .await
        }

        Command::Insert {
            file,
            from,
            pages,
            at,
            output,
        } => {
            let mut manager = app.open(&file).await?;
            let at = insert_index(at, manager.page_count()?)?;
            let range = pages.as_deref().map(PageRange::parse).transpose()?;
            manager
                .apply(Edit::InsertFrom {
                    path: from.clone(),
                    range,
                    at,
                })
                .await
                .with_context(|| format!("Failed to insert pages from {}", from.display()))?;
            app.finish_edit(&mut manager, &file, output.output.as_deref())
                .await
        }

        Command::Move {
            file,
            from,
            to,
            output,
        } => {
            let mut manager = app.open(&file).await?;
            let page_count = manager.page_count()?;
            let from = page_index(from, page_count)?;
            let to = page_index(to, page_count)?;
            manager.apply(Edit::MovePage { from, to }).await?;
            app.finish_edit(&mut manager, &file, output.output.as_deref())
                .await
        }

        Command::Extract {
            file,
            pages,
            output,
        } => {
            let manager = app.open(&file).await?;
            let range = PageRange::parse(&pages)?;
            app.confirm_overwrite(&output, std::slice::from_ref(&file))
                .await?;
            let report = manager.extract_to(&range, &output).await?;
            app.report_save(&report)
        }

        Command::Split {
            file,
            out_dir,
            every,
            ranges,
        } => {
            let mode = match (every, ranges) {
                (Some(n), _) => SplitMode::EveryN(n),
                (None, Some(ranges)) => SplitMode::Ranges(PageRange::parse(&ranges)?),
                (None, None) => SplitMode::EachPage,
            };
            app.split(&file, &out_dir, &mode).await
        }

        Command::Merge {
            inputs,
            output,
            bookmarks,
            continue_on_error,
            jobs,
            rotate,
            title,
            author,
            subject,
            keywords,
        } => {
            let options = MergeOptions {
                continue_on_error,
                jobs,
                rotation: rotate.map(Rotation::from_degrees).transpose()?,
                bookmarks,
                metadata: Metadata::new(title, author, subject, keywords),
                compression: app.compression()?,
                password: app.global.password.clone(),
            };
            app.merge(&inputs, &output, &options).await
        }

        Command::Repair { file, output } => {
            let mut manager = PdfManager::new(app.editor_config()?);
            manager
                .open_unverified(&file)
                .await
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let repair = manager.repair()?;
            app.formatter.info(&format!(
                "Removed {} dangling page reference(s), pruned {} object(s)",
                repair.dangling_kids_removed, repair.objects_pruned
            ));
            let saved = app.save_edit(&mut manager, &file, output.output.as_deref()).await?;
            if app.global.json {
                app.emit(&RepairOutput {
                    repair: &repair,
                    saved: &saved,
                })
            } else {
                display_save_report(&app.formatter, &saved);
                Ok(())
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RepairOutput<'a> {
    repair: &'a RepairReport,
    saved: &'a SaveReport,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeOutput<'a> {
    statistics: &'a MergeStatistics,
    saved: &'a SaveReport,
}

/// Parsed global flags plus the formatter they select.
struct App {
    global: GlobalArgs,
    formatter: OutputFormatter,
}

impl App {
    fn new(global: GlobalArgs) -> Self {
        let formatter = OutputFormatter::new(global.quiet || global.json, global.verbose);
        Self { global, formatter }
    }

    fn compression(&self) -> Result<CompressionLevel> {
        Ok(CompressionLevel::from_str(&self.global.compression)?)
    }

    fn save_options(&self) -> Result<SaveOptions> {
        let options = SaveOptions {
            atomic: !self.global.no_atomic,
            backup: !self.global.no_backup,
            keep_backup: self.global.keep_backup,
            verify: !self.global.no_verify,
            compression: self.compression()?,
            retry: retry_policy(self.global.retries, self.global.retry_delay_ms),
            ..SaveOptions::default()
        };
        options.validate()?;
        Ok(options)
    }

    fn editor_config(&self) -> Result<EditorConfig> {
        let config = EditorConfig {
            save: self.save_options()?,
            password: self.global.password.clone(),
            ..EditorConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    fn overwrite_mode(&self) -> OverwriteMode {
        if self.global.force {
            OverwriteMode::Force
        } else if self.global.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        }
    }

    fn reader(&self) -> PdfReader {
        match &self.global.password {
            Some(password) => PdfReader::new().with_password(password.clone()),
            None => PdfReader::new(),
        }
    }

    fn emit<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{json}");
        Ok(())
    }

    async fn open(&self, file: &Path) -> Result<PdfManager> {
        let mut manager = PdfManager::new(self.editor_config()?);
        manager
            .open(file)
            .await
            .with_context(|| format!("Failed to open {}", file.display()))?;
        Ok(manager)
    }

    /// Ask before replacing an existing output, as the overwrite mode says.
    async fn confirm_overwrite(&self, output: &Path, inputs: &[PathBuf]) -> Result<()> {
        let mode = self.overwrite_mode();
        Validator::new().validate_output(output, inputs, mode).await?;

        let exists = tokio::fs::try_exists(output).await.unwrap_or(false);
        if mode != OverwriteMode::Prompt || !exists {
            return Ok(());
        }

        // Nobody to ask
        if self.formatter.is_quiet() {
            return Err(PdfEditError::output_exists(output.to_path_buf()).into());
        }

        self.formatter.warning(&format!(
            "Output file already exists: {}",
            output.display()
        ));
        eprint!("Overwrite? [y/N]: ");
        std::io::stderr().flush().ok();

        let mut response = String::new();
        std::io::stdin()
            .read_line(&mut response)
            .context("Failed to read confirmation")?;

        match response.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(()),
            _ => Err(PdfEditError::Cancelled.into()),
        }
    }

    /// Save an edited document in place or to `output`.
    async fn save_edit(
        &self,
        manager: &mut PdfManager,
        file: &Path,
        output: Option<&Path>,
    ) -> Result<SaveReport> {
        let report = match output.filter(|out| !same_file(out, file)) {
            Some(out) => {
                self.confirm_overwrite(out, &[file.to_path_buf()]).await?;
                manager.save_as(out).await
            }
            None => manager.save().await,
        };
        report.with_context(|| format!("Failed to save {}", output.unwrap_or(file).display()))
    }

    async fn finish_edit(
        &self,
        manager: &mut PdfManager,
        file: &Path,
        output: Option<&Path>,
    ) -> Result<()> {
        let report = self.save_edit(manager, file, output).await?;
        self.report_save(&report)
    }

    fn report_save(&self, report: &SaveReport) -> Result<()> {
        if self.global.json {
            self.emit(report)
        } else {
            display_save_report(&self.formatter, report);
            Ok(())
        }
    }

    async fn info(&self, files: &[String], continue_on_error: bool) -> Result<()> {
        let paths = collect_paths_for_patterns(files)?;
        let validator = match &self.global.password {
            Some(password) => Validator::new().with_password(password.clone()),
            None => Validator::new(),
        };
        let summary = validator.inspect_all(&paths, continue_on_error).await?;

        if self.global.json {
            return self.emit(&summary);
        }

        for info in &summary.results {
            display_document_info(&self.formatter, info);
        }
        if summary.files_failed > 0 {
            self.formatter
                .warning(&format!("{} file(s) could not be read", summary.files_failed));
        }
        if summary.results.len() > 1 {
            self.formatter.section(&format!(
                "{} files, {} pages, {}",
                summary.results.len(),
                summary.total_pages,
                summary.format_total_size()
            ));
        }
        Ok(())
    }

    async fn split(&self, file: &Path, out_dir: &Path, mode: &SplitMode) -> Result<()> {
        let loaded = self
            .reader()
            .load(file)
            .await
            .with_context(|| format!("Failed to open {}", file.display()))?;
        let stem = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("part");

        let splitter = Splitter::new()
            .with_save_options(SaveOptions {
                backup: false,
                keep_backup: false,
                ..self.save_options()?
            })
            .overwrite(self.overwrite_mode() == OverwriteMode::Force);
        let report = splitter
            .split(&loaded.document, stem, out_dir, mode)
            .await?;

        if self.global.json {
            self.emit(&report)
        } else {
            display_split_report(&self.formatter, &report);
            Ok(())
        }
    }

    async fn merge(&self, args: &[String], output: &Path, options: &MergeOptions) -> Result<()> {
        let mut inputs = Vec::new();
        for arg in args {
            let input = MergeInput::from_str(arg)?;
            let pattern = input.path.to_string_lossy().into_owned();
            for path in collect_paths_for_patterns([pattern])? {
                inputs.push(MergeInput {
                    path,
                    range: input.range.clone(),
                });
            }
        }

        let paths: Vec<PathBuf> = inputs.iter().map(|i| i.path.clone()).collect();
        self.confirm_overwrite(output, &paths).await?;

        self.formatter
            .info(&format!("Merging {} file(s)...", inputs.len()));
        let result = Merger::new().merge(&inputs, options).await?;
        for skipped in &result.skipped_files {
            self.formatter
                .warning(&format!("Skipped {}", skipped.display()));
        }

        let saved = PdfWriter::with_options(self.save_options()?)
            .save(&result.document, output)
            .await
            .with_context(|| format!("Failed to save {}", output.display()))?;

        if self.global.json {
            self.emit(&MergeOutput {
                statistics: &result.statistics,
                saved: &saved,
            })
        } else {
            display_merge_statistics(&self.formatter, &result.statistics);
            display_save_report(&self.formatter, &saved);
            Ok(())
        }
    }
}

/// `retries` extra attempts after the first, starting `delay_ms` apart.
fn retry_policy(retries: u32, delay_ms: u64) -> RetryPolicy {
    let defaults = RetryPolicy::default();
    let initial_delay = Duration::from_millis(delay_ms);
    RetryPolicy {
        max_attempts: retries.saturating_add(1),
        initial_delay,
        max_delay: defaults.max_delay.max(initial_delay),
        ..defaults
    }
}

/// Zero-based index of 1-based page `number`.
fn page_index(number: usize, page_count: usize) -> Result<usize, PdfEditError> {
    if number == 0 {
        return Err(PdfEditError::invalid_page_spec(
            "0",
            "page numbers start at 1",
        ));
    }
    if number > page_count {
        return Err(PdfEditError::page_out_of_bounds(number - 1, page_count));
    }
    Ok(number - 1)
}

/// Zero-based insert position for 1-based `at`; `None` appends.
fn insert_index(at: Option<usize>, page_count: usize) -> Result<usize, PdfEditError> {
    match at {
        None => Ok(page_count),
        Some(at) => page_index(at, page_count + 1),
    }
}
