//! CLI argument parsing for pdfedit.
//!
//! This module only depends on `clap` and `std`: `build.rs` includes it to
//! render the man page.

use clap::builder::FalseyValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Edit the page structure of PDF files and save them safely.
///
/// Edits are written back through a safe save: the new document goes to a
/// temporary file, the original is backed up, and the temporary file
/// replaces it atomically. A failed save leaves the original untouched.
///
/// Page numbers on the command line are 1-based. Page ranges look like
/// "1-3,5,8-" (pages 1 to 3, page 5, page 8 to the end).
#[derive(Parser, Debug)]
#[command(name = "pdfedit")]
#[command(version)]
#[command(about = "Edit the page structure of PDF files and save them safely", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Show detailed information and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Password for encrypted documents
    #[arg(long, global = true, env = "PDFEDIT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Overwrite existing output files without confirmation
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Never overwrite existing output files
    #[arg(long, global = true, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Compression level for saved files
    ///
    /// - none: write streams as they are
    /// - standard: compress uncompressed streams (default)
    /// - maximum: compress and drop unreachable objects
    #[arg(long, global = true, value_name = "LEVEL", default_value = "standard")]
    #[arg(value_parser = ["none", "standard", "maximum"])]
    pub compression: String,

    /// Retries when the target file is locked by another process
    #[arg(long, global = true, value_name = "N", env = "PDFEDIT_RETRIES", default_value_t = 4)]
    pub retries: u32,

    /// Delay before the first retry, doubled after each attempt
    #[arg(
        long,
        global = true,
        value_name = "MS",
        env = "PDFEDIT_RETRY_DELAY_MS",
        default_value_t = 100
    )]
    pub retry_delay_ms: u64,

    /// Do not back up a file before replacing it
    #[arg(long, global = true, env = "PDFEDIT_NO_BACKUP", value_parser = FalseyValueParser::new())]
    pub no_backup: bool,

    /// Keep the <name>.bak backup after a successful save
    #[arg(
        long,
        global = true,
        env = "PDFEDIT_KEEP_BACKUP",
        value_parser = FalseyValueParser::new(),
        conflicts_with = "no_backup"
    )]
    pub keep_backup: bool,

    /// Skip re-reading the written file before it replaces the target
    #[arg(long, global = true)]
    pub no_verify: bool,

    /// Write the target in place instead of through a temporary file
    #[arg(long, global = true)]
    pub no_atomic: bool,
}

/// Where an edit is written.
#[derive(Args, Debug, Clone)]
pub struct OutputArg {
    /// Write the result here instead of replacing the input
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show page count, version, size and metadata
    Info {
        /// PDF files or glob patterns
        #[arg(required = true, value_name = "FILE")]
        files: Vec<String>,

        /// Report unreadable files and keep going
        #[arg(long)]
        continue_on_error: bool,
    },

    /// List pages with their size and rotation
    Pages {
        /// PDF file
        file: PathBuf,
    },

    /// Print the text of pages
    Text {
        /// PDF file
        file: PathBuf,

        /// Pages to print (default: all)
        #[arg(short, long, value_name = "RANGE")]
        pages: Option<String>,
    },

    /// Delete pages
    Delete {
        /// PDF file
        file: PathBuf,

        /// Pages to delete, e.g. "2,4-6"
        #[arg(value_name = "RANGE")]
        pages: String,

        #[command(flatten)]
        output: OutputArg,
    },

    /// Rotate pages
    Rotate {
        /// PDF file
        file: PathBuf,

        /// Degrees clockwise; negative values rotate counter-clockwise
        #[arg(allow_hyphen_values = true, value_name = "DEGREES")]
        degrees: i64,

        /// Pages to rotate (default: all)
        #[arg(short, long, value_name = "RANGE")]
        pages: Option<String>,

        /// Set the rotation instead of adding to it
        #[arg(long)]
        absolute: bool,

        #[command(flatten)]
        output: OutputArg,
    },

    /// Insert a blank page
    InsertBlank {
        /// PDF file
        file: PathBuf,

        /// Position of the new page (default: after the last page)
        #[arg(long, value_name = "N")]
        at: Option<usize>,

        /// Page size: a4, letter, match (copy a neighbour) or WIDTHxHEIGHT
        #[arg(long, value_name = "SIZE", default_value = "match")]
        size: String,

        #[command(flatten)]
        output: OutputArg,
    },

    /// Insert pages from another PDF
    Insert {
        /// PDF file to insert into
        file: PathBuf,

        /// PDF file to copy pages from
        #[arg(long, value_name = "FILE")]
        from: PathBuf,

        /// Pages of the source to copy (default: all)
        #[arg(short, long, value_name = "RANGE")]
        pages: Option<String>,

        /// Position of the first inserted page (default: after the last page)
        #[arg(long, value_name = "N")]
        at: Option<usize>,

        #[command(flatten)]
        output: OutputArg,
    },

    /// Move a page to a new position
    Move {
        /// PDF file
        file: PathBuf,

        /// Page to move
        from: usize,

        /// Position after the move
        to: usize,

        #[command(flatten)]
        output: OutputArg,
    },

    /// Write selected pages to a new file
    Extract {
        /// PDF file
        file: PathBuf,

        /// Pages to extract
        #[arg(value_name = "RANGE")]
        pages: String,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Split a PDF into several files
    ///
    /// Parts are named <stem>_<n>.pdf or <stem>_<first>-<last>.pdf.
    /// Without --every or --ranges every page becomes its own file.
    Split {
        /// PDF file
        file: PathBuf,

        /// Directory for the parts
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Put N pages in each part
        #[arg(long, value_name = "N", conflicts_with = "ranges")]
        every: Option<usize>,

        /// One part per comma-separated range, e.g. "1-3,4-9,10-"
        #[arg(long, value_name = "RANGES")]
        ranges: Option<String>,
    },

    /// Concatenate PDF files
    ///
    /// Each input may carry a page range after a colon: "book.pdf:1-3,9".
    Merge {
        /// Input files or glob patterns, in order
        #[arg(required = true, value_name = "FILE[:RANGE]")]
        inputs: Vec<String>,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Add a bookmark at the start of each input
        #[arg(short, long)]
        bookmarks: bool,

        /// Skip inputs that fail to load
        #[arg(long)]
        continue_on_error: bool,

        /// Number of inputs loaded at once
        #[arg(short, long, value_name = "N")]
        jobs: Option<usize>,

        /// Rotate every page by DEGREES
        #[arg(long, value_name = "DEGREES", allow_hyphen_values = true)]
        rotate: Option<i64>,

        /// Title of the merged document
        #[arg(long, value_name = "TEXT")]
        title: Option<String>,

        /// Author of the merged document
        #[arg(long, value_name = "TEXT")]
        author: Option<String>,

        /// Subject of the merged document
        #[arg(long, value_name = "TEXT")]
        subject: Option<String>,

        /// Keywords of the merged document (comma-separated)
        #[arg(long, value_name = "TEXT")]
        keywords: Option<String>,
    },

    /// Rebuild the page tree and drop unreachable objects
    Repair {
        /// PDF file
        file: PathBuf,

        #[command(flatten)]
        output: OutputArg,
    },
}
