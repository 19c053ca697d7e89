//! Configuration types for pdfedit.
//!
//! This module holds the option structs that drive editing and saving:
//! - Page rotation and compression settings
//! - Document metadata to write
//! - Retry, backup and verification behavior of the safe-save protocol
//! - Undo history depth of the [`PdfManager`](crate::manager::PdfManager)
//!
//! Every struct has a `Default` that is safe to use as-is, and the composite
//! ones expose `validate()` so front-ends can reject bad combinations early.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PdfEditError, Result};

/// Compression level for the output PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// No compression - streams are written as they are in memory.
    None,
    /// Compress uncompressed streams.
    #[default]
    Standard,
    /// Compress streams and drop unreachable objects.
    Maximum,
}

impl FromStr for CompressionLevel {
    type Err = PdfEditError;

    /// Parse compression level from "none", "standard" or "maximum".
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "standard" => Ok(Self::Standard),
            "maximum" => Ok(Self::Maximum),
            _ => Err(PdfEditError::invalid_config(format!(
                "Invalid compression level: {s}. Must be one of: none, standard, maximum"
            ))),
        }
    }
}

/// Page rotation in degrees clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    /// Rotate 90 degrees clockwise.
    Clockwise90,
    /// Rotate 180 degrees.
    Rotate180,
    /// Rotate 270 degrees clockwise (90 counter-clockwise).
    Clockwise270,
}

impl Rotation {
    /// Parse rotation from degrees.
    ///
    /// Negative values rotate counter-clockwise, so `-90` is the same as
    /// `270`. The value must be a non-zero multiple of 90 once normalized.
    ///
    /// # Errors
    ///
    /// Returns an error for anything that does not normalize to 90, 180 or 270.
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        match degrees.rem_euclid(360) {
            90 => Ok(Self::Clockwise90),
            180 => Ok(Self::Rotate180),
            270 => Ok(Self::Clockwise270),
            _ => Err(PdfEditError::invalid_config(format!(
                "Invalid rotation: {degrees}. Must be a non-zero multiple of 90"
            ))),
        }
    }

    /// Get rotation as degrees.
    pub fn as_degrees(&self) -> i64 {
        match self {
            Self::Clockwise90 => 90,
            Self::Rotate180 => 180,
            Self::Clockwise270 => 270,
        }
    }

    /// Add this rotation to an existing `/Rotate` value.
    ///
    /// The result is always one of 0, 90, 180 or 270.
    pub fn apply_to(&self, current: i64) -> i64 {
        normalize_rotation(current + self.as_degrees())
    }
}

impl FromStr for Rotation {
    type Err = PdfEditError;

    fn from_str(s: &str) -> Result<Self> {
        let degrees: i64 = s
            .trim()
            .parse()
            .map_err(|_| PdfEditError::invalid_config(format!("Invalid rotation: {s}")))?;
        Self::from_degrees(degrees)
    }
}

/// Snap any `/Rotate` value into 0, 90, 180 or 270.
///
/// Values that are not multiples of 90 are invalid in PDF; they are rounded
/// down to the previous quarter turn.
pub fn normalize_rotation(degrees: i64) -> i64 {
    let wrapped = degrees.rem_euclid(360);
    wrapped - wrapped % 90
}

/// PDF metadata to set on the output document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Document keywords (comma-separated).
    pub keywords: Option<String>,
}

impl Metadata {
    /// Check if any metadata fields are set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }

    /// Create metadata from optional strings, trimming whitespace.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        let to_string_opt = |opt: Option<String>| {
            opt.filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
        };

        Self {
            title: to_string_opt(title),
            author: to_string_opt(author),
            subject: to_string_opt(subject),
            keywords: to_string_opt(keywords),
        }
    }
}

/// Output file overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
    /// Prompt the user before overwriting (default).
    #[default]
    Prompt,
    /// Always overwrite without prompting.
    Force,
    /// Never overwrite, error if file exists.
    NoClobber,
}

/// Bounded retry with exponential backoff for transient file errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: u32,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 2,
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_factor
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Validate the policy.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(PdfEditError::invalid_config(
                "Retry attempts must be at least 1",
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(PdfEditError::invalid_config(
                "Initial retry delay cannot exceed the maximum delay",
            ));
        }
        Ok(())
    }
}

/// Options for the safe-save protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveOptions {
    /// Write to a temp file and rename it over the target.
    pub atomic: bool,

    /// Copy an existing target to `<name>.bak` before replacing it.
    ///
    /// Non-atomic saves write into the target itself, so they always take a
    /// backup of an existing target and remove it afterwards unless
    /// `keep_backup` is set.
    pub backup: bool,

    /// Leave the backup on disk after a successful save.
    pub keep_backup: bool,

    /// Re-open the written file and compare page counts before committing.
    pub verify: bool,

    /// Compression applied to the saved copy.
    pub compression: CompressionLevel,

    /// Drop unreachable objects and renumber the rest densely before writing.
    pub compact: bool,

    /// Retry behavior for transient errors.
    pub retry: RetryPolicy,

    /// Buffer size for writing (in bytes).
    pub buffer_size: usize,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            backup: true,
            keep_backup: false,
            verify: true,
            compression: CompressionLevel::Standard,
            compact: true,
            retry: RetryPolicy::default(),
            buffer_size: 64 * 1024,
        }
    }
}

impl SaveOptions {
    /// Options for writing a brand new file where no rollback is needed.
    pub fn fresh_output() -> Self {
        Self {
            backup: false,
            ..Default::default()
        }
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        if self.keep_backup && !self.backup {
            return Err(PdfEditError::invalid_config(
                "keep_backup requires backups to be enabled",
            ));
        }
        if self.buffer_size == 0 {
            return Err(PdfEditError::invalid_config(
                "Write buffer size must be greater than zero",
            ));
        }
        self.retry.validate()
    }
}

/// Configuration for a [`PdfManager`](crate::manager::PdfManager).
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Number of undo steps kept in memory.
    pub history_limit: usize,

    /// Save behavior for `save` and `save_as`.
    pub save: SaveOptions,

    /// Password tried when an opened document is encrypted.
    pub password: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 32,
            save: SaveOptions::default(),
            password: None,
        }
    }
}

impl EditorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.save.validate()
    }
}
