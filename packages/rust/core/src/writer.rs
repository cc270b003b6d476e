//! Corpus writer: append converted page text to per-site-key documents.
//!
//! Every append is a complete open → read → check → append → close cycle,
//! with no cached handles. The duplicate check reads the whole document, so
//! appends to one document must never run concurrently.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use sitecorpus_shared::{OutputFormat, PLACEHOLDER_TEXTS, Result, SiteCorpusError};

use crate::decode::{Decoded, read_markup};

/// File-name suffixes of captures holding HTML.
const SUPPORTED_SUFFIXES: &[&str] = &[".html", ".html.gz"];

/// What happened to one routed capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Text was appended to the document.
    Written,
    /// The document already contains this exact text.
    Duplicate,
    /// Nothing worth writing (empty markup, empty text, or a placeholder).
    Empty,
    /// Not an HTML capture.
    Unsupported,
    /// No decoding succeeded; recorded in the error log.
    DecodeFailed,
}

// ---------------------------------------------------------------------------
// ErrorLog
// ---------------------------------------------------------------------------

/// Append-only list of captures that could not be decoded, one path per line.
/// A path is recorded at most once per run even if it was routed several times.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    recorded: HashSet<PathBuf>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recorded: HashSet::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct captures recorded this run.
    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    pub fn record(&mut self, capture: &Path) -> Result<()> {
        if !self.recorded.insert(capture.to_path_buf()) {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SiteCorpusError::io(&self.path, e))?;
        writeln!(file, "{}", capture.display()).map_err(|e| SiteCorpusError::io(&self.path, e))
    }
}

// ---------------------------------------------------------------------------
// CorpusWriter
// ---------------------------------------------------------------------------

/// Appends deduplicated prose to `<site_key>.<format>` documents.
#[derive(Debug)]
pub struct CorpusWriter {
    format: OutputFormat,
    output_dir: Option<PathBuf>,
    error_log: ErrorLog,
}

impl CorpusWriter {
    /// Documents go to `output_dir` when set, else next to their source
    /// directory.
    pub fn new(format: OutputFormat, output_dir: Option<PathBuf>, error_log: ErrorLog) -> Self {
        Self {
            format,
            output_dir,
            error_log,
        }
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Path of the document for `site_key` given the capture's directory.
    pub fn document_path(&self, site_key: &str, source_dir: &Path) -> PathBuf {
        let dir = self.output_dir.as_deref().unwrap_or(source_dir);
        dir.join(format!("{site_key}.{}", self.format.extension()))
    }

    /// Decode, convert and append one capture to the `site_key` document.
    pub fn append(&mut self, site_key: &str, capture: &Path) -> Result<AppendOutcome> {
        let Some(file_name) = capture.file_name().map(|n| n.to_string_lossy()) else {
            return Ok(AppendOutcome::Unsupported);
        };
        if !is_supported(&file_name) {
            return Ok(AppendOutcome::Unsupported);
        }

        let markup = match read_markup(capture)? {
            Decoded::Text(markup) => markup,
            Decoded::Undecodable => {
                warn!(path = %capture.display(), "capture could not be decoded, skipping");
                self.error_log.record(capture)?;
                return Ok(AppendOutcome::DecodeFailed);
            }
        };
        if markup.is_empty() {
            return Ok(AppendOutcome::Empty);
        }

        let text = sitecorpus_prose::convert(&markup, self.format)?;
        if PLACEHOLDER_TEXTS.contains(&text.as_str()) {
            debug!(path = %capture.display(), "no content after conversion");
            return Ok(AppendOutcome::Empty);
        }

        let source_dir = capture.parent().unwrap_or_else(|| Path::new(""));
        let document = self.document_path(site_key, source_dir);
        self.append_text(&document, &text)
    }

    /// Append `text` unless `document` already contains it verbatim.
    fn append_text(&self, document: &Path, text: &str) -> Result<AppendOutcome> {
        if let Some(dir) = &self.output_dir {
            std::fs::create_dir_all(dir).map_err(|e| SiteCorpusError::io(dir, e))?;
        }

        let existing = match std::fs::read_to_string(document) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(SiteCorpusError::io(document, e)),
        };
        if existing.contains(text) {
            debug!(document = %document.display(), "text already present");
            return Ok(AppendOutcome::Duplicate);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(document)
            .map_err(|e| SiteCorpusError::io(document, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| SiteCorpusError::io(document, e))?;

        debug!(document = %document.display(), bytes = text.len(), "text appended");
        Ok(AppendOutcome::Written)
    }
}

fn is_supported(file_name: &str) -> bool {
    SUPPORTED_SUFFIXES
        .iter()
        .any(|suffix| file_name.ends_with(suffix))
}
