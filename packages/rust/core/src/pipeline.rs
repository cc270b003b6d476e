//! End-to-end `build` pipeline: registry → routing tables → mapping → capture
//! walk → route → append.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use sitecorpus_shared::{OutputFormat, Result, RoutingPolicy, SiteCorpusError};

use crate::registry::load_registry_urls;
use crate::router::Router;
use crate::routing::RoutingTables;
use crate::writer::{AppendOutcome, CorpusWriter, ErrorLog};

/// Configuration for the `build_corpus` pipeline.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Registry export (CSV or spreadsheet) with a `URL` column.
    pub registry: PathBuf,
    /// Root of the extracted capture tree.
    pub captures: PathBuf,
    /// Where the collection mapping JSON is written.
    pub mappings: PathBuf,
    pub format: OutputFormat,
    /// Output directory for documents; `None` writes next to the captures.
    pub output_dir: Option<PathBuf>,
    pub error_log: PathBuf,
    pub policy: RoutingPolicy,
}

/// Counters for one `build_corpus` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub directories: usize,
    pub routes: usize,
    pub written: usize,
    pub duplicates: usize,
    pub empty: usize,
    pub unsupported: usize,
    pub decode_failures: usize,
    pub mapping_entries: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    fn record(&mut self, outcome: AppendOutcome) {
        match outcome {
            AppendOutcome::Written => self.written += 1,
            AppendOutcome::Duplicate => self.duplicates += 1,
            AppendOutcome::Empty => self.empty += 1,
            AppendOutcome::Unsupported => self.unsupported += 1,
            AppendOutcome::DecodeFailed => self.decode_failures += 1,
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each capture directory has been routed and written.
    fn dir_processed(&self, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn dir_processed(&self, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Load the registry and build the routing tables, without touching the
/// capture tree.
pub fn index_registry(registry: &Path) -> Result<RoutingTables> {
    let urls = load_registry_urls(registry)?;
    Ok(RoutingTables::build(&urls))
}

/// Run the full `build` pipeline.
///
/// 1. Load the registry and build the routing tables
/// 2. Write the collection mapping
/// 3. Walk the capture tree
/// 4. Route each directory's files and append their text
#[instrument(
    skip_all,
    fields(registry = %config.registry.display(), captures = %config.captures.display())
)]
pub fn build_corpus(config: &BuildConfig, progress: &dyn ProgressReporter) -> Result<RunSummary> {
    let start = Instant::now();

    if !config.captures.is_dir() {
        return Err(SiteCorpusError::validation(format!(
            "capture directory {} does not exist",
            config.captures.display()
        )));
    }

    // --- Phase 1: Registry ---
    progress.phase("Indexing registry");
    let tables = index_registry(&config.registry)?;

    // --- Phase 2: Mapping ---
    progress.phase("Writing collection mapping");
    tables.mapping().save(&config.mappings)?;
    info!(
        path = %config.mappings.display(),
        entries = tables.mapping().len(),
        "collection mapping written"
    );

    // --- Phase 3: Walk ---
    progress.phase("Scanning captures");
    let directories = collect_directories(&config.captures)?;
    info!(directories = directories.len(), "capture tree scanned");

    // --- Phase 4: Route + append ---
    progress.phase("Writing corpus");
    let router = Router::new(&tables, &config.policy);
    let mut writer = CorpusWriter::new(
        config.format,
        config.output_dir.clone(),
        ErrorLog::new(&config.error_log),
    );

    let mut summary = RunSummary {
        directories: directories.len(),
        mapping_entries: tables.mapping().len(),
        ..RunSummary::default()
    };
    let total = directories.len();

    for (i, dir) in directories.iter().enumerate() {
        for route in router.route_dir(&dir.path, &dir.files) {
            summary.routes += 1;
            let capture = dir.path.join(&route.file_name);
            let outcome = writer.append(&route.site_key, &capture)?;
            debug!(
                capture = %capture.display(),
                site_key = %route.site_key,
                rule = ?route.rule,
                ?outcome,
                "capture processed"
            );
            summary.record(outcome);
        }
        progress.dir_processed(i + 1, total);
    }

    summary.elapsed = start.elapsed();
    progress.done(&summary);

    info!(
        directories = summary.directories,
        routes = summary.routes,
        written = summary.written,
        duplicates = summary.duplicates,
        decode_failures = summary.decode_failures,
        elapsed_ms = summary.elapsed.as_millis(),
        "build pipeline complete"
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Capture tree walk
// ---------------------------------------------------------------------------

/// A capture directory and its immediate files, both sorted by name.
#[derive(Debug)]
struct CaptureDir {
    path: PathBuf,
    files: Vec<String>,
}

/// Snapshot every directory under `root` (root included) before any output
/// is written, so documents created next to captures are never routed.
fn collect_directories(root: &Path) -> Result<Vec<CaptureDir>> {
    let mut directories = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let mut files = Vec::new();
        for child in WalkDir::new(entry.path()).min_depth(1).max_depth(1) {
            let child = child.map_err(|e| walk_error(entry.path(), e))?;
            if child.file_type().is_file() {
                files.push(child.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();

        directories.push(CaptureDir {
            path: entry.into_path(),
            files,
        });
    }

    Ok(directories)
}

fn walk_error(root: &Path, err: walkdir::Error) -> SiteCorpusError {
    let path = err.path().unwrap_or(root).to_path_buf();
    match err.into_io_error() {
        Some(io) => SiteCorpusError::io(path, io),
        None => SiteCorpusError::validation(format!(
            "filesystem loop while walking {}",
            path.display()
        )),
    }
}
