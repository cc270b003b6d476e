//! Registry loading: read the canonical URL column of the collection export.
//!
//! The registry is a table with (at least) a `URL` column. CSV files are read
//! with the `csv` crate, spreadsheet exports (`.xlsx`, `.xls`, `.ods`) with
//! `calamine`. Blank, numeric, NaN and error cells all come back as `""`;
//! only a structurally broken table is an error.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use tracing::{debug, info, instrument};

use sitecorpus_shared::{Result, SiteCorpusError};

/// Header of the column holding canonical URLs.
pub const URL_COLUMN: &str = "URL";

/// Read every row of the registry's `URL` column, in table order.
///
/// Blank rows are kept as `""` so row numbers stay meaningful in logs;
/// the indexer skips them.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_registry_urls(path: &Path) -> Result<Vec<String>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let urls = match extension.as_str() {
        "csv" => read_csv(path)?,
        "xlsx" | "xlsm" | "xls" | "ods" => read_spreadsheet(path)?,
        other => {
            return Err(SiteCorpusError::registry(format!(
                "unsupported registry file type '{other}' for {}: expected csv, xlsx, xls or ods",
                path.display()
            )));
        }
    };

    info!(
        rows = urls.len(),
        non_blank = urls.iter().filter(|u| !u.is_empty()).count(),
        "registry loaded"
    );
    Ok(urls)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let column = url_column(headers.iter(), path)?;
    debug!(column, "found URL column");

    let mut urls = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        urls.push(clean_cell(record.get(column).unwrap_or_default()));
    }
    Ok(urls)
}

fn csv_error(path: &Path, err: csv::Error) -> SiteCorpusError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(io) = err.into_kind() {
            return SiteCorpusError::io(path, io);
        }
        return SiteCorpusError::registry(format!("cannot read {}", path.display()));
    }
    SiteCorpusError::registry(format!("malformed CSV in {}: {err}", path.display()))
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

fn read_spreadsheet(path: &Path) -> Result<Vec<String>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        SiteCorpusError::registry(format!("cannot open workbook {}: {e}", path.display()))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            SiteCorpusError::registry(format!("workbook {} has no sheets", path.display()))
        })?
        .map_err(|e| {
            SiteCorpusError::registry(format!("cannot read first sheet of {}: {e}", path.display()))
        })?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(cell_to_string).collect())
        .unwrap_or_default();
    let column = url_column(header.iter().map(String::as_str), path)?;
    debug!(column, "found URL column");

    Ok(rows
        .map(|row| row.get(column).map(cell_to_string).unwrap_or_default())
        .collect())
}

/// Only string cells can hold a URL; everything else counts as blank.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => clean_cell(s),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn url_column<'a>(mut headers: impl Iterator<Item = &'a str>, path: &Path) -> Result<usize> {
    headers
        .position(|h| h.trim() == URL_COLUMN)
        .ok_or_else(|| {
            SiteCorpusError::registry(format!(
                "no '{URL_COLUMN}' column in {}",
                path.display()
            ))
        })
}

/// Trim a cell and treat `NaN` exports as blank.
fn clean_cell(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("nan") {
        String::new()
    } else {
        trimmed.to_string()
    }
}
