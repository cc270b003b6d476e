//! Markup-to-prose conversion for captured pages.
//!
//! Two output flavours are supported, selected by [`OutputFormat`]:
//! - `Md`: structured Markdown produced by the `htmd` crate, followed by a
//!   series of cleanup passes.
//! - `Txt`: plain text collected from the parsed document with scripts and
//!   styles dropped, one phrase per line.

mod cleanup;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, instrument};

use sitecorpus_shared::{OutputFormat, Result, SiteCorpusError};

/// Tags whose content never reaches the Markdown output.
const MARKDOWN_SKIP_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg"];

/// Tags whose text nodes are dropped from plain-text output.
const TEXT_SKIP_TAGS: &[&str] = &["script", "style"];

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert a captured page's markup to prose in the requested format.
#[instrument(skip(html), fields(html_len = html.len(), format = %format))]
pub fn convert(html: &str, format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Md => to_markdown(html)?,
        OutputFormat::Txt => to_plain_text(html),
    };
    debug!(text_len = text.len(), "conversion complete");
    Ok(text)
}

/// Convert markup to Markdown.
///
/// 1. Pre-processes HTML tables into markdown tables
/// 2. Converts HTML → Markdown via `htmd`
/// 3. Runs the cleanup pipeline
pub fn to_markdown(html: &str) -> Result<String> {
    let html = preprocess_tables(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(MARKDOWN_SKIP_TAGS.to_vec())
        .build();

    let raw_markdown = converter
        .convert(&html)
        .map_err(|e| SiteCorpusError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");

    Ok(cleanup::run_pipeline(&raw_markdown))
}

/// Convert markup to plain text.
///
/// Text nodes outside `<script>`/`<style>` are concatenated, split into
/// lines, each line is split again on double spaces, and every resulting
/// phrase is trimmed. Empty phrases are dropped.
pub fn to_plain_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut raw = String::new();
    for node in doc.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| TEXT_SKIP_TAGS.contains(&el.name()))
        });
        if !hidden {
            raw.push_str(text);
        }
    }

    raw.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<table\b.*?</table\s*>").expect("valid regex"));
static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));

/// Replace each `<table>` with a pipe table; htmd would otherwise flatten it.
/// Nested tables are not supported and stay as markup.
fn preprocess_tables(html: &str) -> String {
    TABLE_RE
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let fragment = Html::parse_fragment(&caps[0]);
            match fragment.select(&TABLE_SEL).next() {
                Some(table) => table_to_markdown(&table),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// The first row is the header row whether or not it uses `<th>`.
fn table_to_markdown(table: &ElementRef<'_>) -> String {
    let mut rows: Vec<Vec<String>> = table
        .select(&ROW_SEL)
        .map(|tr| tr.select(&CELL_SEL).map(|cell| cell_text(&cell)).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }
    for row in &mut rows {
        row.resize(width, String::new());
    }

    let mut md = String::from("\n\n");
    let mut push_row = |cells: &[String]| {
        md.push_str("| ");
        md.push_str(&cells.join(" | "));
        md.push_str(" |\n");
    };
    push_row(&rows[0]);
    push_row(&vec!["---".to_string(); width]);
    for row in &rows[1..] {
        push_row(row);
    }
    md.push('\n');
    md
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
