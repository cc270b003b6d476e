//! Cleanup passes applied to htmd output before it joins a corpus document.

use std::sync::LazyLock;

use regex::Regex;

type Pass = fn(&str) -> String;

/// Applied in order.
const PASSES: &[(&str, Pass)] = &[
    ("collapse_blank_runs", collapse_blank_runs),
    ("strip_layout_tags", strip_layout_tags),
    ("trim_line_ends", trim_line_ends),
    ("trim_outer_blank_lines", trim_outer_blank_lines),
];

/// Run every pass over converted Markdown.
pub(crate) fn run_pipeline(md: &str) -> String {
    PASSES.iter().fold(md.to_string(), |text, (name, pass)| {
        tracing::trace!(pass = name, len = text.len(), "cleanup pass");
        pass(&text)
    })
}

/// At most two empty lines between blocks.
fn collapse_blank_runs(md: &str) -> String {
    static BLANK_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    BLANK_RUN_RE.replace_all(md, "\n\n\n").into_owned()
}

/// Drop wrapper tags htmd passes through (`<div>`, `<span>`, `<section>`, …)
/// and keep their text. Fenced code is left as is.
fn strip_layout_tags(md: &str) -> String {
    static LAYOUT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(concat!(
            r"</?(?:div|span|section|article|aside|header|footer|nav|main",
            r"|figure|figcaption|details|summary|font|center)(?:\s[^>]*)?>",
        ))
        .expect("valid regex")
    });

    let mut fenced = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                fenced = !fenced;
                return line.to_string();
            }
            if fenced {
                line.to_string()
            } else {
                LAYOUT_TAG_RE.replace_all(line, "").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

fn trim_outer_blank_lines(md: &str) -> String {
    md.trim_matches('\n').to_string()
}
