//! URL canonicalization: raw captured URL or path fragment → bare site host.
//!
//! Registry rows and capture-tree paths are both reduced to a *base site*
//! (e.g. `ethz.ch`) with this one function, so the two sides meet on the
//! same key.

use tracing::warn;

/// Artifacts removed wherever they occur in the host candidate. Captures
/// produce them mid-string too, so this is a substring removal, not a
/// prefix strip.
const HOST_ARTIFACTS: &[&str] = &[
    "dns:", "mailto:", "www.", "www0.", "www1.", "www2.", "www3.",
];

/// Scheme tokens that show up as the "host" of a doubled-scheme URL.
const SCHEME_TOKENS: &[&str] = &["http:", "https:"];

/// Reduce a URL (or a path fragment derived from one) to its base site.
///
/// ```
/// use sitecorpus_core::canonical::canonicalize;
///
/// assert_eq!(canonicalize("http://ethz.ch/about/test.png"), "ethz.ch");
/// assert_eq!(canonicalize("https://www2.bio.ethz.ch/"), "bio.ethz.ch");
/// ```
///
/// Never fails: malformed input degrades to a best-effort (possibly empty)
/// substring. Case is preserved.
pub fn canonicalize(raw: &str) -> String {
    let mut candidate = host_candidate(raw).to_string();

    for artifact in HOST_ARTIFACTS {
        if candidate.contains(artifact) {
            candidate = candidate.replace(artifact, "");
        }
    }

    let candidate = until(&candidate, ':');
    let candidate = until(candidate, '/');

    candidate
        .strip_suffix('.')
        .unwrap_or(candidate)
        .to_string()
}

/// Pick the component that should hold the host.
fn host_candidate(raw: &str) -> &str {
    if !raw.contains("//") {
        return raw;
    }

    let mut parts = raw.split("//").skip(1);
    let first = parts.next().unwrap_or_default();
    if SCHEME_TOKENS.contains(&first) {
        warn!(url = raw, "oddly formed url with a doubled scheme");
        return parts.next().unwrap_or_default();
    }
    first
}

/// The part of `s` before the first `delim`, or all of `s`.
fn until(s: &str, delim: char) -> &str {
    s.split_once(delim).map_or(s, |(head, _)| head)
}
