//! Registry indexing: canonical URLs → routing tables + collection mapping.
//!
//! Every registered URL is split into its base site and navigation path and
//! lands in exactly one of three places:
//! - the site root (`https://ethz.ch/`) maps `ethz.ch` → URL;
//! - a plain subsection (`https://ethz.ch/staffnet/de/`) adds a
//!   [`NavigationPath`] under `ethz.ch` and maps `ethz.ch_staffnet_de` → URL;
//! - a specific page (`https://ethz.ch/news/item.html`) adds an
//!   [`HtmlPageEntry`] under `ethz.ch` and maps `ethz.ch_news_item.html` → URL.
//!
//! The resulting [`RoutingTables`] value is built once per run and only read
//! afterwards.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use sitecorpus_shared::{Result, SiteCorpusError};

use crate::canonical::canonicalize;

const HTML_SUFFIX: &str = ".html";

// ---------------------------------------------------------------------------
// NavigationPath
// ---------------------------------------------------------------------------

/// A path below a base site as an ordered list of non-empty segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NavigationPath {
    segments: Vec<String>,
}

impl NavigationPath {
    /// Split a `/`-separated path, dropping empty segments.
    pub fn parse(path: &str) -> Self {
        Self::from_segments(path.split('/'))
    }

    /// Build from raw segments, dropping empty ones.
    pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            segments: segments
                .into_iter()
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this path is the tail of `dir_segments`. The empty path is a
    /// suffix of everything.
    pub fn is_suffix_of<S: AsRef<str>>(&self, dir_segments: &[S]) -> bool {
        let n = self.segments.len();
        if n > dir_segments.len() {
            return false;
        }
        dir_segments[dir_segments.len() - n..]
            .iter()
            .zip(&self.segments)
            .all(|(dir, own)| dir.as_ref() == own)
    }

    /// `base_site` followed by `_<segment>` for every segment.
    pub fn site_key(&self, base_site: &str) -> String {
        let mut key = base_site.to_string();
        for segment in &self.segments {
            key.push('_');
            key.push_str(segment);
        }
        key
    }
}

impl std::fmt::Display for NavigationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

// ---------------------------------------------------------------------------
// HtmlPageEntry
// ---------------------------------------------------------------------------

/// A registered URL that names one specific `.html` page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlPageEntry {
    /// Directory path containing the page.
    pub subpage: NavigationPath,
    /// Page file name without the `.html` suffix (e.g. `item`).
    pub stem: String,
}

// ---------------------------------------------------------------------------
// CollectionMapping
// ---------------------------------------------------------------------------

/// Persisted SiteKey → canonical URL lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionMapping(BTreeMap<String, String>);

impl CollectionMapping {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Insert or overwrite. On a conflicting duplicate the latest URL is kept
    /// and a warning names both.
    fn insert(&mut self, key: String, url: &str) {
        match self.0.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(url.to_string());
            }
            Entry::Occupied(mut slot) if slot.get() != url => {
                warn!(
                    key = %slot.key(),
                    replaced = %slot.get(),
                    kept = url,
                    "site key already mapped, keeping latest url"
                );
                slot.insert(url.to_string());
            }
            Entry::Occupied(_) => {}
        }
    }

    /// Write the mapping as a flat JSON object (UTF-8).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SiteCorpusError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SiteCorpusError::Serialization(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| SiteCorpusError::io(path, e))?;
        info!(path = %path.display(), entries = self.len(), "collection mapping written");
        Ok(())
    }

    /// Read a mapping previously written by [`CollectionMapping::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SiteCorpusError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            SiteCorpusError::validation(format!(
                "invalid collection mapping {}: {e}",
                path.display()
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// RoutingTables
// ---------------------------------------------------------------------------

/// Immutable routing state derived from the registry.
#[derive(Debug, Clone, Default)]
pub struct RoutingTables {
    subpages: BTreeMap<String, Vec<NavigationPath>>,
    html_pages: BTreeMap<String, Vec<HtmlPageEntry>>,
    mapping: CollectionMapping,
}

impl RoutingTables {
    /// Index the registry's canonical URLs. Blank rows are skipped.
    #[instrument(skip_all, fields(rows = urls.len()))]
    pub fn build<S: AsRef<str>>(urls: &[S]) -> Self {
        let mut tables = Self::default();

        for url in urls {
            let url = url.as_ref().trim();
            if url.is_empty() {
                continue;
            }
            tables.add(url);
        }

        info!(
            subpage_sites = tables.subpages.len(),
            html_page_sites = tables.html_pages.len(),
            mapping_entries = tables.mapping.len(),
            "routing tables built"
        );
        tables
    }

    fn add(&mut self, url: &str) {
        let base_site = canonicalize(url);

        let navigation = match url.split_once(base_site.as_str()) {
            Some((_, rest)) if !base_site.is_empty() => rest,
            _ => {
                debug!(url, %base_site, "base site not found in url, mapping as root");
                self.mapping.insert(base_site, url);
                return;
            }
        };

        if navigation.is_empty() || navigation == "/" {
            debug!(url, %base_site, "site root");
            self.mapping.insert(base_site, url);
            return;
        }

        let key = if navigation.contains(HTML_SUFFIX) {
            let entry = html_page_entry(navigation);
            let key = NavigationPath::parse(navigation).site_key(&base_site);
            debug!(url, %key, subpage = %entry.subpage, stem = %entry.stem, "html page entry");
            push_unique(self.html_pages.entry(base_site).or_default(), entry);
            key
        } else {
            let path = NavigationPath::parse(navigation);
            let key = path.site_key(&base_site);
            debug!(url, %key, subpage = %path, "subpage entry");
            push_unique(self.subpages.entry(base_site).or_default(), path);
            key
        };

        self.mapping.insert(key, url);
    }

    /// Subsection paths registered under `base_site`.
    pub fn subpages(&self, base_site: &str) -> &[NavigationPath] {
        self.subpages.get(base_site).map_or(&[], Vec::as_slice)
    }

    /// Page-specific entries registered under `base_site`.
    pub fn html_pages(&self, base_site: &str) -> &[HtmlPageEntry] {
        self.html_pages.get(base_site).map_or(&[], Vec::as_slice)
    }

    pub fn mapping(&self) -> &CollectionMapping {
        &self.mapping
    }

    /// Base sites with at least one subsection entry.
    pub fn subpage_sites(&self) -> impl Iterator<Item = &str> {
        self.subpages.keys().map(String::as_str)
    }

    /// Base sites with at least one page-specific entry.
    pub fn html_page_sites(&self) -> impl Iterator<Item = &str> {
        self.html_pages.keys().map(String::as_str)
    }
}

/// Split a navigation path containing `.html` into (containing subpage, stem).
///
/// A path ending in `.html` is treated as a pseudo-directory (`/` appended);
/// the stem is then the second-to-last `/`-separated part and the subpage is
/// everything before it.
fn html_page_entry(navigation: &str) -> HtmlPageEntry {
    let mut normalized = navigation.to_string();
    if normalized.ends_with(HTML_SUFFIX) {
        normalized.push('/');
    }

    let parts: Vec<&str> = normalized.split('/').collect();
    let stem_index = parts.len().saturating_sub(2);
    let stem = parts
        .get(stem_index)
        .copied()
        .unwrap_or_default()
        .replace(HTML_SUFFIX, "");

    HtmlPageEntry {
        subpage: NavigationPath::from_segments(parts[..stem_index].iter().copied()),
        stem,
    }
}

fn push_unique<T: PartialEq>(entries: &mut Vec<T>, entry: T) {
    if !entries.contains(&entry) {
        entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth_tables() -> RoutingTables {
        RoutingTables::build(&[
            "https://ethz.ch/",
            "https://ethz.ch/staffnet/de/",
            "https://ethz.ch/news/item.html",
        ])
    }

    #[test]
    fn root_subpage_and_html_page_are_indexed() {
        let tables = eth_tables();
        let mapping = tables.mapping();

        assert_eq!(mapping.get("ethz.ch"), Some("https://ethz.ch/"));
        assert_eq!(
            mapping.get("ethz.ch_staffnet_de"),
            Some("https://ethz.ch/staffnet/de/")
        );
        assert_eq!(
            mapping.get("ethz.ch_news_item.html"),
            Some("https://ethz.ch/news/item.html")
        );
        assert_eq!(mapping.len(), 3);

        assert_eq!(tables.subpages("ethz.ch"), &[NavigationPath::parse("staffnet/de")]);
        assert_eq!(
            tables.html_pages("ethz.ch"),
            &[HtmlPageEntry {
                subpage: NavigationPath::parse("news"),
                stem: "item".into(),
            }]
        );
    }

    #[test]
    fn blank_rows_are_skipped() {
        let tables = RoutingTables::build(&["", "   ", "https://uzh.ch/"]);
        assert_eq!(tables.mapping().len(), 1);
        assert!(tables.mapping().contains_key("uzh.ch"));
    }

    #[test]
    fn www_variant_maps_under_bare_site() {
        let tables = RoutingTables::build(&["https://www.ethz.ch/staffnet/de/"]);
        assert_eq!(
            tables.mapping().get("ethz.ch_staffnet_de"),
            Some("https://www.ethz.ch/staffnet/de/")
        );
        assert_eq!(tables.subpages("ethz.ch").len(), 1);
    }

    #[test]
    fn url_without_trailing_slash_is_root() {
        let tables = RoutingTables::build(&["https://www.bio.ethz.ch"]);
        assert_eq!(tables.mapping().get("bio.ethz.ch"), Some("https://www.bio.ethz.ch"));
        assert!(tables.subpages("bio.ethz.ch").is_empty());
    }

    #[test]
    fn subpage_without_trailing_slash() {
        let tables = RoutingTables::build(&["https://ethz.ch/studierende"]);
        assert_eq!(tables.subpages("ethz.ch"), &[NavigationPath::parse("studierende")]);
        assert!(tables.mapping().contains_key("ethz.ch_studierende"));
    }

    #[test]
    fn base_site_absent_from_url_maps_as_root() {
        // "www." is stripped mid-host, so the base site is not a substring.
        let tables = RoutingTables::build(&["https://cms.www.ethz.ch/de/"]);
        assert_eq!(
            tables.mapping().get("cms.ethz.ch"),
            Some("https://cms.www.ethz.ch/de/")
        );
        assert!(tables.subpages("cms.ethz.ch").is_empty());
    }

    #[test]
    fn html_page_at_site_root() {
        let tables = RoutingTables::build(&["https://ethz.ch/index.html"]);
        assert_eq!(
            tables.html_pages("ethz.ch"),
            &[HtmlPageEntry {
                subpage: NavigationPath::default(),
                stem: "index".into(),
            }]
        );
        assert!(tables.mapping().contains_key("ethz.ch_index.html"));
    }

    #[test]
    fn html_page_captured_as_directory() {
        let tables = RoutingTables::build(&["https://ethz.ch/de/news/item.html/"]);
        assert_eq!(
            tables.html_pages("ethz.ch"),
            &[HtmlPageEntry {
                subpage: NavigationPath::parse("de/news"),
                stem: "item".into(),
            }]
        );
        assert!(tables.mapping().contains_key("ethz.ch_de_news_item.html"));
    }

    #[test]
    fn duplicate_key_keeps_latest_url() {
        let tables = RoutingTables::build(&[
            "https://ethz.ch/staffnet/de/",
            "http://www.ethz.ch/staffnet/de",
        ]);
        assert_eq!(
            tables.mapping().get("ethz.ch_staffnet_de"),
            Some("http://www.ethz.ch/staffnet/de")
        );
        assert_eq!(tables.subpages("ethz.ch").len(), 1);
    }

    #[test]
    fn root_variants_map_to_last_listed_url() {
        let tables = RoutingTables::build(&["https://www.ethz.ch/", "https://ethz.ch/"]);
        assert_eq!(tables.mapping().get("ethz.ch"), Some("https://ethz.ch/"));
        assert_eq!(tables.mapping().len(), 1);
    }

    #[test]
    fn navigation_path_suffix_matching_is_segment_based() {
        let path = NavigationPath::parse("/staffnet/de/");
        assert!(path.is_suffix_of(&["out", "ethz.ch", "staffnet", "de"]));
        assert!(!path.is_suffix_of(&["out", "ethz.ch", "xstaffnet", "de"]));
        assert!(!path.is_suffix_of(&["de"]));
        assert!(NavigationPath::default().is_suffix_of::<&str>(&[]));
    }

    #[test]
    fn navigation_path_site_key() {
        assert_eq!(NavigationPath::parse("/a/b/").site_key("x.ch"), "x.ch_a_b");
        assert_eq!(NavigationPath::default().site_key("x.ch"), "x.ch");
    }

    #[test]
    fn mapping_save_and_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("mappings.json");

        let tables = eth_tables();
        tables.mapping().save(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["ethz.ch"], "https://ethz.ch/");
        assert_eq!(json["ethz.ch_staffnet_de"], "https://ethz.ch/staffnet/de/");

        let loaded = CollectionMapping::load(&path).unwrap();
        assert_eq!(&loaded, tables.mapping());
    }
}
