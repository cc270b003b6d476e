//! Capture-tree routing: decide which output documents a directory's files
//! feed.
//!
//! Three independent rules are applied per directory, and a file may match
//! several of them:
//! 1. **Subpage**: the directory ends with a registered subsection path.
//! 2. **HtmlPage**: the directory ends with the subsection of a registered
//!    page, and the file name starts with that page's stem.
//! 3. **BaseSite**: the site itself is registered at root level, is not
//!    excluded, and the file name is not denylisted.

use std::path::Path;

use tracing::{debug, trace};

use sitecorpus_shared::RoutingPolicy;

use crate::canonical::canonicalize;
use crate::routing::RoutingTables;

/// Which rule produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRule {
    Subpage,
    HtmlPage,
    BaseSite,
}

/// One routing decision: append `file_name`'s content to `site_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub site_key: String,
    pub file_name: String,
    pub rule: RouteRule,
}

/// Applies the routing rules against fixed tables and policy.
#[derive(Debug)]
pub struct Router<'a> {
    tables: &'a RoutingTables,
    policy: &'a RoutingPolicy,
    denylist: Vec<String>,
}

impl<'a> Router<'a> {
    pub fn new(tables: &'a RoutingTables, policy: &'a RoutingPolicy) -> Self {
        let denylist = policy
            .filename_denylist
            .iter()
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();
        Self {
            tables,
            policy,
            denylist,
        }
    }

    /// The base site a capture directory belongs to.
    pub fn base_site_of(&self, dir: &Path) -> String {
        canonicalize(site_relative_part(&dir.to_string_lossy(), &self.policy.capture_separators))
    }

    /// Route every file of one capture directory.
    pub fn route_dir<S: AsRef<str>>(&self, dir: &Path, files: &[S]) -> Vec<Route> {
        let base_site = self.base_site_of(dir);
        let dir_segments = path_segments(dir);
        let mut routes = Vec::new();

        for subpage in self.tables.subpages(&base_site) {
            if !subpage.is_suffix_of(&dir_segments) {
                continue;
            }
            let site_key = subpage.site_key(&base_site);
            trace!(dir = %dir.display(), %site_key, "subpage rule matched");
            for file in files {
                routes.push(Route {
                    site_key: site_key.clone(),
                    file_name: file.as_ref().to_string(),
                    rule: RouteRule::Subpage,
                });
            }
        }

        for page in self.tables.html_pages(&base_site) {
            if !page.subpage.is_suffix_of(&dir_segments) {
                continue;
            }
            let prefix = page.subpage.site_key(&base_site);
            for file in files {
                let file = file.as_ref();
                if !names_page(file, &page.stem) {
                    continue;
                }
                routes.push(Route {
                    site_key: format!("{prefix}_{}", cleaned_page_name(file)),
                    file_name: file.to_string(),
                    rule: RouteRule::HtmlPage,
                });
            }
        }

        if self.tables.mapping().contains_key(&base_site)
            && !self.policy.excluded_sites.contains(&base_site)
        {
            for file in files {
                let file = file.as_ref();
                if self.is_denylisted(file) {
                    trace!(file, "denylisted file skipped for base-site rule");
                    continue;
                }
                routes.push(Route {
                    site_key: base_site.clone(),
                    file_name: file.to_string(),
                    rule: RouteRule::BaseSite,
                });
            }
        }

        debug!(
            dir = %dir.display(),
            %base_site,
            files = files.len(),
            routes = routes.len(),
            "directory routed"
        );
        routes
    }

    /// Whether a file name contains any denylisted word, ignoring case.
    /// Compounds count: `datenschutzerklaerung.html` contains `datenschutz`.
    pub fn is_denylisted(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        self.denylist.iter().any(|word| name.contains(word.as_str()))
    }
}

/// The part of `dir` after the last occurrence of any capture separator,
/// with leading path separators removed. Without a separator the whole path
/// is used.
fn site_relative_part<'p>(dir: &'p str, separators: &[String]) -> &'p str {
    let start = separators
        .iter()
        .filter(|sep| !sep.is_empty())
        .filter_map(|sep| dir.rfind(sep.as_str()).map(|i| i + sep.len()))
        .max()
        .unwrap_or(0);
    dir[start..].trim_start_matches(['/', '\\'])
}

fn path_segments(dir: &Path) -> Vec<String> {
    dir.to_string_lossy()
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// `stem.<anything>` or `stem(<anything>`, case-sensitive.
fn names_page(file_name: &str, stem: &str) -> bool {
    file_name
        .strip_prefix(stem)
        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('('))
}

/// Drop a `(n)` duplicate counter and any extension, then force `.html`.
fn cleaned_page_name(file_name: &str) -> String {
    let name = file_name.split('(').next().unwrap_or_default();
    let name = name.split('.').next().unwrap_or_default();
    format!("{name}.html")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn tables() -> RoutingTables {
        RoutingTables::build(&[
            "https://ethz.ch/",
            "https://ethz.ch/staffnet/de/",
            "https://ethz.ch/news/item.html",
            "https://www.bio.ethz.ch/de/",
        ])
    }

    fn capture_dir(rel: &str) -> PathBuf {
        PathBuf::from(format!("/data/19945/ARCHIVEIT-19945-2024.warc.gz_/{rel}"))
    }

    fn keys(routes: &[Route]) -> Vec<(&str, &str, RouteRule)> {
        routes
            .iter()
            .map(|r| (r.site_key.as_str(), r.file_name.as_str(), r.rule))
            .collect()
    }

    #[test]
    fn base_site_from_capture_dir() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        assert_eq!(router.base_site_of(&capture_dir("www.ethz.ch/staffnet")), "ethz.ch");
        assert_eq!(router.base_site_of(&capture_dir("www2.bio.ethz.ch:80/de")), "bio.ethz.ch");
    }

    #[test]
    fn last_separator_wins() {
        let dir = "/a/x.warc.gz_/b/y.warc.gz_/ethz.ch/de";
        assert_eq!(site_relative_part(dir, &[".gz_".into()]), "ethz.ch/de");
        assert_eq!(site_relative_part("ethz.ch/de", &[".gz_".into()]), "ethz.ch/de");
    }

    #[test]
    fn subpage_and_base_rules_are_cumulative() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        let routes = router.route_dir(&capture_dir("ethz.ch/staffnet/de"), &["index.html"]);
        assert_eq!(
            keys(&routes),
            vec![
                ("ethz.ch_staffnet_de", "index.html", RouteRule::Subpage),
                ("ethz.ch", "index.html", RouteRule::BaseSite),
            ]
        );
    }

    #[test]
    fn subpage_rule_needs_whole_segments() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        let routes = router.route_dir(&capture_dir("ethz.ch/xstaffnet/de"), &["a.html"]);
        assert_eq!(keys(&routes), vec![("ethz.ch", "a.html", RouteRule::BaseSite)]);
    }

    #[test]
    fn subpage_rule_ignores_denylist() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        let routes = router.route_dir(&capture_dir("www.bio.ethz.ch/de"), &["impressum.html"]);
        assert_eq!(
            keys(&routes),
            vec![("bio.ethz.ch_de", "impressum.html", RouteRule::Subpage)]
        );
    }

    #[test]
    fn html_page_rule_matches_stem_and_duplicate_counter() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        let files = ["item.html", "item(1).jpg", "item.html.gz", "items.html", "other.html"];
        let routes: Vec<_> = router
            .route_dir(&capture_dir("ethz.ch/news"), &files)
            .into_iter()
            .filter(|r| r.rule == RouteRule::HtmlPage)
            .collect();

        assert_eq!(
            keys(&routes),
            vec![
                ("ethz.ch_news_item.html", "item.html", RouteRule::HtmlPage),
                ("ethz.ch_news_item.html", "item(1).jpg", RouteRule::HtmlPage),
                ("ethz.ch_news_item.html", "item.html.gz", RouteRule::HtmlPage),
            ]
        );
    }

    #[test]
    fn html_page_key_matches_mapping_key() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        let routes = router.route_dir(&capture_dir("ethz.ch/news"), &["item(2).html"]);
        let html = routes.iter().find(|r| r.rule == RouteRule::HtmlPage).unwrap();
        assert!(tables.mapping().contains_key(&html.site_key));
    }

    #[test]
    fn html_page_stem_is_case_sensitive() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        let routes = router.route_dir(&capture_dir("ethz.ch/news"), &["Item.html"]);
        assert!(routes.iter().all(|r| r.rule != RouteRule::HtmlPage));
    }

    #[test]
    fn denylisted_files_skip_base_rule() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        let files = ["impressum.html", "Kontakt.html", "data-protection.html", "lehre.html"];
        let routes = router.route_dir(&capture_dir("ethz.ch"), &files);
        assert_eq!(keys(&routes), vec![("ethz.ch", "lehre.html", RouteRule::BaseSite)]);
    }

    #[test]
    fn denylist_matches_words_inside_file_names() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        assert!(router.is_denylisted("contact.html"));
        assert!(router.is_denylisted("contact-form(1).html.gz"));
        assert!(router.is_denylisted("en_data-protection.html"));
        assert!(router.is_denylisted("Impressum.html"));
        assert!(!router.is_denylisted("data.html"));
        assert!(!router.is_denylisted("protection-data.html"));
        assert!(!router.is_denylisted("studium.html"));
    }

    #[test]
    fn denylist_catches_german_compounds() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        assert!(router.is_denylisted("datenschutzerklaerung.html"));
        assert!(router.is_denylisted("kontaktformular.html"));
        assert!(router.is_denylisted("impressum2.html"));
        assert!(router.is_denylisted("KontaktFormular(3).html.gz"));
    }

    #[test]
    fn compound_boilerplate_stays_out_of_base_document() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        let routes = router.route_dir(
            &capture_dir("ethz.ch"),
            &["datenschutzerklaerung.html", "index.html", "kontaktformular.html"],
        );
        assert_eq!(
            keys(&routes),
            vec![("ethz.ch", "index.html", RouteRule::BaseSite)]
        );
    }

    #[test]
    fn excluded_site_skips_base_rule() {
        let tables =
            RoutingTables::build(&["https://seismo.ethz.ch/", "https://seismo.ethz.ch/en/"]);
        let mut policy = RoutingPolicy::default();
        policy.excluded_sites.insert("seismo.ethz.ch".into());
        let router = Router::new(&tables, &policy);

        let routes = router.route_dir(&capture_dir("seismo.ethz.ch/en"), &["quake.html"]);
        assert_eq!(
            keys(&routes),
            vec![("seismo.ethz.ch_en", "quake.html", RouteRule::Subpage)]
        );
    }

    #[test]
    fn unknown_site_routes_nowhere() {
        let tables = tables();
        let policy = RoutingPolicy::default();
        let router = Router::new(&tables, &policy);

        assert!(router.route_dir(&capture_dir("uzh.ch/de"), &["index.html"]).is_empty());
        assert!(router.route_dir(Path::new("/data/19945"), &["index.html"]).is_empty());
    }

    #[test]
    fn cleaned_page_name_forms() {
        assert_eq!(cleaned_page_name("item(1).jpg"), "item.html");
        assert_eq!(cleaned_page_name("item.html.gz"), "item.html");
        assert_eq!(cleaned_page_name("item(3)"), "item.html");
    }
}
