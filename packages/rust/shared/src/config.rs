//! Application configuration for sitecorpus.
//!
//! User config lives at `~/.sitecorpus/sitecorpus.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteCorpusError};
use crate::types::OutputFormat;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitecorpus.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitecorpus";

// ---------------------------------------------------------------------------
// Config structs (matching sitecorpus.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Routing rules applied to the capture tree.
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Output document format.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Directory collecting all output documents. When unset, each document
    /// is written next to the capture directory it came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Append-only log of captures that could not be decoded.
    #[serde(default = "default_error_log")]
    pub error_log: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            output_dir: None,
            error_log: default_error_log(),
        }
    }
}

fn default_error_log() -> String {
    "error_files.txt".into()
}

/// `[routing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Tokens the extraction tool places before the site-relative path.
    #[serde(default = "default_capture_separators")]
    pub capture_separators: Vec<String>,

    /// File-name words that keep a page out of the base-site corpus.
    #[serde(default = "default_filename_denylist")]
    pub filename_denylist: Vec<String>,

    /// Sites never routed under the base-site rule (e.g. oversized sites).
    #[serde(default = "default_excluded_sites")]
    pub excluded_sites: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            capture_separators: default_capture_separators(),
            filename_denylist: default_filename_denylist(),
            excluded_sites: default_excluded_sites(),
        }
    }
}

fn default_capture_separators() -> Vec<String> {
    vec![".gz_".into()]
}

/// Sites too large for a single base-site document.
fn default_excluded_sites() -> Vec<String> {
    vec!["seismo.ethz.ch".into()]
}

fn default_filename_denylist() -> Vec<String> {
    [
        "impressum",
        "datenschutz",
        "kontakt",
        "robots",
        "imprint",
        "data-protection",
        "contact",
        "copyright",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ---------------------------------------------------------------------------
// Routing policy (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime routing policy, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    /// Capture-tool separators; the path after the last one names the site.
    pub capture_separators: Vec<String>,
    /// Denylisted file-name words for the base-site rule.
    pub filename_denylist: Vec<String>,
    /// Sites skipped by the base-site rule.
    pub excluded_sites: BTreeSet<String>,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RoutingPolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            capture_separators: config.routing.capture_separators.clone(),
            filename_denylist: config.routing.filename_denylist.clone(),
            excluded_sites: config.routing.excluded_sites.iter().cloned().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitecorpus/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SiteCorpusError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitecorpus/sitecorpus.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteCorpusError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SiteCorpusError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SiteCorpusError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SiteCorpusError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteCorpusError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_format = \"txt\""));
        assert!(toml_str.contains("error_files.txt"));
        assert!(toml_str.contains(".gz_"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.output_format, OutputFormat::Txt);
        assert_eq!(parsed.routing.filename_denylist.len(), 8);
        assert!(parsed.defaults.output_dir.is_none());
    }

    #[test]
    fn config_with_routing_overrides() {
        let toml_str = r#"
[defaults]
output_format = "md"
output_dir = "/tmp/corpus"

[routing]
excluded_sites = ["seismo.ethz.ch"]
filename_denylist = ["impressum"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.output_format, OutputFormat::Md);
        assert_eq!(config.defaults.output_dir.as_deref(), Some("/tmp/corpus"));
        assert_eq!(config.defaults.error_log, "error_files.txt");
        assert_eq!(config.routing.capture_separators, vec![".gz_".to_string()]);
        assert_eq!(config.routing.filename_denylist, vec!["impressum".to_string()]);
    }

    #[test]
    fn invalid_output_format_rejected() {
        let toml_str = "[defaults]\noutput_format = \"pdf\"\n";
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn seismo_excluded_by_default() {
        let policy = RoutingPolicy::default();
        assert!(policy.excluded_sites.contains("seismo.ethz.ch"));

        let config: AppConfig = toml::from_str("[routing]\ncapture_separators = [\".gz_\"]\n")
            .expect("parse");
        assert_eq!(config.routing.excluded_sites, vec!["seismo.ethz.ch".to_string()]);

        let config: AppConfig = toml::from_str("[routing]\nexcluded_sites = []\n").expect("parse");
        assert!(config.routing.excluded_sites.is_empty());
    }

    #[test]
    fn routing_policy_from_app_config() {
        let mut app = AppConfig::default();
        app.routing.excluded_sites = vec!["seismo.ethz.ch".into(), "seismo.ethz.ch".into()];
        let policy = RoutingPolicy::from(&app);
        assert_eq!(policy.excluded_sites.len(), 1);
        assert!(policy.excluded_sites.contains("seismo.ethz.ch"));
        assert!(policy.filename_denylist.iter().any(|w| w == "impressum"));
    }

    #[test]
    fn load_config_from_reports_parse_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.toml");
        std::fs::write(&path, "[defaults\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, SiteCorpusError::Config { .. }));
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = load_config_from(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SiteCorpusError::Io { .. }));
    }
}
