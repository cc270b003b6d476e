//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sitecorpus_core::pipeline::{BuildConfig, ProgressReporter, RunSummary};
use sitecorpus_core::{RoutingTables, canonicalize};
use sitecorpus_shared::{
    AppConfig, OutputFormat, RoutingPolicy, init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sitecorpus: turn archived website captures into per-site text corpora.
#[derive(Parser)]
#[command(
    name = "sitecorpus",
    version,
    about = "Route archived website captures to their sites and build one document per site.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.sitecorpus/sitecorpus.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build the per-site corpus from a capture tree.
    Build(BuildArgs),

    /// Index the registry and summarize the routing tables.
    Index {
        /// Registry export (.csv, .xlsx, .xls or .ods) with a URL column.
        #[arg(long)]
        registry: PathBuf,

        /// Also write the collection mapping JSON here.
        #[arg(long)]
        mappings: Option<PathBuf>,
    },

    /// Print the base site of each URL.
    Canonicalize {
        /// URLs to canonicalize.
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `sitecorpus build`.
#[derive(clap::Args, Debug)]
pub(crate) struct BuildArgs {
    /// Registry export (.csv, .xlsx, .xls or .ods) with a URL column.
    #[arg(long)]
    pub registry: PathBuf,

    /// Root of the extracted capture tree.
    #[arg(long)]
    pub captures: PathBuf,

    /// Where to write the collection mapping JSON.
    #[arg(long)]
    pub mappings: PathBuf,

    /// Output format: md or txt (defaults to the config value).
    #[arg(long)]
    pub format: Option<String>,

    /// Output directory (defaults to writing next to each capture directory).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// File listing captures that could not be decoded.
    #[arg(long)]
    pub error_log: Option<PathBuf>,

    /// Extra file-name word to keep out of base-site documents (repeatable).
    #[arg(long = "deny")]
    pub deny: Vec<String>,

    /// Extra site to skip for the base-site rule (repeatable).
    #[arg(long = "exclude-site")]
    pub exclude_site: Vec<String>,

    /// Capture-tool separator; replaces the configured list (repeatable).
    #[arg(long = "separator")]
    pub separator: Vec<String>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitecorpus=info",
        1 => "sitecorpus=debug",
        _ => "sitecorpus=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build(args) => cmd_build(cli.config.as_deref(), &args),
        Command::Index { registry, mappings } => cmd_index(&registry, mappings.as_deref()),
        Command::Canonicalize { urls } => cmd_canonicalize(&urls),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        },
    }
}

/// Load `--config` if given, else the default config file.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Merge CLI flags over the loaded config.
fn build_config(args: &BuildArgs, config: &AppConfig) -> Result<BuildConfig> {
    let format = match &args.format {
        Some(raw) => raw.parse::<OutputFormat>()?,
        None => config.defaults.output_format,
    };

    let mut policy = RoutingPolicy::from(config);
    policy.filename_denylist.extend(args.deny.iter().cloned());
    policy.excluded_sites.extend(args.exclude_site.iter().cloned());
    if !args.separator.is_empty() {
        policy.capture_separators = args.separator.clone();
    }

    Ok(BuildConfig {
        registry: args.registry.clone(),
        captures: args.captures.clone(),
        mappings: args.mappings.clone(),
        format,
        output_dir: args
            .out
            .clone()
            .or_else(|| config.defaults.output_dir.as_ref().map(PathBuf::from)),
        error_log: args
            .error_log
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.defaults.error_log)),
        policy,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(config_path: Option<&Path>, args: &BuildArgs) -> Result<()> {
    let config = resolve_config(config_path)?;
    let build_config = build_config(args, &config)?;

    info!(
        registry = %build_config.registry.display(),
        captures = %build_config.captures.display(),
        format = %build_config.format,
        "building corpus"
    );

    let reporter = CliProgress::new()?;
    let summary = sitecorpus_core::build_corpus(&build_config, &reporter)?;

    println!();
    println!("  Corpus built.");
    println!("  Directories:     {}", summary.directories);
    println!("  Routes:          {}", summary.routes);
    println!("  Written:         {}", summary.written);
    println!("  Duplicates:      {}", summary.duplicates);
    println!("  Empty:           {}", summary.empty);
    println!("  Unsupported:     {}", summary.unsupported);
    println!("  Decode failures: {}", summary.decode_failures);
    println!("  Mapping entries: {}", summary.mapping_entries);
    println!("  Mapping file:    {}", build_config.mappings.display());
    if summary.decode_failures > 0 {
        println!("  Error log:       {}", build_config.error_log.display());
    }
    println!("  Time:            {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_index(registry: &Path, mappings: Option<&Path>) -> Result<()> {
    let tables = sitecorpus_core::index_registry(registry)?;

    if let Some(path) = mappings {
        tables.mapping().save(path)?;
        println!("Mapping written to: {}", path.display());
    }

    print_tables(&tables);
    Ok(())
}

fn print_tables(tables: &RoutingTables) {
    println!();
    println!("  Mapping entries: {}", tables.mapping().len());

    let subpage_sites: Vec<&str> = tables.subpage_sites().collect();
    println!("  Sites with subsections: {}", subpage_sites.len());
    for site in subpage_sites {
        let paths: Vec<String> = tables.subpages(site).iter().map(|p| p.to_string()).collect();
        println!("    {site}: {}", paths.join(", "));
    }

    let page_sites: Vec<&str> = tables.html_page_sites().collect();
    println!("  Sites with single pages: {}", page_sites.len());
    for site in page_sites {
        let pages: Vec<String> = tables
            .html_pages(site)
            .iter()
            .map(|p| format!("{}/{}", p.subpage, p.stem))
            .collect();
        println!("    {site}: {}", pages.join(", "));
    }
    println!();
}

fn cmd_canonicalize(urls: &[String]) -> Result<()> {
    for url in urls {
        println!("{url}\t{}", canonicalize(url));
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: a spinner for phases, then a bar over directories.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .map_err(|e| eyre!("invalid progress template: {e}"))?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { bar })
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn dir_processed(&self, current: usize, total: usize) {
        if self.bar.length() != Some(total as u64) {
            self.bar.set_length(total as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} dirs")
            {
                self.bar.set_style(style.progress_chars("=> "));
            }
        }
        self.bar.set_position(current as u64);
    }

    fn done(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}
