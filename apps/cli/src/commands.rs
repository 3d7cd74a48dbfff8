//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sitescribe_core::{CrawlJob, CrawlSummary, ProgressReporter};
use sitescribe_shared::{
    AppConfig, FetchSettings, FetcherKind, SiteScribeError, init_config, load_config,
    load_config_from,
};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sitescribe: mirror a documentation site as Markdown.
#[derive(Parser)]
#[command(
    name = "sitescribe",
    version,
    about = "Crawl a website from a start URL and save every same-origin page as Markdown.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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

/// Fetch engine selectable from the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum FetcherArg {
    /// Headless Chromium (renders JavaScript).
    Browser,
    /// Plain HTTP GET (static sites only).
    Http,
}

impl From<FetcherArg> for FetcherKind {
    fn from(arg: FetcherArg) -> Self {
        match arg {
            FetcherArg::Browser => FetcherKind::Browser,
            FetcherArg::Http => FetcherKind::Http,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl a site and write one Markdown file per page.
    Crawl {
        /// Start URL; only pages on its origin are visited.
        url: String,

        /// Output directory for the Markdown mirror.
        #[arg(short, long)]
        out: PathBuf,

        /// JSON cookie file applied to every page.
        #[arg(short, long)]
        cookies: Option<PathBuf>,

        /// Fetch engine (overrides the config file).
        #[arg(long, value_enum)]
        fetcher: Option<FetcherArg>,

        /// Show the browser window instead of running headless.
        #[arg(long)]
        headed: bool,

        /// Per-page timeout in seconds (overrides the config file).
        #[arg(long)]
        timeout: Option<u64>,

        /// Config file to use instead of ~/.sitescribe/sitescribe.toml.
        #[arg(long, env = "SITESCRIBE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
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

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = default_filter(cli.verbose);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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

/// Filter used when `RUST_LOG` is unset. Every workspace crate gets the level
/// picked by `-v`; dependencies stay at `warn`.
fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn,sitescribe=info,sitescribe_core=info,sitescribe_crawler=info,sitescribe_markdown=info,sitescribe_storage=info,sitescribe_shared=info",
        1 => "warn,sitescribe=debug,sitescribe_core=debug,sitescribe_crawler=debug,sitescribe_markdown=debug,sitescribe_storage=debug,sitescribe_shared=debug",
        _ => "warn,sitescribe=trace,sitescribe_core=trace,sitescribe_crawler=trace,sitescribe_markdown=trace,sitescribe_storage=trace,sitescribe_shared=trace",
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl {
            url,
            out,
            cookies,
            fetcher,
            headed,
            timeout,
            config,
        } => {
            let overrides = Overrides {
                fetcher,
                headed,
                timeout,
            };
            cmd_crawl(&url, out, cookies, config.as_deref(), &overrides).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// crawl
// ---------------------------------------------------------------------------

/// Command-line values that take precedence over the config file.
struct Overrides {
    fetcher: Option<FetcherArg>,
    headed: bool,
    timeout: Option<u64>,
}

async fn cmd_crawl(
    url: &str,
    out: PathBuf,
    cookies: Option<PathBuf>,
    config_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<()> {
    let start_url = parse_start_url(url)?;

    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    let settings = resolve_settings(config, overrides);

    info!(
        url = %start_url,
        out = %out.display(),
        fetcher = %settings.kind,
        headless = settings.headless,
        timeout_secs = settings.timeout.as_secs(),
        "starting sitescribe"
    );

    let job = CrawlJob {
        start_url,
        output_dir: out,
        credentials_path: cookies,
    };

    let reporter = CliProgress::new();
    let summary = sitescribe_core::crawl(&job, &settings, &reporter)
        .await
        .map_err(crawl_failure)?;

    println!();
    println!("  Crawl finished.");
    println!("  Saved:   {}", summary.pages_saved);
    println!("  Skipped: {}", summary.pages_skipped);
    println!("  Failed:  {}", summary.pages_failed);
    println!("  Output:  {}", job.output_dir.display());
    println!("  Time:    {:.1}s", summary.duration.as_secs_f64());
    println!();

    Ok(())
}

/// Parse the start URL, accepting only http(s).
fn parse_start_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| eyre!("invalid start URL '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(eyre!("unsupported scheme '{other}' in start URL '{raw}'")),
    }
}

/// Report for an error that ended the crawl. Fatal errors carry a hint on how
/// to get past them.
fn crawl_failure(err: SiteScribeError) -> Report {
    if !err.is_fatal() {
        return Report::new(err);
    }
    match err {
        SiteScribeError::SessionInit(_) => eyre!(
            "crawl aborted: {err}\nhint: set [browser] executable in the config file or rerun with --fetcher http"
        ),
        _ => eyre!("crawl aborted: {err}"),
    }
}

/// Merge command-line overrides into the loaded config.
fn resolve_settings(mut config: AppConfig, overrides: &Overrides) -> FetchSettings {
    if let Some(fetcher) = overrides.fetcher {
        config.defaults.fetcher = fetcher.into();
    }

    let mut settings = FetchSettings::from(&config);
    if overrides.headed {
        settings.headless = false;
    }
    if let Some(secs) = overrides.timeout {
        settings.timeout = Duration::from_secs(secs);
    }
    settings
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: an indicatif spinner plus one stdout line per event.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_started(&self, url: &Url) {
        self.spinner.println(format!("Processing: {url}"));
        self.spinner.set_message(format!("Fetching {url}"));
    }

    fn page_saved(&self, url: &Url, _path: &Path) {
        self.spinner.println(format!("Saved content for: {url}"));
    }

    fn page_skipped(&self, url: &Url) {
        self.spinner.println(format!(
            "Skipping content extraction for: {url} (file already exists)"
        ));
    }

    fn page_failed(&self, url: &Url, error: &SiteScribeError) {
        self.spinner.println(format!("Error processing {url}: {error}"));
    }

    fn done(&self, _summary: &CrawlSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
