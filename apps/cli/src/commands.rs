//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use leadscout_analysis::KeywordClassifier;
use leadscout_core::{BatchProgress, BatchSummary, Engine, run_batch};
use leadscout_crawler::HttpPageFetcher;
use leadscout_discovery::{
    ClearbitDirectory, Discoverer, DiscoveryOptions, ExclusionPolicy, GoogleSearchClient,
};
use leadscout_quota::QuotaTracker;
use leadscout_shared::{
    AppConfig, BusinessRecord, expand_home, init_config, load_config, search_credentials,
};
use leadscout_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadScout: find, verify and classify contractor websites.
#[derive(Parser)]
#[command(
    name = "leadscout",
    version,
    about = "Enrich contractor registry records with verified websites and confidence scores.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Record database (defaults to `defaults.db_path` from config).
    #[arg(long, env = "LEADSCOUT_DB", global = true)]
    pub db: Option<String>,

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
    /// Process a batch of pending records.
    Run {
        /// Records to fetch (defaults to `defaults.batch_size`).
        #[arg(short, long)]
        limit: Option<u32>,

        /// Concurrent workers (defaults to `defaults.workers`).
        #[arg(short, long)]
        workers: Option<u32>,
    },

    /// Queue a single registry record.
    Add {
        /// Registered business name.
        name: String,

        #[arg(long)]
        license: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Street address.
        #[arg(long)]
        address: Option<String>,

        /// Principal or owner name.
        #[arg(long)]
        principal: Option<String>,

        #[arg(long)]
        city: Option<String>,

        /// State code or name.
        #[arg(long)]
        state: Option<String>,
    },

    /// Show record counts by status and the search quota.
    Status,

    /// Put failed records back in the queue.
    ResetFailed {
        /// Also requeue records left `processing` by an interrupted run.
        #[arg(long)]
        interrupted: bool,
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadscout=info",
        1 => "leadscout=debug",
        _ => "leadscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Run { limit, workers } => cmd_run(db.as_deref(), limit, workers).await,
        Command::Add {
            name,
            license,
            phone,
            address,
            principal,
            city,
            state,
        } => {
            let mut record = BusinessRecord::new(0, name);
            record.license_number = license;
            record.phone = phone;
            record.address = address;
            record.principal_name = principal;
            record.city = city;
            record.state = state;
            cmd_add(db.as_deref(), &record).await
        }
        Command::Status => cmd_status(db.as_deref()).await,
        Command::ResetFailed { interrupted } => cmd_reset_failed(db.as_deref(), interrupted).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn open_storage(config: &AppConfig, db: Option<&str>) -> Result<Storage> {
    let path: PathBuf = expand_home(db.unwrap_or(&config.defaults.db_path))?;
    info!(path = %path.display(), "opening record database");
    Ok(Storage::open(&path).await?)
}

/// Wire the engine's collaborators from config.
fn build_engine(config: &AppConfig, quota: Arc<QuotaTracker>) -> Result<Engine> {
    let fetcher = Arc::new(HttpPageFetcher::new(&config.crawl)?);
    let policy = ExclusionPolicy::from_config(&config.exclusions);
    let mut discoverer =
        Discoverer::new(fetcher, quota, policy, DiscoveryOptions::from_config(config));

    match search_credentials(config) {
        Ok(credentials) => {
            let client = GoogleSearchClient::new(&config.search, credentials)?;
            discoverer = discoverer.with_search(Arc::new(client));
        }
        Err(e) => warn!(error = %e, "web search disabled"),
    }

    if config.directory.enabled {
        let directory = ClearbitDirectory::new(&config.directory)?;
        discoverer = discoverer.with_directory(Arc::new(directory));
    }

    Ok(Engine::new(discoverer, Arc::new(KeywordClassifier), config))
}

async fn cmd_run(db: Option<&str>, limit: Option<u32>, workers: Option<u32>) -> Result<()> {
    let config = load_config()?;
    let limit = limit.unwrap_or(config.defaults.batch_size);
    let workers = workers.unwrap_or(config.defaults.workers);
    if limit == 0 || workers == 0 {
        return Err(eyre!("--limit and --workers must be positive"));
    }

    let storage = open_storage(&config, db).await?;
    let quota = Arc::new(QuotaTracker::new(config.quota.clone()));
    let engine = Arc::new(build_engine(&config, Arc::clone(&quota))?);

    info!(limit, workers, "running batch");
    let progress = CliProgress::new()?;
    let summary = run_batch(engine, &storage, limit, workers as usize, &progress).await?;
    progress.finish();

    print_summary(&summary);
    let status = quota.status();
    println!(
        "  Quota:     {}/{} queries ({} remaining)",
        status.queries_today, status.daily_limit, status.remaining_queries
    );
    if summary.quota_halted {
        println!("  Search quota exhausted; remaining records stay pending.");
    }
    println!();

    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!("  Batch finished");
    println!("  Fetched:   {}", summary.fetched);
    println!("  Processed: {}", summary.processed);
    println!("  Approved:  {}", summary.approved);
    println!("  Review:    {}", summary.pending_review);
    println!("  Rejected:  {}", summary.rejected);
    println!("  Failed:    {}", summary.failed);
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
}

async fn cmd_add(db: Option<&str>, record: &BusinessRecord) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let id = storage.insert_record(record).await?;
    println!("Queued record {id}: {}", record.business_name);
    Ok(())
}

async fn cmd_status(db: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let counts = storage.status_counts().await?;

    println!();
    println!("  Records:   {}", counts.total);
    println!("  Pending:   {}", counts.pending);
    println!("  Running:   {}", counts.processing);
    println!("  Completed: {}", counts.completed);
    println!("  Failed:    {}", counts.failed);
    println!();
    println!("  Approved:  {}", counts.approved_download);
    println!("  Review:    {}", counts.pending_review);
    println!("  Rejected:  {}", counts.rejected);
    println!("  Websites:  {}", counts.websites_found);
    println!();
    println!(
        "  Quota:     {} queries/day, trips after {} consecutive throttles ({:?} reset)",
        config.quota.daily_limit, config.quota.throttle_trip_threshold, config.quota.reset
    );
    match search_credentials(&config) {
        Ok(_) => println!("  Search:    configured"),
        Err(e) => println!("  Search:    unavailable ({e})"),
    }
    println!();
    Ok(())
}

async fn cmd_reset_failed(db: Option<&str>, interrupted: bool) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    let failed = storage.reset_failed().await?;
    println!("Requeued {failed} failed record(s)");
    if interrupted {
        let stuck = storage.reset_interrupted().await?;
        println!("Requeued {stuck} interrupted record(s)");
    }
    Ok(())
}

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

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { spinner })
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl BatchProgress for CliProgress {
    fn started(&self, total: usize) {
        self.spinner
            .set_message(format!("Resolving {total} pending record(s)"));
    }

    fn record_done(&self, record: &BusinessRecord, done: usize, total: usize) {
        let outcome = record
            .review_status()
            .map(|r| r.as_str())
            .unwrap_or_else(|| record.processing_status().as_str());
        self.spinner.set_message(format!(
            "[{done}/{total}] {} → {outcome}",
            record.business_name
        ));
    }
}
