//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use companyintel_core::{
    BatchReport, EnrichContext, ItemOutcome, ProgressReporter, enrich_concurrent, enrich_many,
    enrich_with_hint, scan_directory,
};
use companyintel_shared::{
    AppConfig, CompanyRecord, EnrichConfig, JobCompanyLink, init_config, load_config,
};
use companyintel_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// companyintel: find, fingerprint and classify companies from their websites.
#[derive(Parser)]
#[command(
    name = "companyintel",
    version,
    about = "Resolve company names to official websites and keep enriched company records.",
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

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich one or more companies by name.
    Enrich {
        /// Company names.
        #[arg(required = true)]
        names: Vec<String>,

        /// Known website; skips search (single name only).
        #[arg(long)]
        url: Option<String>,

        /// Companies processed in parallel.
        #[arg(short, long, default_value = "1")]
        concurrency: usize,

        /// Print the batch report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Mine company names from `*.txt` files in a directory and enrich them.
    Scan {
        /// Directory to scan (not recursive).
        dir: PathBuf,

        /// Companies processed in parallel.
        #[arg(short, long, default_value = "1")]
        concurrency: usize,

        /// Only list the names found; do not enrich.
        #[arg(long)]
        dry_run: bool,

        /// Print the batch report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rewrite the JSON mirror from the store.
    Export {
        /// Output path (defaults to the configured export path).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Link a job posting to a company domain.
    Link {
        job_id: String,
        domain: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Link origin (e.g. manual, import).
        #[arg(long, default_value = "manual")]
        source: String,
    },

    /// List jobs linked to a company domain.
    Jobs { domain: String },

    /// List companies linked to a job.
    Companies { job_id: String },

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
        0 => "companyintel=info",
        1 => "companyintel=debug",
        _ => "companyintel=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Enrich {
            names,
            url,
            concurrency,
            json,
        } => cmd_enrich(names, url.as_deref(), concurrency, json).await,
        Command::Scan {
            dir,
            concurrency,
            dry_run,
            json,
        } => cmd_scan(&dir, concurrency, dry_run, json).await,
        Command::Export { out } => cmd_export(out).await,
        Command::Link {
            job_id,
            domain,
            title,
            description,
            source,
        } => cmd_link(job_id, domain, title, description, source).await,
        Command::Jobs { domain } => cmd_jobs(&domain).await,
        Command::Companies { job_id } => cmd_companies(&job_id).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

fn enrich_config() -> Result<EnrichConfig> {
    let config = load_config()?;
    Ok(EnrichConfig::from(&config))
}

// ---------------------------------------------------------------------------
// Enrichment commands
// ---------------------------------------------------------------------------

async fn cmd_enrich(
    names: Vec<String>,
    url: Option<&str>,
    concurrency: usize,
    json: bool,
) -> Result<()> {
    let config = enrich_config()?;

    if let Some(url) = url {
        let [name] = names.as_slice() else {
            return Err(eyre!("--url can only be used with a single company name"));
        };
        let site = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

        let ctx = EnrichContext::open(config).await?;
        let record = enrich_with_hint(&ctx, name, &site).await?;
        ctx.store.export_all(&ctx.config.export_path).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else {
            print_record(&record);
        }
        return Ok(());
    }

    info!(companies = names.len(), concurrency, "enriching companies");
    let report = run_batch(config, names, concurrency).await?;
    print_report(&report, json)
}

async fn cmd_scan(
    dir: &std::path::Path,
    concurrency: usize,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let names = scan_directory(dir)?;
    if names.is_empty() {
        println!("No company names found in {}", dir.display());
        return Ok(());
    }

    if dry_run {
        for name in &names {
            println!("{name}");
        }
        return Ok(());
    }

    let config = enrich_config()?;
    let report = run_batch(config, names, concurrency).await?;
    print_report(&report, json)
}

async fn run_batch(
    config: EnrichConfig,
    names: Vec<String>,
    concurrency: usize,
) -> Result<BatchReport> {
    let ctx = EnrichContext::open(config).await?;

    let report = if concurrency > 1 {
        let progress: Arc<dyn ProgressReporter> = Arc::new(CliProgress::new());
        enrich_concurrent(Arc::new(ctx), names, concurrency, progress).await?
    } else {
        let progress = CliProgress::new();
        enrich_many(&ctx, &names, &progress).await?
    };
    Ok(report)
}

async fn cmd_export(out: Option<PathBuf>) -> Result<()> {
    let config = enrich_config()?;
    let storage = Storage::open(&config.db_path).await?;
    let path = out.unwrap_or(config.export_path);
    let count = storage.export_all(&path).await?;
    println!("Exported {count} companies to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Job link commands
// ---------------------------------------------------------------------------

async fn cmd_link(
    job_id: String,
    domain: String,
    title: Option<String>,
    description: Option<String>,
    source: String,
) -> Result<()> {
    let config = enrich_config()?;
    let storage = Storage::open(&config.db_path).await?;

    let link = JobCompanyLink {
        job_id,
        company_domain: domain.trim().to_lowercase(),
        job_title: title,
        job_description: description,
        link_source: source,
        created_at: chrono::Utc::now(),
    };
    storage.link(&link).await?;

    if storage.get(&link.company_domain).await?.is_none() {
        println!(
            "Note: {} has no company record yet; run `companyintel enrich` to create one.",
            link.company_domain
        );
    }
    println!("Linked job {} to {}", link.job_id, link.company_domain);
    Ok(())
}

async fn cmd_jobs(domain: &str) -> Result<()> {
    let config = enrich_config()?;
    let storage = Storage::open_readonly(&config.db_path).await?;
    let domain = domain.trim().to_lowercase();
    let links = storage.jobs_for(&domain).await?;

    if links.is_empty() {
        println!("No jobs linked to {domain}");
        return Ok(());
    }
    for link in links {
        println!(
            "  {:<24} {:<40} {}",
            link.job_id,
            link.job_title.as_deref().unwrap_or("-"),
            link.link_source
        );
    }
    Ok(())
}

async fn cmd_companies(job_id: &str) -> Result<()> {
    let config = enrich_config()?;
    let storage = Storage::open_readonly(&config.db_path).await?;
    let links = storage.companies_for(job_id).await?;

    if links.is_empty() {
        println!("No companies linked to job {job_id}");
        return Ok(());
    }
    for link in links {
        let record = storage.get(&link.company_domain).await?;
        let (name, industry) = match &record {
            Some(r) => (r.name.as_str(), r.industry.as_str()),
            None => ("(not enriched)", "-"),
        };
        println!("  {:<32} {:<32} {}", link.company_domain, name, industry);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config commands
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

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_record(record: &CompanyRecord) {
    println!();
    println!("  Name:        {}", record.name);
    println!("  Status:      {}", record.status.as_str());
    println!("  Domain:      {}", record.domain.as_deref().unwrap_or("-"));
    println!("  Website:     {}", record.website.as_deref().unwrap_or("-"));
    println!("  Title:       {}", record.title.as_deref().unwrap_or("-"));
    println!("  Industry:    {}", record.industry);
    println!("  Logo:        {}", record.logo_path.as_deref().unwrap_or("-"));
    println!("  Interactive: {}", record.interactive_ready);
    println!();
}

fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    for outcome in &report.outcomes {
        match outcome {
            ItemOutcome::Enriched {
                name,
                domain,
                status,
                cached,
            } => println!(
                "  ✓ {name:<32} {:<32} {}{}",
                domain.as_deref().unwrap_or("-"),
                status.as_str(),
                if *cached { " (cached)" } else { "" }
            ),
            ItemOutcome::Skipped { name, reason } => println!("  ✗ {name:<32} {reason}"),
        }
    }
    println!();
    println!(
        "  Enriched: {}  Skipped: {}  Exported: {}",
        report.enriched_count(),
        report.skipped_count(),
        report.exported
    );
    println!();
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
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn started(&self, total: usize) {
        self.spinner.set_message(format!("Enriching {total} companies"));
    }

    fn company_started(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {}", name.trim()));
    }

    fn company_finished(&self, outcome: &ItemOutcome, done: usize, total: usize) {
        if let ItemOutcome::Skipped { name, reason } = outcome {
            self.spinner.println(format!("  skipped {name}: {reason}"));
        }
        self.spinner
            .set_message(format!("[{done}/{total}] done {}", outcome.name()));
    }

    fn finished(&self, _report: &BatchReport) {
        self.spinner.finish_and_clear();
    }
}
