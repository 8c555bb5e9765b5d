//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use leadmerge_core::pipeline::{ProgressReporter, RunConfig, RunResult};
use leadmerge_shared::{AppConfig, DedupOptions, init_config, load_config, load_config_from};
use leadmerge_sources::SourceSpec;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadMerge — deduplicate and merge lead records from many providers.
#[derive(Parser)]
#[command(
    name = "leadmerge",
    version,
    about = "Deduplicate and merge lead records collected from multiple providers.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.leadmerge/leadmerge.toml.
    #[arg(long, global = true, env = "LEADMERGE_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Merge lead files into one deduplicated set.
    Dedup {
        /// Source file as `label=path` or `path` (label = file stem).
        /// Repeat for each provider; ingest order follows argument order.
        #[arg(short, long = "source", required = true)]
        sources: Vec<String>,

        /// Reference list (CSV or JSON) of already-known emails to exclude.
        #[arg(short, long)]
        exclude: Option<PathBuf>,

        /// Output file for merged records (defaults to <output_dir>/merged.json).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Report file (defaults to report.json next to the output).
        #[arg(long)]
        report: Option<PathBuf>,

        /// Do not write a run report.
        #[arg(long, conflicts_with = "report")]
        no_report: bool,

        /// Fold name+org entities into a matching email entity.
        #[arg(long)]
        reconcile_tiers: bool,
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
        0 => "leadmerge=info",
        1 => "leadmerge=debug",
        _ => "leadmerge=trace",
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
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Dedup {
            sources,
            exclude,
            out,
            report,
            no_report,
            reconcile_tiers,
        } => {
            let args = DedupArgs {
                sources,
                exclude,
                out,
                report,
                no_report,
                reconcile_tiers,
            };
            cmd_dedup(&config, args).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

/// Flags of the `dedup` subcommand.
struct DedupArgs {
    sources: Vec<String>,
    exclude: Option<PathBuf>,
    out: Option<PathBuf>,
    report: Option<PathBuf>,
    no_report: bool,
    reconcile_tiers: bool,
}

/// Merge config file values with CLI flags into a pipeline config.
fn build_run_config(config: &AppConfig, args: DedupArgs) -> Result<RunConfig> {
    let sources = args
        .sources
        .iter()
        .map(|s| SourceSpec::parse(s))
        .collect::<leadmerge_shared::Result<Vec<_>>>()?;

    let output_path = args
        .out
        .unwrap_or_else(|| Path::new(&config.defaults.output_dir).join("merged.json"));

    let report_path = if args.no_report || (!config.defaults.write_report && args.report.is_none())
    {
        None
    } else {
        Some(args.report.unwrap_or_else(|| {
            output_path
                .parent()
                .unwrap_or(Path::new("."))
                .join("report.json")
        }))
    };

    let mut dedup = DedupOptions::from(config);
    dedup.reconcile_tiers |= args.reconcile_tiers;

    Ok(RunConfig {
        sources,
        reference: args.exclude,
        email_columns: config.reference.email_columns.clone(),
        output_path,
        report_path,
        dedup,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn cmd_dedup(config: &AppConfig, args: DedupArgs) -> Result<()> {
    let run_config = build_run_config(config, args)?;

    info!(
        sources = run_config.sources.len(),
        reconcile_tiers = run_config.dedup.reconcile_tiers,
        "deduplicating lead sources"
    );

    let reporter = CliProgress::new();
    let result = leadmerge_core::pipeline::run(&run_config, &reporter).await?;

    let stats = &result.report.dedup;
    println!();
    println!("  Leads merged!");
    println!("  Run:        {}", result.run_id);
    println!("  Input:      {}", stats.raw_count);
    println!("  Duplicates: {}", stats.duplicate_count);
    println!("  Output:     {}", stats.result_count);
    println!(
        "  Tiers:      {} email, {} name+org, {} unkeyed",
        stats.email_entities, stats.name_org_entities, stats.no_key_records
    );
    println!(
        "  Sources:    {} single, {} multi",
        stats.single_source_records, stats.multi_source_records
    );
    if stats.reconciled_count > 0 {
        println!("  Reconciled: {}", stats.reconciled_count);
    }
    if let Some(exclusion) = &result.report.exclusion {
        println!(
            "  Excluded:   {} ({} remaining)",
            exclusion.removed, exclusion.remaining
        );
    }
    println!("  Path:       {}", result.output_path.display());
    if let Some(report) = &run_config.report_path {
        println!("  Report:     {}", report.display());
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
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
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_loaded(&self, label: &str, records: usize, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Loaded [{current}/{total}] {label} ({records} records)"
        ));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
