//! # data-inbox CLI
//!
//! Checks partner watch directories for new deliveries, compares their
//! headers against the recorded fileset and writes a dated report.
//!
//! ## Usage
//!
//! ```bash
//! data-inbox --config ./config/data-inbox.toml [flags]
//! ```
//!
//! ## Modes
//!
//! | Flags | Description |
//! |-------|-------------|
//! | *(none)* | Run a drift check, print the report and write `YYYYMMDD_report.txt` |
//! | `--create` | Create the schema and load the configured seed SQL files |
//! | `--build-fileset` | Record filesets from each partner's stored delivery history |
//! | `--report-run <ID>` | Print the report of a past run |
//!
//! ## Examples
//!
//! ```bash
//! # First-time setup, answering every prompt with yes
//! data-inbox --create --yes
//!
//! # Seed filesets, one confirmation per historical directory
//! data-inbox --build-fileset
//!
//! # Nightly check from cron
//! data-inbox --quiet
//!
//! # Show run 12 again
//! data-inbox --report-run 12
//! ```

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use data_inbox::build::run_build;
use data_inbox::check::{run_drift_check, run_report};
use data_inbox::config::load_config;
use data_inbox::confirm::{AssumeYes, Confirm, TerminalConfirm};
use data_inbox::logging::{init_logging, Verbosity};
use data_inbox::migrate::run_create;

/// data-inbox: flags new, missing and changed partner files before they
/// are processed.
#[derive(Parser)]
#[command(
    name = "data-inbox",
    about = "Partner fileset and header drift detection",
    version,
    group(ArgGroup::new("mode").args(["create", "build_fileset", "report_run"]))
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, default_value = "./config/data-inbox.toml")]
    config: PathBuf,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,

    /// Only warnings and errors on the console.
    #[arg(short, long)]
    quiet: bool,

    /// Answer yes to every confirmation.
    #[arg(short, long)]
    yes: bool,

    /// Create the database tables and load seed data, then exit.
    #[arg(short, long)]
    create: bool,

    /// Build partner filesets from stored delivery history, then exit.
    #[arg(short, long)]
    build_fileset: bool,

    /// Print the report of a past run instead of starting a new one.
    #[arg(long, value_name = "ID")]
    report_run: Option<i64>,

    /// Print the report without writing the dated report file.
    #[arg(long)]
    no_report_file: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    let _guard = init_logging(
        Verbosity::from_flags(cli.verbose, cli.quiet),
        cfg.logging.file.as_deref(),
    )?;

    let mut confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalConfirm)
    };

    if cli.create {
        run_create(&cfg, confirm.as_mut()).await?;
    } else if cli.build_fileset {
        let summary = run_build(&cfg, confirm.as_mut()).await?;
        println!(
            "Fileset build complete: partners={} directories={} entries={}",
            summary.partners_scanned, summary.directories_scanned, summary.entries_written
        );
    } else if let Some(run_id) = cli.report_run {
        run_report(&cfg, run_id).await?;
    } else if let Some(path) = run_drift_check(&cfg, !cli.no_report_file).await? {
        eprintln!("Report written to {}", path.display());
    }

    Ok(())
}
