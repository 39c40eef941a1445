//! `retention-sync` command line entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bridge_traits::time::LogLevel;
use clap::{Parser, Subcommand};
use core_runtime::config::{AppConfig, MarketingCloudConfig, DEFAULT_DATABASE_PATH};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use retention_sync::{bootstrap, SyncReport};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "retention-sync",
    version,
    about = "Mirror Marketing Cloud folders and data extensions and normalize their retention"
)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "RETENTION_SYNC_DATABASE", default_value = DEFAULT_DATABASE_PATH)]
    database: PathBuf,

    /// Log output format: pretty, json or compact
    #[arg(long, global = true, env = "RETENTION_SYNC_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Minimum log level
    #[arg(long, global = true, env = "RETENTION_SYNC_LOG_LEVEL", default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mirror the full hierarchy and push retention to every data extension
    Sync {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push retention to one data extension
    UpdateRetention {
        /// Data extension id
        id: String,
    },
    /// Retry retention pushes that are still pending or failed
    Reconcile {
        #[arg(long, default_value_t = 500)]
        limit: usize,
    },
    /// Export the largest data extensions as JSON
    ExportTop {
        #[arg(long, default_value = "exports")]
        out_dir: PathBuf,
        /// Number of data extensions to keep (defaults to 20)
        #[arg(long)]
        top: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default().with_level(cli.log_level);
    if let Some(format) = cli.log_format {
        logging = logging.with_format(format);
    }
    init_logging(logging).context("failed to initialize logging")?;

    let config = AppConfig::builder()
        .marketing_cloud(MarketingCloudConfig::from_env()?)
        .database_path(&cli.database)
        .build()?;
    let service = bootstrap(config).await?;

    match cli.command {
        Command::Sync { json } => {
            let report = service.sync().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::UpdateRetention { id } => {
            service
                .update_retention(&id)
                .await
                .with_context(|| format!("retention update failed for {id}"))?;
            println!("Retention updated for {id}");
        }
        Command::Reconcile { limit } => {
            let report = service.reconcile(limit).await?;
            println!(
                "Reconciled {} data extensions: {} succeeded, {} failed",
                report.attempted, report.succeeded, report.failed
            );
        }
        Command::ExportTop { out_dir, top } => {
            let path = service.export_top(&out_dir, top).await?;
            println!("Exported to {}", path.display());
        }
    }

    info!("Done");
    Ok(())
}

fn print_report(report: &SyncReport) {
    let m = &report.metrics;
    println!("Sync finished in {} ms", report.duration_ms);
    println!(
        "  folders:         {} succeeded, {} failed",
        m.folders_succeeded, m.folders_failed
    );
    println!(
        "  sub-folders:     {} succeeded, {} failed",
        m.sub_folders_succeeded, m.sub_folders_failed
    );
    println!(
        "  data extensions: {} succeeded, {} failed",
        m.data_extensions_succeeded, m.data_extensions_failed
    );
    println!(
        "  total:           {} succeeded, {} failed",
        m.total_succeeded(),
        m.total_failed()
    );
    if !report.unresolved_folders.is_empty() {
        println!("  unresolved folders: {}", report.unresolved_folders.join(", "));
    }
    if !report.dropped_folders.is_empty() {
        println!("  dropped folders: {}", report.dropped_folders.join(", "));
    }
}
