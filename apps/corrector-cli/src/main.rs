//! # Retail Corrector CLI
//!
//! Entry point for replaying a day of portal receipts on a fiscal register.
//!
//! ## Commands
//! ```text
//! corrector [--config PATH] [--simulate] replay --date 2024-03-01
//! corrector [--config PATH] [--simulate] format
//! corrector [--config PATH] init-config
//! ```
//!
//! Logging goes through `tracing`; set `RUST_LOG` to change the filter.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use corrector_device::simulator::SimulatedTransport;
use corrector_device::FiscalRegister;
use corrector_sync::{
    apply_script, CorrectorConfig, MeasureUnitRepair, OfdRuFeed, PlanfixReport, ReceiptFeed,
    ReplayRunner, ReportSink,
};

#[derive(Parser)]
#[command(name = "corrector", author, version, about, long_about = None)]
struct Cli {
    /// Path to corrector.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Drive the in-memory register simulator instead of a real device
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one day of portal receipts as correction receipts
    Replay {
        /// Day to replay (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Fill in missing measure units before replaying
        #[arg(long)]
        repair_measure_units: bool,

        /// Skip the Planfix report
        #[arg(long)]
        no_report: bool,
    },

    /// Print the register's fiscal document format and unsent document count
    Format,

    /// Write the effective configuration to the config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    info!("Starting Retail Corrector v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Replay {
            date,
            repair_measure_units,
            no_report,
        } => {
            let config = CorrectorConfig::load(cli.config).context("Loading configuration")?;
            replay(&config, cli.simulate, date, repair_measure_units, no_report).await
        }
        Commands::Format => {
            let config = CorrectorConfig::load(cli.config).context("Loading configuration")?;
            print_format(&config, cli.simulate).await
        }
        Commands::InitConfig => {
            let config = CorrectorConfig::load_or_default(cli.config.clone());
            config.save(cli.config).context("Saving configuration")?;
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,corrector_device=debug,corrector_sync=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Builds the register for this run.
///
/// Only the simulator is linked into this binary; a vendor driver binding
/// implements `DeviceTransport` and plugs in here.
fn open_register(config: &CorrectorConfig, simulate: bool) -> Result<FiscalRegister<SimulatedTransport>> {
    if !simulate {
        bail!("no fiscal device driver is linked into this build; rerun with --simulate");
    }
    Ok(FiscalRegister::with_settings(
        SimulatedTransport::new(),
        config.device.settings(),
    ))
}

async fn replay(
    config: &CorrectorConfig,
    simulate: bool,
    date: NaiveDate,
    repair_measure_units: bool,
    no_report: bool,
) -> Result<()> {
    if !config.feed.is_configured() {
        bail!("the OFD feed is not configured (vatin, registration_id and token are required)");
    }
    let register = open_register(config, simulate)?;

    let feed = OfdRuFeed::new(config.feed.clone());
    let mut receipts = feed
        .receipts_for_day(date)
        .await
        .with_context(|| format!("Fetching receipts for {date}"))?;
    info!(%date, count = receipts.len(), "Receipts fetched");

    if repair_measure_units {
        receipts = apply_script(&mut MeasureUnitRepair::new(), receipts);
    }

    let mut runner = ReplayRunner::new(
        register,
        config.device.connection(),
        config.device.max_busy_retries,
    );
    let summary = runner.run(&receipts).await;
    runner.into_register().free();

    if simulate && config.report.enabled && !no_report {
        warn!("Simulated run, Planfix report skipped");
    }
    if should_report(config, simulate, no_report) {
        let report = PlanfixReport::new(config.report.clone(), config.device.name.clone());
        if let Err(e) = report.send(summary.counters).await {
            warn!(error = %e, "Report was not delivered");
        }
    }

    println!(
        "{}: {} of {} receipts fiscalized",
        date, summary.counters.success, summary.counters.total
    );

    if let Some(fatal) = summary.fatal {
        return Err(anyhow::Error::new(fatal).context("Replay stopped by a device failure"));
    }
    Ok(())
}

/// Simulated counts never reach Planfix.
fn should_report(config: &CorrectorConfig, simulate: bool, no_report: bool) -> bool {
    config.report.enabled && !no_report && !simulate
}

async fn print_format(config: &CorrectorConfig, simulate: bool) -> Result<()> {
    let mut register = open_register(config, simulate)?;
    register
        .connect(&config.device.connection())
        .await
        .context("Connecting to the register")?;

    let result = async {
        let format = register.fiscal_format().await?;
        let unsent = register.unsent_documents().await?;
        Ok::<_, corrector_device::DeviceError>((format, unsent))
    }
    .await;
    register.free();

    let (format, unsent) = result.context("Querying the register")?;
    println!("fiscal document format: {format}");
    println!("unsent documents: {unsent}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(report_enabled: bool) -> CorrectorConfig {
        let mut config = CorrectorConfig::default();
        config.report.enabled = report_enabled;
        config
    }

    #[test]
    fn test_report_sent_for_real_device() {
        assert!(should_report(&config(true), false, false));
    }

    #[test]
    fn test_simulated_run_never_reports() {
        assert!(!should_report(&config(true), true, false));
    }

    #[test]
    fn test_report_opt_outs() {
        assert!(!should_report(&config(true), false, true));
        assert!(!should_report(&config(false), false, false));
    }
}
