mod cli;
mod input;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use daqdiag_core::config::{load_dotenv, DaqConfig, DiagnosticsConfig};
use daqdiag_verify::{DiagnosticsRun, EventOutcome};

use crate::cli::CliArgs;
use crate::input::{Record, Records};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let config = DiagnosticsConfig::from_env().context("failed to load diagnostics configuration")?;
    config.log_summary();

    let mut run = DiagnosticsRun::new(config)
        .context("failed to start diagnostics run")?
        .with_print_on_fail(args.print_on_fail);

    if let Some(path) = &args.daq_config {
        let daq = DaqConfig::load(path)
            .with_context(|| format!("failed to load DAQ configuration from {}", path.display()))?;
        run.on_daq_config(daq)?;
    }

    let reader = input::open(&args.input)?;
    let mut skipped = 0u64;
    for record in Records::new(reader) {
        match record? {
            Record::DaqConfig(daq) => run.on_daq_config(daq).context("rejected DAQ configuration record")?,
            Record::Event(event) => {
                let outcome = run
                    .process_event(&event)
                    .with_context(|| format!("verification of event {} failed", event.number))?;
                if let EventOutcome::Skipped(_) = outcome {
                    skipped += 1;
                }
            }
        }
    }

    let summary = run.summary();
    info!(
        processed = summary.statistics.events.processed,
        skipped,
        "Run complete"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}
