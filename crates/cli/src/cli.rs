use std::path::PathBuf;

use clap::Parser;

/// Cross-check simulated clusters and triggers against the hardware.
///
/// Reads a newline-delimited JSON stream of `daq_config` and `event`
/// records and prints an end-of-run verification summary. Tolerances and
/// trigger types come from the environment (see `.env`).
#[derive(Parser, Debug)]
#[command(name = "daqdiag", version, about = "Trigger and cluster verification diagnostics")]
pub struct CliArgs {
    /// Record stream to read, `-` for stdin
    #[arg(long, env = "DAQDIAG_INPUT", default_value = "-")]
    pub input: PathBuf,

    /// DAQ configuration (YAML or JSON) applied before the stream
    #[arg(long, env = "DAQDIAG_DAQ_CONFIG")]
    pub daq_config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long, env = "DAQDIAG_JSON")]
    pub json: bool,

    /// Log the pair table of every event with a failed cluster
    #[arg(long, env = "DAQDIAG_PRINT_ON_FAIL")]
    pub print_on_fail: bool,
}
