use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "race-timer",
    about = "An endurance race timing console written in Rust"
)]
pub struct SessionOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Print every applied event to the console
    #[clap(short, long)]
    pub debug: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to the race configuration file (OPTIONAL after the first run; the stored
    /// configuration is reused)
    #[clap(short, long)]
    pub config_path: Option<PathBuf>,

    /// Set directory holding the persisted session blobs
    #[clap(short, long, default_value = "store")]
    pub store_dir: PathBuf,

    /// Set interval of the time-based re-evaluation in milliseconds
    #[clap(short, long, default_value = "100")]
    pub tick_interval_ms: u64,

    /// Export the completed-stint log to this CSV file on exit
    #[clap(short, long)]
    pub export_csv: Option<PathBuf>,
}
