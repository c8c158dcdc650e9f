use clap::Parser;
use std::path::PathBuf;

/// Flags images uploaded to a Misskey instance as sensitive using Cloud
/// Vision SafeSearch.
#[derive(Parser, Debug, Default)]
#[command(version)]
pub struct Cli {
    /// Log at debug level and print system information at startup.
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Run a single poll cycle and exit.
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Path to config.toml. Defaults to `$IMGSAFE_HOME/config.toml`.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the state file. Defaults to `$IMGSAFE_HOME/state.json`.
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,
}
