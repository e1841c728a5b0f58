use std::path::PathBuf;

use clap::Parser as ClapParser;
use tracing::Level;

pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

#[derive(ClapParser)]
#[command(name = "arbos", author, version = VERSION_STRING, about = "Replays L2 inbox requests against a fresh chain state", long_about = None)]
pub struct Options {
    #[arg(long = "network", value_name = "GENESIS_FILE_PATH", env = "ARBOS_NETWORK")]
    pub network: PathBuf,
    #[arg(
        long = "messages",
        value_name = "MESSAGES_FILE_PATH",
        help = "JSON array of transaction requests, processed in order"
    )]
    pub messages: PathBuf,
    #[arg(
        long = "output",
        value_name = "RECEIPTS_FILE_PATH",
        help = "Write receipts to this file instead of stdout"
    )]
    pub output: Option<PathBuf>,
    #[arg(long = "log.level", default_value_t = Level::INFO, value_name = "LOG_LEVEL")]
    pub log_level: Level,
}
