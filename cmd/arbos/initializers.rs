use std::{fs::File, io::BufReader, path::Path};

use arbos_common::types::{ArbosGenesis, TxRequest};
use arbos_storage::JumpDestTranslator;
use arbos_vm::Arbos;
use eyre::WrapErr;
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::Directive, fmt, layer::SubscriberExt};

use crate::cli::Options;

pub fn init_tracing(opts: &Options) -> eyre::Result<()> {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(opts.log_level))
        .from_env_lossy();

    // Receipts go to stdout, logs to stderr.
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(log_filter);
    let subscriber = Registry::default().with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("setting default subscriber failed")
}

/// Builds the initial chain state described by the genesis file.
pub fn init_arbos(network: &Path) -> eyre::Result<Arbos> {
    let genesis = ArbosGenesis::try_from(network)
        .wrap_err_with(|| format!("Failed to load genesis {}", network.display()))?;
    let arbos = Arbos::from_genesis(&genesis, Box::new(JumpDestTranslator))?;
    Ok(arbos)
}

pub fn read_messages(path: &Path) -> eyre::Result<Vec<TxRequest>> {
    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open messages file {}", path.display()))?;
    let messages: Vec<TxRequest> = serde_json::from_reader(BufReader::new(file))
        .wrap_err("Failed to decode messages file")?;
    info!(count = messages.len(), "Loaded messages");
    Ok(messages)
}
