mod cli;
mod initializers;

use std::{fs::File, io::BufWriter};

use arbos_common::types::Receipt;
use arbos_vm::NoInterpreter;
use clap::Parser;
use tracing::{error, info};

use crate::{
    cli::Options,
    initializers::{init_arbos, init_tracing, read_messages},
};

fn main() -> eyre::Result<()> {
    let opts = Options::parse();
    init_tracing(&opts)?;

    let mut arbos = init_arbos(&opts.network)?;
    let messages = read_messages(&opts.messages)?;

    let mut executor = NoInterpreter;
    let mut receipts: Vec<Receipt> = Vec::with_capacity(messages.len());
    for (index, message) in messages.iter().enumerate() {
        if let Err(err) = arbos.process_request(message, &mut executor, &mut receipts) {
            error!(index, %err, "Processing halted");
            return Err(err.into());
        }
    }

    let succeeded = receipts.iter().filter(|receipt| receipt.succeeded()).count();
    info!(
        processed = receipts.len(),
        succeeded,
        code_hash = %arbos.running_code().code_hash,
        "Replay finished"
    );

    match &opts.output {
        Some(path) => serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &receipts)?,
        None => serde_json::to_writer_pretty(std::io::stdout().lock(), &receipts)?,
    }
    Ok(())
}
