//! HandSign Remote - Main Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use gesture::WriterSink;
use runtime::{init_logging, run, AppConfig, Args};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    init_logging(&config.logging)?;

    info!("=== HandSign Remote v{} ===", env!("CARGO_PKG_VERSION"));

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("Error setting Ctrl-C handler")?;

    let sink = WriterSink::stdout(config.output.json);
    run(&config, sink, &cancel)?;

    Ok(())
}
