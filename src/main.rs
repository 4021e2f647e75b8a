//! schemals - Schema-driven Language Server
//!
//! stdout carries the protocol in stdio mode, so logs go to stderr or to
//! `--log-file`.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schemals::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("schemals: {e:#}");
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("schemals: failed to create runtime: {e}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async_main(cli));
    // a blocked stdin read would otherwise hold the runtime open
    runtime.shutdown_background();

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        eprintln!("schemals: {e:#}");
        std::process::exit(2);
    }
}

/// Quiet by default; RUST_LOG=schemals=debug shows per-request flow
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_filter = if verbose { "schemals=debug" } else { "schemals=info" };

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("cannot open log file {}: {}", path.display(), e))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(ansi)
                .with_writer(writer)
                .compact(),
        )
        .init();

    Ok(())
}

async fn async_main(cli: Cli) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down");
                cancel.cancel();
            }
        }
    });

    execute_command(cli.command, cancel).await
}

async fn execute_command(command: Commands, cancel: CancellationToken) -> anyhow::Result<()> {
    use schemals::cli::commands;

    match command {
        Commands::Serve(args) => commands::serve::execute(args, cancel).await,
        Commands::Config(args) => commands::config::execute(args).await,
    }
}
