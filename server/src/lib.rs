//! Stdio front end for the theme service.
//!
//! Inbound bus events arrive as JSON lines on stdin and outbound events are
//! written as JSON lines to stdout. Logs go to stderr.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_channel::Receiver;
use async_channel::Sender;
use clap::Parser;
use themer_core::SassCommand;
use themer_core::ThemeService;
use themer_core::ThemerConfig;
use themer_protocol::InboundEvent;
use themer_protocol::OutboundEvent;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Serves theme requests over stdin/stdout.
#[derive(Debug, Parser)]
#[clap(author, version, name = "themer-server")]
pub struct Cli {
    /// Directory holding `themes/`, `frontend/active/` and `themer.toml`.
    /// Defaults to the parent of the directory containing this executable.
    #[arg(long = "install-dir", value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Print the JSON Schema of the bus messages and exit.
    #[arg(long = "print-schema", default_value_t = false)]
    pub print_schema: bool,
}

/// Logs to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    if cli.print_schema {
        let schema = themer_protocol::protocol_schema()?;
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let install_dir = match cli.install_dir {
        Some(dir) => dir,
        None => default_install_dir()?,
    };
    let config = ThemerConfig::load(&install_dir)?;
    info!(install_dir = %install_dir.display(), namespace = %config.namespace, "starting theme service");

    let (tx_event, rx_event) = async_channel::unbounded();
    let writer = tokio::spawn(write_events(rx_event));

    let compiler = Arc::new(SassCommand::new(config.sass_command.clone()));
    let service = ThemeService::start(&config, compiler, tx_event)
        .await
        .context("failed to start theme service")?;

    let (tx_inbound, rx_inbound) = async_channel::unbounded();
    let reader = tokio::spawn(read_events(tx_inbound));

    service.run(rx_inbound).await;
    drop(service);

    reader.await?;
    writer.await?;
    info!("stdin closed; theme service stopped");
    Ok(())
}

fn default_install_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to locate the running executable")?;
    exe.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .with_context(|| format!("{} has no install directory", exe.display()))
}

async fn read_events(tx_inbound: Sender<InboundEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!(error = %err, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundEvent>(&line) {
            Ok(event) => {
                if tx_inbound.send(event).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!(error = %err, "ignoring malformed event"),
        }
    }
}

async fn write_events(rx_event: Receiver<OutboundEvent>) {
    let mut stdout = tokio::io::stdout();
    while let Ok(event) = rx_event.recv().await {
        let mut line = match serde_json::to_vec(&event) {
            Ok(line) => line,
            Err(err) => {
                error!(error = %err, "failed to serialize event");
                continue;
            }
        };
        line.push(b'\n');
        if let Err(err) = stdout.write_all(&line).await {
            error!(error = %err, "failed to write event to stdout");
            break;
        }
        if let Err(err) = stdout.flush().await {
            error!(error = %err, "failed to flush stdout");
            break;
        }
    }
}
