use clap::Parser;
use themer_server::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    themer_server::init_tracing();
    themer_server::run_main(Cli::parse()).await
}
