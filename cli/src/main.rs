use clap::Parser;
use imgsafe_cli::Cli;
use imgsafe_cli::run_main;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_main(cli).await
}
