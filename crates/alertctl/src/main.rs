use anyhow::Context;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = alertctl::Cli::parse();
    alertctl::init_logging(&cli.log);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(cli.run())
}
