use anyhow::Context;
use clap::Parser;
use pm25_etl::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).context("pm25-etl run failed")
}
