use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pm25-etl")]
#[command(about = "Incremental PM2.5 air-quality ETL into bronze, silver and gold tiers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file [default: pm25-etl.toml if present]"
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Hide the progress spinner")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one incremental extract, transform and load cycle
    Run,

    /// Create the store and its tier tables, then exit
    Init,

    /// Print the latest measurement time in the silver tier
    Watermark,

    /// Print the most recent daily summaries from the gold tier
    Summary {
        #[arg(short, long, default_value = "7", help = "Number of days (0 = all)")]
        days: usize,
    },
}
