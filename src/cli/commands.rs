use tracing::error;

use crate::cli::args::{Cli, Commands};
use crate::config::{load_config, EtlConfig, LoggingConfig};
use crate::error::Result;
use crate::pipeline::{logged_run, EtlPipeline, RunReport};
use crate::processors::Aggregator;
use crate::readers::WatermarkReader;
use crate::store;
use crate::utils::logging::init_logging;
use crate::utils::progress::ProgressReporter;

pub fn run(cli: Cli) -> Result<()> {
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // No configured destination yet: log with the defaults
            if let Err(log_err) =
                init_logging(&LoggingConfig::default(), cli.verbose, cli.log_file.as_deref())
            {
                eprintln!("Could not initialise logging: {}", log_err);
            }
            error!(kind = %e.kind(), error = %e, "failed to load configuration");
            return Err(e);
        }
    };

    if let Some(path) = init_logging(&config.logging, cli.verbose, cli.log_file.as_deref())? {
        if !cli.quiet {
            println!("Logging to {}", path.display());
        }
    }

    match cli.command {
        Commands::Run => run_pipeline(&config, cli.quiet).map(|_| ()),
        Commands::Init => {
            store::open(&config.store)?;
            println!(
                "Store initialised at {}",
                config.store.database_path.display()
            );
            Ok(())
        }
        Commands::Watermark => {
            let conn = store::open(&config.store)?;
            let watermark = WatermarkReader::new().read(&conn)?;
            println!("Watermark: {}", watermark);
            Ok(())
        }
        Commands::Summary { days } => {
            let conn = store::open(&config.store)?;
            // 0 means every stored day
            let latest = if days == 0 { None } else { Some(days) };
            let summaries = Aggregator::read_summaries(&conn, latest)?;

            if summaries.is_empty() {
                println!("No daily summaries yet. Run `pm25-etl run` first.");
                return Ok(());
            }

            println!("Daily PM2.5 summaries ({} days):", summaries.len());
            for summary in &summaries {
                println!("  {}", summary);
            }
            Ok(())
        }
    }
}

/// One logged run: the store is opened and the extractor built inside the
/// run markers, so their failures are logged like any stage failure.
fn run_pipeline(config: &EtlConfig, quiet: bool) -> Result<RunReport> {
    println!("Running incremental PM2.5 ETL...");
    println!("City: {}, parameter: {}", config.api.city, config.api.parameter);
    println!("Store: {}", config.store.database_path.display());

    let progress = ProgressReporter::new_spinner("Starting run...", quiet);

    let result = logged_run(|| {
        progress.set_message("Opening store...");
        let mut conn = store::open(&config.store)?;
        let pipeline = EtlPipeline::from_config(config)?;
        pipeline.run_stages(&mut conn, Some(&progress))
    });

    match &result {
        Ok(report) => {
            if report.is_noop() {
                progress.finish_with_message("No new data");
            }
            println!("\n{}", report.summary());
        }
        Err(e) => progress.abandon_with_message(&format!("Run failed ({})", e.kind())),
    }

    result
}
