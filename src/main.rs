use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use podscribe::cli::Cli;
use podscribe::pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let shuffle = cli.shuffle_seed();
    if let (Some(seed), None) = (shuffle, cli.seed) {
        log::info!("Shuffle seed: {seed}");
    }

    pipeline::run(cli.pipeline_options(shuffle)).await?;
    Ok(())
}

fn init_logging(quiet: bool, verbose: u8) {
    let default_level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
