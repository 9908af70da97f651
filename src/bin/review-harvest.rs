//! Harvest reviews for one product and write the report as JSON.

use clap::Parser;
use review_harvester::cli::{run_harvest, HarvestArgs};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "review-harvest", version, about = "Harvest storefront reviews to JSON")]
struct Cli {
    #[command(flatten)]
    harvest: HarvestArgs,

    /// Write the report here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    review_harvester::init_tracing();
    let cli = Cli::parse();

    let report = match run_harvest(&cli.harvest).await {
        Ok(report) => report,
        Err(e) => {
            error!("harvest failed: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    let json = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("💾 {} review(s) written to {}", report.count, path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
