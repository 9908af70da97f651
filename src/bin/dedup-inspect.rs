//! Run a harvest and list every card the dedup key collapsed, with the page
//! and position where the key was first seen.

use clap::Parser;
use review_harvester::cli::{run_harvest, HarvestArgs};
use tracing::error;

#[derive(Parser)]
#[command(name = "dedup-inspect", version, about = "Show duplicate review cards across pages")]
struct Cli {
    #[command(flatten)]
    harvest: HarvestArgs,
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

    println!(
        "{} unique review(s) over {} page(s), stopped: {:?}",
        report.count, report.pages_visited, report.termination
    );
    if report.duplicates.is_empty() {
        println!("no duplicates");
        return Ok(());
    }
    println!("{} duplicate(s):", report.duplicates.len());
    for hit in &report.duplicates {
        println!(
            "  {}  first seen {}  repeated {}",
            hit.key, hit.first_seen, hit.repeated_at
        );
    }
    Ok(())
}
