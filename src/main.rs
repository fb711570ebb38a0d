use chrono::Local;
use clap::Parser;
use marugoto::{config::Cli, info_time, process::process_site, request::HttpSource, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Local::now();
    let config = Cli::parse().into_config();
    let source = HttpSource::new(&config)?;

    let report = process_site(&config, &source).await?;
    info_time!(
        start_time,
        "Full program time: {} csv files, {} audio downloaded, {} failed, {} decks",
        report.csv_files.len(),
        report.media.downloaded,
        report.media.failed,
        report.decks.len()
    );

    Ok(())
}
