use std::path::PathBuf;

use chrono::Local;

use crate::config::Config;
use crate::media::{collect_assets, download_assets, DownloadReport};
use crate::package::{package_language, DeckReport};
use crate::parse::parse_page;
use crate::request::Source;
use crate::write::{write_table, WordTable};
use crate::{info_time, Result};

/// What one run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    pub csv_files: Vec<PathBuf>,
    pub entries: usize,
    pub media: DownloadReport,
    pub decks: Vec<DeckReport>,
}

/// fetch -> parse -> accumulate -> write CSV -> download media -> package.
/// Every step is awaited before the next one starts.
pub async fn process_site<S: Source>(config: &Config, source: &S) -> Result<RunReport> {
    let start_time = Local::now();
    info_time!("Started scraping");

    let mut report = RunReport::default();

    let tables = scrape_tables(config, source).await?;
    for table in &tables {
        let path = write_table(&config.output_dir, table).await?;
        info_time!("Exported {} entries to {}", table.len(), path.display());
        report.entries += table.len();
        report.csv_files.push(path);
    }

    let assets = collect_assets(&tables);
    report.media = download_assets(source, &config.output_dir, &assets).await;

    if config.package {
        for &language in &config.languages {
            let lang_tables = tables
                .iter()
                .filter(|table| table.language == language)
                .cloned()
                .collect();
            let deck = package_language(config.output_dir.clone(), language, lang_tables).await?;
            report.decks.push(deck);
        }
    }

    info_time!(start_time, "Finished scraping: {} entries", report.entries);
    Ok(report)
}

/// Fetches and parses every (language, level) pair of the config into its own table.
pub async fn scrape_tables<S: Source>(config: &Config, source: &S) -> Result<Vec<WordTable>> {
    let mut tables = Vec::with_capacity(config.languages.len() * config.levels.len());
    for &language in &config.languages {
        for &level in &config.levels {
            let local_now = Local::now();
            let json = source.fetch_words(language, level).await?;

            let mut table = WordTable::new(language, level);
            table.extend(parse_page(json, level).await?);
            info_time!(local_now, "Parsed {language}-{level}: {} entries", table.len());

            tables.push(table);
        }
    }
    Ok(tables)
}
