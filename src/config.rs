use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::model::{Language, Level};
use crate::{warn_time, BASE_URL, DEFAULT_TIMEOUT_SECS};

/// Everything a run needs, passed explicitly down the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub levels: BTreeSet<Level>,
    pub languages: BTreeSet<Language>,
    pub output_dir: PathBuf,
    pub base_url: String,
    pub timeout: Duration,
    /// Also build one `.apkg` per language.
    pub package: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            levels: Level::ALL.into_iter().collect(),
            languages: BTreeSet::from([Language::En]),
            output_dir: PathBuf::from("."),
            base_url: BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            package: false,
        }
    }
}

/// Scrape MARUGOTO-NO-KOTOBA vocabulary into CSV files, audio clips and Anki decks.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Translation language id (en, es, id, th, zh, vi, fr). Repeatable.
    #[arg(short, long = "language")]
    pub languages: Vec<String>,

    /// Level id (A1, A2-1, A2-2). Repeatable. Defaults to every level.
    #[arg(short = 'L', long = "level")]
    pub levels: Vec<String>,

    /// Directory receiving `words/`, `media/` and the decks.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Build an importable Anki deck per language.
    #[arg(short, long)]
    pub package: bool,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    #[arg(long, default_value = BASE_URL)]
    pub base_url: String,
}

impl Cli {
    /// Unknown ids are reported and dropped: they yield no results instead of failing the run.
    pub fn into_config(self) -> Config {
        let defaults = Config::default();

        let languages = if self.languages.is_empty() {
            defaults.languages
        } else {
            known_ids(&self.languages)
        };
        let levels = if self.levels.is_empty() {
            defaults.levels
        } else {
            known_ids(&self.levels)
        };

        Config {
            levels,
            languages,
            output_dir: self.output_dir,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(self.timeout),
            package: self.package,
        }
    }
}

fn known_ids<T: std::str::FromStr<Err = String> + Ord>(ids: &[String]) -> BTreeSet<T> {
    ids.iter()
        .filter_map(|id| match id.parse() {
            Ok(known) => Some(known),
            Err(e) => {
                warn_time!("ignoring {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_is_the_default_run() {
        let config = Cli::parse_from(["marugoto-scraper"]).into_config();
        assert_eq!(config.levels.len(), 3);
        assert_eq!(config.languages, BTreeSet::from([Language::En]));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.base_url, BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(!config.package);
    }

    #[test]
    fn unknown_ids_are_dropped() {
        let config = Cli::parse_from([
            "marugoto-scraper",
            "-l",
            "fr",
            "-l",
            "klingon",
            "-L",
            "A2-2",
            "-L",
            "C2",
            "--package",
            "--base-url",
            "http://localhost:3000/",
        ])
        .into_config();
        assert_eq!(config.languages, BTreeSet::from([Language::Fr]));
        assert_eq!(config.levels, BTreeSet::from([Level::A2_2]));
        assert_eq!(config.base_url, "http://localhost:3000");
        assert!(config.package);
    }

    #[test]
    fn only_unknown_ids_select_nothing() {
        let config = Cli::parse_from(["marugoto-scraper", "-L", "B1"]).into_config();
        assert!(config.levels.is_empty());
    }
}
