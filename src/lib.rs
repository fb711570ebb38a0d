//! MARUGOTO-NO-KOTOBA SCRAPER
//! Pulls the vocabulary of words.marugotoweb.jp into `|` separated CSV files,
//! one per language and level, downloads the audio and optionally builds Anki decks.

pub mod config;
mod error;
mod macros;
pub mod media;
pub mod model;
pub mod package;
pub mod parse;
pub mod process;
pub mod request;
pub mod write;

pub use error::{Error, Result};

pub const BASE_URL: &str = "https://words.marugotoweb.jp";
pub const BASE_NAME: &str = "MARUGOTO-NO-KOTOBA";
/// Kana and translations contain commas, so CSV columns are split on pipes.
pub const DELIMITER: u8 = b'|';
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("marugoto-scraper/", env!("CARGO_PKG_VERSION"));
