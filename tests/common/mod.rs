#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use marugoto::config::Config;
use marugoto::model::{AudioAsset, Language, Level};
use marugoto::request::Source;
use marugoto::{Error, Result};

/// 3 entries, 2 of them the same word listed under two lessons: 2 distinct audio clips.
/// The second word has an empty translation.
pub const WORDS_A1: &str = include_str!("../fixtures/words_a1.json");

/// Serves fixture pages and fake mp3 bytes, and records every request it gets.
#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<(Language, Level), String>,
    failing_audio: HashSet<String>,
    failing_words: bool,
    requests: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, language: Language, level: Level, json: &str) -> Self {
        self.pages.insert((language, level), json.to_string());
        self
    }

    pub fn with_failing_audio(mut self, file_name: &str) -> Self {
        self.failing_audio.insert(file_name.to_string());
        self
    }

    pub fn with_failing_words(mut self) -> Self {
        self.failing_words = true;
        self
    }

    pub fn audio_requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.strip_prefix("audio ").map(str::to_string))
            .collect()
    }

    pub fn word_requests(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.starts_with("words "))
            .count()
    }

    fn log(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }
}

impl Source for FakeSource {
    async fn fetch_words(&self, language: Language, level: Level) -> Result<String> {
        self.log(format!("words {language}-{level}"));
        if self.failing_words {
            return Err(Error::Timeout {
                url: format!("fake://words/{language}-{level}"),
            });
        }
        // The site answers unknown combinations without DATA.
        Ok(self
            .pages
            .get(&(language, level))
            .cloned()
            .unwrap_or_else(|| "{}".to_string()))
    }

    async fn fetch_audio(&self, asset: &AudioAsset) -> Result<Vec<u8>> {
        let name = asset.file_name();
        self.log(format!("audio {name}"));
        if self.failing_audio.contains(&name) {
            return Err(Error::NotFound {
                url: format!("fake://audio/{name}"),
            });
        }
        Ok(fake_mp3(&name))
    }
}

pub fn fake_mp3(file_name: &str) -> Vec<u8> {
    format!("ID3 {file_name}").into_bytes()
}

pub fn config(output_dir: &Path, languages: &[Language], levels: &[Level]) -> Config {
    Config {
        levels: levels.iter().copied().collect(),
        languages: languages.iter().copied().collect(),
        output_dir: output_dir.to_path_buf(),
        base_url: "fake://".to_string(),
        timeout: Duration::from_secs(1),
        package: false,
    }
}

/// File names directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}
