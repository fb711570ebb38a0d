use std::collections::BTreeSet;

use scraper::Html;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio::task::spawn_blocking;

use crate::model::{AudioAsset, Level, VocabularyEntry};
use crate::Result;

/// Body of `SearchCategoryAPI`. Unknown levels/languages come back without `DATA`.
#[derive(Debug, Default, Deserialize)]
struct WordsPage {
    #[serde(rename = "DATA", default)]
    data: Option<Vec<RawWord>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWord {
    #[serde(rename = "RAWID", deserialize_with = "lenient_text")]
    raw_id: String,
    #[serde(rename = "KANA", deserialize_with = "lenient_text")]
    kana: String,
    #[serde(rename = "KANJI", deserialize_with = "lenient_text")]
    kanji: String,
    #[serde(rename = "ROMAJI", deserialize_with = "lenient_text")]
    romaji: String,
    #[serde(rename = "UWRD", deserialize_with = "lenient_text")]
    translation: String,
    #[serde(rename = "ATTR", deserialize_with = "lenient_attrs")]
    attrs: Vec<RawAttr>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAttr {
    #[serde(deserialize_with = "lenient_text")]
    level: String,
    #[serde(deserialize_with = "lenient_text")]
    utext: String,
    #[serde(deserialize_with = "lenient_text")]
    topic: String,
    #[serde(deserialize_with = "lenient_text")]
    lesson: String,
}

/// Missing, null or oddly typed fields become plain strings (or empty) instead of failing the page.
fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> core::result::Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_attrs<'de, D: Deserializer<'de>>(d: D) -> core::result::Result<Vec<RawAttr>, D::Error> {
    Ok(Option::<Vec<RawAttr>>::deserialize(d)?.unwrap_or_default())
}

/// Lazy, one-pass sequence of the entries of one words page.
/// Re-fetch the page to iterate again.
#[derive(Debug)]
pub struct Entries {
    level: Level,
    words: std::vec::IntoIter<RawWord>,
}

impl Iterator for Entries {
    type Item = VocabularyEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let word = self.words.next()?;
        Some(to_entry(word, self.level))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.words.size_hint()
    }
}

/// Parses a words page on the blocking pool.
pub async fn parse_page(json: String, level: Level) -> Result<Entries> {
    let entries = spawn_blocking(move || parse_words(&json, level)).await??;
    Ok(entries)
}

/// Attempts to parse the page. Only a body that isn't JSON at all is an error.
pub fn parse_words(json: &str, level: Level) -> Result<Entries> {
    let page: WordsPage = serde_json::from_str(json)?;
    Ok(Entries {
        level,
        words: page.data.unwrap_or_default().into_iter(),
    })
}

fn to_entry(word: RawWord, level: Level) -> VocabularyEntry {
    let raw_id = plain_text(&word.raw_id);
    VocabularyEntry {
        audio: AudioAsset::from_raw_id(level, &raw_id),
        kana: plain_text(&word.kana),
        kanji_kana: plain_text(&word.kanji),
        romaji: plain_text(&word.romaji),
        translation: plain_text(&word.translation),
        tags: extract_tags(&word.attrs),
        raw_id,
        level,
    }
}

/// Every attribute contributes its level, its text type, `Topic<n>` and `Lesson<n>`.
/// Sorted, deduplicated, whitespace inside a tag becomes `_`.
fn extract_tags(attrs: &[RawAttr]) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    for attr in attrs {
        let level = attr.level.trim();
        let utext = attr.utext.trim();
        let topic = attr.topic.trim();
        let lesson = attr.lesson.trim();

        let candidates = [
            (!level.is_empty()).then(|| level.to_string()),
            (!utext.is_empty()).then(|| utext.to_string()),
            (!topic.is_empty()).then(|| format!("Topic{topic}")),
            (!lesson.is_empty()).then(|| format!("Lesson{lesson}")),
        ];
        tags.extend(
            candidates
                .into_iter()
                .flatten()
                .map(|tag| tag.split_whitespace().collect::<Vec<_>>().join("_")),
        );
    }
    tags
}

/// Reduces inline markup and entities (`<b>猫</b>`, `&amp;`) to their text.
fn plain_text(field: &str) -> String {
    if !field.contains(['<', '&']) {
        return field.trim().to_string();
    }
    let fragment = Html::parse_fragment(field);
    let text = fragment.root_element().text().collect::<String>();
    text.trim().to_string()
}
