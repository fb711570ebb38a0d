use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};

use crate::model::{AudioAsset, Language, Level, VocabularyEntry};
use crate::{info_time, Error, Result, BASE_NAME, DELIMITER};

pub const HEADER: [&str; 7] = ["rawID", "かな", "漢字・かな", "ローマ字", "翻訳", "音声", "タグ"];

/// All entries of one (language, level) partition, in arrival order, unique by `raw_id`.
#[derive(Debug, Clone)]
pub struct WordTable {
    pub language: Language,
    pub level: Level,
    entries: Vec<VocabularyEntry>,
    // raw_id -> index in `entries`
    seen: HashMap<String, usize>,
}

impl WordTable {
    pub fn new(language: Language, level: Level) -> Self {
        Self {
            language,
            level,
            entries: Vec::new(),
            seen: HashMap::new(),
        }
    }

    /// Appends the entry. A `raw_id` already in the table keeps its first row
    /// and gains the tags of the repeat. Returns whether a new row was added.
    pub fn push(&mut self, entry: VocabularyEntry) -> bool {
        if let Some(&idx) = self.seen.get(&entry.raw_id) {
            info_time!(
                "merging repeated {} in {}-{}",
                entry.raw_id,
                self.language,
                self.level
            );
            self.entries[idx].tags.extend(entry.tags);
            return false;
        }
        self.seen.insert(entry.raw_id.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<VocabularyEntry> for WordTable {
    fn extend<I: IntoIterator<Item = VocabularyEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.push(entry);
        }
    }
}

/// `<output>/words/MARUGOTO-NO-KOTOBA-<lang>-<level>.csv`
pub fn csv_path(output_dir: &Path, language: Language, level: Level) -> PathBuf {
    output_dir
        .join("words")
        .join(format!("{BASE_NAME}-{language}-{level}.csv"))
}

/// Renders the table: header row, then one row per entry.
/// Fields holding the delimiter, quotes or newlines get quoted, so they survive `parse_table`.
pub fn to_csv_bytes(table: &WordTable) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .delimiter(DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    wtr.write_record(HEADER)?;
    for entry in table.entries() {
        let audio_ref = entry.audio_ref();
        let tags = entry.tags_joined();
        wtr.write_record([
            entry.raw_id.as_str(),
            entry.kana.as_str(),
            entry.kanji_kana.as_str(),
            entry.romaji.as_str(),
            entry.translation.as_str(),
            audio_ref.as_str(),
            tags.as_str(),
        ])?;
    }
    wtr.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// Writes the table to its CSV, replacing whatever was there.
pub async fn write_table(output_dir: &Path, table: &WordTable) -> Result<PathBuf> {
    let path = csv_path(output_dir, table.language, table.level);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = to_csv_bytes(table)?;
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Reads a CSV produced by `write_table` back into a table.
pub async fn read_table(path: &Path, language: Language, level: Level) -> Result<WordTable> {
    let bytes = tokio::fs::read(path).await?;
    parse_table(&bytes, language, level)
}

pub fn parse_table(bytes: &[u8], language: Language, level: Level) -> Result<WordTable> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_reader(bytes);

    let header = rdr.headers()?.clone();
    if header.iter().ne(HEADER) {
        return Err(Error::MalformedRow {
            line: 1,
            reason: format!("unexpected header: {}", header.iter().collect::<Vec<_>>().join("|")),
        });
    }

    let mut table = WordTable::new(language, level);
    for record in rdr.records() {
        let record = record?;
        table.push(entry_from_record(&record, level)?);
    }
    Ok(table)
}

fn entry_from_record(record: &StringRecord, level: Level) -> Result<VocabularyEntry> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();

    let audio_ref = field(5);
    let audio = if audio_ref.is_empty() {
        None
    } else {
        let asset = AudioAsset::from_sound_tag(level, &audio_ref).ok_or_else(|| Error::MalformedRow {
            line,
            reason: format!("bad audio reference: {audio_ref}"),
        })?;
        Some(asset)
    };

    Ok(VocabularyEntry {
        raw_id: field(0),
        kana: field(1),
        kanji_kana: field(2),
        romaji: field(3),
        translation: field(4),
        audio,
        tags: field(6).split_whitespace().map(str::to_string).collect(),
        level,
    })
}
