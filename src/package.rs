use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::task::spawn_blocking;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::model::{Language, VocabularyEntry};
use crate::write::WordTable;
use crate::{info_time, warn_time, Error, Result, BASE_NAME};

/// Note type id. Fixed so re-imports reuse the note type instead of adding a copy.
pub const MODEL_ID: i64 = 1_607_392_319;
/// Deck ids are `DECK_ID_BASE + language ordinal`.
pub const DECK_ID_BASE: i64 = 2_059_400_110;

pub const MODEL_NAME: &str = BASE_NAME;
pub const FIELDS: [&str; 6] = ["rawID", "Kana", "KanjiKana", "Romaji", "Translation", "Audio"];

const FRONT_TEMPLATE: &str = include_str!("../assets/front.html");
const BACK_TEMPLATE: &str = include_str!("../assets/back.html");
const CARD_CSS: &str = include_str!("../assets/style.css");

const FIELD_SEPARATOR: char = '\x1f';

const SCHEMA: &str = r#"
CREATE TABLE col (
    id              integer primary key,
    crt             integer not null,
    mod             integer not null,
    scm             integer not null,
    ver             integer not null,
    dty             integer not null,
    usn             integer not null,
    ls              integer not null,
    conf            text not null,
    models          text not null,
    decks           text not null,
    dconf           text not null,
    tags            text not null
);
CREATE TABLE notes (
    id              integer primary key,
    guid            text not null,
    mid             integer not null,
    mod             integer not null,
    usn             integer not null,
    tags            text not null,
    flds            text not null,
    sfld            integer not null,
    csum            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE cards (
    id              integer primary key,
    nid             integer not null,
    did             integer not null,
    ord             integer not null,
    mod             integer not null,
    usn             integer not null,
    type            integer not null,
    queue           integer not null,
    due             integer not null,
    ivl             integer not null,
    factor          integer not null,
    reps            integer not null,
    lapses          integer not null,
    left            integer not null,
    odue            integer not null,
    odid            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE revlog (
    id              integer primary key,
    cid             integer not null,
    usn             integer not null,
    ease            integer not null,
    ivl             integer not null,
    lastIvl         integer not null,
    factor          integer not null,
    time            integer not null,
    type            integer not null
);
CREATE TABLE graves (
    usn             integer not null,
    oid             integer not null,
    type            integer not null
);
CREATE INDEX ix_notes_usn on notes (usn);
CREATE INDEX ix_cards_usn on cards (usn);
CREATE INDEX ix_revlog_usn on revlog (usn);
CREATE INDEX ix_cards_nid on cards (nid);
CREATE INDEX ix_cards_sched on cards (did, queue, due);
CREATE INDEX ix_revlog_cid on revlog (cid);
CREATE INDEX ix_notes_csum on notes (csum);
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckReport {
    pub path: PathBuf,
    pub notes: usize,
    pub media: usize,
    /// Entries packaged without their audio because the file wasn't downloaded.
    pub missing_audio: usize,
}

/// `<output>/MARUGOTO-NO-KOTOBA-<lang>.apkg`
pub fn deck_path(output_dir: &Path, language: Language) -> PathBuf {
    output_dir.join(format!("{BASE_NAME}-{language}.apkg"))
}

pub fn deck_id(language: Language) -> i64 {
    DECK_ID_BASE + language.ordinal() as i64
}

/// Builds the language's deck on the blocking pool.
pub async fn package_language(
    output_dir: PathBuf,
    language: Language,
    tables: Vec<WordTable>,
) -> Result<DeckReport> {
    let report = spawn_blocking(move || build_deck(&output_dir, language, &tables)).await??;
    Ok(report)
}

/// Writes one `.apkg` holding a note per entry of `tables` plus the audio files found on disk.
pub fn build_deck(output_dir: &Path, language: Language, tables: &[WordTable]) -> Result<DeckReport> {
    let path = deck_path(output_dir, language);
    fs::create_dir_all(output_dir)?;

    let entries: Vec<&VocabularyEntry> = tables
        .iter()
        .filter(|table| table.language == language)
        .flat_map(|table| table.entries())
        .collect();

    // Media is numbered in the archive, the `media` file maps number -> name.
    let mut media: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut missing_audio = 0;
    for entry in &entries {
        let Some(asset) = &entry.audio else { continue };
        let local = asset.local_path(output_dir);
        if local.is_file() {
            media.insert(asset.file_name(), local);
        } else {
            missing_audio += 1;
        }
    }
    if missing_audio > 0 {
        warn_time!("{missing_audio} entries of {language} are packaged without audio");
    }

    let collection = build_collection(output_dir, language, &entries, &media)?;

    let file = File::create(&path)?;
    let mut zip = ZipWriter::new(file);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("collection.anki2", deflated)?;
    zip.write_all(&collection)?;

    let mut media_map = serde_json::Map::new();
    for (idx, (name, local)) in media.iter().enumerate() {
        zip.start_file(idx.to_string(), stored)?;
        zip.write_all(&fs::read(local)?)?;
        media_map.insert(idx.to_string(), Value::String(name.clone()));
    }
    zip.start_file("media", deflated)?;
    zip.write_all(Value::Object(media_map).to_string().as_bytes())?;
    zip.finish()?;

    info_time!(
        "Packaged {} notes and {} audio files into {}",
        entries.len(),
        media.len(),
        path.display()
    );
    Ok(DeckReport {
        path,
        notes: entries.len(),
        media: media.len(),
        missing_audio,
    })
}

/// Fills a scratch SQLite collection next to the deck and returns its bytes.
fn build_collection(
    output_dir: &Path,
    language: Language,
    entries: &[&VocabularyEntry],
    media: &BTreeMap<String, PathBuf>,
) -> Result<Vec<u8>> {
    let db_path = output_dir.join(format!(".{BASE_NAME}-{language}.anki2"));
    if db_path.exists() {
        fs::remove_file(&db_path)?;
    }

    let res = fill_collection(&db_path, language, entries, media);
    let bytes = res.and_then(|()| fs::read(&db_path).map_err(Error::from));
    let _ = fs::remove_file(&db_path);
    bytes
}

fn fill_collection(
    db_path: &Path,
    language: Language,
    entries: &[&VocabularyEntry],
    media: &BTreeMap<String, PathBuf>,
) -> Result<()> {
    let mut conn = Connection::open(db_path)?;
    conn.execute_batch(SCHEMA)?;

    let now = Utc::now();
    let now_secs = now.timestamp();
    let now_millis = now.timestamp_millis();
    let did = deck_id(language);
    let deck_name = format!("{BASE_NAME}-{language}");

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO col VALUES (1, ?1, ?2, ?3, 11, 0, 0, 0, ?4, ?5, ?6, ?7, '{}')",
        params![
            now_secs,
            now_millis,
            now_millis,
            collection_conf(did).to_string(),
            json!({ MODEL_ID.to_string(): model(did, now_secs) }).to_string(),
            decks(did, &deck_name, now_secs).to_string(),
            deck_conf().to_string(),
        ],
    )?;

    let count = entries.len() as i64;
    for (idx, entry) in entries.iter().enumerate() {
        let idx = idx as i64;
        let note_id = now_millis + idx;
        let card_id = now_millis + count + idx;
        let flds = note_fields(entry, media).join(&FIELD_SEPARATOR.to_string());

        tx.execute(
            "INSERT INTO notes VALUES (?1, ?2, ?3, ?4, -1, ?5, ?6, ?7, ?8, 0, '')",
            params![
                note_id,
                note_guid(language, &entry.raw_id),
                MODEL_ID,
                now_secs,
                note_tags(entry),
                flds,
                entry.raw_id,
                field_checksum(&entry.raw_id),
            ],
        )?;
        tx.execute(
            "INSERT INTO cards VALUES (?1, ?2, ?3, 0, ?4, -1, 0, 0, ?5, 0, 0, 0, 0, 0, 0, 0, 0, '')",
            params![card_id, note_id, did, now_secs, idx + 1],
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// Field values in `FIELDS` order. Audio stays empty unless the clip ships in `media`.
fn note_fields(entry: &VocabularyEntry, media: &BTreeMap<String, PathBuf>) -> [String; 6] {
    let audio = match &entry.audio {
        Some(asset) if media.contains_key(&asset.file_name()) => asset.sound_tag(),
        _ => String::new(),
    };
    [
        entry.raw_id.clone(),
        entry.kana.clone(),
        entry.kanji_kana.clone(),
        entry.romaji.clone(),
        entry.translation.clone(),
        audio,
    ]
}

/// Anki keeps tags space separated with a space on both ends.
fn note_tags(entry: &VocabularyEntry) -> String {
    if entry.tags.is_empty() {
        return String::new();
    }
    format!(" {} ", entry.tags_joined())
}

/// Stable across runs, so importing a newer deck updates the notes in place.
fn note_guid(language: Language, raw_id: &str) -> String {
    let digest = Sha256::digest(format!("{BASE_NAME}:{language}:{raw_id}").as_bytes());
    digest.iter().take(10).map(|b| format!("{b:02x}")).collect()
}

fn field_checksum(sort_field: &str) -> i64 {
    let digest = Sha256::digest(sort_field.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as i64
}

fn model(did: i64, now_secs: i64) -> Value {
    let flds: Vec<Value> = FIELDS
        .iter()
        .enumerate()
        .map(|(ord, name)| {
            json!({
                "name": name,
                "ord": ord,
                "sticky": false,
                "rtl": false,
                "font": "Arial",
                "size": 20,
                "media": [],
            })
        })
        .collect();

    json!({
        "id": MODEL_ID,
        "name": MODEL_NAME,
        "type": 0,
        "mod": now_secs,
        "usn": -1,
        "sortf": 0,
        "did": did,
        "tmpls": [{
            "name": "Recognition",
            "ord": 0,
            "qfmt": FRONT_TEMPLATE,
            "afmt": BACK_TEMPLATE,
            "did": null,
            "bqfmt": "",
            "bafmt": "",
        }],
        "flds": flds,
        "css": CARD_CSS,
        "latexPre": "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n",
        "latexPost": "\\end{document}",
        "latexsvg": false,
        "tags": [],
        "vers": [],
        // The card exists as soon as Kana or KanjiKana is filled.
        "req": [[0, "any", [1, 2]]],
    })
}

fn collection_conf(did: i64) -> Value {
    json!({
        "activeDecks": [did],
        "curDeck": did,
        "newSpread": 0,
        "collapseTime": 1200,
        "timeLim": 0,
        "estTimes": true,
        "dueCounts": true,
        "curModel": MODEL_ID.to_string(),
        "nextPos": 1,
        "sortType": "noteFld",
        "sortBackwards": false,
        "addToCur": true,
    })
}

fn deck_json(id: i64, name: &str, now_secs: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "mod": now_secs,
        "usn": -1,
        "collapsed": false,
        "browserCollapsed": false,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
        "dyn": 0,
        "extendNew": 10,
        "extendRev": 50,
        "conf": 1,
    })
}

fn decks(did: i64, name: &str, now_secs: i64) -> Value {
    json!({
        "1": deck_json(1, "Default", now_secs),
        did.to_string(): deck_json(did, name, now_secs),
    })
}

fn deck_conf() -> Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "mod": 0,
            "usn": 0,
            "maxTaken": 60,
            "autoplay": true,
            "timer": 0,
            "replayq": true,
            "dyn": false,
            "new": {
                "bury": true,
                "delays": [1, 10],
                "initialFactor": 2500,
                "ints": [1, 4, 7],
                "order": 1,
                "perDay": 20,
                "separate": true,
            },
            "lapse": {
                "delays": [10],
                "leechAction": 0,
                "leechFails": 8,
                "minInt": 1,
                "mult": 0,
            },
            "rev": {
                "bury": true,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "perDay": 100,
            },
        }
    })
}
