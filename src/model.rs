use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::BASE_NAME;

/// Proficiency levels offered by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    A1,
    A2_1,
    A2_2,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::A1, Level::A2_1, Level::A2_2];

    /// Id used by the site in queries, file names and audio paths.
    pub fn id(self) -> &'static str {
        match self {
            Level::A1 => "A1",
            Level::A2_1 => "A2-1",
            Level::A2_2 => "A2-2",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown level: {s}"))
    }
}

/// Translation languages offered by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    En,
    Es,
    Id,
    Th,
    Zh,
    Vi,
    Fr,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::En,
        Language::Es,
        Language::Id,
        Language::Th,
        Language::Zh,
        Language::Vi,
        Language::Fr,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Id => "id",
            Language::Th => "th",
            Language::Zh => "zh",
            Language::Vi => "vi",
            Language::Fr => "fr",
        }
    }

    /// Position in `ALL`, stable across runs.
    pub fn ordinal(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown language: {s}"))
    }
}

/// One audio clip on the site. Shared by every entry with the same raw id, whatever the language.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AudioAsset {
    /// Level of the page the clip was found on; owns the media directory.
    pub level: Level,
    /// Raw id prefix (`A1` in `A1-0123`). Names the clip on the site, may differ from `level`.
    pub prefix: String,
    pub raw_audio_id: String,
}

impl AudioAsset {
    /// Derives the asset from a raw id shaped `<prefix>-<digits>`, where the prefix holds no `_`.
    /// Anything else has no audio on the site.
    pub fn from_raw_id(level: Level, raw_id: &str) -> Option<Self> {
        let (prefix, digits) = raw_id.rsplit_once('-')?;
        Self::from_parts(level, prefix, digits)
    }

    fn from_parts(level: Level, prefix: &str, digits: &str) -> Option<Self> {
        if prefix.is_empty() || prefix.contains('_') {
            return None;
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(AudioAsset {
            level,
            prefix: prefix.to_string(),
            raw_audio_id: digits.to_string(),
        })
    }

    /// `A1W_0123.mp3`
    pub fn file_name(&self) -> String {
        format!("{}W_{}.mp3", self.prefix, self.raw_audio_id)
    }

    /// Path below the site root, e.g. `/res/keyword/audio/A1W/A1W_0123.mp3`.
    pub fn remote_path(&self) -> String {
        format!("/res/keyword/audio/{}W/{}", self.prefix, self.file_name())
    }

    /// Directory that holds every asset of `level`.
    pub fn media_dir(output_dir: &Path, level: Level) -> PathBuf {
        output_dir
            .join("media")
            .join(format!("{BASE_NAME}-{level}"))
    }

    pub fn local_path(&self, output_dir: &Path) -> PathBuf {
        Self::media_dir(output_dir, self.level).join(self.file_name())
    }

    /// Anki sound tag written in the audio column: `[sound:A1W_0123.mp3]`.
    pub fn sound_tag(&self) -> String {
        format!("[sound:{}]", self.file_name())
    }

    /// Inverse of `sound_tag` for a clip found on a `level` page.
    pub fn from_sound_tag(level: Level, tag: &str) -> Option<Self> {
        let file = tag.strip_prefix("[sound:")?.strip_suffix("]")?;
        let stem = file.strip_suffix(".mp3")?;
        let (prefix, digits) = stem.rsplit_once("W_")?;
        Self::from_parts(level, prefix, digits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub raw_id: String,
    pub kana: String,
    pub kanji_kana: String,
    pub romaji: String,
    pub translation: String,
    pub audio: Option<AudioAsset>,
    pub tags: BTreeSet<String>,
    pub level: Level,
}

impl VocabularyEntry {
    /// Value of the audio column; empty when the entry has no clip.
    pub fn audio_ref(&self) -> String {
        self.audio
            .as_ref()
            .map(AudioAsset::sound_tag)
            .unwrap_or_default()
    }

    /// Value of the tags column.
    pub fn tags_joined(&self) -> String {
        self.tags.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_and_language_parse_site_ids() {
        assert_eq!("A2-1".parse::<Level>(), Ok(Level::A2_1));
        assert_eq!("a1".parse::<Level>(), Ok(Level::A1));
        assert!("B1".parse::<Level>().is_err());
        assert_eq!("zh".parse::<Language>(), Ok(Language::Zh));
        assert!("de".parse::<Language>().is_err());
        assert_eq!(Language::Fr.ordinal(), 6);
    }

    #[test]
    fn audio_asset_from_raw_id() {
        let asset = AudioAsset::from_raw_id(Level::A2_1, "A2-1-0034").unwrap();
        assert_eq!(asset.raw_audio_id, "0034");
        assert_eq!(asset.file_name(), "A2-1W_0034.mp3");
        assert_eq!(asset.remote_path(), "/res/keyword/audio/A2-1W/A2-1W_0034.mp3");
        assert_eq!(asset.sound_tag(), "[sound:A2-1W_0034.mp3]");

        assert!(AudioAsset::from_raw_id(Level::A1, "A1_x-12").is_none());
        assert!(AudioAsset::from_raw_id(Level::A1, "A1-12a").is_none());
        assert!(AudioAsset::from_raw_id(Level::A1, "12").is_none());
    }

    #[test]
    fn local_path_is_partitioned_by_level() {
        let asset = AudioAsset::from_raw_id(Level::A1, "A1-7").unwrap();
        let path = asset.local_path(Path::new("out"));
        assert_eq!(
            path,
            Path::new("out/media/MARUGOTO-NO-KOTOBA-A1/A1W_7.mp3")
        );
    }

    #[test]
    fn clip_named_after_raw_id_prefix_not_page_level() {
        let asset = AudioAsset::from_raw_id(Level::A2_1, "A1-0005").unwrap();
        assert_eq!(asset.prefix, "A1");
        assert_eq!(asset.file_name(), "A1W_0005.mp3");
        assert_eq!(asset.remote_path(), "/res/keyword/audio/A1W/A1W_0005.mp3");
        assert_eq!(
            asset.local_path(Path::new("out")),
            Path::new("out/media/MARUGOTO-NO-KOTOBA-A2-1/A1W_0005.mp3")
        );
    }

    #[test]
    fn sound_tag_round_trips() {
        let asset = AudioAsset::from_raw_id(Level::A2_2, "A2-2-101").unwrap();
        assert_eq!(
            AudioAsset::from_sound_tag(Level::A2_2, &asset.sound_tag()),
            Some(asset)
        );
        let borrowed = AudioAsset::from_raw_id(Level::A2_2, "A1-7").unwrap();
        assert_eq!(
            AudioAsset::from_sound_tag(Level::A2_2, "[sound:A1W_7.mp3]"),
            Some(borrowed)
        );
        assert_eq!(AudioAsset::from_sound_tag(Level::A1, ""), None);
        assert_eq!(AudioAsset::from_sound_tag(Level::A1, "[sound:foo.mp3]"), None);
    }
}
