use std::collections::BTreeSet;
use std::path::Path;

use chrono::Local;

use crate::model::AudioAsset;
use crate::request::Source;
use crate::write::WordTable;
use crate::{info_time, warn_time, Result};

/// Outcome of one downloader pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Distinct audio assets referenced by the tables. Entries of different languages
/// that share a raw id share the asset, so it ends up here once.
pub fn collect_assets<'a>(tables: impl IntoIterator<Item = &'a WordTable>) -> BTreeSet<AudioAsset> {
    tables
        .into_iter()
        .flat_map(|table| table.entries())
        .filter_map(|entry| entry.audio.clone())
        .collect()
}

/// A non-empty file at the target path counts as downloaded. Content isn't verified.
pub async fn is_downloaded(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Fetches every asset that isn't on disk yet, one after the other.
/// A failing asset is reported and counted, the rest still download.
pub async fn download_assets<S: Source>(
    source: &S,
    output_dir: &Path,
    assets: &BTreeSet<AudioAsset>,
) -> DownloadReport {
    let start_time = Local::now();
    info_time!("Starting audio downloads: {} assets", assets.len());

    let mut report = DownloadReport::default();
    for asset in assets {
        let path = asset.local_path(output_dir);
        if is_downloaded(&path).await {
            report.skipped += 1;
            continue;
        }
        match download_asset(source, asset, &path).await {
            Ok(()) => {
                info_time!("Downloaded {}", path.display());
                report.downloaded += 1;
            }
            Err(e) => {
                warn_time!("Could not download {}: {e}", asset.file_name());
                report.failed += 1;
            }
        }
    }

    info_time!(
        start_time,
        "Audio downloads completed: {} downloaded, {} already present, {} failed",
        report.downloaded,
        report.skipped,
        report.failed
    );
    report
}

/// Writes to `<file>.part` first and renames it into place,
/// so a broken download never sits at the final path.
async fn download_asset<S: Source>(source: &S, asset: &AudioAsset, path: &Path) -> Result<()> {
    let bytes = source.fetch_audio(asset).await?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let part = path.with_extension("mp3.part");
    if let Err(e) = tokio::fs::write(&part, &bytes).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e.into());
    }
    tokio::fs::rename(&part, path).await?;
    Ok(())
}
