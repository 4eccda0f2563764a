use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use futures_util::StreamExt;
use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::types::{Episode, EpisodeKey};
use crate::util::ensure_parent;

/// Fixed pause after every real download, so a long batch does not hammer
/// the remote host. Cache hits never pay it.
const POLITENESS_DELAY: Duration = Duration::from_secs(1);

/// How the audio stage obtains an episode's audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    /// Download the enclosure when the file is not already cached.
    Download,
    /// Only accept files that already exist on disk.
    CachedOnly,
}

fn extension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\.([^.]+?)(?:\?.+)?$").expect("extension pattern is valid"))
}

/// Extract the final `.<ext>` segment of a URL, ignoring any query string.
pub fn file_extension(url: &str) -> Result<String> {
    extension_pattern()
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::MalformedUrl(url.to_string()))
}

/// The canonical audio URL of an episode: its first enclosure.
pub fn episode_url(episode: &Episode) -> Result<&str> {
    episode
        .enclosures
        .first()
        .map(|enclosure| enclosure.url.as_str())
        .ok_or_else(|| Error::MalformedUrl(format!("episode `{}` has no enclosure", episode.title)))
}

/// Canonical on-disk location for an episode's audio.
pub fn episode_audio_path(
    data_folder: &Path,
    key: &EpisodeKey,
    episode: &Episode,
) -> Result<PathBuf> {
    let extension = file_extension(episode_url(episode)?)?;
    Ok(data_folder
        .join("raw")
        .join("audio")
        .join(key.podcast_id.as_str())
        .join(format!("{}.{extension}", key.slug)))
}

/// Ensure an episode's audio file exists on disk and return its path.
///
/// Cache-first: an existing file is returned as-is with no network access.
/// A miss in [`AudioMode::CachedOnly`] surfaces as [`Error::CacheMiss`] so
/// the caller can drop the episode from the stage mapping.
pub async fn acquire(
    client: &reqwest::Client,
    key: &EpisodeKey,
    episode: &Episode,
    data_folder: &Path,
    mode: AudioMode,
) -> Result<PathBuf> {
    let file_path = episode_audio_path(data_folder, key, episode)?;
    if file_path.exists() {
        log::info!(
            "File `{}` already exists, skipping download",
            file_path.display()
        );
        return Ok(file_path);
    }

    match mode {
        AudioMode::CachedOnly => Err(Error::CacheMiss(file_path)),
        AudioMode::Download => {
            download_file(client, episode_url(episode)?, &file_path).await?;
            Ok(file_path)
        }
    }
}

/// Download `url` to `file_path`, streaming through a `.part` temp file that
/// is renamed into place only once the full body has been written. The final
/// path never names a partial download.
async fn download_file(client: &reqwest::Client, url: &str, file_path: &Path) -> Result<()> {
    log::info!("Downloading `{}` to `{}`", url, file_path.display());

    let download_err = |reason: String| Error::Download {
        url: url.to_string(),
        reason,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| download_err(e.to_string()))?;
    if !response.status().is_success() {
        return Err(download_err(format!("status {}", response.status())));
    }

    ensure_parent(file_path).await?;
    let part_path = file_path.with_extension("part");

    let result = write_stream(response, &part_path).await;
    if let Err(reason) = result {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(download_err(reason));
    }

    tokio::fs::rename(&part_path, file_path).await?;
    tokio::time::sleep(POLITENESS_DELAY).await;
    Ok(())
}

async fn write_stream(
    response: reqwest::Response,
    part_path: &Path,
) -> std::result::Result<(), String> {
    let content_length = response.content_length();
    let mut stream = response.bytes_stream();
    let mut file = tokio::fs::File::create(part_path)
        .await
        .map_err(|e| format!("failed to create file: {e}"))?;
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| format!("error reading download stream: {e}"))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| format!("failed to write chunk: {e}"))?;
        downloaded += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| format!("failed to flush file: {e}"))?;

    if let Some(expected) = content_length {
        if downloaded != expected {
            return Err(format!(
                "incomplete body: got {downloaded} bytes, expected {expected}"
            ));
        }
    }
    Ok(())
}
