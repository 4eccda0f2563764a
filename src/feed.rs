use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Enclosure, Episode, PodcastFeed, PodcastId, PodcastInfo};
use crate::util::ensure_parent;

/// How the feed stage obtains a podcast's feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Fetch the remote feed, parse it, and overwrite the cache file.
    Scrape,
    /// Read the previously persisted cache file only.
    Cached,
}

/// Cache location for one podcast's parsed feed.
pub fn feed_file_path(data_folder: &Path, podcast_id: &PodcastId) -> PathBuf {
    data_folder
        .join("raw")
        .join("podcast-feeds")
        .join(format!("{podcast_id}.json"))
}

/// Obtain a podcast's feed in the requested mode.
///
/// Both failure kinds are fatal for this podcast only; the caller logs and
/// moves on to the next one.
pub async fn fetch_feed(
    client: &reqwest::Client,
    info: &PodcastInfo,
    data_folder: &Path,
    mode: FeedMode,
) -> Result<PodcastFeed> {
    match mode {
        FeedMode::Scrape => scrape_feed(client, info, data_folder).await,
        FeedMode::Cached => read_feed_file(info, data_folder).await,
    }
}

async fn scrape_feed(
    client: &reqwest::Client,
    info: &PodcastInfo,
    data_folder: &Path,
) -> Result<PodcastFeed> {
    log::info!(
        "Scraping feed for podcast `{}` from `{}`",
        info.podcast_id,
        info.podcast_url
    );

    let fetch_err = |reason: String| Error::FeedFetch {
        podcast_id: info.podcast_id.clone(),
        reason,
    };

    let response = client
        .get(info.podcast_url.clone())
        .send()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fetch_err(format!("status {}", response.status())));
    }
    let body = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;

    let parsed = feed_rs::parser::parse(body.as_ref()).map_err(|e| Error::FeedParse {
        podcast_id: info.podcast_id.clone(),
        reason: e.to_string(),
    })?;
    let feed = podcast_feed_from(parsed);

    // The network always wins over a stale cache entry
    let cache_path = feed_file_path(data_folder, &info.podcast_id);
    ensure_parent(&cache_path).await?;
    tokio::fs::write(&cache_path, serde_json::to_string(&feed)?).await?;

    Ok(feed)
}

/// Read a previously scraped feed back from its cache file.
pub async fn read_feed_file(info: &PodcastInfo, data_folder: &Path) -> Result<PodcastFeed> {
    let cache_path = feed_file_path(data_folder, &info.podcast_id);
    let raw = match tokio::fs::read_to_string(&cache_path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::CacheMiss(cache_path));
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&raw).map_err(|e| Error::FeedParse {
        podcast_id: info.podcast_id.clone(),
        reason: format!("invalid cache file `{}`: {e}", cache_path.display()),
    })
}

/// Adapt the parser's feed model into the pipeline's own shape.
///
/// Entries without any audio enclosure are dropped here; everything
/// downstream assumes the first enclosure is the canonical audio.
fn podcast_feed_from(feed: feed_rs::model::Feed) -> PodcastFeed {
    let title = feed.title.map(|t| t.content).unwrap_or_default();
    let episodes = feed.entries.into_iter().filter_map(episode_from).collect();
    PodcastFeed { title, episodes }
}

fn episode_from(entry: feed_rs::model::Entry) -> Option<Episode> {
    let mut enclosures: Vec<Enclosure> = entry
        .media
        .iter()
        .flat_map(|media| media.content.iter())
        .filter_map(|content| {
            let url = content.url.as_ref()?.to_string();
            Some(Enclosure {
                url,
                file_size: content.size.unwrap_or(0),
                mime_type: content
                    .content_type
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "audio/mpeg".to_string()),
            })
        })
        .collect();

    // Atom-style feeds carry the enclosure as a typed link instead
    if enclosures.is_empty() {
        enclosures = entry
            .links
            .iter()
            .filter(|link| {
                link.media_type
                    .as_deref()
                    .is_some_and(|t| t.starts_with("audio/"))
            })
            .map(|link| Enclosure {
                url: link.href.clone(),
                file_size: link.length.unwrap_or(0),
                mime_type: link.media_type.clone().unwrap_or_default(),
            })
            .collect();
    }

    if enclosures.is_empty() {
        return None;
    }

    let title = entry.title.map(|t| t.content).unwrap_or_default();
    let published = entry
        .published
        .or(entry.updated)
        .map(|d| d.naive_utc())
        .unwrap_or_default();

    Some(Episode {
        title,
        enclosures,
        published,
    })
}
