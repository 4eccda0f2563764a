
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{
    published_format, Episode, EpisodeKey, EpisodeSlug, ModelName, PodcastFeed, PodcastId,
    PodcastInfo, Transcript, TranscriptKey,
};
use crate::util::{ensure_parent, seconds_to_timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedSegment {
    pub timestamp: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedTranscript {
    pub segments: Vec<CollectedSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedEpisode {
    pub episode_title: String,
    pub episode_slug: EpisodeSlug,
    #[serde(with = "published_format")]
    pub published: NaiveDateTime,
    pub transcript: CollectedTranscript,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedPodcast {
    pub podcast_id: PodcastId,
    pub podcast_title: String,
    pub episodes: Vec<CollectedEpisode>,
}

/// The final denormalized export, built fresh every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedData {
    pub podcasts: Vec<CollectedPodcast>,
}

/// Join registry, feeds, episodes, and transcripts into one export tree.
///
/// Premium (and disabled) podcasts contribute nothing. Every descriptor
/// that does contribute must have a feed — a missing one means an upstream
/// stage broke its contract, so it is a fatal [`Error::MissingFeed`] rather
/// than a skip. Episodes without any transcript stay in the export with an
/// empty segment list; only the premium filter drops entries.
pub fn collect_data(
    infos: &[PodcastInfo],
    feeds: &HashMap<PodcastId, PodcastFeed>,
    episodes: &[(EpisodeKey, Episode)],
    transcripts: &HashMap<TranscriptKey, Transcript>,
) -> Result<CollectedData> {
    log::info!("Collecting data into a single export");

    let mut podcasts = Vec::new();
    for info in infos {
        if info.premium || !info.enabled {
            continue;
        }

        let feed = feeds
            .get(&info.podcast_id)
            .ok_or_else(|| Error::MissingFeed(info.podcast_id.clone()))?;

        let collected_episodes = episodes
            .iter()
            .filter(|(key, _)| key.podcast_id == info.podcast_id)
            .map(|(key, episode)| collect_episode(key, episode, transcripts))
            .collect();

        podcasts.push(CollectedPodcast {
            podcast_id: info.podcast_id.clone(),
            podcast_title: feed.title.clone(),
            episodes: collected_episodes,
        });
    }

    Ok(CollectedData { podcasts })
}

fn collect_episode(
    key: &EpisodeKey,
    episode: &Episode,
    transcripts: &HashMap<TranscriptKey, Transcript>,
) -> CollectedEpisode {
    let best_transcript = ModelName::PREFERENCE
        .iter()
        .find_map(|model| transcripts.get(&TranscriptKey::new(key, *model)));

    let segments = best_transcript
        .map(|transcript| {
            transcript
                .segments
                .iter()
                .map(|segment| CollectedSegment {
                    timestamp: seconds_to_timestamp(segment.start),
                    text: segment.text.trim().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    CollectedEpisode {
        episode_title: episode.title.clone(),
        episode_slug: key.slug.clone(),
        published: episode.published,
        transcript: CollectedTranscript { segments },
    }
}

/// Serialize the export to `<data>/cleaned/cleaned.json`, overwriting any
/// previous run's output.
pub async fn write_collected(data: &CollectedData, data_folder: &Path) -> Result<PathBuf> {
    let output_path = data_folder.join("cleaned").join("cleaned.json");
    log::info!("Writing collected data to `{}`", output_path.display());

    ensure_parent(&output_path).await?;
    tokio::fs::write(&output_path, serde_json::to_string(data)?).await?;
    Ok(output_path)
}
