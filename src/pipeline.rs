use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::{self, AudioMode};
use crate::collect;
use crate::error::{Error, Result};
use crate::feed::{self, FeedMode};
use crate::registry;
use crate::transcribe::{self, SpeechEngine, WhisperCli};
use crate::types::{
    Episode, EpisodeKey, EpisodeSlug, ModelName, PodcastFeed, PodcastId, PodcastInfo, Transcript,
    TranscriptKey,
};
use crate::util::{shuffled, slugify};

/// Everything the run needs, resolved from the CLI shell.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Root folder for all pipeline artifacts.
    pub data_folder: PathBuf,
    /// Model used when transcription is enabled.
    pub model: ModelName,
    /// Fetch feeds live vs. read the feed cache.
    pub scrape: bool,
    /// Download audio vs. require pre-existing files.
    pub download: bool,
    /// Run the engine vs. require pre-existing transcripts.
    pub transcribe: bool,
    /// Run the collector at the end.
    pub combine: bool,
    /// Seed for shuffling processing order at each stage boundary.
    pub shuffle: Option<u64>,
    /// Path to the whisper-cli binary.
    pub whisper_cli: PathBuf,
    /// Folder holding the ggml model files.
    pub models_dir: PathBuf,
}

/// Run the whole batch: registry -> feeds -> audio -> transcripts -> export.
///
/// Stages run strictly in sequence; within a stage, items are processed one
/// at a time. Item-level failures are logged and the item is dropped from
/// the mapping handed to the next stage, so the run always completes with
/// whatever subset of data survived.
pub async fn run(opts: PipelineOptions) -> Result<()> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(600))
        .build()
        .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {e}")))?;

    // Registry: the only stage where failure aborts the run
    let infos_file = opts.data_folder.join("podcast-infos.json");
    let infos = registry::load_podcast_infos(&infos_file).await?;
    let mut infos: Vec<PodcastInfo> = infos
        .into_iter()
        .filter(|info| {
            if !info.enabled {
                log::info!("Podcast `{}` is disabled, skipping", info.podcast_id);
            }
            info.enabled
        })
        .collect();
    if let Some(seed) = opts.shuffle {
        infos = shuffled(infos, seed);
    }

    // Feeds
    let feed_mode = if opts.scrape {
        FeedMode::Scrape
    } else {
        FeedMode::Cached
    };
    let (feeds, mut feed_order) =
        fetch_feeds(&client, &infos, &opts.data_folder, feed_mode).await;
    if let Some(seed) = opts.shuffle {
        feed_order = shuffled(feed_order, seed.wrapping_add(1));
    }

    // Episodes, keyed by (podcast, slug) in feed order
    let mut episodes = extract_episodes(&feed_order, &feeds);
    if let Some(seed) = opts.shuffle {
        episodes = shuffled(episodes, seed.wrapping_add(2));
    }

    // Audio
    let audio_mode = if opts.download {
        AudioMode::Download
    } else {
        AudioMode::CachedOnly
    };
    let mut audio_files = acquire_audio(&client, &episodes, &opts.data_folder, audio_mode).await;
    if let Some(seed) = opts.shuffle {
        audio_files = shuffled(audio_files, seed.wrapping_add(3));
    }

    // Transcripts
    let transcripts = if opts.transcribe {
        let engine = WhisperCli::load(opts.whisper_cli.clone(), &opts.models_dir, opts.model)?;
        transcribe_audio(&engine, engine.model(), &audio_files, &opts.data_folder).await
    } else {
        read_cached_transcripts(&audio_files, &opts.data_folder).await
    };

    // Collect
    if opts.combine {
        // Uphold the collector's invariant: every descriptor it sees has a feed
        let surviving: Vec<PodcastInfo> = infos
            .iter()
            .filter(|info| feeds.contains_key(&info.podcast_id))
            .cloned()
            .collect();
        let data = collect::collect_data(&surviving, &feeds, &episodes, &transcripts)?;
        let output = collect::write_collected(&data, &opts.data_folder).await?;
        log::info!("Export complete: `{}`", output.display());
    }

    Ok(())
}

/// Fetch every podcast's feed, dropping podcasts whose fetch failed.
///
/// Returns the feeds keyed by podcast id plus the order in which they
/// succeeded, so later stages stay deterministic.
async fn fetch_feeds(
    client: &reqwest::Client,
    infos: &[PodcastInfo],
    data_folder: &Path,
    mode: FeedMode,
) -> (HashMap<PodcastId, PodcastFeed>, Vec<PodcastId>) {
    let mut feeds = HashMap::new();
    let mut order = Vec::new();

    for info in infos {
        match feed::fetch_feed(client, info, data_folder, mode).await {
            Ok(feed) => {
                log::info!(
                    "Feed for `{}`: {} episodes",
                    info.podcast_id,
                    feed.episodes.len()
                );
                order.push(info.podcast_id.clone());
                feeds.insert(info.podcast_id.clone(), feed);
            }
            Err(e) => log::error!("Skipping podcast `{}`: {e}", info.podcast_id),
        }
    }

    (feeds, order)
}

/// Derive `(podcast, slug) -> episode` in feed order.
///
/// Two episodes of one podcast can normalize to the same slug; the second
/// and later occurrences get a deterministic numeric suffix so nothing is
/// silently overwritten in the keyed mappings.
fn extract_episodes(
    order: &[PodcastId],
    feeds: &HashMap<PodcastId, PodcastFeed>,
) -> Vec<(EpisodeKey, Episode)> {
    let mut episodes = Vec::new();

    for podcast_id in order {
        let Some(feed) = feeds.get(podcast_id) else {
            continue;
        };
        let mut seen: HashMap<EpisodeSlug, u32> = HashMap::new();
        for episode in &feed.episodes {
            let base = slugify(&episode.title);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            let slug = if *count == 1 {
                base
            } else {
                let slug = EpisodeSlug::new(format!("{base}-{count}"));
                log::warn!(
                    "Slug collision in `{podcast_id}`: `{}` renamed to `{slug}`",
                    episode.title
                );
                slug
            };
            episodes.push((
                EpisodeKey {
                    podcast_id: podcast_id.clone(),
                    slug,
                },
                episode.clone(),
            ));
        }
    }

    episodes
}

/// Ensure audio exists for every episode, dropping episodes that failed.
async fn acquire_audio(
    client: &reqwest::Client,
    episodes: &[(EpisodeKey, Episode)],
    data_folder: &Path,
    mode: AudioMode,
) -> Vec<(EpisodeKey, PathBuf)> {
    let mut audio_files = Vec::new();

    for (key, episode) in episodes {
        match audio::acquire(client, key, episode, data_folder, mode).await {
            Ok(path) => audio_files.push((key.clone(), path)),
            Err(Error::CacheMiss(path)) => {
                log::info!("No audio for `{key}` at `{}`, skipping", path.display());
            }
            Err(e) => log::error!("Skipping audio for `{key}`: {e}"),
        }
    }

    audio_files
}

/// Transcribe every audio file with the loaded model (cache-first).
async fn transcribe_audio<E: SpeechEngine>(
    engine: &E,
    model: ModelName,
    audio_files: &[(EpisodeKey, PathBuf)],
    data_folder: &Path,
) -> HashMap<TranscriptKey, Transcript> {
    let mut transcripts = HashMap::new();

    for (key, audio_path) in audio_files {
        let transcript_key = TranscriptKey::new(key, model);
        match transcribe::transcribe_episode(engine, &transcript_key, audio_path, data_folder)
            .await
        {
            Ok(transcript) => {
                transcripts.insert(transcript_key, transcript);
            }
            Err(e) => log::error!("Skipping transcript for `{key}`: {e}"),
        }
    }

    transcripts
}

/// Load whatever cached transcripts exist for the surviving episodes, for
/// any model.
async fn read_cached_transcripts(
    audio_files: &[(EpisodeKey, PathBuf)],
    data_folder: &Path,
) -> HashMap<TranscriptKey, Transcript> {
    let mut transcripts = HashMap::new();

    for (key, _) in audio_files {
        for model in ModelName::ALL {
            let transcript_key = TranscriptKey::new(key, model);
            let path = transcribe::transcript_file_path(data_folder, &transcript_key);
            match transcribe::read_transcript_file(&path).await {
                Ok(transcript) => {
                    transcripts.insert(transcript_key, transcript);
                }
                Err(Error::CacheMiss(_)) => {}
                Err(e) => log::warn!("Skipping transcript for `{transcript_key}`: {e}"),
            }
        }
    }

    transcripts
}
