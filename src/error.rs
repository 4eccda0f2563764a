use std::path::PathBuf;

use thiserror::Error;

use crate::types::PodcastId;

/// Typed error hierarchy for the whole pipeline.
///
/// Variants map onto blast radius: `Configuration` and `MissingFeed` abort
/// the run, everything else is caught at the item level so one bad podcast,
/// episode, or transcript never takes down the rest of the batch.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid podcast registry: {0}")]
    Configuration(String),

    #[error("failed to fetch feed for podcast `{podcast_id}`: {reason}")]
    FeedFetch {
        podcast_id: PodcastId,
        reason: String,
    },

    #[error("failed to parse feed for podcast `{podcast_id}`: {reason}")]
    FeedParse {
        podcast_id: PodcastId,
        reason: String,
    },

    #[error("cache file not found: {}", .0.display())]
    CacheMiss(PathBuf),

    #[error("could not find file extension of url `{0}`")]
    MalformedUrl(String),

    #[error("download of `{url}` failed: {reason}")]
    Download { url: String, reason: String },

    #[error("transcription of `{}` failed: {reason}", .audio.display())]
    Transcription { audio: PathBuf, reason: String },

    #[error("no feed loaded for podcast `{0}`")]
    MissingFeed(PodcastId),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
