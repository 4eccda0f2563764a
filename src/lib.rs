//! podscribe - batch podcast transcription pipeline.
//!
//! Turns a registry of podcast feed URLs into a single structured export of
//! episode transcripts, in four cache-first stages: scrape feeds, download
//! episode audio, transcribe with a whisper.cpp engine, and collect
//! everything into one JSON document.

pub mod audio;
pub mod cli;
pub mod collect;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod registry;
pub mod transcribe;
pub mod types;
pub mod util;

pub use error::{Error, Result};
pub use pipeline::PipelineOptions;
pub use types::{
    Episode, EpisodeKey, EpisodeSlug, ModelName, PodcastFeed, PodcastId, PodcastInfo, Transcript,
    TranscriptKey,
};
