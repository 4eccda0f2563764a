use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use url::Url;

/// Unique key for a podcast, taken verbatim from the registry file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PodcastId(String);

impl PodcastId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PodcastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized episode identity derived from the episode title.
///
/// Only unique within one podcast's episode set; joins always pair it with
/// the owning [`PodcastId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeSlug(String);

impl EpisodeSlug {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpisodeSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the podcast registry file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastInfo {
    pub podcast_id: PodcastId,
    pub podcast_url: Url,
    pub premium: bool,
    pub enabled: bool,
}

/// Audio attachment metadata from a feed entry. The first enclosure of an
/// episode is its canonical audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enclosure {
    pub url: String,
    pub file_size: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    pub enclosures: Vec<Enclosure>,
    #[serde(with = "published_format")]
    pub published: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastFeed {
    pub title: String,
    pub episodes: Vec<Episode>,
}

/// Whisper models the pipeline knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelName {
    #[serde(rename = "tiny.en")]
    TinyEn,
    #[serde(rename = "base.en")]
    BaseEn,
}

impl ModelName {
    /// Every known model, in declaration order.
    pub const ALL: [ModelName; 2] = [ModelName::TinyEn, ModelName::BaseEn];

    /// Selection order for the collector: first available wins.
    pub const PREFERENCE: [ModelName; 2] = [ModelName::BaseEn, ModelName::TinyEn];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::TinyEn => "tiny.en",
            ModelName::BaseEn => "base.en",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tiny.en" => Ok(ModelName::TinyEn),
            "base.en" => Ok(ModelName::BaseEn),
            other => Err(format!(
                "unknown model `{other}` (expected tiny.en or base.en)"
            )),
        }
    }
}

/// Atomic unit of a transcript, mirroring the transcript cache file shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: u32,
    pub seek: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub tokens: Vec<i64>,
    pub temperature: f64,
    pub avg_logprob: f64,
    pub compression_ratio: f64,
    pub no_speech_prob: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<Segment>,
    pub language: String,
}

/// Join key binding an episode to its audio file across stages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeKey {
    pub podcast_id: PodcastId,
    pub slug: EpisodeSlug,
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.podcast_id, self.slug)
    }
}

/// Join key binding a transcript to an (episode, model) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TranscriptKey {
    pub podcast_id: PodcastId,
    pub slug: EpisodeSlug,
    pub model: ModelName,
}

impl TranscriptKey {
    pub fn new(episode: &EpisodeKey, model: ModelName) -> Self {
        Self {
            podcast_id: episode.podcast_id.clone(),
            slug: episode.slug.clone(),
            model,
        }
    }
}

impl fmt::Display for TranscriptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.podcast_id, self.slug, self.model)
    }
}

/// Serde adapter for episode publish times.
///
/// Feeds (and feed cache files written by older runs) carry `published`
/// either as integer epoch seconds or as an ISO-8601 `YYYY-MM-DDTHH:MM:SS`
/// string; serialization always emits the ISO form.
pub mod published_format {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S>(published: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&published.format(ISO_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Epoch(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Epoch(seconds) => DateTime::from_timestamp(seconds, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| de::Error::custom(format!("epoch out of range: {seconds}"))),
            Raw::Text(text) => NaiveDateTime::parse_from_str(&text, ISO_FORMAT)
                .map_err(|e| de::Error::custom(format!("invalid publish time `{text}`: {e}"))),
        }
    }
}
