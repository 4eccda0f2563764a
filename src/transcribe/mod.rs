pub mod whisper;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{Transcript, TranscriptKey};
use crate::util::ensure_parent;

pub use whisper::WhisperCli;

/// The speech-to-text seam: an engine maps an audio file to a transcript.
///
/// Implementations force the decoding language to English. The engine is
/// constructed once per process and reused for every episode it
/// transcribes.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript>;
}

/// Cache location for one (podcast, episode, model) transcript.
pub fn transcript_file_path(data_folder: &Path, key: &TranscriptKey) -> PathBuf {
    data_folder
        .join("raw")
        .join("transcripts")
        .join(key.podcast_id.as_str())
        .join(key.slug.as_str())
        .join(format!("{}.json", key.model))
}

/// Read a transcript cache entry; [`Error::CacheMiss`] when absent.
pub async fn read_transcript_file(file_path: &Path) -> Result<Transcript> {
    let raw = match tokio::fs::read_to_string(file_path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::CacheMiss(file_path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    log::info!("Reading transcript from `{}`", file_path.display());
    Ok(serde_json::from_str(&raw)?)
}

/// Ensure a transcript exists for `key`, invoking the engine only on a
/// cache miss. Cached content is trusted as-is; it is never re-validated
/// against the audio file.
pub async fn transcribe_episode<E>(
    engine: &E,
    key: &TranscriptKey,
    audio: &Path,
    data_folder: &Path,
) -> Result<Transcript>
where
    E: SpeechEngine + ?Sized,
{
    let file_path = transcript_file_path(data_folder, key);
    match read_transcript_file(&file_path).await {
        Ok(transcript) => Ok(transcript),
        Err(Error::CacheMiss(_)) => {
            log::info!("Transcribing `{}` with `{}`", audio.display(), key.model);
            let transcript = engine.transcribe(audio).await?;

            log::info!("Writing transcript to `{}`", file_path.display());
            ensure_parent(&file_path).await?;
            tokio::fs::write(&file_path, serde_json::to_string(&transcript)?).await?;
            Ok(transcript)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EpisodeKey, ModelName, PodcastId, Segment};
    use crate::util::slugify;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn transcript(text: &str) -> Transcript {
        Transcript {
            text: text.to_string(),
            segments: vec![Segment {
                id: 0,
                seek: 0,
                start: 65.4,
                end: 70.0,
                text: text.to_string(),
                tokens: vec![1, 2, 3],
                temperature: 0.0,
                avg_logprob: -0.2,
                compression_ratio: 1.1,
                no_speech_prob: 0.05,
            }],
            language: "en".to_string(),
        }
    }

    fn key(model: ModelName) -> TranscriptKey {
        TranscriptKey::new(
            &EpisodeKey {
                podcast_id: PodcastId::new("acme"),
                slug: slugify("Hello, World!"),
            },
            model,
        )
    }

    /// Engine double that counts invocations and returns a fixed result.
    struct ScriptedEngine {
        result: Transcript,
        calls: AtomicUsize,
    }

    impl ScriptedEngine {
        fn new(result: Transcript) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechEngine for ScriptedEngine {
        async fn transcribe(&self, _audio: &Path) -> Result<Transcript> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    /// Engine double that always fails.
    struct BrokenEngine;

    #[async_trait]
    impl SpeechEngine for BrokenEngine {
        async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
            Err(Error::Transcription {
                audio: audio.to_path_buf(),
                reason: "engine exploded".to_string(),
            })
        }
    }

    #[test]
    fn transcript_path_is_keyed_by_podcast_slug_and_model() {
        let path = transcript_file_path(Path::new("/data"), &key(ModelName::BaseEn));
        assert_eq!(
            path,
            Path::new("/data/raw/transcripts/acme/hello-world-/base.en.json")
        );
    }

    #[tokio::test]
    async fn miss_invokes_engine_once_and_persists_the_result() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine::new(transcript(" hi "));
        let key = key(ModelName::BaseEn);

        let got = transcribe_episode(&engine, &key, Path::new("ep.mp3"), dir.path())
            .await
            .unwrap();
        assert_eq!(engine.calls(), 1);
        assert_eq!(got, transcript(" hi "));

        let on_disk = read_transcript_file(&transcript_file_path(dir.path(), &key))
            .await
            .unwrap();
        assert_eq!(on_disk, got);
    }

    #[tokio::test]
    async fn hit_skips_the_engine_and_returns_disk_content() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine::new(transcript("fresh"));
        let key = key(ModelName::BaseEn);

        // Seed the cache with different content than the engine would emit
        let cache_path = transcript_file_path(dir.path(), &key);
        ensure_parent(&cache_path).await.unwrap();
        tokio::fs::write(
            &cache_path,
            serde_json::to_string(&transcript("cached")).unwrap(),
        )
        .await
        .unwrap();

        let got = transcribe_episode(&engine, &key, Path::new("ep.mp3"), dir.path())
            .await
            .unwrap();
        assert_eq!(engine.calls(), 0);
        assert_eq!(got, transcript("cached"));
    }

    #[tokio::test]
    async fn repeated_calls_invoke_the_engine_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine::new(transcript("once"));
        let key = key(ModelName::TinyEn);

        for _ in 0..3 {
            transcribe_episode(&engine, &key, Path::new("ep.mp3"), dir.path())
                .await
                .unwrap();
        }
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn engine_failure_leaves_no_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        let key = key(ModelName::BaseEn);

        let result = transcribe_episode(&BrokenEngine, &key, Path::new("ep.mp3"), dir.path()).await;
        assert!(matches!(result, Err(Error::Transcription { .. })));
        assert!(!transcript_file_path(dir.path(), &key).exists());
    }

    #[tokio::test]
    async fn cache_round_trip_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let key = key(ModelName::BaseEn);
        let original = transcript(" round trip ");

        let cache_path = transcript_file_path(dir.path(), &key);
        ensure_parent(&cache_path).await.unwrap();
        tokio::fs::write(&cache_path, serde_json::to_string(&original).unwrap())
            .await
            .unwrap();

        let back = read_transcript_file(&cache_path).await.unwrap();
        assert_eq!(back, original);
    }

    #[tokio::test]
    async fn reading_a_missing_transcript_is_a_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_transcript_file(&dir.path().join("missing.json")).await;
        assert!(matches!(result, Err(Error::CacheMiss(_))));
    }
}
