use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::transcribe::SpeechEngine;
use crate::types::{ModelName, Segment, Transcript};

/// Speech engine backed by a whisper.cpp `whisper-cli` binary.
///
/// `load` resolves and validates the ggml model file up front so the cost
/// of a bad configuration is paid once, not per episode; the same instance
/// is then reused for the whole run.
pub struct WhisperCli {
    binary: PathBuf,
    model: ModelName,
    model_path: PathBuf,
}

impl WhisperCli {
    pub fn load(binary: PathBuf, models_dir: &Path, model: ModelName) -> Result<Self> {
        let model_path = models_dir.join(format!("ggml-{model}.bin"));
        if !model_path.exists() {
            return Err(Error::Configuration(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }
        log::info!("Using model `{model}` at `{}`", model_path.display());
        Ok(Self {
            binary,
            model,
            model_path,
        })
    }

    pub fn model(&self) -> ModelName {
        self.model
    }
}

#[async_trait]
impl SpeechEngine for WhisperCli {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        let transcription_err = |reason: String| Error::Transcription {
            audio: audio.to_path_buf(),
            reason,
        };

        if !audio.exists() {
            return Err(transcription_err("audio file not found".to_string()));
        }

        let stem = audio.file_stem().and_then(|s| s.to_str()).unwrap_or("audio");
        // whisper-cli appends ".json" to the -of base verbatim, so build the
        // output path the same way instead of using Path::with_extension
        let out_name = format!("{stem}-{}-{}", self.model, std::process::id());
        let out_base = std::env::temp_dir().join(&out_name);
        let json_path = std::env::temp_dir().join(format!("{out_name}.json"));

        let output = Command::new(&self.binary)
            .arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg(audio)
            .arg("-l")
            .arg("en")
            .arg("-oj")
            .arg("-of")
            .arg(&out_base)
            .arg("-np")
            .output()
            .await
            .map_err(|e| {
                transcription_err(format!("failed to run `{}`: {e}", self.binary.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(transcription_err(format!(
                "whisper-cli exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let raw = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            transcription_err(format!(
                "missing engine output `{}`: {e}",
                json_path.display()
            ))
        })?;
        let _ = tokio::fs::remove_file(&json_path).await;

        parse_whisper_output(&raw).map_err(transcription_err)
    }
}

// whisper.cpp JSON output, reduced to the fields the adapter reads.

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    result: Option<WhisperResult>,
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperResult {
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    offsets: WhisperOffsets,
    text: String,
    #[serde(default)]
    tokens: Vec<WhisperToken>,
}

#[derive(Debug, Deserialize)]
struct WhisperOffsets {
    from: i64,
    to: i64,
}

#[derive(Debug, Deserialize)]
struct WhisperToken {
    id: i64,
}

/// Adapt whisper-cli's JSON into the canonical transcript shape.
///
/// Offsets arrive in milliseconds. Per-segment scoring fields the CLI does
/// not emit (seek, temperature, avg_logprob, compression_ratio,
/// no_speech_prob) are zeroed.
pub(crate) fn parse_whisper_output(raw: &str) -> std::result::Result<Transcript, String> {
    let output: WhisperOutput =
        serde_json::from_str(raw).map_err(|e| format!("invalid engine output: {e}"))?;

    let segments = output
        .transcription
        .iter()
        .enumerate()
        .map(|(index, segment)| Segment {
            id: index as u32,
            seek: 0,
            start: segment.offsets.from as f64 / 1000.0,
            end: segment.offsets.to as f64 / 1000.0,
            text: segment.text.clone(),
            tokens: segment.tokens.iter().map(|t| t.id).collect(),
            temperature: 0.0,
            avg_logprob: 0.0,
            compression_ratio: 0.0,
            no_speech_prob: 0.0,
        })
        .collect();

    let text = output
        .transcription
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<String>();

    Ok(Transcript {
        text,
        segments,
        language: output
            .result
            .and_then(|r| r.language)
            .unwrap_or_else(|| "en".to_string()),
    })
}
