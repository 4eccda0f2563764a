//! Command-line interface for podscribe.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;

use crate::pipeline::PipelineOptions;
use crate::types::ModelName;

/// Batch podcast transcript pipeline
#[derive(Parser, Debug)]
#[command(name = "podscribe", version, about = "Batch podcast transcript pipeline")]
pub struct Cli {
    /// Root folder for all pipeline artifacts
    #[arg(long, value_name = "PATH", default_value = "data")]
    pub data_folder: PathBuf,

    /// Whisper model to transcribe with (tiny.en or base.en)
    #[arg(long, value_name = "MODEL", default_value = "base.en")]
    pub model: ModelName,

    /// Read feeds from the local cache instead of scraping them
    #[arg(long)]
    pub no_scrape: bool,

    /// Require pre-existing audio files instead of downloading
    #[arg(long)]
    pub no_download: bool,

    /// Require pre-existing transcripts instead of running the engine
    #[arg(long)]
    pub no_transcribe: bool,

    /// Skip the final collection stage
    #[arg(long)]
    pub no_combine: bool,

    /// Shuffle processing order at each stage boundary
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for --shuffle (derived from the clock when omitted)
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to the whisper-cli binary
    #[arg(long, value_name = "PATH", default_value = "whisper-cli")]
    pub whisper_cli: PathBuf,

    /// Folder containing the ggml model files
    #[arg(long, value_name = "PATH", default_value = "models")]
    pub models_dir: PathBuf,

    /// Suppress all but warnings
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The seed actually used when shuffling is requested.
    pub fn shuffle_seed(&self) -> Option<u64> {
        if !self.shuffle {
            return None;
        }
        Some(self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        }))
    }

    pub fn pipeline_options(&self, shuffle: Option<u64>) -> PipelineOptions {
        PipelineOptions {
            data_folder: self.data_folder.clone(),
            model: self.model,
            scrape: !self.no_scrape,
            download: !self.no_download,
            transcribe: !self.no_transcribe,
            combine: !self.no_combine,
            shuffle,
            whisper_cli: self.whisper_cli.clone(),
            models_dir: self.models_dir.clone(),
        }
    }
}
