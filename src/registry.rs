use std::path::Path;

use crate::error::{Error, Result};
use crate::types::PodcastInfo;

/// Load the podcast registry from `<data>/podcast-infos.json`.
///
/// Any problem here — unreadable file, malformed JSON, missing fields, bad
/// URL — is a [`Error::Configuration`] and aborts the whole run; there is
/// nothing sensible to process without a valid registry.
pub async fn load_podcast_infos(file_path: &Path) -> Result<Vec<PodcastInfo>> {
    log::info!("Reading podcast infos from `{}`", file_path.display());

    let raw = tokio::fs::read_to_string(file_path).await.map_err(|e| {
        Error::Configuration(format!("cannot read `{}`: {e}", file_path.display()))
    })?;

    serde_json::from_str(&raw).map_err(|e| {
        Error::Configuration(format!("cannot parse `{}`: {e}", file_path.display()))
    })
}
