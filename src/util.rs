use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::EpisodeSlug;

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\W+").expect("slug pattern is valid"))
}

/// Derive the stable episode identity from a title.
///
/// Every maximal run of non-word characters collapses to a single hyphen,
/// then the result is lowercased. This string is the join key binding an
/// episode to its audio file and transcripts across runs, so the mapping
/// must never change once data is on disk.
pub fn slugify(text: &str) -> EpisodeSlug {
    EpisodeSlug::new(slug_pattern().replace_all(text, "-").to_lowercase())
}

/// Render a segment start time as an `H:MM:SS` duration string, rounded to
/// the nearest whole second.
pub fn seconds_to_timestamp(n_seconds: f64) -> String {
    let total = n_seconds.round().max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

/// Fisher-Yates shuffle driven by a seeded POSIX LCG, so a shuffled run can
/// be reproduced from its logged seed.
pub fn shuffled<T>(mut items: Vec<T>, seed: u64) -> Vec<T> {
    const LCG_MULTIPLIER: u32 = 1103515245;
    const LCG_INCREMENT: u32 = 12345;

    let mut state = (seed as u32) ^ ((seed >> 32) as u32);
    for i in (1..items.len()).rev() {
        state = state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        // Bits 16..30 carry the usable randomness of the LCG
        let j = (((state >> 16) & 0x7FFF) as usize) % (i + 1);
        items.swap(i, j);
    }
    items
}

/// Create the parent directory of a file path if it does not exist yet.
pub async fn ensure_parent(file_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = file_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}
