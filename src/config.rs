use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// How the slideshow moves to the next image on each advance boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvanceMode {
    Sequential,
    SmartRandom,
}

impl Default for AdvanceMode {
    fn default() -> Self {
        Self::Sequential
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Directories scanned recursively for images, in order.
    pub media_roots: Vec<PathBuf>,
    /// Minimum star rating (0-5) an image must carry to match.
    pub min_rating: u8,
    /// Tags of which at least one must be present (empty = match all).
    pub include_tags: Vec<String>,
    /// Tags that disqualify an image regardless of other criteria.
    pub exclude_tags: Vec<String>,
    /// Time between image advances.
    #[serde(with = "humantime_serde")]
    pub advance_interval: Duration,
    /// Time between filesystem rescans; must exceed the advance interval.
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
    pub advance_mode: AdvanceMode,
    /// Sequential steps between random jumps in smart-random mode.
    pub smart_random_sequence_length: u32,
    /// Optional deterministic seed for smart-random jumps.
    pub rng_seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            media_roots: Vec::new(),
            min_rating: 0,
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            advance_interval: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(300),
            advance_mode: AdvanceMode::default(),
            smart_random_sequence_length: 3,
            rng_seed: None,
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&s).context("parsing YAML configuration")
    }

    /// Validate invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.media_roots.is_empty(),
            "media-roots must list at least one directory"
        );
        ensure!(self.min_rating <= 5, "min-rating must be between 0 and 5");
        ensure!(
            self.advance_interval > Duration::ZERO,
            "advance-interval must be positive"
        );
        ensure!(
            self.refresh_interval > self.advance_interval,
            "refresh-interval must exceed advance-interval"
        );
        ensure!(
            self.smart_random_sequence_length >= 1,
            "smart-random-sequence-length must be >= 1"
        );
        Ok(self)
    }

    /// Include tags, lowercased for case-insensitive matching.
    pub fn include_tag_set(&self) -> BTreeSet<String> {
        normalize_tags(&self.include_tags)
    }

    /// Exclude tags, lowercased for case-insensitive matching.
    pub fn exclude_tag_set(&self) -> BTreeSet<String> {
        normalize_tags(&self.exclude_tags)
    }
}

fn normalize_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
