use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::paths;

pub const API_KEY_ENV: &str = "PEXELS_API_KEY";

/// Complete configuration of a run.
///
/// Loaded once at startup and handed to the pipeline by reference; nothing in
/// the pipeline reads process-wide state on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    pub search: SearchConfig,
    pub translation: TranslationConfig,
    pub segmentation: SegmentationConfig,
    pub render: RenderSettings,
    pub tools: ToolPaths,
    pub paths: PathSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Stock media provider API key (the PEXELS_API_KEY environment variable wins)
    pub api_key: Option<String>,
    pub video_endpoint: String,
    pub photo_endpoint: String,
    pub results_per_page: u32,
    /// Extra result pages walked when the first page holds nothing unused
    pub alternate_attempts: u32,
    pub max_assets_per_segment: usize,
    /// Footage carrying any of these tags is rejected
    pub exclude_tags: Vec<String>,
    pub exclude_tagged_footage: bool,
    /// Number of leading keywords kept in a search prompt
    pub prompt_keywords: usize,
    /// Optional themes rotated across segments ("<theme> related to <keywords>")
    pub prompt_themes: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            video_endpoint: "https://api.pexels.com/videos/search".to_string(),
            photo_endpoint: "https://api.pexels.com/v1/search".to_string(),
            results_per_page: 80,
            alternate_attempts: 2,
            max_assets_per_segment: 8,
            exclude_tags: vec!["person".to_string(), "people".to_string()],
            exclude_tagged_footage: true,
            prompt_keywords: 5,
            prompt_themes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub target_language: String,
    pub endpoint: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_language: "en".to_string(),
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub max_segments: usize,
    pub min_segment_chars: usize,
}

impl SegmentationConfig {
    pub const DEFAULT_MAX_SEGMENTS: usize = 10;
    pub const DEFAULT_MIN_SEGMENT_CHARS: usize = 50;

    /// Segment cap for a run, never below two
    pub fn effective_max_segments(&self, requested: Option<usize>) -> usize {
        let configured = if self.max_segments == 0 {
            Self::DEFAULT_MAX_SEGMENTS
        } else {
            self.max_segments
        };
        requested.unwrap_or(configured).max(2)
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_segments: Self::DEFAULT_MAX_SEGMENTS,
            min_segment_chars: Self::DEFAULT_MIN_SEGMENT_CHARS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub fps: u32,
    /// Multiplicative gain applied to the narration track
    pub narration_gain: f64,
    /// Gain applied to the background track, in dB (negative attenuates)
    pub music_gain_db: f64,
    /// Length of the background fade-out that ends at the run's total duration
    pub music_fade_secs: f64,
    /// Reconciliation tolerance for regular runs
    pub relaxed_tolerance_secs: f64,
    /// Reconciliation tolerance for `--strict` runs
    pub strict_tolerance_secs: f64,
    /// Tolerance for the duration of the final artifact
    pub final_tolerance_secs: f64,
    pub crf: u32,
    pub audio_bitrate: String,
}

impl RenderSettings {
    pub const DEFAULT_NARRATION_GAIN: f64 = 1.5;
    pub const DEFAULT_MUSIC_GAIN_DB: f64 = -20.0;
    pub const DEFAULT_FADE_SECS: f64 = 0.4;

    pub fn fps(&self) -> u32 {
        if self.fps == 0 { 30 } else { self.fps }
    }

    pub fn narration_gain(&self) -> f64 {
        if !self.narration_gain.is_finite() || self.narration_gain <= 0.0 {
            Self::DEFAULT_NARRATION_GAIN
        } else {
            self.narration_gain
        }
    }

    pub fn music_gain_db(&self) -> f64 {
        if self.music_gain_db.is_finite() {
            self.music_gain_db
        } else {
            Self::DEFAULT_MUSIC_GAIN_DB
        }
    }

    pub fn music_fade_secs(&self) -> f64 {
        if !self.music_fade_secs.is_finite() || self.music_fade_secs < 0.0 {
            Self::DEFAULT_FADE_SECS
        } else {
            self.music_fade_secs
        }
    }

    pub fn reconcile_tolerance(&self, strict: bool) -> f64 {
        let (value, fallback) = if strict {
            (self.strict_tolerance_secs, 0.1)
        } else {
            (self.relaxed_tolerance_secs, 1.0)
        };
        if value.is_finite() && value > 0.0 {
            value
        } else {
            fallback
        }
    }

    pub fn final_tolerance(&self) -> f64 {
        if self.final_tolerance_secs.is_finite() && self.final_tolerance_secs > 0.0 {
            self.final_tolerance_secs
        } else {
            0.5
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            narration_gain: Self::DEFAULT_NARRATION_GAIN,
            music_gain_db: Self::DEFAULT_MUSIC_GAIN_DB,
            music_fade_secs: Self::DEFAULT_FADE_SECS,
            relaxed_tolerance_secs: 1.0,
            strict_tolerance_secs: 0.1,
            final_tolerance_secs: 0.5,
            crf: 23,
            audio_bitrate: "192k".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Where run workspaces are created; defaults to the user cache directory
    pub staging_dir: Option<PathBuf>,
    /// Where finished videos land; defaults to the working directory
    pub output_dir: Option<PathBuf>,
    /// Keep a run's intermediate files after it finishes
    pub keep_workspace: bool,
}

impl PathSettings {
    pub fn staging_root(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(paths::default_staging_root)
    }

    pub fn output_root(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

impl ReelConfig {
    /// Load from an explicit path or the default location, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => paths::default_config_path()?,
        };
        let mut config = Self::load_from_path(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("parsing config at {}", path.display()))
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, toml).with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty()) {
            self.search.api_key = Some(key.trim().to_string());
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.search
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => paths::default_config_path(),
    }
}
