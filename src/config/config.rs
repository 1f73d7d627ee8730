//! # Runtime Configuration
//!
//! Configuration for a sprite forge process: where job outputs go, how the external
//! generator is reached, how aggressively backgrounds are keyed out, how metadata is
//! emitted, and how logs are written.
//!
//! ## Overview
//!
//! Every field has a default, so `ForgeConfig::default()` is always a valid configuration
//! and a JSON config file only needs to name what it changes.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Default | Description |
//! |-----------|---------|-------------|
//! | `output_root` | `outputs` | Parent of every per-job directory |
//! | `presets_dir` | none | Directory of `<preset>.json` override files |
//! | `generator.api_key` | none | Generation API token; absent selects the offline mock |
//! | `generator.base_url` | `https://engine.prod.bria-api.com` | Generation API root |
//! | `background.matting_url` | none | Matting service endpoint; absent disables matting |
//! | `background.chroma_tolerance` | 60 | Widening of the chroma-key bands |
//! | `background.edge_dominance_percent` | 30 | Share of border pixels the modal colour needs |
//! | `background.edge_tolerance` | 30 | Per-channel distance cleared around the edge colour |
//! | `metadata.non_looping` | `death`, `hurt` | Animations emitted with loop = false |
//!
//! ## Environment Overrides
//!
//! `BRIA_API_KEY`, `SPRITEFORGE_OUTPUT`, `SPRITEFORGE_PRESETS_DIR` and
//! `SPRITEFORGE_MATTING_URL` replace the matching fields when set and non-empty.
//!
//! ## Examples
//!
//! ```rust
//! use sprite_forge::config::config::ForgeConfig;
//!
//! let config = ForgeConfig::default();
//! assert!(config.validate().is_ok());
//! assert!(!config.generator.has_api_key());
//! assert_eq!(config.background.edge_dominance_percent, 30);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SpriteError, SpriteResult};

/// Value shipped in example `.env` files; treated the same as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "your_bria_api_key_here";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Parent directory of per-job output directories.
    pub output_root: PathBuf,

    /// Optional directory of preset override files.
    pub presets_dir: Option<PathBuf>,

    pub generator: GeneratorConfig,
    pub background: BackgroundConfig,
    pub metadata: MetadataConfig,
    pub logging: LoggingConfig,
}

/// External sheet generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Timeout for the generation request itself.
    pub timeout_secs: u64,
    /// Timeout for downloading the generated image.
    pub download_timeout_secs: u64,
    /// Seed sent with every generation request.
    pub seed: u64,
    /// Send a structured (JSON) prompt instead of plain text.
    pub structured_prompt: bool,
}

/// Background removal tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Matting service endpoint. When unset the matting strategy is skipped.
    pub matting_url: Option<String>,
    pub matting_timeout_secs: u64,
    pub chroma_tolerance: u8,
    /// Minimum share (percent) of border pixels the modal colour must cover.
    pub edge_dominance_percent: u32,
    pub edge_tolerance: u8,
}

/// Metadata emission rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Animation names that play once instead of looping.
    pub non_looping: Vec<String>,
    pub pixels_per_unit: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "sprite_forge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("outputs"),
            presets_dir: None,
            generator: GeneratorConfig::default(),
            background: BackgroundConfig::default(),
            metadata: MetadataConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://engine.prod.bria-api.com".to_string(),
            timeout_secs: 120,
            download_timeout_secs: 60,
            seed: 42,
            structured_prompt: false,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            matting_url: None,
            matting_timeout_secs: 60,
            chroma_tolerance: 60,
            edge_dominance_percent: 30,
            edge_tolerance: 30,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            non_looping: vec!["death".to_string(), "hurt".to_string()],
            pixels_per_unit: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl GeneratorConfig {
    /// The configured API key, unless it is missing, empty or the placeholder.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != PLACEHOLDER_API_KEY)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }
}

impl MetadataConfig {
    pub fn loops(&self, animation: &str) -> bool {
        !self.non_looping.iter().any(|name| name == animation)
    }
}

impl ForgeConfig {
    /// Load a JSON config file. Fields absent from the file keep their defaults.
    pub fn load(path: &Path) -> SpriteResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpriteError::io_at("read config", path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            SpriteError::config("config_file", path.display().to_string(), e.to_string())
                .with_recovery_suggestion("Fix the JSON syntax or remove the offending field")
        })
    }

    /// Apply overrides from the process environment.
    pub fn from_env(self) -> Self {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("BRIA_API_KEY") {
            self.generator.api_key = Some(key);
        }
        if let Some(dir) = get("SPRITEFORGE_OUTPUT") {
            self.output_root = PathBuf::from(dir);
        }
        if let Some(dir) = get("SPRITEFORGE_PRESETS_DIR") {
            self.presets_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = get("SPRITEFORGE_MATTING_URL") {
            self.background.matting_url = Some(url);
        }
        self
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> SpriteResult<()> {
        if self.output_root.as_os_str().is_empty() {
            return Err(SpriteError::config("output_root", "", "must not be empty"));
        }
        if self.generator.timeout_secs == 0 {
            return Err(SpriteError::config(
                "generator.timeout_secs",
                "0",
                "must be greater than 0",
            ));
        }
        if self.generator.download_timeout_secs == 0 {
            return Err(SpriteError::config(
                "generator.download_timeout_secs",
                "0",
                "must be greater than 0",
            ));
        }
        if self.background.matting_timeout_secs == 0 {
            return Err(SpriteError::config(
                "background.matting_timeout_secs",
                "0",
                "must be greater than 0",
            ));
        }
        if !(1..=100).contains(&self.background.edge_dominance_percent) {
            return Err(SpriteError::config(
                "background.edge_dominance_percent",
                self.background.edge_dominance_percent.to_string(),
                "must be between 1 and 100",
            ));
        }
        Ok(())
    }
}
