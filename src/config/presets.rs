//! # Style Presets
//!
//! A preset bundles the visual style, frame canvas, animation set and timing of a
//! sprite. Six presets are built in; a presets directory can override them or add more
//! with `<name>.json` files.
//!
//! ## File Format
//!
//! ```json
//! {
//!   "name": "anime_action",
//!   "display_name": "Anime Action Style",
//!   "style": "anime",
//!   "canvas": [512, 512],
//!   "frame_rate": 12,
//!   "frame_duration": 83,
//!   "animations": { "idle": 4, "run": 6 }
//! }
//! ```
//!
//! `animations` keeps the order it has in the file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{SpriteError, SpriteResult};

/// Preset used when a requested name is unknown.
pub const DEFAULT_PRESET: &str = "anime_action";

/// Upper bound on frames per animation.
pub const MAX_FRAME_COUNT: u32 = 256;

/// Ordered animation name → frame count table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationSet(Vec<(String, u32)>);

impl AnimationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, keeping the first insertion position.
    pub fn insert(&mut self, name: impl Into<String>, frame_count: u32) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = frame_count,
            None => self.0.push((name, frame_count)),
        }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, c)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(n, c)| (n.as_str(), *c))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for AnimationSet {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, count) in iter {
            set.insert(name, count);
        }
        set
    }
}

impl Serialize for AnimationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, count) in &self.0 {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnimationSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = AnimationSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of animation name to frame count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut set = AnimationSet::new();
                while let Some((name, count)) = access.next_entry::<String, u32>()? {
                    set.insert(name, count);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Named style configuration resolved once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub style: String,
    #[serde(default)]
    pub medium: String,
    /// Frame canvas (width, height) in pixels.
    pub canvas: (u32, u32),
    #[serde(default)]
    pub color_scheme: String,
    pub frame_rate: u32,
    #[serde(rename = "frame_duration", alias = "frame_duration_ms")]
    pub frame_duration_ms: u32,
    pub animations: AnimationSet,
}

impl Preset {
    pub fn validate(&self) -> SpriteResult<()> {
        let invalid = |reason: String| Err(SpriteError::preset(&self.name, reason));

        if self.name.trim().is_empty() {
            return invalid("name must not be empty".to_string());
        }
        if !is_safe_name(&self.name) {
            return invalid("name may only contain letters, digits, '_' and '-'".to_string());
        }
        if self.canvas.0 == 0 || self.canvas.1 == 0 {
            return invalid(format!(
                "canvas {}x{} must be non-zero",
                self.canvas.0, self.canvas.1
            ));
        }
        if self.frame_rate == 0 {
            return invalid("frame_rate must be greater than 0".to_string());
        }
        if self.frame_duration_ms == 0 {
            return invalid("frame_duration must be greater than 0".to_string());
        }
        if self.animations.is_empty() {
            return invalid("at least one animation is required".to_string());
        }
        if let Some((name, _)) = self.animations.iter().find(|(_, count)| *count == 0) {
            return invalid(format!("animation '{}' has zero frames", name));
        }
        if let Some((name, count)) = self
            .animations
            .iter()
            .find(|(_, count)| *count > MAX_FRAME_COUNT)
        {
            return invalid(format!(
                "animation '{}' has {} frames, at most {} are allowed",
                name, count, MAX_FRAME_COUNT
            ));
        }
        Ok(())
    }
}

/// Preset and animation names become file names, so they are restricted to
/// `[A-Za-z0-9_-]`.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[allow(clippy::too_many_arguments)]
fn builtin(
    name: &str,
    display_name: &str,
    description: &str,
    style: &str,
    medium: &str,
    side: u32,
    color_scheme: &str,
    frame_rate: u32,
    frame_duration_ms: u32,
    animations: &[(&str, u32)],
) -> Preset {
    Preset {
        name: name.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        style: style.to_string(),
        medium: medium.to_string(),
        canvas: (side, side),
        color_scheme: color_scheme.to_string(),
        frame_rate,
        frame_duration_ms,
        animations: animations.iter().map(|(n, c)| (*n, *c)).collect(),
    }
}

/// The presets compiled into the binary, in display order.
pub fn builtin_presets() -> Vec<Preset> {
    vec![
        builtin(
            "anime_action",
            "Anime Action Style",
            "Dynamic anime-style characters with bold outlines and vibrant colors",
            "anime",
            "digital illustration",
            512,
            "Vibrant anime colors with bold outlines",
            12,
            83,
            &[("idle", 4), ("run", 6), ("attack", 4), ("jump", 3), ("hurt", 2), ("death", 4)],
        ),
        builtin(
            "pixel_art_rpg",
            "Pixel Art (Top-down RPG)",
            "Classic 16-bit style pixel art for top-down RPG games",
            "pixel art",
            "pixel art",
            64,
            "Limited 16-color palette, retro game style",
            8,
            125,
            &[("idle", 2), ("walk_down", 4), ("walk_up", 4), ("walk_left", 4), ("walk_right", 4)],
        ),
        builtin(
            "pixel_art_platformer",
            "Pixel Art (Platformer)",
            "Side-scrolling platformer pixel art style",
            "pixel art",
            "pixel art",
            64,
            "Bright, limited palette suitable for platformers",
            10,
            100,
            &[("idle", 4), ("run", 6), ("jump", 3), ("fall", 2), ("attack", 3)],
        ),
        builtin(
            "cartoon_platformer",
            "Cartoon Platformer",
            "Colorful cartoon style for family-friendly platformers",
            "cartoon",
            "digital illustration",
            256,
            "Bright, saturated cartoon colors",
            12,
            83,
            &[("idle", 4), ("run", 8), ("jump", 4), ("attack", 4), ("hurt", 2)],
        ),
        builtin(
            "realistic_2d",
            "High-res Realistic 2D",
            "Detailed realistic character art for high-fidelity games",
            "realistic",
            "digital painting",
            512,
            "Natural, realistic colors with detailed shading",
            24,
            42,
            &[("idle", 8), ("walk", 12), ("run", 8), ("attack", 6), ("hurt", 3), ("death", 6)],
        ),
        builtin(
            "chibi",
            "Chibi Style",
            "Cute chibi-style characters with big heads and small bodies",
            "chibi",
            "digital illustration",
            256,
            "Soft, pastel colors with cute aesthetics",
            10,
            100,
            &[("idle", 4), ("run", 6), ("jump", 3), ("attack", 4), ("happy", 4)],
        ),
    ]
}

/// Preset lookup over the built-ins plus an optional override directory.
#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    dir: Option<PathBuf>,
}

impl PresetStore {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Resolve a preset by name: override file, then built-in, then the default preset.
    pub fn load(&self, name: &str) -> Preset {
        if let Some(preset) = self.read_override(name) {
            return preset;
        }
        let builtins = builtin_presets();
        if let Some(preset) = builtins.iter().find(|p| p.name == name) {
            return preset.clone();
        }
        tracing::warn!(preset = name, fallback = DEFAULT_PRESET, "unknown preset");
        builtins
            .into_iter()
            .find(|p| p.name == DEFAULT_PRESET)
            .unwrap_or_else(|| {
                builtin(DEFAULT_PRESET, "", "", "anime", "", 512, "", 12, 83, &[("idle", 4)])
            })
    }

    /// Every available preset. Override files only add names the built-ins lack.
    pub fn all(&self) -> Vec<Preset> {
        let mut presets = builtin_presets();
        let Some(dir) = &self.dir else {
            return presets;
        };
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "presets dir not readable");
                return presets;
            }
        };

        let mut extra: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    path.file_stem().map(|s| s.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .filter(|name| !presets.iter().any(|p| &p.name == name))
            .collect();
        extra.sort();

        for name in extra {
            if let Some(preset) = self.read_override(&name) {
                presets.push(preset);
            }
        }
        presets
    }

    /// Write `<name>.json` into the presets directory.
    pub fn save(&self, preset: &Preset) -> SpriteResult<PathBuf> {
        preset.validate()?;
        let dir = self.dir.as_ref().ok_or_else(|| {
            SpriteError::config("presets_dir", "", "no presets directory configured")
                .with_recovery_suggestion("Pass --presets-dir or set SPRITEFORGE_PRESETS_DIR")
        })?;
        std::fs::create_dir_all(dir).map_err(|e| SpriteError::io_at("create presets dir", dir, e))?;

        let path = dir.join(format!("{}.json", preset.name));
        let json = serde_json::to_string_pretty(preset)?;
        std::fs::write(&path, json).map_err(|e| SpriteError::io_at("write preset", &path, e))?;
        Ok(path)
    }

    fn read_override(&self, name: &str) -> Option<Preset> {
        if !is_safe_name(name) {
            return None;
        }
        let path = self.dir.as_ref()?.join(format!("{}.json", name));
        if !path.exists() {
            return None;
        }
        let parsed = std::fs::read_to_string(&path)
            .map_err(SpriteError::from)
            .and_then(|content| Ok(serde_json::from_str::<Preset>(&content)?))
            .and_then(|preset| preset.validate().map(|_| preset));
        match parsed {
            Ok(preset) => Some(preset),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring preset override");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_valid() {
        let presets = builtin_presets();
        assert_eq!(presets.len(), 6);
        for preset in &presets {
            preset.validate().unwrap();
        }
    }

    #[test]
    fn test_anime_action_table() {
        let preset = PresetStore::default().load("anime_action");
        assert_eq!(preset.canvas, (512, 512));
        assert_eq!(preset.frame_rate, 12);
        assert_eq!(preset.frame_duration_ms, 83);
        let names: Vec<_> = preset.animations.names().collect();
        assert_eq!(names, ["idle", "run", "attack", "jump", "hurt", "death"]);
        assert_eq!(preset.animations.get("run"), Some(6));
    }

    #[test]
    fn test_unknown_falls_back_to_default() {
        let preset = PresetStore::default().load("steampunk");
        assert_eq!(preset.name, DEFAULT_PRESET);
    }

    #[test]
    fn test_animation_order_survives_json() {
        let json = r#"{"name":"t","style":"s","canvas":[32,32],"frame_rate":5,
            "frame_duration":200,"animations":{"zeta":2,"alpha":3,"mid":1}}"#;
        let preset: Preset = serde_json::from_str(json).unwrap();
        let names: Vec<_> = preset.animations.names().collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);

        let back = serde_json::to_string(&preset).unwrap();
        assert!(back.find("zeta").unwrap() < back.find("alpha").unwrap());
        assert!(back.contains("\"frame_duration\":200"));
    }

    #[test]
    fn test_override_file_shadows_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(Some(dir.path().to_path_buf()));

        let mut custom = store.load("chibi");
        custom.canvas = (128, 128);
        store.save(&custom).unwrap();

        assert_eq!(store.load("chibi").canvas, (128, 128));
        assert_eq!(store.all().len(), 6);
    }

    #[test]
    fn test_all_includes_new_presets_and_skips_broken() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(Some(dir.path().to_path_buf()));

        let mut custom = store.load("chibi");
        custom.name = "mecha".to_string();
        store.save(&custom).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();

        let names: Vec<_> = store.all().into_iter().map(|p| p.name).collect();
        assert_eq!(names.len(), 7);
        assert_eq!(names.last().map(String::as_str), Some("mecha"));

        assert_eq!(store.load("broken").name, DEFAULT_PRESET);
    }

    #[test]
    fn test_preset_names_cannot_leave_the_presets_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("presets");
        let store = PresetStore::new(Some(dir.clone()));

        let mut escaping = store.load("chibi");
        escaping.name = "../escape".to_string();
        let err = store.save(&escaping).unwrap_err();
        assert_eq!(err.category(), "preset");
        assert!(!root.path().join("escape.json").exists());

        let mut planted = store.load("chibi");
        planted.canvas = (64, 64);
        std::fs::write(
            root.path().join("escape.json"),
            serde_json::to_string(&planted).unwrap(),
        )
        .unwrap();
        let loaded = store.load("../escape");
        assert_eq!(loaded.name, DEFAULT_PRESET);
        assert_ne!(loaded.canvas, (64, 64));
    }

    #[test]
    fn test_validate_rejects_oversized_animation() {
        let mut preset = PresetStore::default().load("chibi");
        preset.animations.insert("idle", MAX_FRAME_COUNT);
        preset.validate().unwrap();
        preset.animations.insert("idle", MAX_FRAME_COUNT + 1);
        assert_eq!(preset.validate().unwrap_err().category(), "preset");
    }

    #[test]
    fn test_validate_rejects_zero_frames() {
        let mut preset = PresetStore::default().load("chibi");
        preset.animations.insert("idle", 0);
        let err = preset.validate().unwrap_err();
        assert_eq!(err.category(), "preset");
    }

    #[test]
    fn test_save_without_dir_is_config_error() {
        let preset = PresetStore::default().load("chibi");
        let err = PresetStore::default().save(&preset).unwrap_err();
        assert_eq!(err.category(), "config");
    }
}
