//! # Configuration Module
//!
//! Runtime configuration for the forge process and the style preset store.

pub mod config;
pub mod presets;

pub use config::{BackgroundConfig, ForgeConfig, GeneratorConfig, LoggingConfig, MetadataConfig};
pub use presets::{AnimationSet, MAX_FRAME_COUNT, Preset, PresetStore, is_safe_name};
