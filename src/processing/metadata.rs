//! Game-engine metadata for a finished job.
//!
//! Besides the generic per-animation table the document carries two engine projections,
//! both listing animations in request order:
//! - `phaser_config`: cumulative `[start, end]` frame ranges into one flattened strip
//! - `unity_config`: named clips with frame counts and a loop flag

use serde::{Serialize, Serializer};

use crate::config::{MetadataConfig, Preset};

/// What the emitter needs to know about one finished animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationArtifacts {
    pub name: String,
    pub frame_count: u32,
    pub sprite_sheet: String,
    pub gif: String,
    pub frames: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpriteMetadata {
    pub job_id: String,
    pub prompt: String,
    pub preset: String,
    pub style: String,
    pub frame_size: (u32, u32),
    pub frame_rate: u32,
    pub frame_duration_ms: u32,
    #[serde(serialize_with = "ordered_map")]
    pub animations: Vec<(String, AnimationMetadata)>,
    pub phaser_config: PhaserConfig,
    pub unity_config: UnityConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnimationMetadata {
    pub frame_count: u32,
    pub sprite_sheet: String,
    pub gif: String,
    pub frames: Vec<String>,
    #[serde(rename = "loop")]
    pub looping: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaserConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    pub animations: Vec<PhaserAnimation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaserAnimation {
    pub key: String,
    pub frames: FrameRange,
    pub frame_rate: u32,
    /// -1 loops forever, 0 plays once.
    pub repeat: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnityConfig {
    pub pixels_per_unit: u32,
    pub sprite_mode: String,
    pub frame_size: UnityFrameSize,
    pub clips: Vec<UnityClip>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnityFrameSize {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnityClip {
    pub name: String,
    pub frame_count: u32,
    pub sample_rate: u32,
    pub loop_time: bool,
}

/// Serialize `(key, value)` pairs as a JSON object, keeping their order.
pub(crate) fn ordered_map<S: Serializer, V: Serialize>(
    entries: &[(String, V)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(entries.iter().map(|(k, v)| (k, v)))
}

/// Build the metadata document. Pure; the caller decides where it is written.
pub fn build_metadata(
    job_id: &str,
    prompt: &str,
    preset: &Preset,
    animations: &[AnimationArtifacts],
    rules: &MetadataConfig,
) -> SpriteMetadata {
    let (fw, fh) = preset.canvas;
    let mut entries = Vec::with_capacity(animations.len());
    let mut phaser = Vec::with_capacity(animations.len());
    let mut clips = Vec::with_capacity(animations.len());

    let mut start = 0u32;
    for anim in animations {
        let looping = rules.loops(&anim.name);
        entries.push((
            anim.name.clone(),
            AnimationMetadata {
                frame_count: anim.frame_count,
                sprite_sheet: anim.sprite_sheet.clone(),
                gif: anim.gif.clone(),
                frames: anim.frames.clone(),
                looping,
            },
        ));
        phaser.push(PhaserAnimation {
            key: anim.name.clone(),
            frames: FrameRange {
                start,
                end: (start + anim.frame_count).saturating_sub(1),
            },
            frame_rate: preset.frame_rate,
            repeat: if looping { -1 } else { 0 },
        });
        clips.push(UnityClip {
            name: anim.name.clone(),
            frame_count: anim.frame_count,
            sample_rate: preset.frame_rate,
            loop_time: looping,
        });
        start += anim.frame_count;
    }

    SpriteMetadata {
        job_id: job_id.to_string(),
        prompt: prompt.to_string(),
        preset: preset.name.clone(),
        style: preset.style.clone(),
        frame_size: (fw, fh),
        frame_rate: preset.frame_rate,
        frame_duration_ms: preset.frame_duration_ms,
        animations: entries,
        phaser_config: PhaserConfig {
            frame_width: fw,
            frame_height: fh,
            animations: phaser,
        },
        unity_config: UnityConfig {
            pixels_per_unit: rules.pixels_per_unit,
            sprite_mode: "Multiple".to_string(),
            frame_size: UnityFrameSize { x: fw, y: fh },
            clips,
        },
    }
}
