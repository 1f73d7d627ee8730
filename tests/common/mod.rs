//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use sprite_forge::config::{AnimationSet, Preset, PresetStore};
use sprite_forge::generator::MockGenerator;
use sprite_forge::job::{ArtifactLayout, InMemoryJobStore, JobRunner};

/// Preset with a square canvas, 10 fps and 100 ms frames.
pub fn square_preset(name: &str, side: u32, animations: &[(&str, u32)]) -> Preset {
    Preset {
        name: name.to_string(),
        display_name: name.to_string(),
        description: String::new(),
        style: "pixel art".to_string(),
        medium: "digital".to_string(),
        canvas: (side, side),
        color_scheme: String::new(),
        frame_rate: 10,
        frame_duration_ms: 100,
        animations: animations.iter().copied().collect::<AnimationSet>(),
    }
}

/// Runner over the mock generator writing below `root/out`, with `presets` saved to
/// `root/presets`.
pub fn mock_runner(root: &Path, presets: &[Preset]) -> (JobRunner, Arc<InMemoryJobStore>) {
    let store = PresetStore::new(Some(root.join("presets")));
    for preset in presets {
        store.save(preset).unwrap();
    }
    let jobs = Arc::new(InMemoryJobStore::new());
    let runner = JobRunner::builder()
        .with_generator(Arc::new(MockGenerator::new()))
        .with_store(jobs.clone())
        .with_layout(ArtifactLayout::new(root.join("out")))
        .with_presets(store)
        .build()
        .unwrap();
    (runner, jobs)
}

pub fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

pub fn transparent_count(image: &RgbaImage) -> usize {
    image.pixels().filter(|p| p[3] == 0).count()
}

/// Per-frame properties of a decoded GIF.
#[derive(Debug)]
pub struct GifFrameInfo {
    pub width: u16,
    pub height: u16,
    pub delay: u16,
    pub dispose: gif::DisposalMethod,
    pub transparent: Option<u8>,
    pub transparent_pixels: usize,
}

pub fn decode_gif(path: &Path) -> Vec<GifFrameInfo> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(File::open(path).unwrap()).unwrap();

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        let transparent_pixels = match frame.transparent {
            Some(index) => frame.buffer.iter().filter(|&&i| i == index).count(),
            None => 0,
        };
        frames.push(GifFrameInfo {
            width: frame.width,
            height: frame.height,
            delay: frame.delay,
            dispose: frame.dispose,
            transparent: frame.transparent,
            transparent_pixels,
        });
    }
    frames
}
