//! # Background Removal
//!
//! Turns a cropped sheet cell into an RGBA image whose background pixels have alpha 0.
//!
//! ## Strategies
//!
//! Strategies are tried in priority order and the first one that reports success wins:
//! 1. **Matting** (optional): an external matting model. Works on any background, so it
//!    goes first whenever one is configured.
//! 2. **Chroma key**: magenta and green bands, each with a looser secondary band. A miss
//!    (no transparent pixel afterwards) falls through.
//! 3. **Edge flood**: the modal colour of the four border lines is taken as background
//!    when it covers enough of the border; otherwise a fixed palette of typical
//!    background colours is keyed out. Always succeeds.
//!
//! Removal never fails a job. A strategy that errors is logged and skipped, and an image
//! that ends up with no transparent pixel is still returned, with a warning.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::OnceLock;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::config::BackgroundConfig;
use crate::error::{SpriteError, SpriteResult};

/// Outcome of one strategy on one image.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub image: RgbaImage,
    /// Whether the strategy considers its own result usable.
    pub success: bool,
}

/// One way of keying out a background.
pub trait BackgroundStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn attempt(&self, image: &RgbaImage) -> SpriteResult<Attempt>;
}

/// True if any pixel is fully transparent.
pub fn has_transparency(image: &RgbaImage) -> bool {
    image.pixels().any(|p| p[3] == 0)
}

/// Keyed pixels become transparent white.
pub const CLEARED: Rgba<u8> = Rgba([255, 255, 255, 0]);

fn clear(p: &mut Rgba<u8>) {
    *p = CLEARED;
}

// ---------------------------------------------------------------------------
// Matting
// ---------------------------------------------------------------------------

/// A learned foreground/background segmentation model.
pub trait MattingModel: Send + Sync {
    fn matte(&self, image: &RgbaImage) -> SpriteResult<RgbaImage>;
}

#[derive(Serialize, Deserialize)]
struct MattingPayload {
    /// Base64 PNG.
    image: String,
}

/// Matting model served over HTTP.
///
/// Request and response bodies are both `{"image": "<base64 png>"}`.
///
/// The blocking client is built on the first call, which runs on the blocking pool, and
/// reused for every later cell.
pub struct HttpMatting {
    url: String,
    timeout: Duration,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpMatting {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> SpriteResult<&reqwest::blocking::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SpriteError::external("reqwest", e))?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl MattingModel for HttpMatting {
    fn matte(&self, image: &RgbaImage) -> SpriteResult<RgbaImage> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| SpriteError::image("encode matting input", e))?;
        let payload = MattingPayload {
            image: general_purpose::STANDARD.encode(&png),
        };

        let response = self
            .client()?
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| SpriteError::external("matting", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpriteError::processing(
                "matting",
                format!("service answered HTTP {}", status.as_u16()),
            ));
        }
        let body: MattingPayload = response
            .json()
            .map_err(|e| SpriteError::external("matting", e))?;
        let bytes = general_purpose::STANDARD
            .decode(body.image.as_bytes())
            .map_err(|e| SpriteError::external("base64", e))?;
        let matted = image::load_from_memory(&bytes)
            .map_err(|e| SpriteError::image("decode matting output", e))?;
        Ok(matted.to_rgba8())
    }
}

/// Strategy wrapper around a [`MattingModel`].
pub struct MattingStrategy<M: MattingModel> {
    model: M,
}

impl<M: MattingModel> MattingStrategy<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: MattingModel> BackgroundStrategy for MattingStrategy<M> {
    fn name(&self) -> &str {
        "matting"
    }

    fn attempt(&self, image: &RgbaImage) -> SpriteResult<Attempt> {
        let matted = self.model.matte(image)?;
        let success = matted.dimensions() == image.dimensions();
        if !success {
            tracing::debug!(
                expected = ?image.dimensions(),
                got = ?matted.dimensions(),
                "matting changed image size"
            );
        }
        Ok(Attempt {
            image: matted,
            success,
        })
    }
}

// ---------------------------------------------------------------------------
// Chroma key
// ---------------------------------------------------------------------------

/// Whether a pixel falls in one of the magenta or green key bands.
pub fn is_chroma(r: u8, g: u8, b: u8, tolerance: u8) -> bool {
    let (r, g, b, tol) = (u16::from(r), u16::from(g), u16::from(b), u16::from(tolerance));

    let magenta = r > 200 && b > 200 && g < 100 + tol;
    let light_magenta = r > 180 && b > 180 && g < 120 && r > g + 60 && b > g + 60;
    let green = g > 200 && r < 100 + tol && b < 100 + tol;
    let dark_green = g > 150 && r < 80 && b < 80 && g > r * 2 && g > b * 2;

    magenta || light_magenta || green || dark_green
}

/// Clear every chroma-keyed pixel. Other pixels are left untouched.
pub fn chroma_key(image: &RgbaImage, tolerance: u8) -> RgbaImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        if is_chroma(p[0], p[1], p[2], tolerance) {
            clear(p);
        }
    }
    out
}

pub struct ChromaKeyStrategy {
    pub tolerance: u8,
}

impl BackgroundStrategy for ChromaKeyStrategy {
    fn name(&self) -> &str {
        "chroma_key"
    }

    fn attempt(&self, image: &RgbaImage) -> SpriteResult<Attempt> {
        let keyed = chroma_key(image, self.tolerance);
        let success = has_transparency(&keyed);
        Ok(Attempt {
            image: keyed,
            success,
        })
    }
}

// ---------------------------------------------------------------------------
// Edge flood
// ---------------------------------------------------------------------------

/// Modal colour of the border lines, with its count and the number of samples.
///
/// Top and bottom rows are sampled for every x, left and right columns for every y, so
/// corner pixels count twice. Ties go to the colour sampled first.
pub fn dominant_edge_color(image: &RgbaImage) -> Option<([u8; 3], usize, usize)> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let rgb = |x: u32, y: u32| {
        let p = image.get_pixel(x, y);
        [p[0], p[1], p[2]]
    };

    let mut samples = Vec::with_capacity(2 * (w + h) as usize);
    for x in 0..w {
        samples.push(rgb(x, 0));
        samples.push(rgb(x, h - 1));
    }
    for y in 0..h {
        samples.push(rgb(0, y));
        samples.push(rgb(w - 1, y));
    }

    let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
    for c in &samples {
        *counts.entry(*c).or_insert(0) += 1;
    }

    let mut best: Option<([u8; 3], usize)> = None;
    for c in &samples {
        let n = counts[c];
        if best.is_none_or(|(_, m)| n > m) {
            best = Some((*c, n));
        }
    }
    best.map(|(c, n)| (c, n, samples.len()))
}

/// Clear every pixel whose channels are all strictly within `tolerance` of `bg`.
pub fn clear_near(image: &RgbaImage, bg: [u8; 3], tolerance: u8) -> RgbaImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        let near = (0..3).all(|i| p[i].abs_diff(bg[i]) < tolerance);
        if near {
            clear(p);
        }
    }
    out
}

/// Last-resort palette: chroma keys, near-white, light grey, checkerboard grey, bright grey.
pub fn is_palette_background(r: u8, g: u8, b: u8) -> bool {
    let chroma_magenta = r > 200 && b > 200 && g < 100;
    let chroma_green = g > 200 && r < 100 && b < 100;
    let near_white = r > 240 && g > 240 && b > 240;
    let light_gray = r > 200 && g > 200 && b > 200 && r.abs_diff(g) < 10 && g.abs_diff(b) < 10;
    let checker = [r, g, b].iter().all(|c| (196..210).contains(c));
    let bright_gray = r == g && g == b && r > 180;

    chroma_magenta || chroma_green || near_white || light_gray || checker || bright_gray
}

pub fn palette_key(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        if is_palette_background(p[0], p[1], p[2]) {
            clear(p);
        }
    }
    out
}

pub struct EdgeFloodStrategy {
    /// Share of border samples (percent) the modal colour must reach.
    pub dominance_percent: u32,
    pub tolerance: u8,
}

impl EdgeFloodStrategy {
    pub fn key(&self, image: &RgbaImage) -> RgbaImage {
        match dominant_edge_color(image) {
            Some((bg, count, total)) if count * 100 >= total * self.dominance_percent as usize => {
                tracing::debug!(
                    color = ?bg,
                    count,
                    total,
                    "edge background colour detected"
                );
                clear_near(image, bg, self.tolerance)
            }
            _ => {
                tracing::debug!("no dominant edge colour, keying fixed palette");
                palette_key(image)
            }
        }
    }
}

impl BackgroundStrategy for EdgeFloodStrategy {
    fn name(&self) -> &str {
        "edge_flood"
    }

    fn attempt(&self, image: &RgbaImage) -> SpriteResult<Attempt> {
        Ok(Attempt {
            image: self.key(image),
            success: true,
        })
    }
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Ordered strategy list with graceful fallthrough.
pub struct BackgroundRemover {
    strategies: Vec<Box<dyn BackgroundStrategy>>,
}

impl BackgroundRemover {
    pub fn new(strategies: Vec<Box<dyn BackgroundStrategy>>) -> Self {
        Self { strategies }
    }

    /// Matting (when a URL is configured), then chroma key, then edge flood.
    pub fn from_config(config: &BackgroundConfig) -> Self {
        let mut strategies: Vec<Box<dyn BackgroundStrategy>> = Vec::with_capacity(3);
        if let Some(url) = &config.matting_url {
            strategies.push(Box::new(MattingStrategy::new(HttpMatting::new(
                url.clone(),
                Duration::from_secs(config.matting_timeout_secs),
            ))));
        }
        strategies.push(Box::new(ChromaKeyStrategy {
            tolerance: config.chroma_tolerance,
        }));
        strategies.push(Box::new(EdgeFloodStrategy {
            dominance_percent: config.edge_dominance_percent,
            tolerance: config.edge_tolerance,
        }));
        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Key out the background of `image`. Never fails.
    pub fn remove(&self, image: &RgbaImage) -> RgbaImage {
        for strategy in &self.strategies {
            match strategy.attempt(image) {
                Ok(attempt) if attempt.success => {
                    tracing::debug!(strategy = strategy.name(), "background removed");
                    if !has_transparency(&attempt.image) {
                        tracing::warn!(
                            strategy = strategy.name(),
                            "background removal left no transparent pixel"
                        );
                    }
                    return attempt.image;
                }
                Ok(_) => {
                    tracing::debug!(strategy = strategy.name(), "strategy missed, falling through");
                }
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), error = %e, "strategy failed, falling through");
                }
            }
        }
        tracing::warn!("no background strategy succeeded, keeping image as is");
        image.clone()
    }
}

impl Default for BackgroundRemover {
    fn default() -> Self {
        Self::from_config(&BackgroundConfig::default())
    }
}
