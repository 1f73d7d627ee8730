//! # Sheet and GIF Assembly
//!
//! - [`make_sheet`]: frames side by side, left to right
//! - [`make_combined_sheet`]: one sheet row per animation, stacked top to bottom and
//!   left-aligned
//! - [`make_gif`]: looping animated GIF with a reserved transparent palette index
//!
//! Empty input is an assembly error: every animation must have produced frames by the
//! time it gets here.

use image::{RgbaImage, imageops};

use crate::error::{SpriteError, SpriteResult};

/// Palette index reserved for transparent pixels in every GIF frame.
pub const TRANSPARENT_INDEX: u8 = 255;

/// Pixels with alpha below this are written as the transparent index.
pub const ALPHA_CUTOFF: u8 = 128;

/// NeuQuant sampling factor (1 = best, 30 = fastest).
const QUANT_SAMPLE_FACTOR: i32 = 10;

/// NeuQuant misbehaves on tiny inputs; samples are repeated up to this many pixels.
const QUANT_MIN_PIXELS: usize = 1024;

pub fn make_sheet(frames: &[RgbaImage]) -> SpriteResult<RgbaImage> {
    if frames.is_empty() {
        return Err(SpriteError::assembly("make_sheet", "no frames to assemble"));
    }
    let width: u32 = frames.iter().map(|f| f.width()).sum();
    let height = frames.iter().map(|f| f.height()).max().unwrap_or(0);

    let mut sheet = RgbaImage::new(width, height);
    let mut x = 0i64;
    for frame in frames {
        imageops::overlay(&mut sheet, frame, x, 0);
        x += i64::from(frame.width());
    }
    Ok(sheet)
}

/// Stack one [`make_sheet`] row per animation, in the order given.
pub fn make_combined_sheet(rows: &[Vec<RgbaImage>]) -> SpriteResult<RgbaImage> {
    if rows.is_empty() {
        return Err(SpriteError::assembly("make_combined_sheet", "no animations to combine"));
    }
    let sheets = rows
        .iter()
        .map(|frames| make_sheet(frames))
        .collect::<SpriteResult<Vec<_>>>()?;

    let width = sheets.iter().map(|s| s.width()).max().unwrap_or(0);
    let height: u32 = sheets.iter().map(|s| s.height()).sum();

    let mut combined = RgbaImage::new(width, height);
    let mut y = 0i64;
    for sheet in &sheets {
        imageops::overlay(&mut combined, sheet, 0, y);
        y += i64::from(sheet.height());
    }
    Ok(combined)
}

/// Encode `frames` as an infinitely looping GIF, `duration_ms` per frame.
pub fn make_gif(frames: &[RgbaImage], duration_ms: u32) -> SpriteResult<Vec<u8>> {
    let first = frames
        .first()
        .ok_or_else(|| SpriteError::assembly("make_gif", "no frames to assemble"))?;
    let (w, h) = first.dimensions();
    if frames.iter().any(|f| f.dimensions() != (w, h)) {
        return Err(SpriteError::assembly("make_gif", "frames differ in size"));
    }
    let (gw, gh) = match (u16::try_from(w), u16::try_from(h)) {
        (Ok(gw), Ok(gh)) => (gw, gh),
        _ => {
            return Err(SpriteError::encode(
                "gif",
                format!("{}x{} exceeds the GIF size limit", w, h),
            ));
        }
    };

    let mut out = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut out, gw, gh, &[])?;
        encoder.set_repeat(gif::Repeat::Infinite)?;

        let delay = u16::try_from(duration_ms / 10).unwrap_or(u16::MAX);
        for frame in frames {
            let (indices, palette) = quantize(frame);
            let mut gif_frame =
                gif::Frame::from_palette_pixels(gw, gh, indices, palette, Some(TRANSPARENT_INDEX));
            gif_frame.delay = delay;
            gif_frame.dispose = gif::DisposalMethod::Background;
            encoder.write_frame(&gif_frame)?;
        }
    }
    Ok(out)
}

/// Map a frame onto a 255-colour adaptive palette plus the transparent index.
///
/// Returns the per-pixel indices and a full 256-entry RGB palette.
fn quantize(frame: &RgbaImage) -> (Vec<u8>, Vec<u8>) {
    let mut opaque: Vec<u8> = frame
        .pixels()
        .filter(|p| p[3] >= ALPHA_CUTOFF)
        .flat_map(|p| [p[0], p[1], p[2], 255])
        .collect();
    if opaque.is_empty() {
        opaque.extend_from_slice(&[0, 0, 0, 255]);
    }
    let sample_pixels = opaque.len() / 4;
    if sample_pixels < QUANT_MIN_PIXELS {
        let repeated: Vec<u8> = opaque
            .chunks_exact(4)
            .cycle()
            .take(QUANT_MIN_PIXELS)
            .flatten()
            .copied()
            .collect();
        opaque = repeated;
    }

    let quant = color_quant::NeuQuant::new(
        QUANT_SAMPLE_FACTOR,
        usize::from(TRANSPARENT_INDEX),
        &opaque,
    );

    let indices = frame
        .pixels()
        .map(|p| {
            if p[3] < ALPHA_CUTOFF {
                TRANSPARENT_INDEX
            } else {
                quant.index_of(&[p[0], p[1], p[2], 255]) as u8
            }
        })
        .collect();

    let mut palette = quant.color_map_rgb();
    palette.resize(256 * 3, 0);
    (indices, palette)
}
