//! Cut a raw sheet into frames and run each through background removal and
//! normalization.

use image::RgbaImage;
use sprite_slice::grid::{GridLayout, cell_rects, crop_rgba, infer_layout};

use super::background::BackgroundRemover;
use super::normalize::FrameNormalizer;
use crate::error::{SpriteError, SpriteResult};

/// Cells of `sheet` in row-major order, plus the layout they were cut with.
pub fn slice_sheet(sheet: &RgbaImage, frame_count: u32) -> SpriteResult<(GridLayout, Vec<RgbaImage>)> {
    let (w, h) = sheet.dimensions();
    let layout = infer_layout(w, h, frame_count);
    if layout.cell_count() != frame_count {
        return Err(SpriteError::layout(
            frame_count,
            format!("inferred {}x{} grid", layout.columns, layout.rows),
        ));
    }

    let rects = cell_rects(w, h, layout).map_err(|e| SpriteError::layout(frame_count, e.to_string()))?;
    let cells = rects
        .into_iter()
        .map(|r| {
            let raw = crop_rgba(sheet.as_raw(), w, r);
            RgbaImage::from_raw(r.w, r.h, raw).ok_or_else(|| {
                SpriteError::processing("slice_sheet", format!("crop {}x{} has the wrong length", r.w, r.h))
            })
        })
        .collect::<SpriteResult<Vec<_>>>()?;

    Ok((layout, cells))
}

/// Finished frames of one animation.
#[derive(Debug, Clone)]
pub struct SlicedAnimation {
    pub layout: GridLayout,
    /// Source cell size before normalization.
    pub cell_size: (u32, u32),
    pub frames: Vec<RgbaImage>,
}

/// Slice, key and normalize one raw sheet.
pub fn process_sheet(
    sheet: &RgbaImage,
    frame_count: u32,
    remover: &BackgroundRemover,
    normalizer: &mut FrameNormalizer,
) -> SpriteResult<SlicedAnimation> {
    let (layout, cells) = slice_sheet(sheet, frame_count)?;
    let cell_size = cells.first().map(|c| c.dimensions()).unwrap_or((0, 0));
    tracing::info!(
        grid = %format!("{}x{}", layout.columns, layout.rows),
        cell = %format!("{}x{}", cell_size.0, cell_size.1),
        "sheet layout"
    );

    let frames = cells
        .iter()
        .map(|cell| normalizer.fit(&remover.remove(cell)))
        .collect::<SpriteResult<Vec<_>>>()?;

    Ok(SlicedAnimation {
        layout,
        cell_size,
        frames,
    })
}
