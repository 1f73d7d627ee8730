// SPDX-License-Identifier: MIT
//! # Sheet Grid Inference and Cell Cutting
//!
//! A generated sprite sheet arrives as a single image holding every pose of one
//! animation. The generator is asked for a particular arrangement, but the sheet itself
//! carries no layout information, so the grid is recovered from its dimensions.
//!
//! ## Grid Selection Algorithm
//!
//! Every factorization `columns × rows == frame_count` is a candidate. Each is scored:
//! - **Cell squareness**: `|cell_w / cell_h - 1|` where `cell_w = width / columns`
//!   and `cell_h = height / rows`
//! - **Sheet shape**: `0.5 × |columns / rows - width / height|`
//!
//! The lowest score wins, with ties going to the candidate visited first. Candidates are
//! visited with `rows` ascending from 1, so equal scores resolve to the wider layout. If
//! nothing can be scored the layout falls back to a single row strip.
//!
//! ## Cell Cutting
//!
//! Cells use floor division of the sheet size; leftover pixels on the right and
//! bottom edges are ignored. Cells are returned in row-major order, which is also the
//! frame order of the animation.

use anyhow::{bail, Result};

/// Columns × rows arrangement of frames on a sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
}

impl GridLayout {
    /// Single-row strip holding `frame_count` frames.
    pub fn strip(frame_count: u32) -> Self {
        Self {
            columns: frame_count.max(1),
            rows: 1,
        }
    }

    pub fn cell_count(self) -> u32 {
        self.columns * self.rows
    }
}

/// Rectangle definition in source pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Choose the grid arrangement of `frame_count` frames on a `width × height` sheet.
///
/// # Returns
/// A layout with `columns * rows == frame_count` (or the strip fallback for degenerate
/// input).
pub fn infer_layout(width: u32, height: u32, frame_count: u32) -> GridLayout {
    if frame_count == 0 || width == 0 || height == 0 {
        return GridLayout::strip(frame_count);
    }

    let sheet_aspect = f64::from(width) / f64::from(height);
    let mut best: Option<(GridLayout, f64)> = None;

    for rows in 1..=frame_count {
        if frame_count % rows != 0 {
            continue;
        }
        let columns = frame_count / rows;
        let cell_w = f64::from(width) / f64::from(columns);
        let cell_h = f64::from(height) / f64::from(rows);
        let cell_aspect = cell_w / cell_h;
        let grid_aspect = f64::from(columns) / f64::from(rows);

        let score = (cell_aspect - 1.0).abs() + (grid_aspect - sheet_aspect).abs() * 0.5;
        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((GridLayout { columns, rows }, score)),
        }
    }

    best.map(|(layout, _)| layout)
        .unwrap_or_else(|| GridLayout::strip(frame_count))
}

/// Row-major cell rectangles for `layout` on a `width × height` sheet.
///
/// Fails when the sheet is too small to give every cell at least one pixel.
pub fn cell_rects(width: u32, height: u32, layout: GridLayout) -> Result<Vec<Rect>> {
    if layout.columns == 0 || layout.rows == 0 {
        bail!("grid layout {}x{} has no cells", layout.columns, layout.rows);
    }
    let cell_w = width / layout.columns;
    let cell_h = height / layout.rows;
    if cell_w == 0 || cell_h == 0 {
        bail!(
            "sheet {}x{} too small for a {}x{} grid",
            width,
            height,
            layout.columns,
            layout.rows
        );
    }

    let mut rects = Vec::with_capacity(layout.cell_count() as usize);
    for r in 0..layout.rows {
        for c in 0..layout.columns {
            rects.push(Rect {
                x: c * cell_w,
                y: r * cell_h,
                w: cell_w,
                h: cell_h,
            });
        }
    }
    Ok(rects)
}

/// Copy a rectangular region out of a tightly packed RGBA8 buffer.
///
/// `src_w` is the source width in pixels; `roi` must lie inside the source.
pub fn crop_rgba(src: &[u8], src_w: u32, roi: Rect) -> Vec<u8> {
    let src_pitch = (src_w as usize) * 4;
    let row_bytes = (roi.w as usize) * 4;
    let mut out = Vec::with_capacity(row_bytes * (roi.h as usize));
    for r in 0..roi.h as usize {
        let row_off = (roi.y as usize + r) * src_pitch + (roi.x as usize) * 4;
        out.extend_from_slice(&src[row_off..row_off + row_bytes]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_sheet_four_frames_is_two_by_two() {
        assert_eq!(infer_layout(512, 512, 4), GridLayout { columns: 2, rows: 2 });
    }

    #[test]
    fn test_wide_sheet_prefers_more_columns() {
        let layout = infer_layout(1536, 512, 6);
        assert_eq!(layout, GridLayout { columns: 3, rows: 2 });
        assert!(layout.columns > layout.rows);
    }

    #[test]
    fn test_strip_sheet_is_single_row() {
        assert_eq!(infer_layout(1024, 128, 8), GridLayout { columns: 8, rows: 1 });
    }

    #[test]
    fn test_prime_frame_count() {
        let layout = infer_layout(700, 100, 7);
        assert_eq!(layout, GridLayout { columns: 7, rows: 1 });
    }

    #[test]
    fn test_product_matches_frame_count() {
        for n in 1..=16 {
            for (w, h) in [(512, 512), (1024, 256), (300, 900), (17, 5)] {
                let layout = infer_layout(w, h, n);
                assert_eq!(layout.cell_count(), n, "{w}x{h} n={n}");
            }
        }
    }

    #[test]
    fn test_degenerate_inputs_fall_back_to_strip() {
        assert_eq!(infer_layout(0, 512, 4), GridLayout::strip(4));
        assert_eq!(infer_layout(512, 512, 0), GridLayout { columns: 1, rows: 1 });
    }

    #[test]
    fn test_cell_rects_row_major_with_floor_division() {
        let rects = cell_rects(101, 51, GridLayout { columns: 2, rows: 2 }).unwrap();
        assert_eq!(rects.len(), 4);
        assert_eq!(rects[0], Rect { x: 0, y: 0, w: 50, h: 25 });
        assert_eq!(rects[1], Rect { x: 50, y: 0, w: 50, h: 25 });
        assert_eq!(rects[2], Rect { x: 0, y: 25, w: 50, h: 25 });
        assert_eq!(rects[3], Rect { x: 50, y: 25, w: 50, h: 25 });
    }

    #[test]
    fn test_cell_rects_rejects_tiny_sheet() {
        assert!(cell_rects(3, 3, GridLayout { columns: 4, rows: 1 }).is_err());
    }

    #[test]
    fn test_crop_rgba_extracts_region() {
        // 3x2 image, pixel value = index
        let src: Vec<u8> = (0..6u8).flat_map(|i| [i, i, i, 255]).collect();
        let out = crop_rgba(&src, 3, Rect { x: 1, y: 1, w: 2, h: 1 });
        assert_eq!(out, vec![4, 4, 4, 255, 5, 5, 5, 255]);
    }
}
