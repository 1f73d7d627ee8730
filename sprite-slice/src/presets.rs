// SPDX-License-Identifier: MIT
//! # Canvas Fitting Plans
//!
//! Computes where a cropped sheet cell lands on a fixed-size frame canvas.
//!
//! ## Design Philosophy
//!
//! Every frame of an animation must come out at exactly the preset canvas size, but the
//! cells cut from a generated sheet rarely match that size or its aspect ratio. A plan
//! therefore has two parts:
//! 1. **Scale**: the largest uniform factor that makes the cell fit inside the canvas
//!    (`min(canvas_w / cell_w, canvas_h / cell_h)`), which may shrink or grow the cell
//! 2. **ROI**: the sub-rectangle of the canvas the scaled cell occupies, centered with
//!    floor division so any odd leftover pixel goes to the right/bottom margin
//!
//! The space outside the ROI is letterboxing and stays fully transparent.
//!
//! ## Precision
//!
//! Scaled dimensions are computed with integer arithmetic on the cross products rather
//! than a floating-point factor, so the limiting side always lands on the canvas edge
//! exactly and the other side is floored. Both sides are clamped to at least 1px.

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    /// Total pixel count.
    pub fn area(self) -> u64 {
        u64::from(self.w) * u64::from(self.h)
    }
}

/// Complete fitting plan computed from a cell size and a canvas size.
/// Contains all information needed to perform the actual scaling operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePlan {
    /// Original cell dimensions
    pub input: Size,
    /// Final canvas dimensions (always the requested canvas)
    pub out: Size,
    /// Sub-rectangle where scaled content is placed.
    /// Format: (x, y, width, height) in canvas coordinate space.
    pub dst_roi: (u32, u32, u32, u32),
}

impl ScalePlan {
    /// Size of the scaled content inside the canvas.
    pub fn scaled(&self) -> Size {
        Size {
            w: self.dst_roi.2,
            h: self.dst_roi.3,
        }
    }

    /// True when the content is copied through without resampling.
    pub fn is_identity_scale(&self) -> bool {
        self.scaled() == self.input
    }
}

/// Compute the aspect-preserving fit of `input` onto a `canvas`.
///
/// # Arguments
/// * `input` - Cell dimensions
/// * `canvas` - Target frame canvas
///
/// # Returns
/// A ScalePlan whose `out` is exactly `canvas` and whose ROI holds the scaled cell,
/// centered.
///
/// # Performance
/// O(1), integer math only
pub fn fit_plan(input: Size, canvas: Size) -> ScalePlan {
    let (rw, rh) = fit_within(input, canvas);
    let x = (canvas.w - rw) / 2;
    let y = (canvas.h - rh) / 2;
    ScalePlan {
        input,
        out: canvas,
        dst_roi: (x, y, rw, rh),
    }
}

/// Fit a size within a bounding box while preserving aspect ratio.
/// Returns (width, height) that fit entirely within the box; upscales when the
/// input is smaller than the box.
fn fit_within(input: Size, box_: Size) -> (u32, u32) {
    let (w, h) = (u64::from(input.w.max(1)), u64::from(input.h.max(1)));
    let (bw, bh) = (u64::from(box_.w), u64::from(box_.h));

    // bw / w <= bh / h  <=>  bw * h <= bh * w
    let (rw, rh) = if bw * h <= bh * w {
        (bw, h * bw / w)
    } else {
        (w * bh / h, bh)
    };

    (
        (rw as u32).clamp(1, box_.w.max(1)),
        (rh as u32).clamp(1, box_.h.max(1)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: Size = Size { w: 128, h: 128 };

    #[test]
    fn test_square_into_square_fills_canvas() {
        let plan = fit_plan(Size { w: 256, h: 256 }, SQUARE);
        assert_eq!(plan.out, SQUARE);
        assert_eq!(plan.dst_roi, (0, 0, 128, 128));
    }

    #[test]
    fn test_portrait_into_square_pillarboxes() {
        let plan = fit_plan(Size { w: 100, h: 200 }, SQUARE);
        assert_eq!(plan.dst_roi, (32, 0, 64, 128));
    }

    #[test]
    fn test_landscape_into_portrait_letterboxes() {
        let plan = fit_plan(Size { w: 300, h: 100 }, Size { w: 90, h: 160 });
        assert_eq!(plan.out, Size { w: 90, h: 160 });
        assert_eq!(plan.dst_roi, (0, 65, 90, 30));
    }

    #[test]
    fn test_small_cell_is_upscaled_to_fit() {
        let plan = fit_plan(Size { w: 32, h: 16 }, SQUARE);
        assert_eq!(plan.scaled(), Size { w: 128, h: 64 });
        assert_eq!(plan.dst_roi.1, 32);
    }

    #[test]
    fn test_same_size_is_identity() {
        let plan = fit_plan(SQUARE, SQUARE);
        assert!(plan.is_identity_scale());
        assert_eq!(plan.dst_roi, (0, 0, 128, 128));
    }

    #[test]
    fn test_roi_always_inside_canvas() {
        for (w, h) in [(1, 1), (7, 3), (3, 7), (999, 1), (1, 999), (513, 257)] {
            for canvas in [SQUARE, Size { w: 64, h: 48 }, Size { w: 17, h: 91 }] {
                let plan = fit_plan(Size { w, h }, canvas);
                let (x, y, rw, rh) = plan.dst_roi;
                assert!(x + rw <= canvas.w, "{w}x{h} into {canvas:?}");
                assert!(y + rh <= canvas.h, "{w}x{h} into {canvas:?}");
                assert!(rw == canvas.w || rh == canvas.h);
            }
        }
    }
}
