//! Frame normalization: fit a cell onto the fixed preset canvas.
//!
//! The cell is scaled by `min(W / w, H / h)` with Lanczos3 and centered on a fully
//! transparent `W × H` canvas. Nothing is stretched and letterbox margins stay
//! transparent.

use fast_image_resize::Resizer;
use image::RgbaImage;
use sprite_slice::cpu::scale_rgba_cpu;
use sprite_slice::presets::{Size, fit_plan};

use crate::error::{SpriteError, SpriteResult};

/// Reusable normalizer; keeps one resizer for all frames of a job.
pub struct FrameNormalizer {
    resizer: Resizer,
    canvas: Size,
}

impl FrameNormalizer {
    pub fn new(canvas_w: u32, canvas_h: u32) -> Self {
        Self {
            resizer: Resizer::new(),
            canvas: Size {
                w: canvas_w,
                h: canvas_h,
            },
        }
    }

    pub fn canvas(&self) -> (u32, u32) {
        (self.canvas.w, self.canvas.h)
    }

    pub fn fit(&mut self, image: &RgbaImage) -> SpriteResult<RgbaImage> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(SpriteError::processing(
                "fit_to_canvas",
                format!("cannot fit an empty {}x{} image", w, h),
            ));
        }
        if self.canvas.w == 0 || self.canvas.h == 0 {
            return Err(SpriteError::processing(
                "fit_to_canvas",
                format!("canvas {}x{} is empty", self.canvas.w, self.canvas.h),
            ));
        }

        let plan = fit_plan(Size { w, h }, self.canvas);
        let mut dst = vec![0u8; self.canvas.area() as usize * 4];
        scale_rgba_cpu(&mut self.resizer, image.as_raw(), &plan, &mut dst)
            .map_err(|e| SpriteError::processing("fit_to_canvas", e.to_string()))?;

        RgbaImage::from_raw(self.canvas.w, self.canvas.h, dst).ok_or_else(|| {
            SpriteError::processing("fit_to_canvas", "canvas buffer has the wrong length")
        })
    }
}

/// One-shot [`FrameNormalizer::fit`].
pub fn fit_to_canvas(image: &RgbaImage, target_w: u32, target_h: u32) -> SpriteResult<RgbaImage> {
    FrameNormalizer::new(target_w, target_h).fit(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn opaque(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 90, 255]))
    }

    #[test]
    fn test_canvas_sized_image_is_unchanged() {
        let img = opaque(64, 48);
        let once = fit_to_canvas(&img, 64, 48).unwrap();
        let twice = fit_to_canvas(&once, 64, 48).unwrap();
        assert_eq!(once, img);
        assert_eq!(twice, img);
    }

    #[test]
    fn test_output_is_always_canvas_sized() {
        let cases = [
            ((300, 300), (128, 128)),
            ((100, 250), (128, 128)),
            ((400, 100), (90, 160)),
            ((17, 9), (256, 256)),
        ];
        for ((w, h), (tw, th)) in cases {
            let out = fit_to_canvas(&opaque(w, h), tw, th).unwrap();
            assert_eq!(out.dimensions(), (tw, th), "{w}x{h} into {tw}x{th}");
        }
    }

    #[test]
    fn test_portrait_pillarbox_is_transparent() {
        let out = fit_to_canvas(&opaque(50, 100), 100, 100).unwrap();
        assert_eq!(out.get_pixel(0, 50)[3], 0);
        assert_eq!(out.get_pixel(99, 50)[3], 0);
        assert_eq!(out.get_pixel(50, 50)[3], 255);
    }

    #[test]
    fn test_reused_normalizer() {
        let mut normalizer = FrameNormalizer::new(32, 32);
        for side in [16, 64, 33] {
            let out = normalizer.fit(&opaque(side, side)).unwrap();
            assert_eq!(out.dimensions(), (32, 32));
        }
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let err = fit_to_canvas(&RgbaImage::new(0, 5), 8, 8).unwrap_err();
        assert_eq!(err.category(), "processing");
    }
}
