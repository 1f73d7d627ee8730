// SPDX-License-Identifier: MIT
// CPU frame fitter built on fast_image_resize (SIMD-accelerated).
// RGBA8 in → RGBA8 out, written into the plan's ROI of a caller-provided canvas.

use fast_image_resize as fir;
use fir::images::{TypedCroppedImageMut, TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};

use crate::presets::ScalePlan;

#[derive(Debug)]
pub enum ScaleError {
    BufferTooSmall,
    SourceTooSmall,
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
    Crop(fir::CropBoxError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }
impl From<fir::CropBoxError> for ScaleError { fn from(e: fir::CropBoxError) -> Self { Self::Crop(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::BufferTooSmall => write!(f, "Canvas buffer too small"),
            ScaleError::SourceTooSmall => write!(f, "Source buffer shorter than its dimensions"),
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
            ScaleError::Crop(e) => write!(f, "Crop error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            ScaleError::Crop(e) => Some(e),
            _ => None,
        }
    }
}

/// Fit a tightly packed RGBA8 cell onto a transparent canvas.
///
/// `src_rgba` must hold `plan.input.w * plan.input.h * 4` bytes.
/// `dst` must hold at least `plan.out.w * plan.out.h * 4` bytes; everything outside
/// `plan.dst_roi` is cleared to `[0, 0, 0, 0]`.
///
/// Resampling is Lanczos3 with premultiplied alpha, so colour from fully transparent
/// background pixels does not bleed into the sprite edges. When the ROI equals the
/// input size the pixels are copied verbatim.
pub fn scale_rgba_cpu(
    resizer: &mut Resizer,
    src_rgba: &[u8],
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    let dst_len = (plan.out.w as usize) * (plan.out.h as usize) * 4;
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }
    let src_len = (plan.input.w as usize) * (plan.input.h as usize) * 4;
    if src_rgba.len() < src_len {
        return Err(ScaleError::SourceTooSmall);
    }

    let dst = &mut dst[..dst_len];
    dst.fill(0);

    if plan.is_identity_scale() {
        blit_rows(&src_rgba[..src_len], plan, dst);
        return Ok(());
    }

    let src_view = TypedImageRef::<U8x4>::from_buffer(plan.input.w, plan.input.h, &src_rgba[..src_len])?;
    let mut dst_image = TypedImage::<U8x4>::from_buffer(plan.out.w, plan.out.h, dst)?;

    let (x, y, w, h) = plan.dst_roi;
    let mut roi = TypedCroppedImageMut::from_ref(&mut dst_image, x, y, w, h)?;

    let opts = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3))
        .use_alpha(true);
    resizer.resize_typed::<U8x4>(&src_view, &mut roi, &opts)?;

    Ok(())
}

#[inline]
fn blit_rows(src: &[u8], plan: &ScalePlan, dst: &mut [u8]) {
    let (x, y, w, h) = plan.dst_roi;
    let row_bytes = (w as usize) * 4;
    let dst_pitch = (plan.out.w as usize) * 4;
    for r in 0..h as usize {
        let s = &src[r * row_bytes..(r + 1) * row_bytes];
        let off = (y as usize + r) * dst_pitch + (x as usize) * 4;
        dst[off..off + row_bytes].copy_from_slice(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{fit_plan, Size};

    fn solid(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
        px.iter().copied().cycle().take((w * h * 4) as usize).collect()
    }

    fn pixel(buf: &[u8], canvas_w: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * canvas_w + x) * 4) as usize;
        [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
    }

    #[test]
    fn test_identity_copies_pixels() {
        let mut src = solid(4, 4, [10, 20, 30, 255]);
        src[0..4].copy_from_slice(&[1, 2, 3, 0]);
        let plan = fit_plan(Size { w: 4, h: 4 }, Size { w: 4, h: 4 });
        let mut dst = vec![7u8; 64];
        scale_rgba_cpu(&mut Resizer::new(), &src, &plan, &mut dst).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_letterbox_margins_are_transparent() {
        let src = solid(20, 10, [200, 40, 40, 255]);
        let canvas = Size { w: 16, h: 16 };
        let plan = fit_plan(Size { w: 20, h: 10 }, canvas);
        assert_eq!(plan.dst_roi, (0, 4, 16, 8));

        let mut dst = vec![0xAAu8; 16 * 16 * 4];
        scale_rgba_cpu(&mut Resizer::new(), &src, &plan, &mut dst).unwrap();

        assert_eq!(pixel(&dst, 16, 8, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&dst, 16, 8, 15), [0, 0, 0, 0]);
        let center = pixel(&dst, 16, 8, 8);
        assert_eq!(center[3], 255);
        assert!(center[0] > 150);
    }

    #[test]
    fn test_rejects_short_canvas() {
        let src = solid(8, 8, [0, 0, 0, 255]);
        let plan = fit_plan(Size { w: 8, h: 8 }, Size { w: 4, h: 4 });
        let mut dst = vec![0u8; 10];
        let err = scale_rgba_cpu(&mut Resizer::new(), &src, &plan, &mut dst).unwrap_err();
        assert!(matches!(err, ScaleError::BufferTooSmall));
    }

    #[test]
    fn test_rejects_short_source() {
        let plan = fit_plan(Size { w: 8, h: 8 }, Size { w: 4, h: 4 });
        let mut dst = vec![0u8; 64];
        let err = scale_rgba_cpu(&mut Resizer::new(), &[0u8; 12], &plan, &mut dst).unwrap_err();
        assert!(matches!(err, ScaleError::SourceTooSmall));
    }
}
