//! Offline sheet generator.
//!
//! Paints a horizontal strip of simple figures on a light grey background, one per
//! frame, with arms and legs that shift with the frame index. Output is deterministic for
//! a given request, which makes it the generator of choice for tests.

use std::io::Cursor;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};

use super::{SheetGenerator, SheetRequest};
use crate::error::{SpriteError, SpriteResult};

pub const BACKGROUND: Rgba<u8> = Rgba([240, 240, 240, 255]);
const SEPARATOR: Rgba<u8> = Rgba([220, 220, 220, 255]);
const HEAD: Rgba<u8> = Rgba([100, 150, 200, 255]);
const BODY: Rgba<u8> = Rgba([80, 130, 180, 255]);
const ARM: Rgba<u8> = Rgba([90, 140, 190, 255]);
const LEG: Rgba<u8> = Rgba([70, 120, 170, 255]);

#[derive(Debug, Clone, Default)]
pub struct MockGenerator;

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Paint the sheet for `request` without encoding it.
    pub fn paint(&self, request: &SheetRequest) -> SpriteResult<RgbaImage> {
        let (fw, fh) = request.canvas;
        if fw == 0 || fh == 0 || request.frame_count == 0 {
            return Err(SpriteError::generator(
                "mock",
                None,
                format!(
                    "cannot paint {} frames of {}x{}",
                    request.frame_count, fw, fh
                ),
            ));
        }
        let sheet_w = fw.checked_mul(request.frame_count).ok_or_else(|| {
            SpriteError::generator("mock", None, "sheet width overflows u32")
        })?;
        let mut img = RgbaImage::from_pixel(sheet_w, fh, BACKGROUND);

        let n = request.frame_count as i32;
        let (fw, fh) = (fw as i32, fh as i32);
        let short = fw.min(fh);

        for i in 0..n {
            let cx = i * fw + fw / 2;
            let cy = fh / 2;

            let arm_reach = (20 * (i - n / 2)).abs() / 3;
            let leg_spread = 10 + 5 * (i % 3);

            let head = short / 6;
            fill_ellipse(&mut img, cx, cy - fh / 3, head, head, HEAD);

            let body_w = short / 5;
            let body_h = short / 3;
            fill_rect(&mut img, cx - body_w, cy - fh / 6, cx + body_w, cy + body_h / 2, BODY);

            let arm_w = body_w / 2;
            let arm_h = body_h / 2;
            fill_rect(&mut img, cx - body_w - arm_w - arm_reach, cy - fh / 8, cx - body_w, cy + arm_h, ARM);
            fill_rect(&mut img, cx + body_w, cy - fh / 8, cx + body_w + arm_w + arm_reach, cy + arm_h, ARM);

            let leg_w = body_w / 2;
            let leg_top = cy + body_h / 2;
            fill_rect(&mut img, cx - leg_spread - leg_w, leg_top, cx - leg_spread + leg_w, leg_top + body_h, LEG);
            fill_rect(&mut img, cx + leg_spread - leg_w, leg_top, cx + leg_spread + leg_w, leg_top + body_h, LEG);

            if i < n - 1 {
                let x = (i + 1) * fw;
                fill_rect(&mut img, x, 0, x, fh - 1, SEPARATOR);
            }
        }
        Ok(img)
    }
}

/// Fill the inclusive rectangle `[x0, x1] × [y0, y1]`, clipped to the image.
fn fill_rect(img: &mut RgbaImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
    let (w, h) = (img.width() as i32, img.height() as i32);
    for y in y0.max(0)..=y1.min(h - 1) {
        for x in x0.max(0)..=x1.min(w - 1) {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn fill_ellipse(img: &mut RgbaImage, cx: i32, cy: i32, rx: i32, ry: i32, color: Rgba<u8>) {
    if rx <= 0 || ry <= 0 {
        return;
    }
    let (w, h) = (img.width() as i32, img.height() as i32);
    let (rx2, ry2) = (i64::from(rx * rx), i64::from(ry * ry));
    for y in (cy - ry).max(0)..=(cy + ry).min(h - 1) {
        for x in (cx - rx).max(0)..=(cx + rx).min(w - 1) {
            let (dx, dy) = (i64::from(x - cx), i64::from(y - cy));
            if dx * dx * ry2 + dy * dy * rx2 <= rx2 * ry2 {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

#[async_trait]
impl SheetGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_sheet(&self, request: &SheetRequest) -> SpriteResult<Vec<u8>> {
        tracing::info!(
            animation = %request.animation,
            frames = request.frame_count,
            "painting mock sheet"
        );
        let img = self.paint(request)?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| SpriteError::image("encode mock sheet", e))?;
        Ok(bytes)
    }
}
