//! Glyph measurement and rasterization primitives for the composer.
//!
//! Everything here is pure pixel math over straight-alpha RGBA buffers;
//! the composer owns layout policy.

use ab_glyph::{point, Font, FontRef, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

/// Vertical metrics for one text line at a given pixel size.
#[derive(Debug, Clone, Copy)]
pub struct LineMetrics {
    pub ascent: f32,
    /// Ascent minus descent: the tight line box.
    pub line_height: f32,
    /// Extra leading the face recommends between lines.
    pub line_gap: f32,
}

impl LineMetrics {
    /// Baseline-to-baseline distance.
    pub fn advance(&self) -> f32 {
        self.line_height + self.line_gap
    }
}

pub fn line_metrics(font: &FontRef<'_>, px_size: f32) -> LineMetrics {
    let scaled = font.as_scaled(PxScale::from(px_size));
    LineMetrics {
        ascent: scaled.ascent(),
        line_height: scaled.ascent() - scaled.descent(),
        line_gap: scaled.line_gap(),
    }
}

/// Advance width of `text`, kerning included.
pub fn measure_width(font: &FontRef<'_>, px_size: f32, text: &str) -> f32 {
    let scaled = font.as_scaled(PxScale::from(px_size));
    let mut width = 0.0;
    let mut previous: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

/// Rasterizes one line starting at `(origin_x, baseline_y)`.
///
/// Coverage is multiplied into the color's alpha, then source-over
/// blended; pixels falling outside the canvas are clipped.
pub fn draw_line(
    canvas: &mut RgbaImage,
    font: &FontRef<'_>,
    px_size: f32,
    origin_x: f32,
    baseline_y: f32,
    text: &str,
    color: Rgba<u8>,
) {
    let scale = PxScale::from(px_size);
    let scaled = font.as_scaled(scale);
    let (canvas_w, canvas_h) = canvas.dimensions();
    let mut caret = origin_x;
    let mut previous: Option<GlyphId> = None;

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline_y));
        caret += scaled.h_advance(id);
        previous = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i32 + gx as i32;
            let py = bounds.min.y as i32 + gy as i32;
            if px < 0 || py < 0 || px as u32 >= canvas_w || py as u32 >= canvas_h {
                return;
            }
            let alpha = (coverage.clamp(0.0, 1.0) * color.0[3] as f32).round() as u8;
            if alpha == 0 {
                return;
            }
            blend_pixel(
                canvas,
                px as u32,
                py as u32,
                Rgba([color.0[0], color.0[1], color.0[2], alpha]),
            );
        });
    }
}

/// Source-over fill of an axis-aligned rectangle, clipped to the canvas.
/// Coordinates are half-open: `[x0, x1) × [y0, y1)`.
pub fn fill_rect(canvas: &mut RgbaImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
    if color.0[3] == 0 {
        return;
    }
    let (canvas_w, canvas_h) = canvas.dimensions();
    let left = x0.max(0) as u32;
    let top = y0.max(0) as u32;
    let right = (x1.max(0) as u32).min(canvas_w);
    let bottom = (y1.max(0) as u32).min(canvas_h);
    for y in top..bottom {
        for x in left..right {
            blend_pixel(canvas, x, y, color);
        }
    }
}

/// Source-over blend of one straight-alpha pixel.
pub fn blend_pixel(canvas: &mut RgbaImage, x: u32, y: u32, src: Rgba<u8>) {
    let dst = *canvas.get_pixel(x, y);
    let src_a = src.0[3] as f32 / 255.0;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst.0[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        canvas.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        return;
    }
    let channel = |s: u8, d: u8| -> u8 {
        let s = s as f32 / 255.0;
        let d = d as f32 / 255.0;
        (((s * src_a + d * dst_a * (1.0 - src_a)) / out_a) * 255.0).round() as u8
    };
    canvas.put_pixel(
        x,
        y,
        Rgba([
            channel(src.0[0], dst.0[0]),
            channel(src.0[1], dst.0[1]),
            channel(src.0[2], dst.0[2]),
            (out_a * 255.0).round() as u8,
        ]),
    );
}
