//! Deterministic geotag stamping.
//!
//! `compose` is a pure function from `(photo, sample, style)` to a new
//! photo: no clock reads, no system font lookups, no randomness. The same
//! inputs always produce byte-identical output, which keeps stamped
//! evidence photos reproducible.

mod draw;
mod font;
pub mod format;

pub use format::format_location_block;

use ab_glyph::FontRef;
use anyhow::Result;
use image::{Rgba, RgbaImage};

use crate::models::{LocationSample, OverlayStyle};

pub const DEFAULT_DENSITY: f32 = 1.0;

/// Horizontal padding inside the block, as a fraction of photo width.
const PADDING_FRACTION: f32 = 0.02;
/// Shadow pass offset, in pixels, down and to the right.
const SHADOW_OFFSET_PX: f32 = 1.0;

/// Stamps the geotag block onto captured photos.
pub struct OverlayComposer {
    font: FontRef<'static>,
    /// Multiplier from scale-independent points to pixels.
    density: f32,
}

impl OverlayComposer {
    pub fn new() -> Result<Self> {
        Self::with_density(DEFAULT_DENSITY)
    }

    /// `density` is the display's sp-to-px factor and must be positive.
    pub fn with_density(density: f32) -> Result<Self> {
        Ok(Self {
            font: font::load_embedded()?,
            density,
        })
    }

    /// Composites the formatted block for `sample` onto a copy of `photo`.
    ///
    /// With no sample the copy comes back untouched. Malformed style values
    /// never fail the call: everything is clamped into range first. The
    /// block sits bottom-center, each line centered, with a 1 px black
    /// shadow under the text.
    pub fn compose(
        &self,
        photo: &RgbaImage,
        sample: Option<&LocationSample>,
        style: &OverlayStyle,
    ) -> RgbaImage {
        let mut canvas = photo.clone();
        let Some(sample) = sample else {
            return canvas;
        };
        let style = style.clamped();
        let lines = format::format_location_block(sample, &style);

        let (photo_w, photo_h) = canvas.dimensions();
        let px_size = style.font_size_sp * self.density;
        let metrics = draw::line_metrics(&self.font, px_size);
        let padding = photo_w as f32 * PADDING_FRACTION;

        let widths: Vec<f32> = lines
            .iter()
            .map(|line| draw::measure_width(&self.font, px_size, line))
            .collect();
        let max_line_width = widths.iter().copied().fold(0.0_f32, f32::max);

        let block_width = max_line_width + 2.0 * padding;
        let block_height = lines.len() as f32 * metrics.advance() + 2.0 * padding;
        let block_left = (photo_w as f32 - block_width) / 2.0;
        let block_top = photo_h as f32 - block_height;

        if style.wants_background() {
            if let Some(argb) = style.background_color_argb {
                draw::fill_rect(
                    &mut canvas,
                    block_left.round() as i32,
                    block_top.round() as i32,
                    (block_left + block_width).round() as i32,
                    photo_h as i32,
                    rgba_with_opacity(argb, style.background_opacity),
                );
            }
        }

        let text_color = rgba_with_opacity(style.text_color_argb, style.text_opacity);
        let shadow_color = Rgba([0, 0, 0, text_color.0[3]]);

        let mut baseline = block_top + padding + metrics.ascent;
        for (line, line_width) in lines.iter().zip(widths) {
            let line_left = block_left + (block_width - line_width) / 2.0;
            draw::draw_line(
                &mut canvas,
                &self.font,
                px_size,
                line_left + SHADOW_OFFSET_PX,
                baseline + SHADOW_OFFSET_PX,
                line,
                shadow_color,
            );
            draw::draw_line(
                &mut canvas,
                &self.font,
                px_size,
                line_left,
                baseline,
                line,
                text_color,
            );
            baseline += metrics.advance();
        }

        canvas
    }
}

/// RGB from the packed ARGB color, alpha byte from the opacity fraction.
fn rgba_with_opacity(argb: u32, opacity: f32) -> Rgba<u8> {
    let [_, r, g, b] = argb.to_be_bytes();
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([r, g, b, alpha])
}
