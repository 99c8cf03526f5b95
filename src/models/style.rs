use serde::{Deserialize, Serialize};

pub const MIN_FONT_SIZE_SP: f32 = 10.0;
pub const MAX_FONT_SIZE_SP: f32 = 30.0;

/// Style for the burned-in geotag block. Colors are packed ARGB.
///
/// Shared by whole-value replacement: a settings session edits a private
/// copy and commits it atomically, never field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayStyle {
    /// Text size in scale-independent points; the composer multiplies by
    /// its display density to get pixels.
    pub font_size_sp: f32,
    pub text_color_argb: u32,
    /// `None` disables the background box regardless of `background_enabled`.
    pub background_color_argb: Option<u32>,
    pub background_opacity: f32,
    pub text_opacity: f32,
    pub background_enabled: bool,
    pub note_enabled: bool,
    pub note_text: String,
    /// Reserved for draggable overlay placement; the current layout ignores them.
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_size_sp: 14.0,
            text_color_argb: 0xFFFF_FFFF,
            background_color_argb: Some(0x8000_0000),
            background_opacity: 0.5,
            text_opacity: 1.0,
            background_enabled: true,
            note_enabled: false,
            note_text: String::new(),
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl OverlayStyle {
    /// Copy with every tunable forced into its documented range.
    pub fn clamped(&self) -> Self {
        let mut style = self.clone();
        style.font_size_sp = style.font_size_sp.clamp(MIN_FONT_SIZE_SP, MAX_FONT_SIZE_SP);
        style.background_opacity = style.background_opacity.clamp(0.0, 1.0);
        style.text_opacity = style.text_opacity.clamp(0.0, 1.0);
        style
    }

    /// True when the style asks for a background box and has a color for it.
    pub fn wants_background(&self) -> bool {
        self.background_enabled && self.background_color_argb.is_some()
    }
}
