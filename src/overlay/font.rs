use ab_glyph::FontRef;
use anyhow::{Context, Result};

/// DejaVu Sans Bold, embedded so stamped output never depends on whatever
/// fonts the host system ships.
static OVERLAY_FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

pub fn load_embedded() -> Result<FontRef<'static>> {
    FontRef::try_from_slice(OVERLAY_FONT_BYTES).context("failed to parse embedded overlay font")
}
