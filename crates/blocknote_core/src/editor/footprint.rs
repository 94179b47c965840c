//! Placeholder footprint computation.
//!
//! The footprint is a pure function of block metadata and display settings.
//! It is recomputed on demand and never cached across loads.

use crate::config::DisplayConfig;
use crate::model::block::{BlockKind, ContentBlock};

/// Space a placeholder reserves on the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

/// Returns the placeholder footprint for a media block, `None` for text.
pub fn display_size(block: &ContentBlock, config: &DisplayConfig) -> Option<DisplaySize> {
    match block.kind() {
        BlockKind::Text { .. } => None,
        BlockKind::Image {
            width_px: Some(width),
            height_px: Some(height),
            ..
        } => Some(fit_within(*width, *height, config)),
        BlockKind::Image { .. } => Some(fit_within(
            config.fallback_image_width,
            config.fallback_image_height,
            config,
        )),
        BlockKind::Audio { .. } => Some(fit_within(config.audio_width, config.audio_height, config)),
    }
}

/// Scales `width x height` down to the configured bound, keeping aspect ratio.
/// Sizes already inside the bound are returned unchanged.
fn fit_within(width: u32, height: u32, config: &DisplayConfig) -> DisplaySize {
    let (max_w, max_h) = (u64::from(config.max_width), u64::from(config.max_height));
    let (w, h) = (u64::from(width.max(1)), u64::from(height.max(1)));

    if w <= max_w && h <= max_h {
        return DisplaySize {
            width: w as u32,
            height: h as u32,
        };
    }

    // Width-bound when w/h >= max_w/max_h, compared without division.
    let (new_w, new_h) = if w * max_h >= h * max_w {
        (max_w, (h * max_w / w).max(1))
    } else {
        ((w * max_h / h).max(1), max_h)
    };

    DisplaySize {
        width: new_w as u32,
        height: new_h as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::{display_size, DisplaySize};
    use crate::config::DisplayConfig;
    use crate::model::block::{BlockKind, ContentBlock};
    use uuid::Uuid;

    fn block(kind: BlockKind) -> ContentBlock {
        ContentBlock::new(Uuid::new_v4(), kind, 0).unwrap()
    }

    #[test]
    fn large_image_is_capped_preserving_aspect() {
        let config = DisplayConfig::default();
        let size = display_size(&block(BlockKind::image("big.jpg", Some(4000), Some(3000))), &config)
            .unwrap();
        assert!(size.width.max(size.height) <= config.max_width.max(config.max_height));
        assert!(size.width <= config.max_width && size.height <= config.max_height);
        assert_eq!(u64::from(size.width) * 3000, u64::from(size.height) * 4000);
    }

    #[test]
    fn tall_image_is_height_bound() {
        let config = DisplayConfig {
            max_width: 300,
            max_height: 200,
            ..DisplayConfig::default()
        };
        let size =
            display_size(&block(BlockKind::image("tall.jpg", Some(1000), Some(4000))), &config).unwrap();
        assert_eq!(size, DisplaySize { width: 50, height: 200 });
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let config = DisplayConfig::default();
        let size =
            display_size(&block(BlockKind::image("icon.png", Some(32), Some(16))), &config).unwrap();
        assert_eq!(size, DisplaySize { width: 32, height: 16 });
    }

    #[test]
    fn unknown_dimensions_use_fallback() {
        let config = DisplayConfig::default();
        let size = display_size(&block(BlockKind::image("x.jpg", None, Some(10))), &config).unwrap();
        assert_eq!(size, DisplaySize { width: 200, height: 150 });
    }

    #[test]
    fn audio_uses_fixed_glyph_and_text_has_none() {
        let config = DisplayConfig::default();
        let audio = display_size(&block(BlockKind::audio("a.m4a", Some(1_000))), &config).unwrap();
        assert_eq!(audio, DisplaySize { width: 800, height: 160 });
        assert_eq!(display_size(&block(BlockKind::text("hi")), &config), None);
    }
}
