use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use imprint_core::models::{WatermarkAnchor, WatermarkSettings};

const GLYPH_SIZE: u32 = 8;
const MIN_FONT_SIZE: u32 = 8;

/// Text watermark rendered from the built-in 8x8 bitmap face.
///
/// Glyph sizes are multiples of 8px: the requested font size is rounded
/// down to the nearest one.
pub struct Watermark;

impl Watermark {
    pub fn is_active(settings: &WatermarkSettings) -> bool {
        settings.enabled && !settings.text.trim().is_empty()
    }

    /// Explicit size, or 5% of the longer side (never below 8px).
    pub fn font_size(settings: &WatermarkSettings, width: u32, height: u32) -> u32 {
        settings
            .font_size
            .unwrap_or_else(|| (width.max(height) as f32 * 0.05).round() as u32)
            .max(MIN_FONT_SIZE)
    }

    /// Glyph scale for a text block: the largest multiple of the 8px face
    /// not above `font_size`, reduced until the block plus its margin fits
    /// the image. Never below 1; at scale 1 an oversized block is clipped.
    pub fn glyph_scale(font_size: u32, chars: u32, img_width: u32, img_height: u32) -> u32 {
        let requested = (font_size / GLYPH_SIZE).max(1);
        // Block width is scale * (9 * chars - 1), plus a half-cell margin each side.
        let width_limit = img_width / (9 * chars.max(1) + GLYPH_SIZE - 1);
        let height_limit = img_height / (2 * GLYPH_SIZE);
        requested.min(width_limit).min(height_limit).max(1)
    }

    /// Apply watermark to image
    pub fn apply(img: &DynamicImage, settings: &WatermarkSettings) -> DynamicImage {
        let (img_width, img_height) = img.dimensions();
        let font_size = Self::font_size(settings, img_width, img_height);
        let text = settings.text.trim();

        let scale = Self::glyph_scale(font_size, text.chars().count() as u32, img_width, img_height);
        if scale < (font_size / GLYPH_SIZE).max(1) {
            tracing::debug!(
                font_size,
                glyph_size = scale * GLYPH_SIZE,
                "Watermark text scaled down to fit"
            );
        }

        let layer = Self::render_text(text, scale, settings.opacity);
        let (layer_width, layer_height) = layer.dimensions();
        let (x, y) = Self::position(
            settings.anchor,
            (img_width, img_height),
            (layer_width, layer_height),
            scale * GLYPH_SIZE / 2,
        );

        let mut img_rgba = img.to_rgba8();
        imageops::overlay(&mut img_rgba, &layer, x, y);

        tracing::debug!(
            font_size,
            scale,
            anchor = ?settings.anchor,
            x,
            y,
            "Watermark applied"
        );

        DynamicImage::ImageRgba8(img_rgba)
    }

    /// Top-left corner of the text block. Corners are inset by `margin`,
    /// center is the geometric center.
    pub fn position(
        anchor: WatermarkAnchor,
        (img_width, img_height): (u32, u32),
        (layer_width, layer_height): (u32, u32),
        margin: u32,
    ) -> (i64, i64) {
        let right = (img_width as i64 - layer_width as i64 - margin as i64).max(0);
        let bottom = (img_height as i64 - layer_height as i64 - margin as i64).max(0);
        let margin = margin as i64;

        match anchor {
            WatermarkAnchor::TopLeft => (margin, margin),
            WatermarkAnchor::TopRight => (right, margin),
            WatermarkAnchor::BottomLeft => (margin, bottom),
            WatermarkAnchor::BottomRight => (right, bottom),
            WatermarkAnchor::Center => (
                ((img_width as i64 - layer_width as i64) / 2).max(0),
                ((img_height as i64 - layer_height as i64) / 2).max(0),
            ),
        }
    }

    /// White text on a transparent layer, glyphs scaled by nearest neighbour.
    fn render_text(text: &str, scale: u32, opacity: f32) -> RgbaImage {
        let cell = GLYPH_SIZE * scale;
        let gap = scale;
        let chars: Vec<char> = text.chars().collect();
        let count = chars.len() as u32;

        let width = count * cell + count.saturating_sub(1) * gap;
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        let ink = Rgba([255, 255, 255, alpha]);
        let mut layer = RgbaImage::new(width.max(1), cell);

        for (index, ch) in chars.iter().enumerate() {
            let glyph = BASIC_FONTS
                .get(*ch)
                .or_else(|| BASIC_FONTS.get('?'))
                .unwrap_or([0; 8]);
            let origin_x = index as u32 * (cell + gap);

            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_SIZE {
                    if (bits >> col) & 1 == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            layer.put_pixel(
                                origin_x + col * scale + dx,
                                row as u32 * scale + dy,
                                ink,
                            );
                        }
                    }
                }
            }
        }

        layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])))
    }

    fn settings(text: &str, anchor: WatermarkAnchor) -> WatermarkSettings {
        WatermarkSettings {
            enabled: true,
            text: text.to_string(),
            anchor,
            opacity: 1.0,
            font_size: Some(16),
        }
    }

    fn lit_bounds(img: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in img.enumerate_pixels() {
            if p[0] > 0 {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bounds
    }

    #[test]
    fn test_default_font_size() {
        let mut s = settings("a", WatermarkAnchor::Center);
        s.font_size = None;
        assert_eq!(Watermark::font_size(&s, 1000, 400), 50);
        assert_eq!(Watermark::font_size(&s, 100, 50), 8);
    }

    #[test]
    fn test_watermark_top_left() {
        let out = Watermark::apply(&create_test_image(200, 200), &settings("II", WatermarkAnchor::TopLeft))
            .to_rgba8();
        let (x0, y0, _, _) = lit_bounds(&out).unwrap();
        // 16px font: margin 8, glyph scale 2
        assert!((8..16).contains(&x0));
        assert!((8..16).contains(&y0));
    }

    #[test]
    fn test_watermark_bottom_right() {
        let out = Watermark::apply(
            &create_test_image(200, 200),
            &settings("II", WatermarkAnchor::BottomRight),
        )
        .to_rgba8();
        let (_, _, x1, y1) = lit_bounds(&out).unwrap();
        assert!(x1 < 192 && x1 > 150);
        assert!(y1 < 192 && y1 > 170);
    }

    #[test]
    fn test_watermark_center_position() {
        let pos = Watermark::position(WatermarkAnchor::Center, (200, 100), (50, 16), 8);
        assert_eq!(pos, (75, 42));
    }

    #[test]
    fn test_opacity_applies() {
        let mut s = settings("X", WatermarkAnchor::Center);
        s.opacity = 0.5;
        let out = Watermark::apply(&create_test_image(64, 64), &s).to_rgba8();
        let brightest = out.pixels().map(|p| p[0]).max().unwrap();
        assert!(brightest > 100 && brightest < 160);
    }

    #[test]
    fn test_glyph_scale_rounds_down() {
        assert_eq!(Watermark::glyph_scale(12, 2, 1000, 1000), 1);
        assert_eq!(Watermark::glyph_scale(16, 2, 1000, 1000), 2);
        assert_eq!(Watermark::glyph_scale(23, 2, 1000, 1000), 2);
        assert_eq!(Watermark::glyph_scale(200, 2, 1000, 1000), 25);
    }

    #[test]
    fn test_long_text_shrinks_to_fit() {
        let text = "Copyright 2026 Example Studio Photography";
        let mut s = settings(text, WatermarkAnchor::BottomRight);
        s.font_size = Some(24);
        assert_eq!(Watermark::glyph_scale(24, text.len() as u32, 800, 600), 2);

        let out = Watermark::apply(&create_test_image(800, 600), &s).to_rgba8();
        let (x0, y0, x1, y1) = lit_bounds(&out).unwrap();
        // 41 glyphs at scale 2: 736px wide, inset by an 8px margin
        assert!(x0 >= 8 && x1 < 792);
        assert!(y0 >= 570 && y1 < 592);
    }

    #[test]
    fn test_text_wider_than_tiny_image_is_clipped() {
        let mut s = settings("much too long for this", WatermarkAnchor::Center);
        s.font_size = Some(64);
        let out = Watermark::apply(&create_test_image(20, 20), &s);
        assert_eq!(out.dimensions(), (20, 20));
        assert!(lit_bounds(&out.to_rgba8()).is_some());
    }

    #[test]
    fn test_inactive_when_blank() {
        let mut s = settings("   ", WatermarkAnchor::Center);
        assert!(!Watermark::is_active(&s));
        s.text = "ok".into();
        s.enabled = false;
        assert!(!Watermark::is_active(&s));
    }
}
