//! Decorative frame: padding, border, rounded corners and drop shadow.
//!
//! The background is described as a small SVG document and rasterized with
//! `resvg`, then the image is composited on top. Any rendering problem is
//! reported as a [`DecorationWarning`] and the caller keeps its input.

use image::{imageops, DynamicImage, GenericImageView, RgbaImage};
use imprint_core::models::FrameSettings;
use resvg::{tiny_skia, usvg};
use std::fmt::Write;

use crate::error::{DecorationStage, DecorationWarning};

pub struct Frame;

impl Frame {
    /// Output size for an image of `width`×`height`:
    /// box = image + 2·padding + 2·border, canvas = box + 2·shadow margin.
    pub fn canvas_size(width: u32, height: u32, settings: &FrameSettings) -> (u32, u32) {
        let inset = 2 * (settings.padding + settings.border_width);
        let margin = 2 * Self::shadow_margin(settings);
        (width + inset + margin, height + inset + margin)
    }

    fn shadow_margin(settings: &FrameSettings) -> u32 {
        settings.shadow.as_ref().map(|s| s.margin()).unwrap_or(0)
    }

    pub fn apply(img: &DynamicImage, settings: &FrameSettings) -> Result<DynamicImage, DecorationWarning> {
        let warn = |message: String| DecorationWarning::new(DecorationStage::Frame, message);

        let (width, height) = img.dimensions();
        let (canvas_width, canvas_height) = Self::canvas_size(width, height, settings);
        let svg = Self::background_svg(width, height, settings);

        let tree = usvg::Tree::from_str(&svg, &usvg::Options::default())
            .map_err(|e| warn(format!("Invalid frame document: {}", e)))?;

        let mut pixmap = tiny_skia::Pixmap::new(canvas_width, canvas_height).ok_or_else(|| {
            warn(format!(
                "Cannot allocate {}x{} frame canvas",
                canvas_width, canvas_height
            ))
        })?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        let raw: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        let mut canvas = RgbaImage::from_raw(canvas_width, canvas_height, raw)
            .ok_or_else(|| warn("Frame canvas size mismatch".to_string()))?;

        let offset = (Self::shadow_margin(settings) + settings.border_width + settings.padding) as i64;
        imageops::overlay(&mut canvas, &img.to_rgba8(), offset, offset);

        tracing::debug!(
            width = canvas_width,
            height = canvas_height,
            padding = settings.padding,
            border_width = settings.border_width,
            shadow = settings.shadow.is_some(),
            "Frame applied"
        );

        Ok(DynamicImage::ImageRgba8(canvas))
    }

    /// SVG for the frame background. The stroke is inset by half its width
    /// so the outer edge of the border lands on the box edge.
    pub fn background_svg(width: u32, height: u32, settings: &FrameSettings) -> String {
        let (canvas_width, canvas_height) = Self::canvas_size(width, height, settings);
        let margin = Self::shadow_margin(settings) as f32;
        let border = settings.border_width as f32;
        let box_width = (width + 2 * (settings.padding + settings.border_width)) as f32;
        let box_height = (height + 2 * (settings.padding + settings.border_width)) as f32;

        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = canvas_width,
            h = canvas_height
        );

        let filter_attr = match &settings.shadow {
            Some(shadow) => {
                let _ = write!(
                    svg,
                    concat!(
                        r#"<defs><filter id="shadow" filterUnits="userSpaceOnUse" x="0" y="0" width="{w}" height="{h}">"#,
                        r#"<feDropShadow dx="{dx}" dy="{dy}" stdDeviation="{sd}" flood-color="{color}" flood-opacity="{opacity}"/>"#,
                        r#"</filter></defs>"#
                    ),
                    w = canvas_width,
                    h = canvas_height,
                    dx = shadow.offset_x,
                    dy = shadow.offset_y,
                    sd = shadow.blur as f32 / 2.0,
                    color = shadow.color.rgb_hex(),
                    opacity = shadow.opacity * shadow.color.opacity(),
                );
                r#" filter="url(#shadow)""#
            }
            None => "",
        };

        let stroke = if settings.border_width > 0 {
            format!(
                r#" stroke="{}" stroke-opacity="{}" stroke-width="{}""#,
                settings.border_color.rgb_hex(),
                settings.border_color.opacity(),
                border
            )
        } else {
            String::from(r#" stroke="none""#)
        };

        let _ = write!(
            svg,
            r#"<rect x="{x}" y="{y}" width="{rw}" height="{rh}" rx="{r}" ry="{r}" fill="{fill}" fill-opacity="{fo}"{stroke}{filter}/>"#,
            x = margin + border / 2.0,
            y = margin + border / 2.0,
            rw = box_width - border,
            rh = box_height - border,
            r = settings.corner_radius,
            fill = settings.color.rgb_hex(),
            fo = settings.color.opacity(),
            stroke = stroke,
            filter = filter_attr,
        );
        svg.push_str("</svg>");
        svg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use imprint_core::models::{HexColor, ShadowSettings};

    fn image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 255])))
    }

    fn framed(padding: u32, border_width: u32, shadow: Option<ShadowSettings>) -> FrameSettings {
        FrameSettings {
            enabled: true,
            color: HexColor::WHITE,
            padding,
            border_width,
            border_color: HexColor::BLACK,
            corner_radius: 8,
            shadow,
        }
    }

    fn shadow(blur: u32, offset: i32) -> ShadowSettings {
        ShadowSettings {
            blur,
            offset_x: offset,
            offset_y: offset,
            opacity: 0.5,
            color: HexColor::BLACK,
        }
    }

    #[test]
    fn test_canvas_size_formula() {
        let settings = framed(20, 0, Some(shadow(10, 5)));
        assert_eq!(Frame::canvas_size(500, 500, &settings), (570, 570));

        let settings = framed(10, 4, None);
        assert_eq!(Frame::canvas_size(300, 200, &settings), (328, 228));
    }

    #[test]
    fn test_apply_matches_formula_and_places_image() {
        let settings = framed(20, 3, Some(shadow(10, -5)));
        let out = Frame::apply(&image(100, 60), &settings).unwrap();
        let (w, h) = Frame::canvas_size(100, 60, &settings);
        assert_eq!(out.dimensions(), (w, h));

        let rgba = out.to_rgba8();
        let offset = 15 + 3 + 20;
        assert_eq!(*rgba.get_pixel(offset, offset), Rgba([0, 0, 255, 255]));
        assert_eq!(*rgba.get_pixel(offset + 99, offset + 59), Rgba([0, 0, 255, 255]));
        // inside the padding the background color shows
        assert_eq!(*rgba.get_pixel(offset - 10, offset + 30), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_border_color_on_edge() {
        let settings = FrameSettings {
            corner_radius: 0,
            ..framed(5, 4, None)
        };
        let rgba = Frame::apply(&image(20, 20), &settings).unwrap().to_rgba8();
        assert_eq!(rgba.dimensions(), (38, 38));
        assert_eq!(*rgba.get_pixel(1, 19), Rgba([0, 0, 0, 255]));
        assert_eq!(*rgba.get_pixel(6, 19), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_svg_document_shape() {
        let svg = Frame::background_svg(10, 10, &framed(2, 2, Some(shadow(4, 2))));
        assert!(svg.contains("feDropShadow"));
        assert!(svg.contains(r#"stdDeviation="2""#));
        assert!(svg.contains(r#"stroke-width="2""#));

        let svg = Frame::background_svg(10, 10, &framed(2, 0, None));
        assert!(!svg.contains("filter"));
        assert!(svg.contains(r#"stroke="none""#));
    }
}
