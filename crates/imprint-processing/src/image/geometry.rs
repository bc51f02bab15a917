use image::imageops::FilterType;
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use imprint_core::models::{CropRect, FitMode, GeometrySettings, HexColor};

use crate::error::PipelineError;

/// Crop and resize operations
pub struct Geometry;

impl Geometry {
    /// Manual crop, then resize into the target box with the configured fit mode.
    pub fn apply(img: DynamicImage, settings: &GeometrySettings) -> Result<DynamicImage, PipelineError> {
        let img = match settings.crop {
            Some(rect) => Self::crop(&img, &rect)?,
            None => img,
        };

        let (target_width, target_height) = (settings.width, settings.height);
        if target_width == 0 || target_height == 0 {
            return Err(PipelineError::Geometry(format!(
                "Target box {}x{} is empty",
                target_width, target_height
            )));
        }

        let (orig_width, orig_height) = img.dimensions();
        let resized = match settings.fit {
            FitMode::Cover => {
                let filter = Self::select_filter(orig_width, orig_height, target_width, target_height);
                img.resize_to_fill(target_width, target_height, filter)
            }
            FitMode::Contain => {
                Self::resize_with_fill(&img, target_width, target_height, settings.background)
            }
            FitMode::Fill => Self::resize_image(&img, target_width, target_height),
            FitMode::Inside | FitMode::Outside => {
                let (width, height) = Self::fit_dimensions(
                    orig_width,
                    orig_height,
                    target_width,
                    target_height,
                    settings.fit,
                );
                Self::resize_image(&img, width, height)
            }
        };

        tracing::debug!(
            from_width = orig_width,
            from_height = orig_height,
            to_width = resized.width(),
            to_height = resized.height(),
            fit = ?settings.fit,
            "Geometry applied"
        );

        Ok(resized)
    }

    /// Crop a region of the original. Regions leaving the image are rejected.
    pub fn crop(img: &DynamicImage, rect: &CropRect) -> Result<DynamicImage, PipelineError> {
        let (width, height) = img.dimensions();
        if rect.width == 0 || rect.height == 0 || !rect.fits_within(width, height) {
            return Err(PipelineError::InvalidRegion {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                image_width: width,
                image_height: height,
            });
        }
        Ok(img.crop_imm(rect.x, rect.y, rect.width, rect.height))
    }

    /// Aspect-preserving size for `inside` (fit within) and `outside` (cover
    /// without cropping). Other modes return the box itself.
    pub fn fit_dimensions(
        orig_width: u32,
        orig_height: u32,
        target_width: u32,
        target_height: u32,
        fit: FitMode,
    ) -> (u32, u32) {
        let scale_width = target_width as f64 / orig_width as f64;
        let scale_height = target_height as f64 / orig_height as f64;
        let scale = match fit {
            FitMode::Inside => scale_width.min(scale_height),
            FitMode::Outside => scale_width.max(scale_height),
            _ => return (target_width, target_height),
        };

        let width = ((orig_width as f64 * scale).round() as u32).max(1);
        let height = ((orig_height as f64 * scale).round() as u32).max(1);
        (width, height)
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        if (orig_width, orig_height) == (width, height) {
            return img.clone();
        }
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    /// Fit inside the box and letterbox onto a canvas of exactly the box size.
    /// The canvas is transparent unless a background color is given.
    pub fn resize_with_fill(
        img: &DynamicImage,
        target_width: u32,
        target_height: u32,
        background: Option<HexColor>,
    ) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (scaled_width, scaled_height) = Self::fit_dimensions(
            orig_width,
            orig_height,
            target_width,
            target_height,
            FitMode::Inside,
        );
        let scaled_width = scaled_width.min(target_width);
        let scaled_height = scaled_height.min(target_height);

        let bg_color = background.map(|c| Rgba(c.to_rgba())).unwrap_or(Rgba([0, 0, 0, 0]));
        let mut canvas = RgbaImage::from_pixel(target_width, target_height, bg_color);

        let resized = Self::resize_image(img, scaled_width, scaled_height).to_rgba8();
        let x_offset = (target_width - scaled_width) / 2;
        let y_offset = (target_height - scaled_height) / 2;
        imageops::overlay(&mut canvas, &resized, x_offset as i64, y_offset as i64);

        DynamicImage::ImageRgba8(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([200, 100, 50, 255]),
        ))
    }

    fn settings(width: u32, height: u32, fit: FitMode) -> GeometrySettings {
        GeometrySettings {
            width,
            height,
            fit,
            background: None,
            crop: None,
        }
    }

    #[test]
    fn test_exact_box_modes() {
        for fit in [FitMode::Cover, FitMode::Contain, FitMode::Fill] {
            for (w, h) in [(1920, 1080), (300, 900), (50, 50)] {
                let out = Geometry::apply(create_test_image(w, h), &settings(200, 120, fit)).unwrap();
                assert_eq!(out.dimensions(), (200, 120), "{:?} from {}x{}", fit, w, h);
            }
        }
    }

    #[test]
    fn test_inside_fits_and_keeps_aspect() {
        for (w, h) in [(1920, 1080), (300, 900), (77, 31)] {
            let out = Geometry::apply(create_test_image(w, h), &settings(200, 120, FitMode::Inside))
                .unwrap();
            let (ow, oh) = out.dimensions();
            assert!(ow <= 200 && oh <= 120);
            assert!(ow == 200 || oh == 120);
            let ratio = w as f64 / h as f64;
            let out_ratio = ow as f64 / oh as f64;
            assert!((ratio - out_ratio).abs() / ratio < 0.02, "{}x{} -> {}x{}", w, h, ow, oh);
        }
    }

    #[test]
    fn test_outside_covers_and_keeps_aspect() {
        for (w, h) in [(1920, 1080), (300, 900), (77, 31)] {
            let out = Geometry::apply(create_test_image(w, h), &settings(200, 120, FitMode::Outside))
                .unwrap();
            let (ow, oh) = out.dimensions();
            assert!(ow >= 200 && oh >= 120);
            assert!(ow == 200 || oh == 120);
            let ratio = w as f64 / h as f64;
            let out_ratio = ow as f64 / oh as f64;
            assert!((ratio - out_ratio).abs() / ratio < 0.02);
        }
    }

    #[test]
    fn test_enlargement_allowed() {
        let out = Geometry::apply(create_test_image(10, 10), &settings(100, 100, FitMode::Inside))
            .unwrap();
        assert_eq!(out.dimensions(), (100, 100));
    }

    #[test]
    fn test_contain_letterbox_background() {
        let mut s = settings(100, 100, FitMode::Contain);
        s.background = Some(HexColor::rgb(0, 255, 0));
        let out = Geometry::apply(create_test_image(200, 100), &s).unwrap().to_rgba8();
        assert_eq!(*out.get_pixel(50, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(*out.get_pixel(50, 50), Rgba([200, 100, 50, 255]));

        s.background = None;
        let out = Geometry::apply(create_test_image(200, 100), &s).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(50, 0)[3], 0);
    }

    #[test]
    fn test_crop_before_resize() {
        let mut s = settings(50, 50, FitMode::Fill);
        s.crop = Some(CropRect {
            x: 10,
            y: 10,
            width: 100,
            height: 100,
        });
        let out = Geometry::apply(create_test_image(200, 200), &s).unwrap();
        assert_eq!(out.dimensions(), (50, 50));
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let rect = CropRect {
            x: 0,
            y: 0,
            width: 5000,
            height: 5000,
        };
        let err = Geometry::crop(&create_test_image(800, 600), &rect).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidRegion {
                image_width: 800,
                image_height: 600,
                ..
            }
        ));
    }

    #[test]
    fn test_select_filter() {
        assert_eq!(Geometry::select_filter(1000, 1000, 100, 100), FilterType::Triangle);
        assert_eq!(Geometry::select_filter(1000, 1000, 600, 600), FilterType::CatmullRom);
        assert_eq!(Geometry::select_filter(100, 100, 400, 400), FilterType::Lanczos3);
    }
}
