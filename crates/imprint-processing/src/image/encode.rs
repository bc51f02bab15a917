use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, RgbaImage};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::{ImageEXIF, ImageICC};
use imprint_core::models::{OutputFormat, OutputSettings};

use super::orientation::ImageOrientation;
use crate::error::PipelineError;

/// Speed/size trade-off for AVIF (0 slowest .. 10 fastest)
const AVIF_SPEED: u8 = 6;

/// Encoded output of the last stage
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Bytes,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Final encoding stage
pub struct Encoder;

impl Encoder {
    /// Encode `img` per `output`. With `strip_metadata` off, EXIF and ICC
    /// blocks of `source` are carried over where the container supports it.
    pub fn encode(
        img: &DynamicImage,
        output: &OutputSettings,
        source: Option<&[u8]>,
    ) -> Result<EncodedImage, PipelineError> {
        let (width, height) = img.dimensions();
        let quality = output.quality.clamp(1, 100);

        let data = match output.format {
            OutputFormat::Jpeg if output.progressive => Self::encode_jpeg_progressive(img, quality)?,
            OutputFormat::Jpeg => Self::encode_jpeg_baseline(img, quality)?,
            OutputFormat::Png => {
                if output.progressive {
                    tracing::debug!("PNG interlacing is not supported by the encoder, ignoring");
                }
                Self::encode_png(img, quality)?
            }
            OutputFormat::Webp => Self::encode_webp(img, quality),
            OutputFormat::Avif => Self::encode_avif(img, quality)?,
        };

        let data = match source {
            Some(source) if !output.strip_metadata => {
                Self::copy_metadata(source, data, output.format)
            }
            _ => data,
        };

        tracing::debug!(
            format = %output.format,
            quality,
            width,
            height,
            size_bytes = data.len(),
            "Encoded image"
        );

        Ok(EncodedImage {
            data,
            format: output.format,
            width,
            height,
        })
    }

    /// Progressive JPEG with optimized Huffman tables and scans via mozjpeg
    fn encode_jpeg_progressive(img: &DynamicImage, quality: u8) -> Result<Bytes, PipelineError> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();
        let fail = |e: std::io::Error| PipelineError::encode(OutputFormat::Jpeg, e);

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);

        let mut comp = comp.start_compress(Vec::new()).map_err(fail)?;
        comp.write_scanlines(&rgb_img).map_err(fail)?;
        let jpeg_data = comp.finish().map_err(fail)?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Baseline JPEG via mozjpeg with optimized Huffman tables
    fn encode_jpeg_baseline(img: &DynamicImage, quality: u8) -> Result<Bytes, PipelineError> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();
        let fail = |e: std::io::Error| PipelineError::encode(OutputFormat::Jpeg, e);

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        // The default mozjpeg profile is progressive; start from the baseline one.
        comp.set_fastest_defaults();
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new()).map_err(fail)?;
        comp.write_scanlines(&rgb_img).map_err(fail)?;
        let jpeg_data = comp.finish().map_err(fail)?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Maximum compression with adaptive filtering. Below quality 100 the
    /// color levels are reduced first, which shrinks the deflate stream.
    fn encode_png(img: &DynamicImage, quality: u8) -> Result<Bytes, PipelineError> {
        let mut rgba = img.to_rgba8();
        if quality < 100 {
            Self::posterize(&mut rgba, quality);
        }

        let (width, height) = rgba.dimensions();
        let mut buffer = Vec::new();
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive)
            .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(|e| PipelineError::encode(OutputFormat::Png, e))?;
        Ok(Bytes::from(buffer))
    }

    /// Number of levels kept per color channel for a PNG quality
    pub fn posterize_levels(quality: u8) -> u32 {
        (quality as u32 * 256 / 100).clamp(2, 256)
    }

    fn posterize(rgba: &mut RgbaImage, quality: u8) {
        let levels = Self::posterize_levels(quality);
        if levels >= 256 {
            return;
        }
        let step = 255.0 / (levels - 1) as f32;
        for pixel in rgba.pixels_mut() {
            for c in 0..3 {
                let level = (pixel[c] as f32 / step).round();
                pixel[c] = (level * step).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    fn encode_webp(img: &DynamicImage, quality: u8) -> Bytes {
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(quality as f32);

        Bytes::copy_from_slice(&webp_data)
    }

    fn encode_avif(img: &DynamicImage, quality: u8) -> Result<Bytes, PipelineError> {
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        let pixels: Vec<rgb::RGBA8> = rgba_img
            .as_raw()
            .chunks_exact(4)
            .map(|chunk| rgb::RGBA8::new(chunk[0], chunk[1], chunk[2], chunk[3]))
            .collect();
        let img_buf = ravif::Img::new(pixels.as_slice(), width as usize, height as usize);

        let avif_data = ravif::Encoder::new()
            .with_quality(quality as f32)
            .with_speed(AVIF_SPEED)
            .encode_rgba(img_buf)
            .map_err(|e| PipelineError::encode(OutputFormat::Avif, e))?;

        Ok(Bytes::from(avif_data.avif_file))
    }

    /// EXIF and ICC profile of an encoded source image, if any
    pub fn read_metadata(source: &[u8]) -> (Option<Bytes>, Option<Bytes>) {
        let source = Bytes::copy_from_slice(source);
        if let Ok(jpeg) = Jpeg::from_bytes(source.clone()) {
            return (jpeg.exif(), jpeg.icc_profile());
        }
        if let Ok(png) = Png::from_bytes(source.clone()) {
            return (png.exif(), png.icc_profile());
        }
        if let Ok(webp) = WebP::from_bytes(source) {
            return (webp.exif(), webp.icc_profile());
        }
        (None, None)
    }

    /// Pixels are already upright, so a carried-over orientation tag is reset.
    fn copy_metadata(source: &[u8], encoded: Bytes, format: OutputFormat) -> Bytes {
        let (exif, icc) = Self::read_metadata(source);
        let exif = exif.map(|exif| ImageOrientation::reset_exif_orientation(&exif));
        if exif.is_none() && icc.is_none() {
            return encoded;
        }

        let copied = match format {
            OutputFormat::Jpeg => Jpeg::from_bytes(encoded.clone()).ok().map(|mut jpeg| {
                jpeg.set_exif(exif);
                jpeg.set_icc_profile(icc);
                jpeg.encoder().bytes()
            }),
            OutputFormat::Png => Png::from_bytes(encoded.clone()).ok().map(|mut png| {
                png.set_exif(exif);
                png.set_icc_profile(icc);
                png.encoder().bytes()
            }),
            OutputFormat::Webp => WebP::from_bytes(encoded.clone()).ok().map(|mut webp| {
                webp.set_exif(exif);
                webp.set_icc_profile(icc);
                webp.encoder().bytes()
            }),
            OutputFormat::Avif => {
                tracing::debug!("Metadata passthrough is not supported for AVIF output");
                None
            }
        };

        copied.unwrap_or(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::orientation::tests::exif_with_orientation;
    use image::{ImageFormat, Rgba};

    fn create_test_image() -> DynamicImage {
        let img = RgbaImage::from_fn(48, 32, |x, y| Rgba([(x * 5) as u8, (y * 7) as u8, 90, 255]));
        DynamicImage::ImageRgba8(img)
    }

    fn output(format: OutputFormat) -> OutputSettings {
        OutputSettings {
            format,
            quality: 80,
            progressive: false,
            strip_metadata: true,
        }
    }

    fn jpeg_with_exif() -> Vec<u8> {
        let encoded = Encoder::encode(&create_test_image(), &output(OutputFormat::Jpeg), None)
            .unwrap()
            .data;
        let mut jpeg = Jpeg::from_bytes(encoded).unwrap();
        jpeg.set_exif(Some(Bytes::from_static(b"MM\0*\0\0\0\x08\0\0")));
        jpeg.encoder().bytes().to_vec()
    }

    #[test]
    fn test_every_format_decodes_back() {
        for (format, image_format) in [
            (OutputFormat::Jpeg, ImageFormat::Jpeg),
            (OutputFormat::Png, ImageFormat::Png),
            (OutputFormat::Webp, ImageFormat::WebP),
        ] {
            let encoded = Encoder::encode(&create_test_image(), &output(format), None).unwrap();
            assert_eq!(encoded.format, format);
            assert_eq!(image::guess_format(&encoded.data).unwrap(), image_format);
            let decoded = image::load_from_memory(&encoded.data).unwrap();
            assert_eq!(decoded.dimensions(), (48, 32));
        }
    }

    fn has_marker(data: &[u8], marker: u8) -> bool {
        data.windows(2).any(|w| w == [0xFF, marker])
    }

    #[test]
    fn test_progressive_jpeg() {
        let mut settings = output(OutputFormat::Jpeg);
        settings.progressive = true;
        let encoded = Encoder::encode(&create_test_image(), &settings, None).unwrap();
        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);
        assert!(has_marker(&encoded.data, 0xC2));
        assert_eq!((encoded.width, encoded.height), (48, 32));
    }

    #[test]
    fn test_baseline_jpeg() {
        let encoded = Encoder::encode(&create_test_image(), &output(OutputFormat::Jpeg), None).unwrap();
        assert!(has_marker(&encoded.data, 0xC0));
        assert!(!has_marker(&encoded.data, 0xC2));
        let decoded = image::load_from_memory(&encoded.data).unwrap();
        assert_eq!(decoded.dimensions(), (48, 32));
    }

    #[test]
    fn test_carried_exif_is_upright() {
        let encoded = Encoder::encode(&create_test_image(), &output(OutputFormat::Jpeg), None)
            .unwrap()
            .data;
        let mut jpeg = Jpeg::from_bytes(encoded).unwrap();
        jpeg.set_exif(Some(Bytes::from(exif_with_orientation(6))));
        let source = jpeg.encoder().bytes();

        let mut settings = output(OutputFormat::Jpeg);
        settings.strip_metadata = false;
        let out = Encoder::encode(&create_test_image(), &settings, Some(&source)).unwrap();
        let exif = Encoder::read_metadata(&out.data).0.unwrap();
        assert_eq!(exif.as_ref(), exif_with_orientation(1).as_slice());
    }

    #[test]
    fn test_avif_signature() {
        let encoded = Encoder::encode(&create_test_image(), &output(OutputFormat::Avif), None).unwrap();
        assert_eq!(&encoded.data[4..8], b"ftyp");
        assert!(encoded.size_bytes() > 0);
    }

    #[test]
    fn test_strip_metadata_is_idempotent() {
        let source = jpeg_with_exif();
        assert!(Encoder::read_metadata(&source).0.is_some());

        let settings = output(OutputFormat::Jpeg);
        let once = Encoder::encode(&image::load_from_memory(&source).unwrap(), &settings, Some(&source))
            .unwrap()
            .data;
        assert_eq!(Encoder::read_metadata(&once), (None, None));

        let twice = Encoder::encode(&image::load_from_memory(&once).unwrap(), &settings, Some(&once))
            .unwrap()
            .data;
        assert_eq!(Encoder::read_metadata(&twice), (None, None));
    }

    #[test]
    fn test_metadata_kept_when_not_stripping() {
        let source = jpeg_with_exif();
        let mut settings = output(OutputFormat::Jpeg);
        settings.strip_metadata = false;
        let encoded = Encoder::encode(&create_test_image(), &settings, Some(&source)).unwrap();
        assert!(Encoder::read_metadata(&encoded.data).0.is_some());
    }

    #[test]
    fn test_posterize_levels() {
        assert_eq!(Encoder::posterize_levels(100), 256);
        assert_eq!(Encoder::posterize_levels(50), 128);
        assert_eq!(Encoder::posterize_levels(1), 2);
    }
}
