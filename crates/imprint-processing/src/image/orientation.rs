use bytes::Bytes;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder};

use crate::error::PipelineError;

const TAG_ORIENTATION: u16 = 0x0112;

/// EXIF orientation handling: pixels are turned upright once at decode, and
/// the tag is reset wherever EXIF is carried into the output.
pub struct ImageOrientation;

impl ImageOrientation {
    /// Decode and rotate/flip per the EXIF orientation tag.
    pub fn decode_upright(mut decoder: impl ImageDecoder) -> Result<DynamicImage, PipelineError> {
        let orientation = decoder.orientation()?;
        let mut img = DynamicImage::from_decoder(decoder)?;

        if orientation != Orientation::NoTransforms {
            tracing::debug!(orientation = ?orientation, "Applying EXIF orientation");
            img.apply_orientation(orientation);
        }

        Ok(img)
    }

    /// Whether `orientation` swaps width and height.
    pub fn swaps_dimensions(orientation: Orientation) -> bool {
        matches!(
            orientation,
            Orientation::Rotate90
                | Orientation::Rotate270
                | Orientation::Rotate90FlipH
                | Orientation::Rotate270FlipH
        )
    }

    /// Copy of a raw TIFF EXIF block with IFD0 orientation set to 1 (upright).
    /// Blocks without the tag, or that do not parse, are returned unchanged.
    pub fn reset_exif_orientation(exif: &[u8]) -> Bytes {
        let mut data = exif.to_vec();
        if let Some((pos, little_endian)) = Self::orientation_value_offset(&data) {
            let upright = if little_endian {
                1u16.to_le_bytes()
            } else {
                1u16.to_be_bytes()
            };
            data[pos..pos + 2].copy_from_slice(&upright);
        }
        Bytes::from(data)
    }

    fn orientation_value_offset(tiff: &[u8]) -> Option<(usize, bool)> {
        let little_endian = match tiff.get(0..2)? {
            b"II" => true,
            b"MM" => false,
            _ => return None,
        };
        let read_u16 = |pos: usize| -> Option<u16> {
            let bytes: [u8; 2] = tiff.get(pos..pos + 2)?.try_into().ok()?;
            Some(if little_endian {
                u16::from_le_bytes(bytes)
            } else {
                u16::from_be_bytes(bytes)
            })
        };
        let read_u32 = |pos: usize| -> Option<u32> {
            let bytes: [u8; 4] = tiff.get(pos..pos + 4)?.try_into().ok()?;
            Some(if little_endian {
                u32::from_le_bytes(bytes)
            } else {
                u32::from_be_bytes(bytes)
            })
        };

        let ifd = read_u32(4)? as usize;
        let entries = read_u16(ifd)? as usize;
        (0..entries)
            .map(|i| ifd + 2 + i * 12)
            .find(|&entry| read_u16(entry) == Some(TAG_ORIENTATION))
            .map(|entry| entry + 8)
            .filter(|&pos| pos + 2 <= tiff.len())
            .map(|pos| (pos, little_endian))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Big-endian TIFF block holding only IFD0 orientation = `value`.
    pub(crate) fn exif_with_orientation(value: u16) -> Vec<u8> {
        let mut tiff = b"MM\0*\0\0\0\x08".to_vec();
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&TAG_ORIENTATION.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&value.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&[0, 0, 0, 0]);
        tiff
    }

    #[test]
    fn test_reset_orientation_tag() {
        let reset = ImageOrientation::reset_exif_orientation(&exif_with_orientation(6));
        assert_eq!(reset.as_ref(), exif_with_orientation(1).as_slice());
        assert_eq!(Orientation::from_exif_chunk(&reset), Some(Orientation::NoTransforms));
    }

    #[test]
    fn test_reset_leaves_other_blocks_alone() {
        let no_tag = b"MM\0*\0\0\0\x08\0\0".to_vec();
        assert_eq!(ImageOrientation::reset_exif_orientation(&no_tag).as_ref(), no_tag.as_slice());
        assert_eq!(ImageOrientation::reset_exif_orientation(b"junk").as_ref(), b"junk");
    }

    #[test]
    fn test_swaps_dimensions() {
        assert!(ImageOrientation::swaps_dimensions(Orientation::Rotate90));
        assert!(ImageOrientation::swaps_dimensions(Orientation::Rotate270FlipH));
        assert!(!ImageOrientation::swaps_dimensions(Orientation::Rotate180));
        assert!(!ImageOrientation::swaps_dimensions(Orientation::NoTransforms));
    }
}
