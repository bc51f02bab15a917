//! Test fixtures: encoded images of a given size.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, 90)
        .encode_image(&gradient(width, height))
        .expect("jpeg fixture");
    buffer
}

pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Vec::new();
    gradient(width, height)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("png fixture");
    buffer
}
