use image::{imageops, DynamicImage, Rgba, RgbaImage};
use imprint_core::models::ToneSettings;

/// Luminance weights shared by the saturation and hue matrices
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Sigma of the blur behind the unsharp mask
const SHARPEN_SIGMA: f32 = 1.0;

type Matrix = [[f32; 3]; 3];

const IDENTITY: Matrix = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Color adjustments applied in a fixed order: color matrix (brightness,
/// saturation, hue), contrast, blur, sharpen.
pub struct Tone;

impl Tone {
    /// Whether any configured adjustment would change the image
    pub fn is_identity(settings: &ToneSettings) -> bool {
        Self::color_matrix(settings).is_none()
            && Self::contrast_factor(settings).is_none()
            && settings.blur.is_none()
            && Self::sharpen_gain(settings).is_none()
    }

    pub fn apply(img: DynamicImage, settings: &ToneSettings) -> DynamicImage {
        if Self::is_identity(settings) {
            return img;
        }

        let mut rgba = img.to_rgba8();

        if let Some(matrix) = Self::color_matrix(settings) {
            Self::apply_matrix(&mut rgba, &matrix);
        }

        if let Some(factor) = Self::contrast_factor(settings) {
            Self::adjust_contrast(&mut rgba, factor);
        }

        if let Some(sigma) = settings.blur {
            rgba = imageops::blur(&rgba, sigma);
        }

        if let Some(gain) = Self::sharpen_gain(settings) {
            rgba = Self::unsharp_mask(&rgba, gain);
        }

        tracing::debug!(?settings, "Tone applied");
        DynamicImage::ImageRgba8(rgba)
    }

    /// Combined brightness · saturation · hue matrix, `None` when all three are identity.
    fn color_matrix(settings: &ToneSettings) -> Option<Matrix> {
        let brightness = settings.brightness.filter(|v| *v != 0.0);
        let saturation = settings.saturation.filter(|v| *v != 0.0);
        let hue = settings.hue.filter(|v| *v != 0.0 && *v != 360.0);

        if brightness.is_none() && saturation.is_none() && hue.is_none() {
            return None;
        }

        let mut matrix = IDENTITY;
        if let Some(degrees) = hue {
            matrix = multiply(&hue_matrix(degrees), &matrix);
        }
        if let Some(value) = saturation {
            matrix = multiply(&saturation_matrix(1.0 + value / 100.0), &matrix);
        }
        if let Some(value) = brightness {
            let b = 1.0 + value / 100.0;
            matrix = multiply(&[[b, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, b]], &matrix);
        }
        Some(matrix)
    }

    fn contrast_factor(settings: &ToneSettings) -> Option<f32> {
        settings
            .contrast
            .filter(|v| *v != 0.0)
            .map(|v| 1.0 + v / 100.0)
    }

    fn sharpen_gain(settings: &ToneSettings) -> Option<f32> {
        settings
            .sharpen
            .filter(|v| *v > 0.0)
            .map(|v| v / 100.0 * 2.0)
    }

    fn apply_matrix(rgba: &mut RgbaImage, m: &Matrix) {
        for pixel in rgba.pixels_mut() {
            let Rgba([r, g, b, a]) = *pixel;
            let (r, g, b) = (r as f32, g as f32, b as f32);
            *pixel = Rgba([
                clamp_channel(m[0][0] * r + m[0][1] * g + m[0][2] * b),
                clamp_channel(m[1][0] * r + m[1][1] * g + m[1][2] * b),
                clamp_channel(m[2][0] * r + m[2][1] * g + m[2][2] * b),
                a,
            ]);
        }
    }

    /// `out = a·in + b` with `b = 128·(1 - a)`
    pub fn adjust_contrast(rgba: &mut RgbaImage, factor: f32) {
        let intercept = 128.0 * (1.0 - factor);
        for pixel in rgba.pixels_mut() {
            let Rgba([r, g, b, a]) = *pixel;
            *pixel = Rgba([
                clamp_channel(r as f32 * factor + intercept),
                clamp_channel(g as f32 * factor + intercept),
                clamp_channel(b as f32 * factor + intercept),
                a,
            ]);
        }
    }

    /// `out = in + gain·(in - blur(in))` on the color channels
    fn unsharp_mask(rgba: &RgbaImage, gain: f32) -> RgbaImage {
        let blurred = imageops::blur(rgba, SHARPEN_SIGMA);
        let mut sharpened = rgba.clone();

        for (pixel, soft) in sharpened.pixels_mut().zip(blurred.pixels()) {
            for c in 0..3 {
                let value = pixel[c] as f32;
                pixel[c] = clamp_channel(value + gain * (value - soft[c] as f32));
            }
        }
        sharpened
    }
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn saturation_matrix(s: f32) -> Matrix {
    let [lr, lg, lb] = LUMA;
    [
        [lr + (1.0 - lr) * s, lg - lg * s, lb - lb * s],
        [lr - lr * s, lg + (1.0 - lg) * s, lb - lb * s],
        [lr - lr * s, lg - lg * s, lb + (1.0 - lb) * s],
    ]
}

/// Luminance-preserving hue rotation
fn hue_matrix(degrees: f32) -> Matrix {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let [lr, lg, lb] = LUMA;
    [
        [
            lr + cos * (1.0 - lr) - sin * lr,
            lg - cos * lg - sin * lg,
            lb - cos * lb + sin * (1.0 - lb),
        ],
        [
            lr - cos * lr + sin * 0.143,
            lg + cos * (1.0 - lg) + sin * 0.140,
            lb - cos * lb - sin * 0.283,
        ],
        [
            lr - cos * lr - sin * (1.0 - lr),
            lg - cos * lg + sin * lg,
            lb + cos * (1.0 - lb) + sin * lb,
        ],
    ]
}
