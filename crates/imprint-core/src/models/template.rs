//! Template models: a named, versioned bundle of processing settings.
//!
//! Every numeric field of [`TemplateSettings`] carries its bounds as a
//! `validator` rule, so a settings document is checked once when it enters the
//! system and stages can read it without re-validating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::color::HexColor;

pub const MAX_DIMENSION: u32 = 8000;

/// Template model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Starts at 1 and increases on every update.
    pub version: i32,
    pub settings: TemplateSettings,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn new(request: CreateTemplateRequest) -> Self {
        let now = Utc::now();
        Template {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            description: request.description,
            version: 1,
            settings: request.settings,
            is_active: request.is_active,
            is_default: request.is_default,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update and bump the version.
    pub fn apply_update(&mut self, update: UpdateTemplateRequest) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(settings) = update.settings {
            self.settings = settings;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(is_default) = update.is_default {
            self.is_default = is_default;
        }
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// Request DTO for creating a template
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    /// Unique name (alphanumeric, spaces, hyphens, underscores; 1-100 chars)
    #[validate(custom(function = "validate_template_name"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(nested)]
    pub settings: TemplateSettings,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
}

/// Request DTO for updating a template. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTemplateRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_template_name"))]
    pub name: Option<String>,
    /// Use null to clear
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    #[validate(nested)]
    pub settings: Option<TemplateSettings>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

pub fn validate_template_name(name: &str) -> Result<(), ValidationError> {
    let reject = |message: &'static str| {
        Err(ValidationError::new("template_name").with_message(message.into()))
    };
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return reject("Template name cannot be empty");
    }
    if trimmed.chars().count() > 100 {
        return reject("Template name cannot exceed 100 characters");
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ' ')
    {
        return reject(
            "Template name can only contain alphanumeric characters, spaces, hyphens, and underscores",
        );
    }
    // Names are looked up alongside ids, so keep them visually distinct
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return reject("Template name cannot start with a number");
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

/// Full parameter document of a template, one section per stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct TemplateSettings {
    #[validate(nested)]
    pub geometry: GeometrySettings,
    #[serde(default)]
    #[validate(nested)]
    pub tone: ToneSettings,
    #[serde(default)]
    #[validate(nested)]
    pub frame: FrameSettings,
    #[serde(default)]
    #[validate(nested)]
    pub watermark: WatermarkSettings,
    #[serde(default)]
    #[validate(nested)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale to cover the box, center-crop the overflow
    #[default]
    Cover,
    /// Scale to fit inside the box and letterbox to the exact size
    Contain,
    /// Stretch to the exact size
    Fill,
    /// Scale to fit inside the box, no padding
    Inside,
    /// Scale to cover the box, no cropping
    Outside,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct GeometrySettings {
    #[validate(range(min = 1, max = 8000))]
    pub width: u32,
    #[validate(range(min = 1, max = 8000))]
    pub height: u32,
    #[serde(default)]
    pub fit: FitMode,
    /// Letterbox fill for `contain`; transparent when absent
    #[serde(default)]
    pub background: Option<HexColor>,
    #[serde(default)]
    #[validate(nested)]
    pub crop: Option<CropRect>,
}

/// Region of the original image, applied before resizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    #[validate(range(min = 1))]
    pub width: u32,
    #[validate(range(min = 1))]
    pub height: u32,
}

impl CropRect {
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.x as u64 + self.width as u64;
        let bottom = self.y as u64 + self.height as u64;
        right <= width as u64 && bottom <= height as u64
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
pub struct ToneSettings {
    #[serde(default)]
    #[validate(range(min = -100.0, max = 100.0))]
    pub brightness: Option<f32>,
    #[serde(default)]
    #[validate(range(min = -100.0, max = 100.0))]
    pub contrast: Option<f32>,
    #[serde(default)]
    #[validate(range(min = -100.0, max = 100.0))]
    pub saturation: Option<f32>,
    /// Degrees
    #[serde(default)]
    #[validate(range(min = 0.0, max = 360.0))]
    pub hue: Option<f32>,
    /// Gaussian sigma
    #[serde(default)]
    #[validate(range(min = 0.3, max = 1000.0))]
    pub blur: Option<f32>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub sharpen: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct FrameSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_frame_color")]
    pub color: HexColor,
    #[serde(default)]
    #[validate(range(max = 200))]
    pub padding: u32,
    #[serde(default)]
    #[validate(range(max = 50))]
    pub border_width: u32,
    #[serde(default = "default_border_color")]
    pub border_color: HexColor,
    #[serde(default)]
    #[validate(range(max = 100))]
    pub corner_radius: u32,
    #[serde(default)]
    #[validate(nested)]
    pub shadow: Option<ShadowSettings>,
}

impl Default for FrameSettings {
    fn default() -> Self {
        FrameSettings {
            enabled: false,
            color: default_frame_color(),
            padding: 0,
            border_width: 0,
            border_color: default_border_color(),
            corner_radius: 0,
            shadow: None,
        }
    }
}

fn default_frame_color() -> HexColor {
    HexColor::WHITE
}

fn default_border_color() -> HexColor {
    HexColor::BLACK
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct ShadowSettings {
    #[serde(default)]
    #[validate(range(max = 100))]
    pub blur: u32,
    #[serde(default)]
    #[validate(range(min = -100, max = 100))]
    pub offset_x: i32,
    #[serde(default)]
    #[validate(range(min = -100, max = 100))]
    pub offset_y: i32,
    #[serde(default = "default_shadow_opacity")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub opacity: f32,
    #[serde(default = "default_border_color")]
    pub color: HexColor,
}

impl ShadowSettings {
    /// Extra canvas needed on every side so the shadow is not clipped.
    pub fn margin(&self) -> u32 {
        self.offset_x.unsigned_abs().max(self.offset_y.unsigned_abs()) + self.blur
    }
}

fn default_shadow_opacity() -> f32 {
    0.5
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkAnchor {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct WatermarkSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub text: String,
    #[serde(default)]
    pub anchor: WatermarkAnchor,
    #[serde(default = "default_watermark_opacity")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub opacity: f32,
    /// Derived from the image size when absent
    #[serde(default)]
    #[validate(range(min = 8, max = 200))]
    pub font_size: Option<u32>,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        WatermarkSettings {
            enabled: false,
            text: String::new(),
            anchor: WatermarkAnchor::default(),
            opacity: default_watermark_opacity(),
            font_size: None,
        }
    }
}

fn default_watermark_opacity() -> f32 {
    0.5
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Avif => "image/avif",
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OutputFormat::Jpeg => write!(f, "jpeg"),
            OutputFormat::Png => write!(f, "png"),
            OutputFormat::Webp => write!(f, "webp"),
            OutputFormat::Avif => write!(f, "avif"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "avif" => Ok(OutputFormat::Avif),
            _ => Err(anyhow::anyhow!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_quality")]
    #[validate(range(min = 1, max = 100))]
    pub quality: u8,
    #[serde(default)]
    pub progressive: bool,
    #[serde(default = "default_true")]
    pub strip_metadata: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            format: OutputFormat::default(),
            quality: default_quality(),
            progressive: false,
            strip_metadata: true,
        }
    }
}

fn default_quality() -> u8 {
    80
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings_json() -> serde_json::Value {
        json!({
            "geometry": { "width": 1080, "height": 1080, "fit": "cover" },
            "tone": { "contrast": 10.0 },
            "watermark": { "enabled": true, "text": "imprint", "anchor": "top-left" },
            "output": { "format": "webp", "quality": 85 }
        })
    }

    #[test]
    fn test_settings_defaults() {
        let settings: TemplateSettings = serde_json::from_value(settings_json()).unwrap();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.geometry.fit, FitMode::Cover);
        assert!(!settings.frame.enabled);
        assert_eq!(settings.frame.color, HexColor::WHITE);
        assert_eq!(settings.watermark.anchor, WatermarkAnchor::TopLeft);
        assert_eq!(settings.output.format, OutputFormat::Webp);
        assert!(settings.output.strip_metadata);
    }

    #[test]
    fn test_out_of_range_fields_rejected() {
        let mut settings: TemplateSettings = serde_json::from_value(settings_json()).unwrap();
        settings.geometry.width = MAX_DIMENSION + 1;
        assert!(settings.validate().is_err());

        let mut settings: TemplateSettings = serde_json::from_value(settings_json()).unwrap();
        settings.tone.blur = Some(0.1);
        assert!(settings.validate().is_err());

        let mut settings: TemplateSettings = serde_json::from_value(settings_json()).unwrap();
        settings.frame.shadow = Some(ShadowSettings {
            blur: 4,
            offset_x: 101,
            offset_y: 0,
            opacity: 0.5,
            color: HexColor::BLACK,
        });
        assert!(settings.validate().is_err());

        let mut settings: TemplateSettings = serde_json::from_value(settings_json()).unwrap();
        settings.output.quality = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_unknown_enum_value_rejected() {
        let mut value = settings_json();
        value["geometry"]["fit"] = json!("stretch");
        assert!(serde_json::from_value::<TemplateSettings>(value).is_err());
    }

    #[test]
    fn test_validate_template_name() {
        assert!(validate_template_name("instagram-square").is_ok());
        assert!(validate_template_name("Blog Hero_2").is_ok());
        assert!(validate_template_name("   ").is_err());
        assert!(validate_template_name("9lives").is_err());
        assert!(validate_template_name("bad/name").is_err());
        assert!(validate_template_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_apply_update_bumps_version() {
        let settings: TemplateSettings = serde_json::from_value(settings_json()).unwrap();
        let mut template = Template::new(CreateTemplateRequest {
            name: "square".to_string(),
            description: None,
            settings,
            is_active: true,
            is_default: false,
        });
        assert_eq!(template.version, 1);

        template.apply_update(UpdateTemplateRequest {
            description: Some(Some("1:1 social".to_string())),
            ..Default::default()
        });
        assert_eq!(template.version, 2);
        assert_eq!(template.description.as_deref(), Some("1:1 social"));
        assert_eq!(template.name, "square");
    }

    #[test]
    fn test_crop_bounds() {
        let crop = CropRect {
            x: 0,
            y: 0,
            width: 5000,
            height: 5000,
        };
        assert!(!crop.fits_within(800, 600));
        let crop = CropRect {
            x: 100,
            y: 100,
            width: 700,
            height: 500,
        };
        assert!(crop.fits_within(800, 600));
    }

    #[test]
    fn test_shadow_margin() {
        let shadow = ShadowSettings {
            blur: 10,
            offset_x: -4,
            offset_y: 6,
            opacity: 0.4,
            color: HexColor::BLACK,
        };
        assert_eq!(shadow.margin(), 16);
    }
}
