use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// RGBA color parsed from `#rgb`, `#rrggbb` or `#rrggbbaa`.
///
/// Malformed values are rejected while deserializing, so stages never see an
/// unparseable color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    pub const WHITE: HexColor = HexColor::rgb(255, 255, 255);
    pub const BLACK: HexColor = HexColor::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        HexColor { r, g, b, a: 255 }
    }

    pub fn parse(input: &str) -> Result<Self, String> {
        let hex = input.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(format!("invalid color: {input}"));
        }
        let channel = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|_| format!("invalid color: {input}"))
        };
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
                Ok(HexColor::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(HexColor::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            8 => Ok(HexColor {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
                a: channel(&hex[6..8])?,
            }),
            _ => Err(format!("invalid color: {input}")),
        }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// `#rrggbb` without alpha, for SVG paint attributes.
    pub fn rgb_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Alpha as a 0.0-1.0 fraction.
    pub fn opacity(self) -> f32 {
        self.a as f32 / 255.0
    }
}

impl Display for HexColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.a == 255 {
            write!(f, "{}", self.rgb_hex())
        } else {
            write!(f, "{}{:02x}", self.rgb_hex(), self.a)
        }
    }
}

impl FromStr for HexColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HexColor::parse(s)
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HexColor::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}
