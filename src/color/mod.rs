//! RGB colors, the epitope palette, and per-site color scales.

mod scale;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use scale::{build_scale, ColorScale, SiteColorMap, SiteColorScheme};

use crate::error::DmsVizError;

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// Fallback epitope colors, used in epitope order when a dataset gives
/// none (or an unparseable one).
pub const EPITOPE_PALETTE: [Color; 8] = [
    Color::rgb(0x00, 0x72, 0xb2),
    Color::rgb(0xcc, 0x79, 0xa7),
    Color::rgb(0x00, 0x9e, 0x73),
    Color::rgb(0xe6, 0x9f, 0x00),
    Color::rgb(0xd5, 0x5e, 0x00),
    Color::rgb(0x56, 0xb4, 0xe9),
    Color::rgb(0xf0, 0xe4, 0x42),
    Color::rgb(0x99, 0x99, 0x99),
];

impl Color {
    /// White.
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    /// Black.
    pub const BLACK: Self = Self::rgb(0x00, 0x00, 0x00);
    /// Default inert structure color (`#D3D3D3`).
    pub const LIGHT_GRAY: Self = Self::rgb(0xd3, 0xd3, 0xd3);

    /// Construct from channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// RGB complement, used for the negative end of diverging scales.
    #[must_use]
    pub const fn invert(self) -> Self {
        Self::rgb(255 - self.r, 255 - self.g, 255 - self.b)
    }

    /// Linear interpolation in RGB space; `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| {
            (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8
        };
        Self::rgb(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
        )
    }

    /// Lowercase `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Packed `0xRRGGBB`, the form structure renderers take.
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = DmsVizError;

    /// Accepts `#rgb`, `#rrggbb` (case-insensitive), `white`, and `black`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DmsVizError::InvalidOption {
            key: "color".to_owned(),
            value: s.to_owned(),
        };
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "white" => return Ok(Self::WHITE),
            "black" => return Ok(Self::BLACK),
            _ => {}
        }
        let hex = trimmed.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |digits: &str| {
            u8::from_str_radix(digits, 16).map_err(|_| invalid())
        };
        match hex.len() {
            3 => {
                let expand = |i: usize| {
                    let d = &hex[i..=i];
                    channel(&format!("{d}{d}"))
                };
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!("#0072B2".parse::<Color>().unwrap(), Color::rgb(0, 0x72, 0xb2));
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("black".parse::<Color>().unwrap(), Color::BLACK);
        assert!("0072B2".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gggggg".parse::<Color>().is_err());
    }

    #[test]
    fn invert_is_rgb_complement() {
        assert_eq!(Color::rgb(0, 0x72, 0xb2).invert(), Color::rgb(255, 0x8d, 0x4d));
        assert_eq!(Color::WHITE.invert(), Color::BLACK);
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let base = Color::rgb(200, 0, 100);
        assert_eq!(Color::WHITE.lerp(base, 0.0), Color::WHITE);
        assert_eq!(Color::WHITE.lerp(base, 1.0), base);
        assert_eq!(Color::BLACK.lerp(base, 0.5), Color::rgb(100, 0, 50));
    }

    #[test]
    fn hex_output_round_trips() {
        let color = Color::rgb(0xd3, 0x0a, 0xff);
        assert_eq!(color.to_hex(), "#d30aff");
        assert_eq!(color.to_hex().parse::<Color>().unwrap(), color);
        assert_eq!(color.to_u32(), 0x00d3_0aff);
    }
}
