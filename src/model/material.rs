//! Material and texture resources

use super::ResourceId;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Texture tiling behaviour outside \[0,1\]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileStyle {
    /// Repeat the texture
    #[default]
    Wrap,
    /// Mirror the texture
    Mirror,
    /// Clamp to edge pixels
    Clamp,
    /// No sampling outside \[0,1\]
    None,
}

impl TileStyle {
    /// The attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            TileStyle::Wrap => "wrap",
            TileStyle::Mirror => "mirror",
            TileStyle::Clamp => "clamp",
            TileStyle::None => "none",
        }
    }
}

impl FromStr for TileStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wrap" => Ok(TileStyle::Wrap),
            "mirror" => Ok(TileStyle::Mirror),
            "clamp" => Ok(TileStyle::Clamp),
            "none" => Ok(TileStyle::None),
            _ => Err(Error::schema(format!("unknown tile style '{}'", s))),
        }
    }
}

/// Texture filter mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Auto select best quality
    #[default]
    Auto,
    /// Bilinear interpolation
    Linear,
    /// Nearest neighbor
    Nearest,
}

impl FilterMode {
    /// The attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Auto => "auto",
            FilterMode::Linear => "linear",
            FilterMode::Nearest => "nearest",
        }
    }
}

impl FromStr for FilterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(FilterMode::Auto),
            "linear" => Ok(FilterMode::Linear),
            "nearest" => Ok(FilterMode::Nearest),
            _ => Err(Error::schema(format!("unknown filter mode '{}'", s))),
        }
    }
}

/// sRGB color with alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha, 255 is opaque
    pub a: u8,
}

impl Color {
    /// Opaque color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color with alpha
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// `#RRGGBB`, or `#RRGGBBAA` when not opaque
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::schema(format!("invalid sRGB color '{}'", s));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if hex.len() == 8 { channel(6)? } else { 255 },
        })
    }
}

/// Individual base material within a base material group
#[derive(Debug, Clone, PartialEq)]
pub struct BaseMaterial {
    /// Material name
    pub name: String,
    /// Display color
    pub display_color: Color,
}

impl BaseMaterial {
    /// Create a new base material
    pub fn new(name: impl Into<String>, display_color: Color) -> Self {
        Self {
            name: name.into(),
            display_color,
        }
    }
}

/// Group of base materials
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseMaterialGroup {
    /// Materials, addressed by position
    pub materials: Vec<BaseMaterial>,
}

/// Group of colors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorGroup {
    /// Colors, addressed by position
    pub colors: Vec<Color>,
}

/// A 2D texture stored as a package part
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2D {
    /// Package path of the image
    pub path: String,
    /// Image MIME type (`image/png` or `image/jpeg`)
    pub content_type: String,
    /// Tile style for u axis
    pub tile_style_u: TileStyle,
    /// Tile style for v axis
    pub tile_style_v: TileStyle,
    /// Texture filter mode
    pub filter: FilterMode,
}

impl Texture2D {
    /// Create a new texture with default tiling and filtering
    pub fn new(path: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
            tile_style_u: TileStyle::Wrap,
            tile_style_v: TileStyle::Wrap,
            filter: FilterMode::Auto,
        }
    }
}

/// Texture 2D coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tex2Coord {
    /// U coordinate (horizontal, from left)
    pub u: f64,
    /// V coordinate (vertical, from bottom)
    pub v: f64,
}

impl Tex2Coord {
    /// Create a new texture coordinate
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

/// Texture coordinates into a [`Texture2D`]
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2DGroup {
    /// The texture sampled by these coordinates
    pub texture_id: ResourceId,
    /// Coordinates, addressed by position
    pub coords: Vec<Tex2Coord>,
}

impl Texture2DGroup {
    /// Create an empty group over a texture
    pub fn new(texture_id: ResourceId) -> Self {
        Self {
            texture_id,
            coords: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse() {
        assert_eq!("#FF8000".parse::<Color>().unwrap(), Color::rgb(255, 128, 0));
        assert_eq!(
            "#ff800080".parse::<Color>().unwrap(),
            Color::rgba(255, 128, 0, 128)
        );
        assert!("FF8000".parse::<Color>().is_err());
        assert!("#FF80".parse::<Color>().is_err());
        assert!("#GG8000".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_display() {
        assert_eq!(Color::rgb(1, 2, 3).to_string(), "#010203");
        assert_eq!(Color::rgba(1, 2, 3, 4).to_string(), "#01020304");
    }

    #[test]
    fn test_enum_attribute_values() {
        assert_eq!("mirror".parse::<TileStyle>().unwrap(), TileStyle::Mirror);
        assert_eq!(TileStyle::Clamp.as_str(), "clamp");
        assert_eq!("nearest".parse::<FilterMode>().unwrap(), FilterMode::Nearest);
        assert!("Linear".parse::<FilterMode>().is_err());
    }
}
