//! Volumetric extension types
//!
//! A [`Image3D`] is a stack of 2D image sheets stored as package parts. An
//! [`Image3DChannelSelector`] picks one named channel of such an image and
//! remaps its sampled values into a destination channel.

use super::material::{FilterMode, TileStyle};
use super::ResourceId;
use crate::error::{Error, Result};

/// Channel names an image declares when none are given explicitly
pub const DEFAULT_CHANNELS: [&str; 4] = ["R", "G", "B", "A"];

/// One sheet of an image stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSheet {
    /// Package path of the 2D image
    pub path: String,
}

impl ImageSheet {
    /// Create a new sheet
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Ordered sheets sharing one pixel grid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageStack {
    /// Pixel rows per sheet
    pub row_count: u32,
    /// Pixel columns per sheet
    pub column_count: u32,
    /// Sheets from bottom to top
    pub sheets: Vec<ImageSheet>,
}

/// Volumetric image resource
#[derive(Debug, Clone, PartialEq)]
pub struct Image3D {
    /// Optional name
    pub name: Option<String>,
    /// The image data
    pub stack: ImageStack,
    /// Declared channel names, matched case-sensitively by selectors
    pub channels: Vec<String>,
    /// Unmodeled child elements, re-emitted after the image stack
    pub pass_through: Vec<String>,
}

impl Image3D {
    /// Image with the default `R G B A` channels
    pub fn new(stack: ImageStack) -> Self {
        Self {
            name: None,
            stack,
            channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            pass_through: Vec::new(),
        }
    }

    /// Whether a channel of that exact name is declared
    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c == name)
    }

    /// Whether the declared channels are the defaults
    pub fn has_default_channels(&self) -> bool {
        self.channels.iter().map(String::as_str).eq(DEFAULT_CHANNELS)
    }
}

/// Maps a channel of an [`Image3D`] onto a destination channel
///
/// The setters only store values. Channel names are checked against the
/// image when the document is validated, and an inverted value range is
/// reported there as well.
#[derive(Debug, Clone, PartialEq)]
pub struct Image3DChannelSelector {
    image_id: ResourceId,
    source_channel: String,
    destination_channel: String,
    filter: FilterMode,
    tile_styles: (TileStyle, TileStyle, TileStyle),
    value_range: (f64, f64),
}

fn check_channel_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidParameter(
            "channel name must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl Image3DChannelSelector {
    /// Selector with linear filtering, wrap tiling and the range \[0,1\]
    pub fn new(
        image_id: ResourceId,
        source_channel: impl Into<String>,
        destination_channel: impl Into<String>,
    ) -> Result<Self> {
        let source_channel = source_channel.into();
        let destination_channel = destination_channel.into();
        check_channel_name(&source_channel)?;
        check_channel_name(&destination_channel)?;
        Ok(Self {
            image_id,
            source_channel,
            destination_channel,
            filter: FilterMode::Linear,
            tile_styles: (TileStyle::Wrap, TileStyle::Wrap, TileStyle::Wrap),
            value_range: (0.0, 1.0),
        })
    }

    /// The referenced image
    pub fn image_id(&self) -> ResourceId {
        self.image_id
    }

    pub(crate) fn set_image_id(&mut self, image_id: ResourceId) {
        self.image_id = image_id;
    }

    /// Channel read from the image
    pub fn source_channel(&self) -> &str {
        &self.source_channel
    }

    /// Set the channel read from the image
    pub fn set_source_channel(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        check_channel_name(&name)?;
        self.source_channel = name;
        Ok(())
    }

    /// Channel written to
    pub fn destination_channel(&self) -> &str {
        &self.destination_channel
    }

    /// Set the channel written to
    pub fn set_destination_channel(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        check_channel_name(&name)?;
        self.destination_channel = name;
        Ok(())
    }

    /// Sampling filter
    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    /// Set the sampling filter
    pub fn set_filter(&mut self, filter: FilterMode) {
        self.filter = filter;
    }

    /// Tile styles along u, v and w
    pub fn tile_styles(&self) -> (TileStyle, TileStyle, TileStyle) {
        self.tile_styles
    }

    /// Set the tile styles along u, v and w
    pub fn set_tile_styles(&mut self, u: TileStyle, v: TileStyle, w: TileStyle) {
        self.tile_styles = (u, v, w);
    }

    /// Remap range as `(min, max)`
    pub fn value_range(&self) -> (f64, f64) {
        self.value_range
    }

    /// Set the remap range; any pair is stored as given
    pub fn set_value_range(&mut self, min: f64, max: f64) {
        self.value_range = (min, max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_selector_defaults() {
        let selector = Image3DChannelSelector::new(4, "R", "V").unwrap();
        assert_eq!(selector.image_id(), 4);
        assert_eq!(selector.filter(), FilterMode::Linear);
        assert_eq!(
            selector.tile_styles(),
            (TileStyle::Wrap, TileStyle::Wrap, TileStyle::Wrap)
        );
        assert_eq!(selector.value_range(), (0.0, 1.0));
    }

    #[test]
    fn test_setters_store_values_unchecked() {
        let mut selector = Image3DChannelSelector::new(1, "R", "R").unwrap();
        selector.set_source_channel("NoSuchChannel").unwrap();
        selector.set_value_range(5.0, 2.0);
        selector.set_tile_styles(TileStyle::Clamp, TileStyle::Mirror, TileStyle::None);
        selector.set_filter(FilterMode::Nearest);

        assert_eq!(selector.source_channel(), "NoSuchChannel");
        assert_eq!(selector.value_range(), (5.0, 2.0));
        assert_eq!(selector.tile_styles().1, TileStyle::Mirror);
        assert_eq!(selector.filter(), FilterMode::Nearest);
    }

    #[test]
    fn test_empty_channel_name_rejected() {
        let mut selector = Image3DChannelSelector::new(1, "R", "R").unwrap();
        let err = selector.set_destination_channel("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_eq!(selector.destination_channel(), "R");
        assert!(Image3DChannelSelector::new(1, "", "R").is_err());
    }

    #[test]
    fn test_channel_lookup_is_case_sensitive() {
        let image = Image3D::new(ImageStack::default());
        assert!(image.has_channel("G"));
        assert!(!image.has_channel("g"));
        assert!(image.has_default_channels());
    }
}
