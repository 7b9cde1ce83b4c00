//! Slice stacks: pre-sliced 2D contours stacked along Z

use super::ResourceId;

/// Contour point in the slice plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex2D {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

impl Vertex2D {
    /// Point at `(x, y)`
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A closed or open polyline over a slice's vertices
#[derive(Debug, Clone, PartialEq)]
pub struct SlicePolygon {
    /// Index of the first point
    pub start: usize,
    /// End vertex index of each segment, in order
    pub segments: Vec<usize>,
}

impl SlicePolygon {
    /// Polygon with no segments yet
    pub fn new(start: usize) -> Self {
        Self {
            start,
            segments: Vec::new(),
        }
    }

    /// All vertex indices the polygon touches
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.start).chain(self.segments.iter().copied())
    }
}

/// Contours valid from the previous slice's `ztop` up to this one
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    /// Upper bound of the layer
    pub ztop: f64,
    /// Points shared by this slice's polygons
    pub vertices: Vec<Vertex2D>,
    /// Closed or open contours
    pub polygons: Vec<SlicePolygon>,
}

impl Slice {
    /// Empty layer ending at `ztop`
    pub fn new(ztop: f64) -> Self {
        Self {
            ztop,
            vertices: Vec::new(),
            polygons: Vec::new(),
        }
    }
}

/// Reference to a slice stack in another model part
#[derive(Debug, Clone, PartialEq)]
pub struct SliceRef {
    /// Slice stack ID within that part
    pub slice_stack_id: ResourceId,
    /// Package path of the part
    pub slice_path: String,
}

/// Slice stack resource
#[derive(Debug, Clone, PartialEq)]
pub struct SliceStack {
    /// Lower bound of the first slice
    pub zbottom: f64,
    /// Slices in ascending `ztop` order
    pub slices: Vec<Slice>,
    /// Slices stored in other parts
    pub slice_refs: Vec<SliceRef>,
}

impl SliceStack {
    /// Stack with no slices starting at `zbottom`
    pub fn new(zbottom: f64) -> Self {
        Self {
            zbottom,
            slices: Vec::new(),
            slice_refs: Vec::new(),
        }
    }
}
