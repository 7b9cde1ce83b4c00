//! Geometry kernel
//!
//! An indexed triangle mesh. Vertices and triangles live in insertion order and
//! triangles refer to vertices by index only, so a mesh can be copied, merged
//! and offset without any fix-up beyond integer arithmetic.
//!
//! The kernel knows nothing about 3MF documents. Property references on
//! triangles are opaque integers that the resource graph interprets.
//!
//! Every mutating operation is all-or-nothing: inputs are checked before the
//! mesh is touched, so a failed call leaves the mesh exactly as it was.

mod builder;
mod transform;

pub use builder::MeshBuilder;
pub use transform::Transform;

use crate::error::{Error, Result};

/// A point in model space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Whether all three coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A triangle defined by three vertex indices
///
/// `pid` names a property group and `p1`..`p3` index into it per corner.
/// When only `p1` is present it applies to the whole triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: usize,
    /// Index of second vertex
    pub v2: usize,
    /// Index of third vertex
    pub v3: usize,
    /// Optional property group ID
    pub pid: Option<u32>,
    /// Optional property index for vertex 1
    pub p1: Option<u32>,
    /// Optional property index for vertex 2
    pub p2: Option<u32>,
    /// Optional property index for vertex 3
    pub p3: Option<u32>,
}

impl Triangle {
    /// Create a new triangle without properties
    pub fn new(v1: usize, v2: usize, v3: usize) -> Self {
        Self {
            v1,
            v2,
            v3,
            pid: None,
            p1: None,
            p2: None,
            p3: None,
        }
    }

    /// Create a triangle whose whole surface uses one entry of a property group
    pub fn with_property(v1: usize, v2: usize, v3: usize, pid: u32, pindex: u32) -> Self {
        Self {
            pid: Some(pid),
            p1: Some(pindex),
            ..Self::new(v1, v2, v3)
        }
    }

    /// The three vertex indices
    pub fn indices(&self) -> [usize; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// Whether two or more corners share a vertex index
    pub fn is_degenerate(&self) -> bool {
        self.v1 == self.v2 || self.v2 == self.v3 || self.v1 == self.v3
    }

    /// The property indices that are set, in corner order
    pub fn property_indices(&self) -> impl Iterator<Item = u32> + '_ {
        [self.p1, self.p2, self.p3].into_iter().flatten()
    }

    fn offset(&self, by: usize) -> Self {
        Self {
            v1: self.v1 + by,
            v2: self.v2 + by,
            v3: self.v3 + by,
            ..*self
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vertex,
    /// Maximum corner
    pub max: Vertex,
}

/// A triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new mesh with pre-allocated capacity
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
        }
    }

    /// Deep copy of `source`
    ///
    /// Fails with [`Error::InvalidParameter`] when `source` is absent.
    pub fn from_mesh(source: Option<&Mesh>) -> Result<Self> {
        let source = source.ok_or_else(|| {
            Error::InvalidParameter("cannot copy from an absent mesh".to_string())
        })?;
        Ok(source.clone())
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh has neither vertices nor triangles
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.triangles.is_empty()
    }

    /// All vertices in index order
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All triangles in index order
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Vertex at `index`
    pub fn vertex(&self, index: usize) -> Option<&Vertex> {
        self.vertices.get(index)
    }

    /// Triangle at `index`
    pub fn triangle(&self, index: usize) -> Option<&Triangle> {
        self.triangles.get(index)
    }

    /// Corner positions of the triangle at `index`
    pub fn triangle_corners(&self, index: usize) -> Option<[Vertex; 3]> {
        let t = self.triangles.get(index)?;
        Some([
            *self.vertices.get(t.v1)?,
            *self.vertices.get(t.v2)?,
            *self.vertices.get(t.v3)?,
        ])
    }

    /// Append a vertex and return its index
    ///
    /// Rejects NaN and infinite coordinates with [`Error::GeometryError`].
    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<usize> {
        if !vertex.is_finite() {
            return Err(Error::GeometryError(format!(
                "vertex ({}, {}, {}) has a non-finite coordinate",
                vertex.x, vertex.y, vertex.z
            )));
        }
        self.vertices.push(vertex);
        Ok(self.vertices.len() - 1)
    }

    /// Append a triangle over existing vertices and return its index
    pub fn add_triangle(&mut self, v1: usize, v2: usize, v3: usize) -> Result<usize> {
        self.push_triangle(Triangle::new(v1, v2, v3))
    }

    /// Append a triangle carrying property references
    ///
    /// Indices must be below the vertex count and pairwise distinct, otherwise
    /// the call fails with [`Error::InvalidTopology`].
    pub fn push_triangle(&mut self, triangle: Triangle) -> Result<usize> {
        self.check_bounds(&triangle)?;
        if triangle.is_degenerate() {
            return Err(Error::InvalidTopology(format!(
                "triangle ({}, {}, {}) repeats a vertex index",
                triangle.v1, triangle.v2, triangle.v3
            )));
        }
        self.triangles.push(triangle);
        Ok(self.triangles.len() - 1)
    }

    /// Append a triangle that may repeat a vertex index
    ///
    /// Bounds are still enforced. Files sometimes carry degenerate faces on
    /// purpose; readers keep them so validation can report them.
    pub fn push_triangle_allow_degenerate(&mut self, triangle: Triangle) -> Result<usize> {
        self.check_bounds(&triangle)?;
        self.triangles.push(triangle);
        Ok(self.triangles.len() - 1)
    }

    fn check_bounds(&self, triangle: &Triangle) -> Result<()> {
        let count = self.vertices.len();
        if let Some(bad) = triangle.indices().into_iter().find(|&i| i >= count) {
            return Err(Error::InvalidTopology(format!(
                "vertex index {} out of range (mesh has {} vertices)",
                bad, count
            )));
        }
        Ok(())
    }

    /// Append a deep copy of `other`
    ///
    /// `other`'s triangle indices are offset by this mesh's prior vertex
    /// count. Fails with [`Error::InvalidParameter`] when `other` is absent.
    pub fn merge_mesh(&mut self, other: Option<&Mesh>) -> Result<()> {
        let other = other.ok_or_else(|| {
            Error::InvalidParameter("cannot merge an absent mesh".to_string())
        })?;
        let offset = self.vertices.len();
        self.vertices.reserve(other.vertices.len());
        self.triangles.reserve(other.triangles.len());
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles
            .extend(other.triangles.iter().map(|t| t.offset(offset)));
        Ok(())
    }

    /// Append this mesh into `target`
    ///
    /// Same offset rule as [`Mesh::merge_mesh`], in the opposite direction.
    pub fn add_to_mesh(&self, target: Option<&mut Mesh>) -> Result<()> {
        let target = target.ok_or_else(|| {
            Error::InvalidParameter("cannot add to an absent mesh".to_string())
        })?;
        target.merge_mesh(Some(self))
    }

    /// A copy with every vertex mapped through `transform`
    pub fn transformed(&self, transform: &Transform) -> Result<Mesh> {
        let vertices = self
            .vertices
            .iter()
            .map(|v| {
                let moved = transform.apply(v);
                if moved.is_finite() {
                    Ok(moved)
                } else {
                    Err(Error::GeometryError(format!(
                        "transform {} maps ({}, {}, {}) to a non-finite point",
                        transform, v.x, v.y, v.z
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Mesh {
            vertices,
            triangles: self.triangles.clone(),
        })
    }

    /// Axis-aligned bounds, `None` for a mesh without vertices
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = *self.vertices.first()?;
        let bounds = self.vertices.iter().fold(
            BoundingBox {
                min: first,
                max: first,
            },
            |b, v| BoundingBox {
                min: Vertex::new(b.min.x.min(v.x), b.min.y.min(v.y), b.min.z.min(v.z)),
                max: Vertex::new(b.max.x.max(v.x), b.max.y.max(v.y), b.max.z.max(v.z)),
            },
        );
        Some(bounds)
    }
}
