//! Face-at-a-time mesh assembly

use super::{Mesh, Triangle, Vertex};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Accumulates faces given as corner positions
///
/// Corners with bit-identical coordinates share one vertex (`-0.0` and `0.0`
/// count as the same). The finished geometry is committed into a target mesh
/// through [`Mesh::merge_mesh`], so it lands after the target's own vertices.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    mesh: Mesh,
    lookup: HashMap<[u64; 3], usize>,
}

fn key(v: &Vertex) -> [u64; 3] {
    // +0.0 folds the two zero encodings together
    [
        (v.x + 0.0).to_bits(),
        (v.y + 0.0).to_bits(),
        (v.z + 0.0).to_bits(),
    ]
}

impl MeshBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct vertices collected so far
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    /// Number of faces collected so far
    pub fn face_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    /// Add a face and return its index
    ///
    /// Fails without changing the builder when a corner is not finite or when
    /// two corners coincide.
    pub fn add_face(&mut self, p1: Vertex, p2: Vertex, p3: Vertex) -> Result<usize> {
        let corners = [p1, p2, p3];
        if let Some(bad) = corners.iter().find(|v| !v.is_finite()) {
            return Err(Error::GeometryError(format!(
                "face corner ({}, {}, {}) is not finite",
                bad.x, bad.y, bad.z
            )));
        }
        let keys = corners.map(|v| key(&v));
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[0] == keys[2] {
            return Err(Error::InvalidTopology(
                "face has coincident corners".to_string(),
            ));
        }

        let mut indices = [0usize; 3];
        for (slot, (corner, k)) in indices.iter_mut().zip(corners.iter().zip(keys)) {
            *slot = match self.lookup.get(&k) {
                Some(&index) => index,
                None => {
                    let index = self.mesh.add_vertex(*corner)?;
                    self.lookup.insert(k, index);
                    index
                }
            };
        }
        self.mesh
            .push_triangle(Triangle::new(indices[0], indices[1], indices[2]))
    }

    /// The mesh built so far
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Append the collected geometry to `target`
    pub fn add_to_mesh(&self, target: Option<&mut Mesh>) -> Result<()> {
        self.mesh.add_to_mesh(target)
    }

    /// Consume the builder and return the collected mesh
    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }
}
