//! Affine transforms in 3MF form
//!
//! 3MF writes a transform as twelve numbers `m00 m01 m02 m10 m11 m12 m20 m21
//! m22 m30 m31 m32`, the rows of a 4×3 matrix applied to row vectors
//! `[x y z 1]`. Internally the matrix is kept in column-vector form as a
//! homogeneous [`Matrix4`].

use super::Vertex;
use crate::error::{Error, Result};
use nalgebra::{Matrix3, Matrix4, Vector4};
use std::fmt;
use std::str::FromStr;

/// Determinants smaller than this are treated as singular
pub const SINGULAR_EPSILON: f64 = 1e-10;

/// An affine transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Matrix4<f64>,
}

impl Transform {
    /// The identity transform
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Pure translation
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self::from_3mf([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, x, y, z])
    }

    /// Uniform or per-axis scale about the origin
    pub fn scale(x: f64, y: f64, z: f64) -> Self {
        Self::from_3mf([x, 0.0, 0.0, 0.0, y, 0.0, 0.0, 0.0, z, 0.0, 0.0, 0.0])
    }

    /// Build from the twelve 3MF values
    pub fn from_3mf(m: [f64; 12]) -> Self {
        #[rustfmt::skip]
        let matrix = Matrix4::new(
            m[0], m[3], m[6], m[9],
            m[1], m[4], m[7], m[10],
            m[2], m[5], m[8], m[11],
            0.0,  0.0,  0.0,  1.0,
        );
        Self { matrix }
    }

    /// The twelve 3MF values
    pub fn to_3mf(&self) -> [f64; 12] {
        let m = &self.matrix;
        [
            m[(0, 0)],
            m[(1, 0)],
            m[(2, 0)],
            m[(0, 1)],
            m[(1, 1)],
            m[(2, 1)],
            m[(0, 2)],
            m[(1, 2)],
            m[(2, 2)],
            m[(0, 3)],
            m[(1, 3)],
            m[(2, 3)],
        ]
    }

    /// Homogeneous matrix in column-vector form
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Whether this is exactly the identity
    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix4::identity()
    }

    /// Whether all twelve values are finite
    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }

    /// Determinant of the linear part
    pub fn determinant(&self) -> f64 {
        Matrix3::from_fn(|r, c| self.matrix[(r, c)]).determinant()
    }

    /// Whether the linear part collapses space
    pub fn is_singular(&self) -> bool {
        self.determinant().abs() < SINGULAR_EPSILON
    }

    /// `self` applied first, then `outer`
    pub fn then(&self, outer: &Transform) -> Transform {
        Transform {
            matrix: outer.matrix * self.matrix,
        }
    }

    /// Map a point
    pub fn apply(&self, v: &Vertex) -> Vertex {
        let p = self.matrix * Vector4::new(v.x, v.y, v.z, 1.0);
        Vertex::new(p.x, p.y, p.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.to_3mf();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

impl FromStr for Transform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split_whitespace()
            .map(|part| part.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let values: [f64; 12] = values.try_into().map_err(|v: Vec<f64>| {
            Error::schema(format!(
                "transform needs 12 values, found {}",
                v.len()
            ))
        })?;
        Ok(Self::from_3mf(values))
    }
}
