use log::trace;
use nalgebra::{Matrix3, Matrix4, Quaternion, UnitQuaternion, Vector3};
use ndarray::{Array2, ArrayView1, ArrayView2, s};

use super::{matrix_to_array, validate_point_batch};
use crate::error::{CameraError, Result, ShapeError};

// Determinants below this are treated as singular on inversion
const SINGULAR_EPS: f64 = 1e-12;

/// 4x4 homogeneous transform.
///
/// The bottom row is `[0, 0, 0, 1]` for every transform built through the
/// rigid constructors. Only [`Transform::transpose`] and raw-matrix
/// construction can produce other bottom rows.
///
/// Every operation returns a new value; a `Transform` is never modified
/// in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    matrix: Matrix4<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wrap an existing 4x4 matrix
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Build from a raw array, which must be exactly 4x4
    pub fn from_array(matrix: ArrayView2<f64>) -> Result<Self> {
        let (rows, cols) = matrix.dim();
        if (rows, cols) != (4, 4) {
            return Err(ShapeError::Matrix {
                expected: "4x4",
                rows,
                cols,
            }
            .into());
        }
        Ok(Self {
            matrix: Matrix4::from_fn(|r, c| matrix[(r, c)]),
        })
    }

    /// Build from a rotation block and a translation column
    pub fn from_parts(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Self { matrix }
    }

    /// Build from an optional 3x3 rotation and an optional length-3 translation.
    ///
    /// A missing rotation is the identity, a missing translation is zero.
    pub fn from_rotate_and_translate(
        rotation: Option<ArrayView2<f64>>,
        translation: Option<ArrayView1<f64>>,
    ) -> Result<Self> {
        let rotation = match rotation {
            Some(r) => {
                let (rows, cols) = r.dim();
                if (rows, cols) != (3, 3) {
                    return Err(ShapeError::Matrix {
                        expected: "3x3",
                        rows,
                        cols,
                    }
                    .into());
                }
                Matrix3::from_fn(|i, j| r[(i, j)])
            }
            None => Matrix3::identity(),
        };

        let translation = match translation {
            Some(t) => {
                if t.len() != 3 {
                    return Err(ShapeError::Vector {
                        expected: 3,
                        actual: t.len(),
                    }
                    .into());
                }
                Vector3::new(t[0], t[1], t[2])
            }
            None => Vector3::zeros(),
        };

        Ok(Self::from_parts(&rotation, &translation))
    }

    /// Pure translation from an `[x, y, z]` slice
    pub fn from_translation(translation: &[f64]) -> Result<Self> {
        if translation.len() != 3 {
            return Err(ShapeError::Vector {
                expected: 3,
                actual: translation.len(),
            }
            .into());
        }
        Ok(Self::from_parts(
            &Matrix3::identity(),
            &Vector3::new(translation[0], translation[1], translation[2]),
        ))
    }

    /// Pure rotation from a quaternion given as `[x, y, z, w]`.
    ///
    /// The quaternion is normalised; a zero quaternion is rejected.
    pub fn from_quaternion_xyzw(quaternion: &[f64]) -> Result<Self> {
        if quaternion.len() != 4 {
            return Err(ShapeError::Vector {
                expected: 4,
                actual: quaternion.len(),
            }
            .into());
        }
        let q = Quaternion::new(quaternion[3], quaternion[0], quaternion[1], quaternion[2]);
        let norm = q.norm();
        if !norm.is_finite() || norm < SINGULAR_EPS {
            return Err(CameraError::InvalidInput(format!(
                "quaternion norm {norm} cannot be normalised"
            )));
        }
        let rotation = UnitQuaternion::from_quaternion(q).to_rotation_matrix();
        Ok(Self::from_parts(rotation.matrix(), &Vector3::zeros()))
    }

    /// Matrix product `self * other`: apply `other` first, then `self`
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform {
            matrix: self.matrix * other.matrix,
        }
    }

    /// General matrix inverse
    pub fn invert(&self) -> Result<Transform> {
        let det = self.matrix.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPS {
            return Err(CameraError::Numerical(format!(
                "transform is singular (determinant {det:e})"
            )));
        }
        self.matrix
            .try_inverse()
            .map(Transform::from_matrix)
            .ok_or_else(|| CameraError::Numerical("transform is singular".to_string()))
    }

    /// Raw matrix transpose. Not a rigid-transform operation.
    pub fn transpose(&self) -> Transform {
        Transform {
            matrix: self.matrix.transpose(),
        }
    }

    /// Inverse of a rigid transform: `[R^T | -R^T t]`.
    ///
    /// Assumes the rotation block is orthonormal; no general inverse is taken.
    pub fn rigid_inverse(&self) -> Transform {
        let rotation_t = self.rotation().transpose();
        let translation = -(rotation_t * self.translation());
        Transform::from_parts(&rotation_t, &translation)
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    pub fn into_matrix(self) -> Matrix4<f64> {
        self.matrix
    }

    /// Upper-left 3x3 block
    pub fn rotation(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Upper-right 3x1 column
    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Matrix as a 4x4 ndarray, for consumers that work on arrays
    pub fn to_array(&self) -> Array2<f64> {
        matrix_to_array(&self.matrix)
    }

    /// Apply to a 3xN point batch, returning 4xN homogeneous points
    pub fn apply_to_points(&self, points: ArrayView2<f64>) -> Result<Array2<f64>> {
        validate_point_batch(&points)?;
        let n = points.ncols();
        let mut homogeneous = Array2::<f64>::ones((4, n));
        homogeneous.slice_mut(s![..3, ..]).assign(&points);
        trace!("applying transform to {n} points");
        Ok(self.to_array().dot(&homogeneous))
    }
}
