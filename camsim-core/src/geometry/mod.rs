//! Rigid transforms and rotation parameterisations

mod euler;
mod transform;

pub use euler::{EulerOrder, euler_from_rotation, rotation_from_euler};
pub use transform::Transform;

use crate::error::{Result, ShapeError};
use nalgebra::SMatrix;
use ndarray::{Array2, ArrayView2};

/// Check that a point batch is laid out as 3xN (x, y, z rows)
pub fn validate_point_batch(points: &ArrayView2<f64>) -> Result<()> {
    if points.nrows() != 3 {
        return Err(ShapeError::PointBatch(points.nrows()).into());
    }
    Ok(())
}

/// Copy a fixed-size nalgebra matrix into an ndarray array
pub fn matrix_to_array<const R: usize, const C: usize>(matrix: &SMatrix<f64, R, C>) -> Array2<f64> {
    Array2::from_shape_fn((R, C), |(r, c)| matrix[(r, c)])
}
