//! Camera models and projections

mod omnidirectional;
mod pinhole;

pub use omnidirectional::{OmnidirectionalCamera, OmnidirectionalCameraParameters};
pub use pinhole::{PinholeCamera, PinholeCameraParameters};

use nalgebra::{Matrix3, Matrix4, Vector3};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{CameraError, Result, ShapeError};
use crate::geometry::{EulerOrder, Transform, euler_from_rotation};

/// Intrinsic description of a camera model, independent of pose
pub trait CameraParameters: std::fmt::Debug + Send + Sync {
    /// 3x3 matrix mapping normalised camera coordinates to pixels.
    /// Fails for models whose pixel mapping is not linear.
    fn intrinsic_matrix(&self) -> Result<Matrix3<f64>>;

    /// Get image dimensions (width, height) in pixels
    fn image_size(&self) -> (usize, usize);
}

/// Generic camera: intrinsics, a pose, and world-to-image projection.
///
/// The pose is the camera's transform in the world frame. The extrinsic
/// matrix (world to camera) is derived from it on every call.
pub trait Camera: Send + Sync {
    fn parameters(&self) -> &dyn CameraParameters;

    /// Camera-in-world transform
    fn pose(&self) -> &Transform;

    fn set_pose(&mut self, pose: Transform);

    /// Project a 3xN batch of world points into the image
    fn world_to_camera(&self, points: ArrayView2<f64>) -> Result<Projection>;

    /// Independent camera with the same parameters and a copy of the pose
    fn copy(&self) -> Box<dyn Camera>;

    /// World-to-camera transform: `[R^T | -R^T t]` of the pose
    fn extrinsic_matrix(&self) -> Matrix4<f64> {
        self.pose().rigid_inverse().into_matrix()
    }

    /// Extrinsic rotation as Euler angles in degrees, with the extrinsic translation
    fn extrinsic_as_euler(&self, order: EulerOrder) -> ([f64; 3], Vector3<f64>) {
        let extrinsic = self.pose().rigid_inverse();
        let angles = euler_from_rotation(&extrinsic.rotation(), order)
            .map(f64::to_degrees);
        (angles, extrinsic.translation())
    }

    fn intrinsic_matrix(&self) -> Result<Matrix3<f64>> {
        self.parameters().intrinsic_matrix()
    }

    fn image_size(&self) -> (usize, usize) {
        self.parameters().image_size()
    }

    /// Move the camera in the world frame: `pose <- transform * pose`
    fn transform(&mut self, transform: &Transform) {
        let pose = transform.compose(self.pose());
        log::trace!("camera pose updated to {:?}", pose.matrix());
        self.set_pose(pose);
    }
}

/// Result of projecting a batch of N world points.
///
/// The masks are staged: `in_front` is aligned with the input points,
/// `inside_image` and `invalid` with the points that passed `in_front`,
/// and `pixels` holds the points that passed both.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// 2xM pixel coordinates of the visible points
    pub pixels: Array2<f64>,
    pub in_front: Array1<bool>,
    pub inside_image: Array1<bool>,
    /// Points whose pixel was forced to the (0, 0) sentinel by the model.
    /// Always false for the pinhole model.
    pub invalid: Array1<bool>,
}

impl Projection {
    /// Number of points that survived both masks
    pub fn visible_count(&self) -> usize {
        self.pixels.ncols()
    }

    /// Indices into the input batch of the points that survived both masks
    pub fn visible_indices(&self) -> Vec<usize> {
        let front: Vec<usize> = mask_indices(self.in_front.view());
        mask_indices(self.inside_image.view())
            .into_iter()
            .map(|i| front[i])
            .collect()
    }

    /// Apply both masks, in projection order, to a KxN per-point attribute array
    pub fn select_columns(&self, attributes: ArrayView2<f64>) -> Result<Array2<f64>> {
        if attributes.ncols() != self.in_front.len() {
            return Err(ShapeError::Columns {
                expected: self.in_front.len(),
                actual: attributes.ncols(),
            }
            .into());
        }
        let front = select_mask(attributes, self.in_front.view());
        Ok(select_mask(front.view(), self.inside_image.view()))
    }
}

/// Keep pixel columns with `0 <= x <= width` and `0 <= y <= height`.
///
/// Bounds are inclusive at both ends. Returns the kept 2xM columns and the
/// per-column mask.
pub fn filter_visible_points(
    pixels: ArrayView2<f64>,
    width: usize,
    height: usize,
) -> Result<(Array2<f64>, Array1<bool>)> {
    if pixels.nrows() < 2 {
        return Err(ShapeError::Matrix {
            expected: "2xN",
            rows: pixels.nrows(),
            cols: pixels.ncols(),
        }
        .into());
    }
    let (w, h) = (width as f64, height as f64);
    let mask: Array1<bool> = pixels
        .axis_iter(Axis(1))
        .map(|p| p[0] >= 0.0 && p[0] <= w && p[1] >= 0.0 && p[1] <= h)
        .collect();
    let kept = select_mask(pixels.slice(ndarray::s![..2, ..]), mask.view());
    Ok((kept, mask))
}

pub(crate) fn validate_image_size(image_size: (usize, usize)) -> Result<()> {
    if image_size.0 == 0 || image_size.1 == 0 {
        return Err(CameraError::InvalidInput(format!(
            "image size must be positive, got {}x{}",
            image_size.0, image_size.1
        )));
    }
    Ok(())
}

fn mask_indices(mask: ArrayView1<bool>) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &keep)| keep.then_some(i))
        .collect()
}

/// Columns of `array` where `mask` is true
pub(crate) fn select_mask(array: ArrayView2<f64>, mask: ArrayView1<bool>) -> Array2<f64> {
    let indices = mask_indices(mask);
    if indices.is_empty() {
        return Array2::zeros((array.nrows(), 0));
    }
    array.select(Axis(1), &indices)
}

/// Entries of `values` where `mask` is true
pub(crate) fn select_mask_1d<T: Clone>(values: ArrayView1<T>, mask: ArrayView1<bool>) -> Array1<T> {
    values
        .iter()
        .zip(mask.iter())
        .filter_map(|(v, &keep)| keep.then(|| v.clone()))
        .collect()
}
