use log::debug;
use nalgebra::Matrix3;
use ndarray::{Array1, ArrayView2, s};

use super::{
    Camera, CameraParameters, Projection, filter_visible_points, select_mask, validate_image_size,
};
use crate::error::{CameraError, Result};
use crate::geometry::{Transform, matrix_to_array};

/// Intrinsics of a simple pinhole camera with square pixels
#[derive(Debug, Clone, PartialEq)]
pub struct PinholeCameraParameters {
    focal_length: f64,
    principal_point: (f64, f64),
    image_size: (usize, usize),
}

impl PinholeCameraParameters {
    pub fn new(
        focal_length: f64,
        principal_point: (f64, f64),
        image_size: (usize, usize),
    ) -> Result<Self> {
        validate_image_size(image_size)?;
        if !focal_length.is_finite()
            || !principal_point.0.is_finite()
            || !principal_point.1.is_finite()
        {
            return Err(CameraError::InvalidInput(
                "pinhole intrinsics must be finite".to_string(),
            ));
        }
        Ok(Self {
            focal_length,
            principal_point,
            image_size,
        })
    }

    /// Get focal length (shared by x and y)
    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Get principal point
    pub fn principal_point(&self) -> (f64, f64) {
        self.principal_point
    }

    fn camera_matrix(&self) -> Matrix3<f64> {
        let f = self.focal_length;
        let (cx, cy) = self.principal_point;
        Matrix3::new(f, 0.0, cx, 0.0, f, cy, 0.0, 0.0, 1.0)
    }
}

impl CameraParameters for PinholeCameraParameters {
    fn intrinsic_matrix(&self) -> Result<Matrix3<f64>> {
        Ok(self.camera_matrix())
    }

    fn image_size(&self) -> (usize, usize) {
        self.image_size
    }
}

/// Pinhole camera: linear projection through the intrinsic matrix
#[derive(Debug, Clone)]
pub struct PinholeCamera {
    parameters: PinholeCameraParameters,
    pose: Transform,
}

impl PinholeCamera {
    /// Create a camera at the world origin
    pub fn new(parameters: PinholeCameraParameters) -> Self {
        Self::with_pose(parameters, Transform::identity())
    }

    /// Create a camera with an initial camera-in-world pose
    pub fn with_pose(parameters: PinholeCameraParameters, pose: Transform) -> Self {
        Self { parameters, pose }
    }

    pub fn pinhole_parameters(&self) -> &PinholeCameraParameters {
        &self.parameters
    }
}

impl Camera for PinholeCamera {
    fn parameters(&self) -> &dyn CameraParameters {
        &self.parameters
    }

    fn pose(&self) -> &Transform {
        &self.pose
    }

    fn set_pose(&mut self, pose: Transform) {
        self.pose = pose;
    }

    fn world_to_camera(&self, points: ArrayView2<f64>) -> Result<Projection> {
        let points_camera = self.pose.rigid_inverse().apply_to_points(points)?;

        // Points on or behind the lens plane are dropped
        let in_front: Array1<bool> = points_camera.row(2).mapv(|z| z > 0.0);
        let front = select_mask(points_camera.slice(s![..3, ..]), in_front.view());

        let depth = front.row(2).to_owned();
        let normalized = &front / &depth;

        let k = matrix_to_array(&self.parameters.camera_matrix());
        let image = k.dot(&normalized);

        let (width, height) = self.parameters.image_size;
        let (pixels, inside_image) = filter_visible_points(image.view(), width, height)?;

        debug!(
            "pinhole projection: {} points, {} in front, {} visible",
            points.ncols(),
            front.ncols(),
            pixels.ncols()
        );

        Ok(Projection {
            pixels,
            in_front,
            invalid: Array1::from_elem(inside_image.len(), false),
            inside_image,
        })
    }

    fn copy(&self) -> Box<dyn Camera> {
        Box::new(self.clone())
    }
}
