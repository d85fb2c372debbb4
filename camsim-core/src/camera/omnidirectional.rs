use std::f64::consts::FRAC_PI_2;

use log::debug;
use nalgebra::Matrix3;
use ndarray::{Array1, Array2, ArrayView2};
use rayon::prelude::*;

use super::{
    Camera, CameraParameters, Projection, filter_visible_points, select_mask, select_mask_1d,
    validate_image_size,
};
use crate::error::{CameraError, Result};
use crate::geometry::Transform;

// Below this many points per task the mapping stays on one thread
const MIN_POINTS_PER_TASK: usize = 4096;

/// OCamCalib omnidirectional camera intrinsics.
///
/// `world_to_cam_params[i]` is the coefficient of `theta^i` in the radial
/// mapping. The affine triple `(c, d, e)` models sensor misalignment.
#[derive(Debug, Clone, PartialEq)]
pub struct OmnidirectionalCameraParameters {
    world_to_cam_params: Vec<f64>,
    affine: (f64, f64, f64),
    principal_point: (f64, f64),
    image_size: (usize, usize),
    fov_deg: f64,
}

impl OmnidirectionalCameraParameters {
    pub fn new(
        world_to_cam_params: Vec<f64>,
        affine: (f64, f64, f64),
        principal_point: (f64, f64),
        image_size: (usize, usize),
        fov_deg: f64,
    ) -> Result<Self> {
        validate_image_size(image_size)?;
        if world_to_cam_params.is_empty() {
            return Err(CameraError::InvalidInput(
                "world_to_cam polynomial needs at least one coefficient".to_string(),
            ));
        }
        let (c, d, e) = affine;
        let (cx, cy) = principal_point;
        let finite = world_to_cam_params
            .iter()
            .chain(&[c, d, e, cx, cy])
            .all(|v| v.is_finite());
        if !finite {
            return Err(CameraError::InvalidInput(
                "omnidirectional intrinsics must be finite".to_string(),
            ));
        }
        if !fov_deg.is_finite() || fov_deg <= 0.0 {
            return Err(CameraError::InvalidInput(format!(
                "field of view must be a positive angle, got {fov_deg}"
            )));
        }
        Ok(Self {
            world_to_cam_params,
            affine,
            principal_point,
            image_size,
            fov_deg,
        })
    }

    pub fn world_to_cam_params(&self) -> &[f64] {
        &self.world_to_cam_params
    }

    /// Affine coefficients `(c, d, e)`
    pub fn affine(&self) -> (f64, f64, f64) {
        self.affine
    }

    pub fn principal_point(&self) -> (f64, f64) {
        self.principal_point
    }

    pub fn fov_deg(&self) -> f64 {
        self.fov_deg
    }

    /// Largest incidence angle still in view, or None when the fov is unrestricted
    fn theta_threshold(&self) -> Option<f64> {
        (self.fov_deg < 360.0)
            .then(|| self.fov_deg.to_radians() / 2.0 - FRAC_PI_2)
    }

    /// Radial distance on the sensor for incidence angle `theta`
    fn rho(&self, theta: f64) -> f64 {
        self.world_to_cam_params
            .iter()
            .rev()
            .fold(0.0, |acc, &coeff| acc * theta + coeff)
    }

    /// Map one camera-frame point to a pixel.
    /// The flag is set when the pixel is the (0, 0) sentinel.
    fn map_point(&self, x: f64, y: f64, z: f64, theta_threshold: Option<f64>) -> (f64, f64, bool) {
        let (cx, cy) = self.principal_point;
        let norm = x.hypot(y);
        let out_of_view = |theta: f64| theta_threshold.is_some_and(|limit| theta > limit);

        if norm == 0.0 {
            if z == 0.0 {
                return (0.0, 0.0, true);
            }
            // On the optical axis the incidence angle is -pi/2 ahead and pi/2 behind
            if out_of_view(-(FRAC_PI_2.copysign(z))) {
                return (0.0, 0.0, true);
            }
            return (cx, cy, false);
        }

        let theta = -(z / norm).atan();
        if out_of_view(theta) {
            return (0.0, 0.0, true);
        }

        let rho = self.rho(theta);
        let u = x / norm * rho;
        let v = y / norm * rho;

        let (c, d, e) = self.affine;
        (v * e + u + cx, v * c + u * d + cy, false)
    }
}

impl CameraParameters for OmnidirectionalCameraParameters {
    fn intrinsic_matrix(&self) -> Result<Matrix3<f64>> {
        Err(CameraError::UnsupportedOperation(
            "omnidirectional cameras have no linear intrinsic matrix".to_string(),
        ))
    }

    fn image_size(&self) -> (usize, usize) {
        self.image_size
    }
}

/// Omnidirectional (fisheye) camera using the OCamCalib polynomial model
#[derive(Debug, Clone)]
pub struct OmnidirectionalCamera {
    parameters: OmnidirectionalCameraParameters,
    pose: Transform,
}

impl OmnidirectionalCamera {
    /// Create a camera at the world origin
    pub fn new(parameters: OmnidirectionalCameraParameters) -> Self {
        Self::with_pose(parameters, Transform::identity())
    }

    /// Create a camera with an initial camera-in-world pose
    pub fn with_pose(parameters: OmnidirectionalCameraParameters, pose: Transform) -> Self {
        Self { parameters, pose }
    }

    pub fn omnidirectional_parameters(&self) -> &OmnidirectionalCameraParameters {
        &self.parameters
    }
}

impl Camera for OmnidirectionalCamera {
    fn parameters(&self) -> &dyn CameraParameters {
        &self.parameters
    }

    fn pose(&self) -> &Transform {
        &self.pose
    }

    fn set_pose(&mut self, pose: Transform) {
        self.pose = pose;
    }

    /// Project world points through the polynomial model.
    ///
    /// The front-of-camera mask is read from the homogeneous coordinate of
    /// the pixel vector, which is always 1, so every point passes it. Points
    /// at the camera centre or outside the field of view land on pixel (0, 0)
    /// and are flagged in `Projection::invalid`.
    ///
    /// A point on the optical axis maps to the principal point, except that
    /// the incidence angle there is taken as +pi/2 behind the lens: with a
    /// field of view below 360 degrees such a point is clamped to (0, 0).
    fn world_to_camera(&self, points: ArrayView2<f64>) -> Result<Projection> {
        let points_camera = self.pose.rigid_inverse().apply_to_points(points)?;
        let n = points_camera.ncols();
        let threshold = self.parameters.theta_threshold();

        let mapped: Vec<(f64, f64, bool)> = (0..n)
            .into_par_iter()
            .with_min_len(MIN_POINTS_PER_TASK)
            .map(|i| {
                self.parameters.map_point(
                    points_camera[(0, i)],
                    points_camera[(1, i)],
                    points_camera[(2, i)],
                    threshold,
                )
            })
            .collect();

        let mut image = Array2::<f64>::ones((3, n));
        let mut sentinel = Array1::from_elem(n, false);
        for (i, &(px, py, forced)) in mapped.iter().enumerate() {
            image[(0, i)] = px;
            image[(1, i)] = py;
            sentinel[i] = forced;
        }

        let in_front: Array1<bool> = image.row(2).mapv(|w| w > 0.0);
        let front = select_mask(image.view(), in_front.view());
        let invalid = select_mask_1d(sentinel.view(), in_front.view());

        let (width, height) = self.parameters.image_size;
        let (pixels, inside_image) = filter_visible_points(front.view(), width, height)?;

        debug!(
            "omnidirectional projection: {} points, {} sentinel, {} visible",
            n,
            invalid.iter().filter(|&&flag| flag).count(),
            pixels.ncols()
        );

        Ok(Projection {
            pixels,
            in_front,
            inside_image,
            invalid,
        })
    }

    fn copy(&self) -> Box<dyn Camera> {
        Box::new(self.clone())
    }
}
