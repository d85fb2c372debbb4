//! Serde-backed camera descriptions

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::camera::{
    Camera, OmnidirectionalCamera, OmnidirectionalCameraParameters, PinholeCamera,
    PinholeCameraParameters,
};
use crate::error::{CameraError, Result, ShapeError};
use crate::geometry::{EulerOrder, Transform, matrix_to_array};

fn default_fov_deg() -> f64 {
    360.0
}

fn default_degrees() -> bool {
    true
}

/// Camera model, intrinsics and optional initial pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case", deny_unknown_fields)]
pub enum CameraConfig {
    Pinhole {
        focal_length: f64,
        principal_point: (f64, f64),
        image_size: (usize, usize),
        #[serde(default)]
        pose: Option<PoseConfig>,
    },
    Omnidirectional {
        world_to_cam_params: Vec<f64>,
        /// Affine coefficients `(c, d, e)`
        affine: (f64, f64, f64),
        principal_point: (f64, f64),
        image_size: (usize, usize),
        #[serde(default = "default_fov_deg")]
        fov_deg: f64,
        #[serde(default)]
        pose: Option<PoseConfig>,
    },
}

/// Camera-in-world pose. `rotation` and `euler` are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoseConfig {
    #[serde(default)]
    pub rotation: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub euler: Option<EulerConfig>,
    #[serde(default)]
    pub translation: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EulerConfig {
    pub order: EulerOrder,
    pub angles: [f64; 3],
    #[serde(default = "default_degrees")]
    pub degrees: bool,
}

impl PoseConfig {
    pub fn to_transform(&self) -> Result<Transform> {
        let translation = self.translation.clone().map(Array1::from);
        let rotation = match (&self.rotation, &self.euler) {
            (Some(_), Some(_)) => {
                return Err(CameraError::InvalidInput(
                    "pose may give either 'rotation' or 'euler', not both".to_string(),
                ));
            }
            (Some(rows), None) => Some(rows_to_array(rows)?),
            (None, Some(euler)) => Some(matrix_to_array(
                &Transform::from_euler(euler.order, euler.angles, euler.degrees).rotation(),
            )),
            (None, None) => None,
        };
        Transform::from_rotate_and_translate(
            rotation.as_ref().map(|r| r.view()),
            translation.as_ref().map(|t| t.view()),
        )
    }
}

fn rows_to_array(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().find(|row| row.len() != ncols) {
        return Err(ShapeError::Vector {
            expected: ncols,
            actual: row.len(),
        }
        .into());
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), ncols), flat).map_err(|_| {
        ShapeError::Matrix {
            expected: "3x3",
            rows: rows.len(),
            cols: ncols,
        }
        .into()
    })
}

impl CameraConfig {
    /// Validate the description and build the camera it names
    pub fn build(&self) -> Result<Box<dyn Camera>> {
        match self {
            CameraConfig::Pinhole {
                focal_length,
                principal_point,
                image_size,
                pose,
            } => {
                let parameters =
                    PinholeCameraParameters::new(*focal_length, *principal_point, *image_size)?;
                Ok(Box::new(PinholeCamera::with_pose(
                    parameters,
                    pose_or_identity(pose)?,
                )))
            }
            CameraConfig::Omnidirectional {
                world_to_cam_params,
                affine,
                principal_point,
                image_size,
                fov_deg,
                pose,
            } => {
                let parameters = OmnidirectionalCameraParameters::new(
                    world_to_cam_params.clone(),
                    *affine,
                    *principal_point,
                    *image_size,
                    *fov_deg,
                )?;
                Ok(Box::new(OmnidirectionalCamera::with_pose(
                    parameters,
                    pose_or_identity(pose)?,
                )))
            }
        }
    }
}

fn pose_or_identity(pose: &Option<PoseConfig>) -> Result<Transform> {
    pose.as_ref()
        .map_or_else(|| Ok(Transform::identity()), PoseConfig::to_transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_pinhole_from_json() {
        let json = r#"{
            "model": "pinhole",
            "focal_length": 500.0,
            "principal_point": [320.0, 240.0],
            "image_size": [640, 480],
            "pose": { "translation": [0.0, 0.0, -2.0] }
        }"#;
        let config: CameraConfig = serde_json::from_str(json).unwrap();
        let camera = config.build().unwrap();
        assert_eq!(camera.image_size(), (640, 480));
        assert_eq!(camera.pose().translation(), Vector3::new(0.0, 0.0, -2.0));
        assert!(camera.intrinsic_matrix().is_ok());
    }

    #[test]
    fn test_omnidirectional_defaults() {
        let json = r#"{
            "model": "omnidirectional",
            "world_to_cam_params": [300.0, 190.0],
            "affine": [1.0, 0.0, 0.0],
            "principal_point": [640.0, 480.0],
            "image_size": [1280, 960]
        }"#;
        let config: CameraConfig = serde_json::from_str(json).unwrap();
        match &config {
            CameraConfig::Omnidirectional { fov_deg, pose, .. } => {
                assert_eq!(*fov_deg, 360.0);
                assert!(pose.is_none());
            }
            other => panic!("unexpected config {other:?}"),
        }
        let camera = config.build().unwrap();
        assert!(matches!(
            camera.intrinsic_matrix().unwrap_err(),
            CameraError::UnsupportedOperation(_)
        ));
    }

    #[test]
    fn test_misspelled_keys_rejected() {
        let fov = r#"{
            "model": "omnidirectional",
            "world_to_cam_params": [300.0, 190.0],
            "affine": [1.0, 0.0, 0.0],
            "principal_point": [640.0, 480.0],
            "image_size": [1280, 960],
            "fov": 180.0
        }"#;
        let err = serde_json::from_str::<CameraConfig>(fov).unwrap_err();
        assert!(err.to_string().contains("fov"));

        let pinhole = r#"{
            "model": "pinhole",
            "focal_length": 500.0,
            "principal_point": [320.0, 240.0],
            "image_size": [640, 480],
            "poses": {}
        }"#;
        assert!(serde_json::from_str::<CameraConfig>(pinhole).is_err());

        let euler = r#"{ "order": "xyz", "angles": [0.1, 0.2, 0.3], "degree": false }"#;
        assert!(serde_json::from_str::<EulerConfig>(euler).is_err());

        let euler = r#"{ "order": "xyz", "angles": [0.1, 0.2, 0.3], "degrees": false }"#;
        let parsed: EulerConfig = serde_json::from_str(euler).unwrap();
        assert!(!parsed.degrees);
    }

    #[test]
    fn test_euler_pose() {
        let pose = PoseConfig {
            euler: Some(EulerConfig {
                order: "ZYX".parse().unwrap(),
                angles: [90.0, 0.0, 0.0],
                degrees: true,
            }),
            translation: Some(vec![1.0, 2.0, 3.0]),
            ..Default::default()
        };
        let t = pose.to_transform().unwrap();
        assert_relative_eq!(t.rotation()[(0, 1)], -1.0, epsilon = 1e-12);
        assert_eq!(t.translation(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_pose_shape_errors() {
        let pose = PoseConfig {
            rotation: Some(vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
            ..Default::default()
        };
        assert!(matches!(
            pose.to_transform().unwrap_err(),
            CameraError::Shape(ShapeError::Matrix {
                rows: 2,
                cols: 2,
                ..
            })
        ));

        let ragged = PoseConfig {
            rotation: Some(vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0],
                vec![0.0, 0.0, 1.0],
            ]),
            ..Default::default()
        };
        assert!(matches!(
            ragged.to_transform().unwrap_err(),
            CameraError::Shape(ShapeError::Vector {
                expected: 3,
                actual: 2
            })
        ));

        let short = PoseConfig {
            translation: Some(vec![1.0, 2.0]),
            ..Default::default()
        };
        assert!(matches!(
            short.to_transform().unwrap_err(),
            CameraError::Shape(ShapeError::Vector {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_pose_rotation_and_euler_conflict() {
        let pose = PoseConfig {
            rotation: Some(vec![vec![1.0, 0.0, 0.0]; 3]),
            euler: Some(EulerConfig {
                order: EulerOrder::ExtrinsicXyz,
                angles: [0.0; 3],
                degrees: false,
            }),
            translation: None,
        };
        assert!(matches!(
            pose.to_transform().unwrap_err(),
            CameraError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_invalid_image_size_rejected() {
        let config = CameraConfig::Pinhole {
            focal_length: 500.0,
            principal_point: (320.0, 240.0),
            image_size: (640, 0),
            pose: None,
        };
        assert!(config.build().is_err());
    }
}
