pub mod camera;
pub mod config;
pub mod error;
pub mod geometry;
pub mod projection;

pub use camera::{
    Camera, CameraParameters, OmnidirectionalCamera, OmnidirectionalCameraParameters,
    PinholeCamera, PinholeCameraParameters, Projection, filter_visible_points,
};
pub use config::{CameraConfig, EulerConfig, PoseConfig};
pub use error::{CameraError, Result, ShapeError};
pub use geometry::{EulerOrder, Transform};
pub use projection::{PointCloud, ProjectedCloud, project_point_cloud};
