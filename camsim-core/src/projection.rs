//! Projection of coloured point clouds through a camera

use ndarray::{Array2, ArrayView2};

use crate::camera::{Camera, Projection};
use crate::error::{Result, ShapeError};
use crate::geometry::validate_point_batch;

/// World-space points (3xN) with optional per-point RGB colours (3xN)
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    points: Array2<f64>,
    colors: Option<Array2<f64>>,
}

impl PointCloud {
    pub fn new(points: Array2<f64>) -> Result<Self> {
        validate_point_batch(&points.view())?;
        Ok(Self {
            points,
            colors: None,
        })
    }

    pub fn with_colors(points: Array2<f64>, colors: Array2<f64>) -> Result<Self> {
        validate_point_batch(&points.view())?;
        if colors.dim() != points.dim() {
            let (rows, cols) = colors.dim();
            return Err(ShapeError::Matrix {
                expected: "3xN colour",
                rows,
                cols,
            }
            .into());
        }
        Ok(Self {
            points,
            colors: Some(colors),
        })
    }

    pub fn points(&self) -> ArrayView2<'_, f64> {
        self.points.view()
    }

    pub fn colors(&self) -> Option<ArrayView2<'_, f64>> {
        self.colors.as_ref().map(|c| c.view())
    }

    pub fn len(&self) -> usize {
        self.points.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.points.ncols() == 0
    }
}

/// Visible points of a cloud in pixel coordinates, colours kept aligned
#[derive(Debug, Clone)]
pub struct ProjectedCloud {
    pub pixels: Array2<f64>,
    pub colors: Option<Array2<f64>>,
    pub projection: Projection,
}

/// Project a point cloud and carry its colours through both visibility masks
pub fn project_point_cloud(camera: &dyn Camera, cloud: &PointCloud) -> Result<ProjectedCloud> {
    let projection = camera.world_to_camera(cloud.points())?;
    let colors = cloud
        .colors()
        .map(|c| projection.select_columns(c))
        .transpose()?;
    Ok(ProjectedCloud {
        pixels: projection.pixels.clone(),
        colors,
        projection,
    })
}
