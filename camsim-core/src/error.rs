use thiserror::Error;

/// Common errors across the camera model
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("Expected a {expected} matrix, got {rows}x{cols}")]
    Matrix {
        expected: &'static str,
        rows: usize,
        cols: usize,
    },

    #[error("Expected a vector of length {expected}, got {actual}")]
    Vector { expected: usize, actual: usize },

    #[error("Point batch must have 3 rows, got {0}")]
    PointBatch(usize),

    #[error("Attribute array has {actual} columns, expected {expected}")]
    Columns { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, CameraError>;
