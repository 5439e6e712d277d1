/// Axis-aligned boxes, closeness predicates and hit regions
pub mod bbox;

/// Scalar Kalman filter
pub mod kalman;

/// Display colors
pub mod color;

/// Detector to display coordinate mapping
pub mod viewport;
