pub mod prelude;

/// Tracking sessions, the identity registry and the serialized worker
pub mod trackers;

/// Geometry, scalar Kalman filter, colors and viewport helpers
pub mod utils;

/// Synthetic detection generators used by tests, benches and demos
pub mod examples;

#[cfg(feature = "python")]
pub mod py;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Errors {
    #[error("Stabilizer options are invalid: {0}")]
    InvalidOptions(String),
    #[error("Frame {frame} is not newer than the last processed frame {last}.")]
    StaleFrame { frame: u64, last: u64 },
    #[error("Stabilizer worker is not running.")]
    WorkerGone,
}

pub(crate) const EPS: f32 = 0.00001;

/// Approximate equality for geometric values
///
pub trait EstimateClose {
    fn almost_same(&self, other: &Self, eps: f32) -> bool;
}
