use crate::trackers;
use crate::utils;

pub use trackers::batch::{FrameResult, FrameTicket, StabilizerWorker};
pub use trackers::registry::{global_registry, IdentityRegistry, SharedIdentityRegistry};
pub use trackers::stabilizer::options::{MatchingPolicy, StabilizerOptions};
pub use trackers::stabilizer::track::TrackedObject;
pub use trackers::stabilizer::{Detection, StabilizedSymbol, TrackingSession};

pub use utils::bbox::{EdgeBox, HitRegion};
pub use utils::color::Rgb;
pub use utils::kalman::ScalarKalmanFilter;
pub use utils::viewport::Viewport;
