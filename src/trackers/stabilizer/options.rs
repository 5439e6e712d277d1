use crate::utils::bbox::{DEFAULT_CLOSENESS_THRESHOLD, DEFAULT_REGION_SIDE};
use crate::utils::kalman::{
    ScalarKalmanFilter, DEFAULT_INITIAL_COVARIANCE, DEFAULT_MEASUREMENT_NOISE,
    DEFAULT_PROCESS_NOISE,
};
use crate::Errors;
use anyhow::Result;

/// How a detection selects one of the previous tracks sharing its key
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingPolicy {
    /// The first close track in insertion order wins
    #[default]
    FirstMatch,
    /// The close track with the smallest summed edge displacement wins, ties go to the
    /// earlier track
    Nearest,
}

/// Class that is used to configure the stabilizer
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizerOptions {
    closeness_threshold: f32,
    region_side: f32,
    max_idle_epochs: usize,
    matching_policy: MatchingPolicy,
    initial_covariance: f32,
    process_noise: f32,
    measurement_noise: f32,
}

impl Default for StabilizerOptions {
    fn default() -> Self {
        Self {
            closeness_threshold: DEFAULT_CLOSENESS_THRESHOLD,
            region_side: DEFAULT_REGION_SIDE,
            max_idle_epochs: 0,
            matching_policy: MatchingPolicy::default(),
            initial_covariance: DEFAULT_INITIAL_COVARIANCE,
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
        }
    }
}

impl StabilizerOptions {
    /// Maximum per-edge difference between a track and a detection to consider them the same
    /// physical object. Measured in detector pixels.
    ///
    pub fn closeness_threshold(mut self, threshold: f32) -> Self {
        self.closeness_threshold = threshold;
        self
    }

    /// Side of the square interactive region centered on every tracked box.
    ///
    pub fn region_side(mut self, side: f32) -> Self {
        self.region_side = side;
        self
    }

    /// The number of consecutive frames a track survives without being matched.
    ///
    /// With the default `0` a track disappears on the first frame it is not detected. Greater
    /// values keep unmatched tracks in the session, without prediction, so they can be picked
    /// up again when the symbol is detected within the allowed number of frames. Idle tracks
    /// are not reported in the frame output.
    ///
    /// Idle tracks are stored after the tracks matched on the frame, in creation order. With
    /// [`MatchingPolicy::FirstMatch`] a track matched on the last frame therefore wins a tie
    /// against an idle track of the same key, even when the idle track is older.
    ///
    pub fn max_idle_epochs(mut self, n: usize) -> Self {
        self.max_idle_epochs = n;
        self
    }

    pub fn matching_policy(mut self, policy: MatchingPolicy) -> Self {
        self.matching_policy = policy;
        self
    }

    /// Noise parameters of the per-edge scalar filters
    ///
    pub fn kalman_noise(
        mut self,
        initial_covariance: f32,
        process_noise: f32,
        measurement_noise: f32,
    ) -> Self {
        self.initial_covariance = initial_covariance;
        self.process_noise = process_noise;
        self.measurement_noise = measurement_noise;
        self
    }

    pub fn get_closeness_threshold(&self) -> f32 {
        self.closeness_threshold
    }

    pub fn get_region_side(&self) -> f32 {
        self.region_side
    }

    pub fn get_max_idle_epochs(&self) -> usize {
        self.max_idle_epochs
    }

    pub fn get_matching_policy(&self) -> MatchingPolicy {
        self.matching_policy
    }

    pub fn filter(&self) -> ScalarKalmanFilter {
        ScalarKalmanFilter::new(
            self.initial_covariance,
            self.process_noise,
            self.measurement_noise,
        )
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("closeness_threshold", self.closeness_threshold),
            ("region_side", self.region_side),
            ("initial_covariance", self.initial_covariance),
            ("measurement_noise", self.measurement_noise),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Errors::InvalidOptions(format!(
                    "{} must be a positive number, got {}",
                    name, value
                ))
                .into());
            }
        }
        if !(self.process_noise.is_finite() && self.process_noise >= 0.0) {
            return Err(Errors::InvalidOptions(format!(
                "process_noise must be a non-negative number, got {}",
                self.process_noise
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::trackers::stabilizer::options::{MatchingPolicy, StabilizerOptions};
    use crate::utils::bbox::DEFAULT_CLOSENESS_THRESHOLD;
    use crate::utils::kalman::ScalarKalmanFilter;
    use crate::Errors;

    #[test]
    fn defaults() {
        let opts = StabilizerOptions::default();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.get_closeness_threshold(), DEFAULT_CLOSENESS_THRESHOLD);
        assert_eq!(opts.get_max_idle_epochs(), 0);
        assert_eq!(opts.get_matching_policy(), MatchingPolicy::FirstMatch);
        assert_eq!(opts.filter(), ScalarKalmanFilter::default());
    }

    #[test]
    fn builder() {
        let opts = StabilizerOptions::default()
            .closeness_threshold(10.0)
            .region_side(60.0)
            .max_idle_epochs(3)
            .matching_policy(MatchingPolicy::Nearest)
            .kalman_noise(2.0, 0.1, 0.5);
        assert!(opts.validate().is_ok());
        assert_eq!(opts.get_closeness_threshold(), 10.0);
        assert_eq!(opts.get_region_side(), 60.0);
        assert_eq!(opts.get_max_idle_epochs(), 3);
        assert_eq!(opts.get_matching_policy(), MatchingPolicy::Nearest);
        assert_eq!(opts.filter(), ScalarKalmanFilter::new(2.0, 0.1, 0.5));
    }

    #[test]
    fn invalid() {
        for opts in [
            StabilizerOptions::default().closeness_threshold(0.0),
            StabilizerOptions::default().region_side(f32::NAN),
            StabilizerOptions::default().kalman_noise(1.0, -1.0, 1e-5),
            StabilizerOptions::default().kalman_noise(1.0, 1e-7, 0.0),
        ] {
            let err = opts.validate().unwrap_err();
            assert!(matches!(
                err.downcast_ref::<Errors>(),
                Some(Errors::InvalidOptions(_))
            ));
        }
    }
}
