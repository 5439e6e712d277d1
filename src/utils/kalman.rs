// Single channel variant of the recursive estimator; every box edge is filtered as an
// independent random-walk process.
//
use log::warn;

/// Initial error covariance of a freshly seeded estimate
pub const DEFAULT_INITIAL_COVARIANCE: f32 = 1.0;

/// Process noise added on every prediction
pub const DEFAULT_PROCESS_NOISE: f32 = 1e-7;

/// Measurement noise of the detector
pub const DEFAULT_MEASUREMENT_NOISE: f32 = 1e-5;

/// Filter state for a single scalar channel
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarKalmanState {
    estimate: f32,
    covariance: f32,
    iterations: usize,
}

impl ScalarKalmanState {
    pub fn estimate(&self) -> f32 {
        self.estimate
    }

    pub fn covariance(&self) -> f32 {
        self.covariance
    }

    /// The number of accepted measurements
    ///
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Scalar Kalman filter.
///
/// Process and measurement noises are fixed at construction, so the gain only depends on the
/// number of accepted measurements. With a process noise much lower than the measurement noise
/// the gain settles at a small value and the estimate trusts its history over any single
/// measurement.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarKalmanFilter {
    initial_covariance: f32,
    process_noise: f32,
    measurement_noise: f32,
}

/// Default initializer
impl Default for ScalarKalmanFilter {
    fn default() -> Self {
        ScalarKalmanFilter::new(
            DEFAULT_INITIAL_COVARIANCE,
            DEFAULT_PROCESS_NOISE,
            DEFAULT_MEASUREMENT_NOISE,
        )
    }
}

impl ScalarKalmanFilter {
    pub fn new(initial_covariance: f32, process_noise: f32, measurement_noise: f32) -> Self {
        ScalarKalmanFilter {
            initial_covariance,
            process_noise,
            measurement_noise,
        }
    }

    pub fn initial_covariance(&self) -> f32 {
        self.initial_covariance
    }

    pub fn process_noise(&self) -> f32 {
        self.process_noise
    }

    pub fn measurement_noise(&self) -> f32 {
        self.measurement_noise
    }

    /// Seeds the state at `value`
    ///
    pub fn initiate(&self, value: f32) -> ScalarKalmanState {
        ScalarKalmanState {
            estimate: value,
            covariance: self.initial_covariance,
            iterations: 0,
        }
    }

    pub fn predict(&self, state: &ScalarKalmanState) -> ScalarKalmanState {
        ScalarKalmanState {
            covariance: state.covariance + self.process_noise,
            ..*state
        }
    }

    /// Gain applied to the innovation for a predicted state
    ///
    pub fn gain(&self, predicted: &ScalarKalmanState) -> f32 {
        predicted.covariance / (predicted.covariance + self.measurement_noise)
    }

    pub fn update(&self, predicted: &ScalarKalmanState, measurement: f32) -> ScalarKalmanState {
        let k = self.gain(predicted);
        ScalarKalmanState {
            estimate: predicted.estimate + k * (measurement - predicted.estimate),
            covariance: predicted.covariance * (1.0 - k),
            iterations: predicted.iterations + 1,
        }
    }

    /// Prediction followed by the correction with `measurement`.
    ///
    /// Non-finite measurements are rejected: the state is returned unchanged, so the estimate
    /// stays finite for any sequence of inputs.
    ///
    pub fn predict_and_update(
        &self,
        state: &ScalarKalmanState,
        measurement: f32,
    ) -> ScalarKalmanState {
        if !measurement.is_finite() {
            warn!(
                "Non-finite measurement {} is rejected, estimate {} is kept",
                measurement, state.estimate
            );
            return *state;
        }
        self.update(&self.predict(state), measurement)
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::kalman::{ScalarKalmanFilter, DEFAULT_INITIAL_COVARIANCE};

    #[test]
    fn initiate() {
        let f = ScalarKalmanFilter::default();
        let state = f.initiate(10.0);
        assert_eq!(state.estimate(), 10.0);
        assert_eq!(state.covariance(), DEFAULT_INITIAL_COVARIANCE);
        assert_eq!(state.iterations(), 0);
    }

    #[test]
    fn step() {
        let f = ScalarKalmanFilter::new(1.0, 0.5, 1.5);
        let state = f.initiate(0.0);
        let predicted = f.predict(&state);
        assert_eq!(predicted.covariance(), 1.5);
        assert_eq!(predicted.estimate(), 0.0);
        assert_eq!(f.gain(&predicted), 0.5);

        let state = f.update(&predicted, 4.0);
        assert_eq!(state.estimate(), 2.0);
        assert_eq!(state.covariance(), 0.75);
        assert_eq!(state.iterations(), 1);
    }

    #[test]
    fn converges_without_overshoot() {
        let f = ScalarKalmanFilter::default();
        let target = 50.0;
        let mut state = f.initiate(10.0);
        let mut err = (state.estimate() - target).abs();

        for _ in 0..200 {
            state = f.predict_and_update(&state, target);
            let new_err = (state.estimate() - target).abs();
            assert!(new_err <= err);
            assert!(state.estimate() <= target);
            err = new_err;
        }
        assert!(err < 1e-3);
    }

    #[test]
    fn gain_settles_low() {
        let f = ScalarKalmanFilter::default();
        let mut state = f.initiate(0.0);
        let first_gain = f.gain(&f.predict(&state));
        assert!(first_gain > 0.99);

        let mut last_gain = first_gain;
        for _ in 0..100 {
            state = f.predict_and_update(&state, 0.0);
            let g = f.gain(&f.predict(&state));
            assert!(g <= last_gain + 1e-6);
            last_gain = g;
        }
        assert!(last_gain < 0.15);
        assert!(last_gain > 0.0);
    }

    #[test]
    fn rejects_non_finite() {
        let f = ScalarKalmanFilter::default();
        let state = f.initiate(10.0);
        let state = f.predict_and_update(&state, 12.0);

        for m in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let next = f.predict_and_update(&state, m);
            assert_eq!(next, state);
            assert!(next.estimate().is_finite());
        }
    }
}
