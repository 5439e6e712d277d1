use crate::utils::bbox::{EdgeBox, HitRegion};
use crate::utils::kalman::{ScalarKalmanFilter, ScalarKalmanState};

/// Smoothed state of one physical symbol instance.
///
/// Every edge of the box has its own scalar filter; the four channels are not coupled.
///
#[derive(Debug, Clone)]
pub struct TrackedObject {
    id: u64,
    key: String,
    filter: ScalarKalmanFilter,
    edges: [ScalarKalmanState; 4],
    region_side: f32,
    region: HitRegion,
    last_seen_epoch: usize,
    length: usize,
    idle_epochs: usize,
}

impl TrackedObject {
    /// Creates the track seeded at `bbox`
    ///
    /// # Parameters
    /// * `id` - track id unique within the session
    /// * `key` - identity key of the symbol
    /// * `bbox` - first observed box
    /// * `filter` - filter used for every edge
    /// * `region_side` - side of the interactive region
    /// * `epoch` - the frame the track is created on
    ///
    pub fn new(
        id: u64,
        key: &str,
        bbox: &EdgeBox,
        filter: ScalarKalmanFilter,
        region_side: f32,
        epoch: usize,
    ) -> Self {
        let edges = bbox.edges().map(|e| filter.initiate(e));
        let mut t = Self {
            id,
            key: key.to_string(),
            filter,
            edges,
            region_side,
            region: HitRegion::default(),
            last_seen_epoch: epoch,
            length: 1,
            idle_epochs: 0,
        };
        t.region = HitRegion::around(t.current_rect().center(), region_side);
        t
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Smoothed box snapped to the pixel grid
    ///
    pub fn current_rect(&self) -> EdgeBox {
        self.raw_rect().snapped()
    }

    /// Smoothed box as estimated by the filters
    ///
    pub fn raw_rect(&self) -> EdgeBox {
        EdgeBox::from_edges(self.edges.map(|s| s.estimate()))
    }

    pub fn region(&self) -> HitRegion {
        self.region
    }

    pub fn last_seen_epoch(&self) -> usize {
        self.last_seen_epoch
    }

    /// The number of observations merged into the track
    ///
    pub fn length(&self) -> usize {
        self.length
    }

    /// The number of consecutive frames the track was not matched
    ///
    pub fn idle_epochs(&self) -> usize {
        self.idle_epochs
    }

    pub fn edge_states(&self) -> &[ScalarKalmanState; 4] {
        &self.edges
    }

    /// Feeds the observed box into the edge filters
    ///
    pub fn update(&mut self, bbox: &EdgeBox, epoch: usize) {
        let observed = bbox.edges();
        for (state, m) in self.edges.iter_mut().zip(observed) {
            *state = self.filter.predict_and_update(state, m);
        }
        self.region = HitRegion::around(self.current_rect().center(), self.region_side);
        self.last_seen_epoch = epoch;
        self.length += 1;
        self.idle_epochs = 0;
    }

    /// Registers a frame without a matching detection, returns the idle frame count
    ///
    pub fn mark_missed(&mut self) -> usize {
        self.idle_epochs += 1;
        self.idle_epochs
    }

    pub fn is_close_to(&self, bbox: &EdgeBox, threshold: f32) -> bool {
        self.current_rect().is_close(bbox, threshold)
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.region.contains(x, y)
    }
}
