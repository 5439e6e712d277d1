use crate::trackers::registry::{IdentityRegistry, SharedIdentityRegistry};
use crate::trackers::stabilizer::options::StabilizerOptions;
use crate::trackers::stabilizer::store::KeyedTracks;
use crate::trackers::stabilizer::track::TrackedObject;
use crate::utils::bbox::{EdgeBox, HitRegion};
use crate::utils::color::Rgb;
use crate::utils::kalman::ScalarKalmanFilter;
use anyhow::Result;
use log::debug;
use std::collections::HashMap;
use std::mem;

/// Session configuration
pub mod options;

/// Tracks grouped by identity key
pub mod store;

/// Tracked symbol instance
pub mod track;

/// Raw detection received from the external detector
///
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Decoded value, empty when the detector found no value
    pub key: String,
    /// Box in detector image coordinates
    pub bbox: EdgeBox,
}

impl Detection {
    pub fn new(key: impl Into<String>, bbox: EdgeBox) -> Self {
        Self {
            key: key.into(),
            bbox,
        }
    }
}

impl<K: Into<String>> From<(K, EdgeBox)> for Detection {
    fn from((key, bbox): (K, EdgeBox)) -> Self {
        Self::new(key, bbox)
    }
}

/// Stabilized symbol returned for a frame
///
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizedSymbol {
    /// Session-unique id of the tracked instance
    pub track_id: u64,
    pub key: String,
    /// Smoothed box, snapped to the pixel grid
    pub bbox: EdgeBox,
    pub color: Rgb,
    /// Interactive region for pointer hit tests
    pub region: HitRegion,
    /// The number of frames merged into the track
    pub length: usize,
}

impl StabilizedSymbol {
    fn new(track: &TrackedObject, color: Rgb) -> Self {
        Self {
            track_id: track.id(),
            key: track.key().to_string(),
            bbox: track.current_rect(),
            color,
            region: track.region(),
            length: track.length(),
        }
    }
}

/// Detection stabilization and identity tracking session.
///
/// Every call of [`TrackingSession::update`] processes one frame: detections are matched to
/// the tracks retained from the previous frame by identity key and per-edge closeness,
/// matched tracks are smoothed, and unmatched detections start new tracks. Tracks that are not
/// matched are dropped (or kept idle when `max_idle_epochs` is set).
///
/// The session is a single-writer object; [`crate::trackers::batch::StabilizerWorker`]
/// serializes frames produced on several threads.
///
#[derive(Debug)]
pub struct TrackingSession {
    opts: StabilizerOptions,
    filter: ScalarKalmanFilter,
    registry: SharedIdentityRegistry,
    tracks: KeyedTracks,
    last_output: Vec<StabilizedSymbol>,
    epoch: usize,
    track_id: u64,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::build(StabilizerOptions::default(), IdentityRegistry::new().shared())
    }
}

impl TrackingSession {
    /// Creates a session with its own identity registry
    ///
    pub fn new(opts: StabilizerOptions) -> Result<Self> {
        Self::with_registry(opts, IdentityRegistry::new().shared())
    }

    /// Creates a session that draws colors from a shared registry
    ///
    pub fn with_registry(
        opts: StabilizerOptions,
        registry: SharedIdentityRegistry,
    ) -> Result<Self> {
        opts.validate()?;
        Ok(Self::build(opts, registry))
    }

    fn build(opts: StabilizerOptions, registry: SharedIdentityRegistry) -> Self {
        Self {
            filter: opts.filter(),
            opts,
            registry,
            tracks: KeyedTracks::default(),
            last_output: Vec::default(),
            epoch: 0,
            track_id: 0,
        }
    }

    fn gen_track_id(&mut self) -> u64 {
        self.track_id += 1;
        self.track_id
    }

    fn new_track(&mut self, key: &str, bbox: &EdgeBox) -> TrackedObject {
        let id = self.gen_track_id();
        debug!(
            "Epoch {}: new track {} for key '{}' at {:?}",
            self.epoch, id, key, bbox
        );
        TrackedObject::new(
            id,
            key,
            bbox,
            self.filter,
            self.opts.get_region_side(),
            self.epoch,
        )
    }

    /// Processes the detections of one frame
    ///
    /// # Parameters
    /// * `detections` - detections of the frame in the detector order
    ///
    /// Returns the tracks matched or created on this frame, in the order of the detections
    /// they were built from. Detections without a key or with a degenerate box are skipped.
    ///
    pub fn update(&mut self, detections: &[Detection]) -> Vec<StabilizedSymbol> {
        self.epoch += 1;
        let threshold = self.opts.get_closeness_threshold();
        let policy = self.opts.get_matching_policy();

        let mut previous = mem::take(&mut self.tracks);
        let mut current = KeyedTracks::default();
        let mut tracked = Vec::with_capacity(detections.len());

        for d in detections {
            if d.key.is_empty() {
                debug!("Epoch {}: detection without a key is skipped", self.epoch);
                continue;
            }
            if d.bbox.is_degenerate() {
                debug!(
                    "Epoch {}: degenerate box {:?} for key '{}' is skipped",
                    self.epoch, d.bbox, d.key
                );
                continue;
            }

            let track = if previous.has_key(&d.key) {
                match previous.claim(&d.key, &d.bbox, threshold, policy) {
                    Some(mut t) => {
                        t.update(&d.bbox, self.epoch);
                        t
                    }
                    None => self.new_track(&d.key, &d.bbox),
                }
            } else {
                self.new_track(&d.key, &d.bbox)
            };

            tracked.push(track.id());
            current.insert(track);
        }

        let max_idle_epochs = self.opts.get_max_idle_epochs();
        for mut t in previous.drain() {
            if t.mark_missed() <= max_idle_epochs {
                current.insert(t);
            } else {
                debug!(
                    "Epoch {}: track {} for key '{}' is dropped",
                    self.epoch,
                    t.id(),
                    t.key()
                );
            }
        }
        self.tracks = current;

        let mut registry = self
            .registry
            .write()
            .expect("Access to registry must always succeed");

        let by_id = self
            .tracks
            .iter()
            .map(|t| (t.id(), t))
            .collect::<HashMap<_, _>>();

        let res = tracked
            .into_iter()
            .filter_map(|id| by_id.get(&id))
            .map(|t| StabilizedSymbol::new(t, registry.color_for(t.key())))
            .collect::<Vec<_>>();

        self.last_output = res.clone();
        res
    }

    /// The number of processed frames
    ///
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn options(&self) -> &StabilizerOptions {
        &self.opts
    }

    pub fn registry(&self) -> SharedIdentityRegistry {
        self.registry.clone()
    }

    pub fn color_for(&self, key: &str) -> Rgb {
        self.registry
            .write()
            .expect("Access to registry must always succeed")
            .color_for(key)
    }

    /// Tracks kept by the session after the last frame, including idle ones
    ///
    pub fn tracked(&self) -> Vec<&TrackedObject> {
        self.tracks.iter().collect()
    }

    /// The result of the last frame
    ///
    pub fn last_output(&self) -> &[StabilizedSymbol] {
        &self.last_output
    }

    /// The first symbol of the last frame whose interactive region contains the point
    ///
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&StabilizedSymbol> {
        self.last_output.iter().find(|s| s.region.contains(x, y))
    }

    /// The number of kept tracks per identity key
    ///
    pub fn instance_counts(&self) -> HashMap<String, usize> {
        self.tracks.instance_counts()
    }

    /// Drops all tracks. Registered colors are kept.
    ///
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.last_output.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::trackers::registry::IdentityRegistry;
    use crate::trackers::stabilizer::options::{MatchingPolicy, StabilizerOptions};
    use crate::trackers::stabilizer::{Detection, TrackingSession};
    use crate::utils::bbox::EdgeBox;
    use crate::Errors;

    fn bb(l: f32, t: f32, r: f32, b: f32) -> EdgeBox {
        EdgeBox::new(l, t, r, b)
    }

    fn det(key: &str, bbox: EdgeBox) -> Detection {
        Detection::new(key, bbox)
    }

    #[test]
    fn end_to_end() {
        let mut s = TrackingSession::default();

        let frame_1 = bb(10.0, 10.0, 50.0, 30.0);
        let v = s.update(&[det("ABC123", frame_1)]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].key, "ABC123");
        assert_eq!(v[0].bbox, frame_1);
        assert_eq!(v[0].length, 1);
        let (id, color) = (v[0].track_id, v[0].color);

        let frame_2 = bb(12.0, 11.0, 52.0, 31.0);
        let v = s.update(&[det("ABC123", frame_2)]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].track_id, id);
        assert_eq!(v[0].color, color);
        assert_eq!(v[0].length, 2);
        for ((e, a), b) in v[0]
            .bbox
            .edges()
            .iter()
            .zip(frame_1.edges())
            .zip(frame_2.edges())
        {
            assert!(*e >= a && *e <= b);
        }

        let v = s.update(&[]);
        assert!(v.is_empty());
        assert!(s.tracked().is_empty());
        assert_eq!(s.epoch(), 3);
    }

    #[test]
    fn settled_track_damps_jitter() {
        let mut s = TrackingSession::default();
        let still = bb(100.0, 100.0, 200.0, 160.0);
        for _ in 0..10 {
            s.update(&[det("ABC123", still)]);
        }

        let jitter = bb(110.0, 106.0, 210.0, 166.0);
        let v = s.update(&[det("ABC123", jitter)]);
        assert_eq!(v.len(), 1);
        let raw = s.tracked()[0].raw_rect();
        for ((e, a), b) in raw.edges().iter().zip(still.edges()).zip(jitter.edges()) {
            assert!(*e > a);
            assert!(*e - a < (b - a) / 2.0);
        }
        for ((e, a), b) in v[0]
            .bbox
            .edges()
            .iter()
            .zip(still.edges())
            .zip(jitter.edges())
        {
            assert!(*e >= a && *e - a < (b - a) / 2.0);
        }
    }

    #[test]
    fn close_detection_carries_the_track() {
        let mut s = TrackingSession::default();
        let v = s.update(&[det("K", bb(100.0, 100.0, 200.0, 160.0))]);
        let id = v[0].track_id;

        let v = s.update(&[det("K", bb(129.0, 71.0, 229.0, 131.0))]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].track_id, id);
        assert_eq!(s.tracked().len(), 1);
    }

    #[test]
    fn far_detection_creates_a_new_instance() {
        let mut s = TrackingSession::default();
        let v = s.update(&[det("K", bb(100.0, 100.0, 200.0, 160.0))]);
        let id = v[0].track_id;

        // only the right edge moves beyond the threshold
        let v = s.update(&[det("K", bb(100.0, 100.0, 230.0, 160.0))]);
        assert_eq!(v.len(), 1);
        assert_ne!(v[0].track_id, id);
        assert_eq!(v[0].length, 1);
        assert_eq!(s.tracked().len(), 1);
    }

    #[test]
    fn simultaneous_instances_of_one_key() {
        let mut s = TrackingSession::default();
        let left = bb(10.0, 10.0, 50.0, 30.0);
        let right = bb(300.0, 10.0, 340.0, 30.0);

        let v = s.update(&[det("K", left), det("K", right)]);
        assert_eq!(v.len(), 2);
        assert_ne!(v[0].track_id, v[1].track_id);
        assert_eq!(v[0].color, v[1].color);
        assert_eq!(s.instance_counts().get("K"), Some(&2));

        // detections arrive in the opposite order
        let v2 = s.update(&[det("K", right.translate(1.0, 0.0)), det("K", left)]);
        assert_eq!(v2.len(), 2);
        assert_eq!(v2[0].track_id, v[1].track_id);
        assert_eq!(v2[1].track_id, v[0].track_id);
    }

    #[test]
    fn track_is_claimed_once_per_frame() {
        let mut s = TrackingSession::default();
        let near = bb(10.0, 10.0, 50.0, 30.0);
        let far = bb(300.0, 300.0, 340.0, 320.0);
        let v = s.update(&[det("K", near), det("K", far)]);
        let (near_id, far_id) = (v[0].track_id, v[1].track_id);

        let v = s.update(&[
            det("K", near.translate(1.0, 0.0)),
            det("K", near.translate(2.0, 0.0)),
        ]);
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].track_id, near_id);
        assert_ne!(v[1].track_id, near_id);
        assert_ne!(v[1].track_id, far_id);
        assert_eq!(v[1].length, 1);

        // the far instance was not matched and is gone
        assert!(s.tracked().iter().all(|t| t.id() != far_id));
        assert_eq!(s.tracked().len(), 2);
    }

    #[test]
    fn new_tracks_are_not_matched_within_the_frame() {
        let mut s = TrackingSession::default();
        let a = bb(10.0, 10.0, 50.0, 30.0);
        let v = s.update(&[det("K", a), det("K", a.translate(1.0, 1.0))]);
        assert_eq!(v.len(), 2);
        assert_ne!(v[0].track_id, v[1].track_id);
        assert!(v.iter().all(|x| x.length == 1));
    }

    #[test]
    fn drop_on_miss() {
        let mut s = TrackingSession::default();
        let a = bb(10.0, 10.0, 50.0, 30.0);
        let b = bb(100.0, 100.0, 150.0, 130.0);
        let v = s.update(&[det("A", a), det("B", b)]);
        let a_id = v[0].track_id;

        let v = s.update(&[det("B", b)]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].key, "B");

        // "A" comes back as a new instance
        let v = s.update(&[det("A", a), det("B", b)]);
        assert_eq!(v.len(), 2);
        assert_ne!(v[0].track_id, a_id);
        assert_eq!(v[0].length, 1);
        assert_eq!(v[1].length, 3);
    }

    #[test]
    fn idle_tracks_survive_within_grace_period() {
        let mut s = TrackingSession::new(StabilizerOptions::default().max_idle_epochs(2)).unwrap();
        let a = bb(10.0, 10.0, 50.0, 30.0);
        let id = s.update(&[det("A", a)])[0].track_id;

        assert!(s.update(&[]).is_empty());
        assert!(s.update(&[]).is_empty());
        assert_eq!(s.tracked().len(), 1);
        assert_eq!(s.tracked()[0].idle_epochs(), 2);

        let v = s.update(&[det("A", a)]);
        assert_eq!(v[0].track_id, id);
        assert_eq!(v[0].length, 2);

        for _ in 0..3 {
            s.update(&[]);
        }
        assert!(s.tracked().is_empty());
    }

    #[test]
    fn malformed_detections_are_skipped() {
        let mut s = TrackingSession::default();
        let a = bb(10.0, 10.0, 50.0, 30.0);
        let v = s.update(&[
            det("", a),
            det("A", bb(10.0, 10.0, 10.0, 30.0)),
            det("A", bb(f32::NAN, 10.0, 50.0, 30.0)),
            det("A", bb(10.0, 10.0, 50.0, f32::INFINITY)),
            det("B", a),
        ]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].key, "B");
        assert_eq!(s.registry().read().unwrap().len(), 1);
        assert_eq!(s.registry().read().unwrap().get(""), None);
    }

    #[test]
    fn inverted_boxes_are_normalized() {
        let mut s = TrackingSession::default();
        let v = s.update(&[det("A", bb(50.0, 30.0, 10.0, 10.0))]);
        assert_eq!(v[0].bbox.edges(), [10.0, 10.0, 50.0, 30.0]);
    }

    #[test]
    fn nearest_policy() {
        let opts = StabilizerOptions::default().matching_policy(MatchingPolicy::Nearest);
        let mut s = TrackingSession::new(opts).unwrap();
        let a = bb(0.0, 0.0, 40.0, 20.0);
        let b = bb(20.0, 0.0, 60.0, 20.0);
        let v = s.update(&[det("K", a), det("K", b)]);
        let b_id = v[1].track_id;

        // close to both, nearer to the second one
        let v = s.update(&[det("K", bb(18.0, 0.0, 58.0, 20.0))]);
        assert_eq!(v[0].track_id, b_id);

        let mut s = TrackingSession::default();
        let v = s.update(&[det("K", a), det("K", b)]);
        let a_id = v[0].track_id;
        let v = s.update(&[det("K", bb(18.0, 0.0, 58.0, 20.0))]);
        assert_eq!(v[0].track_id, a_id);
    }

    #[test]
    fn colors_are_stable() {
        let mut s = TrackingSession::default();
        let a = bb(10.0, 10.0, 50.0, 30.0);
        let c = s.update(&[det("A", a)])[0].color;
        s.update(&[]);
        s.reset();
        let v = s.update(&[det("A", a.translate(200.0, 0.0))]);
        assert_eq!(v[0].color, c);
        assert_eq!(s.color_for("A"), c);
    }

    #[test]
    fn sessions_share_a_registry() {
        let registry = IdentityRegistry::with_seed(3).shared();
        let mut s1 =
            TrackingSession::with_registry(StabilizerOptions::default(), registry.clone()).unwrap();
        let mut s2 =
            TrackingSession::with_registry(StabilizerOptions::default(), registry.clone()).unwrap();
        let a = bb(10.0, 10.0, 50.0, 30.0);
        let c1 = s1.update(&[det("A", a)])[0].color;
        let v2 = s2.update(&[det("A", a)]);
        assert_eq!(v2[0].color, c1);

        // tracks are not shared
        s1.update(&[]);
        assert!(s1.tracked().is_empty());
        assert_eq!(s2.tracked().len(), 1);
    }

    #[test]
    fn recently_matched_track_wins_tie_over_idle() {
        let opts = StabilizerOptions::default().max_idle_epochs(1);
        let mut s = TrackingSession::new(opts).unwrap();
        let v = s.update(&[
            det("A", bb(10.0, 10.0, 50.0, 30.0)),
            det("A", bb(50.0, 10.0, 90.0, 30.0)),
        ]);
        let (older, newer) = (v[0].track_id, v[1].track_id);
        assert!(older < newer);

        let v = s.update(&[det("A", bb(50.0, 10.0, 90.0, 30.0))]);
        assert_eq!(v[0].track_id, newer);
        assert_eq!(s.instance_counts()["A"], 2);

        let v = s.update(&[det("A", bb(30.0, 10.0, 70.0, 30.0))]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].track_id, newer);
        assert_eq!(s.instance_counts()["A"], 1);
    }

    #[test]
    fn region_centered_on_odd_sized_box() {
        let mut s = TrackingSession::default();
        let v = s.update(&[det("K", bb(10.0, 10.0, 51.0, 31.0))]);
        assert_eq!(v[0].bbox.center(), (30.5, 20.5));
        assert_eq!(v[0].region.center(), v[0].bbox.center());

        let v = s.update(&[det("K", bb(10.0, 10.0, 51.0, 31.0))]);
        assert_eq!(v[0].region.center(), v[0].bbox.center());
        assert_eq!(s.tracked()[0].region().center(), (30.5, 20.5));
    }

    #[test]
    fn hit_test() {
        let opts = StabilizerOptions::default().region_side(20.0);
        let mut s = TrackingSession::new(opts).unwrap();
        let v = s.update(&[
            det("A", bb(10.0, 10.0, 50.0, 30.0)),
            det("B", bb(200.0, 200.0, 260.0, 240.0)),
        ]);
        assert_eq!(v[0].region.center(), (30.0, 20.0));
        assert_eq!(s.hit_test(30.0, 20.0).map(|x| x.key.as_str()), Some("A"));
        assert_eq!(s.hit_test(40.0, 30.0).map(|x| x.key.as_str()), Some("A"));
        assert_eq!(s.hit_test(235.0, 225.0).map(|x| x.key.as_str()), Some("B"));
        assert!(s.hit_test(41.0, 20.0).is_none());
        assert_eq!(s.last_output().len(), 2);
    }

    #[test]
    fn invalid_options() {
        let err = TrackingSession::new(StabilizerOptions::default().closeness_threshold(-1.0))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Errors>(),
            Some(Errors::InvalidOptions(_))
        ));
    }
}
