use crate::trackers::stabilizer::Detection;
use crate::utils::bbox::EdgeBox;
use rand::distributions::Uniform;
use rand::prelude::ThreadRng;
use rand::Rng;

/// Box of a symbol that drifts over the frame while the detector adds per-edge jitter
///
pub struct JitterGen {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    drift: (f32, f32),
    gen: ThreadRng,
    dist_edge: Uniform<f32>,
}

impl JitterGen {
    /// Stationary symbol
    ///
    pub fn new(left: f32, top: f32, width: f32, height: f32, jitter: f32) -> Self {
        Self::new_drifting(left, top, width, height, jitter, (0.0, 0.0))
    }

    /// Symbol moving by `drift` pixels every frame
    ///
    pub fn new_drifting(
        left: f32,
        top: f32,
        width: f32,
        height: f32,
        jitter: f32,
        drift: (f32, f32),
    ) -> Self {
        assert!(jitter > 0.0, "Jitter must be a positive number");
        Self {
            left,
            top,
            width,
            height,
            drift,
            gen: rand::thread_rng(),
            dist_edge: Uniform::new(-jitter, jitter),
        }
    }

    /// The box without detector noise for the current frame
    ///
    pub fn truth(&self) -> EdgeBox {
        EdgeBox::ltwh(self.left, self.top, self.width, self.height)
    }
}

impl Iterator for JitterGen {
    type Item = EdgeBox;

    fn next(&mut self) -> Option<Self::Item> {
        self.left += self.drift.0;
        self.top += self.drift.1;
        let t = self.truth();
        let mut noisy = t.edges();
        for e in noisy.iter_mut() {
            *e = (*e + self.gen.sample(self.dist_edge)).round();
        }
        Some(EdgeBox::from_edges(noisy))
    }
}

/// Frames with several symbols; every symbol is missed by the detector with
/// the given probability
///
pub struct SceneGen {
    symbols: Vec<(String, JitterGen)>,
    gen: ThreadRng,
    miss_probability: f64,
}

impl SceneGen {
    pub fn new(miss_probability: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&miss_probability),
            "Miss probability must be between 0.0 and 1.0"
        );
        Self {
            symbols: Vec::default(),
            gen: rand::thread_rng(),
            miss_probability,
        }
    }

    pub fn symbol(mut self, key: &str, gen: JitterGen) -> Self {
        self.symbols.push((key.to_string(), gen));
        self
    }
}

impl Iterator for SceneGen {
    type Item = Vec<Detection>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut frame = Vec::with_capacity(self.symbols.len());
        for (key, boxes) in self.symbols.iter_mut() {
            let bbox = boxes.next()?;
            if !self.gen.gen_bool(self.miss_probability) {
                frame.push(Detection::new(key.clone(), bbox));
            }
        }
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use crate::examples::{JitterGen, SceneGen};
    use crate::trackers::stabilizer::TrackingSession;

    #[test]
    fn jitter_stays_within_bounds() {
        let gen = JitterGen::new(100.0, 100.0, 80.0, 40.0, 3.0);
        let truth = gen.truth();
        for bb in gen.take(100) {
            assert!(bb.is_close(&truth, 4.0));
        }
    }

    #[test]
    fn drifting() {
        let mut gen = JitterGen::new_drifting(0.0, 0.0, 80.0, 40.0, 1.0, (2.0, 1.0));
        gen.nth(9);
        assert_eq!(gen.truth().left(), 20.0);
        assert_eq!(gen.truth().top(), 10.0);
    }

    #[test]
    fn stabilized_jitter_is_smaller_than_raw() {
        let mut scene =
            SceneGen::new(0.0).symbol("ABC123", JitterGen::new(200.0, 300.0, 120.0, 60.0, 4.0));
        let mut s = TrackingSession::default();
        let mut id = None;
        let mut raw_spread = (f32::MAX, f32::MIN);
        let mut smooth_spread = (f32::MAX, f32::MIN);

        for i in 0..200 {
            let frame = scene.next().unwrap();
            let v = s.update(&frame);
            assert_eq!(v.len(), 1);
            if let Some(id) = id {
                assert_eq!(v[0].track_id, id);
            }
            id = Some(v[0].track_id);
            if i >= 50 {
                let raw = frame[0].bbox.left();
                let smooth = v[0].bbox.left();
                raw_spread = (raw_spread.0.min(raw), raw_spread.1.max(raw));
                smooth_spread = (smooth_spread.0.min(smooth), smooth_spread.1.max(smooth));
            }
        }
        assert!(smooth_spread.1 - smooth_spread.0 <= raw_spread.1 - raw_spread.0);
    }

    #[test]
    fn missed_symbols() {
        let scene = SceneGen::new(1.0).symbol("A", JitterGen::new(0.0, 0.0, 10.0, 10.0, 1.0));
        for frame in scene.take(10) {
            assert!(frame.is_empty());
        }
    }
}
