use crate::EstimateClose;
use std::mem;

/// Maximum per-edge difference (in detector pixels) for two boxes to be the same physical object
pub const DEFAULT_CLOSENESS_THRESHOLD: f32 = 30.0;

/// Side of the square interactive region placed at the center of a tracked box
pub const DEFAULT_REGION_SIDE: f32 = 100.0;

/// Rounding policy for every coordinate leaving the stabilizer.
///
/// Detectors report boxes on an integer pixel grid, so smoothed values are snapped back to it.
/// Both the smoothed rectangle and the interactive region go through this function, which keeps
/// the two from drifting apart on half-pixel values.
///
#[inline]
pub fn snap(v: f32) -> f32 {
    v.round()
}

/// Axis-aligned box in the format (left, top, right, bottom)
///
/// The constructor swaps inverted edges, so `left <= right` and `top <= bottom` hold for
/// every box with finite edges.
///
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct EdgeBox {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl EdgeBox {
    /// Constructor
    ///
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        let (mut left, mut top, mut right, mut bottom) = (left, top, right, bottom);
        if left > right {
            mem::swap(&mut left, &mut right);
        }
        if top > bottom {
            mem::swap(&mut top, &mut bottom);
        }
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Constructor from the (left, top, width, height) format
    ///
    pub fn ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    pub fn from_edges(edges: [f32; 4]) -> Self {
        Self::new(edges[0], edges[1], edges[2], edges[3])
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn right(&self) -> f32 {
        self.right
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Edges in the order (left, top, right, bottom)
    ///
    pub fn edges(&self) -> [f32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }

    /// Midpoint of the edges
    ///
    pub fn center(&self) -> (f32, f32) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.edges().iter().all(|e| e.is_finite())
    }

    /// The box cannot be tracked: an edge is not finite or the box has no extent
    ///
    pub fn is_degenerate(&self) -> bool {
        !self.is_finite() || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Sum of absolute edge-wise differences.
    ///
    /// The value is measured in detector pixels and is not normalized by the box size, so the
    /// same physical motion produces larger values on higher resolution inputs.
    ///
    pub fn manhattan_delta(&self, other: &EdgeBox) -> f32 {
        self.edges()
            .iter()
            .zip(other.edges().iter())
            .map(|(a, b)| (a - b).abs())
            .sum()
    }

    /// True when every edge-wise absolute difference is below `threshold`.
    ///
    /// A large displacement of a single edge makes boxes distant even when the summed
    /// displacement is small.
    ///
    pub fn is_close(&self, other: &EdgeBox, threshold: f32) -> bool {
        self.edges()
            .iter()
            .zip(other.edges().iter())
            .all(|(a, b)| (a - b).abs() < threshold)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self::new(
            self.left * sx,
            self.top * sy,
            self.right * sx,
            self.bottom * sy,
        )
    }

    /// Box with every edge passed through [`snap`]
    ///
    pub fn snapped(&self) -> Self {
        Self::new(
            snap(self.left),
            snap(self.top),
            snap(self.right),
            snap(self.bottom),
        )
    }
}

impl EstimateClose for EdgeBox {
    /// Allows comparing bboxes
    ///
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        self.edges()
            .iter()
            .zip(other.edges().iter())
            .all(|(a, b)| (a - b).abs() < eps)
    }
}

impl From<[f32; 4]> for EdgeBox {
    fn from(edges: [f32; 4]) -> Self {
        Self::from_edges(edges)
    }
}

/// Square pointer target centered on a tracked box
///
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct HitRegion {
    cx: f32,
    cy: f32,
    half: f32,
}

impl HitRegion {
    /// Region of side `side` around `center`. The center is used as given, callers pass the
    /// center of an already snapped box.
    ///
    pub fn around(center: (f32, f32), side: f32) -> Self {
        Self {
            cx: center.0,
            cy: center.1,
            half: side.abs() / 2.0,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.cx, self.cy)
    }

    pub fn side(&self) -> f32 {
        self.half * 2.0
    }

    /// Point hit test, edges are inclusive
    ///
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (self.cx - self.half..=self.cx + self.half).contains(&x)
            && (self.cy - self.half..=self.cy + self.half).contains(&y)
    }

    pub fn as_box(&self) -> EdgeBox {
        EdgeBox::new(
            self.cx - self.half,
            self.cy - self.half,
            self.cx + self.half,
            self.cy + self.half,
        )
    }
}

impl EstimateClose for HitRegion {
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self.cx - other.cx).abs() < eps
            && (self.cy - other.cy).abs() < eps
            && (self.half - other.half).abs() < eps
    }
}
