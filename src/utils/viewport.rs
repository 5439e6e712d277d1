use crate::utils::bbox::EdgeBox;

/// Maps boxes between the detector image space and a display surface.
///
/// The stabilizer works in detector coordinates only; the viewport is applied by consumers
/// that draw boxes or receive pointer events in display coordinates.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    source: (f32, f32),
    display: (f32, f32),
}

impl Viewport {
    /// Constructor
    ///
    /// # Parameters
    /// * `source` - detector image (width, height)
    /// * `display` - display surface (width, height)
    ///
    pub fn new(source: (f32, f32), display: (f32, f32)) -> Option<Self> {
        if source.0 > 0.0 && source.1 > 0.0 && display.0 > 0.0 && display.1 > 0.0 {
            Some(Self { source, display })
        } else {
            None
        }
    }

    pub fn scale(&self) -> (f32, f32) {
        (
            self.display.0 / self.source.0,
            self.display.1 / self.source.1,
        )
    }

    pub fn to_display(&self, bbox: &EdgeBox) -> EdgeBox {
        let (sx, sy) = self.scale();
        bbox.scale(sx, sy)
    }

    pub fn point_to_display(&self, x: f32, y: f32) -> (f32, f32) {
        let (sx, sy) = self.scale();
        (x * sx, y * sy)
    }

    /// Maps a display point (e.g. a touch) back into detector space for hit testing
    ///
    pub fn point_to_source(&self, x: f32, y: f32) -> (f32, f32) {
        let (sx, sy) = self.scale();
        (x / sx, y / sy)
    }
}
