use crate::trackers::stabilizer::options::{MatchingPolicy, StabilizerOptions};
use crate::trackers::stabilizer::{Detection, StabilizedSymbol, TrackingSession};
use crate::utils::bbox::EdgeBox;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

#[pyclass]
#[pyo3(name = "EdgeBox")]
#[derive(Clone, Copy, Debug)]
pub struct PyEdgeBox(pub(crate) EdgeBox);

#[pymethods]
impl PyEdgeBox {
    #[classattr]
    const __hash__: Option<Py<PyAny>> = None;

    #[new]
    #[pyo3(signature = (left, top, right, bottom))]
    fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self(EdgeBox::new(left, top, right, bottom))
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.0)
    }

    fn __str__(&self) -> String {
        self.__repr__()
    }

    #[getter]
    fn left(&self) -> f32 {
        self.0.left()
    }

    #[getter]
    fn top(&self) -> f32 {
        self.0.top()
    }

    #[getter]
    fn right(&self) -> f32 {
        self.0.right()
    }

    #[getter]
    fn bottom(&self) -> f32 {
        self.0.bottom()
    }

    fn center(&self) -> (f32, f32) {
        self.0.center()
    }

    #[pyo3(signature = (other, threshold = 30.0))]
    fn is_close(&self, other: &PyEdgeBox, threshold: f32) -> bool {
        self.0.is_close(&other.0, threshold)
    }

    fn manhattan_delta(&self, other: &PyEdgeBox) -> f32 {
        self.0.manhattan_delta(&other.0)
    }
}

#[pyclass]
#[pyo3(name = "StabilizedSymbol")]
#[derive(Clone, Debug)]
pub struct PyStabilizedSymbol(pub(crate) StabilizedSymbol);

#[pymethods]
impl PyStabilizedSymbol {
    fn __repr__(&self) -> String {
        format!("{:?}", self.0)
    }

    #[getter]
    fn track_id(&self) -> u64 {
        self.0.track_id
    }

    #[getter]
    fn key(&self) -> String {
        self.0.key.clone()
    }

    #[getter]
    fn bbox(&self) -> PyEdgeBox {
        PyEdgeBox(self.0.bbox)
    }

    #[getter]
    fn color(&self) -> (u8, u8, u8) {
        self.0.color.as_tuple()
    }

    #[getter]
    fn argb(&self) -> u32 {
        self.0.color.as_argb()
    }

    #[getter]
    fn region(&self) -> PyEdgeBox {
        PyEdgeBox(self.0.region.as_box())
    }

    #[getter]
    fn length(&self) -> usize {
        self.0.length
    }
}

#[pyclass]
#[pyo3(name = "TrackingSession")]
pub struct PyTrackingSession(pub(crate) TrackingSession);

#[pymethods]
impl PyTrackingSession {
    #[new]
    #[pyo3(signature = (
        closeness_threshold = 30.0,
        region_side = 100.0,
        max_idle_epochs = 0,
        nearest = false
    ))]
    fn new(
        closeness_threshold: f32,
        region_side: f32,
        max_idle_epochs: usize,
        nearest: bool,
    ) -> PyResult<Self> {
        let opts = StabilizerOptions::default()
            .closeness_threshold(closeness_threshold)
            .region_side(region_side)
            .max_idle_epochs(max_idle_epochs)
            .matching_policy(if nearest {
                MatchingPolicy::Nearest
            } else {
                MatchingPolicy::FirstMatch
            });
        TrackingSession::new(opts)
            .map(Self)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Processes the detections of one frame
    ///
    #[pyo3(signature = (detections))]
    fn update(
        &mut self,
        py: Python<'_>,
        detections: Vec<(String, PyEdgeBox)>,
    ) -> Vec<PyStabilizedSymbol> {
        let detections = detections
            .into_iter()
            .map(|(key, bbox)| Detection::new(key, bbox.0))
            .collect::<Vec<_>>();
        py.allow_threads(|| {
            self.0
                .update(&detections)
                .into_iter()
                .map(PyStabilizedSymbol)
                .collect()
        })
    }

    fn color_for(&self, key: &str) -> (u8, u8, u8) {
        self.0.color_for(key).as_tuple()
    }

    fn hit_test(&self, x: f32, y: f32) -> Option<PyStabilizedSymbol> {
        self.0.hit_test(x, y).cloned().map(PyStabilizedSymbol)
    }

    #[getter]
    fn epoch(&self) -> usize {
        self.0.epoch()
    }

    fn reset(&mut self) {
        self.0.reset()
    }
}

#[pymodule]
#[pyo3(name = "stabilizer")]
fn stabilizer_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<PyEdgeBox>()?;
    m.add_class::<PyStabilizedSymbol>()?;
    m.add_class::<PyTrackingSession>()?;
    Ok(())
}
