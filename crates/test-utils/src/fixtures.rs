//! Common test fixtures: the reference site, scripted dataset sources and
//! an in-memory output sink.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use point_series::{
    CoordinateArray, DatasetHandle, DatasetRequest, DatasetSource, DecodedDataset, Field,
    ForecastStep, GridIndex, GriddedDataset, OutputSink, PointSeriesError, Result, TargetPoint,
};

/// Whiteface Mountain summit latitude.
pub const WHITEFACE_LAT: f64 = 44.3659;

/// Whiteface Mountain summit longitude.
pub const WHITEFACE_LON: f64 = -73.9023;

/// Nearest cell to Whiteface in [`crate::gfs_window`].
pub const WHITEFACE_CELL: GridIndex = GridIndex { row: 3, col: 2 };

pub fn whiteface_target() -> TargetPoint {
    TargetPoint::new(WHITEFACE_LAT, WHITEFACE_LON)
}

/// Counts dataset handles that have not been dropped yet.
#[derive(Debug, Default)]
struct HandleTracker {
    live: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
}

/// A dataset handle that reports its release to the tracker on drop.
struct TrackedDataset {
    inner: DecodedDataset,
    tracker: Arc<HandleTracker>,
}

impl TrackedDataset {
    fn open(inner: DecodedDataset, tracker: Arc<HandleTracker>) -> Self {
        let live = tracker.live.fetch_add(1, Ordering::SeqCst) + 1;
        tracker.peak.fetch_max(live, Ordering::SeqCst);
        tracker.opened.fetch_add(1, Ordering::SeqCst);
        Self { inner, tracker }
    }
}

impl Drop for TrackedDataset {
    fn drop(&mut self) {
        self.tracker.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl GriddedDataset for TrackedDataset {
    fn variable_names(&self) -> Vec<&str> {
        self.inner.variable_names()
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.inner.field(name)
    }

    fn coordinate(&self, name: &str) -> Option<&CoordinateArray> {
        self.inner.coordinate(name)
    }
}

/// In-memory [`DatasetSource`] keyed by (GRIB variable, step).
///
/// Unknown keys are unavailable (`Ok(None)`); keys marked with
/// [`ScriptedSource::fail`] return a fetch error.
#[derive(Default)]
pub struct ScriptedSource {
    datasets: HashMap<(String, ForecastStep), DecodedDataset>,
    failures: HashSet<(String, ForecastStep)>,
    tracker: Arc<HandleTracker>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the dataset returned for `variable` at `step`.
    pub fn insert(&mut self, variable: &str, step: ForecastStep, dataset: DecodedDataset) {
        self.datasets.insert((variable.to_string(), step), dataset);
    }

    /// Builder form of [`ScriptedSource::insert`].
    pub fn with(mut self, variable: &str, step: ForecastStep, dataset: DecodedDataset) -> Self {
        self.insert(variable, step, dataset);
        self
    }

    /// Make `variable` at `step` fail with a fetch error.
    pub fn fail(mut self, variable: &str, step: ForecastStep) -> Self {
        self.failures.insert((variable.to_string(), step));
        self
    }

    /// Handles currently open.
    pub fn live_handles(&self) -> usize {
        self.tracker.live.load(Ordering::SeqCst)
    }

    /// Most handles open at the same time.
    pub fn peak_handles(&self) -> usize {
        self.tracker.peak.load(Ordering::SeqCst)
    }

    /// Total handles handed out.
    pub fn opened_handles(&self) -> usize {
        self.tracker.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetSource for ScriptedSource {
    async fn fetch(&self, request: &DatasetRequest) -> Result<Option<DatasetHandle>> {
        let key = (request.variable.clone(), request.step);
        if self.failures.contains(&key) {
            return Err(PointSeriesError::fetch(format!(
                "scripted failure for {} f{:03}",
                request.variable, request.step
            )));
        }
        Ok(self.datasets.get(&key).map(|ds| {
            Box::new(TrackedDataset::open(ds.clone(), self.tracker.clone())) as DatasetHandle
        }))
    }
}

/// Sink that keeps published documents in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    documents: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// File names in publish order.
    pub fn file_names(&self) -> Vec<String> {
        self.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Most recent document published under `file_name`.
    pub fn get(&self, file_name: &str) -> Option<serde_json::Value> {
        self.lock()
            .iter()
            .rev()
            .find(|(name, _)| name == file_name)
            .map(|(_, doc)| doc.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, serde_json::Value)>> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl OutputSink for RecordingSink {
    fn publish(&self, file_name: &str, document: &serde_json::Value) -> Result<()> {
        self.lock().push((file_name.to_string(), document.clone()));
        Ok(())
    }
}
