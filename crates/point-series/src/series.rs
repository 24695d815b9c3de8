//! Best-effort series construction across forecast steps.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::GriddedDataset;
use crate::error::{PointSeriesError, Result};
use crate::schedule::DatasetRequest;

/// Hours from cycle initialization.
pub type ForecastStep = u32;

/// A decoded dataset handle. Dropping it releases the underlying resources.
pub type DatasetHandle = Box<dyn GriddedDataset>;

/// External collaborator that fetches and decodes one dataset per request.
///
/// `Ok(None)` signals that the dataset is unavailable (network failure,
/// undersized payload, decode failure). Errors are treated the same way by
/// the pipeline: the step is skipped.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self, request: &DatasetRequest) -> Result<Option<DatasetHandle>>;
}

/// Fetch a dataset, turning unavailability into an error for the step.
pub async fn fetch_required(
    source: &dyn DatasetSource,
    request: &DatasetRequest,
) -> Result<DatasetHandle> {
    source.fetch(request).await?.ok_or_else(|| {
        PointSeriesError::fetch(format!(
            "{} unavailable for f{:03}",
            request.variable, request.step
        ))
    })
}

/// One value tagged with its forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample<T> {
    pub step: ForecastStep,
    pub value: T,
}

/// Samples in strictly increasing step order. Gaps are simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series<T> {
    samples: Vec<Sample<T>>,
}

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
        }
    }
}

impl<T> Series<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. Steps must be strictly increasing.
    pub fn push(&mut self, step: ForecastStep, value: T) -> Result<()> {
        if let Some(last) = self.samples.last() {
            if step <= last.step {
                return Err(PointSeriesError::OutOfOrderStep {
                    step,
                    previous: last.step,
                });
            }
        }
        self.samples.push(Sample { step, value });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample<T>] {
        &self.samples
    }

    pub fn steps(&self) -> Vec<ForecastStep> {
        self.samples.iter().map(|s| s.step).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample<T>> {
        self.samples.iter()
    }
}

impl<T: Clone> Series<T> {
    pub fn values(&self) -> Vec<T> {
        self.samples.iter().map(|s| s.value.clone()).collect()
    }
}

/// Produces one value for one forecast step.
#[async_trait]
pub trait StepExtractor: Send + Sync {
    type Output: Send;

    async fn extract_step(&self, step: ForecastStep) -> Result<Self::Output>;
}

/// A step that produced no sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStep {
    pub step: ForecastStep,
    pub reason: String,
}

/// Series plus the steps that were skipped building it.
#[derive(Debug, Clone)]
pub struct SeriesReport<T> {
    pub series: Series<T>,
    pub skipped: Vec<SkippedStep>,
}

impl<T> SeriesReport<T> {
    pub fn attempted(&self) -> usize {
        self.series.len() + self.skipped.len()
    }
}

/// Runs an extractor over a forecast schedule, one step at a time.
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    steps: Vec<ForecastStep>,
    label: String,
}

impl SeriesBuilder {
    /// Create a builder. Steps are sorted and deduplicated.
    pub fn new(label: impl Into<String>, mut steps: Vec<ForecastStep>) -> Self {
        steps.sort_unstable();
        steps.dedup();
        Self {
            steps,
            label: label.into(),
        }
    }

    pub fn steps(&self) -> &[ForecastStep] {
        &self.steps
    }

    /// Extract every step in increasing order.
    ///
    /// A failing step is logged and recorded as skipped; later steps still run.
    pub async fn build<E>(&self, extractor: &E) -> SeriesReport<E::Output>
    where
        E: StepExtractor + ?Sized,
    {
        let mut series = Series::new();
        let mut skipped = Vec::new();

        for &step in &self.steps {
            match extractor.extract_step(step).await {
                Ok(value) => {
                    debug!(product = %self.label, step = step, "Step extracted");
                    // Steps are sorted and unique, so this cannot fail.
                    if let Err(e) = series.push(step, value) {
                        warn!(
                            product = %self.label,
                            step = step,
                            error = %e,
                            "Dropped out-of-order sample"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        product = %self.label,
                        step = step,
                        error = %e,
                        "Skipping forecast step"
                    );
                    skipped.push(SkippedStep {
                        step,
                        reason: e.to_string(),
                    });
                }
            }
        }

        metrics::counter!("point_series_steps_succeeded_total", "product" => self.label.clone())
            .increment(series.len() as u64);
        metrics::counter!("point_series_steps_skipped_total", "product" => self.label.clone())
            .increment(skipped.len() as u64);

        info!(
            product = %self.label,
            attempted = self.steps.len(),
            succeeded = series.len(),
            skipped = skipped.len(),
            "Series built"
        );

        SeriesReport { series, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EveryThirdFails;

    #[async_trait]
    impl StepExtractor for EveryThirdFails {
        type Output = f64;

        async fn extract_step(&self, step: ForecastStep) -> Result<f64> {
            if (step / 6) % 3 == 2 {
                Err(PointSeriesError::fetch("unavailable"))
            } else {
                Ok(step as f64 / 10.0)
            }
        }
    }

    #[test]
    fn test_series_rejects_out_of_order() {
        let mut series = Series::new();
        series.push(0, 1.0).unwrap();
        series.push(6, 2.0).unwrap();
        assert!(matches!(
            series.push(6, 3.0),
            Err(PointSeriesError::OutOfOrderStep { step: 6, previous: 6 })
        ));
        assert!(series.push(3, 3.0).is_err());
        assert_eq!(series.steps(), vec![0, 6]);
    }

    #[test]
    fn test_builder_sorts_steps() {
        let builder = SeriesBuilder::new("test", vec![12, 0, 6, 6]);
        assert_eq!(builder.steps(), &[0, 6, 12]);
    }

    #[tokio::test]
    async fn test_build_skips_failed_steps() {
        let builder = SeriesBuilder::new("test", (0..=48).step_by(6).collect());
        let report = builder.build(&EveryThirdFails).await;

        assert_eq!(report.series.steps(), vec![0, 6, 18, 24, 36, 42]);
        assert_eq!(report.skipped.len(), 3);
        assert_eq!(report.attempted(), 9);
        assert_eq!(report.skipped[0].step, 12);
    }

    #[tokio::test]
    async fn test_build_empty_schedule() {
        let builder = SeriesBuilder::new("test", vec![]);
        let report = builder.build(&EveryThirdFails).await;
        assert!(report.series.is_empty());
        assert!(report.skipped.is_empty());
    }
}
