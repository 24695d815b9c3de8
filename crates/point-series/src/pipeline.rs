//! Per-product pipelines: fetch, extract, derive, publish.
//!
//! Each product walks the forecast schedule independently. A product with
//! no successful steps publishes nothing, which downstream readers take as
//! "no fresher data this run" rather than zero-valued data.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::accumulate::ResetAccumulator;
use crate::config::{ForecasterConfig, ProductToggles};
use crate::dataset::MergedDataset;
use crate::error::{PointSeriesError, Result};
use crate::extract::{FieldExtractor, PhysicalQuantity};
use crate::grid::TargetPoint;
use crate::output::{
    publish_record, OutputSink, PrecipTypeRecord, SnowAccumulationRecord, SnowRateRecord,
    TemperatureRecord,
};
use crate::precip::{classify, PrecipType};
use crate::schedule::{DatasetRequest, Level, ModelCycle};
use crate::series::{
    fetch_required, DatasetSource, ForecastStep, SeriesBuilder, SkippedStep, StepExtractor,
};
use crate::units::round_to;

/// Published products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    SnowAccumulation,
    SnowRate,
    Temperature,
    PrecipType,
}

impl Product {
    pub const ALL: [Product; 4] = [
        Product::SnowAccumulation,
        Product::SnowRate,
        Product::Temperature,
        Product::PrecipType,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Product::SnowAccumulation => "snow_accumulation",
            Product::SnowRate => "snow_rate",
            Product::Temperature => "temperature",
            Product::PrecipType => "precip_type",
        }
    }

    /// Parse a product label as used on the command line.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.label() == label)
    }

    /// Published file name for a site.
    pub fn file_name(&self, slug: &str) -> String {
        let suffix = match self {
            Product::SnowAccumulation => "snod_forecast_running_positive_accum_in",
            Product::SnowRate => "hourly_snow_rate",
            Product::Temperature => "975mb_temp_F",
            Product::PrecipType => "precip_type",
        };
        format!("{}_{}.json", slug, suffix)
    }

    pub fn enabled(&self, toggles: &ProductToggles) -> bool {
        match self {
            Product::SnowAccumulation => toggles.snow_accumulation,
            Product::SnowRate => toggles.snow_rate,
            Product::Temperature => toggles.temperature,
            Product::PrecipType => toggles.precip_type,
        }
    }
}

/// Record produced by one product run, plus step bookkeeping.
#[derive(Debug, Clone)]
pub struct ProductRun<R> {
    /// `None` when no step succeeded.
    pub record: Option<R>,
    pub attempted: usize,
    pub skipped: Vec<SkippedStep>,
}

impl<R> ProductRun<R> {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.skipped.len()
    }
}

/// Outcome of running and publishing one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub product: Product,
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    /// File name handed to the sink, if anything was published.
    pub published: Option<String>,
}

/// Fetches one variable per step and extracts a single converted value.
struct ScalarStep<'a> {
    source: &'a dyn DatasetSource,
    cycle: ModelCycle,
    variable: &'static str,
    level: Level,
    extractor: FieldExtractor,
    decimals: Option<u32>,
}

#[async_trait]
impl StepExtractor for ScalarStep<'_> {
    type Output = f64;

    async fn extract_step(&self, step: ForecastStep) -> Result<f64> {
        let request = DatasetRequest::new(self.cycle, step, self.variable, self.level);
        let value = {
            // The handle is dropped at the end of this block on every path.
            let dataset = fetch_required(self.source, &request).await?;
            self.extractor.extract(dataset.as_ref())?.value
        };
        Ok(match self.decimals {
            Some(d) => round_to(value, d),
            None => value,
        })
    }
}

/// Fetches precipitation rate and categorical snow per step and classifies.
struct PrecipStep<'a> {
    source: &'a dyn DatasetSource,
    cycle: ModelCycle,
    rate: FieldExtractor,
    snow: FieldExtractor,
}

#[async_trait]
impl StepExtractor for PrecipStep<'_> {
    type Output = PrecipType;

    async fn extract_step(&self, step: ForecastStep) -> Result<PrecipType> {
        let rate_request = DatasetRequest::new(self.cycle, step, "PRATE", Level::Surface);
        let snow_request = DatasetRequest::new(self.cycle, step, "CSNOW", Level::Surface);

        let rate_ds = fetch_required(self.source, &rate_request).await?;
        let snow_ds = fetch_required(self.source, &snow_request).await?;
        let merged = MergedDataset::new(rate_ds.as_ref(), snow_ds.as_ref());

        let rate = self.rate.extract(&merged)?.value;
        let snow = match self.snow.extract(&merged) {
            Ok(extraction) => extraction.value,
            Err(PointSeriesError::VariableNotFound(_)) => 0.0,
            Err(e) => return Err(e),
        };

        Ok(classify(rate, snow))
    }
}

/// Runs the products for one site and model cycle.
///
/// Holds no state between runs; identical inputs give identical outputs.
pub struct ForecastPipeline {
    source: Arc<dyn DatasetSource>,
    target: TargetPoint,
    slug: String,
    steps: Vec<ForecastStep>,
    cycle: ModelCycle,
}

impl ForecastPipeline {
    pub fn new(
        source: Arc<dyn DatasetSource>,
        config: &ForecasterConfig,
        cycle: ModelCycle,
    ) -> Self {
        Self {
            source,
            target: config.site.target(),
            slug: config.site.slug.clone(),
            steps: config.schedule.steps(),
            cycle,
        }
    }

    pub fn cycle(&self) -> ModelCycle {
        self.cycle
    }

    fn scalar_step(
        &self,
        variable: &'static str,
        level: Level,
        extractor: FieldExtractor,
        decimals: Option<u32>,
    ) -> ScalarStep<'_> {
        ScalarStep {
            source: self.source.as_ref(),
            cycle: self.cycle,
            variable,
            level,
            extractor,
            decimals,
        }
    }

    /// Storm-total snow accumulation from surface snow depth.
    pub async fn snow_accumulation(&self) -> ProductRun<SnowAccumulationRecord> {
        let step = self.scalar_step(
            "SNOD",
            Level::Surface,
            FieldExtractor::new(PhysicalQuantity::SnowDepth, self.target),
            Some(3),
        );
        let report = SeriesBuilder::new(Product::SnowAccumulation.label(), self.steps.clone())
            .build(&step)
            .await;

        let record = (!report.series.is_empty()).then(|| SnowAccumulationRecord {
            forecast_hours: report.series.steps(),
            running_positive_accum_in: ResetAccumulator::storm_total()
                .run(&report.series.values()),
        });

        ProductRun {
            record,
            attempted: report.attempted(),
            skipped: report.skipped,
        }
    }

    /// Incremental snowfall rate from the `sde` snow depth variable.
    pub async fn snow_rate(&self) -> ProductRun<SnowRateRecord> {
        let step = self.scalar_step(
            "SNOD",
            Level::Surface,
            FieldExtractor::new(PhysicalQuantity::SnowDepth, self.target).pinned("sde"),
            None,
        );
        let report = SeriesBuilder::new(Product::SnowRate.label(), self.steps.clone())
            .build(&step)
            .await;

        let record = (!report.series.is_empty()).then(|| SnowRateRecord {
            forecast_hours: report.series.steps(),
            hourly_snowfall_rates: ResetAccumulator::hourly_rate().run(&report.series.values()),
        });

        ProductRun {
            record,
            attempted: report.attempted(),
            skipped: report.skipped,
        }
    }

    /// 975 mb temperature in degrees Fahrenheit.
    pub async fn temperature(&self) -> ProductRun<TemperatureRecord> {
        let step = self.scalar_step(
            "TMP",
            Level::Isobaric(975),
            FieldExtractor::new(PhysicalQuantity::Temperature, self.target),
            Some(2),
        );
        let report = SeriesBuilder::new(Product::Temperature.label(), self.steps.clone())
            .build(&step)
            .await;

        let record = (!report.series.is_empty()).then(|| TemperatureRecord {
            forecast_hours: report.series.steps(),
            temps_975mb_f: report.series.values(),
        });

        ProductRun {
            record,
            attempted: report.attempted(),
            skipped: report.skipped,
        }
    }

    /// Snow / rain / none classification per step.
    pub async fn precip_type(&self) -> ProductRun<PrecipTypeRecord> {
        let step = PrecipStep {
            source: self.source.as_ref(),
            cycle: self.cycle,
            rate: FieldExtractor::new(PhysicalQuantity::PrecipitationRate, self.target)
                .pinned("prate"),
            snow: FieldExtractor::new(PhysicalQuantity::CategoricalSnow, self.target)
                .pinned("csnow"),
        };
        let report = SeriesBuilder::new(Product::PrecipType.label(), self.steps.clone())
            .build(&step)
            .await;

        let record = (!report.series.is_empty()).then(|| PrecipTypeRecord {
            forecast_hours: report.series.steps(),
            precipitation_types: report.series.values(),
        });

        ProductRun {
            record,
            attempted: report.attempted(),
            skipped: report.skipped,
        }
    }

    /// Run one product and publish its record if any step succeeded.
    pub async fn run_product(
        &self,
        product: Product,
        sink: &dyn OutputSink,
    ) -> Result<ProductSummary> {
        let file_name = product.file_name(&self.slug);

        let (published, attempted, skipped) = match product {
            Product::SnowAccumulation => {
                let run = self.snow_accumulation().await;
                self.publish(sink, &file_name, run)?
            }
            Product::SnowRate => {
                let run = self.snow_rate().await;
                self.publish(sink, &file_name, run)?
            }
            Product::Temperature => {
                let run = self.temperature().await;
                self.publish(sink, &file_name, run)?
            }
            Product::PrecipType => {
                let run = self.precip_type().await;
                self.publish(sink, &file_name, run)?
            }
        };

        let summary = ProductSummary {
            product,
            attempted,
            succeeded: attempted - skipped,
            skipped,
            published,
        };

        info!(
            product = product.label(),
            cycle = %self.cycle,
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            published = summary.published.is_some(),
            "Product run complete"
        );

        Ok(summary)
    }

    /// Run every enabled product in a fixed order.
    pub async fn run(
        &self,
        toggles: &ProductToggles,
        sink: &dyn OutputSink,
    ) -> Result<Vec<ProductSummary>> {
        let mut summaries = Vec::new();
        for product in Product::ALL {
            if product.enabled(toggles) {
                summaries.push(self.run_product(product, sink).await?);
            }
        }
        Ok(summaries)
    }

    fn publish<R: Serialize>(
        &self,
        sink: &dyn OutputSink,
        file_name: &str,
        run: ProductRun<R>,
    ) -> Result<(Option<String>, usize, usize)> {
        let published = match &run.record {
            Some(record) => {
                publish_record(sink, file_name, record)?;
                Some(file_name.to_string())
            }
            None => {
                info!(file = %file_name, "No steps succeeded, nothing published");
                None
            }
        };
        Ok((published, run.attempted, run.skipped.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(
            Product::SnowAccumulation.file_name("whiteface"),
            "whiteface_snod_forecast_running_positive_accum_in.json"
        );
        assert_eq!(
            Product::SnowRate.file_name("whiteface"),
            "whiteface_hourly_snow_rate.json"
        );
        assert_eq!(
            Product::Temperature.file_name("whiteface"),
            "whiteface_975mb_temp_F.json"
        );
        assert_eq!(
            Product::PrecipType.file_name("whiteface"),
            "whiteface_precip_type.json"
        );
    }

    #[test]
    fn test_product_labels_round_trip() {
        for product in Product::ALL {
            assert_eq!(Product::from_label(product.label()), Some(product));
        }
        assert_eq!(Product::from_label("wind"), None);
    }

    #[test]
    fn test_enabled_toggles() {
        let toggles = ProductToggles {
            snow_rate: false,
            ..Default::default()
        };
        assert!(Product::SnowAccumulation.enabled(&toggles));
        assert!(!Product::SnowRate.enabled(&toggles));
    }
}
