//! Point forecast publisher.
//!
//! Runs once per invocation (typically from cron after each GFS cycle):
//! - Selects the newest model cycle past its availability delay
//! - Reads decoded datasets for every scheduled step from the data directory
//! - Extracts the site value, derives each product series
//! - Publishes one JSON document per product that has any data

mod source;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use point_series::{
    ForecastPipeline, ForecasterConfig, JsonFileSink, ModelCycle, Product, ProductSummary,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use source::DirectorySource;

#[derive(Parser, Debug)]
#[command(name = "forecaster")]
#[command(about = "Publish point forecast series for a single site")]
struct Args {
    /// YAML configuration file (defaults plus environment when omitted)
    #[arg(short, long, env = "FORECASTER_CONFIG")]
    config: Option<PathBuf>,

    /// Model cycle as YYYYMMDDHH (default: latest available)
    #[arg(long)]
    cycle: Option<String>,

    /// Product to run; repeat for several (default: all enabled)
    #[arg(short, long, value_parser = parse_product)]
    product: Vec<Product>,

    /// Root of the decoded dataset tree
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory JSON documents are published to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_product(s: &str) -> std::result::Result<Product, String> {
    Product::from_label(s).ok_or_else(|| {
        let known: Vec<&str> = Product::ALL.iter().map(|p| p.label()).collect();
        format!("unknown product '{}' (expected one of {})", s, known.join(", "))
    })
}

fn load_config(args: &Args) -> Result<ForecasterConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = ForecasterConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config
                .apply_env_overrides()
                .context("Invalid environment override")?;
            config
        }
        None => ForecasterConfig::from_env().context("Invalid environment configuration")?,
    };

    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;

    let cycle = match &args.cycle {
        Some(s) => ModelCycle::parse(s)?,
        None => ModelCycle::latest_available(
            chrono::Utc::now(),
            config.cycle.availability_delay_hours,
            config.cycle.interval_hours,
        ),
    };

    info!(
        site = %config.site.name,
        lat = config.site.latitude,
        lon = config.site.longitude,
        cycle = %cycle,
        steps = config.schedule.steps().len(),
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        "Starting point forecast run"
    );

    let source = Arc::new(DirectorySource::new(&config.data_dir));
    let sink = JsonFileSink::new(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    let pipeline = ForecastPipeline::new(source, &config, cycle);

    let summaries = if args.product.is_empty() {
        pipeline.run(&config.products, &sink).await?
    } else {
        let mut summaries = Vec::with_capacity(args.product.len());
        for product in &args.product {
            summaries.push(pipeline.run_product(*product, &sink).await?);
        }
        summaries
    };

    report(&summaries);
    Ok(())
}

fn report(summaries: &[ProductSummary]) {
    let published = summaries.iter().filter(|s| s.published.is_some()).count();

    for summary in summaries {
        match &summary.published {
            Some(file) => info!(
                product = summary.product.label(),
                file = %file,
                succeeded = summary.succeeded,
                skipped = summary.skipped,
                "Product published"
            ),
            None => warn!(
                product = summary.product.label(),
                attempted = summary.attempted,
                "Product had no data; previous output left in place"
            ),
        }
    }

    info!(
        products = summaries.len(),
        published = published,
        "Point forecast run complete"
    );
}
