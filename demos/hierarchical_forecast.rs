//! Roll a small store table up to country level, forecast every series and
//! make the forecast coherent again.
//!
//! ```sh
//! RUST_LOG=hails=debug cargo run --example hierarchical_forecast
//! ```

use hails::forecast::{Forecaster, LinearConfig, ShiftNormalizedLinear, TrendSeasonalLinear};
use hails::hierarchy::{HealthCheck, HierarchyAggregator, HierarchyTable};
use hails::reconciliation::{reconcile_forecast, ReconciliationMethod};
use ndarray::{s, ArrayView1};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const STEPS: usize = 60;
const SEQ_LEN: usize = 48;
const PRED_LEN: usize = 6;

fn store_table() -> hails::Result<HierarchyTable> {
    let stores = [
        ("US", "East", "nyc"),
        ("US", "East", "boston"),
        ("US", "West", "sf"),
        ("US", "West", "seattle"),
        ("US", "West", "la"),
    ];
    let records: Vec<_> = stores
        .iter()
        .enumerate()
        .map(|(k, &(country, region, store))| {
            let level = 50.0 + 10.0 * k as f64;
            let values: Vec<f64> = (0..STEPS)
                .map(|t| {
                    let weekly = (2.0 * std::f64::consts::PI * t as f64 / 7.0).sin();
                    level + 0.3 * t as f64 + 5.0 * weekly
                })
                .collect();
            (vec![country, region, store], values)
        })
        .collect();
    HierarchyTable::from_records(&["Country", "Region", "Store"], records)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hails=debug".into()),
        )
        .init();

    let table = store_table()?;
    let agg = HierarchyAggregator::new(["Country", "Region", "Store"]).aggregate(&table)?;

    println!("{}", agg.health_check());
    for level in agg.levels() {
        let labels: Vec<String> = level.labels().iter().map(|l| l.join("/")).collect();
        println!("{:>8} rows {:?}: {}", level.name(), level.rows(), labels.join(", "));
    }
    println!("aggregation matrix:\n{}", agg.aggregation());

    let window = agg.to_window();
    let history = window.slice(s![.., ..SEQ_LEN, ..]);
    let actual = window.slice(s![0, SEQ_LEN..SEQ_LEN + PRED_LEN, ..]);
    let config = LinearConfig::new(SEQ_LEN, PRED_LEN, agg.total_series())
        .with_kernel_size(7)
        .with_seed(42);

    let models: Vec<(&str, Box<dyn Forecaster>)> = vec![
        ("trend-seasonal", Box::new(TrendSeasonalLinear::new(config.clone())?)),
        ("shift-normalized", Box::new(ShiftNormalizedLinear::new(config)?)),
    ];

    let summing = agg.summing_matrix();
    for (name, model) in &models {
        let base = model.forecast(history)?;
        let coherent = reconcile_forecast(&summing, base.view(), &ReconciliationMethod::Ols)?;

        let step: ArrayView1<'_, f64> = coherent.slice(s![0, 0, ..]);
        let total_gap = step[0] - step.slice(s![agg.leaf_level().rows()]).sum();
        let mae = (&coherent.slice(s![0, .., ..]) - &actual)
            .mapv(f64::abs)
            .mean()
            .unwrap_or(f64::NAN);
        println!("{name}: total - sum(leaves) = {total_gap:.2e}, mae (untrained) = {mae:.2}");
    }
    Ok(())
}
