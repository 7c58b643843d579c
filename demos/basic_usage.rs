// demos/basic_usage.rs
//! Basic usage example showing core Scalecast functionality
//!
//! This example demonstrates:
//! - Setting up the engine with a metric source and capacity controller
//! - Pushing samples through the handle
//! - Reading decisions, predictions, and status
//!
//! Run with: cargo run --example basic_usage

use scalecast::{
    utils, CallbackContext, CapacityController, MetricSource, MetricSample, ScalecastCallbacks,
    ScalecastConfig, ScalecastEngine, ScalecastResult, ScalingDecision,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Metric source that stays quiet; this demo pushes samples through the handle
struct PushOnlySource;

#[async_trait]
impl MetricSource for PushOnlySource {
    async fn collect(&self, _context: &CallbackContext) -> ScalecastResult<Option<MetricSample>> {
        Ok(None)
    }
}

/// Controller that just prints what it would provision
struct PrintingController;

#[async_trait]
impl CapacityController for PrintingController {
    async fn apply_decision(
        &self,
        decision: &ScalingDecision,
        _context: &CallbackContext,
    ) -> ScalecastResult<bool> {
        println!(
            "⚙️  Applying: {:?} -> {} instances ({})",
            decision.action, decision.target_instances, decision.reason
        );
        Ok(true)
    }
}

#[tokio::main]
async fn main() -> ScalecastResult<()> {
    tracing_subscriber::fmt::init();

    let config = ScalecastConfig::builder()
        .ingestion_interval(3600) // this demo pushes samples itself
        .decision_interval(2)
        .instance_bounds(1, 10)
        .daily_cost_budget(24.0)
        .build();

    let callbacks = ScalecastCallbacks::new(Arc::new(PushOnlySource), Arc::new(PrintingController));
    let engine = ScalecastEngine::new(config, callbacks)?;
    let handle = engine.handle();

    tokio::spawn(async move {
        engine.start().await.unwrap();
    });

    // Feed a rising load: the forecaster trains once enough history exists
    println!("📊 Feeding a rising load signal...");
    let base = utils::current_timestamp() - 25 * 60;
    for i in 0..25u64 {
        let load = 55.0 + 40.0 * i as f64 / 24.0;
        handle.submit(utils::sample_with_load(base + i * 60, load)).await?;
    }

    sleep(Duration::from_secs(5)).await;

    match handle.latest_predictions().await {
        Ok(predictions) => {
            println!("🔮 Forecast:");
            for p in predictions.iter().take(5) {
                println!(
                    "   step {}: load {:.1} (confidence {:.2})",
                    p.horizon_step, p.predicted_load, p.confidence
                );
            }
        }
        Err(e) => println!("🔮 No forecast yet: {}", e),
    }

    if let Some(decision) = handle.latest_decision().await? {
        println!(
            "🎯 Latest decision: {:?} -> {} instances ({}), est. ${:.2}/day",
            decision.action, decision.target_instances, decision.reason, decision.estimated_cost
        );
    }

    let status = handle.status().await?;
    println!(
        "📈 Status: {} samples, {} decisions, {} instances",
        status.samples_ingested, status.decisions_made, status.current_instances
    );

    handle.shutdown().await?;
    Ok(())
}
