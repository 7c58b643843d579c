// demos/predictive_scaling.rs
//! Predictive scaling walkthrough without the engine loop
//!
//! Drives the pipeline components directly: history -> forecaster ->
//! anomaly detector -> decision engine, over three load scenarios.
//!
//! Run with: cargo run --example predictive_scaling

use scalecast::{
    utils, AnomalyDetector, DecisionEngine, Forecaster, MetricHistory, ScalecastConfig,
    ScalingState,
};

fn drive_scenario(name: &str, loads: &[f64]) {
    println!("\n=== {} ===", name);

    let config = ScalecastConfig::default();
    let mut history = MetricHistory::new(config.history_capacity);
    let base = utils::current_timestamp() - loads.len() as u64 * 60;
    for (i, &load) in loads.iter().enumerate() {
        history.push(utils::sample_with_load(base + i as u64 * 60, load));
    }

    let mut forecaster = Forecaster::new(&config);
    match forecaster.maybe_train(&history, loads.len() as u64) {
        Ok(true) => {
            let model = forecaster.model().unwrap();
            println!("model trained, validation R² = {:.3}", model.r_squared);
        }
        Ok(false) => println!("not enough history to train yet"),
        Err(e) => println!("training failed: {}", e),
    }

    let predictions = forecaster.forecast(&history).ok();
    if let Some(p) = &predictions {
        println!(
            "forecast steps 1-3: {:.1} / {:.1} / {:.1} (confidence {:.2} / {:.2} / {:.2})",
            p[0].predicted_load,
            p[1].predicted_load,
            p[2].predicted_load,
            p[0].confidence,
            p[1].confidence,
            p[2].confidence,
        );
    }

    let anomaly = AnomalyDetector::new(&config).evaluate(&history);
    println!("anomaly signal: {:?}", anomaly);

    let engine = DecisionEngine::new(config);
    let mut state = ScalingState::new(2);
    let decision = engine.decide(
        utils::current_timestamp(),
        predictions.as_deref(),
        anomaly,
        &mut state,
    );
    println!(
        "decision: {:?} -> {} instances ({}), est. ${:.2}/day",
        decision.action, decision.target_instances, decision.reason, decision.estimated_cost
    );
}

fn main() {
    tracing_subscriber::fmt::init();

    // Rising demand: the forecast crosses the upper threshold
    let ramp: Vec<f64> = (0..25).map(|i| 60.0 + 35.0 * i as f64 / 24.0).collect();
    drive_scenario("rising demand", &ramp);

    // Quiet period: qualifying forecast under the lower threshold
    let quiet: Vec<f64> = (0..25).map(|i| 20.0 + (i % 4) as f64).collect();
    drive_scenario("quiet period", &quiet);

    // Stable load with a sudden spike: the reactive path fires
    let mut spiky: Vec<f64> = (0..24)
        .map(|i| 40.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
        .collect();
    spiky.push(95.0);
    drive_scenario("sudden spike", &spiky);
}
