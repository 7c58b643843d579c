//! # Scalecast - Predictive Autoscaling Decisions
//!
//! Scalecast watches a resource's load signal over time and decides, on a
//! fixed cadence, whether to change the number of provisioned instances. It
//! combines a short-horizon demand forecast with a statistical anomaly
//! check, so decisions rest on where the load is heading rather than only
//! on the current sample.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Scalecast Engine                          │
//! ├────────────────┬────────────────┬────────────────┬───────────────┤
//! │ MetricHistory  │  Forecaster    │ AnomalyDetector│ DecisionEngine│
//! │                │                │                │               │
//! │ • Bounded FIFO │ • OLS fit      │ • Z-score test │ • Cooldown    │
//! │ • Load scores  │ • Held-out R²  │ • Trailing     │ • Cost gate   │
//! │ • Snapshots    │ • Multi-step   │   window       │ • Thresholds  │
//! └────────────────┴────────────────┴────────────────┴───────────────┘
//!                                  │
//!                        ┌─────────▼─────────┐
//!                        │   Your Callbacks  │
//!                        │                   │
//!                        │ • MetricSource    │
//!                        │ • CapacityController
//!                        │ • DecisionObserver│
//!                        └───────────────────┘
//! ```
//!
//! Samples flow in (pulled from a [`MetricSource`] on the ingestion tick or
//! pushed through the handle), land in a bounded [`MetricHistory`], and on
//! each decision tick the engine retrains the forecaster if enough new data
//! accumulated, forecasts the load score several steps ahead, checks the
//! newest sample for anomalies, and emits exactly one [`ScalingDecision`].
//! Accepted actions open a cooldown window and are handed to your
//! [`CapacityController`] outside the core's critical section.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use scalecast::{
//!     ScalecastEngine, ScalecastConfig, ScalecastCallbacks,
//!     MetricSource, CapacityController, CallbackContext,
//!     MetricSample, ScalingDecision, ScalecastResult,
//! };
//! use std::sync::Arc;
//!
//! struct MySource;
//! #[async_trait::async_trait]
//! impl MetricSource for MySource {
//!     async fn collect(
//!         &self,
//!         _context: &CallbackContext,
//!     ) -> ScalecastResult<Option<MetricSample>> {
//!         Ok(None) // plug your OS/agent sampling in here
//!     }
//! }
//!
//! struct MyController;
//! #[async_trait::async_trait]
//! impl CapacityController for MyController {
//!     async fn apply_decision(
//!         &self,
//!         _decision: &ScalingDecision,
//!         _context: &CallbackContext,
//!     ) -> ScalecastResult<bool> {
//!         Ok(true) // provision/deprovision capacity here
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> ScalecastResult<()> {
//!     let config = ScalecastConfig::builder()
//!         .ingestion_interval(60)
//!         .decision_interval(300)
//!         .instance_bounds(1, 10)
//!         .daily_cost_budget(24.0)
//!         .build();
//!
//!     let callbacks = ScalecastCallbacks::new(Arc::new(MySource), Arc::new(MyController));
//!     let engine = ScalecastEngine::new(config, callbacks)?;
//!     let handle = engine.handle();
//!
//!     tokio::spawn(async move { engine.start().await });
//!
//!     // Observe decisions as they are made
//!     let decision = handle.latest_decision().await?;
//!     println!("{:?}", decision);
//!     Ok(())
//! }
//! ```
//!
//! ## Behavior guarantees
//!
//! - History length never exceeds its capacity; insertion order preserved.
//! - Forecast confidence never increases with the horizon step.
//! - At most one non-no_op decision is accepted per cooldown window.
//! - Instance counts always stay within the configured bounds.
//! - Cold starts report typed "not ready" results, never a zero-load guess.

pub mod error;
pub mod utils;
pub mod types;
pub mod history;
pub mod features;
pub mod forecaster;
pub mod anomaly;
pub mod decision;
pub mod engine;
pub mod callbacks;

// Re-export common types for convenience
pub use types::{
    DecisionReason, LoadScoreParams, MetricSample, Prediction, ScaleAction, ScalecastConfig,
    ScalecastConfigBuilder, ScalingDecision, ScalingState, Timestamp,
};

pub use error::{ScalecastError, ScalecastResult};

pub use callbacks::{
    CallbackContext, CapacityController, DecisionObserver, MetricSource, ScalecastCallbacks,
};

pub use engine::{EngineStatus, ScalecastEngine, ScalecastHandle};

pub use anomaly::{AnomalyDetector, AnomalySignal};
pub use decision::DecisionEngine;
pub use features::{FeatureBuilder, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use forecaster::{ForecastModel, Forecaster};
pub use history::{HistorySummary, MetricHistory};
