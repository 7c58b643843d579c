//! Feature construction for the demand forecaster.
//!
//! Each feature vector has a fixed shape known at compile time, so the
//! schema used at training time is guaranteed to match the one used at
//! prediction time. Features at a point `t` are: the load score at t-1,
//! t-2 and t-3, simple rolling means over the trailing 3/5/10 samples
//! (window ending at `t`), and the sample's hour-of-day and day-of-week
//! as plain numerics.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ScalecastError, ScalecastResult};
use crate::history::MetricHistory;
use crate::types::Timestamp;

/// Number of features in every vector
pub const FEATURE_COUNT: usize = 8;

/// Names of the features, index-aligned with `FeatureVector::values`
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "load_lag_1",
    "load_lag_2",
    "load_lag_3",
    "load_rolling_3",
    "load_rolling_5",
    "load_rolling_10",
    "hour_of_day",
    "day_of_week",
];

/// Samples of context required before a vector can be built at a point:
/// the widest rolling window (10) dominates the deepest lag (3).
pub const MIN_CONTEXT: usize = 10;

/// A fixed-shape feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: [f64; FEATURE_COUNT],
}

/// A feature vector paired with its training target (the next-step load score)
#[derive(Debug, Clone, Copy)]
pub struct TrainingRow {
    pub features: FeatureVector,
    pub target: f64,
}

/// Builds feature vectors from a metric history or a raw load-score tail
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Build one training row per usable offset in the history.
    ///
    /// Requires at least `MIN_CONTEXT + 1` samples (context for the vector
    /// plus a next-step target), otherwise `InsufficientHistory`.
    pub fn training_rows(&self, history: &MetricHistory) -> ScalecastResult<Vec<TrainingRow>> {
        let needed = MIN_CONTEXT + 1;
        if history.len() < needed {
            return Err(ScalecastError::insufficient_history(needed, history.len()));
        }

        let loads = history.load_scores();
        let timestamps: Vec<Timestamp> = history.iter().map(|s| s.timestamp).collect();

        let mut rows = Vec::with_capacity(loads.len() - MIN_CONTEXT);
        for t in (MIN_CONTEXT - 1)..loads.len() - 1 {
            let features = vector_at(&loads, t, timestamps[t])
                .expect("context length checked above");
            rows.push(TrainingRow {
                features,
                target: loads[t + 1],
            });
        }
        Ok(rows)
    }

    /// Build exactly one feature vector for the most recent point in the
    /// history, for live prediction.
    pub fn latest(&self, history: &MetricHistory) -> ScalecastResult<FeatureVector> {
        let latest = history
            .latest()
            .ok_or_else(|| ScalecastError::insufficient_history(MIN_CONTEXT, 0))?;
        self.latest_from_tail(&history.load_scores(), latest.timestamp)
    }

    /// Build a vector for the last point of a raw load-score tail.
    ///
    /// The tail may mix observed history with synthetic predictions; the
    /// forecaster uses this to feed multi-step predictions forward.
    pub fn latest_from_tail(
        &self,
        loads: &[f64],
        timestamp: Timestamp,
    ) -> ScalecastResult<FeatureVector> {
        if loads.len() < MIN_CONTEXT {
            return Err(ScalecastError::insufficient_history(
                MIN_CONTEXT,
                loads.len(),
            ));
        }
        Ok(vector_at(loads, loads.len() - 1, timestamp).expect("length checked above"))
    }
}

/// Features for point `t` of `loads`, or None when context is too short
fn vector_at(loads: &[f64], t: usize, timestamp: Timestamp) -> Option<FeatureVector> {
    if t < MIN_CONTEXT - 1 || t >= loads.len() {
        return None;
    }

    let rolling = |window: usize| -> f64 {
        let slice = &loads[t + 1 - window..=t];
        slice.iter().sum::<f64>() / window as f64
    };

    let (hour, day_of_week) = time_features(timestamp);

    Some(FeatureVector {
        values: [
            loads[t - 1],
            loads[t - 2],
            loads[t - 3],
            rolling(3),
            rolling(5),
            rolling(10),
            hour,
            day_of_week,
        ],
    })
}

/// Hour-of-day (0-23) and day-of-week (0-6, Monday = 0) for a Unix timestamp
fn time_features(timestamp: Timestamp) -> (f64, f64) {
    match DateTime::<Utc>::from_timestamp(timestamp as i64, 0) {
        Some(dt) => (
            dt.hour() as f64,
            dt.weekday().num_days_from_monday() as f64,
        ),
        None => (0.0, 0.0),
    }
}
