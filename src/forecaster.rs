//! Short-horizon demand forecasting.
//!
//! The forecaster fits a linear model (closed-form ordinary least squares
//! over the fixed feature schema, no external numerics runtime) mapping a
//! feature vector to the next-step load score. A held-out trailing slice of
//! the training rows provides an R-squared that becomes the base confidence;
//! multi-step predictions feed forward as synthetic observations with
//! multiplicatively decayed confidence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ScalecastError, ScalecastResult};
use crate::features::{FeatureBuilder, FeatureVector, TrainingRow, FEATURE_COUNT, MIN_CONTEXT};
use crate::history::MetricHistory;
use crate::types::{Prediction, ScalecastConfig, Timestamp};

/// Coefficients plus intercept
const DIM: usize = FEATURE_COUNT + 1;

/// Pivot magnitudes below this are treated as singular
const PIVOT_EPSILON: f64 = 1e-12;

/// A fitted model. Replaced wholesale on each retrain, never mutated;
/// shared as `Arc<ForecastModel>` so readers always see a complete model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastModel {
    /// Per-feature weights, index-aligned with the feature schema
    pub weights: [f64; FEATURE_COUNT],
    pub intercept: f64,
    /// Fit quality on the held-out trailing slice, clamped to [0, 1]
    pub r_squared: f64,
    /// When the model was fitted (Unix seconds)
    pub trained_at: Timestamp,
    /// Number of rows the fit used (excluding the held-out slice)
    pub training_rows: usize,
}

impl ForecastModel {
    /// Predict the next-step load score for one feature vector
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let dot: f64 = self
            .weights
            .iter()
            .zip(features.values.iter())
            .map(|(w, x)| w * x)
            .sum();
        self.intercept + dot
    }
}

/// Maintains the current model and turns it into an H-step-ahead forecast
pub struct Forecaster {
    builder: FeatureBuilder,
    model: Option<Arc<ForecastModel>>,
    /// Total ingested-sample count at the time of the last training
    last_train_total: u64,
    training_batch_size: usize,
    min_training_size: usize,
    forecast_horizon: usize,
    confidence_decay: f64,
    ingestion_interval_s: u64,
}

impl Forecaster {
    pub fn new(config: &ScalecastConfig) -> Self {
        Self {
            builder: FeatureBuilder,
            model: None,
            last_train_total: 0,
            training_batch_size: config.training_batch_size,
            min_training_size: config.min_training_size,
            forecast_horizon: config.forecast_horizon,
            confidence_decay: config.confidence_decay,
            ingestion_interval_s: config.ingestion_interval_s,
        }
    }

    /// Cheap shared reference to the current model, if any
    pub fn model(&self) -> Option<Arc<ForecastModel>> {
        self.model.clone()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Retrain when enough new samples have accumulated since the last
    /// training and the history is large enough. Returns `Ok(true)` when a
    /// new model was fitted. On `TrainingFailed` the previous model (if any)
    /// is retained unchanged.
    pub fn maybe_train(
        &mut self,
        history: &MetricHistory,
        total_ingested: u64,
    ) -> ScalecastResult<bool> {
        let new_samples = total_ingested.saturating_sub(self.last_train_total);
        if self.is_trained() && new_samples < self.training_batch_size as u64 {
            return Ok(false);
        }
        if history.len() < self.min_training_size {
            return Ok(false);
        }

        match self.train(history) {
            Ok(model) => {
                info!(
                    r_squared = model.r_squared,
                    rows = model.training_rows,
                    "forecast model trained"
                );
                self.model = Some(Arc::new(model));
                self.last_train_total = total_ingested;
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "training failed, keeping previous model");
                Err(e)
            }
        }
    }

    fn train(&self, history: &MetricHistory) -> ScalecastResult<ForecastModel> {
        let rows = self.builder.training_rows(history)?;

        // Hold out the trailing 20% (at least one row) for validation
        let holdout = (rows.len() / 5).max(1);
        let split = rows.len() - holdout;
        if split < 2 {
            return Err(ScalecastError::insufficient_history(
                MIN_CONTEXT + 3,
                history.len(),
            ));
        }
        let (train, validation) = rows.split_at(split);

        let coefficients = fit_ols(train)?;

        let mut weights = [0.0; FEATURE_COUNT];
        weights.copy_from_slice(&coefficients[1..]);
        let candidate = ForecastModel {
            weights,
            intercept: coefficients[0],
            r_squared: 0.0,
            trained_at: history.latest().map(|s| s.timestamp).unwrap_or(0),
            training_rows: train.len(),
        };

        let r_squared = r_squared(&candidate, validation);
        debug!(r_squared, holdout, "validation slice scored");

        Ok(ForecastModel {
            r_squared,
            ..candidate
        })
    }

    /// Produce up to `forecast_horizon` predictions. Step 1 uses real
    /// history; later steps reconstruct features over a tail that mixes real
    /// history with the predictions of earlier steps. Confidence for step k
    /// is `r_squared * decay^k`; predicted loads are clamped to [0, 100].
    ///
    /// Returns `NotReady` when no model has been trained yet: the decision
    /// engine must treat that as "no information", never as zero load.
    pub fn forecast(&self, history: &MetricHistory) -> ScalecastResult<Vec<Prediction>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| ScalecastError::not_ready("no forecast model trained yet"))?;

        let latest = history
            .latest()
            .ok_or_else(|| ScalecastError::insufficient_history(MIN_CONTEXT, 0))?;
        if history.len() < MIN_CONTEXT {
            return Err(ScalecastError::insufficient_history(
                MIN_CONTEXT,
                history.len(),
            ));
        }

        // Working tail of load scores; predictions are appended as if observed
        let mut tail = history.load_scores();
        let keep = MIN_CONTEXT + self.forecast_horizon;
        if tail.len() > keep {
            tail.drain(..tail.len() - keep);
        }

        let mut predictions = Vec::with_capacity(self.forecast_horizon);
        for step in 1..=self.forecast_horizon {
            let synthetic_ts =
                latest.timestamp + (step as u64 - 1) * self.ingestion_interval_s;
            let features = self.builder.latest_from_tail(&tail, synthetic_ts)?;
            let predicted = model.predict(&features).clamp(0.0, 100.0);
            let confidence =
                (model.r_squared * self.confidence_decay.powi(step as i32)).clamp(0.0, 1.0);

            predictions.push(Prediction {
                horizon_step: step,
                predicted_load: predicted,
                confidence,
            });
            tail.push(predicted);
        }

        Ok(predictions)
    }
}

/// Closed-form OLS over the normal equations, with a small Tikhonov damping
/// term for numerical stability when feature columns are collinear (lag and
/// rolling features of a smooth signal usually are). Genuinely degenerate
/// systems still surface as `TrainingFailed`.
fn fit_ols(rows: &[TrainingRow]) -> ScalecastResult<[f64; DIM]> {
    let mut gram = [[0.0f64; DIM]; DIM];
    let mut rhs = [0.0f64; DIM];

    for row in rows {
        let mut x = [0.0f64; DIM];
        x[0] = 1.0;
        x[1..].copy_from_slice(&row.features.values);
        if x.iter().any(|v| !v.is_finite()) || !row.target.is_finite() {
            return Err(ScalecastError::training_failed(
                "non-finite value in feature matrix",
            ));
        }
        for i in 0..DIM {
            for j in 0..DIM {
                gram[i][j] += x[i] * x[j];
            }
            rhs[i] += x[i] * row.target;
        }
    }

    let trace: f64 = (0..DIM).map(|i| gram[i][i]).sum();
    let damping = (trace / DIM as f64 * 1e-6).max(1e-8);
    for (i, row) in gram.iter_mut().enumerate() {
        row[i] += damping;
    }

    solve(gram, rhs)
}

/// Gaussian elimination with partial pivoting on a DIM x DIM system
fn solve(mut a: [[f64; DIM]; DIM], mut b: [f64; DIM]) -> ScalecastResult<[f64; DIM]> {
    for col in 0..DIM {
        let pivot_row = (col..DIM)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < PIVOT_EPSILON {
            return Err(ScalecastError::training_failed(
                "feature matrix is singular or rank-deficient",
            ));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in col + 1..DIM {
            let factor = a[row][col] / a[col][col];
            for k in col..DIM {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0f64; DIM];
    for col in (0..DIM).rev() {
        let mut sum = b[col];
        for k in col + 1..DIM {
            sum -= a[col][k] * x[k];
        }
        x[col] = sum / a[col][col];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(ScalecastError::training_failed(
            "solution contains non-finite coefficients",
        ));
    }
    Ok(x)
}

/// R-squared of the model over a validation slice, clamped to [0, 1].
/// A zero-variance slice scores 0 (no evidence of predictive power).
fn r_squared(model: &ForecastModel, validation: &[TrainingRow]) -> f64 {
    if validation.is_empty() {
        return 0.0;
    }
    let mean = validation.iter().map(|r| r.target).sum::<f64>() / validation.len() as f64;
    let ss_tot: f64 = validation.iter().map(|r| (r.target - mean).powi(2)).sum();
    let ss_res: f64 = validation
        .iter()
        .map(|r| (r.target - model.predict(&r.features)).powi(2))
        .sum();

    if ss_tot <= f64::EPSILON {
        return 0.0;
    }
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LoadScoreParams, MetricSample};

    fn history_with_loads(loads: &[f64]) -> MetricHistory {
        let mut history = MetricHistory::new(1000);
        let params = LoadScoreParams::default();
        for (i, &load) in loads.iter().enumerate() {
            history.push(MetricSample::new(
                1_700_000_000 + i as u64 * 60,
                load,
                load,
                40.0,
                0,
                0,
                load * 2.0,
                10,
                &params,
            ));
        }
        history
    }

    fn config() -> ScalecastConfig {
        ScalecastConfig::default()
    }

    #[test]
    fn forecast_before_training_is_not_ready() {
        let forecaster = Forecaster::new(&config());
        let history = history_with_loads(&[10.0, 15.0, 12.0, 14.0, 13.0]);
        let err = forecaster.forecast(&history).unwrap_err();
        assert!(matches!(err, ScalecastError::NotReady { .. }));
    }

    #[test]
    fn maybe_train_waits_for_minimum_history() {
        let mut forecaster = Forecaster::new(&config());
        let history = history_with_loads(&[50.0; 10]);
        assert!(!forecaster.maybe_train(&history, 10).unwrap());
        assert!(!forecaster.is_trained());
    }

    #[test]
    fn trains_on_linear_ramp_and_forecasts_upward() {
        let mut forecaster = Forecaster::new(&config());
        // 25 samples rising linearly from 60 to 95
        let loads: Vec<f64> = (0..25)
            .map(|i| 60.0 + 35.0 * i as f64 / 24.0)
            .collect();
        let history = history_with_loads(&loads);

        assert!(forecaster.maybe_train(&history, 25).unwrap());
        let model = forecaster.model().unwrap();
        assert!(
            model.r_squared > 0.7,
            "ramp should validate well, got {}",
            model.r_squared
        );

        let predictions = forecaster.forecast(&history).unwrap();
        assert_eq!(predictions.len(), config().forecast_horizon);
        // The ramp continues upward past the last observed value
        assert!(predictions[0].predicted_load > 90.0);
        assert!(predictions[0].confidence >= 0.7);
    }

    #[test]
    fn confidence_is_non_increasing_in_horizon_step() {
        let mut forecaster = Forecaster::new(&config());
        let loads: Vec<f64> = (0..30).map(|i| 40.0 + (i % 7) as f64 * 3.0).collect();
        let history = history_with_loads(&loads);
        forecaster.maybe_train(&history, 30).unwrap();

        let predictions = forecaster.forecast(&history).unwrap();
        for pair in predictions.windows(2) {
            assert!(pair[1].confidence <= pair[0].confidence);
            assert_eq!(pair[1].horizon_step, pair[0].horizon_step + 1);
        }
        for p in &predictions {
            assert!((0.0..=1.0).contains(&p.confidence));
            assert!((0.0..=100.0).contains(&p.predicted_load));
        }
    }

    #[test]
    fn retrain_cadence_follows_batch_size() {
        let mut forecaster = Forecaster::new(&config());
        let loads: Vec<f64> = (0..25).map(|i| 50.0 + (i % 5) as f64).collect();
        let history = history_with_loads(&loads);

        assert!(forecaster.maybe_train(&history, 25).unwrap());
        // Fewer than training_batch_size new samples: no retrain
        assert!(!forecaster.maybe_train(&history, 30).unwrap());
        // Batch threshold reached: retrain
        assert!(forecaster.maybe_train(&history, 35).unwrap());
    }

    #[test]
    fn singular_system_is_training_failed() {
        let a = [[0.0f64; DIM]; DIM];
        let b = [1.0f64; DIM];
        let err = solve(a, b).unwrap_err();
        assert!(matches!(err, ScalecastError::TrainingFailed { .. }));
    }

    #[test]
    fn non_finite_features_fail_training_and_keep_previous_model() {
        let mut forecaster = Forecaster::new(&config());
        let loads: Vec<f64> = (0..25).map(|i| 50.0 + (i % 5) as f64).collect();
        let history = history_with_loads(&loads);
        forecaster.maybe_train(&history, 25).unwrap();
        let before = forecaster.model().unwrap();

        // Corrupt one row and retrain through the internal fit path
        let mut rows = FeatureBuilder.training_rows(&history).unwrap();
        rows[0].features.values[0] = f64::NAN;
        let err = fit_ols(&rows).unwrap_err();
        assert!(matches!(err, ScalecastError::TrainingFailed { .. }));

        // Model reference unchanged
        let after = forecaster.model().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn ols_recovers_a_known_linear_relation() {
        // target = 5 + 2 * lag1, other features held at varied but
        // consistent values
        let mut rows = Vec::new();
        for i in 0..40 {
            let lag1 = 10.0 + i as f64;
            let mut values = [0.0f64; FEATURE_COUNT];
            values[0] = lag1;
            values[1] = (i % 3) as f64;
            values[2] = (i % 5) as f64;
            values[3] = (i % 7) as f64;
            values[4] = (i % 11) as f64;
            values[5] = (i % 13) as f64;
            values[6] = (i % 24) as f64;
            values[7] = (i % 7) as f64;
            rows.push(TrainingRow {
                features: FeatureVector { values },
                target: 5.0 + 2.0 * lag1,
            });
        }
        let coefficients = fit_ols(&rows).unwrap();
        assert!((coefficients[1] - 2.0).abs() < 1e-2, "lag1 weight: {}", coefficients[1]);
    }
}
